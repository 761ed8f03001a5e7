//! Configuration validation.
//!
//! Provides validation logic for configuration fields to ensure
//! all values are present and within valid ranges before the service starts.

use thiserror::Error;

use crate::config::{
    Config, CorsConfig, NetworkConfig, ObservabilityConfig, ScannerConfig, KNOWN_UNIVERSES,
};
use crate::logging::LogFormat;

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.network.validate() {
            errors.push(e);
        }
        if let Err(e) = self.cors.validate() {
            errors.push(e);
        }
        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }
        if let Err(e) = self.scanner.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

impl Validate for NetworkConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort {
                port: self.port,
                field: "network.port".into(),
            });
        }
        if self.bind.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "network.bind".into(),
            });
        }
        Ok(())
    }
}

impl Validate for CorsConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !self.debug_mode && self.allowed_origins.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "cors.allowed_origins".into(),
                reason: "must list at least one origin when debug_mode is off".into(),
            });
        }

        if let Some(bad) = self
            .allowed_origins
            .iter()
            .find(|o| !(o.starts_with("http://") || o.starts_with("https://")))
        {
            return Err(ValidationError::InvalidValue {
                field: "cors.allowed_origins".into(),
                reason: format!("'{}' is not an http(s) origin", bad),
            });
        }

        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }

        if let Err(reason) = self.log_format.parse::<LogFormat>() {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("{}, must be json or pretty", reason),
            });
        }

        Ok(())
    }
}

impl Validate for ScannerConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !(self.provider_base_url.starts_with("http://")
            || self.provider_base_url.starts_with("https://"))
        {
            return Err(ValidationError::InvalidValue {
                field: "scanner.provider_base_url".into(),
                reason: "must start with http:// or https://".into(),
            });
        }

        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "scanner.request_timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.min_valid_samples == 0 {
            return Err(ValidationError::InvalidValue {
                field: "scanner.min_valid_samples".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.progress_every == 0 {
            return Err(ValidationError::InvalidValue {
                field: "scanner.progress_every".into(),
                reason: "must be greater than 0".into(),
            });
        }

        let universe = self.default_universe.trim().to_lowercase();
        if !KNOWN_UNIVERSES.contains(&universe.as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "scanner.default_universe".into(),
                reason: format!("must be one of: {}", KNOWN_UNIVERSES.join(", ")),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = Config::default();
        config.network.port = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidPort { port: 0, .. })
        ));
    }

    #[test_case("verbose", "pretty" ; "unknown level")]
    #[test_case("info", "xml" ; "unknown format")]
    fn test_observability_rejects(level: &str, format: &str) {
        let obs = ObservabilityConfig {
            log_level: level.into(),
            log_format: format.into(),
            excluded_targets: vec![],
        };
        assert!(obs.validate().is_err());
    }

    #[test]
    fn test_strict_cors_needs_origins() {
        let cors = CorsConfig {
            allowed_origins: vec![],
            debug_mode: false,
        };
        assert!(cors.validate().is_err());

        let cors = CorsConfig {
            allowed_origins: vec!["ftp://files.example".into()],
            debug_mode: false,
        };
        assert!(cors.validate().is_err());
    }

    #[test]
    fn test_scanner_limits() {
        let mut scanner = ScannerConfig::default();
        scanner.min_valid_samples = 0;
        assert!(scanner.validate().is_err());

        let mut scanner = ScannerConfig::default();
        scanner.default_universe = "sensex".into();
        assert!(scanner.validate().is_err());

        let mut scanner = ScannerConfig::default();
        scanner.request_timeout_secs = 0;
        assert!(scanner.validate().is_err());
    }

    #[test_case("NIFTY50" ; "upper case")]
    #[test_case(" nifty500 " ; "padded")]
    fn test_default_universe_ignores_case(universe: &str) {
        let scanner = ScannerConfig {
            default_universe: universe.into(),
            ..Default::default()
        };
        assert!(scanner.validate().is_ok());
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut config = Config::default();
        config.network.port = 0;
        config.observability.log_level = "loud".into();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Multiple(errs)) if errs.len() == 2
        ));
    }
}
