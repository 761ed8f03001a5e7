//! Configuration management for the dip scanner.
//!
//! The service reads an optional configuration file at `~/.dipscan/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (applied once at startup)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `PORT` → network.port (also switches to production mode)
//! - `RAILWAY_ENVIRONMENT` → production mode
//! - `DIPSCAN_BIND_ADDRESS` → network.bind
//! - `DIPSCAN_LOG_LEVEL` → observability.log_level
//! - `DIPSCAN_LOG_FORMAT` → observability.log_format
//! - `DIPSCAN_PROVIDER_URL` → scanner.provider_base_url
//! - `DIPSCAN_PACING_MS` → scanner.pacing_delay_ms
//! - `DIPSCAN_ALLOWED_ORIGINS` → cors.allowed_origins (comma separated)
//!
//! Production mode disables CORS debug mode and, when no origins are
//! configured, installs [`PRODUCTION_ORIGINS`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Origins allowed in production when none are configured.
pub const PRODUCTION_ORIGINS: &[&str] = &[
    "https://*.vercel.app",
    "https://buy-the-dip-beige.vercel.app",
    "http://localhost:3000",
    "http://127.0.0.1:5000",
];

/// Universes the embedded catalog ships with.
pub const KNOWN_UNIVERSES: &[&str] = &["nifty50", "nifty100", "nifty200", "nifty500"];

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".dipscan"),
        |dirs| dirs.home_dir().join(".dipscan"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address. Default: "0.0.0.0"
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Listener port. Default: 5000
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
        }
    }
}

impl NetworkConfig {
    /// `host:port` string for binding.
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    5000
}

// ============================================================================
// CORS Configuration
// ============================================================================

/// Cross-origin policy, resolved once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. An entry may use a subdomain wildcard,
    /// e.g. `https://*.vercel.app`.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// When true every origin is allowed.
    #[serde(default = "default_true")]
    pub debug_mode: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            debug_mode: true,
        }
    }
}

impl CorsConfig {
    /// Check whether a request origin is allowed by this policy.
    pub fn allows(&self, origin: &str) -> bool {
        self.debug_mode
            || self
                .allowed_origins
                .iter()
                .any(|pattern| origin_matches(pattern, origin))
    }
}

/// Match an origin against an exact or `scheme://*.domain` pattern.
///
/// The wildcard covers one or more subdomain labels but never the bare
/// domain itself.
pub fn origin_matches(pattern: &str, origin: &str) -> bool {
    match pattern.split_once("*.") {
        Some((prefix, suffix)) => {
            let Some(rest) = origin.strip_prefix(prefix) else {
                return false;
            };
            let Some(host) = rest.strip_suffix(suffix) else {
                return false;
            };
            let Some(label) = host.strip_suffix('.') else {
                return false;
            };
            !label.is_empty() && !label.contains('/') && !label.contains(':')
        }
        None => pattern == origin,
    }
}

/// Deployment mode detected from the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    #[default]
    Development,
    Production,
}

impl std::fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to set to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Scanner Configuration
// ============================================================================

/// Scan engine and price history client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Base URL of the chart API
    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay between consecutive provider calls during a scan
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,

    /// Minimum number of non-null closes for a usable series
    #[serde(default = "default_min_valid_samples")]
    pub min_valid_samples: usize,

    /// Trailing window requested from the provider
    #[serde(default = "default_range")]
    pub range: String,

    /// Sample interval requested from the provider
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Include pre/post market samples
    #[serde(default = "default_true")]
    pub include_pre_post: bool,

    /// User-Agent header sent to the provider
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Exchange suffix appended to bare symbols on the diagnostic path
    #[serde(default = "default_symbol_suffix")]
    pub symbol_suffix: String,

    /// Universe used when a request names an unknown one
    #[serde(default = "default_universe")]
    pub default_universe: String,

    /// Optional directory with `<universe>.json` catalog overrides
    #[serde(default)]
    pub universe_dir: Option<PathBuf>,

    /// Log a progress line every N processed symbols
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            provider_base_url: default_provider_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            pacing_delay_ms: default_pacing_delay_ms(),
            min_valid_samples: default_min_valid_samples(),
            range: default_range(),
            interval: default_interval(),
            include_pre_post: true,
            user_agent: default_user_agent(),
            symbol_suffix: default_symbol_suffix(),
            default_universe: default_universe(),
            universe_dir: None,
            progress_every: default_progress_every(),
        }
    }
}

impl ScannerConfig {
    /// Provider request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Pacing interval between provider calls.
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }
}

fn default_provider_base_url() -> String {
    "https://query1.finance.yahoo.com".into()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_pacing_delay_ms() -> u64 {
    1000
}

fn default_min_valid_samples() -> usize {
    7
}

fn default_range() -> String {
    "1mo".into()
}

fn default_interval() -> String {
    "1d".into()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .into()
}

fn default_symbol_suffix() -> String {
    ".NS".into()
}

fn default_universe() -> String {
    "nifty100".into()
}

fn default_progress_every() -> usize {
    10
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Deployment mode (normally detected from the environment)
    #[serde(default)]
    pub deployment: DeploymentMode,

    /// HTTP listener
    #[serde(default)]
    pub network: NetworkConfig,

    /// Cross-origin policy
    #[serde(default)]
    pub cors: CorsConfig,

    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Scan engine and provider client
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// File this configuration was read from; `None` for built-in defaults.
    /// Loading happens before logging is up, so callers report it.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT");
        if lookup("RAILWAY_ENVIRONMENT").is_some() || port.is_some() {
            self.deployment = DeploymentMode::Production;
        }

        if let Some(p) = port.and_then(|p| p.parse().ok()) {
            self.network.port = p;
        }
        if let Some(bind) = lookup("DIPSCAN_BIND_ADDRESS") {
            self.network.bind = bind;
        }
        if let Some(level) = lookup("DIPSCAN_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("DIPSCAN_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Some(url) = lookup("DIPSCAN_PROVIDER_URL") {
            self.scanner.provider_base_url = url;
        }
        if let Some(ms) = lookup("DIPSCAN_PACING_MS").and_then(|v| v.parse().ok()) {
            self.scanner.pacing_delay_ms = ms;
        }
        if let Some(origins) = lookup("DIPSCAN_ALLOWED_ORIGINS") {
            self.cors.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }

        self.resolve_cors();
    }

    /// Settle the CORS policy for the current deployment mode.
    fn resolve_cors(&mut self) {
        if self.deployment == DeploymentMode::Production {
            self.cors.debug_mode = false;
            if self.cors.allowed_origins.is_empty() {
                self.cors.allowed_origins =
                    PRODUCTION_ORIGINS.iter().map(|o| (*o).to_string()).collect();
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
