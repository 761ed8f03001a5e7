//! Error types for the dip scanner.

use thiserror::Error;

/// Result type alias using the shared error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for request-level failures.
///
/// Per-symbol provider failures are not represented here: they are data,
/// counted in the scan report, and never abort a request.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Config(_) | Self::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::InvalidInput("test".into()).status_code(), 400);
        assert_eq!(Error::Internal("test".into()).status_code(), 500);
        assert_eq!(Error::Config("test".into()).status_code(), 500);
    }

    #[test]
    fn test_error_messages() {
        let err = Error::InvalidInput("weeklyThreshold must be a number".into());
        assert_eq!(err.to_string(), "Invalid input: weeklyThreshold must be a number");
    }
}
