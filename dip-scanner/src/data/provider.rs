//! Price history provider abstraction.
//!
//! Defines the `PriceHistoryProvider` trait the scan engine depends on and
//! the per-symbol failure taxonomy. A failure is data, not a fault: the
//! engine counts it and moves on to the next symbol.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::PriceSeries;

// ============================================================================
// Failure Taxonomy
// ============================================================================

/// Why a single symbol could not be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network error or timeout
    ProviderUnreachable,
    /// Provider answered with a non-200 status
    ProviderErrorStatus,
    /// Response body did not match the expected chart schema
    MalformedResponse,
    /// Fewer valid closes than required
    InsufficientData,
    /// Reference price is zero or negative, change is undefined
    DegenerateReferencePrice,
}

impl FailureKind {
    /// Stable identifier used in logs and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProviderUnreachable => "provider_unreachable",
            Self::ProviderErrorStatus => "provider_error_status",
            Self::MalformedResponse => "malformed_response",
            Self::InsufficientData => "insufficient_data",
            Self::DegenerateReferencePrice => "degenerate_reference_price",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified per-symbol failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ScanFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ScanFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ProviderUnreachable, message)
    }

    pub fn status(status: u16) -> Self {
        Self::new(FailureKind::ProviderErrorStatus, format!("HTTP {}", status))
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedResponse, message)
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Source of trailing price history for one symbol.
///
/// Implementations make a single attempt per call: no retries, no pacing.
/// Pacing belongs to the caller.
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    /// Provider name (e.g., "yahoo_finance")
    fn name(&self) -> &'static str;

    /// Fetch and validate the trailing series for `symbol`.
    ///
    /// `symbol` must already be in the provider's ticker format.
    async fn fetch_history(&self, symbol: &str) -> Result<PriceSeries, ScanFailure>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::DegenerateReferencePrice).unwrap();
        assert_eq!(json, "\"degenerate_reference_price\"");
        for kind in [
            FailureKind::ProviderUnreachable,
            FailureKind::ProviderErrorStatus,
            FailureKind::MalformedResponse,
            FailureKind::InsufficientData,
            FailureKind::DegenerateReferencePrice,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json.trim_matches('"'), kind.as_str());
        }
    }

    #[test]
    fn test_failure_display() {
        let failure = ScanFailure::status(404);
        assert_eq!(failure.to_string(), "provider_error_status: HTTP 404");
    }
}
