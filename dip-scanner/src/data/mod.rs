//! Market data module.
//!
//! Provides the price history abstraction the scan engine consumes and the
//! Yahoo chart adapter that implements it.
//!
//! # Data Sources
//! - **Yahoo chart API**: trailing one-month daily closes for NSE symbols

mod provider;
mod rate_limiter;
mod yahoo;

pub use provider::{FailureKind, PriceHistoryProvider, ScanFailure};
pub use rate_limiter::RateLimiter;
pub use yahoo::{normalize_symbol, YahooChartClient, YahooChartConfig};

use serde::{Deserialize, Serialize};

// ============================================================================
// Core Data Types
// ============================================================================

/// One provider sample for a symbol.
///
/// `close` is `None` for trading halts and data gaps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    /// Epoch seconds
    pub timestamp: i64,
    /// Closing price
    pub close: Option<f64>,
    /// Traded volume
    pub volume: Option<u64>,
}

impl PriceSample {
    pub fn new(timestamp: i64, close: Option<f64>, volume: Option<u64>) -> Self {
        Self {
            timestamp,
            close,
            volume,
        }
    }
}

/// A sample with a known close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: i64,
    pub close: f64,
}

/// A validated, time-ordered price history for one symbol.
///
/// Construction guarantees ascending timestamps and at least the requested
/// number of samples with a close, so lookups never see an empty window.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    samples: Vec<PriceSample>,
    valid: Vec<PricePoint>,
}

impl PriceSeries {
    /// Validate raw samples into a series.
    ///
    /// Fails with [`FailureKind::InsufficientData`] when fewer than
    /// `min_valid` samples carry a close.
    pub fn new(
        symbol: impl Into<String>,
        mut samples: Vec<PriceSample>,
        min_valid: usize,
    ) -> Result<Self, ScanFailure> {
        let symbol = symbol.into();
        samples.sort_by_key(|s| s.timestamp);

        let valid: Vec<PricePoint> = samples
            .iter()
            .filter_map(|s| {
                s.close.map(|close| PricePoint {
                    timestamp: s.timestamp,
                    close,
                })
            })
            .collect();

        if valid.len() < min_valid.max(1) {
            return Err(ScanFailure::new(
                FailureKind::InsufficientData,
                format!(
                    "{} has {} valid closes, need at least {}",
                    symbol,
                    valid.len(),
                    min_valid
                ),
            ));
        }

        Ok(Self {
            symbol,
            samples,
            valid,
        })
    }

    /// Provider ticker this series belongs to.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// All samples, including those without a close.
    pub fn samples(&self) -> &[PriceSample] {
        &self.samples
    }

    /// Samples with a close, oldest first. Never empty.
    pub fn valid_points(&self) -> &[PricePoint] {
        &self.valid
    }

    /// Timestamp of the newest raw sample (with or without a close).
    pub fn last_timestamp(&self) -> i64 {
        // non-empty: `valid` is a subset of `samples`
        self.samples[self.samples.len() - 1].timestamp
    }

    /// Most recent strictly positive volume, or 0.
    pub fn latest_volume(&self) -> u64 {
        self.samples
            .iter()
            .rev()
            .filter_map(|s| s.volume)
            .find(|v| *v > 0)
            .unwrap_or(0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;

    fn samples(closes: &[Option<f64>]) -> Vec<PriceSample> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| PriceSample::new(1_700_000_000 + i as i64 * DAY, *c, Some(1000)))
            .collect()
    }

    #[test]
    fn test_series_requires_min_valid_closes() {
        let raw = samples(&[Some(1.0), Some(2.0), None, Some(3.0), Some(4.0), Some(5.0), Some(6.0)]);
        let err = PriceSeries::new("AAA.NS", raw, 7).unwrap_err();
        assert_eq!(err.kind, FailureKind::InsufficientData);
        assert!(err.message.contains("6 valid closes"));
    }

    #[test]
    fn test_series_accepts_exactly_min_valid() {
        let raw = samples(&[Some(1.0); 7]);
        let series = PriceSeries::new("AAA.NS", raw, 7).unwrap();
        assert_eq!(series.valid_points().len(), 7);
        assert_eq!(series.symbol(), "AAA.NS");
    }

    #[test]
    fn test_series_sorts_and_drops_null_closes() {
        let mut raw = samples(&[Some(1.0), None, Some(3.0), Some(4.0)]);
        raw.reverse();
        let series = PriceSeries::new("AAA.NS", raw, 3).unwrap();
        let ts: Vec<i64> = series.valid_points().iter().map(|p| p.timestamp).collect();
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(series.valid_points().len(), 3);
        assert_eq!(series.samples().len(), 4);
    }

    #[test]
    fn test_last_timestamp_includes_trailing_gap() {
        let raw = samples(&[Some(1.0), Some(2.0), None]);
        let series = PriceSeries::new("AAA.NS", raw, 2).unwrap();
        assert_eq!(series.last_timestamp(), 1_700_000_000 + 2 * DAY);
    }

    #[test]
    fn test_latest_volume_skips_null_and_zero() {
        let mut raw = samples(&[Some(1.0), Some(2.0), Some(3.0)]);
        raw[0].volume = Some(500);
        raw[1].volume = Some(750);
        raw[2].volume = Some(0);
        let series = PriceSeries::new("AAA.NS", raw, 3).unwrap();
        assert_eq!(series.latest_volume(), 750);

        let mut raw = samples(&[Some(1.0), Some(2.0)]);
        raw.iter_mut().for_each(|s| s.volume = None);
        let series = PriceSeries::new("AAA.NS", raw, 2).unwrap();
        assert_eq!(series.latest_volume(), 0);
    }
}
