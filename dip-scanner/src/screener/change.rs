//! Weekly and monthly change calculation.
//!
//! Reference prices use "last close at or before the cutoff" semantics on
//! the valid samples of a series. When the whole window is newer than a
//! cutoff, the earliest valid close stands in for the reference.

use serde::{Serialize, Serializer};

use crate::data::{FailureKind, PricePoint, PriceSeries, ScanFailure};

/// Offset of the weekly reference cutoff.
pub const WEEK_SECS: i64 = 7 * 24 * 60 * 60;

/// Offset of the monthly reference cutoff (fixed 30 days).
pub const MONTH_SECS: i64 = 30 * 24 * 60 * 60;

/// Round to 2 decimal places for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn serialize_round2<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round2(*value))
}

/// Price changes for one symbol.
///
/// Values are kept at full precision; serialization rounds to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeResult {
    #[serde(skip)]
    pub symbol: String,
    #[serde(serialize_with = "serialize_round2")]
    pub current_price: f64,
    #[serde(serialize_with = "serialize_round2")]
    pub price_one_week_ago: f64,
    #[serde(serialize_with = "serialize_round2")]
    pub price_one_month_ago: f64,
    #[serde(rename = "weeklyChange", serialize_with = "serialize_round2")]
    pub weekly_change_pct: f64,
    #[serde(rename = "monthlyChange", serialize_with = "serialize_round2")]
    pub monthly_change_pct: f64,
    pub volume: u64,
}

impl ChangeResult {
    /// Weekly change as presented (2 decimals).
    pub fn weekly_change(&self) -> f64 {
        round2(self.weekly_change_pct)
    }

    /// Monthly change as presented (2 decimals).
    pub fn monthly_change(&self) -> f64 {
        round2(self.monthly_change_pct)
    }
}

/// Close of the latest point at or before `target`, else the earliest close.
///
/// `points` must be non-empty and sorted by timestamp.
fn reference_close(points: &[PricePoint], target: i64) -> f64 {
    let idx = points.partition_point(|p| p.timestamp <= target);
    if idx == 0 {
        points[0].close
    } else {
        points[idx - 1].close
    }
}

fn percent_change(current: f64, reference: f64) -> f64 {
    (current - reference) / reference * 100.0
}

/// Derive current price, reference prices and changes from a series.
///
/// Fails only with [`FailureKind::DegenerateReferencePrice`] when a
/// reference close is not strictly positive.
pub fn compute_change(series: &PriceSeries) -> Result<ChangeResult, ScanFailure> {
    let points = series.valid_points();
    let current_price = points[points.len() - 1].close;

    let last_ts = series.last_timestamp();
    let week_price = reference_close(points, last_ts - WEEK_SECS);
    let month_price = reference_close(points, last_ts - MONTH_SECS);

    for (label, price) in [("weekly", week_price), ("monthly", month_price)] {
        if !(price > 0.0) {
            return Err(ScanFailure::new(
                FailureKind::DegenerateReferencePrice,
                format!("{} reference price for {} is {}", label, series.symbol(), price),
            ));
        }
    }

    Ok(ChangeResult {
        symbol: series.symbol().to_string(),
        current_price,
        price_one_week_ago: week_price,
        price_one_month_ago: month_price,
        weekly_change_pct: percent_change(current_price, week_price),
        monthly_change_pct: percent_change(current_price, month_price),
        volume: series.latest_volume(),
    })
}

// ============================================================================
// Tests
// ============================================================================
