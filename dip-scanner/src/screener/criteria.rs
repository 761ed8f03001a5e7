//! Scan criteria.
//!
//! `ScanRequest` is the raw request body; `ScanCriteria` is the validated
//! form the engine works with. Thresholds are positive magnitudes of a
//! decline: a stock matches when both of its changes are at or below the
//! negated thresholds.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use dip_common::{Error, Result};

use super::change::ChangeResult;
use crate::universe::{MarketCap, StockRef};

/// Default weekly decline threshold (percent).
pub const DEFAULT_WEEKLY_THRESHOLD: f64 = 5.0;

/// Default monthly decline threshold (percent).
pub const DEFAULT_MONTHLY_THRESHOLD: f64 = 10.0;

const ALL: &str = "all";

// ============================================================================
// Filters
// ============================================================================

/// Market-cap filter applied before fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketCapFilter {
    #[default]
    All,
    Only(MarketCap),
}

impl MarketCapFilter {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::All),
            Some(s) if s.eq_ignore_ascii_case(ALL) => Ok(Self::All),
            Some(s) => s.parse().map(Self::Only).map_err(Error::InvalidInput),
        }
    }

    pub fn admits(&self, market_cap: MarketCap) -> bool {
        match self {
            Self::All => true,
            Self::Only(bucket) => *bucket == market_cap,
        }
    }
}

impl std::fmt::Display for MarketCapFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str(ALL),
            Self::Only(bucket) => write!(f, "{}", bucket),
        }
    }
}

impl Serialize for MarketCapFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Sector filter applied before fetching. Only the exact literal `all`
/// disables it; any other value must equal the catalog sector label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SectorFilter {
    #[default]
    All,
    Only(String),
}

impl SectorFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some(ALL) => Self::All,
            Some(s) => Self::Only(s.to_string()),
        }
    }

    pub fn admits(&self, sector: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == sector,
        }
    }
}

impl std::fmt::Display for SectorFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str(ALL),
            Self::Only(sector) => f.write_str(sector),
        }
    }
}

impl Serialize for SectorFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// Request and Criteria
// ============================================================================

/// Raw `POST /scan` body. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    /// Number or numeric string
    #[serde(default)]
    pub weekly_threshold: Option<Value>,
    /// Number or numeric string
    #[serde(default)]
    pub monthly_threshold: Option<Value>,
    #[serde(default)]
    pub market_cap_filter: Option<String>,
    #[serde(default)]
    pub sector_filter: Option<String>,
    #[serde(default)]
    pub stock_universe: Option<String>,
}

/// Validated scan criteria.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCriteria {
    #[serde(rename = "weeklyThreshold")]
    pub weekly_threshold_pct: f64,
    #[serde(rename = "monthlyThreshold")]
    pub monthly_threshold_pct: f64,
    #[serde(rename = "marketCapFilter")]
    pub market_cap: MarketCapFilter,
    #[serde(rename = "sectorFilter")]
    pub sector: SectorFilter,
    /// Requested universe id; `None` means the catalog default.
    #[serde(rename = "stockUniverse", skip_serializing_if = "Option::is_none")]
    pub universe: Option<String>,
}

impl Default for ScanCriteria {
    fn default() -> Self {
        Self {
            weekly_threshold_pct: DEFAULT_WEEKLY_THRESHOLD,
            monthly_threshold_pct: DEFAULT_MONTHLY_THRESHOLD,
            market_cap: MarketCapFilter::All,
            sector: SectorFilter::All,
            universe: None,
        }
    }
}

impl ScanCriteria {
    /// Criteria with the given thresholds and no filters.
    pub fn with_thresholds(weekly: f64, monthly: f64) -> Self {
        Self {
            weekly_threshold_pct: weekly,
            monthly_threshold_pct: monthly,
            ..Default::default()
        }
    }

    pub fn universe(mut self, universe: impl Into<String>) -> Self {
        self.universe = Some(universe.into());
        self
    }

    pub fn market_cap(mut self, filter: MarketCapFilter) -> Self {
        self.market_cap = filter;
        self
    }

    pub fn sector(mut self, filter: SectorFilter) -> Self {
        self.sector = filter;
        self
    }

    /// Whether a catalog entry passes the market-cap and sector filters.
    pub fn admits(&self, stock: &StockRef) -> bool {
        self.market_cap.admits(stock.market_cap) && self.sector.admits(&stock.sector)
    }

    /// Whether a change result qualifies as a match.
    ///
    /// Compares the unrounded changes; rounding is output-only.
    pub fn is_match(&self, change: &ChangeResult) -> bool {
        change.weekly_change_pct <= -self.weekly_threshold_pct
            && change.monthly_change_pct <= -self.monthly_threshold_pct
    }

    /// Number of non-"all" filters.
    pub fn filters_applied(&self) -> usize {
        let mut count = 0;
        if self.market_cap != MarketCapFilter::All {
            count += 1;
        }
        if self.sector != SectorFilter::All {
            count += 1;
        }
        count
    }

    /// Human-readable one-line form.
    pub fn describe(&self) -> String {
        format!(
            "weekly <= -{}%, monthly <= -{}%, market cap {}, sector {}",
            self.weekly_threshold_pct, self.monthly_threshold_pct, self.market_cap, self.sector
        )
    }
}

impl TryFrom<ScanRequest> for ScanCriteria {
    type Error = Error;

    fn try_from(request: ScanRequest) -> Result<Self> {
        let universe = request
            .stock_universe
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        let weekly = parse_threshold(
            "weeklyThreshold",
            request.weekly_threshold,
            DEFAULT_WEEKLY_THRESHOLD,
        )?;
        let monthly = parse_threshold(
            "monthlyThreshold",
            request.monthly_threshold,
            DEFAULT_MONTHLY_THRESHOLD,
        )?;

        let mut criteria = Self::with_thresholds(weekly, monthly)
            .market_cap(MarketCapFilter::parse(request.market_cap_filter.as_deref())?)
            .sector(SectorFilter::parse(request.sector_filter.as_deref()));
        criteria.universe = universe;
        Ok(criteria)
    }
}

/// Accept a number or numeric string; reject negative and non-finite values.
fn parse_threshold(field: &str, raw: Option<Value>, default: f64) -> Result<f64> {
    let value = match raw {
        None | Some(Value::Null) => return Ok(default),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match value {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Some(v) => Err(Error::InvalidInput(format!(
            "{} must be a non-negative number, got {}",
            field, v
        ))),
        None => Err(Error::InvalidInput(format!("{} must be a number", field))),
    }
}

// ============================================================================
// Tests
// ============================================================================
