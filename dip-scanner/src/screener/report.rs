//! Scan report and per-symbol payloads.
//!
//! Renders a completed scan as:
//! - JSON (the `POST /scan` response body)
//! - Markdown (human-readable table)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dip_common::{Error, Result};

use super::change::ChangeResult;
use super::criteria::ScanCriteria;
use crate::data::{FailureKind, ScanFailure};
use crate::universe::{StockRef, UniverseId};

/// Note attached to every failure payload.
pub const FAILURE_NOTE: &str = "This stock will be excluded from scan results";

// ============================================================================
// Report Format
// ============================================================================

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// JSON format (machine-readable)
    #[default]
    Json,
    /// Markdown format (human-readable)
    Markdown,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Markdown => write!(f, "markdown"),
        }
    }
}

impl ReportFormat {
    /// HTTP content type of a rendered report.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

// ============================================================================
// Per-symbol Payloads
// ============================================================================

/// Outcome marker carried by every per-symbol payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolStatus {
    Success,
    Failed,
}

/// Successful evaluation of one symbol.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePayload {
    pub symbol: String,
    #[serde(flatten)]
    pub change: ChangeResult,
    pub last_updated: DateTime<Utc>,
    pub status: SymbolStatus,
    pub source: &'static str,
}

impl QuotePayload {
    pub fn new(change: ChangeResult, source: &'static str) -> Self {
        Self {
            symbol: change.symbol.clone(),
            change,
            last_updated: Utc::now(),
            status: SymbolStatus::Success,
            source,
        }
    }
}

/// Failed evaluation of one symbol.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailurePayload {
    pub symbol: String,
    pub error: String,
    pub reason: FailureKind,
    pub status: SymbolStatus,
    pub last_updated: DateTime<Utc>,
    pub note: &'static str,
}

impl FailurePayload {
    pub fn new(symbol: impl Into<String>, failure: ScanFailure) -> Self {
        Self {
            symbol: symbol.into(),
            error: failure.message,
            reason: failure.kind,
            status: SymbolStatus::Failed,
            last_updated: Utc::now(),
            note: FAILURE_NOTE,
        }
    }
}

/// Either payload, as returned by the diagnostic endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SymbolOutcome {
    Success(QuotePayload),
    Failed(FailurePayload),
}

/// A stock that met the criteria: catalog entry merged with its quote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedStock {
    #[serde(flatten)]
    pub stock: StockRef,
    #[serde(flatten)]
    pub change: ChangeResult,
    pub last_updated: DateTime<Utc>,
    pub status: SymbolStatus,
    pub source: &'static str,
}

impl MatchedStock {
    pub fn new(stock: StockRef, change: ChangeResult, source: &'static str) -> Self {
        Self {
            stock,
            change,
            last_updated: Utc::now(),
            status: SymbolStatus::Success,
            source,
        }
    }
}

/// Failure entry of a scan report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: FailureKind,
    pub message: String,
}

// ============================================================================
// Scan Report
// ============================================================================

/// Scan counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Size of the resolved universe before filtering
    pub universe_size: usize,
    /// Entries that passed the market-cap and sector filters
    pub eligible: usize,
    /// Number of non-"all" filters
    pub filters_applied: usize,
    /// Symbols a provider call was issued for
    pub processed: usize,
    /// Symbols whose change was computed
    pub succeeded: usize,
    /// Symbols that failed
    #[serde(rename = "failed_count")]
    pub failed: usize,
}

impl ScanStats {
    /// Success rate in percent, `None` when nothing was processed.
    pub fn success_rate(&self) -> Option<f64> {
        if self.processed == 0 {
            None
        } else {
            Some(self.succeeded as f64 / self.processed as f64 * 100.0)
        }
    }

    /// Success rate formatted like `"87.5%"`; `"0%"` when nothing was processed.
    pub fn success_rate_label(&self) -> String {
        match self.success_rate() {
            Some(rate) => format!("{:.1}%", rate),
            None => "0%".to_string(),
        }
    }
}

/// Result of one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scan_id: String,
    /// Matches in catalog order
    pub results: Vec<MatchedStock>,
    pub total_matches: usize,
    /// Universe id as requested
    pub stock_universe: String,
    /// Universe actually scanned
    pub resolved_universe: UniverseId,
    #[serde(flatten)]
    pub stats: ScanStats,
    pub success_rate: String,
    pub failures: Vec<SymbolFailure>,
    pub criteria: ScanCriteria,
    /// Whether the scan stopped early
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Everything a scan collected, before derived fields are filled in.
#[derive(Debug)]
pub struct ScanOutcome {
    pub scan_id: String,
    pub requested_universe: String,
    pub resolved_universe: UniverseId,
    pub criteria: ScanCriteria,
    pub stats: ScanStats,
    pub results: Vec<MatchedStock>,
    pub failures: Vec<SymbolFailure>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
}

impl ScanReport {
    /// Assemble the report, stamping completion time.
    pub fn build(outcome: ScanOutcome) -> Self {
        Self::build_at(outcome, Utc::now())
    }

    fn build_at(outcome: ScanOutcome, completed_at: DateTime<Utc>) -> Self {
        let duration_secs =
            (completed_at - outcome.started_at).num_milliseconds().max(0) as f64 / 1000.0;
        let total_matches = outcome.results.len();
        let message = format!(
            "Scanned {}: {} declining stocks found from {} successful provider calls",
            outcome.requested_universe, total_matches, outcome.stats.succeeded
        );

        Self {
            scan_id: outcome.scan_id,
            results: outcome.results,
            total_matches,
            stock_universe: outcome.requested_universe,
            resolved_universe: outcome.resolved_universe,
            success_rate: outcome.stats.success_rate_label(),
            stats: outcome.stats,
            failures: outcome.failures,
            criteria: outcome.criteria,
            cancelled: outcome.cancelled,
            started_at: outcome.started_at,
            completed_at,
            duration_secs,
            timestamp: completed_at,
            message,
        }
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} {}: {} matches, {}/{} processed ok ({}), {} failed{}",
            self.scan_id,
            self.resolved_universe,
            self.total_matches,
            self.stats.succeeded,
            self.stats.processed,
            self.success_rate,
            self.stats.failed,
            if self.cancelled { ", cancelled" } else { "" }
        )
    }

    /// Render in the requested format.
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Json => self.to_json(),
            ReportFormat::Markdown => Ok(self.to_markdown()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Internal(format!("Failed to serialize scan report: {}", e)))
    }

    /// Markdown report with summary, matches and failures.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "# Dip Scan Report\n\n**Scan ID**: {}\n**Time**: {}\n**Duration**: {:.1}s\n\n",
            self.scan_id,
            self.completed_at.format("%Y-%m-%d %H:%M:%S"),
            self.duration_secs
        ));

        md.push_str("## Summary\n\n");
        md.push_str(&format!(
            "- **Universe**: {} ({} stocks)\n",
            self.resolved_universe.display_name(),
            self.stats.universe_size
        ));
        md.push_str(&format!("- **Criteria**: {}\n", self.criteria.describe()));
        md.push_str(&format!("- **Eligible**: {}\n", self.stats.eligible));
        md.push_str(&format!(
            "- **Processed**: {} ({} ok, {} failed, {})\n",
            self.stats.processed, self.stats.succeeded, self.stats.failed, self.success_rate
        ));
        md.push_str(&format!("- **Matches**: {}\n", self.total_matches));
        if self.cancelled {
            md.push_str("- **Cancelled**: scan stopped before the end of the universe\n");
        }
        md.push('\n');

        md.push_str("## Matches\n\n");
        if self.results.is_empty() {
            md.push_str("No stocks met the criteria.\n\n");
        } else {
            md.push_str("| Symbol | Name | Sector | Cap | Price | 1W | 1M |\n");
            md.push_str("|--------|------|--------|-----|-------|----|----|\n");
            for m in &self.results {
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {:.2} | {:.2}% | {:.2}% |\n",
                    m.stock.symbol,
                    m.stock.name,
                    m.stock.sector,
                    m.stock.market_cap,
                    m.change.current_price,
                    m.change.weekly_change(),
                    m.change.monthly_change(),
                ));
            }
            md.push('\n');
        }

        if !self.failures.is_empty() {
            md.push_str("## Failures\n\n");
            md.push_str("| Symbol | Reason | Detail |\n");
            md.push_str("|--------|--------|--------|\n");
            for f in &self.failures {
                md.push_str(&format!("| {} | {} | {} |\n", f.symbol, f.reason, f.message));
            }
            md.push('\n');
        }

        md
    }
}

// ============================================================================
// Tests
// ============================================================================
