//! Decline screener.
//!
//! Finds stocks in a universe whose price fell by at least the requested
//! percentages over the trailing week and month.
//!
//! # Components
//! - **change**: reference-price lookup and percentage changes
//! - **criteria**: request validation, filters and match predicate
//! - **engine**: paced, sequential scan over a universe
//! - **report**: scan report and per-symbol payloads

mod change;
mod criteria;
mod engine;
mod report;

pub use change::{compute_change, round2, ChangeResult, MONTH_SECS, WEEK_SECS};
pub use criteria::{
    MarketCapFilter, ScanCriteria, ScanRequest, SectorFilter, DEFAULT_MONTHLY_THRESHOLD,
    DEFAULT_WEEKLY_THRESHOLD,
};
pub use engine::{CancellationFlag, ScanEngine, DEFAULT_PROGRESS_EVERY};
pub use report::{
    FailurePayload, MatchedStock, QuotePayload, ReportFormat, ScanReport, ScanStats,
    SymbolFailure, SymbolOutcome, SymbolStatus, FAILURE_NOTE,
};
