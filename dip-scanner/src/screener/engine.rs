//! Scan engine.
//!
//! Runs one scan sequentially:
//! 1. Resolve the requested universe (unknown ids fall back to the default)
//! 2. Drop entries rejected by the market-cap and sector filters
//! 3. For each remaining symbol, wait for the pacing limiter, fetch the
//!    history and compute its changes
//! 4. Keep the symbols whose changes meet both thresholds
//!
//! A symbol that cannot be evaluated is counted as failed and never aborts
//! the scan.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use super::change::{compute_change, ChangeResult};
use super::criteria::ScanCriteria;
use super::report::{
    FailurePayload, MatchedStock, QuotePayload, ScanOutcome, ScanReport, ScanStats,
    SymbolFailure, SymbolOutcome,
};
use crate::data::{normalize_symbol, PriceHistoryProvider, RateLimiter, ScanFailure};
use crate::universe::Catalog;

/// Default number of processed symbols between progress logs.
pub const DEFAULT_PROGRESS_EVERY: usize = 10;

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative cancellation flag, checked before each symbol.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Scan Engine
// ============================================================================

/// Sequential, paced screener over a catalog universe.
pub struct ScanEngine<P: PriceHistoryProvider + ?Sized> {
    provider: Arc<P>,
    catalog: Arc<Catalog>,
    /// Spacing between consecutive provider calls within one scan
    pacing: Duration,
    progress_every: usize,
    /// Appended to symbols without an exchange suffix
    symbol_suffix: String,
}

impl<P: PriceHistoryProvider + ?Sized> ScanEngine<P> {
    /// Create an engine pacing provider calls `pacing` apart.
    pub fn new(provider: Arc<P>, catalog: Arc<Catalog>, pacing: Duration) -> Self {
        Self {
            provider,
            catalog,
            pacing,
            progress_every: DEFAULT_PROGRESS_EVERY,
            symbol_suffix: ".NS".to_string(),
        }
    }

    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every.max(1);
        self
    }

    pub fn with_symbol_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.symbol_suffix = suffix.into();
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Run a scan to completion.
    pub async fn scan(&self, criteria: &ScanCriteria) -> ScanReport {
        self.scan_with_cancel(criteria, &CancellationFlag::new()).await
    }

    /// Run a scan, stopping before the next symbol once `cancel` is raised.
    ///
    /// A cancelled scan returns the partial report with `cancelled` set.
    pub async fn scan_with_cancel(
        &self,
        criteria: &ScanCriteria,
        cancel: &CancellationFlag,
    ) -> ScanReport {
        let started_at = Utc::now();
        let scan_id = format!("scan_{}", started_at.format("%Y%m%d_%H%M%S%3f"));

        let requested = criteria
            .universe
            .clone()
            .unwrap_or_else(|| self.catalog.default_universe().to_string());
        let (universe, stocks) = self.catalog.list_universe(&requested);
        if universe.as_str() != requested.trim().to_lowercase() {
            warn!(requested = %requested, resolved = %universe, "Unknown universe, using default");
        }

        let eligible: Vec<_> = stocks.iter().filter(|s| criteria.admits(s)).collect();

        info!(
            scan_id = %scan_id,
            universe = %universe,
            universe_size = stocks.len(),
            eligible = eligible.len(),
            criteria = %criteria.describe(),
            "Starting dip scan"
        );

        let limiter = RateLimiter::fixed_interval(scan_id.clone(), self.pacing);
        let mut stats = ScanStats {
            universe_size: stocks.len(),
            eligible: eligible.len(),
            filters_applied: criteria.filters_applied(),
            ..Default::default()
        };
        let mut results = Vec::new();
        let mut failures = Vec::new();
        let mut cancelled = false;

        for stock in eligible {
            if cancel.is_cancelled() {
                warn!(scan_id = %scan_id, processed = stats.processed, "Scan cancelled");
                cancelled = true;
                break;
            }

            limiter.acquire().await;
            stats.processed += 1;

            match self.evaluate(&stock.symbol).await {
                Ok(change) => {
                    stats.succeeded += 1;
                    if criteria.is_match(&change) {
                        info!(
                            symbol = %stock.symbol,
                            weekly = change.weekly_change(),
                            monthly = change.monthly_change(),
                            "Match"
                        );
                        results.push(MatchedStock::new(stock.clone(), change, self.provider.name()));
                    }
                }
                Err(failure) => {
                    stats.failed += 1;
                    warn!(symbol = %stock.symbol, reason = %failure.kind, error = %failure.message, "Symbol failed");
                    failures.push(SymbolFailure {
                        symbol: stock.symbol.clone(),
                        reason: failure.kind,
                        message: failure.message,
                    });
                }
            }

            if stats.processed % self.progress_every == 0 {
                info!(
                    scan_id = %scan_id,
                    processed = stats.processed,
                    eligible = stats.eligible,
                    succeeded = stats.succeeded,
                    failed = stats.failed,
                    matches = results.len(),
                    "Scan progress"
                );
            }
        }

        let report = ScanReport::build(ScanOutcome {
            scan_id,
            requested_universe: requested,
            resolved_universe: universe,
            criteria: criteria.clone(),
            stats,
            results,
            failures,
            cancelled,
            started_at,
        });

        info!(
            scan_id = %report.scan_id,
            matches = report.total_matches,
            duration = format!("{:.1}s", report.duration_secs),
            "Dip scan complete: {}",
            report.summary()
        );

        report
    }

    /// Fetch and compute one symbol. No pacing, no matching.
    pub async fn evaluate(&self, symbol: &str) -> Result<ChangeResult, ScanFailure> {
        let series = self.provider.fetch_history(symbol).await?;
        compute_change(&series)
    }

    /// Diagnostic evaluation of a single, possibly unsuffixed, symbol.
    pub async fn test_symbol(&self, symbol: &str) -> (String, SymbolOutcome) {
        let symbol = normalize_symbol(symbol, &self.symbol_suffix);
        let outcome = match self.evaluate(&symbol).await {
            Ok(change) => SymbolOutcome::Success(QuotePayload::new(change, self.provider.name())),
            Err(failure) => {
                warn!(symbol = %symbol, reason = %failure.kind, "Test symbol failed");
                SymbolOutcome::Failed(FailurePayload::new(symbol.clone(), failure))
            }
        };
        (symbol, outcome)
    }
}

// ============================================================================
// Tests
// ============================================================================
