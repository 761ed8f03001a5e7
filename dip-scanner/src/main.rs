//! Dip Scanner - screens Nifty universes for weekly and monthly declines.
//!
//! Serves the scan API over HTTP, using daily closes from the Yahoo chart
//! API and a curated NSE universe catalog.

use anyhow::Result;
use dip_common::config::{config_path, Config};
use dip_common::logging::init_logging;
use dip_scanner::ScannerService;

#[tokio::main]
async fn main() -> Result<()> {
    // Start timing immediately for cold-start measurement
    let startup_start = std::time::Instant::now();

    // Load configuration (file, then environment)
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging(&config.observability);

    tracing::info!("Dip Scanner v{}", env!("CARGO_PKG_VERSION"));

    match &config.source {
        Some(path) => tracing::info!(path = %path.display(), "Loaded config file"),
        None => tracing::info!(
            path = %config_path().display(),
            "Config file not found, using defaults"
        ),
    }

    config.validate()?;

    let service = ScannerService::new(config)?;

    // Log startup timing before entering main service loop
    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
