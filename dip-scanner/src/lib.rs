//! Dip Scanner Library
//!
//! HTTP service that screens Indian equity universes (Nifty 50/100/200/500)
//! for stocks that fell by at least a given percentage over both the last
//! week and the last month, using daily closes from the Yahoo chart API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     dip-scanner (Rust Service)                      │
//! │                               :5000                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐      │
//! │  │  Universe       │  │  Scan           │  │  Yahoo Chart    │      │
//! │  │  Catalog        │  │  Engine         │  │  Client         │      │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Reference prices
//! - Week and month cutoffs are 7 and 30 days before the newest sample
//! - The reference is the last valid close at or before a cutoff
//! - When the history is shorter than a window, the earliest close is used
//!
//! ## Pacing
//! - Provider calls within a scan are spaced by a fixed interval
//! - Each scan paces independently of concurrent scans

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod routes;
pub mod screener;
pub mod universe;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use http::{request::Parts, HeaderValue};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

use dip_common::config::{Config, CorsConfig};

use crate::data::{PriceHistoryProvider, YahooChartClient};
use crate::screener::ScanEngine;
use crate::universe::Catalog;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Scanner service state
pub struct ScannerState {
    /// Resolved configuration
    pub config: Config,
    /// Universe catalog
    pub catalog: Arc<Catalog>,
    /// Scan engine over the configured provider
    pub engine: Arc<ScanEngine<dyn PriceHistoryProvider>>,
}

impl ScannerState {
    /// Assemble state around an existing provider and catalog.
    pub fn new(config: Config, provider: Arc<dyn PriceHistoryProvider>, catalog: Catalog) -> Self {
        let catalog = Arc::new(catalog);
        let engine = ScanEngine::new(provider, catalog.clone(), config.scanner.pacing_delay())
            .with_progress_every(config.scanner.progress_every)
            .with_symbol_suffix(config.scanner.symbol_suffix.clone());

        Self {
            config,
            catalog,
            engine: Arc::new(engine),
        }
    }

    /// Build state with the Yahoo chart client and the configured catalog.
    pub fn from_config(config: Config) -> Result<Self> {
        let provider = YahooChartClient::from_config(&config.scanner)?;
        let catalog = Catalog::load(&config.scanner)?;

        tracing::info!(
            provider = provider.name(),
            base_url = %config.scanner.provider_base_url,
            pacing_ms = config.scanner.pacing_delay_ms,
            default_universe = %catalog.default_universe(),
            "Scanner state initialized"
        );

        Ok(Self::new(config, Arc::new(provider), catalog))
    }
}

/// Build the CORS layer for a resolved policy.
pub fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if cors.debug_mode {
        return layer.allow_origin(Any);
    }

    let policy = cors.clone();
    layer.allow_origin(AllowOrigin::predicate(
        move |origin: &HeaderValue, _parts: &Parts| {
            origin.to_str().map(|o| policy.allows(o)).unwrap_or(false)
        },
    ))
}

/// Build the HTTP router with all routes and middleware.
pub fn build_router(state: Arc<ScannerState>) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/", get(routes::home))
        .route("/health", get(routes::health))
        .route("/stock-universe/:universe", get(routes::stock_universe))
        .route("/scan", post(routes::scan))
        .route("/test-stock/:symbol", get(routes::test_stock))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Main scanner service
pub struct ScannerService {
    state: Arc<ScannerState>,
}

impl ScannerService {
    /// Create the service with the default provider and catalog.
    pub fn new(config: Config) -> Result<Self> {
        let state = Arc::new(ScannerState::from_config(config)?);
        Ok(Self { state })
    }

    /// Start the HTTP server and run until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self.state.config.network.address().parse()?;
        let app = build_router(self.state.clone());

        tracing::info!(
            address = %addr,
            deployment = %self.state.config.deployment,
            cors_debug = self.state.config.cors.debug_mode,
            "Starting HTTP server"
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
