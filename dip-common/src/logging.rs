//! Logging setup for the dip scanner.
//!
//! HTTP transport crates log every connection and frame at debug level.
//! They are capped at `warn` so a debug-level scan log shows provider calls
//! and pacing, not connection pool churn.

use std::str::FromStr;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;

/// Transport modules capped at `warn`.
pub const NOISY_MODULES: &[&str] = &[
    "hyper",
    "hyper_util",
    "reqwest",
    "h2",
    "rustls",
    "tower_http",
];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event, with source location
    Json,
    /// Human-readable, colored
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Filter directives: the base level, then `target=warn` per noisy or
/// excluded target.
fn build_directives(log_level: &str, excluded_targets: &[String]) -> String {
    NOISY_MODULES
        .iter()
        .copied()
        .chain(excluded_targets.iter().map(String::as_str))
        .fold(log_level.to_lowercase(), |mut directives, target| {
            directives.push(',');
            directives.push_str(target);
            directives.push_str("=warn");
            directives
        })
}

/// Install the global subscriber for the configured level and format.
///
/// `RUST_LOG`, when set, replaces the computed filter entirely. Calling this
/// again after a subscriber is installed has no effect.
pub fn init_logging(config: &ObservabilityConfig) {
    let format: LogFormat = config.log_format.parse().unwrap_or_default();
    let directives = build_directives(&config.log_level, &config.excluded_targets);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);
            let _ = subscriber.with(fmt_layer).try_init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(true);
            let _ = subscriber.with(fmt_layer).try_init();
        }
    }

    tracing::info!(
        log_level = %config.log_level,
        log_format = ?format,
        directives = %directives,
        "Logging initialized"
    );
}
