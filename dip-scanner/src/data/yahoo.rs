//! Yahoo Finance chart API adapter.
//!
//! # Endpoint
//! `GET {base}/v8/finance/chart/{symbol}?range=1mo&interval=1d&includePrePost=true`
//!
//! # Response (success path)
//! ```text
//! chart.result[0].timestamp                 [i64]
//! chart.result[0].indicators.quote[0].close [f64 | null]
//! chart.result[0].indicators.quote[0].volume [u64 | null]   (optional)
//! ```
//!
//! The body is decoded into typed structs and then validated into a
//! [`PriceSeries`]. Anything that does not fit becomes a [`ScanFailure`];
//! nothing is coerced. One attempt per call, bounded by the client timeout.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use dip_common::config::ScannerConfig;
use dip_common::Error;

use super::provider::{FailureKind, PriceHistoryProvider, ScanFailure};
use super::{PriceSample, PriceSeries};

// ============================================================================
// Constants
// ============================================================================

/// Chart endpoint path (symbol appended)
const CHART_ENDPOINT: &str = "/v8/finance/chart";

/// Name reported in payloads as the data source
pub const PROVIDER_NAME: &str = "yahoo_finance";

// ============================================================================
// Symbol Mapping
// ============================================================================

/// Normalize a user-supplied ticker to the provider format.
///
/// "reliance" -> "RELIANCE.NS", "TCS.NS" -> "TCS.NS"
pub fn normalize_symbol(symbol: &str, suffix: &str) -> String {
    let symbol = symbol.trim().to_uppercase();
    let suffix = suffix.to_uppercase();
    if suffix.is_empty() || symbol.ends_with(&suffix) {
        symbol
    } else {
        format!("{}{}", symbol, suffix)
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Option<ChartEnvelope>,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

// ============================================================================
// Configuration
// ============================================================================

/// Request settings for the chart client.
#[derive(Debug, Clone)]
pub struct YahooChartConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub range: String,
    pub interval: String,
    pub include_pre_post: bool,
    pub min_valid_samples: usize,
}

impl Default for YahooChartConfig {
    fn default() -> Self {
        Self::from(&ScannerConfig::default())
    }
}

impl From<&ScannerConfig> for YahooChartConfig {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            base_url: config.provider_base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
            user_agent: config.user_agent.clone(),
            range: config.range.clone(),
            interval: config.interval.clone(),
            include_pre_post: config.include_pre_post,
            min_valid_samples: config.min_valid_samples,
        }
    }
}

// ============================================================================
// Yahoo Chart Client
// ============================================================================

/// Price history client backed by the Yahoo chart API.
pub struct YahooChartClient {
    /// HTTP client (carries the timeout)
    client: reqwest::Client,
    /// Request settings
    config: YahooChartConfig,
}

impl YahooChartClient {
    /// Create a client with the given settings.
    pub fn new(config: YahooChartConfig) -> dip_common::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create from the scanner section of the service config.
    pub fn from_config(config: &ScannerConfig) -> dip_common::Result<Self> {
        Self::new(YahooChartConfig::from(config))
    }

    /// Full chart URL for a symbol.
    fn chart_url(&self, symbol: &str) -> String {
        format!("{}{}/{}", self.config.base_url, CHART_ENDPOINT, symbol)
    }
}

#[async_trait]
impl PriceHistoryProvider for YahooChartClient {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn fetch_history(&self, symbol: &str) -> Result<PriceSeries, ScanFailure> {
        let url = self.chart_url(symbol);
        let include_pre_post = if self.config.include_pre_post { "true" } else { "false" };

        debug!(url = %url, symbol, "Fetching chart from Yahoo");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .query(&[
                ("range", self.config.range.as_str()),
                ("interval", self.config.interval.as_str()),
                ("includePrePost", include_pre_post),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScanFailure::unreachable("Request timeout")
                } else if e.is_connect() {
                    ScanFailure::unreachable("Connection failed")
                } else {
                    ScanFailure::unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ScanFailure::status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScanFailure::unreachable(format!("Failed to read body: {}", e)))?;

        parse_chart(symbol, &body, self.config.min_valid_samples)
    }
}

// ============================================================================
// Response Validation
// ============================================================================

/// Decode and validate a chart response body.
pub(crate) fn parse_chart(
    symbol: &str,
    body: &str,
    min_valid: usize,
) -> Result<PriceSeries, ScanFailure> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| ScanFailure::malformed(format!("Failed to parse response: {}", e)))?;

    let chart = response
        .chart
        .ok_or_else(|| ScanFailure::malformed("missing chart"))?;

    let result = match chart.result {
        Some(results) if !results.is_empty() => results.into_iter().next(),
        _ => None,
    };

    let Some(result) = result else {
        let detail = chart
            .error
            .map(|e| {
                format!(
                    "{}: {}",
                    e.code.unwrap_or_else(|| "error".into()),
                    e.description.unwrap_or_default()
                )
            })
            .unwrap_or_else(|| "empty result".into());
        return Err(ScanFailure::malformed(format!("missing chart result ({})", detail)));
    };

    // A result without timestamps is how the provider reports "no trades".
    let Some(timestamps) = result.timestamp else {
        return Err(ScanFailure::new(
            FailureKind::InsufficientData,
            format!("{} returned no samples", symbol),
        ));
    };

    let quote = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .ok_or_else(|| ScanFailure::malformed("missing indicators.quote[0]"))?;

    let closes = quote
        .close
        .ok_or_else(|| ScanFailure::malformed("missing indicators.quote[0].close"))?;

    if closes.len() != timestamps.len() {
        return Err(ScanFailure::malformed(format!(
            "close series has {} entries for {} timestamps",
            closes.len(),
            timestamps.len()
        )));
    }

    let volumes = match quote.volume {
        Some(v) if v.len() != timestamps.len() => {
            return Err(ScanFailure::malformed(format!(
                "volume series has {} entries for {} timestamps",
                v.len(),
                timestamps.len()
            )));
        }
        Some(v) => v,
        None => vec![None; timestamps.len()],
    };

    let samples = timestamps
        .into_iter()
        .zip(closes)
        .zip(volumes)
        .map(|((ts, close), volume)| PriceSample::new(ts, close, volume))
        .collect();

    PriceSeries::new(symbol, samples, min_valid)
}

// ============================================================================
// Tests
// ============================================================================
