//! HTTP routes for the dip scanner service.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use dip_common::Error;

use crate::screener::{ReportFormat, ScanCriteria, ScanRequest, SymbolOutcome};
use crate::universe::{StockRef, UniverseId};
use crate::ScannerState;

const SERVICE_NAME: &str = "dip-scanner";

// ============================================================================
// Error Response
// ============================================================================

/// Request-level error rendered as `{ "error": ..., "code": ... }`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }

        let body = ErrorBody {
            error: self.0.to_string(),
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
    pub data_source: String,
    pub universes: Vec<UniverseId>,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub universes_available: Vec<UniverseId>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UniverseResponse {
    pub universe_type: String,
    pub resolved_universe: UniverseId,
    pub stocks: Vec<StockRef>,
    pub total: usize,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TestStockResponse {
    pub symbol: String,
    pub data: SymbolOutcome,
    pub timestamp: DateTime<Utc>,
}

/// Query string of `POST /scan`.
#[derive(Debug, Default, Deserialize)]
pub struct ScanQuery {
    /// "json" (default) or "markdown"
    #[serde(default)]
    pub format: Option<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Service descriptor
pub async fn home() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        data_source: "Yahoo Finance chart API".to_string(),
        universes: UniverseId::ALL.to_vec(),
        endpoints: vec![
            EndpointInfo {
                method: "GET",
                path: "/health",
                description: "Health check",
            },
            EndpointInfo {
                method: "GET",
                path: "/stock-universe/{universe}",
                description: "List a stock universe (nifty50/nifty100/nifty200/nifty500)",
            },
            EndpointInfo {
                method: "POST",
                path: "/scan",
                description: "Scan a universe for weekly and monthly declines",
            },
            EndpointInfo {
                method: "GET",
                path: "/test-stock/{symbol}",
                description: "Fetch and evaluate a single symbol",
            },
        ],
    })
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: SERVICE_NAME.to_string(),
        universes_available: UniverseId::ALL.to_vec(),
        timestamp: Utc::now(),
    })
}

/// List the constituents of a universe
pub async fn stock_universe(
    State(state): State<Arc<ScannerState>>,
    Path(universe): Path<String>,
) -> Json<UniverseResponse> {
    let (resolved, stocks) = state.catalog.list_universe(&universe);
    let total = stocks.len();

    Json(UniverseResponse {
        universe_type: universe,
        resolved_universe: resolved,
        stocks: stocks.to_vec(),
        total,
        source: "static_curated_list".to_string(),
        timestamp: Utc::now(),
        message: format!("Successfully got {} stocks for {}", total, resolved),
    })
}

/// Run a scan.
///
/// An empty body scans with default criteria.
pub async fn scan(
    State(state): State<Arc<ScannerState>>,
    Query(query): Query<ScanQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let format = match query.format.as_deref() {
        Some(f) => f.parse::<ReportFormat>().map_err(Error::InvalidInput)?,
        None => ReportFormat::Json,
    };

    let request = parse_scan_request(&body)?;
    let criteria = ScanCriteria::try_from(request)?;

    let report = state.engine.scan(&criteria).await;
    let body = report.render(format)?;

    Ok(([(header::CONTENT_TYPE, format.content_type())], body).into_response())
}

/// Parse a scan body. Only a JSON object (or nothing) is accepted.
fn parse_scan_request(body: &[u8]) -> Result<ScanRequest, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ScanRequest::default());
    }

    let invalid =
        |e: serde_json::Error| Error::InvalidInput(format!("Invalid scan request body: {}", e));
    match serde_json::from_slice::<Value>(body).map_err(invalid)? {
        object @ Value::Object(_) => serde_json::from_value(object).map_err(invalid),
        other => Err(Error::InvalidInput(format!(
            "Invalid scan request body: expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Evaluate one symbol without pacing
pub async fn test_stock(
    State(state): State<Arc<ScannerState>>,
    Path(symbol): Path<String>,
) -> Json<TestStockResponse> {
    let (symbol, data) = state.engine.test_symbol(&symbol).await;

    Json(TestStockResponse {
        symbol,
        data,
        timestamp: Utc::now(),
    })
}

// ============================================================================
// Tests
// ============================================================================
