//! Integration tests for the scanner HTTP API.
//!
//! Drives the full router with a mock price history provider and no pacing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use dip_common::config::{Config, CorsConfig, ScannerConfig};
use dip_scanner::data::{PriceHistoryProvider, PriceSample, PriceSeries, ScanFailure};
use dip_scanner::universe::{Catalog, UniverseId};
use dip_scanner::{build_router, ScannerState};

const DAY: i64 = 86_400;
const T0: i64 = 1_700_000_000;

// ============================================================================
// Mock Provider
// ============================================================================

/// Serves canned daily closes; unknown symbols answer HTTP 404.
struct MockProvider {
    closes: HashMap<String, Vec<f64>>,
    calls: AtomicUsize,
}

impl MockProvider {
    fn new(entries: &[(&str, Vec<f64>)]) -> Self {
        Self {
            closes: entries
                .iter()
                .map(|(s, c)| (s.to_string(), c.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PriceHistoryProvider for MockProvider {
    fn name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch_history(&self, symbol: &str) -> Result<PriceSeries, ScanFailure> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let closes = self
            .closes
            .get(symbol)
            .ok_or_else(|| ScanFailure::status(404))?;
        let samples = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PriceSample::new(T0 + i as i64 * DAY, Some(*c), Some(5_000)))
            .collect();
        PriceSeries::new(symbol, samples, 7)
    }
}

/// 31 daily closes: `month` until day 22, `week` from day 23, `current` last.
fn closes(month: f64, week: f64, current: f64) -> Vec<f64> {
    let mut closes = vec![month; 31];
    for c in closes.iter_mut().skip(23) {
        *c = week;
    }
    closes[30] = current;
    closes
}

// ============================================================================
// Test Helpers
// ============================================================================

struct TestApp {
    router: Router,
    provider: Arc<MockProvider>,
    _dir: TempDir,
}

fn create_test_app_with(cors: CorsConfig) -> TestApp {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("nifty50.json"),
        json!([
            {"symbol": "AAA.NS", "name": "Alpha Industries", "sector": "it", "marketCap": "large"},
            {"symbol": "BBB.NS", "name": "Beta Bank", "sector": "banking", "marketCap": "mid"},
            {"symbol": "CCC.NS", "name": "Gamma Pharma", "sector": "pharma", "marketCap": "large"}
        ])
        .to_string(),
    )
    .unwrap();

    let config = Config {
        cors,
        scanner: ScannerConfig {
            pacing_delay_ms: 0,
            universe_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        },
        ..Default::default()
    };

    let provider = Arc::new(MockProvider::new(&[
        ("AAA.NS", closes(125.0, 110.0, 100.0)),
        ("BBB.NS", closes(100.0, 100.0, 102.0)),
    ]));
    let catalog = Catalog::load(&config.scanner).unwrap();
    let state = ScannerState::new(config, provider.clone(), catalog);

    TestApp {
        router: build_router(Arc::new(state)),
        provider,
        _dir: dir,
    }
}

fn create_test_app() -> TestApp {
    create_test_app_with(CorsConfig::default())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_scan(app: &Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/scan")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

// ============================================================================
// Service Endpoints
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let (status, body) = get_json(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "dip-scanner");
    assert_eq!(
        body["universes_available"],
        json!(["nifty50", "nifty100", "nifty200", "nifty500"])
    );
}

#[tokio::test]
async fn test_home_lists_endpoints() {
    let app = create_test_app();
    let (status, body) = get_json(&app.router, "/").await;

    assert_eq!(status, StatusCode::OK);
    let paths: Vec<&str> = body["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"/scan"));
    assert!(paths.contains(&"/test-stock/{symbol}"));
}

// ============================================================================
// Stock Universe
// ============================================================================

#[tokio::test]
async fn test_stock_universe() {
    let app = create_test_app();
    let (status, body) = get_json(&app.router, "/stock-universe/nifty50").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["universe_type"], "nifty50");
    assert_eq!(body["total"], 3);
    assert_eq!(body["stocks"][0]["symbol"], "AAA.NS");
    assert_eq!(body["stocks"][0]["marketCap"], "large");
    assert_eq!(body["source"], "static_curated_list");
}

#[tokio::test]
async fn test_unknown_universe_resolves_to_default() {
    let app = create_test_app();
    let (status, body) = get_json(&app.router, "/stock-universe/sensex").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["universe_type"], "sensex");
    assert_eq!(body["resolved_universe"], "nifty100");
    assert_eq!(body["total"], 100);
}

// ============================================================================
// Scan
// ============================================================================

#[tokio::test]
async fn test_scan_reports_matches_and_failures() {
    let app = create_test_app();
    let (status, body) = post_scan(
        &app.router,
        r#"{"weeklyThreshold": 5, "monthlyThreshold": "10", "stockUniverse": "nifty50"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_matches"], 1);
    assert_eq!(body["stock_universe"], "nifty50");
    assert_eq!(body["universe_size"], 3);
    assert_eq!(body["processed"], 3);
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed_count"], 1);
    assert_eq!(body["success_rate"], "66.7%");
    assert_eq!(body["cancelled"], false);

    let first = &body["results"][0];
    assert_eq!(first["symbol"], "AAA.NS");
    assert_eq!(first["name"], "Alpha Industries");
    assert_eq!(first["currentPrice"], 100.0);
    assert_eq!(first["priceOneWeekAgo"], 110.0);
    assert_eq!(first["priceOneMonthAgo"], 125.0);
    assert_eq!(first["weeklyChange"], -9.09);
    assert_eq!(first["monthlyChange"], -20.0);
    assert_eq!(first["volume"], 5000);
    assert_eq!(first["status"], "success");
    assert_eq!(first["source"], "yahoo_finance");

    assert_eq!(body["failures"][0]["symbol"], "CCC.NS");
    assert_eq!(body["failures"][0]["reason"], "provider_error_status");
    assert_eq!(body["criteria"]["monthlyThreshold"], 10.0);
    assert_eq!(app.provider.call_count(), 3);
}

#[tokio::test]
async fn test_scan_filters_before_fetching() {
    let app = create_test_app();
    let (status, body) = post_scan(
        &app.router,
        r#"{"marketCapFilter": "mid", "stockUniverse": "nifty50"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eligible"], 1);
    assert_eq!(body["filters_applied"], 1);
    assert_eq!(body["processed"], 1);
    assert_eq!(body["total_matches"], 0);
    assert_eq!(app.provider.call_count(), 1);
}

#[tokio::test]
async fn test_scan_with_empty_body_uses_defaults() {
    let app = create_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/scan")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app.router, request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resolved_universe"], "nifty100");
    assert_eq!(body["criteria"]["weeklyThreshold"], 5.0);
    assert_eq!(body["criteria"]["marketCapFilter"], "all");
    assert_eq!(body["processed"], 100);
    assert_eq!(body["failed_count"], 100);
    assert_eq!(body["success_rate"], "0.0%");
}

#[tokio::test]
async fn test_scan_rejects_invalid_criteria() {
    let app = create_test_app();

    for payload in [
        r#"{"weeklyThreshold": -5}"#,
        r#"{"monthlyThreshold": "ten"}"#,
        r#"{"marketCapFilter": "mega"}"#,
        r#"{"weeklyThreshold": "#,
    ] {
        let (status, body) = post_scan(&app.router, payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {}", payload);
        assert_eq!(body["code"], 400);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid input"));
    }

    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn test_scan_rejects_non_object_body() {
    let app = create_test_app();

    for payload in ["[1, 2]", "null", "7", r#""nifty50""#] {
        let (status, body) = post_scan(&app.router, payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {}", payload);
        assert_eq!(body["code"], 400);
    }

    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn test_scan_markdown_format() {
    let app = create_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/scan?format=markdown")
        .body(Body::from(r#"{"stockUniverse": "nifty50"}"#))
        .unwrap();
    let (status, headers, body) = send(&app.router, request).await;
    let text = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/markdown"));
    assert!(text.contains("# Dip Scan Report"));
    assert!(text.contains("| AAA.NS | Alpha Industries |"));
}

#[tokio::test]
async fn test_scan_unknown_format_is_rejected() {
    let app = create_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/scan?format=pdf")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Test Stock
// ============================================================================

#[tokio::test]
async fn test_test_stock_appends_suffix() {
    let app = create_test_app();
    let (status, body) = get_json(&app.router, "/test-stock/aaa").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "AAA.NS");
    assert_eq!(body["data"]["status"], "success");
    assert_eq!(body["data"]["symbol"], "AAA.NS");
    assert_eq!(body["data"]["weeklyChange"], -9.09);
}

#[tokio::test]
async fn test_test_stock_failure_payload() {
    let app = create_test_app();
    let (status, body) = get_json(&app.router, "/test-stock/ZZZ.NS").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "ZZZ.NS");
    assert_eq!(body["data"]["status"], "failed");
    assert_eq!(body["data"]["reason"], "provider_error_status");
    assert_eq!(body["data"]["note"], "This stock will be excluded from scan results");
}

// ============================================================================
// CORS
// ============================================================================

#[tokio::test]
async fn test_production_cors_allows_listed_origins_only() {
    let app = create_test_app_with(CorsConfig {
        allowed_origins: vec!["https://*.vercel.app".to_string()],
        debug_mode: false,
    });

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://preview-123.vercel.app")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&app.router, request).await;
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://preview-123.vercel.app"
    );

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn test_debug_cors_allows_any_origin() {
    let app = create_test_app();
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&app.router, request).await;
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[test]
fn test_catalog_default_is_nifty100() {
    let catalog = Catalog::load(&ScannerConfig::default()).unwrap();
    assert_eq!(catalog.default_universe(), UniverseId::Nifty100);
}
