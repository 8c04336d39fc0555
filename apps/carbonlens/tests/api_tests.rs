//! Integration tests for the carbonlens HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

// Tests are serialized on ENV_TEST_MUTEX because they modify env vars.
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, StatusCode, header};
use axum_test::TestServer;
use carbonlens::api::{
    API_KEY_ENV, ActivitiesResponse, AppState, BatchResponse, CalculateResponse,
    CalculationMethod, EnhancedResponse, ErrorResponse, HealthResponse, NewActivityResponse,
    PredictResponse, RATE_LIMIT_ENV, USER_ID_HEADER, create_router,
};
use carbonlens_core::{ActivityCategory, ActivityDetails, Dependency, EmissionUnit, Trend};
use serde_json::json;
use std::sync::Mutex;
use tower::ServiceExt;

static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
        unsafe {
            std::env::remove_var(API_KEY_ENV);
            std::env::remove_var(RATE_LIMIT_ENV);
        }
    }
}

fn lock_env() -> TestGuard {
    let guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe {
        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(RATE_LIMIT_ENV);
    }
    TestGuard { _guard: guard }
}

/// Offline server: every external dependency degrades.
fn create_test_server() -> (TestServer, TestGuard) {
    let guard = lock_env();
    let router = create_router(AppState::offline());
    (TestServer::new(router).unwrap(), guard)
}

fn user(name: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(USER_ID_HEADER),
        HeaderValue::from_static(name),
    )
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// CALCULATE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_calculate_shopping() {
    let (server, _guard) = create_test_server();
    let (name, value) = user("alice");

    let response = server
        .post("/carbon/calculate")
        .add_header(name, value)
        .json(&json!({
            "type": "Shopping",
            "category": "amazon",
            "amount": 100,
            "description": "electronics"
        }))
        .await;

    response.assert_status_ok();
    let body: CalculateResponse = response.json();
    assert!(body.success);
    assert_eq!(body.metadata.calculation_method, CalculationMethod::RuleBased);
    assert_eq!(body.metadata.user_id, "alice");
    assert_eq!(body.calculation.unit, EmissionUnit::Kg);
    // 120 kg, plus the night penalty when run late
    assert!(body.calculation.emissions >= 120.0);
    assert!(body.calculation.emissions <= 132.0);
    assert!((body.calculation.confidence - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn test_calculate_manual_entry() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/carbon/calculate")
        .json(&json!({
            "type": "Energy",
            "category": "heating",
            "amount": 12.5,
            "description": "gas bill",
            "autoCalculate": false
        }))
        .await;

    response.assert_status_ok();
    let body: CalculateResponse = response.json();
    assert_eq!(body.metadata.calculation_method, CalculationMethod::Manual);
    assert_eq!(body.metadata.user_id, "anonymous");
    assert!((body.calculation.emissions - 12.5).abs() < 1e-9);
    assert!((body.calculation.confidence - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_calculate_reads_nested_metadata() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/carbon/calculate")
        .json(&json!({
            "type": "Transportation",
            "category": "uber",
            "description": "ride to the airport",
            "metadata": {"distance": 20, "vehicleType": "premium"}
        }))
        .await;

    response.assert_status_ok();
    let body: CalculateResponse = response.json();
    // 20 km at the premium tier, plus the night penalty when run late
    assert!(body.calculation.emissions >= 7.0);
    assert!(body.calculation.emissions <= 7.7);
    assert!((body.calculation.confidence - 0.8).abs() < 1e-9);
    assert!(
        body.calculation
            .factors
            .contains(&"Vehicle type: premium".to_string())
    );
}

#[tokio::test]
async fn test_batch_accepts_metadata_without_description() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/carbon/calculate/batch")
        .json(&json!({
            "activities": [
                {"type": "Transportation", "category": "uber",
                 "metadata": {"distance": 20, "vehicleType": "premium"}}
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: BatchResponse = response.json();
    let ride = &body.calculations[0];
    assert!(ride.calculation.emissions >= 7.0);
    assert!(ride.calculation.emissions <= 7.7);
    assert_eq!(
        ride.original_activity.details,
        ActivityDetails::Transportation {
            distance_km: Some(20.0),
            vehicle_type: Some("premium".to_string()),
        }
    );
}

#[tokio::test]
async fn test_calculate_missing_fields() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/carbon/calculate")
        .json(&json!({"type": "Shopping", "category": "amazon", "amount": 10}))
        .await;

    response.assert_status_bad_request();
    let body: ErrorResponse = response.json();
    assert!(!body.success);
    assert!(body.error.contains("Missing required fields"));
}

#[tokio::test]
async fn test_calculate_malformed_body() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/carbon/calculate")
        .json(&json!({"category": "amazon", "description": "no type tag"}))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_batch_keeps_order_and_originals() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/carbon/calculate/batch")
        .json(&json!({
            "activities": [
                {"type": "Digital", "category": "gaming", "hours": 10},
                {"type": "Travel", "category": "hotel", "stayType": "hotel", "nights": 2},
                {"type": "Gardening", "category": "compost"}
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: BatchResponse = response.json();
    assert_eq!(body.calculations.len(), 3);
    assert_eq!(body.calculations[0].original_activity.category, "gaming");
    assert_eq!(body.calculations[2].original_activity.category, "compost");
    assert!(body.calculations[1].calculation.emissions > body.calculations[0].calculation.emissions);
}

// =============================================================================
// ENHANCED ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_enhanced_offline_is_degraded_but_ok() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/carbon/ai-enhanced")
        .json(&json!({
            "url": "https://www.netflix.com/browse",
            "timeOnPage": 120,
            "deviceType": "laptop",
            "networkType": "wifi"
        }))
        .await;

    response.assert_status_ok();
    let body: EnhancedResponse = response.json();
    assert_eq!(body.result.unit, EmissionUnit::G);
    assert_eq!(body.result.activity_type, Some(ActivityCategory::Streaming));
    assert!(body.result.degraded.contains(&Dependency::Classification));
    assert!(body.result.degraded.contains(&Dependency::RegionalFactor));
    assert!((body.result.confidence - 0.3).abs() < 1e-9);
}

#[tokio::test]
async fn test_enhanced_bad_url_gets_last_resort() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/carbon/ai-enhanced")
        .json(&json!({"url": "definitely not a url", "timeOnPage": 30}))
        .await;

    response.assert_status_ok();
    let body: EnhancedResponse = response.json();
    assert!((body.result.emissions - 3.5).abs() < 1e-9);
    assert_eq!(body.result.activity_type, Some(ActivityCategory::Other));
}

#[tokio::test]
async fn test_enhanced_requires_url() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/carbon/ai-enhanced")
        .json(&json!({"url": " ", "timeOnPage": 30}))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_enhanced_requires_time_on_page() {
    let (server, _guard) = create_test_server();

    for body in [
        json!({"url": "https://www.netflix.com/browse"}),
        json!({"url": "https://www.netflix.com/browse", "timeOnPage": null}),
    ] {
        let response = server.post("/carbon/ai-enhanced").json(&body).await;

        response.assert_status_bad_request();
        let error: ErrorResponse = response.json();
        assert_eq!(error.error, "Missing required fields: url, timeOnPage");
    }
}

#[tokio::test]
async fn test_enhanced_reads_extension_location() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/carbon/ai-enhanced")
        .json(&json!({
            "url": "https://www.netflix.com/browse",
            "timeOnPage": 120,
            "location": {"lat": 52.52, "lng": 13.40, "country": "DE"}
        }))
        .await;

    response.assert_status_ok();
    let body: EnhancedResponse = response.json();
    assert_eq!(body.result.activity_type, Some(ActivityCategory::Streaming));
}

// =============================================================================
// PREDICT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_predict_increasing_trend() {
    let (server, _guard) = create_test_server();

    let history: Vec<_> = (1..=14)
        .map(|day| {
            json!({
                "date": format!("2024-05-{day:02}"),
                "emissions": if day > 7 { 4.0 } else { 2.0 }
            })
        })
        .collect();

    let response = server
        .post("/carbon/predict")
        .json(&json!({"history": history, "days": 10}))
        .await;

    response.assert_status_ok();
    let body: PredictResponse = response.json();
    assert_eq!(body.prediction.trend, Trend::Increasing);
    assert!((body.prediction.predicted - 40.0).abs() < 1e-9);
    assert_eq!(body.prediction.days, 10);
}

// =============================================================================
// ACTIVITY LOG ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_activity_log_roundtrip() {
    let (server, _guard) = create_test_server();

    for description in ["books", "charger"] {
        let (name, value) = user("bob");
        let response = server
            .post("/carbon/activities")
            .add_header(name, value)
            .json(&json!({
                "type": "Shopping",
                "category": "amazon",
                "amount": 25,
                "description": description
            }))
            .await;
        response.assert_status_ok();
        let created: NewActivityResponse = response.json();
        assert_eq!(created.activity.record.location.as_deref(), Some("Unknown"));
    }

    let (name, value) = user("bob");
    let response = server.get("/carbon/activities").add_header(name, value).await;

    response.assert_status_ok();
    let body: ActivitiesResponse = response.json();
    assert_eq!(body.total, 2);
    assert_eq!(body.activities[0].activity.record.description, "charger");
    assert_eq!(body.activities[0].time_ago, "Just now");

    let (name, value) = user("carol");
    let other: ActivitiesResponse = server
        .get("/carbon/activities")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(other.total, 0);
}

#[tokio::test]
async fn test_activity_rejects_non_positive_amount() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/carbon/activities")
        .json(&json!({
            "type": "Food",
            "category": "doordash",
            "amount": -3,
            "description": "lunch"
        }))
        .await;

    response.assert_status_bad_request();
    let body: ErrorResponse = response.json();
    assert_eq!(body.error, "Invalid event: Amount must be positive");
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

fn create_auth_test_server(api_key: &str) -> (TestServer, TestGuard) {
    let guard = lock_env();
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var(API_KEY_ENV, api_key) };
    let router = create_router(AppState::offline());
    (TestServer::new(router).unwrap(), guard)
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let (server, _guard) = create_auth_test_server("test-secret-key-12345");

    let response = server
        .get("/carbon/activities")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer test-secret-key-12345"),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let (server, _guard) = create_auth_test_server("correct-key");

    let response = server
        .get("/carbon/activities")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer wrong-key"))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let (server, _guard) = create_auth_test_server("correct-key");

    let response = server
        .post("/carbon/calculate")
        .json(&json!({"type": "Other", "category": "x", "description": "y"}))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_auth_health_is_open() {
    let (server, _guard) = create_auth_test_server("correct-key");

    server.get("/health").await.assert_status_ok();
}

// =============================================================================
// RATE LIMIT TESTS
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let _guard = lock_env();
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var(RATE_LIMIT_ENV, "1") };
    let router = create_router(AppState::offline());

    let request = || Request::get("/health").body(Body::empty()).unwrap();
    let first = router.clone().oneshot(request()).await.unwrap();
    let second = router.oneshot(request()).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_rate_limit_zero_installs_no_limiter() {
    let _guard = lock_env();
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var(RATE_LIMIT_ENV, "0") };
    let router = create_router(AppState::offline());

    let request = || Request::get("/health").body(Body::empty()).unwrap();
    for _ in 0..3 {
        let response = router.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
