//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Request bodies are taken as raw JSON and converted here so that every
//! malformed payload is answered with 400 and an [`ErrorResponse`].

use super::{
    AppState,
    types::{
        ActivitiesResponse, BatchEntry, BatchRequest, BatchResponse, CalculateRequest,
        CalculateResponse, CalculationMetadata, CalculationMethod, EnhancedResponse,
        ErrorResponse, HealthResponse, MAX_BATCH_SIZE, MAX_HISTORY_DAYS, NewActivityRequest,
        NewActivityResponse, PredictRequest, PredictResponse,
    },
};
use crate::store::{ActivityView, RECENT_LIMIT};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use carbonlens_core::{BrowsingEvent, CalculationContext, CarbonCalculator, predict_emissions};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Header carrying the caller's opaque user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// User id recorded when the header is absent.
pub const ANONYMOUS_USER: &str = "anonymous";

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
}

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, Response> {
    serde_json::from_value(body).map_err(|e| bad_request(format!("Invalid request: {e}")))
}

fn user_id(headers: &HeaderMap) -> String {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_USER)
        .to_string()
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// CALCULATE HANDLERS
// =============================================================================

/// Calculate one activity, or record a manual entry.
pub async fn calculate_handler(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let request: CalculateRequest = match parse_body(body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    if let Err(e) = request.validate() {
        return bad_request(e.to_string());
    }

    let (calculation, method) = if request.auto_calculate {
        let context = CalculationContext::now();
        (
            CarbonCalculator::calculate(&request.record, &context),
            CalculationMethod::RuleBased,
        )
    } else {
        (
            CarbonCalculator::manual_entry(&request.record),
            CalculationMethod::Manual,
        )
    };

    let user_id = user_id(&headers);
    tracing::info!(
        user_id = %user_id,
        activity_type = %request.record.activity_type(),
        emissions = calculation.emissions,
        method = ?method,
        "Activity calculated"
    );

    let response = CalculateResponse {
        success: true,
        calculation,
        metadata: CalculationMetadata {
            calculation_method: method,
            timestamp: Utc::now(),
            user_id,
        },
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Calculate several activities in one context.
pub async fn batch_handler(Json(body): Json<Value>) -> Response {
    let request: BatchRequest = match parse_body(body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    if request.activities.len() > MAX_BATCH_SIZE {
        return bad_request(format!(
            "Batch of {} exceeds maximum {}",
            request.activities.len(),
            MAX_BATCH_SIZE
        ));
    }

    let context = CalculationContext::now();
    let results = CarbonCalculator::calculate_batch(&request.activities, &context);
    let calculations = results
        .into_iter()
        .zip(request.activities)
        .map(|(calculation, original_activity)| BatchEntry {
            calculation,
            original_activity,
        })
        .collect();

    (
        StatusCode::OK,
        Json(BatchResponse {
            success: true,
            calculations,
        }),
    )
        .into_response()
}

// =============================================================================
// AI-ENHANCED HANDLER
// =============================================================================

const MISSING_VISIT_FIELDS: &str = "Missing required fields: url, timeOnPage";

fn has_field(body: &Value, keys: &[&str]) -> bool {
    keys.iter()
        .any(|key| body.get(key).is_some_and(|v| !v.is_null()))
}

/// Enhanced browsing calculation. Answers 200 whenever the event parses.
///
/// `url` and `timeOnPage` are required; a blank url or a missing dwell time
/// is a 400.
pub async fn enhanced_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Response {
    if !has_field(&body, &["url"]) || !has_field(&body, &["timeOnPage", "time_on_page_secs"]) {
        return bad_request(MISSING_VISIT_FIELDS);
    }
    let event: BrowsingEvent = match parse_body(body) {
        Ok(e) => e,
        Err(response) => return response,
    };
    if event.url.trim().is_empty() {
        return bad_request(MISSING_VISIT_FIELDS);
    }

    let result = state.calculator.calculate(&event).await;
    (
        StatusCode::OK,
        Json(EnhancedResponse {
            success: true,
            result,
        }),
    )
        .into_response()
}

// =============================================================================
// PREDICT HANDLER
// =============================================================================

/// Project emissions from daily history.
pub async fn predict_handler(Json(body): Json<Value>) -> Response {
    let request: PredictRequest = match parse_body(body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    if request.history.len() > MAX_HISTORY_DAYS {
        return bad_request(format!(
            "History of {} days exceeds maximum {}",
            request.history.len(),
            MAX_HISTORY_DAYS
        ));
    }

    let prediction = predict_emissions(&request.history, request.days);
    (
        StatusCode::OK,
        Json(PredictResponse {
            success: true,
            prediction,
        }),
    )
        .into_response()
}

// =============================================================================
// ACTIVITY LOG HANDLERS
// =============================================================================

/// Log a new activity with its calculation.
pub async fn create_activity_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let request: NewActivityRequest = match parse_body(body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    if let Err(e) = request.validate() {
        return bad_request(e.to_string());
    }

    let now = Utc::now();
    let result = CarbonCalculator::calculate(&request.record, &CalculationContext::now());
    let activity = state
        .activities
        .create(&user_id(&headers), request.record, result, now)
        .await;

    tracing::info!(id = activity.id, user_id = %activity.user_id, "Activity logged");

    (
        StatusCode::OK,
        Json(NewActivityResponse {
            success: true,
            activity,
            message: "Activity added successfully".to_string(),
        }),
    )
        .into_response()
}

/// The caller's ten most recent activities.
pub async fn list_activities_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let user_id = user_id(&headers);
    let now = Utc::now();

    let activities = state
        .activities
        .recent(&user_id, RECENT_LIMIT)
        .await
        .into_iter()
        .map(|activity| ActivityView::new(activity, now))
        .collect();
    let total = state.activities.count(&user_id).await;

    (
        StatusCode::OK,
        Json(ActivitiesResponse {
            success: true,
            activities,
            total,
        }),
    )
        .into_response()
}
