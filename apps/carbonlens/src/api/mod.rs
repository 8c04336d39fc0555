//! # Carbonlens HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /carbon/calculate` - Rule-based calculation of one activity
//! - `POST /carbon/calculate/batch` - Rule-based calculation of many activities
//! - `POST /carbon/ai-enhanced` - Service-assisted browsing calculation
//! - `POST /carbon/predict` - Emission trend projection
//! - `POST /carbon/activities` - Log an activity
//! - `GET /carbon/activities` - Recent activities of the caller
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `CARBONLENS_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `CARBONLENS_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `CARBONLENS_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{API_KEY_ENV, get_api_key_from_env};
pub use handlers::{ANONYMOUS_USER, USER_ID_HEADER};
pub use middleware::{RATE_LIMIT_ENV, create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    ActivitiesResponse, BatchEntry, BatchRequest, BatchResponse, CalculateRequest,
    CalculateResponse, CalculationMetadata, CalculationMethod, EnhancedResponse, ErrorResponse,
    HealthResponse, MAX_BATCH_SIZE, MAX_HISTORY_DAYS, NewActivityRequest, NewActivityResponse,
    PredictRequest, PredictResponse,
};

use crate::engine::EnhancedCalculator;
use crate::store::{ActivityLog, InMemoryActivityLog};
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use carbonlens_core::CarbonError;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const CORS_ORIGINS_ENV: &str = "CARBONLENS_CORS_ORIGINS";

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub calculator: EnhancedCalculator,
    pub activities: Arc<dyn ActivityLog>,
}

impl AppState {
    /// State with the given calculator and an empty in-memory activity log.
    #[must_use]
    pub fn new(calculator: EnhancedCalculator) -> Self {
        Self::with_activity_log(calculator, Arc::new(InMemoryActivityLog::new()))
    }

    #[must_use]
    pub fn with_activity_log(
        calculator: EnhancedCalculator,
        activities: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            calculator,
            activities,
        }
    }

    /// State without external services.
    #[must_use]
    pub fn offline() -> Self {
        Self::new(EnhancedCalculator::offline())
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

fn allowed_headers() -> [HeaderName; 3] {
    [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        HeaderName::from_static(USER_ID_HEADER),
    ]
}

/// Build the CORS layer from `CARBONLENS_CORS_ORIGINS`.
///
/// "*" allows every origin, a comma-separated list allows those origins, and
/// anything else (including unset) allows localhost only.
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var(CORS_ORIGINS_ENV).ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!("CORS: allowing ALL origins ({CORS_ORIGINS_ENV}=*)");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| match s.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(origin = s, error = %e, "CORS: ignoring invalid origin");
                        None
                    }
                })
                .collect();

            if allowed.is_empty() {
                tracing::warn!("CORS: no valid origins configured, allowing localhost only");
                build_localhost_cors()
            } else {
                tracing::info!(origins = allowed.len(), "CORS: allowing configured origins");
                CorsLayer::new()
                    .allow_origin(allowed)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers(allowed_headers())
            }
        }
        None => build_localhost_cors(),
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(allowed_headers())
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit, rate
/// limiting (if enabled), authentication (if configured).
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!(requests_per_second = rate_limit, "Rate limiting enabled");
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED. Set {API_KEY_ENV} to require a bearer token."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/carbon/calculate", post(handlers::calculate_handler))
        .route("/carbon/calculate/batch", post(handlers::batch_handler))
        .route("/carbon/ai-enhanced", post(handlers::enhanced_handler))
        .route("/carbon/predict", post(handlers::predict_handler))
        .route(
            "/carbon/activities",
            post(handlers::create_activity_handler).get(handlers::list_activities_handler),
        );

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bind `addr` and serve until the process is stopped.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), CarbonError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CarbonError::IoError(format!("Bind failed: {e}")))?;

    tracing::info!(%addr, "carbonlens HTTP server listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| CarbonError::IoError(format!("Server error: {e}")))
}
