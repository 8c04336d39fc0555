//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use crate::store::{ActivityView, StoredActivity};
use carbonlens_core::{
    ActivityRecord, CalculationResult, CarbonError, DailyEmission, Prediction,
    trend::DEFAULT_HORIZON_DAYS,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of records accepted by one batch request.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Maximum number of days accepted by one prediction request.
pub const MAX_HISTORY_DAYS: usize = 3660;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

// =============================================================================
// CALCULATE REQUEST/RESPONSE
// =============================================================================

fn default_true() -> bool {
    true
}

/// Single activity calculation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateRequest {
    #[serde(flatten)]
    pub record: ActivityRecord,

    /// `false` records `amount` as the emission without calculating.
    #[serde(default = "default_true", alias = "autoCalculate")]
    pub auto_calculate: bool,
}

impl CalculateRequest {
    /// Category and description are required. Unusable amounts are left to
    /// the calculator, which treats them as absent.
    pub fn validate(&self) -> Result<(), CarbonError> {
        if self.record.category.trim().is_empty() || self.record.description.trim().is_empty() {
            return Err(CarbonError::InvalidEvent(
                "Missing required fields: type, category, description".to_string(),
            ));
        }
        Ok(())
    }
}

/// How a result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    RuleBased,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationMetadata {
    pub calculation_method: CalculationMethod,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
}

/// Single activity calculation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateResponse {
    pub success: bool,
    pub calculation: CalculationResult,
    pub metadata: CalculationMetadata,
}

// =============================================================================
// BATCH REQUEST/RESPONSE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub activities: Vec<ActivityRecord>,
}

/// One batch result next to the record it was calculated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    #[serde(flatten)]
    pub calculation: CalculationResult,
    pub original_activity: ActivityRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    pub calculations: Vec<BatchEntry>,
}

// =============================================================================
// AI-ENHANCED RESPONSE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedResponse {
    pub success: bool,
    pub result: CalculationResult,
}

// =============================================================================
// PREDICT REQUEST/RESPONSE
// =============================================================================

fn default_horizon() -> u32 {
    DEFAULT_HORIZON_DAYS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub history: Vec<DailyEmission>,
    #[serde(default = "default_horizon")]
    pub days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub prediction: Prediction,
}

// =============================================================================
// ACTIVITY LOG REQUEST/RESPONSE
// =============================================================================

/// Request to log a new activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivityRequest {
    #[serde(flatten)]
    pub record: ActivityRecord,
}

impl NewActivityRequest {
    /// Category, description and a positive amount are required.
    pub fn validate(&self) -> Result<(), CarbonError> {
        if self.record.category.trim().is_empty() || self.record.description.trim().is_empty() {
            return Err(CarbonError::InvalidEvent(
                "Missing required fields".to_string(),
            ));
        }
        match self.record.amount {
            None => Err(CarbonError::InvalidEvent(
                "Missing required fields".to_string(),
            )),
            Some(amount) if !(amount.is_finite() && amount > 0.0) => Err(
                CarbonError::InvalidEvent("Amount must be positive".to_string()),
            ),
            Some(_) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivityResponse {
    pub success: bool,
    pub activity: StoredActivity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitiesResponse {
    pub success: bool,
    pub activities: Vec<ActivityView>,
    pub total: usize,
}

// =============================================================================
// TESTS
// =============================================================================
