//! # carbonlens-core
//!
//! The deterministic carbon estimator for carbonlens - THE CALCULATOR.
//!
//! This crate turns an activity record (a purchase, a ride, a food order, a
//! stay, hours of a digital service) or a browsing event into a CO₂ estimate
//! with a confidence score, an audit trail and recommendations.
//!
//! ## Pipelines
//!
//! - Activity: [`CarbonCalculator`] → base estimate → [`adjuster`] →
//!   rounded [`CalculationResult`] in kg
//! - Browsing: [`web::estimate`] → [`classifier`] → [`aggregator::combine`]
//!   → result in g, with [`fallback`] state for degraded dependencies
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies (pure Rust)
//! - Holds no state between calls
//! - Reference tables are `static` and never mutated
//! - Lookup misses degrade to defaults, never to errors

// =============================================================================
// MODULES
// =============================================================================

pub mod adjuster;
pub mod aggregator;
pub mod calculator;
pub mod classifier;
pub mod confidence;
pub mod fallback;
pub mod tables;
pub mod trend;
pub mod types;
pub mod web;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    ActivityCategory, ActivityDetails, ActivityRecord, ActivityType, Breakdown,
    CalculationResult, CarbonError, Dependency, EmissionUnit, Intensity, Weather,
};

// =============================================================================
// RE-EXPORTS: Calculators
// =============================================================================

pub use adjuster::{Adjustment, AppliedAdjustment, CalculationContext};
pub use calculator::{BaseEstimate, CarbonCalculator};
pub use confidence::{Confidence, weakest_of};
pub use web::{BrowsingEvent, WebBaseEstimate};

// =============================================================================
// RE-EXPORTS: Enhanced Pipeline Pieces
// =============================================================================

pub use aggregator::{AggregationPolicy, InsightRequest, Insights, RegionalFactor};
pub use classifier::{Classification, ClassificationRequest};
pub use fallback::{DegradationTracker, PipelineState, last_resort_result};
pub use trend::{DailyEmission, Prediction, Trend, predict_emissions};
