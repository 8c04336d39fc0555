//! # Emission Aggregator
//!
//! Merges a browsing base estimate, its classification and a regional grid
//! factor into a single [`CalculationResult`].
//!
//! The final total is `server + device × (grid / reference) + network`. The
//! intensity-adjusted total is reported in the audit trail only. Confidence
//! is the weakest of the three inputs.

use crate::classifier::{Classification, json_object};
use crate::confidence::{self, Confidence};
use crate::tables;
use crate::types::{
    ActivityCategory, Breakdown, CalculationResult, CarbonError, EmissionUnit,
    round_to_hundredths,
};
use crate::web::WebBaseEstimate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GENERIC_INSIGHT: &str = "This activity contributed to your digital carbon footprint";
pub const GENERIC_RECOMMENDATION: &str = "Consider reducing time on high-emission websites";

// =============================================================================
// POLICY
// =============================================================================

/// Tunable constants of the aggregation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationPolicy {
    /// Share of the total attributed to AI processing for AI interactions.
    pub ai_processing_share: f64,
    /// Grid intensity the device estimate was made in, kg CO₂/kWh.
    pub reference_grid_factor: f64,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            ai_processing_share: 0.30,
            reference_grid_factor: tables::REFERENCE_GRID_FACTOR,
        }
    }
}

impl AggregationPolicy {
    /// Reject shares outside [0, 1] and non-positive reference factors.
    pub fn validate(&self) -> Result<(), CarbonError> {
        if !(0.0..=1.0).contains(&self.ai_processing_share) {
            return Err(CarbonError::ConfigError(format!(
                "ai_processing_share must be within [0, 1], got {}",
                self.ai_processing_share
            )));
        }
        if !(self.reference_grid_factor.is_finite() && self.reference_grid_factor > 0.0) {
            return Err(CarbonError::ConfigError(format!(
                "reference_grid_factor must be positive, got {}",
                self.reference_grid_factor
            )));
        }
        Ok(())
    }
}

// =============================================================================
// REGIONAL FACTOR
// =============================================================================

/// Grid intensity for the event's region, with the confidence of its source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionalFactor {
    /// kg CO₂ per kWh.
    pub factor: f64,
    pub confidence: Confidence,
}

impl RegionalFactor {
    /// Factor answered by a live provider.
    #[must_use]
    pub const fn live(factor: f64) -> Self {
        Self {
            factor,
            confidence: confidence::LIVE_REGIONAL_FACTOR,
        }
    }

    /// Local default used when no provider answers.
    #[must_use]
    pub const fn reference() -> Self {
        Self {
            factor: tables::REFERENCE_GRID_FACTOR,
            confidence: confidence::DEFAULT_REGIONAL_FACTOR,
        }
    }
}

// =============================================================================
// COMBINE
// =============================================================================

/// Base total scaled by the classification's intensity tier.
#[must_use]
pub fn intensity_adjusted(base: &WebBaseEstimate, classification: &Classification) -> f64 {
    base.total() * classification.intensity_multiplier()
}

/// Build the enhanced result. Insights are attached afterwards with
/// [`apply_insights`].
#[must_use]
pub fn combine(
    base: &WebBaseEstimate,
    classification: &Classification,
    regional: &RegionalFactor,
    policy: &AggregationPolicy,
) -> CalculationResult {
    let adjusted = intensity_adjusted(base, classification);
    let device = base.device * (regional.factor / policy.reference_grid_factor);
    let total = (base.server + device + base.network).max(0.0);

    let ai_processing = (classification.category == ActivityCategory::AiInteraction)
        .then(|| round_to_hundredths(total * policy.ai_processing_share));

    let factors = vec![
        format!("Website energy: {}", base.domain),
        format!(
            "Activity classified as {} ({})",
            classification.category.label(),
            classification.reasoning
        ),
        format!(
            "Intensity {} x{:.1}: {:.2} g adjusted",
            classification.intensity.label(),
            classification.intensity_multiplier(),
            adjusted
        ),
        format!("Grid factor {:.3} kg CO2/kWh", regional.factor),
    ];

    CalculationResult {
        emissions: round_to_hundredths(total),
        unit: EmissionUnit::G,
        confidence: confidence::weakest_of([
            base.confidence,
            classification.confidence,
            regional.confidence,
        ])
        .value(),
        factors,
        recommendations: Vec::new(),
        breakdown: Some(Breakdown {
            device_energy: round_to_hundredths(device),
            network_transfer: round_to_hundredths(base.network),
            server_processing: round_to_hundredths(base.server),
            ai_processing,
        }),
        activity_type: Some(classification.category),
        insights: Vec::new(),
        degraded: Vec::new(),
    }
}

// =============================================================================
// INSIGHTS
// =============================================================================

/// Narrative insights and recommendations for a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Insights {
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl Insights {
    /// Fixed pair used when insight generation fails.
    #[must_use]
    pub fn generic() -> Self {
        Self {
            insights: vec![GENERIC_INSIGHT.to_string()],
            recommendations: vec![GENERIC_RECOMMENDATION.to_string()],
        }
    }
}

/// What the reasoning service is told when asked for insights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRequest {
    pub domain: String,
    pub time_on_page_secs: f64,
    pub device_type: String,
    pub category: ActivityCategory,
    /// Final emission, grams.
    pub emissions_g: f64,
}

/// Prompt asking for `{"insights": [...], "recommendations": [...]}`.
#[must_use]
pub fn build_insight_prompt(request: &InsightRequest) -> String {
    format!(
        "Based on this web activity carbon calculation, provide insights and recommendations:\n\n\
         Activity: {} for {}s ({})\n\
         Carbon Emission: {:.2}g CO2\n\
         Device: {}\n\n\
         Provide 2-3 brief insights about this activity's environmental impact and \
         2-3 actionable recommendations to reduce emissions. Keep them concise and \
         focused on digital behavior changes.\n\n\
         Respond with JSON only: {{\"insights\": [\"...\"], \"recommendations\": [\"...\"]}}",
        request.domain,
        request.time_on_page_secs,
        request.category.label(),
        request.emissions_g,
        request.device_type,
    )
}

fn string_list(value: &Value, field: &str) -> Result<Vec<String>, CarbonError> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    CarbonError::SerializationError(format!("{field} entry is not a string"))
                })
            })
            .collect(),
        Some(_) => Err(CarbonError::SerializationError(format!(
            "{field} is not a list"
        ))),
    }
}

/// Parse a reasoning-service insight reply. Missing lists are empty.
pub fn parse_insights(text: &str) -> Result<Insights, CarbonError> {
    let value = json_object(text)?;
    Ok(Insights {
        insights: string_list(&value, "insights")?,
        recommendations: string_list(&value, "recommendations")?,
    })
}

/// Attach insights and recommendations to a result.
pub fn apply_insights(result: &mut CalculationResult, insights: Insights) {
    result.insights = insights.insights;
    result.recommendations = insights.recommendations;
}

// =============================================================================
// TESTS
// =============================================================================
