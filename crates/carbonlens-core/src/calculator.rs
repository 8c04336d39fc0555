//! # Calculator Module
//!
//! Rule-based emission estimation for activity records.
//!
//! `CarbonCalculator::calculate` runs the full activity pipeline:
//! base estimate → contextual adjustment → rounding → audit factors and
//! recommendations. Each stage is also exposed on its own.
//!
//! ## Per-type defaults
//!
//! | Type           | Magnitude              | Default |
//! |----------------|------------------------|---------|
//! | Shopping       | `amount` (dollars)     | 50.0    |
//! | Transportation | `distance_km`          | 10.0    |
//! | Food           | `orders`               | 1       |
//! | Travel         | `nights` × `passengers`| 1 × 1   |
//! | Digital        | `hours`                | 2.0     |
//! | Energy, Other  | fixed emission         | 1.0     |

use crate::adjuster::{self, CalculationContext};
use crate::confidence::{self, Confidence};
use crate::tables;
use crate::types::{
    ActivityDetails, ActivityRecord, ActivityType, CalculationResult, EmissionUnit,
    round_to_hundredths, usable,
};

pub const DEFAULT_SHOPPING_AMOUNT: f64 = 50.0;
pub const DEFAULT_DISTANCE_KM: f64 = 10.0;
pub const DEFAULT_ORDERS: u32 = 1;
pub const DEFAULT_NIGHTS: u32 = 1;
pub const DEFAULT_PASSENGERS: u32 = 1;
pub const DEFAULT_DIGITAL_HOURS: f64 = 2.0;
pub const DEFAULT_VEHICLE_TIER: &str = "standard";
pub const DEFAULT_STAY_TYPE: &str = "hotel";

// =============================================================================
// BASE ESTIMATE
// =============================================================================

/// One `quantity × factor` term of a base estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct Partial {
    /// What the factor was looked up by.
    pub label: String,
    pub quantity: f64,
    pub factor: f64,
}

impl Partial {
    fn new(label: impl Into<String>, quantity: f64, factor: f64) -> Self {
        Self {
            label: label.into(),
            quantity,
            factor,
        }
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.quantity * self.factor
    }
}

/// Unadjusted estimate with its provisional confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseEstimate {
    /// kg CO₂, before contextual adjustment.
    pub total: f64,
    pub confidence: Confidence,
    pub partials: Vec<Partial>,
}

// =============================================================================
// CALCULATOR
// =============================================================================

/// The rule-based carbon calculator.
///
/// Stateless; every method is a pure function of its arguments.
pub struct CarbonCalculator;

impl CarbonCalculator {
    /// Run the full activity pipeline.
    #[must_use]
    pub fn calculate(record: &ActivityRecord, context: &CalculationContext) -> CalculationResult {
        let base = Self::calculate_base(record);
        let adjustment = adjuster::adjust(record, base.total, context);
        let emissions = round_to_hundredths(adjustment.total.max(0.0));

        let mut factors = vec![format!(
            "Base {} emission factor",
            record.activity_type().name().to_lowercase()
        )];
        factors.extend(
            base.partials
                .iter()
                .filter(|p| !p.label.is_empty())
                .map(|p| p.label.clone()),
        );
        factors.extend(adjustment.applied.iter().map(|a| a.describe()));

        CalculationResult {
            emissions,
            unit: EmissionUnit::Kg,
            confidence: base.confidence.value(),
            factors,
            recommendations: Self::recommendations(record.activity_type(), adjustment.total),
            breakdown: None,
            activity_type: None,
            insights: Vec::new(),
            degraded: Vec::new(),
        }
    }

    /// Calculate several records in one context.
    #[must_use]
    pub fn calculate_batch(
        records: &[ActivityRecord],
        context: &CalculationContext,
    ) -> Vec<CalculationResult> {
        records
            .iter()
            .map(|record| Self::calculate(record, context))
            .collect()
    }

    /// Record a user-supplied emission without calculating.
    #[must_use]
    pub fn manual_entry(record: &ActivityRecord) -> CalculationResult {
        CalculationResult {
            emissions: round_to_hundredths(record.usable_amount().unwrap_or(0.0)),
            unit: EmissionUnit::Kg,
            confidence: confidence::MANUAL_ENTRY.value(),
            factors: vec!["Manual entry".to_string()],
            recommendations: Vec::new(),
            breakdown: None,
            activity_type: None,
            insights: Vec::new(),
            degraded: Vec::new(),
        }
    }

    /// Unadjusted estimate from the emission factor tables.
    #[must_use]
    pub fn calculate_base(record: &ActivityRecord) -> BaseEstimate {
        let partials = match &record.details {
            ActivityDetails::Shopping => vec![Self::shopping(record)],
            ActivityDetails::Transportation {
                distance_km,
                vehicle_type,
            } => vec![Self::transportation(
                &record.category,
                *distance_km,
                vehicle_type.as_deref(),
            )],
            ActivityDetails::Food { orders } => vec![Self::food(&record.category, *orders)],
            ActivityDetails::Travel {
                stay_type,
                nights,
                passengers,
            } => vec![Self::travel(stay_type.as_deref(), *nights, *passengers)],
            ActivityDetails::Digital { hours } => vec![Self::digital(&record.category, *hours)],
            ActivityDetails::Energy | ActivityDetails::Other => {
                vec![Partial::new("", 1.0, tables::OTHER_DEFAULT_EMISSION)]
            }
        };

        BaseEstimate {
            total: partials.iter().map(Partial::value).sum(),
            confidence: confidence::base_confidence(record),
            partials,
        }
    }

    fn shopping(record: &ActivityRecord) -> Partial {
        let amount = record.usable_amount().unwrap_or(DEFAULT_SHOPPING_AMOUNT);

        let Some(platform) = tables::shopping_platform(&record.category) else {
            return Partial::new("", amount, tables::SHOPPING_DEFAULT);
        };

        let description = record.description.to_lowercase();
        match platform
            .categories
            .iter()
            .find(|(keyword, _)| description.contains(keyword))
        {
            Some((keyword, factor)) => Partial::new(format!("Sub-category: {keyword}"), amount, *factor),
            None => Partial::new("", amount, platform.base),
        }
    }

    fn transportation(service: &str, distance_km: Option<f64>, vehicle_type: Option<&str>) -> Partial {
        let distance = distance_km.and_then(usable).unwrap_or(DEFAULT_DISTANCE_KM);
        let tier = vehicle_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_VEHICLE_TIER);

        let factor = tables::transportation_service(service)
            .and_then(|s| s.factor(tier))
            .unwrap_or(tables::TRANSPORTATION_DEFAULT);

        let label = vehicle_type.map_or_else(String::new, |v| format!("Vehicle type: {v}"));
        Partial::new(label, distance, factor)
    }

    fn food(service: &str, orders: Option<u32>) -> Partial {
        let orders = orders.filter(|o| *o > 0).unwrap_or(DEFAULT_ORDERS);
        let factor = tables::lookup(tables::FOOD, service).unwrap_or(tables::FOOD_DEFAULT);
        Partial::new("", f64::from(orders), factor)
    }

    fn travel(stay_type: Option<&str>, nights: Option<u32>, passengers: Option<u32>) -> Partial {
        let nights = nights.filter(|n| *n > 0).unwrap_or(DEFAULT_NIGHTS);
        let passengers = passengers.filter(|p| *p > 0).unwrap_or(DEFAULT_PASSENGERS);
        let stay = stay_type.unwrap_or(DEFAULT_STAY_TYPE);
        let factor = tables::lookup(tables::TRAVEL, stay).unwrap_or(tables::TRAVEL_DEFAULT);
        Partial::new(
            format!("Stay type: {stay}"),
            f64::from(nights) * f64::from(passengers),
            factor,
        )
    }

    fn digital(service: &str, hours: Option<f64>) -> Partial {
        let hours = hours.and_then(usable).unwrap_or(DEFAULT_DIGITAL_HOURS);
        let factor = tables::lookup(tables::DIGITAL, service).unwrap_or(tables::DIGITAL_DEFAULT);
        Partial::new("", hours, factor)
    }

    /// Suggestions for lowering an activity's emissions.
    #[must_use]
    pub fn recommendations(activity_type: ActivityType, emissions: f64) -> Vec<String> {
        let mut recommendations = Vec::new();

        if emissions > 10.0 {
            recommendations
                .push("Consider consolidating orders to reduce delivery emissions".to_string());
        }
        if activity_type == ActivityType::Transportation && emissions > 5.0 {
            recommendations.push("Try carpooling or public transport for lower emissions".to_string());
        }
        if activity_type == ActivityType::Food && emissions > 3.0 {
            recommendations
                .push("Choose restaurants closer to you or pick up orders yourself".to_string());
        }
        if activity_type == ActivityType::Shopping {
            recommendations.push("Look for eco-friendly packaging options".to_string());
        }

        recommendations
    }
}

// =============================================================================
// TESTS
// =============================================================================
