//! # Contextual Adjuster
//!
//! Multiplicative adjustments applied to a base estimate, in fixed order:
//!
//! 1. Keyword: express/rush ×1.3, else bulk/wholesale ×0.8
//! 2. Regional: first region code found in the location
//! 3. Context: night ×1.1, weekend food ×1.15, bad weather ×1.2 (these stack)
//!
//! Each multiplier applies to the running total. The adjusted total is not
//! clamped.

use crate::tables;
use crate::types::{ActivityRecord, ActivityType, Weather};
use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Weekday};

pub const EXPRESS_MULTIPLIER: f64 = 1.3;
pub const BULK_MULTIPLIER: f64 = 0.8;
pub const NIGHT_MULTIPLIER: f64 = 1.1;
pub const WEEKEND_FOOD_MULTIPLIER: f64 = 1.15;
pub const BAD_WEATHER_MULTIPLIER: f64 = 1.2;

const EXPRESS_KEYWORDS: [&str; 2] = ["express", "rush"];
const BULK_KEYWORDS: [&str; 2] = ["bulk", "wholesale"];

// =============================================================================
// CALCULATION CONTEXT
// =============================================================================

/// Time context an activity is evaluated in.
///
/// Passing the context explicitly keeps calculations reproducible; use
/// [`CalculationContext::now`] at the edge of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculationContext {
    /// Hour of day, 0-23.
    pub hour: u32,
    pub weekday: Weekday,
}

impl CalculationContext {
    #[must_use]
    pub const fn new(hour: u32, weekday: Weekday) -> Self {
        Self { hour, weekday }
    }

    /// Context at the local wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self::at(&Local::now())
    }

    #[must_use]
    pub fn at<Tz: TimeZone>(moment: &DateTime<Tz>) -> Self {
        Self {
            hour: moment.hour(),
            weekday: moment.weekday(),
        }
    }

    /// Night delivery window: 22:00-23:59 and 00:00-06:59.
    #[must_use]
    pub const fn is_night(&self) -> bool {
        self.hour >= 22 || self.hour <= 6
    }

    #[must_use]
    pub const fn is_weekend(&self) -> bool {
        matches!(self.weekday, Weekday::Sat | Weekday::Sun)
    }
}

// =============================================================================
// APPLIED ADJUSTMENTS
// =============================================================================

/// One adjustment that was applied to an estimate.
#[derive(Debug, Clone, PartialEq)]
pub enum AppliedAdjustment {
    Express,
    Bulk,
    Regional {
        region: &'static str,
        multiplier: f64,
    },
    NightDelivery,
    WeekendFood,
    BadWeather,
}

impl AppliedAdjustment {
    #[must_use]
    pub const fn multiplier(&self) -> f64 {
        match self {
            Self::Express => EXPRESS_MULTIPLIER,
            Self::Bulk => BULK_MULTIPLIER,
            Self::Regional { multiplier, .. } => *multiplier,
            Self::NightDelivery => NIGHT_MULTIPLIER,
            Self::WeekendFood => WEEKEND_FOOD_MULTIPLIER,
            Self::BadWeather => BAD_WEATHER_MULTIPLIER,
        }
    }

    /// Human-readable audit entry.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Express => "Express or rush delivery premium".to_string(),
            Self::Bulk => "Bulk order efficiency".to_string(),
            Self::Regional { region, multiplier } => {
                format!("Regional energy grid adjustment ({region} x{multiplier:.2})")
            }
            Self::NightDelivery => "Night delivery penalty".to_string(),
            Self::WeekendFood => "Weekend food delivery".to_string(),
            Self::BadWeather => "Bad weather conditions".to_string(),
        }
    }
}

/// Adjusted total and the adjustments that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub total: f64,
    pub applied: Vec<AppliedAdjustment>,
}

impl Adjustment {
    /// Combined multiplier of every applied adjustment.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.applied.iter().map(AppliedAdjustment::multiplier).product()
    }
}

// =============================================================================
// ADJUSTMENT STEPS
// =============================================================================

/// Keyword adjustment; express wins over bulk when both are present.
#[must_use]
pub fn keyword_adjustment(description: &str) -> Option<AppliedAdjustment> {
    let description = description.to_lowercase();
    if EXPRESS_KEYWORDS.iter().any(|k| description.contains(k)) {
        Some(AppliedAdjustment::Express)
    } else if BULK_KEYWORDS.iter().any(|k| description.contains(k)) {
        Some(AppliedAdjustment::Bulk)
    } else {
        None
    }
}

/// Regional adjustment for the first region code found in the location.
#[must_use]
pub fn regional_adjustment(location: Option<&str>) -> Option<AppliedAdjustment> {
    let location = location?.to_uppercase();
    tables::REGIONAL_MULTIPLIERS
        .iter()
        .find(|(region, _)| location.contains(region))
        .map(|(region, multiplier)| AppliedAdjustment::Regional {
            region: *region,
            multiplier: *multiplier,
        })
}

/// Time and condition adjustments; these stack.
#[must_use]
pub fn context_adjustments(
    record: &ActivityRecord,
    context: &CalculationContext,
) -> Vec<AppliedAdjustment> {
    let mut applied = Vec::new();
    if context.is_night() {
        applied.push(AppliedAdjustment::NightDelivery);
    }
    if context.is_weekend() && record.activity_type() == ActivityType::Food {
        applied.push(AppliedAdjustment::WeekendFood);
    }
    if record.weather == Some(Weather::Bad) {
        applied.push(AppliedAdjustment::BadWeather);
    }
    applied
}

/// Apply every contextual adjustment to a base total.
#[must_use]
pub fn adjust(record: &ActivityRecord, base_total: f64, context: &CalculationContext) -> Adjustment {
    let mut applied = Vec::new();
    applied.extend(keyword_adjustment(&record.description));
    applied.extend(regional_adjustment(record.usable_location()));
    applied.extend(context_adjustments(record, context));

    let total = applied
        .iter()
        .fold(base_total, |running, adjustment| running * adjustment.multiplier());

    Adjustment { total, applied }
}

// =============================================================================
// TESTS
// =============================================================================
