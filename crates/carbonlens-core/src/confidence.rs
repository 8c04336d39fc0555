//! # Confidence Module
//!
//! Confidence scoring for emission estimates.
//!
//! - Base confidence grows with the amount of data supplied
//! - Lookup misses lower it
//! - Independent estimators combine by their weakest member
//!
//! Scores are accumulated in integer points (hundredths) so that repeated
//! additions never drift, and exposed as `f64` in [0, 1].

use crate::tables;
use crate::types::{ActivityDetails, ActivityRecord};

/// Confidence the rule-based calculator starts from, in points.
pub const BASE_POINTS: u8 = 70;

/// Bonus for each kind of supporting data (amount, location, metadata).
pub const DATA_BONUS_POINTS: u8 = 10;

/// Penalty when the type/category pair is missing from every table.
pub const UNKNOWN_CATEGORY_PENALTY_POINTS: u8 = 20;

/// Lowest confidence the rule-based calculator reports.
pub const FLOOR_POINTS: u8 = 10;

/// Confidence fixed for deterministic (keyword) classification.
pub const DETERMINISTIC_CLASSIFICATION: Confidence = Confidence::from_points(50);

/// Confidence fixed for a successful reasoning-service classification.
pub const REASONED_CLASSIFICATION: Confidence = Confidence::from_points(85);

/// Confidence of a live regional grid factor.
pub const LIVE_REGIONAL_FACTOR: Confidence = Confidence::from_points(90);

/// Confidence of the static reference grid factor.
pub const DEFAULT_REGIONAL_FACTOR: Confidence = Confidence::from_points(30);

/// Confidence of the last-resort result.
pub const LAST_RESORT: Confidence = Confidence::from_points(30);

/// Confidence of a manually entered emission.
pub const MANUAL_ENTRY: Confidence = Confidence::from_points(50);

/// An estimator's certainty, in hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Confidence(u8);

impl Confidence {
    /// Create from points, capped at 100.
    #[must_use]
    pub const fn from_points(points: u8) -> Self {
        if points > 100 { Self(100) } else { Self(points) }
    }

    /// Create from a fraction, clamped to [0, 1] and rounded to hundredths.
    #[must_use]
    pub fn from_fraction(value: f64) -> Self {
        if value.is_nan() {
            return Self(0);
        }
        Self((value.clamp(0.0, 1.0) * 100.0).round() as u8)
    }

    #[must_use]
    pub const fn points(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn value(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

/// Combine independent estimators by their weakest member.
///
/// The result never exceeds any input. An empty set has no evidence and
/// yields zero.
#[must_use]
pub fn weakest_of<I>(scores: I) -> Confidence
where
    I: IntoIterator<Item = Confidence>,
{
    scores.into_iter().min().unwrap_or_default()
}

/// Whether the record's type/category pair appears in a lookup table.
///
/// Travel is always considered known; Energy and Other never are.
#[must_use]
pub fn is_known_category(record: &ActivityRecord) -> bool {
    let category = record.category.trim();
    let is_default = category.eq_ignore_ascii_case("default");
    match &record.details {
        ActivityDetails::Shopping => is_default || tables::shopping_platform(category).is_some(),
        ActivityDetails::Transportation { .. } => {
            is_default || tables::transportation_service(category).is_some()
        }
        ActivityDetails::Food { .. } => {
            is_default || tables::lookup(tables::FOOD, category).is_some()
        }
        ActivityDetails::Travel { .. } => true,
        ActivityDetails::Digital { .. } => {
            is_default || tables::lookup(tables::DIGITAL, category).is_some()
        }
        ActivityDetails::Energy | ActivityDetails::Other => false,
    }
}

/// Provisional confidence of a rule-based estimate.
///
/// Scoring:
/// - Base 70
/// - +10 each for a usable amount, a location, and any metadata
/// - -20 when the category is unknown
/// - Clamped to [10, 100]
#[must_use]
pub fn base_confidence(record: &ActivityRecord) -> Confidence {
    let mut points = BASE_POINTS;

    if record.usable_amount().is_some() {
        points = points.saturating_add(DATA_BONUS_POINTS);
    }
    if record.usable_location().is_some() {
        points = points.saturating_add(DATA_BONUS_POINTS);
    }
    if record.has_metadata() {
        points = points.saturating_add(DATA_BONUS_POINTS);
    }
    if !is_known_category(record) {
        points = points.saturating_sub(UNKNOWN_CATEGORY_PENALTY_POINTS);
    }

    Confidence::from_points(points.clamp(FLOOR_POINTS, 100))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Weather;

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(Confidence::from_fraction(1.7).points(), 100);
        assert_eq!(Confidence::from_fraction(-0.2).points(), 0);
        assert_eq!(Confidence::from_fraction(f64::NAN).points(), 0);
        assert_eq!(Confidence::from_fraction(0.856).points(), 86);
    }

    #[test]
    fn points_are_capped() {
        assert_eq!(Confidence::from_points(250).points(), 100);
    }

    #[test]
    fn weakest_of_picks_minimum() {
        let combined = weakest_of([
            Confidence::from_points(80),
            REASONED_CLASSIFICATION,
            DEFAULT_REGIONAL_FACTOR,
        ]);
        assert_eq!(combined, DEFAULT_REGIONAL_FACTOR);
    }

    #[test]
    fn weakest_of_empty_is_zero() {
        assert_eq!(weakest_of(std::iter::empty()).points(), 0);
    }

    #[test]
    fn bare_known_record_scores_base() {
        let record = ActivityRecord::new(ActivityDetails::Shopping, "amazon");
        assert_eq!(base_confidence(&record).points(), 70);
    }

    #[test]
    fn fully_described_record_reaches_maximum() {
        let record = ActivityRecord::new(ActivityDetails::Shopping, "amazon")
            .with_amount(10.0)
            .with_location("US")
            .with_weather(Weather::Clear);
        assert_eq!(base_confidence(&record).points(), 100);
        assert!((base_confidence(&record).value() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_category_is_penalized() {
        let record = ActivityRecord::new(ActivityDetails::Shopping, "etsy");
        assert_eq!(base_confidence(&record).points(), 50);

        let other = ActivityRecord::new(ActivityDetails::Other, "anything");
        assert_eq!(base_confidence(&other).points(), 50);
    }

    #[test]
    fn travel_is_always_known() {
        let record = ActivityRecord::new(
            ActivityDetails::Travel {
                stay_type: None,
                nights: None,
                passengers: None,
            },
            "somewhere",
        );
        assert!(is_known_category(&record));
    }

    #[test]
    fn default_category_counts_as_known() {
        let record = ActivityRecord::new(ActivityDetails::Food { orders: None }, "Default");
        assert!(is_known_category(&record));
    }
}
