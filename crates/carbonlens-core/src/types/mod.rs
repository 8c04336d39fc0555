//! # Core Type Definitions
//!
//! This module contains the input and output types of the estimation engine:
//! - Activity input (`ActivityRecord`, `ActivityDetails`, `ActivityType`, `Weather`)
//! - Classification vocabulary (`ActivityCategory`, `Intensity`)
//! - Output structures (`CalculationResult`, `Breakdown`, `EmissionUnit`)
//! - External dependency names (`Dependency`)
//! - Error types (`CarbonError`)
//!
//! ## Input Sanitation
//!
//! Magnitudes (`amount`, distance, hours, ...) are accepted as-is on the wire
//! but only *usable* values reach the calculator: negative, zero and
//! non-finite numbers are treated as absent and replaced by the documented
//! per-type default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// ACTIVITY TYPE
// =============================================================================

/// Coarse bucket an activity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    Shopping,
    Travel,
    Food,
    Transportation,
    Energy,
    Digital,
    Other,
}

impl ActivityType {
    /// Display name, as used in factor descriptions.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Shopping => "Shopping",
            Self::Travel => "Travel",
            Self::Food => "Food",
            Self::Transportation => "Transportation",
            Self::Energy => "Energy",
            Self::Digital => "Digital",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// WEATHER
// =============================================================================

/// Weather at the time of the activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Clear,
    Bad,
    #[serde(other)]
    Unknown,
}

// =============================================================================
// ACTIVITY DETAILS
// =============================================================================

/// Per-type payload of an activity.
///
/// Each variant carries only the fields its calculation consults. Absent
/// fields fall back to the defaults documented in [`crate::calculator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActivityDetails {
    /// Purchase; magnitude is the record's `amount` (currency spent).
    Shopping,
    /// Ride or trip, in kilometres.
    Transportation {
        #[serde(default, alias = "distance", skip_serializing_if = "Option::is_none")]
        distance_km: Option<f64>,
        #[serde(default, alias = "vehicleType", skip_serializing_if = "Option::is_none")]
        vehicle_type: Option<String>,
    },
    /// Food delivery orders.
    Food {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        orders: Option<u32>,
    },
    /// Accommodation or long-haul travel booking.
    Travel {
        #[serde(default, alias = "stayType", skip_serializing_if = "Option::is_none")]
        stay_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nights: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        passengers: Option<u32>,
    },
    /// Hours of digital service use.
    Digital {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hours: Option<f64>,
    },
    /// Household energy; no dedicated factor table.
    Energy,
    /// Anything else, including unrecognized type tags.
    #[serde(other)]
    Other,
}

impl ActivityDetails {
    /// The coarse bucket of this payload.
    #[must_use]
    pub const fn activity_type(&self) -> ActivityType {
        match self {
            Self::Shopping => ActivityType::Shopping,
            Self::Transportation { .. } => ActivityType::Transportation,
            Self::Food { .. } => ActivityType::Food,
            Self::Travel { .. } => ActivityType::Travel,
            Self::Digital { .. } => ActivityType::Digital,
            Self::Energy => ActivityType::Energy,
            Self::Other => ActivityType::Other,
        }
    }

    /// Whether any typed detail field was supplied.
    #[must_use]
    pub fn has_fields(&self) -> bool {
        match self {
            Self::Transportation {
                distance_km,
                vehicle_type,
            } => distance_km.is_some() || vehicle_type.is_some(),
            Self::Food { orders } => orders.is_some(),
            Self::Travel {
                stay_type,
                nights,
                passengers,
            } => stay_type.is_some() || nights.is_some() || passengers.is_some(),
            Self::Digital { hours } => hours.is_some(),
            Self::Shopping | Self::Energy | Self::Other => false,
        }
    }
}

// =============================================================================
// ACTIVITY RECORD
// =============================================================================

/// One user activity, as submitted by a form or detected by the extension.
///
/// On the wire, per-type fields may sit at the top level or inside a nested
/// `metadata` object (`{"type": "Transportation", "metadata": {"distance": 20}}`).
/// Metadata values win when both are given. Metadata keys with no typed home
/// are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ActivityRecordWire")]
pub struct ActivityRecord {
    /// Sub-bucket such as a platform or service name.
    pub category: String,
    /// Magnitude whose meaning depends on the type (currency for Shopping).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Free text scanned for qualifying keywords.
    pub description: String,
    /// Free text matched against region codes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,
    /// Typed, per-type payload (carries the `type` tag on the wire).
    #[serde(flatten)]
    pub details: ActivityDetails,
    /// Unclassified auxiliary data. Never consulted by the calculator.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// Accepted input shape of an [`ActivityRecord`].
#[derive(Deserialize)]
struct ActivityRecordWire {
    #[serde(default)]
    category: String,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    weather: Option<Weather>,
    #[serde(default)]
    metadata: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(flatten)]
    details: ActivityDetails,
    #[serde(default)]
    extra: BTreeMap<String, String>,
}

/// Remove `key` from the metadata if it reads as a `T`.
fn take<T>(
    metadata: &mut BTreeMap<String, serde_json::Value>,
    key: &str,
    read: impl Fn(&serde_json::Value) -> Option<T>,
) -> Option<T> {
    let value = metadata.get(key).and_then(read)?;
    metadata.remove(key);
    Some(value)
}

fn read_string(value: &serde_json::Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

fn read_count(value: &serde_json::Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

fn read_weather(value: &serde_json::Value) -> Option<Weather> {
    serde_json::from_value(value.clone()).ok()
}

fn overlay<T>(slot: &mut Option<T>, from_metadata: Option<T>) {
    if from_metadata.is_some() {
        *slot = from_metadata;
    }
}

impl From<ActivityRecordWire> for ActivityRecord {
    fn from(wire: ActivityRecordWire) -> Self {
        let mut metadata = wire.metadata.unwrap_or_default();
        let mut details = wire.details;

        match &mut details {
            ActivityDetails::Transportation {
                distance_km,
                vehicle_type,
            } => {
                overlay(distance_km, take(&mut metadata, "distance", serde_json::Value::as_f64));
                overlay(vehicle_type, take(&mut metadata, "vehicleType", read_string));
            }
            ActivityDetails::Food { orders } => {
                overlay(orders, take(&mut metadata, "orders", read_count));
            }
            ActivityDetails::Travel {
                stay_type,
                nights,
                passengers,
            } => {
                overlay(stay_type, take(&mut metadata, "stayType", read_string));
                overlay(stay_type, take(&mut metadata, "type", read_string));
                overlay(nights, take(&mut metadata, "nights", read_count));
                overlay(passengers, take(&mut metadata, "passengers", read_count));
            }
            ActivityDetails::Digital { hours } => {
                overlay(hours, take(&mut metadata, "hours", serde_json::Value::as_f64));
            }
            ActivityDetails::Shopping | ActivityDetails::Energy | ActivityDetails::Other => {}
        }

        let mut weather = wire.weather;
        overlay(&mut weather, take(&mut metadata, "weather", read_weather));

        let mut extra = wire.extra;
        for (key, value) in metadata {
            let text = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            extra.entry(key).or_insert(text);
        }

        Self {
            category: wire.category,
            amount: wire.amount,
            description: wire.description,
            location: wire.location,
            weather,
            details,
            extra,
        }
    }
}

impl ActivityRecord {
    /// Create a record with the given payload and category.
    #[must_use]
    pub fn new(details: ActivityDetails, category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            amount: None,
            description: String::new(),
            location: None,
            weather: None,
            details,
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_weather(mut self, weather: Weather) -> Self {
        self.weather = Some(weather);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The coarse bucket of this record.
    #[must_use]
    pub const fn activity_type(&self) -> ActivityType {
        self.details.activity_type()
    }

    /// The amount, if it is a usable (positive, finite) number.
    #[must_use]
    pub fn usable_amount(&self) -> Option<f64> {
        self.amount.and_then(usable)
    }

    /// The location, if present and not blank.
    #[must_use]
    pub fn usable_location(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    /// Whether any metadata beyond the common fields was supplied.
    #[must_use]
    pub fn has_metadata(&self) -> bool {
        self.details.has_fields() || self.weather.is_some() || !self.extra.is_empty()
    }
}

/// Keep a magnitude only if it is positive and finite.
#[must_use]
pub fn usable(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Round to two decimal places, as every reported emission is.
#[must_use]
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// CLASSIFICATION VOCABULARY
// =============================================================================

/// Category a browsing activity is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityCategory {
    Search,
    SocialMedia,
    Streaming,
    Shopping,
    AiInteraction,
    Work,
    News,
    Gaming,
    Other,
}

impl ActivityCategory {
    /// Every category, in prompt order.
    pub const ALL: [Self; 9] = [
        Self::Search,
        Self::SocialMedia,
        Self::Streaming,
        Self::Shopping,
        Self::AiInteraction,
        Self::Work,
        Self::News,
        Self::Gaming,
        Self::Other,
    ];

    /// Wire label (`SOCIAL_MEDIA`, `AI_INTERACTION`, ...).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Search => "SEARCH",
            Self::SocialMedia => "SOCIAL_MEDIA",
            Self::Streaming => "STREAMING",
            Self::Shopping => "SHOPPING",
            Self::AiInteraction => "AI_INTERACTION",
            Self::Work => "WORK",
            Self::News => "NEWS",
            Self::Gaming => "GAMING",
            Self::Other => "OTHER",
        }
    }

    /// Parse a wire label, case-insensitively.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse resource demand of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intensity {
    Low,
    #[default]
    Medium,
    High,
}

impl Intensity {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Parse a wire label, case-insensitively.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            _ => None,
        }
    }
}

// =============================================================================
// EXTERNAL DEPENDENCIES
// =============================================================================

/// External services the enhanced pipeline consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    /// Reasoning service, classification call.
    Classification,
    /// Live regional grid-intensity provider.
    RegionalFactor,
    /// Reasoning service, insight-generation call.
    Insights,
}

impl Dependency {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::RegionalFactor => "regional_factor",
            Self::Insights => "insights",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// CALCULATION RESULT
// =============================================================================

/// Unit of a reported emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmissionUnit {
    /// Kilograms of CO₂ (activity records).
    #[default]
    Kg,
    /// Grams of CO₂ (per-visit browsing estimates).
    G,
}

impl EmissionUnit {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Kg => "kg CO2",
            Self::G => "g CO2",
        }
    }
}

/// Emission contributions by source.
///
/// `device_energy + network_transfer + server_processing` equals the total
/// within rounding. `ai_processing` is an attribution share *of* that total,
/// not an additional term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Breakdown {
    pub device_energy: f64,
    pub network_transfer: f64,
    pub server_processing: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_processing: Option<f64>,
}

impl Breakdown {
    /// Sum of the additive sources.
    #[must_use]
    pub fn additive_total(&self) -> f64 {
        self.device_energy + self.network_transfer + self.server_processing
    }
}

/// Output of one pass through the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    /// Non-negative estimate, rounded to two decimals.
    pub emissions: f64,
    #[serde(default)]
    pub unit: EmissionUnit,
    /// Estimator certainty in [0, 1].
    pub confidence: f64,
    /// Adjustments and factors applied, in order.
    #[serde(default)]
    pub factors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Breakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<ActivityCategory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<String>,
    /// Dependencies that fell back to local defaults.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Dependency>,
}

impl CalculationResult {
    /// Whether any external dependency fell back to its local default.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in carbonlens.
///
/// Estimation itself never fails: lookup misses are handled with defaults.
/// These variants cover malformed events and the I/O around the engine.
#[derive(Debug, Error)]
pub enum CarbonError {
    /// A browsing event could not be interpreted (e.g. unparseable URL).
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
