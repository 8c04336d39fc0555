//! # Emission Factor Tables
//!
//! Static reference data consulted by every estimator. All tables are
//! `static` slices: declaration order is significant wherever a lookup scans
//! for the *first* match (shopping sub-categories, regions, website domains,
//! device categories, fallback domain rules).
//!
//! Units:
//! - shopping: kg CO₂ per dollar
//! - transportation: kg CO₂ per km
//! - food: kg CO₂ per order
//! - travel: kg CO₂ per night per passenger
//! - digital: kg CO₂ per hour
//! - website: g CO₂ per visit
//! - device: watts while browsing
//! - network: g CO₂ per MB transferred
//! - grid: kg CO₂ per kWh

use crate::types::{ActivityCategory, Intensity};

// =============================================================================
// ENTRY TYPES
// =============================================================================

/// A shopping platform with optional keyword-driven sub-category factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformFactor {
    pub platform: &'static str,
    pub base: f64,
    /// Keyword → factor, scanned in declaration order.
    pub categories: &'static [(&'static str, f64)],
}

/// A transportation service keyed by vehicle tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceTiers {
    pub service: &'static str,
    pub tiers: &'static [(&'static str, f64)],
    /// Tier used when the requested one is unknown.
    pub default_tier: Option<&'static str>,
}

impl ServiceTiers {
    /// Factor for a tier, falling back to the service's default tier.
    #[must_use]
    pub fn factor(&self, tier: &str) -> Option<f64> {
        lookup(self.tiers, tier).or_else(|| self.default_tier.and_then(|d| lookup(self.tiers, d)))
    }
}

/// Per-visit energy profile of a known website.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebsiteEnergy {
    pub domain: &'static str,
    pub category: &'static str,
    pub co2_per_visit_g: f64,
}

/// Power draw profile of a device class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceEnergy {
    pub device_type: &'static str,
    pub category: &'static str,
    pub browsing_watts: f64,
}

// =============================================================================
// ACTIVITY TABLES
// =============================================================================

pub const SHOPPING_DEFAULT: f64 = 0.4;

pub static SHOPPING: &[PlatformFactor] = &[PlatformFactor {
    platform: "amazon",
    base: 0.5,
    categories: &[("electronics", 1.2), ("clothing", 0.8), ("books", 0.3)],
}];

pub const TRANSPORTATION_DEFAULT: f64 = 0.2;

pub static TRANSPORTATION: &[ServiceTiers] = &[
    ServiceTiers {
        service: "uber",
        tiers: &[("car", 0.21), ("premium", 0.35), ("suv", 0.45)],
        default_tier: Some("car"),
    },
    ServiceTiers {
        service: "lyft",
        tiers: &[("shared", 0.15), ("standard", 0.21)],
        default_tier: Some("standard"),
    },
    ServiceTiers {
        service: "flight",
        tiers: &[("domestic", 0.255), ("international", 0.285)],
        default_tier: None,
    },
];

pub const FOOD_DEFAULT: f64 = 3.0;

pub static FOOD: &[(&str, f64)] = &[("doordash", 3.2), ("ubereats", 3.0), ("grubhub", 3.5)];

pub const TRAVEL_DEFAULT: f64 = 10.0;

pub static TRAVEL: &[(&str, f64)] = &[("hotel", 12.0), ("airbnb", 8.5), ("flight", 250.0)];

pub const DIGITAL_DEFAULT: f64 = 0.003;

pub static DIGITAL: &[(&str, f64)] = &[("streaming", 0.0036), ("gaming", 0.012), ("social", 0.0024)];

/// Emission used for types without a dedicated table.
pub const OTHER_DEFAULT_EMISSION: f64 = 1.0;

/// Region code → grid multiplier, scanned in order against the location.
pub static REGIONAL_MULTIPLIERS: &[(&str, f64)] =
    &[("US", 1.0), ("EU", 0.8), ("CHINA", 1.3), ("INDIA", 1.1)];

pub const REGIONAL_DEFAULT: f64 = 1.0;

// =============================================================================
// BROWSING TABLES
// =============================================================================

/// Per-visit emission when the domain is unknown.
pub const WEBSITE_DEFAULT_G: f64 = 3.5;

pub static WEBSITES: &[WebsiteEnergy] = &[
    WebsiteEnergy { domain: "google.com", category: "search", co2_per_visit_g: 2.9 },
    WebsiteEnergy { domain: "bing.com", category: "search", co2_per_visit_g: 3.4 },
    WebsiteEnergy { domain: "duckduckgo.com", category: "search", co2_per_visit_g: 1.1 },
    WebsiteEnergy { domain: "facebook.com", category: "social", co2_per_visit_g: 5.7 },
    WebsiteEnergy { domain: "instagram.com", category: "social", co2_per_visit_g: 4.8 },
    WebsiteEnergy { domain: "twitter.com", category: "social", co2_per_visit_g: 3.9 },
    WebsiteEnergy { domain: "linkedin.com", category: "social", co2_per_visit_g: 5.2 },
    WebsiteEnergy { domain: "tiktok.com", category: "social", co2_per_visit_g: 8.1 },
    WebsiteEnergy { domain: "youtube.com", category: "streaming", co2_per_visit_g: 6.1 },
    WebsiteEnergy { domain: "netflix.com", category: "streaming", co2_per_visit_g: 4.3 },
    WebsiteEnergy { domain: "twitch.tv", category: "streaming", co2_per_visit_g: 9.3 },
    WebsiteEnergy { domain: "spotify.com", category: "streaming", co2_per_visit_g: 2.8 },
    WebsiteEnergy { domain: "amazon.com", category: "ecommerce", co2_per_visit_g: 4.9 },
    WebsiteEnergy { domain: "ebay.com", category: "ecommerce", co2_per_visit_g: 4.1 },
    WebsiteEnergy { domain: "shopify.com", category: "ecommerce", co2_per_visit_g: 3.5 },
    WebsiteEnergy { domain: "openai.com", category: "ai", co2_per_visit_g: 2.5 },
    WebsiteEnergy { domain: "claude.ai", category: "ai", co2_per_visit_g: 2.1 },
    WebsiteEnergy { domain: "chat.openai.com", category: "ai_chat", co2_per_visit_g: 2.7 },
    WebsiteEnergy { domain: "bard.google.com", category: "ai_chat", co2_per_visit_g: 3.2 },
    WebsiteEnergy { domain: "cnn.com", category: "news", co2_per_visit_g: 7.4 },
    WebsiteEnergy { domain: "bbc.com", category: "news", co2_per_visit_g: 3.7 },
    WebsiteEnergy { domain: "wikipedia.org", category: "reference", co2_per_visit_g: 0.8 },
    WebsiteEnergy { domain: "gmail.com", category: "email", co2_per_visit_g: 2.6 },
    WebsiteEnergy { domain: "outlook.com", category: "email", co2_per_visit_g: 3.1 },
    WebsiteEnergy { domain: "drive.google.com", category: "cloud", co2_per_visit_g: 3.4 },
    WebsiteEnergy { domain: "dropbox.com", category: "cloud", co2_per_visit_g: 3.1 },
];

/// Device emission when the device class is unknown.
pub const DEVICE_DEFAULT_G: f64 = 2.1;

pub static DEVICES: &[DeviceEnergy] = &[
    DeviceEnergy { device_type: "laptop_intel_i5", category: "laptop", browsing_watts: 25.0 },
    DeviceEnergy { device_type: "laptop_m1_macbook", category: "laptop", browsing_watts: 18.0 },
    DeviceEnergy { device_type: "laptop_gaming", category: "laptop", browsing_watts: 45.0 },
    DeviceEnergy { device_type: "desktop_office", category: "desktop", browsing_watts: 120.0 },
    DeviceEnergy { device_type: "desktop_gaming", category: "desktop", browsing_watts: 200.0 },
    DeviceEnergy { device_type: "smartphone_android", category: "mobile", browsing_watts: 2.5 },
    DeviceEnergy { device_type: "smartphone_iphone", category: "mobile", browsing_watts: 2.0 },
    DeviceEnergy { device_type: "tablet_ipad", category: "tablet", browsing_watts: 8.0 },
    DeviceEnergy { device_type: "smart_tv_55inch", category: "tv", browsing_watts: 120.0 },
    DeviceEnergy { device_type: "smart_tv_75inch", category: "tv", browsing_watts: 180.0 },
];

pub static NETWORK: &[(&str, f64)] =
    &[("wifi", 0.05), ("4g", 0.18), ("5g", 0.08), ("ethernet", 0.03)];

pub const NETWORK_DEFAULT: f64 = 0.12;

/// Estimated transfer per second on page, in MB.
pub const TRANSFER_MB_PER_SECOND: f64 = 0.1;

/// Cap on estimated transfer per visit, in MB.
pub const TRANSFER_CAP_MB: f64 = 50.0;

// =============================================================================
// GRID INTENSITY
// =============================================================================

/// US average grid intensity, the reference every device estimate is made in.
pub const REFERENCE_GRID_FACTOR: f64 = 0.709;

/// Static country → grid intensity table used when no live provider answers.
pub static GRID_INTENSITY: &[(&str, f64)] = &[
    ("US", 0.709),
    ("UK", 0.233),
    ("DE", 0.401),
    ("FR", 0.056),
    ("CA", 0.130),
    ("AU", 0.81),
];

/// Static grid intensity for a country code; unknown codes get the reference.
#[must_use]
pub fn grid_intensity(country: &str) -> f64 {
    let code = country.trim().to_ascii_uppercase();
    GRID_INTENSITY
        .iter()
        .find(|(c, _)| *c == code)
        .map_or(REFERENCE_GRID_FACTOR, |(_, f)| *f)
}

// =============================================================================
// CLASSIFICATION TABLES
// =============================================================================

/// Domain substring → category, first match wins.
pub static DOMAIN_RULES: &[(&str, ActivityCategory)] = &[
    ("google", ActivityCategory::Search),
    ("bing", ActivityCategory::Search),
    ("youtube", ActivityCategory::Streaming),
    ("netflix", ActivityCategory::Streaming),
    ("facebook", ActivityCategory::SocialMedia),
    ("twitter", ActivityCategory::SocialMedia),
    ("amazon", ActivityCategory::Shopping),
    ("shop", ActivityCategory::Shopping),
    ("openai", ActivityCategory::AiInteraction),
    ("claude", ActivityCategory::AiInteraction),
];

/// Multiplier applied for an intensity tier.
#[must_use]
pub const fn intensity_multiplier(intensity: Intensity) -> f64 {
    match intensity {
        Intensity::Low => 0.7,
        Intensity::Medium => 1.0,
        Intensity::High => 1.4,
    }
}

// =============================================================================
// LOOKUP HELPERS
// =============================================================================

/// Exact, case-insensitive key lookup in a `(key, factor)` table.
#[must_use]
pub fn lookup(table: &[(&str, f64)], key: &str) -> Option<f64> {
    let key = key.trim();
    table
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, f)| *f)
}

/// Shopping platform by name.
#[must_use]
pub fn shopping_platform(name: &str) -> Option<&'static PlatformFactor> {
    let name = name.trim();
    SHOPPING.iter().find(|p| p.platform.eq_ignore_ascii_case(name))
}

/// Transportation service by name.
#[must_use]
pub fn transportation_service(name: &str) -> Option<&'static ServiceTiers> {
    let name = name.trim();
    TRANSPORTATION
        .iter()
        .find(|s| s.service.eq_ignore_ascii_case(name))
}

/// First website whose domain (without `www.`) occurs in the given domain.
#[must_use]
pub fn website_for(domain: &str) -> Option<&'static WebsiteEnergy> {
    let domain = domain.to_ascii_lowercase();
    WEBSITES
        .iter()
        .find(|site| domain.contains(site.domain.trim_start_matches("www.")))
}

/// First device whose category occurs in the given device description.
#[must_use]
pub fn device_for(device_type: &str) -> Option<&'static DeviceEnergy> {
    let device_type = device_type.to_ascii_lowercase();
    DEVICES.iter().find(|d| device_type.contains(d.category))
}

// =============================================================================
// TESTS
// =============================================================================
