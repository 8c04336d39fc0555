//! # Browsing Estimates
//!
//! Base estimate for a passively detected page visit. Three gram-scale
//! components:
//!
//! - server: per-visit emission of the website
//! - device: browsing power draw × dwell time, at the reference grid factor
//! - network: estimated transfer (capped) × network factor

use crate::confidence::Confidence;
use crate::tables;
use crate::types::{CarbonError, usable};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_DEVICE_TYPE: &str = "laptop";
pub const DEFAULT_NETWORK_TYPE: &str = "wifi";
pub const DEFAULT_COUNTRY: &str = "US";

const KNOWN_CONFIDENCE: Confidence = Confidence::from_points(80);
const PARTIAL_CONFIDENCE: Confidence = Confidence::from_points(60);

fn default_device_type() -> String {
    DEFAULT_DEVICE_TYPE.to_string()
}

fn default_network_type() -> String {
    DEFAULT_NETWORK_TYPE.to_string()
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

// =============================================================================
// BROWSING EVENT
// =============================================================================

/// A single page visit reported by the browser extension.
///
/// The country may arrive flat (`"country": "DE"`) or nested the way the
/// extension reports it (`"location": {"lat": .., "lng": .., "country": "DE"}`).
/// The nested value wins; a blank or absent country means `US`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BrowsingEventWire")]
pub struct BrowsingEvent {
    pub url: String,

    /// Hostname; derived from `url` when empty.
    pub domain: String,

    pub page_title: String,

    pub time_on_page_secs: f64,

    /// Percent of the page scrolled.
    pub scroll_depth: f64,

    pub click_count: u32,

    pub device_type: String,

    pub network_type: String,

    pub country: String,
}

#[derive(Deserialize)]
struct EventLocation {
    #[serde(default)]
    country: Option<String>,
}

/// Accepted input shape of a [`BrowsingEvent`].
#[derive(Deserialize)]
struct BrowsingEventWire {
    url: String,
    #[serde(default)]
    domain: String,
    #[serde(default, alias = "pageTitle")]
    page_title: String,
    #[serde(default, alias = "timeOnPage")]
    time_on_page_secs: f64,
    #[serde(default, alias = "scrollDepth")]
    scroll_depth: f64,
    #[serde(default, alias = "clickCount")]
    click_count: u32,
    #[serde(default = "default_device_type", alias = "deviceType")]
    device_type: String,
    #[serde(default = "default_network_type", alias = "networkType")]
    network_type: String,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    location: Option<EventLocation>,
}

impl From<BrowsingEventWire> for BrowsingEvent {
    fn from(wire: BrowsingEventWire) -> Self {
        let country = wire
            .location
            .and_then(|l| l.country)
            .into_iter()
            .chain(wire.country)
            .map(|c| c.trim().to_ascii_uppercase())
            .find(|c| !c.is_empty())
            .unwrap_or_else(default_country);

        Self {
            url: wire.url,
            domain: wire.domain,
            page_title: wire.page_title,
            time_on_page_secs: wire.time_on_page_secs,
            scroll_depth: wire.scroll_depth,
            click_count: wire.click_count,
            device_type: wire.device_type,
            network_type: wire.network_type,
            country,
        }
    }
}

impl BrowsingEvent {
    /// Event for a URL with every other field at its default.
    pub fn from_url(url: impl Into<String>, time_on_page_secs: f64) -> Result<Self, CarbonError> {
        let url = url.into();
        let domain = hostname(&url)?;
        Ok(Self {
            url,
            domain,
            page_title: String::new(),
            time_on_page_secs,
            scroll_depth: 0.0,
            click_count: 0,
            device_type: default_device_type(),
            network_type: default_network_type(),
            country: default_country(),
        })
    }

    #[must_use]
    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = device_type.into();
        self
    }

    #[must_use]
    pub fn with_network_type(mut self, network_type: impl Into<String>) -> Self {
        self.network_type = network_type.into();
        self
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    #[must_use]
    pub fn with_page_title(mut self, title: impl Into<String>) -> Self {
        self.page_title = title.into();
        self
    }

    /// The explicit domain, or the hostname parsed from `url`.
    pub fn resolved_domain(&self) -> Result<String, CarbonError> {
        let explicit = self.domain.trim();
        if explicit.is_empty() {
            hostname(&self.url)
        } else {
            Ok(explicit.to_ascii_lowercase())
        }
    }

    /// Dwell time in seconds; unusable values count as zero.
    #[must_use]
    pub fn dwell_secs(&self) -> f64 {
        usable(self.time_on_page_secs).unwrap_or(0.0)
    }
}

/// Hostname of a URL.
pub fn hostname(url: &str) -> Result<String, CarbonError> {
    let parsed =
        Url::parse(url.trim()).map_err(|e| CarbonError::InvalidEvent(format!("{url}: {e}")))?;
    parsed
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| CarbonError::InvalidEvent(format!("{url}: no host")))
}

// =============================================================================
// BASE ESTIMATE
// =============================================================================

/// Unadjusted browsing estimate, in grams.
#[derive(Debug, Clone, PartialEq)]
pub struct WebBaseEstimate {
    pub domain: String,
    pub server: f64,
    pub device: f64,
    pub network: f64,
    pub confidence: Confidence,
}

impl WebBaseEstimate {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.server + self.device + self.network
    }
}

/// Estimate a page visit from the website, device and network tables.
///
/// Confidence is 0.8 when both the website and the device are known, 0.6
/// otherwise.
pub fn estimate(event: &BrowsingEvent) -> Result<WebBaseEstimate, CarbonError> {
    let domain = event.resolved_domain()?;
    let secs = event.dwell_secs();

    let website = tables::website_for(&domain);
    let device = tables::device_for(&event.device_type);

    let server = website.map_or(tables::WEBSITE_DEFAULT_G, |w| w.co2_per_visit_g);
    let device_g = device.map_or(tables::DEVICE_DEFAULT_G, |d| {
        d.browsing_watts * secs / 3600.0 * tables::REFERENCE_GRID_FACTOR
    });

    let confidence = if website.is_some() && device.is_some() {
        KNOWN_CONFIDENCE
    } else {
        PARTIAL_CONFIDENCE
    };

    Ok(WebBaseEstimate {
        domain,
        server,
        device: device_g,
        network: network_emission(secs, &event.network_type),
        confidence,
    })
}

/// Network transfer emission for a dwell time, in grams.
#[must_use]
pub fn network_emission(secs: f64, network_type: &str) -> f64 {
    let transferred_mb = (secs * tables::TRANSFER_MB_PER_SECOND).min(tables::TRANSFER_CAP_MB);
    let factor = tables::lookup(tables::NETWORK, network_type).unwrap_or(tables::NETWORK_DEFAULT);
    transferred_mb * factor
}

// =============================================================================
// TESTS
// =============================================================================
