//! # Activity Classifier
//!
//! Assigns a browsing event to one of nine activity categories plus an
//! intensity tier.
//!
//! Two sources exist:
//! - a reasoning service, driven by the prompt built here and answered in
//!   JSON (see [`parse_classification`])
//! - the deterministic domain rules in [`tables::DOMAIN_RULES`], used when
//!   the service is unavailable or its answer cannot be parsed

use crate::confidence::{self, Confidence};
use crate::tables;
use crate::types::{ActivityCategory, CarbonError, Intensity};
use crate::web::BrowsingEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reasoning recorded for a deterministic classification.
pub const FALLBACK_REASONING: &str = "Fallback classification";

/// Category and intensity of a browsing event.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: ActivityCategory,
    pub intensity: Intensity,
    pub confidence: Confidence,
    pub reasoning: String,
}

impl Classification {
    /// Classify by domain rules alone.
    #[must_use]
    pub fn deterministic(domain: &str) -> Self {
        Self {
            category: classify_domain(domain),
            intensity: Intensity::Medium,
            confidence: confidence::DETERMINISTIC_CLASSIFICATION,
            reasoning: FALLBACK_REASONING.to_string(),
        }
    }

    #[must_use]
    pub fn intensity_multiplier(&self) -> f64 {
        tables::intensity_multiplier(self.intensity)
    }
}

/// First domain rule contained in the lower-cased domain, else `OTHER`.
#[must_use]
pub fn classify_domain(domain: &str) -> ActivityCategory {
    let domain = domain.to_lowercase();
    tables::DOMAIN_RULES
        .iter()
        .find(|(needle, _)| domain.contains(needle))
        .map_or(ActivityCategory::Other, |(_, category)| *category)
}

// =============================================================================
// REASONING PROMPT
// =============================================================================

/// What the reasoning service is told about a page visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub url: String,
    pub domain: String,
    pub page_title: String,
    pub time_on_page_secs: f64,
    pub scroll_depth: f64,
    pub click_count: u32,
}

impl ClassificationRequest {
    #[must_use]
    pub fn new(event: &BrowsingEvent, domain: impl Into<String>) -> Self {
        Self {
            url: event.url.clone(),
            domain: domain.into(),
            page_title: event.page_title.clone(),
            time_on_page_secs: event.dwell_secs(),
            scroll_depth: event.scroll_depth,
            click_count: event.click_count,
        }
    }
}

/// Prompt asking for `{"category", "intensity", "reasoning"}` as JSON.
#[must_use]
pub fn build_classification_prompt(request: &ClassificationRequest) -> String {
    let categories = [
        (ActivityCategory::Search, "Web searches"),
        (ActivityCategory::SocialMedia, "Social platforms, messaging"),
        (ActivityCategory::Streaming, "Video/audio streaming"),
        (ActivityCategory::Shopping, "E-commerce, browsing products"),
        (ActivityCategory::AiInteraction, "Chat assistants and other AI tools"),
        (ActivityCategory::Work, "Productivity, email, documents"),
        (ActivityCategory::News, "Reading news, articles"),
        (ActivityCategory::Gaming, "Online games"),
        (ActivityCategory::Other, "Anything else"),
    ];

    let mut prompt = String::from(
        "Analyze this web activity and classify it for carbon footprint calculation:\n\n",
    );
    prompt.push_str(&format!("URL: {}\n", request.url));
    prompt.push_str(&format!("Domain: {}\n", request.domain));
    prompt.push_str(&format!("Page Title: {}\n", request.page_title));
    prompt.push_str(&format!("Time on Page: {}s\n", request.time_on_page_secs));
    prompt.push_str(&format!("Scroll Depth: {}%\n", request.scroll_depth));
    prompt.push_str(&format!("Clicks: {}\n\n", request.click_count));

    prompt.push_str("Classify this activity into one of these categories:\n");
    for (i, (category, hint)) in categories.iter().enumerate() {
        prompt.push_str(&format!("{}. {} - {}\n", i + 1, category.label(), hint));
    }

    prompt.push_str(
        "\nAlso estimate the carbon intensity (LOW/MEDIUM/HIGH) based on page complexity, \
         user interaction level and likely backend processing.\n\n",
    );
    prompt.push_str(
        r#"Respond with JSON only: {"category": "...", "intensity": "...", "reasoning": "..."}"#,
    );
    prompt
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

/// The JSON object in a model reply, tolerating code fences and prose.
pub(crate) fn json_object(text: &str) -> Result<Value, CarbonError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    let body = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    };

    let value: Value = serde_json::from_str(body)
        .map_err(|e| CarbonError::SerializationError(format!("reply is not JSON: {e}")))?;

    if value.is_object() {
        Ok(value)
    } else {
        Err(CarbonError::SerializationError(
            "reply is not a JSON object".to_string(),
        ))
    }
}

fn label_field<'a>(value: &'a Value, field: &str) -> Result<Option<&'a str>, CarbonError> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(CarbonError::SerializationError(format!(
            "{field} is not a string: {other}"
        ))),
    }
}

/// Parse a reasoning-service classification reply.
///
/// Missing fields default to `OTHER`, `MEDIUM` and empty reasoning. Malformed
/// JSON and labels outside the known sets are errors.
pub fn parse_classification(text: &str) -> Result<Classification, CarbonError> {
    let value = json_object(text)?;

    let category = match label_field(&value, "category")? {
        None => ActivityCategory::Other,
        Some(label) => ActivityCategory::from_label(label).ok_or_else(|| {
            CarbonError::SerializationError(format!("unknown category: {label}"))
        })?,
    };

    let intensity = match label_field(&value, "intensity")? {
        None => Intensity::Medium,
        Some(label) => Intensity::from_label(label).ok_or_else(|| {
            CarbonError::SerializationError(format!("unknown intensity: {label}"))
        })?,
    };

    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(Classification {
        category,
        intensity,
        confidence: confidence::REASONED_CLASSIFICATION,
        reasoning,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_rules_in_order() {
        assert_eq!(classify_domain("www.google.com"), ActivityCategory::Search);
        assert_eq!(classify_domain("WWW.NETFLIX.COM"), ActivityCategory::Streaming);
        assert_eq!(classify_domain("shop.example.com"), ActivityCategory::Shopping);
        assert_eq!(classify_domain("claude.ai"), ActivityCategory::AiInteraction);
        assert_eq!(classify_domain("example.org"), ActivityCategory::Other);
        // "google" precedes "shop"
        assert_eq!(classify_domain("shopping.google.com"), ActivityCategory::Search);
    }

    #[test]
    fn deterministic_classification() {
        let c = Classification::deterministic("www.netflix.com");
        assert_eq!(c.category, ActivityCategory::Streaming);
        assert_eq!(c.intensity, Intensity::Medium);
        assert_eq!(c.confidence.points(), 50);
        assert_eq!(c.reasoning, FALLBACK_REASONING);
    }

    #[test]
    fn prompt_embeds_event_and_categories() {
        let event = BrowsingEvent::from_url("https://news.ycombinator.com/item?id=1", 42.0)
            .expect("valid url")
            .with_page_title("Show HN");
        let prompt = build_classification_prompt(&ClassificationRequest::new(
            &event,
            "news.ycombinator.com",
        ));

        assert!(prompt.contains("Domain: news.ycombinator.com"));
        assert!(prompt.contains("Page Title: Show HN"));
        assert!(prompt.contains("Time on Page: 42s"));
        for category in ActivityCategory::ALL {
            assert!(prompt.contains(category.label()));
        }
        assert!(prompt.contains("LOW/MEDIUM/HIGH"));
    }

    #[test]
    fn parses_well_formed_reply() {
        let c = parse_classification(
            r#"{"category": "streaming", "intensity": "HIGH", "reasoning": "video"}"#,
        )
        .expect("parse");
        assert_eq!(c.category, ActivityCategory::Streaming);
        assert_eq!(c.intensity, Intensity::High);
        assert_eq!(c.confidence.points(), 85);
        assert_eq!(c.reasoning, "video");
    }

    #[test]
    fn parses_fenced_reply() {
        let reply = "```json\n{\"category\": \"NEWS\", \"intensity\": \"LOW\"}\n```";
        let c = parse_classification(reply).expect("parse");
        assert_eq!(c.category, ActivityCategory::News);
        assert_eq!(c.intensity, Intensity::Low);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let c = parse_classification("{}").expect("parse");
        assert_eq!(c.category, ActivityCategory::Other);
        assert_eq!(c.intensity, Intensity::Medium);
        assert!(c.reasoning.is_empty());

        assert!(parse_classification("").is_ok());
    }

    #[test]
    fn malformed_or_unknown_is_error() {
        assert!(parse_classification("not json at all").is_err());
        assert!(parse_classification(r#"{"category": "KNITTING"}"#).is_err());
        assert!(parse_classification(r#"{"intensity": "EXTREME"}"#).is_err());
        assert!(parse_classification(r#"{"category": 7}"#).is_err());
        assert!(parse_classification("[1, 2]").is_err());
    }
}
