//! Climatiq-style grid intensity provider.
//!
//! Queries the emission-factor search endpoint for the country's electricity
//! supply factor. When the response carries no matching entry the static
//! country table is used; the provider still answered, so the factor counts
//! as live.

use super::services::{GridIntensityProvider, ServiceError};
use crate::config::GridConfig;
use async_trait::async_trait;
use carbonlens_core::RegionalFactor;
use carbonlens_core::tables;
use reqwest::Client;
use serde_json::Value;

const ELECTRICITY_QUERY: &str = "electricity supply grid";

/// [`GridIntensityProvider`] over the Climatiq data API.
pub struct ClimatiqGridProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ClimatiqGridProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ServiceError::Unavailable(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &GridConfig) -> Result<Option<Self>, ServiceError> {
        config
            .api_key
            .as_ref()
            .map(|key| Self::new(&config.base_url, key))
            .transpose()
    }

    fn search_url(&self) -> String {
        format!("{}/data/v1/search", self.base_url)
    }
}

/// Electricity factor for a region in a search response, kg CO₂e/kWh.
fn extract_factor(body: &Value, country: &str) -> Option<f64> {
    body.get("results")?
        .as_array()?
        .iter()
        .filter(|entry| {
            entry
                .get("region")
                .and_then(Value::as_str)
                .is_some_and(|region| region.eq_ignore_ascii_case(country))
        })
        .find_map(|entry| entry.get("factor").and_then(Value::as_f64))
        .filter(|factor| factor.is_finite() && *factor > 0.0)
}

#[async_trait]
impl GridIntensityProvider for ClimatiqGridProvider {
    fn id(&self) -> &str {
        "climatiq"
    }

    async fn factor_for(&self, country: &str) -> Result<RegionalFactor, ServiceError> {
        let country = country.trim().to_ascii_uppercase();

        let response = self
            .client
            .get(self.search_url())
            .bearer_auth(&self.api_key)
            .query(&[
                ("query", ELECTRICITY_QUERY),
                ("region", country.as_str()),
                ("data_version", "^0"),
            ])
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        let factor =
            extract_factor(&body, &country).unwrap_or_else(|| tables::grid_intensity(&country));
        Ok(RegionalFactor::live(factor))
    }
}
