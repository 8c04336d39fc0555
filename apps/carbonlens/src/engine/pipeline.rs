//! Enhanced browsing pipeline.
//!
//! ```text
//! event ─► web base ─┬─► classification ─┐
//!                    └─► regional factor ─┴─► combine ─► insights ─► result
//! ```
//!
//! Classification and the regional lookup run concurrently. Each external
//! call is attempted once and bounded by the service timeout; a failure
//! substitutes that dependency's local default. Any error from the pipeline
//! body yields the last-resort result.

use super::services::{GridIntensityProvider, ReasoningService, ServiceError, Unconfigured};
use super::{grid::ClimatiqGridProvider, reasoning::OpenAiReasoner};
use crate::config::Config;
use carbonlens_core::aggregator::{self, AggregationPolicy, InsightRequest, Insights};
use carbonlens_core::{
    BrowsingEvent, CalculationResult, CarbonError, ClassificationRequest, DegradationTracker,
    Dependency, last_resort_result, web,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SERVICE_TIMEOUT: Duration = Duration::from_secs(10);

/// The service-assisted calculator for browsing events.
#[derive(Clone)]
pub struct EnhancedCalculator {
    reasoner: Arc<dyn ReasoningService>,
    grid: Arc<dyn GridIntensityProvider>,
    policy: AggregationPolicy,
    timeout: Duration,
}

impl EnhancedCalculator {
    pub fn new(
        reasoner: Arc<dyn ReasoningService>,
        grid: Arc<dyn GridIntensityProvider>,
    ) -> Self {
        Self {
            reasoner,
            grid,
            policy: AggregationPolicy::default(),
            timeout: DEFAULT_SERVICE_TIMEOUT,
        }
    }

    /// Calculator with no external services; every dependency degrades.
    #[must_use]
    pub fn offline() -> Self {
        Self::new(
            Arc::new(Unconfigured::new("reasoning service not configured")),
            Arc::new(Unconfigured::new("grid provider not configured")),
        )
    }

    /// Build from configuration. Services without credentials are left
    /// unconfigured.
    pub fn from_config(config: &Config) -> Result<Self, CarbonError> {
        let reasoner: Arc<dyn ReasoningService> = match &config.reasoning.api_key {
            Some(_) => Arc::new(
                OpenAiReasoner::from_config(&config.reasoning)
                    .map_err(|e| CarbonError::ConfigError(e.to_string()))?,
            ),
            None => {
                tracing::warn!("No reasoning API key configured; classification will use domain rules");
                Arc::new(Unconfigured::new("reasoning service not configured"))
            }
        };

        let grid: Arc<dyn GridIntensityProvider> = match ClimatiqGridProvider::from_config(&config.grid)
            .map_err(|e| CarbonError::ConfigError(e.to_string()))?
        {
            Some(provider) => Arc::new(provider),
            None => {
                tracing::warn!("No grid API key configured; using the reference grid factor");
                Arc::new(Unconfigured::new("grid provider not configured"))
            }
        };

        Ok(Self::new(reasoner, grid)
            .with_policy(config.aggregation)
            .with_timeout(config.service_timeout()))
    }

    #[must_use]
    pub fn with_policy(mut self, policy: AggregationPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Calculate an enhanced result. Never fails.
    pub async fn calculate(&self, event: &BrowsingEvent) -> CalculationResult {
        match self.try_calculate(event).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(url = %event.url, error = %e, "Enhanced calculation failed, using last-resort result");
                last_resort_result()
            }
        }
    }

    /// The pipeline body.
    pub async fn try_calculate(
        &self,
        event: &BrowsingEvent,
    ) -> Result<CalculationResult, CarbonError> {
        let base = web::estimate(event)?;
        let request = ClassificationRequest::new(event, base.domain.clone());

        let (classification, regional) = tokio::join!(
            self.bounded(Dependency::Classification, self.reasoner.classify(&request)),
            self.bounded(Dependency::RegionalFactor, self.grid.factor_for(&event.country)),
        );

        let mut tracker = DegradationTracker::new();
        let classification = tracker.classification(classification, &base.domain);
        let regional = tracker.regional(regional);

        let mut result = aggregator::combine(&base, &classification, &regional, &self.policy);

        let insight_request = InsightRequest {
            domain: base.domain.clone(),
            time_on_page_secs: event.dwell_secs(),
            device_type: event.device_type.clone(),
            category: classification.category,
            emissions_g: result.emissions,
        };
        let insights = match self
            .bounded(Dependency::Insights, self.reasoner.explain(&insight_request))
            .await
        {
            Ok(insights) => insights,
            Err(_) => {
                tracker.record(Dependency::Insights);
                Insights::generic()
            }
        };
        aggregator::apply_insights(&mut result, insights);

        tracing::info!(
            domain = %base.domain,
            emissions_g = result.emissions,
            confidence = result.confidence,
            state = ?tracker.state(),
            "Enhanced calculation complete"
        );

        tracker.finish(&mut result);
        Ok(result)
    }

    /// Run one external call under the service timeout.
    async fn bounded<T, F>(&self, dependency: Dependency, call: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ServiceError::Timeout(self.timeout.as_millis())),
        };

        if let Err(e) = &outcome {
            tracing::warn!(dependency = %dependency, error = %e, "Dependency failed, using local default");
        }
        outcome
    }
}
