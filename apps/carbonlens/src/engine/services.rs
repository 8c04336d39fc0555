//! Service traits for the external dependencies of the enhanced pipeline.
//!
//! The pipeline only sees these traits; production clients live in
//! [`super::reasoning`] and [`super::grid`], tests substitute stubs.

use async_trait::async_trait;
use carbonlens_core::{
    Classification, ClassificationRequest, InsightRequest, Insights, RegionalFactor,
};

/// Failure of an external call. Every variant sends the pipeline down the
/// degraded path.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Not configured (e.g. no API key).
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// No answer within the configured bound.
    #[error("Timed out after {0} ms")]
    Timeout(u128),

    /// Non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection or transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Answer received but unusable.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Classifies browsing events and writes insights about results.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Identifier for logs (usually the model name).
    fn id(&self) -> &str;

    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<Classification, ServiceError>;

    async fn explain(&self, request: &InsightRequest) -> Result<Insights, ServiceError>;
}

/// Live grid carbon intensity by country.
#[async_trait]
pub trait GridIntensityProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn factor_for(&self, country: &str) -> Result<RegionalFactor, ServiceError>;
}

/// Stand-in for a service that has no credentials configured.
///
/// Every call fails with [`ServiceError::Unavailable`], so the pipeline uses
/// the local default without attempting the network.
#[derive(Debug, Clone)]
pub struct Unconfigured {
    reason: &'static str,
}

impl Unconfigured {
    #[must_use]
    pub const fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

#[async_trait]
impl ReasoningService for Unconfigured {
    fn id(&self) -> &str {
        "unconfigured"
    }

    async fn classify(
        &self,
        _request: &ClassificationRequest,
    ) -> Result<Classification, ServiceError> {
        Err(ServiceError::Unavailable(self.reason.to_string()))
    }

    async fn explain(&self, _request: &InsightRequest) -> Result<Insights, ServiceError> {
        Err(ServiceError::Unavailable(self.reason.to_string()))
    }
}

#[async_trait]
impl GridIntensityProvider for Unconfigured {
    fn id(&self) -> &str {
        "unconfigured"
    }

    async fn factor_for(&self, _country: &str) -> Result<RegionalFactor, ServiceError> {
        Err(ServiceError::Unavailable(self.reason.to_string()))
    }
}
