//! # Enhanced Engine
//!
//! Async layer between the pure estimator and the external services.
//!
//! - `services`: traits and the error type for external calls
//! - `reasoning`: OpenAI-compatible classification and insight client
//! - `grid`: live grid-intensity client
//! - `pipeline`: the enhanced calculator with its fallback chain

pub mod grid;
pub mod pipeline;
pub mod reasoning;
pub mod services;

pub use grid::ClimatiqGridProvider;
pub use pipeline::{DEFAULT_SERVICE_TIMEOUT, EnhancedCalculator};
pub use reasoning::OpenAiReasoner;
pub use services::{GridIntensityProvider, ReasoningService, ServiceError, Unconfigured};
