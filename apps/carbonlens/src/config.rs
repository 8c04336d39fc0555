//! # Configuration
//!
//! Optional `carbonlens.toml` plus environment overrides.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [reasoning]
//! base_url = "https://openrouter.ai/api/v1"
//! model = "deepseek/deepseek-chat"
//! timeout_secs = 10
//!
//! [grid]
//! base_url = "https://api.climatiq.io"
//!
//! [aggregation]
//! ai_processing_share = 0.30
//! reference_grid_factor = 0.709
//! ```
//!
//! ## Environment Variables
//!
//! - `CARBONLENS_REASONING_API_KEY`: key for the reasoning service
//! - `CARBONLENS_GRID_API_KEY`: key for the grid-intensity provider
//!
//! Secrets are read from the environment only when the file leaves them unset.

use carbonlens_core::{AggregationPolicy, CarbonError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "carbonlens.toml";

pub const REASONING_API_KEY_ENV: &str = "CARBONLENS_REASONING_API_KEY";
pub const GRID_API_KEY_ENV: &str = "CARBONLENS_GRID_API_KEY";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// OpenAI-compatible chat-completions endpoint used for classification and
/// insights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub classification_max_tokens: u32,
    pub insight_max_tokens: u32,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            classification_max_tokens: 200,
            insight_max_tokens: 300,
        }
    }
}

/// Live grid-intensity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.climatiq.io".to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub reasoning: ReasoningConfig,
    pub grid: GridConfig,
    pub aggregation: AggregationPolicy,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `carbonlens.toml` in the
    /// working directory is used if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, CarbonError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, CarbonError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CarbonError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, CarbonError> {
        toml::from_str(text).map_err(|e| CarbonError::ConfigError(e.to_string()))
    }

    /// Fill unset secrets from the environment.
    pub fn apply_env_overrides(&mut self) {
        if self.reasoning.api_key.is_none() {
            self.reasoning.api_key = env_secret(REASONING_API_KEY_ENV);
        }
        if self.grid.api_key.is_none() {
            self.grid.api_key = env_secret(GRID_API_KEY_ENV);
        }
    }

    pub fn validate(&self) -> Result<(), CarbonError> {
        self.aggregation.validate()?;
        if self.reasoning.timeout_secs == 0 || self.grid.timeout_secs == 0 {
            return Err(CarbonError::ConfigError(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Bound applied to every external call.
    #[must_use]
    pub fn service_timeout(&self) -> Duration {
        Duration::from_secs(self.reasoning.timeout_secs.max(self.grid.timeout_secs))
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_secret(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::from_toml_str("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 9000

            [aggregation]
            ai_processing_share = 0.25
            "#,
        )
        .expect("parse");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!((config.aggregation.ai_processing_share - 0.25).abs() < f64::EPSILON);
        assert!((config.aggregation.reference_grid_factor - 0.709).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = Config::from_toml_str("[server\nport = ");
        assert!(matches!(err, Err(CarbonError::ConfigError(_))));
    }

    #[test]
    fn out_of_range_share_fails_validation() {
        let config = Config::from_toml_str("[aggregation]\nai_processing_share = 2.0\n")
            .expect("parse");
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let config = Config::from_toml_str("[grid]\ntimeout_secs = 0\n").expect("parse");
        assert!(config.validate().is_err());
    }
}
