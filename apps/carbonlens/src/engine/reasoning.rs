//! OpenAI-compatible reasoning client.
//!
//! Works with any chat-completions API (OpenAI, OpenRouter, vLLM, Ollama).

use super::services::{ReasoningService, ServiceError};
use crate::config::ReasoningConfig;
use async_trait::async_trait;
use carbonlens_core::aggregator::{build_insight_prompt, parse_insights};
use carbonlens_core::classifier::{build_classification_prompt, parse_classification};
use carbonlens_core::{Classification, ClassificationRequest, InsightRequest, Insights};
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};

const CLASSIFICATION_TEMPERATURE: f32 = 0.3;
const INSIGHT_TEMPERATURE: f32 = 0.7;

/// Chat-completions backed [`ReasoningService`].
pub struct OpenAiReasoner {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    classification_max_tokens: u32,
    insight_max_tokens: u32,
}

impl OpenAiReasoner {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, ServiceError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ServiceError::Unavailable(format!("HTTP client: {e}")))?;

        let defaults = ReasoningConfig::default();
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            classification_max_tokens: defaults.classification_max_tokens,
            insight_max_tokens: defaults.insight_max_tokens,
        })
    }

    pub fn from_config(config: &ReasoningConfig) -> Result<Self, ServiceError> {
        let mut reasoner = Self::new(&config.base_url, &config.model, config.api_key.clone())?;
        reasoner.classification_max_tokens = config.classification_max_tokens;
        reasoner.insight_max_tokens = config.insight_max_tokens;
        Ok(reasoner)
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Send one user prompt and return the first choice's content.
    async fn complete(
        &self,
        prompt: String,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, ServiceError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature,
        };

        let mut request = self.client.post(self.chat_completions_url());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .json(&body)
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

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| ServiceError::Parse("No choices in response".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

#[async_trait]
impl ReasoningService for OpenAiReasoner {
    fn id(&self) -> &str {
        &self.model
    }

    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<Classification, ServiceError> {
        let reply = self
            .complete(
                build_classification_prompt(request),
                self.classification_max_tokens,
                CLASSIFICATION_TEMPERATURE,
            )
            .await?;
        parse_classification(&reply).map_err(|e| ServiceError::Parse(e.to_string()))
    }

    async fn explain(&self, request: &InsightRequest) -> Result<Insights, ServiceError> {
        let reply = self
            .complete(
                build_insight_prompt(request),
                self.insight_max_tokens,
                INSIGHT_TEMPERATURE,
            )
            .await?;
        parse_insights(&reply).map_err(|e| ServiceError::Parse(e.to_string()))
    }
}
