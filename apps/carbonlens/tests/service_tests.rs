//! HTTP client tests for the reasoning and grid services, against a local
//! mock server.

#![allow(clippy::unwrap_used, clippy::panic)]

use carbonlens::config::{Config, GridConfig, ReasoningConfig};
use carbonlens::engine::{
    ClimatiqGridProvider, EnhancedCalculator, GridIntensityProvider, OpenAiReasoner,
    ReasoningService, ServiceError,
};
use carbonlens_core::{
    ActivityCategory, BrowsingEvent, ClassificationRequest, Dependency, InsightRequest,
    Intensity,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

fn request() -> ClassificationRequest {
    let event = BrowsingEvent::from_url("https://chat.openai.com/c/1", 600.0).expect("url");
    ClassificationRequest::new(&event, "chat.openai.com")
}

// =============================================================================
// REASONING CLIENT
// =============================================================================

#[tokio::test]
async fn classify_parses_fenced_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "test-model", "max_tokens": 200})))
        .respond_with(chat_reply(
            "```json\n{\"category\": \"AI_INTERACTION\", \"intensity\": \"HIGH\", \"reasoning\": \"Chat assistant\"}\n```",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let reasoner =
        OpenAiReasoner::new(server.uri(), "test-model", Some("sk-test".to_string())).unwrap();
    let classification = reasoner.classify(&request()).await.unwrap();

    assert_eq!(classification.category, ActivityCategory::AiInteraction);
    assert_eq!(classification.intensity, Intensity::High);
    assert_eq!(classification.reasoning, "Chat assistant");
}

#[tokio::test]
async fn classify_rejects_unknown_category() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(chat_reply(r#"{"category": "GARDENING"}"#))
        .mount(&server)
        .await;

    let reasoner = OpenAiReasoner::new(server.uri(), "test-model", None).unwrap();
    let outcome = reasoner.classify(&request()).await;

    assert!(matches!(outcome, Err(ServiceError::Parse(_))));
}

#[tokio::test]
async fn server_error_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let reasoner = OpenAiReasoner::new(server.uri(), "test-model", None).unwrap();
    let outcome = reasoner.classify(&request()).await;

    assert!(matches!(
        outcome,
        Err(ServiceError::Http { status: 429, ref body }) if body == "slow down"
    ));
}

#[tokio::test]
async fn explain_parses_lists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"max_tokens": 300})))
        .respond_with(chat_reply(
            r#"{"insights": ["Long chats add up"], "recommendations": ["Batch your questions"]}"#,
        ))
        .mount(&server)
        .await;

    let reasoner = OpenAiReasoner::new(server.uri(), "test-model", None).unwrap();
    let insights = reasoner
        .explain(&InsightRequest {
            domain: "chat.openai.com".to_string(),
            time_on_page_secs: 600.0,
            device_type: "laptop".to_string(),
            category: ActivityCategory::AiInteraction,
            emissions_g: 8.2,
        })
        .await
        .unwrap();

    assert_eq!(insights.insights, vec!["Long chats add up".to_string()]);
    assert_eq!(insights.recommendations, vec!["Batch your questions".to_string()]);
}

// =============================================================================
// GRID PROVIDER
// =============================================================================

#[tokio::test]
async fn grid_factor_from_search_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/v1/search"))
        .and(query_param("region", "DE"))
        .and(header("authorization", "Bearer grid-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"region": "DE", "factor": 0.38}]
        })))
        .mount(&server)
        .await;

    let provider = ClimatiqGridProvider::new(server.uri(), "grid-key").unwrap();
    let factor = provider.factor_for("de").await.unwrap();

    assert!((factor.factor - 0.38).abs() < 1e-9);
    assert!((factor.confidence.value() - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn grid_without_matching_region_uses_country_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&server)
        .await;

    let provider = ClimatiqGridProvider::new(server.uri(), "grid-key").unwrap();
    let factor = provider.factor_for("FR").await.unwrap();

    assert!((factor.factor - 0.056).abs() < 1e-9);
}

// =============================================================================
// CONFIGURED PIPELINE
// =============================================================================

#[tokio::test]
async fn configured_pipeline_reaches_both_services() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"max_tokens": 200})))
        .respond_with(chat_reply(
            r#"{"category": "AI_INTERACTION", "intensity": "MEDIUM", "reasoning": "Chat"}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"max_tokens": 300})))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"region": "US", "factor": 0.709}]
        })))
        .mount(&server)
        .await;

    let config = Config {
        reasoning: ReasoningConfig {
            base_url: server.uri(),
            model: "test-model".to_string(),
            api_key: Some("sk-test".to_string()),
            ..ReasoningConfig::default()
        },
        grid: GridConfig {
            base_url: server.uri(),
            api_key: Some("grid-key".to_string()),
            ..GridConfig::default()
        },
        ..Config::default()
    };
    let calculator = EnhancedCalculator::from_config(&config).unwrap();

    let event = BrowsingEvent::from_url("https://chat.openai.com/c/1", 600.0).unwrap();
    let result = calculator.calculate(&event).await;

    assert_eq!(result.activity_type, Some(ActivityCategory::AiInteraction));
    assert_eq!(result.degraded, vec![Dependency::Insights]);
    let breakdown = result.breakdown.expect("breakdown");
    let share = breakdown.ai_processing.expect("ai share");
    assert!((share - result.emissions * 0.3).abs() < 0.01);
}
