//! Anthropic Messages API simplifier.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::domain::ports::{SimplificationRequest, Simplifier, SimplifierError, SimplifierResponse};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic simplifier
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key sent as `x-api-key`
    pub api_key: String,
    /// Model name sent with every request
    pub model: String,
    /// Base URL for the API (for testing/proxies)
    pub base_url: String,
    /// Output token cap per request
    pub max_tokens: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// System prompt describing the rewrite task for one level and era.
pub fn system_prompt(request: &SimplificationRequest) -> String {
    format!(
        "You rewrite passages of literature for language learners at CEFR level {level} ({description}). \
         The source style is: {era}. Keep every event, character, negation, condition, number and name. \
         Reply with the rewritten passage only, without commentary.",
        level = request.target_level,
        description = request.target_level.description(),
        era = request.era_hint.style_hint(),
    )
}

/// Simplifier backed by the Anthropic Messages API.
pub struct AnthropicSimplifier {
    http_client: ReqwestClient,
    config: AnthropicConfig,
}

impl AnthropicSimplifier {
    /// Client with pooled connections; trailing slashes are trimmed from the base URL.
    pub fn new(mut config: AnthropicConfig) -> Result<Self, SimplifierError> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| SimplifierError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self { http_client, config })
    }
}

#[async_trait]
impl Simplifier for AnthropicSimplifier {
    #[instrument(skip(self, request), fields(level = %request.target_level, model = %self.config.model))]
    async fn simplify(&self, request: &SimplificationRequest) -> Result<SimplifierResponse, SimplifierError> {
        let body = MessageRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: system_prompt(request),
            messages: vec![Message {
                role: "user",
                content: request.text.clone(),
            }],
        };

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| SimplifierError::from_reqwest(&e, Duration::from_secs(self.config.timeout_secs)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(SimplifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| SimplifierError::from_reqwest(&e, Duration::from_secs(self.config.timeout_secs)))?;
        debug!(stop_reason = ?message.stop_reason, blocks = message.content.len(), "Message response");

        if message.stop_reason.as_deref() == Some("refusal") {
            return Err(SimplifierError::Refused("model refused the request".to_string()));
        }

        let candidate = message
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Err(SimplifierError::EmptyContent);
        }

        Ok(SimplifierResponse {
            candidate: candidate.to_string(),
            reported_quality: None,
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CefrLevel, EraLabel};

    fn config(base_url: String) -> AnthropicConfig {
        AnthropicConfig {
            api_key: "test-key".to_string(),
            model: "claude-test".to_string(),
            base_url,
            max_tokens: 1024,
            timeout_secs: 5,
        }
    }

    fn request() -> SimplificationRequest {
        SimplificationRequest {
            text: "Whilst the carriage rolled onward, she perceived his countenance.".to_string(),
            target_level: CefrLevel::B1,
            era_hint: EraLabel::NineteenthCenturyFormal,
        }
    }

    #[test]
    fn test_system_prompt_mentions_level_and_era() {
        let prompt = system_prompt(&request());
        assert!(prompt.contains("B1"));
        assert!(prompt.contains("19th-century prose"));
    }

    #[tokio::test]
    async fn test_text_blocks_joined() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"content":[{"type":"text","text":"As the carriage moved on, she saw his face."}],"stop_reason":"end_turn"}"#,
            )
            .create_async()
            .await;

        let client = AnthropicSimplifier::new(config(server.url())).unwrap();
        let response = client.simplify(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.candidate, "As the carriage moved on, she saw his face.");
        assert!(response.reported_quality.is_none());
    }

    #[tokio::test]
    async fn test_no_text_is_empty_content() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content":[],"stop_reason":"end_turn"}"#)
            .create_async()
            .await;

        let client = AnthropicSimplifier::new(config(server.url())).unwrap();
        let err = client.simplify(&request()).await.unwrap_err();
        assert!(matches!(err, SimplifierError::EmptyContent));
    }

    #[tokio::test]
    async fn test_rate_limit_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(429)
            .with_body(r#"{"error":{"type":"rate_limit_error"}}"#)
            .create_async()
            .await;

        let client = AnthropicSimplifier::new(config(server.url())).unwrap();
        let err = client.simplify(&request()).await.unwrap_err();
        assert!(matches!(err, SimplifierError::Status { status: 429, .. }));
    }
}
