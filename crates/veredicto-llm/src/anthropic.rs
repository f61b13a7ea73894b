use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ChatMessage, ChatRole, Completion, Provider, ProviderError};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

/// Anthropic messages API client
pub struct AnthropicProvider {
    name: String,
    model: String,
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            name: format!("anthropic/{}", model),
            model,
            api_key,
            base_url: ANTHROPIC_API_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn role_to_string(role: ChatRole) -> &'static str {
        match role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    fn build_body(&self, system: &str, messages: &[ChatMessage]) -> AnthropicRequest {
        AnthropicRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|m| AnthropicMessage {
                    role: Self::role_to_string(m.role).to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            // The messages API takes the system prompt as a top-level field
            system: (!system.is_empty()).then(|| system.to_string()),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<Completion, ProviderError> {
        let body = self.build_body(system, messages);

        debug!(model = %self.model, messages = messages.len(), "Anthropic request");

        let response = self
            .http
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let parsed: AnthropicResponse = response.json().await?;

        // Each text block is kept separate; joining is the caller's concern
        let blocks: Vec<String> = parsed
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text)
            .collect();

        if blocks.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(Completion { blocks })
    }
}
