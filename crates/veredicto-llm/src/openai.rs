use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ChatMessage, ChatRole, Completion, Provider, ProviderError};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

/// OpenAI chat completions client
pub struct OpenAiProvider {
    name: String,
    model: String,
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(model: String, api_key: String) -> Self {
        Self {
            name: format!("openai/{}", model),
            model,
            api_key,
            base_url: OPENAI_API_URL.to_string(),
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

    fn build_body(&self, system: &str, messages: &[ChatMessage]) -> OpenAiRequest {
        // Chat completions has no top-level system field; it rides as the
        // leading message instead
        let mut wire = Vec::with_capacity(messages.len() + 1);
        if !system.is_empty() {
            wire.push(OpenAiMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        for m in messages {
            wire.push(OpenAiMessage {
                role: Self::role_to_string(m.role).to_string(),
                content: m.content.clone(),
            });
        }
        OpenAiRequest {
            model: self.model.clone(),
            messages: wire,
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<Completion, ProviderError> {
        let body = self.build_body(system, messages);

        debug!(model = %self.model, messages = messages.len(), "OpenAI request");

        let response = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
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

        let parsed: OpenAiResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ProviderError::EmptyResponse)?;

        if content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(Completion::from_text(content))
    }
}
