use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while calling a provider API
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request to provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("Provider call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Provider configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Whether a retry could plausibly succeed (rate limits, server-side faults).
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Api { status, .. } => {
                *status == 429 || (500..=599).contains(status)
            }
            ProviderError::Http(e) => e.is_timeout() || e.is_connect(),
            ProviderError::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Role of a chat message. The system prompt travels out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A provider reply. Some APIs return the payload as a list of content
/// blocks rather than one string; callers that do keyword matching must
/// work on [`Completion::into_text`], which joins blocks with a single
/// space, so a multi-block reply is never misread as a non-match.
#[derive(Debug, Clone)]
pub struct Completion {
    pub blocks: Vec<String>,
}

impl Completion {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            blocks: vec![text.into()],
        }
    }

    pub fn into_text(self) -> String {
        self.blocks.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.trim().is_empty())
    }
}

/// Supported provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" | "gpt" => Ok(ProviderKind::OpenAi),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// The core abstraction over LLM providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name (e.g. "anthropic/claude-sonnet-4")
    fn name(&self) -> &str;

    /// Generate a completion for the given system prompt and conversation.
    async fn generate(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<Completion, ProviderError>;
}

#[async_trait]
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn generate(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<Completion, ProviderError> {
        (**self).generate(system, messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_joins_blocks_with_single_space() {
        let completion = Completion {
            blocks: vec!["Primera parte.".to_string(), "Segunda parte.".to_string()],
        };
        assert_eq!(completion.into_text(), "Primera parte. Segunda parte.");
    }

    #[test]
    fn empty_completion_detection() {
        let completion = Completion {
            blocks: vec!["  ".to_string(), "".to_string()],
        };
        assert!(completion.is_empty());
        assert!(!Completion::from_text("hola").is_empty());
    }

    #[test]
    fn transient_error_classification() {
        assert!(ProviderError::Api {
            status: 429,
            body: "rate limited".into()
        }
        .is_transient());
        assert!(ProviderError::Api {
            status: 503,
            body: "unavailable".into()
        }
        .is_transient());
        assert!(!ProviderError::Api {
            status: 401,
            body: "unauthorized".into()
        }
        .is_transient());
        assert!(!ProviderError::Config("missing key".into()).is_transient());
    }

    #[test]
    fn provider_kind_parsing() {
        assert_eq!(
            "claude".parse::<ProviderKind>().unwrap(),
            ProviderKind::Anthropic
        );
        assert_eq!(
            "OpenAI".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenAi
        );
        assert!("mistral".parse::<ProviderKind>().is_err());
    }
}
