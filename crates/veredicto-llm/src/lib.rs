//! LLM provider abstraction for veredicto.
//!
//! Exposes one [`Provider`] trait over the Anthropic and OpenAI chat APIs,
//! plus a retrying wrapper for transient failures. Provider replies keep
//! their content blocks separate ([`Completion`]) so downstream keyword
//! matching can join them deliberately.

mod anthropic;
mod openai;
mod retry;
mod traits;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use retry::{RetryConfig, RetryingProvider};
pub use traits::{ChatMessage, ChatRole, Completion, Provider, ProviderError, ProviderKind};

const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Create a provider by kind, reading its API key from the environment.
pub fn create_provider(
    kind: ProviderKind,
    model: Option<String>,
) -> Result<Box<dyn Provider>, ProviderError> {
    match kind {
        ProviderKind::Anthropic => {
            let api_key = std::env::var("ANTHROPIC_API_KEY")
                .map_err(|_| ProviderError::Config("ANTHROPIC_API_KEY is not set".into()))?;
            let model = model.unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
            Ok(Box::new(RetryingProvider::new(
                AnthropicProvider::new(model, api_key),
                RetryConfig::default(),
            )))
        }
        ProviderKind::OpenAi => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| ProviderError::Config("OPENAI_API_KEY is not set".into()))?;
            let model = model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
            Ok(Box::new(RetryingProvider::new(
                OpenAiProvider::new(model, api_key),
                RetryConfig::default(),
            )))
        }
    }
}
