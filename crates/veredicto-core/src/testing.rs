//! Scripted fake providers for exercising the loop without a network.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use veredicto_llm::{ChatMessage, Completion, Provider, ProviderError};

enum Script {
    Text(String),
    Blocks(Vec<String>),
}

/// Replays a fixed queue of replies; an exhausted queue fails like a
/// provider outage.
pub struct ScriptedProvider {
    name: &'static str,
    replies: Mutex<VecDeque<Script>>,
    stalled: bool,
}

impl ScriptedProvider {
    pub fn new(name: &'static str, replies: Vec<&str>) -> Self {
        Self {
            name,
            replies: Mutex::new(replies.into_iter().map(|r| Script::Text(r.to_string())).collect()),
            stalled: false,
        }
    }

    /// Append a multi-block reply to the queue
    pub fn then_blocks(self, blocks: Vec<&str>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Script::Blocks(blocks.into_iter().map(String::from).collect()));
        self
    }

    /// A provider whose every call fails
    pub fn failing(name: &'static str) -> Self {
        Self::new(name, vec![])
    }

    /// A provider whose calls never return
    pub fn stalled(name: &'static str) -> Self {
        Self {
            name,
            replies: Mutex::new(VecDeque::new()),
            stalled: true,
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn generate(
        &self,
        _system: &str,
        _messages: &[ChatMessage],
    ) -> Result<Completion, ProviderError> {
        if self.stalled {
            sleep_forever().await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Script::Text(text)) => Ok(Completion::from_text(text)),
            Some(Script::Blocks(blocks)) => Ok(Completion { blocks }),
            None => Err(ProviderError::Api {
                status: 500,
                body: "scripted outage".to_string(),
            }),
        }
    }
}

async fn sleep_forever() {
    tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
}

/// Routes replies by inspecting the prompt, so concurrent loops stay
/// deterministic regardless of scheduling order.
pub struct RuleProvider {
    name: &'static str,
    rule: Box<dyn Fn(&str) -> Result<Completion, ProviderError> + Send + Sync>,
}

impl RuleProvider {
    pub fn new(
        name: &'static str,
        rule: impl Fn(&str) -> Result<Completion, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            rule: Box::new(rule),
        }
    }
}

#[async_trait]
impl Provider for RuleProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn generate(
        &self,
        _system: &str,
        messages: &[ChatMessage],
    ) -> Result<Completion, ProviderError> {
        let prompt = messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        (self.rule)(prompt)
    }
}

pub fn outage() -> ProviderError {
    ProviderError::Api {
        status: 500,
        body: "scripted outage".to_string(),
    }
}
