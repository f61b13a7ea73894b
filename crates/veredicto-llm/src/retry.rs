use async_trait::async_trait;
use tracing::warn;

use crate::{ChatMessage, Completion, Provider, ProviderError};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Wraps a provider with retry-on-transient-failure behavior.
/// Auth and malformed-request errors are surfaced immediately.
pub struct RetryingProvider<P: Provider> {
    inner: P,
    config: RetryConfig,
}

impl<P: Provider> RetryingProvider<P> {
    pub fn new(inner: P, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    fn parse_retry_after(body: &str) -> Option<u64> {
        let lower = body.to_lowercase();
        let pos = lower.find("retry-after")?;
        for word in body[pos..].split_whitespace().skip(1) {
            let cleaned = word.trim_end_matches(|c: char| !c.is_ascii_digit());
            if let Ok(secs) = cleaned.parse::<u64>() {
                return Some(secs * 1000);
            }
        }
        None
    }

    fn compute_delay(&self, attempt: u32) -> u64 {
        let base = self.config.initial_delay_ms as f64
            * self.config.backoff_multiplier.powi(attempt as i32);
        let jitter = (base * 0.1 * deterministic_jitter(attempt)) as u64;
        (base as u64).saturating_add(jitter).min(self.config.max_delay_ms)
    }
}

/// Attempt-seeded jitter, avoids pulling in a rand dependency.
fn deterministic_jitter(attempt: u32) -> f64 {
    let x = attempt.wrapping_mul(2654435761);
    (x % 100) as f64 / 100.0
}

#[async_trait]
impl<P: Provider> Provider for RetryingProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<Completion, ProviderError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.inner.generate(system, messages).await {
                Ok(completion) => return Ok(completion),
                Err(e) => {
                    if attempt == self.config.max_retries || !e.is_transient() {
                        return Err(e);
                    }

                    let delay = match &e {
                        ProviderError::Api { body, .. } => Self::parse_retry_after(body),
                        _ => None,
                    }
                    .unwrap_or_else(|| self.compute_delay(attempt));

                    warn!(
                        provider = self.inner.name(),
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay,
                        error = %e,
                        "Retrying provider call"
                    );

                    tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(ProviderError::EmptyResponse))
    }
}
