use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use veredicto_critic::{extract, AnalysisPrompts, CriticVerdict};
use veredicto_llm::{ChatMessage, Provider, ProviderError};
use veredicto_logging::{LogEvent, Logger};

use crate::evaluation::ERROR_PLACEHOLDER;
use crate::transcript::{Role, Transcript};

/// Tunables for one consensus loop
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    /// Maximum critique/revise cycles before giving up
    pub max_rounds: u32,
    /// Time limit on any single provider call
    pub call_timeout: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            call_timeout: Duration::from_secs(120),
        }
    }
}

/// What one loop works on: a display label, the rubric text, and the
/// opening drafter prompt.
#[derive(Debug, Clone)]
pub struct LoopSubject {
    pub label: String,
    pub rubric: String,
    pub draft_prompt: String,
}

/// How one loop ended. `failure` is set when a provider call aborted the
/// loop; siblings are unaffected.
#[derive(Debug)]
pub struct Settlement {
    pub consensus_reached: bool,
    pub final_text: Option<String>,
    pub transcript: Transcript,
    pub rounds: u32,
    pub failure: Option<String>,
}

enum LoopState {
    Drafting,
    Critiquing { round: u32 },
    Revising { round: u32, feedback: String },
    Approved { round: u32, final_text: String },
    Exhausted,
}

/// Drives the draft/critique/revise protocol between two provider roles.
///
/// The drafter produces and revises the substantive judgment; the critic
/// bootstraps a second independent draft, then approves or pushes back
/// each round. All steps within one loop are strictly sequential.
pub struct ConsensusEngine {
    drafter: Arc<dyn Provider>,
    critic: Arc<dyn Provider>,
    settings: LoopSettings,
    logger: Arc<Logger>,
}

impl Clone for ConsensusEngine {
    fn clone(&self) -> Self {
        Self {
            drafter: self.drafter.clone(),
            critic: self.critic.clone(),
            settings: self.settings,
            logger: self.logger.clone(),
        }
    }
}

impl ConsensusEngine {
    pub fn new(
        drafter: Arc<dyn Provider>,
        critic: Arc<dyn Provider>,
        settings: LoopSettings,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            drafter,
            critic,
            settings,
            logger,
        }
    }

    /// Run the full state machine for one (subject, rubric) pair.
    ///
    /// Never returns an error: provider failures downgrade the settlement
    /// to a placeholder with the failure captured in the transcript.
    pub async fn settle(&self, subject: &LoopSubject) -> Settlement {
        let mut transcript = Transcript::new();
        let mut state = LoopState::Drafting;

        loop {
            state = match state {
                LoopState::Drafting => {
                    // Two-model bootstrap: the drafter proposes, then the
                    // critic-side model produces its own independent
                    // judgment. Round 1 carries both as Drafter entries.
                    let primary = match self
                        .call(&self.drafter, AnalysisPrompts::drafter_system(), &subject.draft_prompt)
                        .await
                    {
                        Ok(text) => text,
                        Err(e) => return self.abort(subject, transcript, 1, Role::Drafter, e),
                    };
                    transcript.push(1, Role::Drafter, primary);
                    self.logger.log(&LogEvent::DraftProduced {
                        criterion: subject.label.clone(),
                        round: 1,
                        provider: self.drafter.name().to_string(),
                    });

                    let secondary = match self
                        .call(&self.critic, AnalysisPrompts::drafter_system(), &subject.draft_prompt)
                        .await
                    {
                        Ok(text) => text,
                        Err(e) => return self.abort(subject, transcript, 1, Role::Drafter, e),
                    };
                    transcript.push(1, Role::Drafter, secondary);
                    self.logger.log(&LogEvent::DraftProduced {
                        criterion: subject.label.clone(),
                        round: 1,
                        provider: self.critic.name().to_string(),
                    });

                    LoopState::Critiquing { round: 1 }
                }

                LoopState::Critiquing { round } => {
                    let prompt = AnalysisPrompts::critique(
                        &subject.label,
                        &subject.rubric,
                        &transcript.render(),
                    );
                    let critique = match self
                        .call(&self.critic, AnalysisPrompts::critic_system(), &prompt)
                        .await
                    {
                        Ok(text) => text,
                        Err(e) => return self.abort(subject, transcript, round, Role::Critic, e),
                    };

                    let verdict = CriticVerdict::parse(&critique);
                    // The judgment being critiqued, not the critique itself
                    let latest_draft = transcript.last_drafter_content().map(str::to_string);
                    transcript.push(round, Role::Critic, critique.clone());

                    self.logger.log(&LogEvent::CritiqueProduced {
                        criterion: subject.label.clone(),
                        round,
                        approved: verdict.is_approved(),
                    });

                    match (verdict, latest_draft) {
                        (CriticVerdict::Approved, Some(final_text)) => LoopState::Approved {
                            round,
                            final_text,
                        },
                        (CriticVerdict::Approved, None) => {
                            // Cannot approve what was never drafted
                            warn!(label = %subject.label, "Approval with empty draft history");
                            LoopState::Exhausted
                        }
                        (CriticVerdict::Revise, _) => LoopState::Revising {
                            round,
                            feedback: critique,
                        },
                    }
                }

                LoopState::Revising { round, feedback } => {
                    let previous = transcript
                        .last_drafter_content()
                        .unwrap_or_default()
                        .to_string();
                    let prompt = AnalysisPrompts::revise(&previous, &feedback);
                    let revision = match self
                        .call(&self.drafter, AnalysisPrompts::drafter_system(), &prompt)
                        .await
                    {
                        Ok(text) => text,
                        Err(e) => return self.abort(subject, transcript, round, Role::Drafter, e),
                    };
                    transcript.push(round, Role::Drafter, revision);
                    self.logger.log(&LogEvent::RevisionProduced {
                        criterion: subject.label.clone(),
                        round,
                    });

                    let next = round + 1;
                    if next > self.settings.max_rounds {
                        LoopState::Exhausted
                    } else {
                        LoopState::Critiquing { round: next }
                    }
                }

                LoopState::Approved { round, final_text } => {
                    self.logger.log(&LogEvent::ConsensusReached {
                        criterion: subject.label.clone(),
                        rounds: round,
                    });
                    return Settlement {
                        consensus_reached: true,
                        final_text: Some(final_text),
                        transcript,
                        rounds: round,
                        failure: None,
                    };
                }

                LoopState::Exhausted => {
                    self.logger.log(&LogEvent::RoundsExhausted {
                        criterion: subject.label.clone(),
                        rounds: self.settings.max_rounds,
                    });
                    // Carry the best available work forward, never nothing
                    let final_text = transcript
                        .last_drafter_content()
                        .map(str::to_string)
                        .unwrap_or_else(|| ERROR_PLACEHOLDER.to_string());
                    return Settlement {
                        consensus_reached: false,
                        final_text: Some(final_text),
                        transcript,
                        rounds: self.settings.max_rounds,
                        failure: None,
                    };
                }
            };
        }
    }

    /// One-shot numeric scoring call over a settled judgment. Out-of-range
    /// or unparseable replies, and provider failures, all yield `None`.
    pub async fn score(&self, title: &str, body: &str, final_text: &str) -> Option<u8> {
        let prompt = AnalysisPrompts::score(title, body, final_text);
        match self
            .call(&self.critic, AnalysisPrompts::critic_system(), &prompt)
            .await
        {
            Ok(reply) => extract::extract_score(&reply),
            Err(e) => {
                warn!(error = %e, "Scoring call failed");
                None
            }
        }
    }

    /// Ask for source fragments backing each judgment; raw text, to be
    /// parsed by the caller.
    pub async fn citations(
        &self,
        title: &str,
        body: &str,
        judgments: &str,
    ) -> Result<String, ProviderError> {
        let prompt = AnalysisPrompts::citations(title, body, judgments);
        self.call(&self.critic, AnalysisPrompts::critic_system(), &prompt)
            .await
    }

    /// Summarize the settled judgments into one general assessment
    pub async fn summarize(&self, title: &str, judgments: &str) -> Result<String, ProviderError> {
        let prompt = AnalysisPrompts::general_assessment(title, judgments);
        self.call(&self.critic, AnalysisPrompts::critic_system(), &prompt)
            .await
    }

    /// Issue one provider call under the per-call timeout. Multi-block
    /// replies are joined with a single space before any downstream
    /// keyword matching.
    async fn call(
        &self,
        provider: &Arc<dyn Provider>,
        system: &str,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let messages = [ChatMessage::user(prompt)];
        debug!(provider = provider.name(), prompt_len = prompt.len(), "Provider call");
        match tokio::time::timeout(self.settings.call_timeout, provider.generate(system, &messages))
            .await
        {
            Ok(Ok(completion)) => Ok(completion.into_text()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProviderError::Timeout(self.settings.call_timeout)),
        }
    }

    /// Downgrade a provider failure to a placeholder settlement; the
    /// error message becomes the transcript's last entry.
    fn abort(
        &self,
        subject: &LoopSubject,
        mut transcript: Transcript,
        round: u32,
        role: Role,
        error: ProviderError,
    ) -> Settlement {
        let message = error.to_string();
        self.logger.log(&LogEvent::ProviderFailed {
            criterion: subject.label.clone(),
            error: message.clone(),
        });
        transcript.push(round, role, format!("error del proveedor: {}", message));
        Settlement {
            consensus_reached: false,
            final_text: Some(ERROR_PLACEHOLDER.to_string()),
            transcript,
            rounds: round,
            failure: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use veredicto_logging::LogFormat;

    fn engine(drafter: ScriptedProvider, critic: ScriptedProvider) -> ConsensusEngine {
        ConsensusEngine::new(
            Arc::new(drafter),
            Arc::new(critic),
            LoopSettings::default(),
            Arc::new(Logger::new(LogFormat::Json)),
        )
    }

    fn subject() -> LoopSubject {
        LoopSubject {
            label: "Citación de fuentes".to_string(),
            rubric: "La noticia debe citar sus fuentes.".to_string(),
            draft_prompt: "Valora la noticia.".to_string(),
        }
    }

    #[tokio::test]
    async fn approval_on_first_critique_settles_on_latest_draft() {
        let drafter = ScriptedProvider::new("drafter", vec!["Borrador primario"]);
        let critic = ScriptedProvider::new(
            "critic",
            vec!["Borrador secundario", "La valoración queda aprobada."],
        );

        let settlement = engine(drafter, critic).settle(&subject()).await;

        assert!(settlement.consensus_reached);
        // The approved judgment is the most recent Drafter entry before
        // the critique: the secondary bootstrap draft
        assert_eq!(settlement.final_text.as_deref(), Some("Borrador secundario"));
        assert_eq!(settlement.rounds, 1);
        // Round 1: two drafts plus the critique
        assert_eq!(settlement.transcript.len(), 3);
    }

    #[tokio::test]
    async fn exhaustion_after_three_cycles_keeps_last_revision() {
        let drafter = ScriptedProvider::new(
            "drafter",
            vec!["Borrador", "Revisión 1", "Revisión 2", "Revisión 3"],
        );
        let critic = ScriptedProvider::new(
            "critic",
            vec![
                "Borrador secundario",
                "Faltan citas.",
                "Sigue faltando contexto.",
                "Aún es impreciso.",
            ],
        );

        let settlement = engine(drafter, critic).settle(&subject()).await;

        assert!(!settlement.consensus_reached);
        assert_eq!(settlement.final_text.as_deref(), Some("Revisión 3"));
        assert_eq!(settlement.rounds, 3);
        // 2 bootstrap drafts + 3 critique/revision pairs
        assert_eq!(settlement.transcript.len(), 8);
        assert!(settlement
            .transcript
            .entries()
            .iter()
            .all(|e| e.round <= 3));
    }

    #[tokio::test]
    async fn approval_in_later_round_settles_on_latest_revision() {
        let drafter = ScriptedProvider::new("drafter", vec!["Borrador", "Revisión mejorada"]);
        let critic = ScriptedProvider::new(
            "critic",
            vec![
                "Borrador secundario",
                "Añade las citas que faltan.",
                "Ahora sí, valoración adecuada.",
            ],
        );

        let settlement = engine(drafter, critic).settle(&subject()).await;

        assert!(settlement.consensus_reached);
        assert_eq!(settlement.final_text.as_deref(), Some("Revisión mejorada"));
        assert_eq!(settlement.rounds, 2);
    }

    #[tokio::test]
    async fn multi_block_critique_is_joined_before_keyword_matching() {
        let drafter = ScriptedProvider::new("drafter", vec!["Borrador"]);
        let critic = ScriptedProvider::new("critic", vec!["Borrador secundario"])
            .then_blocks(vec!["La valoración queda", "aprobada."]);

        let settlement = engine(drafter, critic).settle(&subject()).await;

        assert!(settlement.consensus_reached);
    }

    #[tokio::test]
    async fn provider_failure_downgrades_to_placeholder() {
        let drafter = ScriptedProvider::failing("drafter");
        let critic = ScriptedProvider::new("critic", vec!["no llega a usarse"]);

        let settlement = engine(drafter, critic).settle(&subject()).await;

        assert!(!settlement.consensus_reached);
        assert_eq!(settlement.final_text.as_deref(), Some(ERROR_PLACEHOLDER));
        assert!(settlement.failure.is_some());
        let last = settlement.transcript.entries().last().unwrap();
        assert!(last.content.contains("error del proveedor"));
    }

    #[tokio::test]
    async fn mid_loop_failure_keeps_transcript_prefix() {
        // Critic bootstraps, then its first critique call fails
        let drafter = ScriptedProvider::new("drafter", vec!["Borrador"]);
        let critic = ScriptedProvider::new("critic", vec!["Borrador secundario"]);

        let settlement = engine(drafter, critic).settle(&subject()).await;

        assert!(!settlement.consensus_reached);
        assert!(settlement.failure.is_some());
        // Both bootstrap drafts survived, plus the failure entry
        assert_eq!(settlement.transcript.len(), 3);
    }

    #[tokio::test]
    async fn stalled_call_times_out_and_fails_the_loop() {
        let drafter = ScriptedProvider::stalled("drafter");
        let critic = ScriptedProvider::new("critic", vec!["no llega a usarse"]);
        let engine = ConsensusEngine::new(
            Arc::new(drafter),
            Arc::new(critic),
            LoopSettings {
                max_rounds: 3,
                call_timeout: Duration::from_millis(20),
            },
            Arc::new(Logger::new(LogFormat::Json)),
        );

        let settlement = engine.settle(&subject()).await;

        assert!(!settlement.consensus_reached);
        assert!(settlement.failure.is_some());
    }

    #[tokio::test]
    async fn score_parses_and_range_checks() {
        let scoring = engine(
            ScriptedProvider::new("drafter", vec![]),
            ScriptedProvider::new("critic", vec!["87"]),
        );
        assert_eq!(scoring.score("t", "b", "valoración").await, Some(87));

        let out_of_range = engine(
            ScriptedProvider::new("drafter", vec![]),
            ScriptedProvider::new("critic", vec!["Le doy un 250"]),
        );
        assert_eq!(out_of_range.score("t", "b", "valoración").await, None);
    }
}
