use std::sync::Arc;

use veredicto_critic::{extract, HeadlinePrompts};
use veredicto_logging::{LogEvent, Logger};

use crate::consensus::{ConsensusEngine, LoopSubject};
use crate::evaluation::{HeadlineEvaluation, ERROR_PLACEHOLDER};
use crate::transcript::{Role, Transcript};

/// Runs the consensus loop once against the fixed headline-adequacy
/// rubric and derives the clickbait verdict.
pub struct HeadlineAnalyzer {
    engine: ConsensusEngine,
    logger: Arc<Logger>,
}

impl HeadlineAnalyzer {
    pub fn new(engine: ConsensusEngine, logger: Arc<Logger>) -> Self {
        Self { engine, logger }
    }

    pub async fn evaluate(&self, headline: &str) -> HeadlineEvaluation {
        let subject = LoopSubject {
            label: HeadlinePrompts::RUBRIC_NAME.to_string(),
            rubric: HeadlinePrompts::rubric().to_string(),
            draft_prompt: HeadlinePrompts::draft(headline),
        };

        let settlement = self.engine.settle(&subject).await;
        let proposed_headline = proposed_headline(&settlement.transcript);
        // A rewrite only exists when the original was flagged
        let is_clickbait = proposed_headline.is_some();

        self.logger
            .log(&LogEvent::HeadlineEvaluated { is_clickbait });

        HeadlineEvaluation {
            analysis: settlement
                .final_text
                .unwrap_or_else(|| ERROR_PLACEHOLDER.to_string()),
            is_clickbait,
            proposed_headline,
            transcript: settlement.transcript,
        }
    }
}

/// Find the proposed-headline marker in a finished transcript.
///
/// Rounds are scanned in ascending order; within a round the critic's
/// output is checked before the drafter's (latest first). The first match
/// wins: a proposal from an early round is never replaced by a later,
/// possibly worse suggestion.
pub fn proposed_headline(transcript: &Transcript) -> Option<String> {
    let max_round = transcript.entries().iter().map(|e| e.round).max()?;

    for round in 1..=max_round {
        let in_round = |role: Role| {
            transcript
                .entries()
                .iter()
                .filter(move |e| e.round == round && e.role == role)
        };

        for entry in in_round(Role::Critic) {
            if let Some(proposal) = extract::extract_proposed_headline(&entry.content) {
                return Some(proposal);
            }
        }
        for entry in in_round(Role::Drafter).collect::<Vec<_>>().into_iter().rev() {
            if let Some(proposal) = extract::extract_proposed_headline(&entry.content) {
                return Some(proposal);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::LoopSettings;
    use crate::testing::RuleProvider;
    use veredicto_llm::Completion;
    use veredicto_logging::LogFormat;

    fn analyzer(drafter: RuleProvider, critic: RuleProvider) -> HeadlineAnalyzer {
        let engine = ConsensusEngine::new(
            Arc::new(drafter),
            Arc::new(critic),
            LoopSettings::default(),
            Arc::new(Logger::new(LogFormat::Json)),
        );
        HeadlineAnalyzer::new(engine, Arc::new(Logger::new(LogFormat::Json)))
    }

    fn plain_drafter() -> RuleProvider {
        RuleProvider::new("drafter", |prompt| {
            if prompt.contains("Tu valoración anterior fue") {
                Ok(Completion::from_text("Análisis revisado del titular."))
            } else {
                Ok(Completion::from_text("El titular fuerza el clic."))
            }
        })
    }

    #[tokio::test]
    async fn flagged_headline_yields_proposal_and_clickbait() {
        let critic = RuleProvider::new("critic", |prompt| {
            if prompt.contains("historial completo") {
                Ok(Completion::from_text(
                    "No refleja el contenido informativo.\nTITULO PROPUESTO: Nuevo titular aquí",
                ))
            } else {
                Ok(Completion::from_text("Coincido en que es sensacionalista."))
            }
        });

        let evaluation = analyzer(plain_drafter(), critic)
            .evaluate("No creerás lo que pasó después")
            .await;

        assert!(evaluation.is_clickbait);
        assert_eq!(
            evaluation.proposed_headline.as_deref(),
            Some("Nuevo titular aquí")
        );
        // Never approved, so the loop ran out of rounds with the last
        // revision as the analysis
        assert_eq!(evaluation.analysis, "Análisis revisado del titular.");
    }

    #[tokio::test]
    async fn adequate_headline_has_no_proposal() {
        let critic = RuleProvider::new("critic", |prompt| {
            if prompt.contains("historial completo") {
                Ok(Completion::from_text("El análisis es correcto. Valoración aprobada."))
            } else {
                Ok(Completion::from_text("El titular refleja el contenido."))
            }
        });

        let evaluation = analyzer(plain_drafter(), critic)
            .evaluate("El paro sube un 2% en marzo")
            .await;

        assert!(!evaluation.is_clickbait);
        assert_eq!(evaluation.proposed_headline, None);
        // Approved on round 1, so the analysis is the latest bootstrap draft
        assert_eq!(evaluation.analysis, "El titular refleja el contenido.");
    }

    #[test]
    fn earlier_round_proposal_wins() {
        let mut transcript = Transcript::new();
        transcript.push(1, Role::Drafter, "borrador");
        transcript.push(1, Role::Critic, "TITULO PROPUESTO: Primero");
        transcript.push(1, Role::Drafter, "revisión");
        transcript.push(2, Role::Critic, "TITULO PROPUESTO: Segundo");

        assert_eq!(proposed_headline(&transcript), Some("Primero".to_string()));
    }

    #[test]
    fn critic_output_is_checked_before_drafter_in_a_round() {
        let mut transcript = Transcript::new();
        transcript.push(1, Role::Drafter, "TITULO PROPUESTO: Del borrador");
        transcript.push(1, Role::Critic, "TITULO PROPUESTO: Del crítico");

        assert_eq!(
            proposed_headline(&transcript),
            Some("Del crítico".to_string())
        );
    }

    #[test]
    fn extraction_is_pure_and_repeatable() {
        let mut transcript = Transcript::new();
        transcript.push(1, Role::Drafter, "análisis");
        transcript.push(1, Role::Critic, "TITULO PROPUESTO: Titular estable");

        let first = proposed_headline(&transcript);
        let second = proposed_headline(&transcript);
        assert_eq!(first, second);
        assert_eq!(first, Some("Titular estable".to_string()));
    }

    #[test]
    fn no_marker_anywhere_means_none() {
        let mut transcript = Transcript::new();
        transcript.push(1, Role::Drafter, "análisis");
        transcript.push(1, Role::Critic, "crítica sin marcador");

        assert_eq!(proposed_headline(&transcript), None);
    }
}
