use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use veredicto_critic::{extract, AnalysisPrompts};
use veredicto_logging::{LogEvent, Logger};

use crate::catalog::CriterionCatalog;
use crate::consensus::{ConsensusEngine, LoopSubject};
use crate::error::AnalysisError;
use crate::evaluation::{global_score, ArticleEvaluation, ConsensusResult, ERROR_PLACEHOLDER};

const DEFAULT_CONCURRENCY: usize = 4;

/// Default loop bound: four permits, capped by available cores
fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(DEFAULT_CONCURRENCY)
        .min(DEFAULT_CONCURRENCY)
}

/// Runs one consensus loop per catalog criterion and aggregates the
/// verdicts into a single [`ArticleEvaluation`].
pub struct ArticleAnalyzer {
    engine: ConsensusEngine,
    catalog: CriterionCatalog,
    concurrency: usize,
    logger: Arc<Logger>,
}

impl ArticleAnalyzer {
    pub fn new(engine: ConsensusEngine, catalog: CriterionCatalog, logger: Arc<Logger>) -> Self {
        Self {
            engine,
            catalog,
            concurrency: default_concurrency(),
            logger,
        }
    }

    /// Bound the number of criterion loops in flight at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Evaluate one article against the full catalog.
    ///
    /// Criterion loops are independent and run concurrently under the
    /// bound; a failing loop never takes its siblings down with it. The
    /// returned mapping always carries exactly one entry per catalog id.
    /// Errors only when not a single provider call of the run succeeded.
    pub async fn evaluate(
        &self,
        title: &str,
        body: &str,
    ) -> Result<ArticleEvaluation, AnalysisError> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<(u8, ConsensusResult, bool)> = JoinSet::new();

        for criterion in self.catalog.iter().cloned() {
            let engine = self.engine.clone();
            let logger = self.logger.clone();
            let semaphore = semaphore.clone();
            let title = title.to_string();
            let body = body.to_string();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();

                logger.log(&LogEvent::LoopStarted {
                    criterion_id: criterion.id,
                    criterion: criterion.name.clone(),
                });

                let subject = LoopSubject {
                    label: criterion.name.clone(),
                    rubric: criterion.rubric.clone(),
                    draft_prompt: AnalysisPrompts::draft(
                        &title,
                        &body,
                        &criterion.name,
                        &criterion.rubric,
                    ),
                };
                let settlement = engine.settle(&subject).await;
                let failed = settlement.failure.is_some();

                // Aborted loops already carry score = None; everything that
                // settled (approved or exhausted) gets its one scoring call
                let score = match (&settlement.final_text, failed) {
                    (Some(text), false) => engine.score(&title, &body, text).await,
                    _ => None,
                };
                if !failed {
                    logger.log(&LogEvent::ScoreParsed {
                        criterion: criterion.name.clone(),
                        score,
                    });
                }

                let result = ConsensusResult {
                    criterion_id: criterion.id,
                    final_text: settlement.final_text,
                    consensus_reached: settlement.consensus_reached,
                    transcript: settlement.transcript,
                    score,
                };
                (criterion.id, result, failed)
            });
        }

        let mut verdicts = BTreeMap::new();
        let mut failures = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, result, failed)) => {
                    if failed {
                        failures += 1;
                    }
                    verdicts.insert(id, result);
                }
                Err(e) => warn!(error = %e, "Criterion task aborted"),
            }
        }

        // A gap must never surface to the caller
        for id in self.catalog.ids() {
            verdicts
                .entry(id)
                .or_insert_with(|| ConsensusResult::placeholder(id));
        }

        if failures == self.catalog.len() {
            return Err(AnalysisError::ProvidersUnavailable);
        }

        let judgments = render_judgments(&self.catalog, &verdicts);

        let citation_text = match self.engine.citations(title, body, &judgments).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Citation call failed");
                String::new()
            }
        };
        let reference_citations = extract::parse_citation_dictionary(&citation_text);

        let general_assessment = match self.engine.summarize(title, &judgments).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "General assessment call failed");
                ERROR_PLACEHOLDER.to_string()
            }
        };

        let global_score = global_score(&verdicts);

        Ok(ArticleEvaluation {
            verdicts,
            global_score,
            reference_citations,
            citation_text,
            general_assessment,
        })
    }
}

/// The ten settled judgments as numbered lines, for the follow-up calls
fn render_judgments(
    catalog: &CriterionCatalog,
    verdicts: &BTreeMap<u8, ConsensusResult>,
) -> String {
    catalog
        .iter()
        .map(|c| {
            let text = verdicts
                .get(&c.id)
                .and_then(|v| v.final_text.as_deref())
                .unwrap_or(ERROR_PLACEHOLDER);
            format!("{}. {}: {}", c.id, c.name, text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::LoopSettings;
    use crate::testing::{outage, RuleProvider};
    use veredicto_llm::Completion;
    use veredicto_logging::LogFormat;

    fn analyzer(drafter: RuleProvider, critic: RuleProvider) -> ArticleAnalyzer {
        let engine = ConsensusEngine::new(
            Arc::new(drafter),
            Arc::new(critic),
            LoopSettings::default(),
            Arc::new(Logger::new(LogFormat::Json)),
        );
        ArticleAnalyzer::new(
            engine,
            CriterionCatalog::standard(),
            Arc::new(Logger::new(LogFormat::Json)),
        )
    }

    /// A critic that approves every critique, scores a fixed number, and
    /// answers the follow-up calls in their expected shapes.
    fn cooperative_critic(score: &'static str) -> RuleProvider {
        RuleProvider::new("critic", move |prompt| {
            if prompt.contains("Responde únicamente con el número") {
                Ok(Completion::from_text(score))
            } else if prompt.contains("fragmentos literales") {
                Ok(Completion::from_text(
                    "1. Valoración de fuentes | [\"El ministerio confirmó\"]",
                ))
            } else if prompt.contains("breve síntesis") {
                Ok(Completion::from_text("La noticia es globalmente rigurosa."))
            } else if prompt.contains("historial completo") {
                Ok(Completion::from_text("La valoración queda aprobada."))
            } else {
                Ok(Completion::from_text("Borrador independiente."))
            }
        })
    }

    fn simple_drafter() -> RuleProvider {
        RuleProvider::new("drafter", |_prompt| {
            Ok(Completion::from_text("La noticia cumple el criterio."))
        })
    }

    #[tokio::test]
    async fn all_approving_run_scores_every_criterion() {
        let analyzer = analyzer(simple_drafter(), cooperative_critic("80"));

        let evaluation = analyzer.evaluate("Titular", "Cuerpo de la noticia").await.unwrap();

        assert_eq!(evaluation.verdicts.len(), 10);
        assert!(evaluation.verdicts.values().all(|v| v.consensus_reached));
        assert!(evaluation.verdicts.values().all(|v| v.score == Some(80)));
        assert_eq!(evaluation.global_score, Some(80));
        assert_eq!(
            evaluation.general_assessment,
            "La noticia es globalmente rigurosa."
        );
        assert_eq!(
            evaluation
                .reference_citations
                .get("El ministerio confirmó")
                .map(String::as_str),
            Some("Valoración de fuentes")
        );
    }

    #[tokio::test]
    async fn one_failing_criterion_leaves_nine_standing() {
        // Drafting for "Precisión de los datos" (criterion 5) hits an outage
        let drafter = RuleProvider::new("drafter", |prompt| {
            if prompt.contains("Precisión de los datos") {
                Err(outage())
            } else {
                Ok(Completion::from_text("La noticia cumple el criterio."))
            }
        });
        let analyzer = analyzer(drafter, cooperative_critic("90"));

        let evaluation = analyzer.evaluate("Titular", "Cuerpo").await.unwrap();

        assert_eq!(evaluation.verdicts.len(), 10);

        let failed = &evaluation.verdicts[&5];
        assert!(!failed.consensus_reached);
        assert_eq!(failed.score, None);
        assert_eq!(failed.final_text.as_deref(), Some(ERROR_PLACEHOLDER));

        // Mean over the surviving nine criteria
        assert_eq!(evaluation.global_score, Some(90));
    }

    #[tokio::test]
    async fn unscorable_replies_leave_global_score_null() {
        let analyzer = analyzer(
            simple_drafter(),
            cooperative_critic("No puedo puntuar esto"),
        );

        let evaluation = analyzer.evaluate("Titular", "Cuerpo").await.unwrap();

        assert_eq!(evaluation.verdicts.len(), 10);
        assert!(evaluation.verdicts.values().all(|v| v.score.is_none()));
        assert_eq!(evaluation.global_score, None);
    }

    #[tokio::test]
    async fn total_outage_is_the_only_error_path() {
        let drafter = RuleProvider::new("drafter", |_| Err(outage()));
        let critic = RuleProvider::new("critic", |_| Err(outage()));
        let analyzer = analyzer(drafter, critic);

        let result = analyzer.evaluate("Titular", "Cuerpo").await;
        assert!(matches!(result, Err(AnalysisError::ProvidersUnavailable)));
    }

    #[tokio::test]
    async fn citation_call_failure_degrades_to_empty_dictionary() {
        let critic = RuleProvider::new("critic", |prompt| {
            if prompt.contains("fragmentos literales") {
                Err(outage())
            } else if prompt.contains("Responde únicamente con el número") {
                Ok(Completion::from_text("70"))
            } else if prompt.contains("breve síntesis") {
                Ok(Completion::from_text("Síntesis."))
            } else if prompt.contains("historial completo") {
                Ok(Completion::from_text("adecuada"))
            } else {
                Ok(Completion::from_text("Borrador independiente."))
            }
        });
        let analyzer = analyzer(simple_drafter(), critic);

        let evaluation = analyzer.evaluate("Titular", "Cuerpo").await.unwrap();

        assert!(evaluation.reference_citations.is_empty());
        assert!(evaluation.citation_text.is_empty());
        assert_eq!(evaluation.global_score, Some(70));
    }
}
