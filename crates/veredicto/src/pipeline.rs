//! Store-to-store driver: fetch an article, run both analyzers, write the
//! result fields back as one upsert.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};

use veredicto_core::{ArticleAnalyzer, ArticleEvaluation, HeadlineAnalyzer, HeadlineEvaluation};
use veredicto_db::{Database, FieldMap};
use veredicto_logging::{LogEvent, Logger};

pub struct PipelineDriver {
    article_analyzer: ArticleAnalyzer,
    headline_analyzer: HeadlineAnalyzer,
    logger: Arc<Logger>,
}

/// Everything one pipeline run produced, for printing or JSON output
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub article_id: String,
    pub title: String,
    pub evaluation: ArticleEvaluation,
    pub headline: HeadlineEvaluation,
}

impl PipelineDriver {
    pub fn new(
        article_analyzer: ArticleAnalyzer,
        headline_analyzer: HeadlineAnalyzer,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            article_analyzer,
            headline_analyzer,
            logger,
        }
    }

    /// Process one article: the given id, or the next pending one.
    pub async fn process(&self, db: &Database, article_id: Option<&str>) -> Result<PipelineReport> {
        let (id, doc) = match article_id {
            Some(id) => {
                let doc = db
                    .articles()
                    .get(id)?
                    .with_context(|| format!("No article with id '{}'", id))?;
                (id.to_string(), doc)
            }
            None => db
                .articles()
                .next_pending()?
                .context("No pending articles to analyze")?,
        };

        let title = string_field(&doc, "titulo", ", ")
            .with_context(|| format!("Article '{}' has no usable 'titulo' field", id))?;
        let body = string_field(&doc, "cuerpo", " ")
            .with_context(|| format!("Article '{}' has no usable 'cuerpo' field", id))?;

        self.logger.log(&LogEvent::AnalysisStarted {
            article_id: Some(id.clone()),
            title: title.clone(),
        });
        let started = Instant::now();

        // The headline check is independent of the criterion loops
        let (evaluation, headline) = tokio::join!(
            self.article_analyzer.evaluate(&title, &body),
            self.headline_analyzer.evaluate(&title),
        );
        let evaluation = evaluation?;

        self.logger.log(&LogEvent::AnalysisCompleted {
            global_score: evaluation.global_score,
            duration_secs: started.elapsed().as_secs_f64(),
        });

        let fields = build_update_fields(&evaluation, &headline);
        db.articles().upsert(&id, &fields)?;
        self.logger.log(&LogEvent::StoreUpdated {
            article_id: id.clone(),
        });

        Ok(PipelineReport {
            article_id: id,
            title,
            evaluation,
            headline,
        })
    }
}

/// Read a field that may be a string or a list of strings (scraped
/// documents carry both shapes).
fn string_field(doc: &FieldMap, key: &str, separator: &str) -> Option<String> {
    match doc.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .collect::<Vec<_>>()
                .join(separator);
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

/// Flatten both evaluations into the store's field bag
fn build_update_fields(
    evaluation: &ArticleEvaluation,
    headline: &HeadlineEvaluation,
) -> FieldMap {
    let mut fields = FieldMap::new();

    let valoraciones: serde_json::Map<String, Value> = evaluation
        .verdicts
        .iter()
        .map(|(id, v)| {
            (
                id.to_string(),
                json!(v.final_text.as_deref().unwrap_or_default()),
            )
        })
        .collect();
    let puntuacion_individual: serde_json::Map<String, Value> = evaluation
        .verdicts
        .iter()
        .map(|(id, v)| (id.to_string(), json!(v.score)))
        .collect();

    fields.insert("valoraciones".into(), Value::Object(valoraciones));
    fields.insert(
        "puntuacion_individual".into(),
        Value::Object(puntuacion_individual),
    );
    if let Some(global) = evaluation.global_score {
        fields.insert("puntuacion".into(), json!(global));
    }
    fields.insert("texto_referencia".into(), json!(evaluation.citation_text));
    fields.insert(
        "texto_referencia_diccionario".into(),
        json!(evaluation.reference_citations),
    );
    fields.insert(
        "valoracion_general".into(),
        json!(evaluation.general_assessment),
    );
    fields.insert("valoracion_titular".into(), json!(headline.analysis));
    fields.insert(
        "titulo_reformulado".into(),
        json!(headline.proposed_headline),
    );
    fields.insert("es_clickbait".into(), json!(headline.is_clickbait));

    fields
}
