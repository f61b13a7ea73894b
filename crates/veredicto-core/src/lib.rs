//! Core orchestration for veredicto: the draft/critique/revise consensus
//! loop and the analyzers that aggregate its verdicts per article.

mod article;
mod catalog;
mod consensus;
mod error;
mod evaluation;
mod headline;
mod transcript;

#[cfg(test)]
mod testing;

pub use article::ArticleAnalyzer;
pub use catalog::{CatalogError, Criterion, CriterionCatalog};
pub use consensus::{ConsensusEngine, LoopSettings, LoopSubject, Settlement};
pub use error::AnalysisError;
pub use evaluation::{
    global_score, ArticleEvaluation, ConsensusResult, HeadlineEvaluation, ERROR_PLACEHOLDER,
};
pub use headline::{proposed_headline, HeadlineAnalyzer};
pub use transcript::{Role, Transcript, TranscriptEntry};
