use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::transcript::Transcript;

/// Final text reported when a loop was aborted by a provider failure or a
/// criterion never produced a usable judgment.
pub const ERROR_PLACEHOLDER: &str = "error de procesamiento";

/// The settled outcome of one consensus loop for one criterion.
///
/// `consensus_reached == true` always comes with a non-null `final_text`;
/// an exhausted loop still carries the last revision rather than nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub criterion_id: u8,
    pub final_text: Option<String>,
    pub consensus_reached: bool,
    pub transcript: Transcript,
    pub score: Option<u8>,
}

impl ConsensusResult {
    /// Synthesized stand-in for a criterion that produced no result at
    /// all, so callers always see a complete per-criterion mapping.
    pub fn placeholder(criterion_id: u8) -> Self {
        Self {
            criterion_id,
            final_text: Some(ERROR_PLACEHOLDER.to_string()),
            consensus_reached: false,
            transcript: Transcript::new(),
            score: None,
        }
    }
}

/// Aggregated evaluation of one article across the full criterion catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleEvaluation {
    /// One entry per catalog criterion id, placeholder-filled on gaps
    pub verdicts: BTreeMap<u8, ConsensusResult>,
    /// Floor of the mean of the non-null per-criterion scores
    pub global_score: Option<u32>,
    /// Source fragment -> judgment that it supports
    pub reference_citations: BTreeMap<String, String>,
    /// Raw provider text the citation dictionary was parsed from
    pub citation_text: String,
    pub general_assessment: String,
}

/// Compute the global score: failed criteria are excluded from the mean,
/// never counted as zero.
pub fn global_score(verdicts: &BTreeMap<u8, ConsensusResult>) -> Option<u32> {
    let scores: Vec<u32> = verdicts
        .values()
        .filter_map(|v| v.score.map(u32::from))
        .collect();
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<u32>() / scores.len() as u32)
}

/// Verdict on a single headline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlineEvaluation {
    pub analysis: String,
    pub is_clickbait: bool,
    pub proposed_headline: Option<String>,
    pub transcript: Transcript,
}
