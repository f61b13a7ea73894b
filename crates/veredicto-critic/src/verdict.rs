use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

lazy_static! {
    // Whole-word match so "desaprobada" never reads as approval
    static ref APPROVAL: Regex = Regex::new(r"(?i)\b(aprobada|adecuada)\b").unwrap();
}

/// The critic's verdict on the latest draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticVerdict {
    /// The draft stands as the settled judgment
    Approved,
    /// The critique is feedback for another revision
    Revise,
}

impl CriticVerdict {
    /// Parse the critic's free text. A missing approval keyword is an
    /// ordinary revise request, never an error.
    pub fn parse(critic_text: &str) -> Self {
        let approved = APPROVAL.is_match(critic_text);
        debug!(approved, text_len = critic_text.len(), "Parsed critic verdict");
        if approved {
            CriticVerdict::Approved
        } else {
            CriticVerdict::Revise
        }
    }

    pub fn is_approved(self) -> bool {
        matches!(self, CriticVerdict::Approved)
    }
}
