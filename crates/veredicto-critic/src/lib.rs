//! Critic-side text handling for veredicto: verdict parsing, marker
//! extraction, and the Spanish prompt templates.
//!
//! LLM output is free text; everything here is a best-effort extraction
//! where a missing marker falls back to a documented default instead of
//! raising.

pub mod extract;
mod prompts;
mod verdict;

pub use prompts::{AnalysisPrompts, HeadlinePrompts};
pub use verdict::CriticVerdict;
