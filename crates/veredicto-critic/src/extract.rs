//! Best-effort extraction of structured markers from LLM free text.
//!
//! Every rule here is "optional field, default on miss": absent markers
//! yield `None` or an empty map, never an error.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCORE: Regex = Regex::new(r"\b(\d{1,3})\b").unwrap();
    static ref ORDINAL_PREFIX: Regex = Regex::new(r"^\s*\d+\.\s*").unwrap();
    static ref FRAGMENT: Regex = Regex::new(r"\[(.*?)\]").unwrap();
    static ref PROPOSED_HEADLINE: Regex = Regex::new(r"TITULO PROPUESTO:\s*(.+)").unwrap();
}

/// Extract a 1-100 score from a scoring reply. Out-of-range or absent
/// numbers yield `None`.
pub fn extract_score(text: &str) -> Option<u8> {
    let captured = SCORE.captures(text)?;
    let value: u32 = captured[1].parse().ok()?;
    if (1..=100).contains(&value) {
        Some(value as u8)
    } else {
        None
    }
}

/// Parse the reference-citation reply into a fragment -> judgment map.
///
/// Expected line shape: `<judgment>|[<fragment>],[<fragment>]`, with an
/// optional `N. ` ordinal prefix on the judgment side. Fragments are
/// quote-stripped. Duplicate fragments across lines resolve to the last
/// line seen.
pub fn parse_citation_dictionary(text: &str) -> BTreeMap<String, String> {
    let mut citations = BTreeMap::new();

    for line in text.lines() {
        let Some((judgment_side, fragments_side)) = line.split_once('|') else {
            continue;
        };
        let judgment = ORDINAL_PREFIX.replace(judgment_side, "").trim().to_string();
        if judgment.is_empty() {
            continue;
        }

        for captured in FRAGMENT.captures_iter(fragments_side) {
            let fragment = captured[1].trim().trim_matches('"').trim().to_string();
            if !fragment.is_empty() {
                citations.insert(fragment, judgment.clone());
            }
        }
    }

    citations
}

/// Find a proposed-headline marker line. Returns the trimmed proposal,
/// or `None` when no line carries the marker.
pub fn extract_proposed_headline(text: &str) -> Option<String> {
    for line in text.lines() {
        if let Some(captured) = PROPOSED_HEADLINE.captures(line) {
            let proposal = captured[1].trim();
            if !proposal.is_empty() {
                return Some(proposal.to_string());
            }
        }
    }
    None
}
