use serde::{Deserialize, Serialize};

/// Role of the model that produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Drafter,
    Critic,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Drafter => "Drafter",
            Role::Critic => "Critic",
        }
    }
}

/// One exchange in a consensus loop. Entries are append-only and never
/// reordered once pushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub round: u32,
    pub role: Role,
    pub content: String,
}

/// Ordered log of all draft/critique exchanges for one evaluation unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, round: u32, role: Role, content: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            round,
            role,
            content: content.into(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the history the way the critic sees it
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{} (round {}): {}", e.role.as_str(), e.round, e.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Content of the most recent Drafter entry, if any
    pub fn last_drafter_content(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.role == Role::Drafter)
            .map(|e| e.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_formats_role_and_round() {
        let mut transcript = Transcript::new();
        transcript.push(1, Role::Drafter, "Primera valoración");
        transcript.push(1, Role::Critic, "Faltan citas");

        assert_eq!(
            transcript.render(),
            "Drafter (round 1): Primera valoración\nCritic (round 1): Faltan citas"
        );
    }

    #[test]
    fn last_drafter_content_skips_critic_entries() {
        let mut transcript = Transcript::new();
        transcript.push(1, Role::Drafter, "borrador");
        transcript.push(1, Role::Drafter, "segundo borrador");
        transcript.push(1, Role::Critic, "crítica");

        assert_eq!(transcript.last_drafter_content(), Some("segundo borrador"));
    }

    #[test]
    fn empty_transcript_has_no_drafter_content() {
        assert_eq!(Transcript::new().last_drafter_content(), None);
    }
}
