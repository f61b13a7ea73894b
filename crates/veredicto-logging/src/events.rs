use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for the analysis pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    AnalysisStarted {
        article_id: Option<String>,
        title: String,
    },
    LoopStarted {
        criterion_id: u8,
        criterion: String,
    },
    DraftProduced {
        criterion: String,
        round: u32,
        provider: String,
    },
    CritiqueProduced {
        criterion: String,
        round: u32,
        approved: bool,
    },
    RevisionProduced {
        criterion: String,
        round: u32,
    },
    ConsensusReached {
        criterion: String,
        rounds: u32,
    },
    RoundsExhausted {
        criterion: String,
        rounds: u32,
    },
    ScoreParsed {
        criterion: String,
        score: Option<u8>,
    },
    ProviderFailed {
        criterion: String,
        error: String,
    },
    HeadlineEvaluated {
        is_clickbait: bool,
    },
    AnalysisCompleted {
        global_score: Option<u32>,
        duration_secs: f64,
    },
    StoreUpdated {
        article_id: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for pipeline events - console output plus optional JSONL file
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger that also mirrors events to a JSONL file
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON, whatever the console format
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::AnalysisStarted { article_id, title } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} {}",
                    "veredicto".bold().bright_white(),
                    title.dimmed()
                );
                if let Some(id) = article_id {
                    let _ = writeln!(stderr, "  {} {}", "id:".dimmed(), id.dimmed());
                }
                let _ = writeln!(stderr);
            }
            LogEvent::LoopStarted {
                criterion_id,
                criterion,
            } => {
                let _ = writeln!(
                    stderr,
                    "{} {} {}",
                    format!("[{:2}]", criterion_id).bright_blue(),
                    "▶".bright_cyan(),
                    criterion.bright_cyan().bold()
                );
            }
            LogEvent::CritiqueProduced {
                criterion,
                round,
                approved,
            } => {
                let marker = if *approved {
                    "✓ aprobada".bright_green().to_string()
                } else {
                    "→ revisión".bright_yellow().to_string()
                };
                let _ = writeln!(
                    stderr,
                    "     {} ronda {}: {}",
                    criterion.dimmed(),
                    round,
                    marker
                );
            }
            LogEvent::ConsensusReached { criterion, rounds } => {
                let _ = writeln!(
                    stderr,
                    "     {} {} ({} rondas)",
                    "✓".bright_green(),
                    format!("consenso en {}", criterion).bright_green(),
                    rounds
                );
            }
            LogEvent::RoundsExhausted { criterion, rounds } => {
                let _ = writeln!(
                    stderr,
                    "     {} sin consenso en {} tras {} rondas",
                    "⚠".bright_yellow(),
                    criterion,
                    rounds
                );
            }
            LogEvent::ScoreParsed { criterion, score } => {
                let rendered = match score {
                    Some(s) => s.to_string().bright_white().to_string(),
                    None => "sin puntuación".dimmed().to_string(),
                };
                let _ = writeln!(stderr, "     {} {}: {}", "#".dimmed(), criterion, rendered);
            }
            LogEvent::ProviderFailed { criterion, error } => {
                let _ = writeln!(
                    stderr,
                    "     {} {}: {}",
                    "✗".bright_red(),
                    criterion,
                    error.bright_red()
                );
            }
            LogEvent::HeadlineEvaluated { is_clickbait } => {
                let verdict = if *is_clickbait {
                    "clickbait".bright_red().to_string()
                } else {
                    "titular adecuado".bright_green().to_string()
                };
                let _ = writeln!(stderr, "{} {}", "▶ Titular:".bright_magenta(), verdict);
            }
            LogEvent::AnalysisCompleted {
                global_score,
                duration_secs,
            } => {
                let score = match global_score {
                    Some(s) => s.to_string(),
                    None => "—".to_string(),
                };
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} puntuación global: {} ({:.1}s)",
                    "✓".bright_green(),
                    score.bold(),
                    duration_secs
                );
            }
            LogEvent::StoreUpdated { article_id } => {
                let _ = writeln!(
                    stderr,
                    "{} documento {} actualizado",
                    "✓".bright_green(),
                    article_id
                );
            }
            // Per-call detail is noise at pretty level
            LogEvent::DraftProduced { .. } | LogEvent::RevisionProduced { .. } => {}
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::AnalysisStarted { title, .. } => {
                format!("[{}] analysis:start {}", timestamp, title)
            }
            LogEvent::LoopStarted { criterion_id, .. } => {
                format!("[{}] loop:start:{}", timestamp, criterion_id)
            }
            LogEvent::DraftProduced {
                criterion,
                round,
                provider,
            } => format!(
                "[{}] draft:{}:{} {}",
                timestamp, criterion, round, provider
            ),
            LogEvent::CritiqueProduced {
                criterion,
                round,
                approved,
            } => format!(
                "[{}] critique:{}:{} approved={}",
                timestamp, criterion, round, approved
            ),
            LogEvent::RevisionProduced { criterion, round } => {
                format!("[{}] revision:{}:{}", timestamp, criterion, round)
            }
            LogEvent::ConsensusReached { criterion, rounds } => {
                format!("[{}] consensus:{} rounds={}", timestamp, criterion, rounds)
            }
            LogEvent::RoundsExhausted { criterion, rounds } => {
                format!("[{}] exhausted:{} rounds={}", timestamp, criterion, rounds)
            }
            LogEvent::ScoreParsed { criterion, score } => match score {
                Some(s) => format!("[{}] score:{} {}", timestamp, criterion, s),
                None => format!("[{}] score:{} none", timestamp, criterion),
            },
            LogEvent::ProviderFailed { criterion, error } => {
                format!("[{}] provider-error:{} {}", timestamp, criterion, error)
            }
            LogEvent::HeadlineEvaluated { is_clickbait } => {
                format!("[{}] headline clickbait={}", timestamp, is_clickbait)
            }
            LogEvent::AnalysisCompleted {
                global_score,
                duration_secs,
            } => format!(
                "[{}] analysis:done score={:?} {:.1}s",
                timestamp, global_score, duration_secs
            ),
            LogEvent::StoreUpdated { article_id } => {
                format!("[{}] store:updated {}", timestamp, article_id)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }
}
