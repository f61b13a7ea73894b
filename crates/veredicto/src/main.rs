use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use veredicto_core::{
    ArticleAnalyzer, ConsensusEngine, CriterionCatalog, HeadlineAnalyzer, LoopSettings,
};
use veredicto_db::Database;
use veredicto_llm::{create_provider, Provider, ProviderKind};
use veredicto_logging::{init_tracing, LogFormat, Logger};

mod config;
mod pipeline;

use config::ProjectConfig;
use pipeline::{PipelineDriver, PipelineReport};

#[derive(Parser, Debug)]
#[command(
    name = "veredicto",
    about = "Multi-model consensus evaluation of journalistic quality",
    version,
    author
)]
struct Cli {
    /// Article id to analyze (default: the next pending article)
    #[arg(short, long)]
    article_id: Option<String>,

    /// Database path (default: the platform data directory)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Provider to use for both roles
    #[arg(short, long, value_enum)]
    provider: Option<ProviderChoice>,

    /// Provider to use specifically for the drafter role
    #[arg(long, value_enum)]
    drafter_provider: Option<ProviderChoice>,

    /// Provider to use specifically for the critic role
    #[arg(long, value_enum)]
    critic_provider: Option<ProviderChoice>,

    /// Model to use for both roles
    #[arg(short, long)]
    model: Option<String>,

    /// Model override for the drafter role
    #[arg(long)]
    drafter_model: Option<String>,

    /// Model override for the critic role
    #[arg(long)]
    critic_model: Option<String>,

    /// Maximum critique/revise rounds per criterion
    #[arg(short = 'n', long, default_value_t = 3)]
    max_rounds: u32,

    /// Criterion loops in flight at once (default: 4, capped by cores)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-provider-call timeout in seconds
    #[arg(long, default_value_t = 120)]
    call_timeout: u64,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Mirror log events to a JSONL file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Output the final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show what would happen without executing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderChoice {
    Anthropic,
    Openai,
}

impl From<ProviderChoice> for ProviderKind {
    fn from(choice: ProviderChoice) -> Self {
        match choice {
            ProviderChoice::Anthropic => ProviderKind::Anthropic,
            ProviderChoice::Openai => ProviderKind::OpenAi,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

/// Effective (provider, model) for one role after merging CLI flags and
/// the project config. CLI flags win; role settings beat globals.
fn resolve_role(
    role_provider: Option<ProviderChoice>,
    role_model: Option<&str>,
    cli: &Cli,
    config_provider: Option<&str>,
    config_model: Option<&str>,
) -> Result<(ProviderKind, Option<String>)> {
    let kind = match role_provider.or(cli.provider) {
        Some(choice) => choice.into(),
        None => match config_provider {
            Some(name) => name
                .parse::<ProviderKind>()
                .map_err(|e| anyhow::anyhow!(e))
                .context("Invalid provider in veredicto.toml")?,
            None => ProviderKind::Anthropic,
        },
    };

    let model = role_model
        .map(String::from)
        .or_else(|| cli.model.clone())
        .or_else(|| config_model.map(String::from));

    Ok((kind, model))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing("info", log_format);

    let logger = Arc::new(match &cli.log_file {
        Some(path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    });

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let config = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    let (drafter_kind, drafter_model) = resolve_role(
        cli.drafter_provider,
        cli.drafter_model.as_deref(),
        &cli,
        config.drafter_provider(),
        config.drafter_model(),
    )?;
    let (critic_kind, critic_model) = resolve_role(
        cli.critic_provider,
        cli.critic_model.as_deref(),
        &cli,
        config.critic_provider(),
        config.critic_model(),
    )?;

    if cli.dry_run {
        println!("=== Dry Run ===");
        match &cli.article_id {
            Some(id) => println!("Article: {}", id),
            None => println!("Article: next pending"),
        }
        println!(
            "Drafter: {} ({})",
            drafter_kind,
            drafter_model.as_deref().unwrap_or("default model")
        );
        println!(
            "Critic: {} ({})",
            critic_kind,
            critic_model.as_deref().unwrap_or("default model")
        );
        println!("Max rounds: {}", cli.max_rounds);
        match cli.concurrency {
            Some(n) => println!("Concurrency: {}", n),
            None => println!("Concurrency: default"),
        }
        return Ok(());
    }

    let db = match &cli.db {
        Some(path) => Database::open_at(path)?,
        None => Database::open()?,
    };

    let drafter: Arc<dyn Provider> = Arc::from(create_provider(drafter_kind, drafter_model)?);
    let critic: Arc<dyn Provider> = Arc::from(create_provider(critic_kind, critic_model)?);

    let settings = LoopSettings {
        max_rounds: cli.max_rounds,
        call_timeout: Duration::from_secs(cli.call_timeout),
    };
    let engine = ConsensusEngine::new(drafter, critic, settings, logger.clone());

    let mut article_analyzer = ArticleAnalyzer::new(
        engine.clone(),
        CriterionCatalog::standard(),
        logger.clone(),
    );
    if let Some(concurrency) = cli.concurrency {
        article_analyzer = article_analyzer.with_concurrency(concurrency);
    }
    let headline_analyzer = HeadlineAnalyzer::new(engine, logger.clone());

    let driver = PipelineDriver::new(article_analyzer, headline_analyzer, logger);
    let report = driver.process(&db, cli.article_id.as_deref()).await?;

    if cli.json_output {
        let json = serde_json::to_string_pretty(&report)?;
        println!("{}", json);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &PipelineReport) {
    eprintln!();
    eprintln!("=== {} ===", report.title);
    eprintln!("Documento: {}", report.article_id);

    for verdict in report.evaluation.verdicts.values() {
        let score = match verdict.score {
            Some(s) => s.to_string(),
            None => "—".to_string(),
        };
        let consensus = if verdict.consensus_reached {
            "consenso"
        } else {
            "sin consenso"
        };
        eprintln!("  [{:2}] {:>3}  ({})", verdict.criterion_id, score, consensus);
    }

    match report.evaluation.global_score {
        Some(global) => eprintln!("Puntuación global: {}", global),
        None => eprintln!("Puntuación global: no disponible"),
    }

    if report.headline.is_clickbait {
        eprintln!("Titular: clickbait");
        if let Some(ref proposed) = report.headline.proposed_headline {
            eprintln!("Titular propuesto: {}", proposed);
        }
    } else {
        eprintln!("Titular: adecuado");
    }
}
