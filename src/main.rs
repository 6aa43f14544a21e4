use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quantgpt::config::Config;
use quantgpt::graph::KnowledgeGraph;
use quantgpt::orchestrator::{Mode, Orchestrator};
use quantgpt::report::DEFAULT_REPORT_DIR;

/// QuantGPT - post-quantum cryptographic risk assessment for design documents
#[derive(Parser, Debug)]
#[command(name = "quantgpt")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Design document to analyze (Markdown)
    #[arg(short, long)]
    file: PathBuf,

    /// Orchestration mode
    #[arg(long, value_enum, default_value = "direct")]
    mode: Mode,

    /// Force debug-level logging regardless of configuration
    #[arg(long)]
    debug: bool,

    /// Directory holding config.example.yaml and config.yaml
    #[arg(long, default_value = ".")]
    config: PathBuf,

    /// Configuration profile to apply
    #[arg(long, env = quantgpt::config::PROFILE_ENV)]
    profile: Option<String>,

    /// Path to the knowledge graph SQLite database
    #[arg(long, default_value = "data/pq_risk.db")]
    db: PathBuf,

    /// Directory for generated reports
    #[arg(long, default_value = DEFAULT_REPORT_DIR)]
    report_dir: PathBuf,
}

fn init_logging(config: &Config, debug: bool) -> Result<()> {
    let filter = if debug { "debug" } else { config.logging.level.as_filter() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if let Some(parent) = config.logging.file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let log_file = std::fs::File::create(&config.logging.file)
        .with_context(|| format!("creating log file {}", config.logging.file.display()))?;

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry
            .with(fmt::layer().json().with_writer(log_file).with_ansi(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(log_file).with_ansi(false))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env files (local first, then home directory)
    // Errors are ignored - files are optional
    let _ = dotenvy::from_filename(".env");
    if let Some(home) = dirs::home_dir() {
        let _ = dotenvy::from_path(home.join(".env"));
    }

    let args = Args::parse();

    let config = Config::load(&args.config, args.profile.as_deref())?;
    init_logging(&config, args.debug)?;

    let graph = KnowledgeGraph::load(&args.db)
        .with_context(|| format!("loading knowledge graph from {}", args.db.display()))?;

    let orchestrator = Orchestrator::new(&config, graph, args.report_dir)?;
    match orchestrator.run(args.mode, &args.file).await {
        Ok(outcome) => {
            match &outcome.report_path {
                Some(path) => println!("Risk report saved to {}", path.display()),
                None if !outcome.failed() => {
                    println!("Analysis finished without producing a report.");
                    if let Some(narrative) = &outcome.narrative {
                        println!("{narrative}");
                    }
                }
                None => {}
            }
            if !outcome.unmapped.is_empty() {
                println!("Unmapped components: {}", outcome.unmapped.join(", "));
            }
            if let Some(verdict) = &outcome.validation {
                if verdict != "VALID" {
                    println!("Validation: {verdict}");
                }
            }
            if let Some(failure) = &outcome.error {
                println!("Analysis failed: {failure}");
                if !outcome.mapping.is_empty() {
                    println!(
                        "Partial mapping: {}",
                        serde_json::to_string_pretty(&outcome.mapping)?
                    );
                }
                error!("analysis failed: {failure}");
                anyhow::bail!("analysis failed");
            }
            Ok(())
        }
        Err(err) => {
            error!("analysis failed: {err:#}");
            Err(err)
        }
    }
}
