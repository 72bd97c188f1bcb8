//! docdigest - summarize a document and deliver the summary with a PDF copy.
//!
//! # Usage
//!
//! ```bash
//! # One run, then exit with the run's outcome
//! docdigest --config docdigest.toml run-once
//!
//! # Run every five minutes until Ctrl-C
//! DOCDIGEST_API_KEY=... docdigest --json-logs serve
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use docdigest::config::AppConfig;
use docdigest::observability::{init_tracing, LogFormat};
use docdigest::service::DigestService;

/// Scheduled document summarization pipeline.
#[derive(Parser)]
#[command(name = "docdigest")]
#[command(version)]
#[command(about = "Summarize a document, convert it to PDF and send a notification")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute the pipeline once and exit.
    RunOnce,
    /// Install the recurring trigger and run until interrupted.
    Serve,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_tracing(format).context("failed to initialise logging")?;

    let config =
        AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let service =
        DigestService::from_config(&config).context("failed to build the digest service")?;

    match cli.command {
        Command::RunOnce => run_once(&service).await,
        Command::Serve => serve(&service).await,
    }
}

async fn run_once(service: &DigestService) -> Result<ExitCode> {
    match service.run_pipeline_once().await {
        Some(record) if record.is_success() => Ok(ExitCode::SUCCESS),
        Some(record) => {
            warn!(detail = %record.detail, "Run finished with an error");
            Ok(ExitCode::FAILURE)
        }
        None => {
            warn!("Run skipped");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn serve(service: &DigestService) -> Result<ExitCode> {
    service.start().context("failed to start the recurring trigger")?;
    info!("Serving; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;

    info!("Shutdown requested");
    service.stop().context("failed to stop the recurring trigger")?;
    Ok(ExitCode::SUCCESS)
}
