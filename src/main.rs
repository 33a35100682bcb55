//! Daily digest entrypoint.
//! One run by default; `--daily` keeps the process alive and runs at the configured time.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trend_digest::config::{AppConfig, ENV_CONFIG_PATH};
use trend_digest::{run_from_config, schedule, RunOutcome};

#[derive(Debug, Parser)]
#[command(name = "trend-digest", version, about = "Collect, summarize and mail a daily tech digest")]
struct Cli {
    /// Config file (TOML). Falls back to $DIGEST_CONFIG_PATH, then config/digest.toml.
    #[arg(short, long, env = ENV_CONFIG_PATH)]
    config: Option<PathBuf>,

    /// Stay running and fire once a day at `schedule.at`.
    #[arg(long)]
    daily: bool,
}

/// Human-readable logs unless DIGEST_LOG_JSON=1.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trend_digest=info,pipeline=info,collect=info,synth=info,dispatch=info,schedule=info,cost=info,archive=info,warn"));

    let json = std::env::var("DIGEST_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load_default(),
    };
    let cfg = match cfg {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = ?e, "failed to load config");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(credentials = ?cfg.credentials, preset = ?cfg.preset, "config loaded");

    if cli.daily {
        return match schedule::run_daily(cfg).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "scheduler stopped");
                ExitCode::FAILURE
            }
        };
    }

    match run_from_config(&cfg).await {
        Ok(RunOutcome::Delivered(report)) => {
            tracing::info!(subject = %report.subject, id = ?report.receipt.provider_response_id, "digest sent");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Skipped { reason }) => {
            tracing::info!(%reason, "nothing sent");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
