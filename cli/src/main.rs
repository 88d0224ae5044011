mod commands;
mod formatters;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gsmd",
    about = "Game server update and restart manager",
    version
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, global = true, default_value = "/etc/gsm/config.yaml")]
    config: PathBuf,

    /// Log filter (tracing env-filter syntax).
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Supervise continuously: reconcile, apply, and restart on an interval.
    Run {
        /// Override the configured poll interval.
        #[arg(long)]
        interval_sec: Option<u64>,

        /// Compute and report plans without applying anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Run exactly one reconcile/apply/restart cycle, then exit.
    Once {
        /// Compute and report the plan without applying anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the action plan for the current drift; touch nothing.
    Plan,

    /// Record current remote versions as applied (adopt an existing install).
    Seed,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cli.log.clone()))
        .init();

    let config = match gsm_engine::Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Run {
            interval_sec,
            dry_run,
        } => commands::handle_run(config, interval_sec, dry_run).await,
        Command::Once { dry_run } => commands::handle_once(config, dry_run).await,
        Command::Plan => commands::handle_plan(config).await,
        Command::Seed => commands::handle_seed(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
