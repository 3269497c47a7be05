use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod report;
mod run;

use report::ReportCommands;

/// Pipeline reached FAILED.
const EXIT_RUN_FAILED: u8 = 1;
/// Configuration, profile, lease or database setup error before any stage.
const EXIT_SETUP_ERROR: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "clipcast")]
#[command(about = "Automated short-form video pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Execute one pipeline run for a content-vertical profile
    Run {
        /// Path to the profile YAML file
        profile: PathBuf,
        /// Use an in-memory store; nothing is written to Postgres
        #[arg(long)]
        dry_run: bool,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Read-only views over categories, published items and runs
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match clipcast_core::load_app_config() {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            tracing::error!(error = %e, "invalid configuration");
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_SETUP_ERROR);
        }
    };
    init_tracing(&config.log_level);

    match dispatch(cli, &config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_SETUP_ERROR)
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Process exit status for a run that got past lease acquisition.
fn run_exit_status(finalized: bool) -> u8 {
    if finalized {
        0
    } else {
        EXIT_RUN_FAILED
    }
}

async fn dispatch(cli: Cli, config: &clipcast_core::AppConfig) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Run { profile, dry_run } => {
            let finalized = run::run_pipeline(config, &profile, dry_run).await?;
            Ok(ExitCode::from(run_exit_status(finalized)))
        }
        Commands::Db { command } => {
            let pool = clipcast_db::connect_pool_from_config(config).await?;
            match command {
                DbCommands::Migrate => {
                    let applied = clipcast_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
                DbCommands::Ping => {
                    clipcast_db::ping(&pool).await?;
                    println!("database reachable");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Report { command } => {
            let pool = clipcast_db::connect_pool_from_config(config).await?;
            match command {
                ReportCommands::Categories => report::run_report_categories(&pool).await?,
                ReportCommands::Items { subject, limit } => {
                    report::run_report_items(&pool, subject.as_deref(), limit).await?;
                }
                ReportCommands::Runs { limit } => report::run_report_runs(&pool, limit).await?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
