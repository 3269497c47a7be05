//! The `run` command: load a profile and drive one pipeline run.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clipcast_core::{AppConfig, Environment};
use clipcast_db::{MemoryStore, PgStore, Store};
use clipcast_pipeline::{Collaborators, Orchestrator, RunSettings};
use tokio_util::sync::CancellationToken;

/// Runs the pipeline once. Returns `true` when the run reached FINALIZED.
///
/// With `dry_run` the run uses an in-memory store seeded only from the
/// profile, so nothing is written to Postgres.
///
/// # Errors
///
/// Returns an error if the profile is missing or invalid, the database is
/// unreachable, or another run holds the subject's lease. Stage failures are
/// not errors; they are reported and yield `Ok(false)`.
pub(crate) async fn run_pipeline(
    config: &AppConfig,
    profile_path: &Path,
    dry_run: bool,
) -> anyhow::Result<bool> {
    let profile = clipcast_core::load_profile(profile_path)
        .with_context(|| format!("failed to load profile {}", profile_path.display()))?;

    tracing::info!(
        env = %config.env,
        subject = %profile.subject,
        dry_run,
        "starting pipeline run"
    );
    if config.env == Environment::Production {
        tracing::warn!("production environment is publishing through simulated collaborators");
    }

    let store: Arc<dyn Store> = if dry_run {
        println!("dry-run: using an in-memory store; nothing will be persisted");
        Arc::new(MemoryStore::new())
    } else {
        let pool = clipcast_db::connect_pool_from_config(config)
            .await
            .context("failed to connect to database")?;
        Arc::new(PgStore::new(pool))
    };

    let cancel = CancellationToken::new();
    let listener = spawn_interrupt_listener(cancel.clone());

    let mut orchestrator = Orchestrator::new(
        store,
        Collaborators::simulated(config.artifacts_dir.clone()),
        RunSettings::from_app_config(config),
    )
    .with_cancellation(cancel);

    let result = orchestrator.run(&profile).await;
    listener.abort();

    let report = result.with_context(|| format!("could not start run for '{}'", profile.subject))?;
    print!("{report}");
    Ok(report.is_finalized())
}

fn spawn_interrupt_listener(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; cancelling run");
            cancel.cancel();
        }
    })
}
