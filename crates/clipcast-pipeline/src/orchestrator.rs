//! Drives one run through every stage under an exclusive per-subject lease.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clipcast_core::{AppConfig, Profile};
use clipcast_db::{RunLease, Store};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::PipelineError;
use crate::generator::{choose_template, generate_content};
use crate::metrics::collect_metrics;
use crate::publisher::{publish_to_accounts, PublishJob};
use crate::report::{FailureReason, RunOutcome, RunReport};
use crate::scorer::recalculate_priority_scores;
use crate::selector::{select_category, Selection};
use crate::services::{CallPolicy, Collaborators};
use crate::state::{Stage, StateMachine};
use crate::sync::{ensure_initial_categories, synchronize_accounts};

const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_COLLABORATOR_TIMEOUT_SECS: u64 = 300;
const DEFAULT_STALE_RUN_AFTER_SECS: i64 = 7200;

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub publish_concurrency: usize,
    pub metrics_concurrency: usize,
    pub collaborator_timeout: Duration,
    pub stale_run_after_secs: i64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            publish_concurrency: DEFAULT_CONCURRENCY,
            metrics_concurrency: DEFAULT_CONCURRENCY,
            collaborator_timeout: Duration::from_secs(DEFAULT_COLLABORATOR_TIMEOUT_SECS),
            stale_run_after_secs: DEFAULT_STALE_RUN_AFTER_SECS,
        }
    }
}

impl RunSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            publish_concurrency: config.publish_concurrency,
            metrics_concurrency: config.metrics_concurrency,
            collaborator_timeout: Duration::from_secs(config.collaborator_timeout_secs),
            stale_run_after_secs: i64::try_from(config.stale_run_after_secs).unwrap_or(i64::MAX),
        }
    }
}

struct StageFailure {
    stage: Stage,
    reason: FailureReason,
}

impl StageFailure {
    fn new(stage: Stage, err: PipelineError) -> Self {
        let reason = match err {
            PipelineError::Cancelled => FailureReason::Cancelled,
            PipelineError::NoAccounts(_) => FailureReason::NoAccounts,
            other => FailureReason::Error(other.to_string()),
        };
        Self { stage, reason }
    }
}

fn at(stage: Stage) -> impl Fn(PipelineError) -> StageFailure {
    move |err| StageFailure::new(stage, err)
}

pub struct Orchestrator {
    store: Arc<dyn Store>,
    services: Collaborators,
    settings: RunSettings,
    cancel: CancellationToken,
    rng: StdRng,
}

impl Orchestrator {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, services: Collaborators, settings: RunSettings) -> Self {
        Self {
            store,
            services,
            settings,
            cancel: CancellationToken::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Use `cancel` to stop the run early (e.g. on Ctrl-C).
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Make prompt template choice reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Executes one full run for `profile`.
    ///
    /// Stage failures do not surface as `Err`; they end the run in
    /// [`RunOutcome::Failed`] and are described by the returned report. The
    /// run's audit row is completed on every path.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Db`] wrapping
    /// [`clipcast_db::DbError::RunInProgress`] when another run holds the
    /// subject's lease, or any store error raised while acquiring it.
    pub async fn run(&mut self, profile: &Profile) -> Result<RunReport, PipelineError> {
        let lease = self
            .store
            .begin_run(&profile.subject, self.settings.stale_run_after_secs)
            .await?;

        let span = tracing::info_span!(
            "pipeline_run",
            subject = %lease.subject,
            run_id = %lease.public_id
        );
        let report = self.execute(profile, &lease).instrument(span.clone()).await;
        self.release(&lease, &report).instrument(span).await;
        Ok(report)
    }

    async fn execute(&mut self, profile: &Profile, lease: &RunLease) -> RunReport {
        tracing::info!("pipeline run started");
        let mut report = RunReport::new(lease.run_id, lease.public_id, &profile.subject);
        let mut machine = StateMachine::new();

        match self.drive(profile, &mut machine, &mut report).await {
            Ok(()) => {
                report.outcome = RunOutcome::Finalized;
                tracing::info!(
                    published = report.published_count(),
                    failed = report.failed_count(),
                    "pipeline run finalized"
                );
            }
            Err(failure) => {
                machine.fail();
                tracing::error!(
                    stage = %failure.stage,
                    reason = %failure.reason,
                    "pipeline run failed"
                );
                report.outcome = RunOutcome::Failed {
                    stage: failure.stage,
                    reason: failure.reason,
                };
            }
        }

        report.stages = machine.history().to_vec();
        report
    }

    async fn drive(
        &mut self,
        profile: &Profile,
        machine: &mut StateMachine,
        report: &mut RunReport,
    ) -> Result<(), StageFailure> {
        let store = self.store.as_ref();
        let services = &self.services;
        let subject = profile.subject.as_str();
        let timeout = self.settings.collaborator_timeout;
        let generation_policy = CallPolicy::new(timeout, 1, self.cancel.clone());
        let metrics_policy = CallPolicy::new(
            timeout,
            self.settings.metrics_concurrency,
            self.cancel.clone(),
        );
        let publish_policy = CallPolicy::new(
            timeout,
            self.settings.publish_concurrency,
            self.cancel.clone(),
        );

        // INIT -> SYNCED
        checkpoint(&self.cancel, Stage::Synced)?;
        let mut sync = synchronize_accounts(store, profile)
            .await
            .map_err(at(Stage::Synced))?;
        sync.categories_seeded = ensure_initial_categories(store, profile)
            .await
            .map_err(at(Stage::Synced))?;
        report.sync = sync;
        advance(machine, Stage::Synced)?;
        tracing::info!(
            created = sync.accounts_created,
            updated = sync.accounts_updated,
            "accounts synced"
        );

        // SYNCED -> ANALYZED
        checkpoint(&self.cancel, Stage::Analyzed)?;
        report.metrics = collect_metrics(
            store,
            services.metrics.as_ref(),
            services.comments.as_ref(),
            subject,
            &metrics_policy,
        )
        .await
        .map_err(at(Stage::Analyzed))?;
        checkpoint(&self.cancel, Stage::Analyzed)?;
        report.score_updates = recalculate_priority_scores(store)
            .await
            .map_err(at(Stage::Analyzed))?;
        advance(machine, Stage::Analyzed)?;

        // ANALYZED -> SELECTED
        checkpoint(&self.cancel, Stage::Selected)?;
        let categories = store
            .list_active_categories()
            .await
            .map_err(|e| StageFailure::new(Stage::Selected, e.into()))?;
        let category = match select_category(&categories, Utc::now()) {
            Selection::Chosen(category) => category,
            Selection::NoneAvailable => {
                return Err(StageFailure {
                    stage: Stage::Selected,
                    reason: FailureReason::NoCategoryAvailable,
                });
            }
        };
        tracing::info!(
            category = %category.name,
            score = category.priority_score,
            "category selected"
        );
        report.category = Some(category.clone());
        advance(machine, Stage::Selected)?;

        // SELECTED -> GENERATED
        checkpoint(&self.cancel, Stage::Generated)?;
        let template = choose_template(&profile.prompts, &mut self.rng)
            .ok_or_else(|| StageFailure::new(Stage::Generated, PipelineError::NoPrompts))?;
        let content = generate_content(
            services.content.as_ref(),
            services.text.as_ref(),
            template,
            &category.name,
            &generation_policy,
        )
        .await
        .map_err(at(Stage::Generated))?;
        report.content = Some(content.clone());
        advance(machine, Stage::Generated)?;

        // GENERATED -> PUBLISHED
        checkpoint(&self.cancel, Stage::Published)?;
        let accounts = store
            .list_accounts(subject)
            .await
            .map_err(|e| StageFailure::new(Stage::Published, e.into()))?;
        if accounts.is_empty() {
            return Err(StageFailure::new(
                Stage::Published,
                PipelineError::NoAccounts(subject.to_string()),
            ));
        }
        report.publications = publish_to_accounts(
            store,
            services.publisher.as_ref(),
            &accounts,
            PublishJob {
                category_id: category.id,
                content: &content,
            },
            &publish_policy,
        )
        .await;
        checkpoint(&self.cancel, Stage::Published)?;
        if report.published_count() == 0 {
            tracing::warn!(
                accounts = accounts.len(),
                "no account published successfully"
            );
        }
        advance(machine, Stage::Published)?;

        // PUBLISHED -> FINALIZED
        store
            .mark_category_used(category.id, Utc::now())
            .await
            .map_err(|e| StageFailure::new(Stage::Finalized, e.into()))?;
        advance(machine, Stage::Finalized)?;

        Ok(())
    }

    async fn release(&self, lease: &RunLease, report: &RunReport) {
        if let Err(e) = self
            .store
            .finish_run(lease.run_id, &report.completion())
            .await
        {
            tracing::error!(
                run_id = lease.run_id,
                error = %e,
                "failed to record run completion"
            );
        }
    }
}

fn checkpoint(cancel: &CancellationToken, next: Stage) -> Result<(), StageFailure> {
    if cancel.is_cancelled() {
        return Err(StageFailure {
            stage: next,
            reason: FailureReason::Cancelled,
        });
    }
    Ok(())
}

fn advance(machine: &mut StateMachine, next: Stage) -> Result<(), StageFailure> {
    machine.advance(next).map_err(at(next))
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
