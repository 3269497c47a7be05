//! The result of one pipeline run.

use std::fmt;

use clipcast_core::Category;
use clipcast_db::{RunCompletion, RunStatus};
use uuid::Uuid;

use crate::generator::GeneratedContent;
use crate::metrics::MetricsSummary;
use crate::publisher::{PublishOutcome, PublishStatus};
use crate::scorer::ScoreUpdate;
use crate::state::Stage;
use crate::sync::SyncSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No active category exists. A clean end, not a crash.
    NoCategoryAvailable,
    NoAccounts,
    Cancelled,
    Error(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoCategoryAvailable => f.write_str("no category available"),
            FailureReason::NoAccounts => f.write_str("no social accounts configured"),
            FailureReason::Cancelled => f.write_str("cancelled"),
            FailureReason::Error(message) => f.write_str(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Finalized,
    /// `stage` is the stage the run was attempting to reach.
    Failed { stage: Stage, reason: FailureReason },
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: i64,
    pub public_id: Uuid,
    pub subject: String,
    pub outcome: RunOutcome,
    pub stages: Vec<Stage>,
    pub sync: SyncSummary,
    pub metrics: MetricsSummary,
    pub score_updates: Vec<ScoreUpdate>,
    pub category: Option<Category>,
    pub content: Option<GeneratedContent>,
    pub publications: Vec<PublishOutcome>,
}

impl RunReport {
    pub(crate) fn new(run_id: i64, public_id: Uuid, subject: &str) -> Self {
        Self {
            run_id,
            public_id,
            subject: subject.to_string(),
            outcome: RunOutcome::Finalized,
            stages: Vec::new(),
            sync: SyncSummary::default(),
            metrics: MetricsSummary::default(),
            score_updates: Vec::new(),
            category: None,
            content: None,
            publications: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.outcome == RunOutcome::Finalized
    }

    #[must_use]
    pub fn published_count(&self) -> usize {
        self.publications.iter().filter(|p| p.is_published()).count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.publications.iter().filter(|p| p.is_failed()).count()
    }

    /// Finalized, but every publish attempt failed.
    #[must_use]
    pub fn nothing_published(&self) -> bool {
        self.is_finalized() && self.published_count() == 0
    }

    /// Terminal bookkeeping for the run's audit row.
    #[must_use]
    pub fn completion(&self) -> RunCompletion {
        let (status, stage, error_message) = match &self.outcome {
            RunOutcome::Finalized => (RunStatus::Finalized, Stage::Finalized, None),
            RunOutcome::Failed { stage, reason } => {
                (RunStatus::Failed, *stage, Some(reason.to_string()))
            }
        };
        RunCompletion {
            status,
            stage: stage.as_str().to_string(),
            category_id: self.category.as_ref().map(|c| c.id),
            published_count: i32::try_from(self.published_count()).unwrap_or(i32::MAX),
            failed_count: i32::try_from(self.failed_count()).unwrap_or(i32::MAX),
            error_message,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            RunOutcome::Finalized => writeln!(
                f,
                "Run {} for '{}': FINALIZED",
                self.public_id, self.subject
            )?,
            RunOutcome::Failed { stage, reason } => writeln!(
                f,
                "Run {} for '{}': FAILED at {stage}: {reason}",
                self.public_id, self.subject
            )?,
        }

        writeln!(
            f,
            "  accounts: {} created, {} updated; categories seeded: {}",
            self.sync.accounts_created, self.sync.accounts_updated, self.sync.categories_seeded
        )?;
        writeln!(
            f,
            "  metrics: {}/{} items refreshed ({} fetch failures, {} comment failures)",
            self.metrics.refreshed,
            self.metrics.items,
            self.metrics.fetch_failures,
            self.metrics.interaction_failures
        )?;
        if let Some(category) = &self.category {
            writeln!(
                f,
                "  category: {} (score {:.2})",
                category.name, category.priority_score
            )?;
        }
        if let Some(content) = &self.content {
            writeln!(f, "  artifact: {}", content.artifact)?;
        }

        for publication in &self.publications {
            let line = match &publication.status {
                PublishStatus::Published { post_reference, .. } => {
                    format!("\u{2713} {post_reference}")
                }
                PublishStatus::Failed { error } => format!("\u{2717} {error}"),
                PublishStatus::Skipped => "- skipped".to_string(),
            };
            writeln!(
                f,
                "  {:<10} {:<24} {line}",
                publication.platform.as_str(),
                publication.account_name
            )?;
        }

        if self.nothing_published() {
            writeln!(f, "  warning: no account published successfully")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clipcast_core::Platform;

    use super::*;

    fn outcome(name: &str, status: PublishStatus) -> PublishOutcome {
        PublishOutcome {
            account_id: 1,
            platform: Platform::Instagram,
            account_name: name.to_string(),
            status,
        }
    }

    #[test]
    fn completion_for_failed_run_carries_stage_and_reason() {
        let mut report = RunReport::new(7, Uuid::nil(), "finance");
        report.outcome = RunOutcome::Failed {
            stage: Stage::Selected,
            reason: FailureReason::NoCategoryAvailable,
        };

        let completion = report.completion();

        assert_eq!(completion.status, RunStatus::Failed);
        assert_eq!(completion.stage, "selected");
        assert_eq!(completion.error_message.as_deref(), Some("no category available"));
        assert_eq!(completion.category_id, None);
    }

    #[test]
    fn counts_publications_by_status() {
        let mut report = RunReport::new(1, Uuid::nil(), "finance");
        report.publications = vec![
            outcome(
                "a",
                PublishStatus::Published {
                    item_id: 1,
                    post_reference: "p".to_string(),
                },
            ),
            outcome(
                "b",
                PublishStatus::Failed {
                    error: "x".to_string(),
                },
            ),
            outcome("c", PublishStatus::Skipped),
        ];

        assert_eq!(report.published_count(), 1);
        assert_eq!(report.failed_count(), 1);
        let completion = report.completion();
        assert_eq!(completion.status, RunStatus::Finalized);
        assert_eq!(completion.published_count, 1);
        assert_eq!(completion.failed_count, 1);
    }

    #[test]
    fn zero_successes_is_flagged_in_summary() {
        let mut report = RunReport::new(1, Uuid::nil(), "finance");
        report.publications = vec![outcome(
            "a",
            PublishStatus::Failed {
                error: "rejected".to_string(),
            },
        )];

        assert!(report.nothing_published());
        assert!(report.to_string().contains("no account published successfully"));
    }

    #[test]
    fn failed_summary_names_stage_and_reason() {
        let mut report = RunReport::new(1, Uuid::nil(), "finance");
        report.outcome = RunOutcome::Failed {
            stage: Stage::Generated,
            reason: FailureReason::Error("render farm offline".to_string()),
        };
        let text = report.to_string();
        assert!(text.contains("FAILED at GENERATED: render farm offline"));
    }
}
