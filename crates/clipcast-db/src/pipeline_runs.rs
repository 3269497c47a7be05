//! Database operations for `pipeline_runs`, the audit trail and run-scope lease.
//!
//! A row in `running` status is the exclusive lease for its subject; the
//! partial unique index `pipeline_runs_one_running_per_subject` rejects a
//! second concurrent run.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Longest stale-lease window applied by the stores, about 200 years. No live
/// run can be older, and `NOW()` minus this stays inside Postgres'
/// timestamp range.
pub const MAX_STALE_WINDOW_SECS: i64 = 6_311_520_000;

/// Clamps a stale-lease window to `0..=MAX_STALE_WINDOW_SECS`.
#[must_use]
pub fn clamp_stale_window(stale_after_secs: i64) -> i64 {
    stale_after_secs.clamp(0, MAX_STALE_WINDOW_SECS)
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Finalized,
    Failed,
    Abandoned,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Finalized => "finalized",
            RunStatus::Failed => "failed",
            RunStatus::Abandoned => "abandoned",
        }
    }
}

/// A row from the `pipeline_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PipelineRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub subject: String,
    pub status: String,
    pub stage: String,
    pub category_id: Option<i64>,
    pub published_count: i32,
    pub failed_count: i32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Terminal bookkeeping written when a run leaves `running`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunCompletion {
    pub status: RunStatus,
    /// Name of the last stage reached (or the stage that failed).
    pub stage: String,
    pub category_id: Option<i64>,
    pub published_count: i32,
    pub failed_count: i32,
    pub error_message: Option<String>,
}

const COLUMNS: &str = "id, public_id, subject, status, stage, category_id, published_count, \
                       failed_count, error_message, started_at, completed_at";

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Acquires the run lease for `subject` by inserting a `running` row.
///
/// Runs of the same subject still `running` after `stale_after_secs` are
/// first marked `abandoned` so a crashed process cannot block the vertical
/// forever.
///
/// # Errors
///
/// Returns [`DbError::RunInProgress`] if another live run holds the lease,
/// or [`DbError::Sqlx`] if a query fails.
pub async fn begin_pipeline_run(
    pool: &PgPool,
    subject: &str,
    stale_after_secs: i64,
) -> Result<PipelineRunRow, DbError> {
    let mut tx = pool.begin().await?;

    let reclaimed = sqlx::query(
        "UPDATE pipeline_runs \
         SET status = 'abandoned', completed_at = NOW(), \
             error_message = 'lease expired before the run completed' \
         WHERE subject = $1 AND status = 'running' \
           AND started_at < NOW() - ($2::bigint * INTERVAL '1 second')",
    )
    .bind(subject)
    .bind(clamp_stale_window(stale_after_secs))
    .execute(&mut *tx)
    .await?;

    if reclaimed.rows_affected() > 0 {
        tracing::warn!(
            subject,
            reclaimed = reclaimed.rows_affected(),
            "reclaimed stale pipeline run lease"
        );
    }

    let row = sqlx::query_as::<_, PipelineRunRow>(&format!(
        "INSERT INTO pipeline_runs (public_id, subject, status, stage) \
         VALUES ($1, $2, 'running', 'init') \
         ON CONFLICT (subject) WHERE status = 'running' DO NOTHING \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(subject)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        tx.rollback().await?;
        return Err(DbError::RunInProgress(subject.to_string()));
    };

    tx.commit().await?;
    Ok(row)
}

/// Moves a `running` run to its terminal status.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`
/// (for example, it was reclaimed as stale), or [`DbError::Sqlx`] on failure.
pub async fn finish_pipeline_run(
    pool: &PgPool,
    id: i64,
    completion: &RunCompletion,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pipeline_runs \
         SET status = $1, stage = $2, category_id = $3, published_count = $4, \
             failed_count = $5, error_message = $6, completed_at = NOW() \
         WHERE id = $7 AND status = 'running'",
    )
    .bind(completion.status.as_str())
    .bind(&completion.stage)
    .bind(completion.category_id)
    .bind(completion.published_count)
    .bind(completion.failed_count)
    .bind(completion.error_message.as_deref())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pipeline_runs(pool: &PgPool, limit: i64) -> Result<Vec<PipelineRunRow>, DbError> {
    let rows = sqlx::query_as::<_, PipelineRunRow>(&format!(
        "SELECT {COLUMNS} FROM pipeline_runs \
         ORDER BY started_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
