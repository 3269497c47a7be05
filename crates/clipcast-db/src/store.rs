//! The persistence seam used by the pipeline.
//!
//! [`Store`] is implemented by [`PgStore`] for production and by
//! [`crate::MemoryStore`] for tests and dry runs. Components receive the
//! store explicitly; there is no process-wide connection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clipcast_core::{
    AccountDeclaration, Category, Credentials, Engagement, EngagementSnapshot, NewPublishedItem,
    Platform, PublishedItem, SocialAccount,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::pipeline_runs::RunCompletion;
use crate::DbError;

/// Exclusive lease on a content vertical, held for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLease {
    pub run_id: i64,
    pub public_id: Uuid,
    pub subject: String,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Acquire the run lease for `subject`; fails with
    /// [`DbError::RunInProgress`] while another run holds it.
    async fn begin_run(&self, subject: &str, stale_after_secs: i64) -> Result<RunLease, DbError>;

    /// Release the lease and record the run's terminal status.
    async fn finish_run(&self, run_id: i64, completion: &RunCompletion) -> Result<(), DbError>;

    async fn find_account(
        &self,
        subject: &str,
        platform: Platform,
        account_name: &str,
    ) -> Result<Option<SocialAccount>, DbError>;

    async fn insert_account(
        &self,
        subject: &str,
        account: &AccountDeclaration,
    ) -> Result<SocialAccount, DbError>;

    async fn update_account_credentials(
        &self,
        id: i64,
        credentials: &Credentials,
    ) -> Result<(), DbError>;

    async fn list_accounts(&self, subject: &str) -> Result<Vec<SocialAccount>, DbError>;

    async fn count_categories(&self) -> Result<i64, DbError>;

    /// Insert an active category unless the name exists; `true` if inserted.
    async fn insert_category(&self, name: &str) -> Result<bool, DbError>;

    async fn list_active_categories(&self) -> Result<Vec<Category>, DbError>;

    /// Write a recomputed score to an active category; `false` if the
    /// category is inactive or missing.
    async fn update_priority_score(&self, category_id: i64, score: f64) -> Result<bool, DbError>;

    /// Advance `last_used_at`, never moving it backwards.
    async fn mark_category_used(
        &self,
        category_id: i64,
        used_at: DateTime<Utc>,
    ) -> Result<(), DbError>;

    async fn insert_published_item(
        &self,
        item: &NewPublishedItem,
    ) -> Result<PublishedItem, DbError>;

    async fn list_published_items(&self, subject: &str) -> Result<Vec<PublishedItem>, DbError>;

    async fn insert_engagement_snapshot(
        &self,
        item_id: i64,
        engagement: Engagement,
    ) -> Result<EngagementSnapshot, DbError>;

    /// Every historical snapshot of every item in the category.
    async fn list_category_engagement(
        &self,
        category_id: i64,
    ) -> Result<Vec<EngagementSnapshot>, DbError>;
}

/// Postgres-backed [`Store`] over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin_run(&self, subject: &str, stale_after_secs: i64) -> Result<RunLease, DbError> {
        let row = crate::begin_pipeline_run(&self.pool, subject, stale_after_secs).await?;
        Ok(RunLease {
            run_id: row.id,
            public_id: row.public_id,
            subject: row.subject,
        })
    }

    async fn finish_run(&self, run_id: i64, completion: &RunCompletion) -> Result<(), DbError> {
        crate::finish_pipeline_run(&self.pool, run_id, completion).await
    }

    async fn find_account(
        &self,
        subject: &str,
        platform: Platform,
        account_name: &str,
    ) -> Result<Option<SocialAccount>, DbError> {
        crate::find_account(&self.pool, subject, platform, account_name).await
    }

    async fn insert_account(
        &self,
        subject: &str,
        account: &AccountDeclaration,
    ) -> Result<SocialAccount, DbError> {
        crate::insert_account(&self.pool, subject, account).await
    }

    async fn update_account_credentials(
        &self,
        id: i64,
        credentials: &Credentials,
    ) -> Result<(), DbError> {
        crate::update_account_credentials(&self.pool, id, credentials).await
    }

    async fn list_accounts(&self, subject: &str) -> Result<Vec<SocialAccount>, DbError> {
        crate::list_accounts(&self.pool, subject).await
    }

    async fn count_categories(&self) -> Result<i64, DbError> {
        crate::count_categories(&self.pool).await
    }

    async fn insert_category(&self, name: &str) -> Result<bool, DbError> {
        crate::insert_category(&self.pool, name).await
    }

    async fn list_active_categories(&self) -> Result<Vec<Category>, DbError> {
        crate::list_active_categories(&self.pool).await
    }

    async fn update_priority_score(&self, category_id: i64, score: f64) -> Result<bool, DbError> {
        crate::update_priority_score(&self.pool, category_id, score).await
    }

    async fn mark_category_used(
        &self,
        category_id: i64,
        used_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        crate::mark_category_used(&self.pool, category_id, used_at).await
    }

    async fn insert_published_item(
        &self,
        item: &NewPublishedItem,
    ) -> Result<PublishedItem, DbError> {
        crate::insert_published_item(&self.pool, item).await
    }

    async fn list_published_items(&self, subject: &str) -> Result<Vec<PublishedItem>, DbError> {
        crate::list_published_items(&self.pool, subject).await
    }

    async fn insert_engagement_snapshot(
        &self,
        item_id: i64,
        engagement: Engagement,
    ) -> Result<EngagementSnapshot, DbError> {
        crate::insert_engagement_snapshot(&self.pool, item_id, engagement).await
    }

    async fn list_category_engagement(
        &self,
        category_id: i64,
    ) -> Result<Vec<EngagementSnapshot>, DbError> {
        crate::list_category_engagement(&self.pool, category_id).await
    }
}
