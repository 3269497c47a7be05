//! In-process [`Store`] used by tests and `run --dry-run`.
//!
//! Mirrors the Postgres constraints that matter to the pipeline: natural-key
//! uniqueness for accounts and category names, foreign keys for items and
//! snapshots, and the one-running-run-per-subject lease.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use clipcast_core::{
    AccountDeclaration, Category, Credentials, Engagement, EngagementSnapshot, NewPublishedItem,
    Platform, PublishedItem, SocialAccount,
};
use uuid::Uuid;

use crate::pipeline_runs::{clamp_stale_window, RunCompletion, RunStatus};
use crate::store::{RunLease, Store};
use crate::DbError;

/// A pipeline run as recorded by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRun {
    pub id: i64,
    pub public_id: Uuid,
    pub subject: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completion: Option<RunCompletion>,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    accounts: Vec<SocialAccount>,
    categories: Vec<Category>,
    items: Vec<PublishedItem>,
    snapshots: Vec<EngagementSnapshot>,
    runs: Vec<MemoryRun>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a category with explicit score, activity, and last use.
    /// Returns the new id.
    pub fn add_category(
        &self,
        name: &str,
        priority_score: f64,
        is_active: bool,
        last_used_at: Option<DateTime<Utc>>,
    ) -> i64 {
        let mut state = self.lock();
        let id = state.next_id();
        state.categories.push(Category {
            id,
            name: name.to_string(),
            priority_score,
            is_active,
            last_used_at,
        });
        id
    }

    /// Insert a snapshot with an explicit `fetched_at`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Constraint`] if the item does not exist.
    pub fn add_snapshot_at(
        &self,
        item_id: i64,
        engagement: Engagement,
        fetched_at: DateTime<Utc>,
    ) -> Result<EngagementSnapshot, DbError> {
        let mut state = self.lock();
        if !state.items.iter().any(|i| i.id == item_id) {
            return Err(DbError::Constraint(format!(
                "engagement snapshot references missing item {item_id}"
            )));
        }
        let snapshot = EngagementSnapshot {
            id: state.next_id(),
            item_id,
            engagement,
            fetched_at,
        };
        state.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        self.lock().categories.clone()
    }

    #[must_use]
    pub fn category(&self, id: i64) -> Option<Category> {
        self.lock().categories.iter().find(|c| c.id == id).cloned()
    }

    #[must_use]
    pub fn accounts(&self) -> Vec<SocialAccount> {
        self.lock().accounts.clone()
    }

    #[must_use]
    pub fn published_items(&self) -> Vec<PublishedItem> {
        self.lock().items.clone()
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<EngagementSnapshot> {
        self.lock().snapshots.clone()
    }

    #[must_use]
    pub fn runs(&self) -> Vec<MemoryRun> {
        self.lock().runs.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin_run(&self, subject: &str, stale_after_secs: i64) -> Result<RunLease, DbError> {
        let mut state = self.lock();
        let now = Utc::now();
        let cutoff = Duration::try_seconds(clamp_stale_window(stale_after_secs))
            .and_then(|d| now.checked_sub_signed(d));

        for run in state
            .runs
            .iter_mut()
            .filter(|r| r.subject == subject && r.status == RunStatus::Running)
        {
            if cutoff.is_some_and(|c| run.started_at < c) {
                run.status = RunStatus::Abandoned;
            }
        }

        if state
            .runs
            .iter()
            .any(|r| r.subject == subject && r.status == RunStatus::Running)
        {
            return Err(DbError::RunInProgress(subject.to_string()));
        }

        let id = state.next_id();
        let public_id = Uuid::new_v4();
        state.runs.push(MemoryRun {
            id,
            public_id,
            subject: subject.to_string(),
            status: RunStatus::Running,
            started_at: now,
            completion: None,
        });

        Ok(RunLease {
            run_id: id,
            public_id,
            subject: subject.to_string(),
        })
    }

    async fn finish_run(&self, run_id: i64, completion: &RunCompletion) -> Result<(), DbError> {
        let mut state = self.lock();
        let run = state
            .runs
            .iter_mut()
            .find(|r| r.id == run_id && r.status == RunStatus::Running)
            .ok_or(DbError::InvalidRunTransition {
                id: run_id,
                expected_status: "running",
            })?;
        run.status = completion.status;
        run.completion = Some(completion.clone());
        Ok(())
    }

    async fn find_account(
        &self,
        subject: &str,
        platform: Platform,
        account_name: &str,
    ) -> Result<Option<SocialAccount>, DbError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .find(|a| {
                a.subject == subject && a.platform == platform && a.account_name == account_name
            })
            .cloned())
    }

    async fn insert_account(
        &self,
        subject: &str,
        account: &AccountDeclaration,
    ) -> Result<SocialAccount, DbError> {
        let mut state = self.lock();
        let platform = account.platform();
        if state.accounts.iter().any(|a| {
            a.subject == subject && a.platform == platform && a.account_name == account.account_name
        }) {
            return Err(DbError::Constraint(format!(
                "duplicate account '{}' on {platform} for subject '{subject}'",
                account.account_name
            )));
        }
        let stored = SocialAccount {
            id: state.next_id(),
            subject: subject.to_string(),
            platform,
            account_name: account.account_name.clone(),
            credentials: account.credentials.clone(),
        };
        state.accounts.push(stored.clone());
        Ok(stored)
    }

    async fn update_account_credentials(
        &self,
        id: i64,
        credentials: &Credentials,
    ) -> Result<(), DbError> {
        let mut state = self.lock();
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(DbError::NotFound)?;
        if credentials.platform() != account.platform {
            return Err(DbError::Constraint(format!(
                "account {id} is on {} but received {} credentials",
                account.platform,
                credentials.platform()
            )));
        }
        account.credentials = credentials.clone();
        Ok(())
    }

    async fn list_accounts(&self, subject: &str) -> Result<Vec<SocialAccount>, DbError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .filter(|a| a.subject == subject)
            .cloned()
            .collect())
    }

    async fn count_categories(&self) -> Result<i64, DbError> {
        Ok(i64::try_from(self.lock().categories.len()).unwrap_or(i64::MAX))
    }

    async fn insert_category(&self, name: &str) -> Result<bool, DbError> {
        let mut state = self.lock();
        if state.categories.iter().any(|c| c.name == name) {
            return Ok(false);
        }
        let id = state.next_id();
        state.categories.push(Category {
            id,
            name: name.to_string(),
            priority_score: clipcast_core::DEFAULT_PRIORITY_SCORE,
            is_active: true,
            last_used_at: None,
        });
        Ok(true)
    }

    async fn list_active_categories(&self) -> Result<Vec<Category>, DbError> {
        Ok(self
            .lock()
            .categories
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect())
    }

    async fn update_priority_score(&self, category_id: i64, score: f64) -> Result<bool, DbError> {
        let mut state = self.lock();
        match state
            .categories
            .iter_mut()
            .find(|c| c.id == category_id && c.is_active)
        {
            Some(category) => {
                category.priority_score = score;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_category_used(
        &self,
        category_id: i64,
        used_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let mut state = self.lock();
        let category = state
            .categories
            .iter_mut()
            .find(|c| c.id == category_id)
            .ok_or(DbError::NotFound)?;
        category.last_used_at = Some(category.last_used_at.map_or(used_at, |t| t.max(used_at)));
        Ok(())
    }

    async fn insert_published_item(
        &self,
        item: &NewPublishedItem,
    ) -> Result<PublishedItem, DbError> {
        let mut state = self.lock();
        if !state.categories.iter().any(|c| c.id == item.category_id) {
            return Err(DbError::Constraint(format!(
                "published item references missing category {}",
                item.category_id
            )));
        }
        if !state.accounts.iter().any(|a| a.id == item.social_account_id) {
            return Err(DbError::Constraint(format!(
                "published item references missing account {}",
                item.social_account_id
            )));
        }
        let stored = PublishedItem {
            id: state.next_id(),
            category_id: item.category_id,
            social_account_id: item.social_account_id,
            prompt_used: item.prompt_used.clone(),
            artifact_path: item.artifact_path.clone(),
            post_reference: item.post_reference.clone(),
            published_at: Utc::now(),
        };
        state.items.push(stored.clone());
        Ok(stored)
    }

    async fn list_published_items(&self, subject: &str) -> Result<Vec<PublishedItem>, DbError> {
        let state = self.lock();
        Ok(state
            .items
            .iter()
            .filter(|item| {
                state
                    .accounts
                    .iter()
                    .any(|a| a.id == item.social_account_id && a.subject == subject)
            })
            .cloned()
            .collect())
    }

    async fn insert_engagement_snapshot(
        &self,
        item_id: i64,
        engagement: Engagement,
    ) -> Result<EngagementSnapshot, DbError> {
        self.add_snapshot_at(item_id, engagement, Utc::now())
    }

    async fn list_category_engagement(
        &self,
        category_id: i64,
    ) -> Result<Vec<EngagementSnapshot>, DbError> {
        let state = self.lock();
        Ok(state
            .snapshots
            .iter()
            .filter(|s| {
                state
                    .items
                    .iter()
                    .any(|i| i.id == s.item_id && i.category_id == category_id)
            })
            .cloned()
            .collect())
    }
}
