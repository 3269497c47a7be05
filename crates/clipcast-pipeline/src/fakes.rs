//! Scripted collaborators and store wrappers for pipeline tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clipcast_core::{
    AccountDeclaration, Category, Credentials, Engagement, EngagementSnapshot, NewPublishedItem,
    Platform, PublishedItem, SocialAccount,
};
use clipcast_db::{DbError, MemoryStore, RunCompletion, RunLease, Store};
use tokio_util::sync::CancellationToken;

use crate::error::CollaboratorError;
use crate::services::{
    CallPolicy, Collaborators, ContentGenerationService, PlatformCommentBot, PlatformMetrics,
    PlatformPublisher, TextGenerationService,
};

pub(crate) fn policy() -> CallPolicy {
    CallPolicy::new(Duration::from_secs(5), 4, CancellationToken::new())
}

pub(crate) fn tiktok(name: &str) -> AccountDeclaration {
    AccountDeclaration {
        account_name: name.to_string(),
        credentials: Credentials::Tiktok {
            access_token: format!("token-{name}"),
        },
    }
}

pub(crate) fn youtube(name: &str, api_key: &str) -> AccountDeclaration {
    AccountDeclaration {
        account_name: name.to_string(),
        credentials: Credentials::Youtube {
            api_key: api_key.to_string(),
            oauth_token: "oauth".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Returns a fixed artifact reference, or fails when told to.
#[derive(Debug, Default)]
pub(crate) struct ScriptedContent {
    pub artifact: String,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedContent {
    pub(crate) fn ok() -> Self {
        Self {
            artifact: "artifacts/clip.mp4".to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn returning(artifact: &str) -> Self {
        Self {
            artifact: artifact.to_string(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ContentGenerationService for ScriptedContent {
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(CollaboratorError::service("content", "render farm offline"));
        }
        Ok(self.artifact.clone())
    }
}

/// Echoes the prompt back; fails or returns blank text for prompts
/// containing the configured marker.
#[derive(Debug, Default)]
pub(crate) struct EchoText {
    pub fail_on: Option<&'static str>,
    pub blank_on: Option<&'static str>,
}

#[async_trait]
impl TextGenerationService for EchoText {
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        if self.fail_on.is_some_and(|marker| prompt.contains(marker)) {
            return Err(CollaboratorError::service("text", "quota exceeded"));
        }
        if self.blank_on.is_some_and(|marker| prompt.contains(marker)) {
            return Ok("   ".to_string());
        }
        Ok(format!("text for: {prompt}"))
    }
}

/// Publishes successfully except for the named accounts.
#[derive(Debug, Default)]
pub(crate) struct ScriptedPublisher {
    pub fail_accounts: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
    /// Cancels this token on the first call, simulating Ctrl-C mid fan-out.
    pub cancel_on_first_call: Option<CancellationToken>,
}

impl ScriptedPublisher {
    pub(crate) fn failing_for(names: &[&str]) -> Self {
        Self {
            fail_accounts: names.iter().map(|n| (*n).to_string()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PlatformPublisher for ScriptedPublisher {
    async fn publish(
        &self,
        account: &SocialAccount,
        _artifact: &str,
        _title: &str,
        _description: &str,
    ) -> Result<String, CollaboratorError> {
        self.calls.lock().unwrap().push(account.account_name.clone());
        if let Some(token) = &self.cancel_on_first_call {
            token.cancel();
        }
        if self.fail_accounts.contains(&account.account_name) {
            return Err(CollaboratorError::service("publisher", "upload rejected"));
        }
        Ok(format!("post://{}/{}", account.platform, account.account_name))
    }
}

/// Returns the same engagement for every post except the failing ones.
#[derive(Debug, Default)]
pub(crate) struct FixedMetrics {
    pub engagement: Engagement,
    pub fail_refs: HashSet<String>,
}

#[async_trait]
impl PlatformMetrics for FixedMetrics {
    async fn fetch(&self, post_reference: &str) -> Result<Engagement, CollaboratorError> {
        if self.fail_refs.contains(post_reference) {
            return Err(CollaboratorError::service("metrics", "post not found"));
        }
        Ok(self.engagement)
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingCommentBot {
    pub fail: bool,
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl PlatformCommentBot for RecordingCommentBot {
    async fn interact(
        &self,
        _account: &SocialAccount,
        post_reference: &str,
    ) -> Result<(), CollaboratorError> {
        self.calls.lock().unwrap().push(post_reference.to_string());
        if self.fail {
            return Err(CollaboratorError::service("comments", "rate limited"));
        }
        Ok(())
    }
}

/// Handles onto every fake so tests can inspect calls after a run.
pub(crate) struct Fakes {
    pub content: Arc<ScriptedContent>,
    pub text: Arc<EchoText>,
    pub publisher: Arc<ScriptedPublisher>,
    pub metrics: Arc<FixedMetrics>,
    pub comments: Arc<RecordingCommentBot>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            content: Arc::new(ScriptedContent::ok()),
            text: Arc::new(EchoText::default()),
            publisher: Arc::new(ScriptedPublisher::default()),
            metrics: Arc::new(FixedMetrics {
                engagement: Engagement {
                    views: 100,
                    likes: 10,
                    comments: 5,
                    shares: 1,
                },
                ..FixedMetrics::default()
            }),
            comments: Arc::new(RecordingCommentBot::default()),
        }
    }
}

impl Fakes {
    pub(crate) fn collaborators(&self) -> Collaborators {
        Collaborators {
            content: self.content.clone(),
            text: self.text.clone(),
            publisher: self.publisher.clone(),
            metrics: self.metrics.clone(),
            comments: self.comments.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store wrapper with injectable failures
// ---------------------------------------------------------------------------

/// Delegates to a [`MemoryStore`] but can fail selected operations.
#[derive(Debug, Default)]
pub(crate) struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_engagement_reads: AtomicBool,
    pub fail_account_writes: AtomicBool,
}

fn injected() -> DbError {
    DbError::Constraint("injected failure".to_string())
}

#[async_trait]
impl Store for FlakyStore {
    async fn begin_run(&self, subject: &str, stale_after_secs: i64) -> Result<RunLease, DbError> {
        self.inner.begin_run(subject, stale_after_secs).await
    }

    async fn finish_run(&self, run_id: i64, completion: &RunCompletion) -> Result<(), DbError> {
        self.inner.finish_run(run_id, completion).await
    }

    async fn find_account(
        &self,
        subject: &str,
        platform: Platform,
        account_name: &str,
    ) -> Result<Option<SocialAccount>, DbError> {
        self.inner.find_account(subject, platform, account_name).await
    }

    async fn insert_account(
        &self,
        subject: &str,
        account: &AccountDeclaration,
    ) -> Result<SocialAccount, DbError> {
        if self.fail_account_writes.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.insert_account(subject, account).await
    }

    async fn update_account_credentials(
        &self,
        id: i64,
        credentials: &Credentials,
    ) -> Result<(), DbError> {
        if self.fail_account_writes.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.update_account_credentials(id, credentials).await
    }

    async fn list_accounts(&self, subject: &str) -> Result<Vec<SocialAccount>, DbError> {
        self.inner.list_accounts(subject).await
    }

    async fn count_categories(&self) -> Result<i64, DbError> {
        self.inner.count_categories().await
    }

    async fn insert_category(&self, name: &str) -> Result<bool, DbError> {
        self.inner.insert_category(name).await
    }

    async fn list_active_categories(&self) -> Result<Vec<Category>, DbError> {
        self.inner.list_active_categories().await
    }

    async fn update_priority_score(&self, category_id: i64, score: f64) -> Result<bool, DbError> {
        self.inner.update_priority_score(category_id, score).await
    }

    async fn mark_category_used(
        &self,
        category_id: i64,
        used_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.inner.mark_category_used(category_id, used_at).await
    }

    async fn insert_published_item(
        &self,
        item: &NewPublishedItem,
    ) -> Result<PublishedItem, DbError> {
        self.inner.insert_published_item(item).await
    }

    async fn list_published_items(&self, subject: &str) -> Result<Vec<PublishedItem>, DbError> {
        self.inner.list_published_items(subject).await
    }

    async fn insert_engagement_snapshot(
        &self,
        item_id: i64,
        engagement: Engagement,
    ) -> Result<EngagementSnapshot, DbError> {
        self.inner.insert_engagement_snapshot(item_id, engagement).await
    }

    async fn list_category_engagement(
        &self,
        category_id: i64,
    ) -> Result<Vec<EngagementSnapshot>, DbError> {
        if self.fail_engagement_reads.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.list_category_engagement(category_id).await
    }
}
