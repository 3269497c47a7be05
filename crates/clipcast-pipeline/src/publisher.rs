//! Stage 5: fan the generated content out to every account of the vertical.

use clipcast_core::{NewPublishedItem, Platform, SocialAccount};
use clipcast_db::Store;
use futures::stream::{self, StreamExt};

use crate::error::CollaboratorError;
use crate::generator::GeneratedContent;
use crate::services::{CallPolicy, PlatformPublisher};

/// What to publish and under which category.
#[derive(Debug, Clone, Copy)]
pub struct PublishJob<'a> {
    pub category_id: i64,
    pub content: &'a GeneratedContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStatus {
    Published { item_id: i64, post_reference: String },
    Failed { error: String },
    /// Not attempted because the run was cancelled first.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub account_id: i64,
    pub platform: Platform,
    pub account_name: String,
    pub status: PublishStatus,
}

impl PublishOutcome {
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self.status, PublishStatus::Published { .. })
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.status, PublishStatus::Failed { .. })
    }
}

/// Attempts one publish per account with bounded concurrency.
///
/// Each success records exactly one published item. Failures are logged and
/// never affect other accounts. Outcomes are returned in `accounts` order.
pub async fn publish_to_accounts(
    store: &dyn Store,
    publisher: &dyn PlatformPublisher,
    accounts: &[SocialAccount],
    job: PublishJob<'_>,
    policy: &CallPolicy,
) -> Vec<PublishOutcome> {
    let mut indexed: Vec<(usize, PublishOutcome)> = stream::iter(accounts.iter().enumerate())
        .map(|(index, account)| async move {
            (index, publish_one(store, publisher, account, job, policy).await)
        })
        .buffer_unordered(policy.concurrency)
        .collect()
        .await;
    indexed.sort_by_key(|(index, _)| *index);

    let outcomes: Vec<PublishOutcome> = indexed.into_iter().map(|(_, o)| o).collect();
    let published = outcomes.iter().filter(|o| o.is_published()).count();
    tracing::info!(
        published,
        attempted = outcomes.len(),
        "fan-out complete"
    );
    outcomes
}

async fn publish_one(
    store: &dyn Store,
    publisher: &dyn PlatformPublisher,
    account: &SocialAccount,
    job: PublishJob<'_>,
    policy: &CallPolicy,
) -> PublishOutcome {
    let status = if policy.is_cancelled() {
        PublishStatus::Skipped
    } else {
        attempt(store, publisher, account, job, policy).await
    };

    PublishOutcome {
        account_id: account.id,
        platform: account.platform,
        account_name: account.account_name.clone(),
        status,
    }
}

async fn attempt(
    store: &dyn Store,
    publisher: &dyn PlatformPublisher,
    account: &SocialAccount,
    job: PublishJob<'_>,
    policy: &CallPolicy,
) -> PublishStatus {
    let content = job.content;
    let post_reference = match policy
        .call(publisher.publish(
            account,
            &content.artifact,
            &content.title,
            &content.description,
        ))
        .await
    {
        Ok(reference) => reference,
        Err(CollaboratorError::Cancelled) => return PublishStatus::Skipped,
        Err(e) => {
            tracing::warn!(
                account = %account.account_name,
                platform = %account.platform,
                error = %e,
                "publish failed"
            );
            return PublishStatus::Failed {
                error: e.to_string(),
            };
        }
    };

    let item = NewPublishedItem {
        category_id: job.category_id,
        social_account_id: account.id,
        prompt_used: content.prompt.clone(),
        artifact_path: content.artifact.clone(),
        post_reference: post_reference.clone(),
    };
    match store.insert_published_item(&item).await {
        Ok(recorded) => {
            tracing::info!(
                account = %account.account_name,
                platform = %account.platform,
                post_reference = %post_reference,
                "published"
            );
            PublishStatus::Published {
                item_id: recorded.id,
                post_reference,
            }
        }
        Err(e) => {
            tracing::warn!(
                account = %account.account_name,
                post_reference = %post_reference,
                error = %e,
                "published but failed to record item"
            );
            PublishStatus::Failed {
                error: format!("published as {post_reference} but not recorded: {e}"),
            }
        }
    }
}
