//! Stage 2a: refresh engagement for every published item of the vertical.

use std::collections::HashMap;

use clipcast_core::{PublishedItem, SocialAccount};
use clipcast_db::Store;
use futures::stream::{self, StreamExt};

use crate::error::PipelineError;
use crate::services::{CallPolicy, PlatformCommentBot, PlatformMetrics};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSummary {
    pub items: usize,
    pub refreshed: usize,
    pub fetch_failures: usize,
    pub interaction_failures: usize,
    /// Items not attempted because the run was cancelled.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct ItemOutcome {
    attempted: bool,
    refreshed: bool,
    interaction_failed: bool,
}

/// Appends one fresh snapshot per item and runs comment interaction for it.
///
/// Per-item failures are logged and counted, never propagated.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] only if the items or accounts of the
/// subject cannot be listed.
pub async fn collect_metrics(
    store: &dyn Store,
    metrics: &dyn PlatformMetrics,
    comments: &dyn PlatformCommentBot,
    subject: &str,
    policy: &CallPolicy,
) -> Result<MetricsSummary, PipelineError> {
    let items = store.list_published_items(subject).await?;
    if items.is_empty() {
        tracing::info!("no published items to refresh");
        return Ok(MetricsSummary::default());
    }

    let accounts: HashMap<i64, SocialAccount> = store
        .list_accounts(subject)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    let outcomes: Vec<ItemOutcome> = stream::iter(&items)
        .map(|item| refresh_item(store, metrics, comments, &accounts, item, policy))
        .buffer_unordered(policy.concurrency)
        .collect()
        .await;

    let mut summary = MetricsSummary {
        items: items.len(),
        ..MetricsSummary::default()
    };
    for outcome in outcomes {
        if !outcome.attempted {
            summary.skipped += 1;
            continue;
        }
        if outcome.refreshed {
            summary.refreshed += 1;
        } else {
            summary.fetch_failures += 1;
        }
        if outcome.interaction_failed {
            summary.interaction_failures += 1;
        }
    }

    tracing::info!(
        items = summary.items,
        refreshed = summary.refreshed,
        fetch_failures = summary.fetch_failures,
        interaction_failures = summary.interaction_failures,
        "engagement metrics refreshed"
    );
    Ok(summary)
}

async fn refresh_item(
    store: &dyn Store,
    metrics: &dyn PlatformMetrics,
    comments: &dyn PlatformCommentBot,
    accounts: &HashMap<i64, SocialAccount>,
    item: &PublishedItem,
    policy: &CallPolicy,
) -> ItemOutcome {
    if policy.is_cancelled() {
        return ItemOutcome::default();
    }

    let mut outcome = ItemOutcome {
        attempted: true,
        ..ItemOutcome::default()
    };

    match policy.call(metrics.fetch(&item.post_reference)).await {
        Ok(engagement) => match store.insert_engagement_snapshot(item.id, engagement).await {
            Ok(_) => outcome.refreshed = true,
            Err(e) => {
                tracing::warn!(
                    item_id = item.id,
                    error = %e,
                    "failed to record engagement snapshot"
                );
            }
        },
        Err(e) => {
            tracing::warn!(
                item_id = item.id,
                post_reference = %item.post_reference,
                error = %e,
                "metrics fetch failed"
            );
        }
    }

    // Comment interaction is independent of the fetch and never fails the item.
    let Some(account) = accounts.get(&item.social_account_id) else {
        return outcome;
    };
    if let Err(e) = policy
        .call(comments.interact(account, &item.post_reference))
        .await
    {
        outcome.interaction_failed = true;
        tracing::warn!(
            item_id = item.id,
            account = %account.account_name,
            error = %e,
            "comment interaction failed"
        );
    }

    outcome
}
