//! Stage 2b: recompute each active category's priority score.

use std::collections::HashSet;

use clipcast_core::{EngagementSnapshot, DEFAULT_PRIORITY_SCORE};
use clipcast_db::Store;

use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreUpdate {
    pub category_id: i64,
    pub name: String,
    pub previous: f64,
    pub score: f64,
}

/// Average weighted engagement per item, summed over every snapshot.
///
/// Every historical snapshot counts, so an item refreshed across many runs
/// contributes more than one seen once. Categories without any snapshot get
/// [`DEFAULT_PRIORITY_SCORE`].
#[must_use]
pub fn category_score(snapshots: &[EngagementSnapshot]) -> f64 {
    let items: HashSet<i64> = snapshots.iter().map(|s| s.item_id).collect();
    if items.is_empty() {
        return DEFAULT_PRIORITY_SCORE;
    }
    let total: f64 = snapshots.iter().map(|s| s.engagement.weighted()).sum();
    #[allow(clippy::cast_precision_loss)]
    let count = items.len() as f64;
    total / count
}

/// Rescores every active category. Inactive categories are left untouched.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] on any store failure; a partial rescore is
/// not rolled back.
pub async fn recalculate_priority_scores(
    store: &dyn Store,
) -> Result<Vec<ScoreUpdate>, PipelineError> {
    let categories = store.list_active_categories().await?;
    let mut updates = Vec::with_capacity(categories.len());

    for category in categories {
        let snapshots = store.list_category_engagement(category.id).await?;
        let score = category_score(&snapshots);

        if store.update_priority_score(category.id, score).await? {
            tracing::debug!(
                category = %category.name,
                previous = category.priority_score,
                score,
                "priority score updated"
            );
            updates.push(ScoreUpdate {
                category_id: category.id,
                name: category.name,
                previous: category.priority_score,
                score,
            });
        }
    }

    tracing::info!(categories = updates.len(), "priority scores recalculated");
    Ok(updates)
}
