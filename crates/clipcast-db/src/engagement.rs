//! Database operations for the append-only `engagement_snapshots` table.

use chrono::{DateTime, Utc};
use clipcast_core::{Engagement, EngagementSnapshot};
use sqlx::PgPool;

use crate::{classify, DbError};

/// A row from the `engagement_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EngagementSnapshotRow {
    pub id: i64,
    pub item_id: i64,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub fetched_at: DateTime<Utc>,
}

impl From<EngagementSnapshotRow> for EngagementSnapshot {
    fn from(row: EngagementSnapshotRow) -> Self {
        EngagementSnapshot {
            id: row.id,
            item_id: row.item_id,
            engagement: Engagement {
                views: row.views,
                likes: row.likes,
                comments: row.comments,
                shares: row.shares,
            },
            fetched_at: row.fetched_at,
        }
    }
}

/// Appends a snapshot for `item_id`. Existing snapshots are never modified.
///
/// # Errors
///
/// Returns [`DbError::Constraint`] if the item does not exist.
pub async fn insert_engagement_snapshot(
    pool: &PgPool,
    item_id: i64,
    engagement: Engagement,
) -> Result<EngagementSnapshot, DbError> {
    let row = sqlx::query_as::<_, EngagementSnapshotRow>(
        "INSERT INTO engagement_snapshots (item_id, views, likes, comments, shares) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, item_id, views, likes, comments, shares, fetched_at",
    )
    .bind(item_id)
    .bind(engagement.views)
    .bind(engagement.likes)
    .bind(engagement.comments)
    .bind(engagement.shares)
    .fetch_one(pool)
    .await
    .map_err(classify)?;

    Ok(row.into())
}

/// Returns every snapshot of every item in `category_id`, across all history.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_category_engagement(
    pool: &PgPool,
    category_id: i64,
) -> Result<Vec<EngagementSnapshot>, DbError> {
    let rows = sqlx::query_as::<_, EngagementSnapshotRow>(
        "SELECT es.id, es.item_id, es.views, es.likes, es.comments, es.shares, es.fetched_at \
         FROM engagement_snapshots es \
         JOIN published_items pi ON pi.id = es.item_id \
         WHERE pi.category_id = $1 \
         ORDER BY es.item_id, es.fetched_at",
    )
    .bind(category_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(EngagementSnapshot::from).collect())
}
