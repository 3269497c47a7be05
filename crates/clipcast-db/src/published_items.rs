//! Database operations for the `published_items` table.

use chrono::{DateTime, Utc};
use clipcast_core::{NewPublishedItem, PublishedItem};
use sqlx::PgPool;

use crate::{classify, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `published_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PublishedItemRow {
    pub id: i64,
    pub category_id: i64,
    pub social_account_id: i64,
    pub prompt_used: String,
    pub artifact_path: String,
    pub post_reference: String,
    pub published_at: DateTime<Utc>,
}

impl From<PublishedItemRow> for PublishedItem {
    fn from(row: PublishedItemRow) -> Self {
        PublishedItem {
            id: row.id,
            category_id: row.category_id,
            social_account_id: row.social_account_id,
            prompt_used: row.prompt_used,
            artifact_path: row.artifact_path,
            post_reference: row.post_reference,
            published_at: row.published_at,
        }
    }
}

/// A published item joined with its category, account, and the latest
/// engagement snapshot (if any). Used by read-only reports.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemReportRow {
    pub id: i64,
    pub category_name: String,
    pub platform: String,
    pub account_name: String,
    pub post_reference: String,
    pub published_at: DateTime<Utc>,
    pub latest_views: Option<i64>,
    pub latest_likes: Option<i64>,
    pub latest_comments: Option<i64>,
    pub latest_fetched_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Records one successful per-account publish.
///
/// # Errors
///
/// Returns [`DbError::Constraint`] if the category or account does not exist.
pub async fn insert_published_item(
    pool: &PgPool,
    item: &NewPublishedItem,
) -> Result<PublishedItem, DbError> {
    let row = sqlx::query_as::<_, PublishedItemRow>(
        "INSERT INTO published_items \
             (category_id, social_account_id, prompt_used, artifact_path, post_reference) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, category_id, social_account_id, prompt_used, artifact_path, \
                   post_reference, published_at",
    )
    .bind(item.category_id)
    .bind(item.social_account_id)
    .bind(&item.prompt_used)
    .bind(&item.artifact_path)
    .bind(&item.post_reference)
    .fetch_one(pool)
    .await
    .map_err(classify)?;

    Ok(row.into())
}

/// Returns every item published through an account of `subject`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_published_items(
    pool: &PgPool,
    subject: &str,
) -> Result<Vec<PublishedItem>, DbError> {
    let rows = sqlx::query_as::<_, PublishedItemRow>(
        "SELECT pi.id, pi.category_id, pi.social_account_id, pi.prompt_used, \
                pi.artifact_path, pi.post_reference, pi.published_at \
         FROM published_items pi \
         JOIN social_accounts sa ON sa.id = pi.social_account_id \
         WHERE sa.subject = $1 \
         ORDER BY pi.id",
    )
    .bind(subject)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PublishedItem::from).collect())
}

/// Returns the most recent `limit` items with their latest snapshot only.
///
/// Unlike category scoring, which aggregates every historical snapshot, this
/// view reflects the current state of each post.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_items_with_latest_engagement(
    pool: &PgPool,
    subject: Option<&str>,
    limit: i64,
) -> Result<Vec<ItemReportRow>, DbError> {
    let rows = sqlx::query_as::<_, ItemReportRow>(
        "SELECT pi.id, c.name AS category_name, sa.platform, sa.account_name, \
                pi.post_reference, pi.published_at, \
                latest.views AS latest_views, latest.likes AS latest_likes, \
                latest.comments AS latest_comments, latest.fetched_at AS latest_fetched_at \
         FROM published_items pi \
         JOIN categories c ON c.id = pi.category_id \
         JOIN social_accounts sa ON sa.id = pi.social_account_id \
         LEFT JOIN LATERAL ( \
             SELECT es.views, es.likes, es.comments, es.fetched_at \
             FROM engagement_snapshots es \
             WHERE es.item_id = pi.id \
             ORDER BY es.fetched_at DESC, es.id DESC \
             LIMIT 1 \
         ) latest ON true \
         WHERE ($1::text IS NULL OR sa.subject = $1) \
         ORDER BY pi.published_at DESC, pi.id DESC \
         LIMIT $2",
    )
    .bind(subject)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
