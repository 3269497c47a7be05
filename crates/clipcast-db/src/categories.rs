//! Database operations for the `categories` table.

use chrono::{DateTime, Utc};
use clipcast_core::Category;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `categories` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub priority_score: f64,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            priority_score: row.priority_score,
            is_active: row.is_active,
            last_used_at: row.last_used_at,
        }
    }
}

/// Counts every category, active or not.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_categories(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Inserts an active category with the default score unless the name is
/// already taken. Returns `true` when a row was inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_category(pool: &PgPool, name: &str) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO categories (name) VALUES ($1) \
         ON CONFLICT (name) DO NOTHING",
    )
    .bind(name)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns all active categories ordered by `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_categories(pool: &PgPool) -> Result<Vec<Category>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, priority_score, is_active, last_used_at, created_at \
         FROM categories \
         WHERE is_active = true \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Category::from).collect())
}

/// Returns every category, highest score first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, priority_score, is_active, last_used_at, created_at \
         FROM categories \
         ORDER BY priority_score DESC, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Writes a recomputed score. Inactive categories are left untouched; the
/// return value says whether a row was updated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_priority_score(
    pool: &PgPool,
    category_id: i64,
    score: f64,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE categories SET priority_score = $1 \
         WHERE id = $2 AND is_active = true",
    )
    .bind(score)
    .bind(category_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Advances `last_used_at` to `used_at`. `GREATEST` keeps the column
/// monotonic when a later timestamp is already stored.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the category does not exist.
pub async fn mark_category_used(
    pool: &PgPool,
    category_id: i64,
    used_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE categories SET last_used_at = GREATEST(last_used_at, $1) \
         WHERE id = $2",
    )
    .bind(used_at)
    .bind(category_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
