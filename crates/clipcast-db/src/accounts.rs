//! Database operations for the `social_accounts` table.

use chrono::{DateTime, Utc};
use clipcast_core::{AccountDeclaration, Credentials, Platform, SocialAccount};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::{classify, DbError};

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `social_accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SocialAccountRow {
    pub id: i64,
    pub subject: String,
    pub platform: String,
    pub account_name: String,
    pub credentials: Json<Credentials>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SocialAccountRow> for SocialAccount {
    type Error = DbError;

    fn try_from(row: SocialAccountRow) -> Result<Self, Self::Error> {
        let platform: Platform = row
            .platform
            .parse()
            .map_err(|e: clipcast_core::CoreError| DbError::Decode(e.to_string()))?;
        let credentials = row.credentials.0;
        if credentials.platform() != platform {
            return Err(DbError::Decode(format!(
                "account {} is stored as {platform} but carries {} credentials",
                row.id,
                credentials.platform()
            )));
        }
        Ok(SocialAccount {
            id: row.id,
            subject: row.subject,
            platform,
            account_name: row.account_name,
            credentials,
        })
    }
}

const COLUMNS: &str = "id, subject, platform, account_name, credentials, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Looks up an account by its natural key `(subject, platform, account_name)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Decode`] if the
/// stored credentials do not match the stored platform.
pub async fn find_account(
    pool: &PgPool,
    subject: &str,
    platform: Platform,
    account_name: &str,
) -> Result<Option<SocialAccount>, DbError> {
    let row = sqlx::query_as::<_, SocialAccountRow>(&format!(
        "SELECT {COLUMNS} FROM social_accounts \
         WHERE subject = $1 AND platform = $2 AND account_name = $3"
    ))
    .bind(subject)
    .bind(platform.as_str())
    .bind(account_name)
    .fetch_optional(pool)
    .await?;

    row.map(SocialAccount::try_from).transpose()
}

/// Inserts a declared account for `subject` and returns the stored record.
///
/// # Errors
///
/// Returns [`DbError::Constraint`] if the natural key already exists.
pub async fn insert_account(
    pool: &PgPool,
    subject: &str,
    account: &AccountDeclaration,
) -> Result<SocialAccount, DbError> {
    let row = sqlx::query_as::<_, SocialAccountRow>(&format!(
        "INSERT INTO social_accounts (subject, platform, account_name, credentials) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {COLUMNS}"
    ))
    .bind(subject)
    .bind(account.platform().as_str())
    .bind(&account.account_name)
    .bind(Json(&account.credentials))
    .fetch_one(pool)
    .await
    .map_err(classify)?;

    SocialAccount::try_from(row)
}

/// Overwrites the credentials of an existing account.
///
/// The row, including `updated_at`, is left untouched when the stored
/// credentials already match.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no account has the given `id`.
pub async fn update_account_credentials(
    pool: &PgPool,
    id: i64,
    credentials: &Credentials,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE social_accounts \
         SET credentials = $1, updated_at = NOW() \
         WHERE id = $2 AND credentials IS DISTINCT FROM $1",
    )
    .bind(Json(credentials))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM social_accounts WHERE id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await?;
        if !exists {
            return Err(DbError::NotFound);
        }
    }

    Ok(())
}

/// Returns all accounts of a content vertical, ordered by `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_accounts(pool: &PgPool, subject: &str) -> Result<Vec<SocialAccount>, DbError> {
    let rows = sqlx::query_as::<_, SocialAccountRow>(&format!(
        "SELECT {COLUMNS} FROM social_accounts WHERE subject = $1 ORDER BY id"
    ))
    .bind(subject)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SocialAccount::try_from).collect()
}
