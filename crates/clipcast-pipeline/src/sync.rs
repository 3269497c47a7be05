//! Stage 1: reconcile declared accounts with the store and seed categories.

use clipcast_core::Profile;
use clipcast_db::{DbError, Store};

use crate::error::PipelineError;

/// What the synchronizer changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub accounts_created: usize,
    pub accounts_updated: usize,
    pub categories_seeded: usize,
}

/// Upserts every declared account by `(subject, platform, account_name)`.
///
/// Existing accounts get their credentials overwritten; new ones are
/// inserted. Running twice with the same profile leaves the store unchanged.
///
/// # Errors
///
/// Returns [`PipelineError::AccountSync`] on the first account that cannot be
/// written; later accounts are not attempted.
pub async fn synchronize_accounts(
    store: &dyn Store,
    profile: &Profile,
) -> Result<SyncSummary, PipelineError> {
    let mut summary = SyncSummary::default();
    let subject = profile.subject.as_str();

    for declared in &profile.accounts {
        let platform = declared.platform();
        let name = declared.account_name.as_str();
        let wrap = |source: DbError| PipelineError::AccountSync {
            account: format!("{platform}/{name}"),
            source,
        };

        match store
            .find_account(subject, platform, name)
            .await
            .map_err(wrap)?
        {
            Some(existing) => {
                store
                    .update_account_credentials(existing.id, &declared.credentials)
                    .await
                    .map_err(wrap)?;
                summary.accounts_updated += 1;
                tracing::info!(
                    action = "updated",
                    account_id = existing.id,
                    %platform,
                    account = name,
                    "account synced"
                );
            }
            None => {
                let created = store.insert_account(subject, declared).await.map_err(wrap)?;
                summary.accounts_created += 1;
                tracing::info!(
                    action = "created",
                    account_id = created.id,
                    %platform,
                    account = name,
                    "account synced"
                );
            }
        }
    }

    Ok(summary)
}

/// Seeds the category table when it is empty. Returns how many were added.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] if the store cannot be read or written.
pub async fn ensure_initial_categories(
    store: &dyn Store,
    profile: &Profile,
) -> Result<usize, PipelineError> {
    if store.count_categories().await? > 0 {
        return Ok(0);
    }

    let mut seeded = 0;
    for name in profile.initial_categories() {
        if store.insert_category(&name).await? {
            seeded += 1;
        }
    }

    tracing::info!(seeded, "seeded initial categories");
    Ok(seeded)
}
