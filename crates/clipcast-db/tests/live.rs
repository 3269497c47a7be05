//! Live integration tests for clipcast-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. They need `DATABASE_URL` pointing at a server the
//! harness can create databases on, so they are ignored by default:
//! `cargo test -p clipcast-db -- --ignored`.

use chrono::{DateTime, Duration, Utc};
use clipcast_core::{AccountDeclaration, Credentials, Engagement, NewPublishedItem, Platform};
use clipcast_db::{
    begin_pipeline_run, count_categories, find_account, finish_pipeline_run, insert_account,
    insert_category, insert_engagement_snapshot, insert_published_item, list_accounts,
    list_active_categories, list_category_engagement, list_published_items,
    list_recent_items_with_latest_engagement, mark_category_used, update_account_credentials,
    update_priority_score, DbError, RunCompletion, RunStatus,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn youtube(name: &str, token: &str) -> AccountDeclaration {
    AccountDeclaration {
        account_name: name.to_string(),
        credentials: Credentials::Youtube {
            api_key: "key".to_string(),
            oauth_token: token.to_string(),
        },
    }
}

async fn account_updated_at(pool: &sqlx::PgPool, id: i64) -> DateTime<Utc> {
    sqlx::query_scalar("SELECT updated_at FROM social_accounts WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("updated_at lookup failed")
}

async fn insert_test_category(pool: &sqlx::PgPool, name: &str, is_active: bool) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO categories (name, is_active) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(is_active)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_test_category failed for '{name}': {e}"))
}

fn completion(status: RunStatus) -> RunCompletion {
    RunCompletion {
        status,
        stage: "finalized".to_string(),
        category_id: None,
        published_count: 2,
        failed_count: 1,
        error_message: None,
    }
}

// ---------------------------------------------------------------------------
// Section 1: Accounts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn account_insert_find_and_update(pool: sqlx::PgPool) {
    let created = insert_account(&pool, "finance", &youtube("Finance in Focus", "t1"))
        .await
        .expect("insert_account failed");
    assert_eq!(created.platform, Platform::Youtube);

    let found = find_account(&pool, "finance", Platform::Youtube, "Finance in Focus")
        .await
        .expect("find_account failed")
        .expect("account should exist");
    assert_eq!(found.id, created.id);

    let new_creds = Credentials::Youtube {
        api_key: "key".to_string(),
        oauth_token: "t2".to_string(),
    };
    update_account_credentials(&pool, created.id, &new_creds)
        .await
        .expect("update failed");

    let accounts = list_accounts(&pool, "finance").await.expect("list failed");
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].credentials, new_creds);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn unchanged_credentials_leave_the_row_untouched(pool: sqlx::PgPool) {
    let created = insert_account(&pool, "finance", &youtube("Finance in Focus", "t1"))
        .await
        .expect("insert_account failed");
    let same = youtube("Finance in Focus", "t1").credentials;

    let before = account_updated_at(&pool, created.id).await;
    update_account_credentials(&pool, created.id, &same)
        .await
        .expect("first no-op update failed");
    update_account_credentials(&pool, created.id, &same)
        .await
        .expect("second no-op update failed");
    assert_eq!(account_updated_at(&pool, created.id).await, before);

    let err = update_account_credentials(&pool, created.id + 1000, &same)
        .await
        .expect_err("unknown id should fail");
    assert!(matches!(err, DbError::NotFound), "got {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_account_is_a_constraint_violation(pool: sqlx::PgPool) {
    insert_account(&pool, "finance", &youtube("Finance in Focus", "t1"))
        .await
        .expect("first insert failed");
    let err = insert_account(&pool, "finance", &youtube("Finance in Focus", "t1"))
        .await
        .expect_err("second insert should fail");
    assert!(matches!(err, DbError::Constraint(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Section 2: Categories
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn insert_category_is_idempotent_by_name(pool: sqlx::PgPool) {
    assert!(insert_category(&pool, "Quick Finance Tips").await.unwrap());
    assert!(!insert_category(&pool, "Quick Finance Tips").await.unwrap());
    assert_eq!(count_categories(&pool).await.unwrap(), 1);

    let active = list_active_categories(&pool).await.unwrap();
    assert_eq!(active.len(), 1);
    assert!((active[0].priority_score - 1.0).abs() < f64::EPSILON);
    assert!(active[0].last_used_at.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn priority_score_ignores_inactive_categories(pool: sqlx::PgPool) {
    let active = insert_test_category(&pool, "Active", true).await;
    let inactive = insert_test_category(&pool, "Inactive", false).await;

    assert!(update_priority_score(&pool, active, 42.5).await.unwrap());
    assert!(!update_priority_score(&pool, inactive, 42.5).await.unwrap());

    let score: f64 =
        sqlx::query_scalar("SELECT priority_score FROM categories WHERE id = $1")
            .bind(inactive)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!((score - 1.0).abs() < f64::EPSILON);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn mark_category_used_is_monotonic(pool: sqlx::PgPool) {
    let id = insert_test_category(&pool, "Index Funds", true).await;
    let later = Utc::now();
    mark_category_used(&pool, id, later).await.unwrap();
    mark_category_used(&pool, id, later - Duration::days(3))
        .await
        .unwrap();

    let stored = list_active_categories(&pool).await.unwrap()[0]
        .last_used_at
        .expect("last_used_at should be set");
    assert!((stored - later).num_milliseconds().abs() < 1);
}

// ---------------------------------------------------------------------------
// Section 3: Items and engagement
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn snapshots_append_and_report_shows_latest(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Index Funds", true).await;
    let account = insert_account(&pool, "finance", &youtube("Finance in Focus", "t"))
        .await
        .unwrap();
    let item = insert_published_item(
        &pool,
        &NewPublishedItem {
            category_id: category,
            social_account_id: account.id,
            prompt_used: "prompt".to_string(),
            artifact_path: "video.mp4".to_string(),
            post_reference: "https://www.youtube.com/post/1".to_string(),
        },
    )
    .await
    .unwrap();

    for views in [100, 250] {
        insert_engagement_snapshot(
            &pool,
            item.id,
            Engagement {
                views,
                likes: 10,
                comments: 2,
                shares: 1,
            },
        )
        .await
        .unwrap();
    }

    assert_eq!(list_published_items(&pool, "finance").await.unwrap().len(), 1);
    assert!(list_published_items(&pool, "fitness").await.unwrap().is_empty());
    assert_eq!(list_category_engagement(&pool, category).await.unwrap().len(), 2);

    let report = list_recent_items_with_latest_engagement(&pool, Some("finance"), 10)
        .await
        .unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].latest_views, Some(250));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn snapshot_for_missing_item_is_a_constraint_violation(pool: sqlx::PgPool) {
    let err = insert_engagement_snapshot(&pool, 9999, Engagement::default())
        .await
        .expect_err("insert should fail");
    assert!(matches!(err, DbError::Constraint(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Section 4: Run lease
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn run_lease_is_exclusive_per_subject(pool: sqlx::PgPool) {
    let run = begin_pipeline_run(&pool, "finance", 3600).await.unwrap();
    assert_eq!(run.status, "running");

    let err = begin_pipeline_run(&pool, "finance", 3600)
        .await
        .expect_err("second lease should fail");
    assert!(matches!(err, DbError::RunInProgress(_)));

    finish_pipeline_run(&pool, run.id, &completion(RunStatus::Finalized))
        .await
        .unwrap();
    assert!(begin_pipeline_run(&pool, "finance", 3600).await.is_ok());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn stale_run_lease_is_reclaimed(pool: sqlx::PgPool) {
    let stale = begin_pipeline_run(&pool, "finance", 3600).await.unwrap();
    sqlx::query("UPDATE pipeline_runs SET started_at = NOW() - INTERVAL '3 hours' WHERE id = $1")
        .bind(stale.id)
        .execute(&pool)
        .await
        .unwrap();

    let fresh = begin_pipeline_run(&pool, "finance", 3600).await.unwrap();
    assert_ne!(fresh.id, stale.id);

    let err = finish_pipeline_run(&pool, stale.id, &completion(RunStatus::Finalized))
        .await
        .expect_err("abandoned run cannot be finished");
    assert!(matches!(err, DbError::InvalidRunTransition { .. }));
}
