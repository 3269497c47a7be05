//! Read-only report handlers.

use chrono::{DateTime, Utc};
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum ReportCommands {
    /// Categories ranked by priority score
    Categories,
    /// Recently published items with their latest engagement
    Items {
        /// Only items published by this subject's accounts
        #[arg(long)]
        subject: Option<String>,
        /// Maximum number of items to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Recent pipeline runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

fn fmt_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "\u{2014}".to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn fmt_count(count: Option<i64>) -> String {
    count.map_or_else(|| "\u{2014}".to_string(), |c| c.to_string())
}

/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_report_categories(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let categories = clipcast_db::list_categories(pool).await?;

    if categories.is_empty() {
        println!("no categories found; run a pipeline first to seed them");
        return Ok(());
    }

    println!("{:<6}{:<40}{:>10}  {:<8}LAST USED", "ID", "NAME", "SCORE", "ACTIVE");
    for category in &categories {
        println!(
            "{:<6}{:<40}{:>10.2}  {:<8}{}",
            category.id,
            category.name,
            category.priority_score,
            if category.is_active { "yes" } else { "no" },
            fmt_time(category.last_used_at)
        );
    }

    Ok(())
}

/// Shows recent items with the counters of their latest snapshot only.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_report_items(
    pool: &sqlx::PgPool,
    subject: Option<&str>,
    limit: i64,
) -> anyhow::Result<()> {
    let items =
        clipcast_db::list_recent_items_with_latest_engagement(pool, subject, limit).await?;

    if items.is_empty() {
        println!(
            "no published items found{}",
            subject
                .map(|s| format!(" for subject '{s}'"))
                .unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "{:<18}{:<11}{:<24}{:<30}{:>8}{:>7}{:>9}  POST",
        "PUBLISHED", "PLATFORM", "ACCOUNT", "CATEGORY", "VIEWS", "LIKES", "COMMENTS"
    );
    for item in &items {
        println!(
            "{:<18}{:<11}{:<24}{:<30}{:>8}{:>7}{:>9}  {}",
            fmt_time(Some(item.published_at)),
            item.platform,
            item.account_name,
            item.category_name,
            fmt_count(item.latest_views),
            fmt_count(item.latest_likes),
            fmt_count(item.latest_comments),
            item.post_reference
        );
    }

    Ok(())
}

/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_report_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = clipcast_db::list_pipeline_runs(pool, limit).await?;

    if runs.is_empty() {
        println!("no pipeline runs recorded");
        return Ok(());
    }

    println!(
        "{:<18}{:<16}{:<11}{:<11}{:>5}{:>7}  ERROR",
        "STARTED", "SUBJECT", "STATUS", "STAGE", "OK", "FAILED"
    );
    for run in &runs {
        println!(
            "{:<18}{:<16}{:<11}{:<11}{:>5}{:>7}  {}",
            fmt_time(Some(run.started_at)),
            run.subject,
            run.status,
            run.stage,
            run.published_count,
            run.failed_count,
            run.error_message.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
