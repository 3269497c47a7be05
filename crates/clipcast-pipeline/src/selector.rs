//! Stage 3: pick the category to produce content for.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use clipcast_core::Category;

/// A category used within this many days is deprioritised behind every
/// eligible category, regardless of score.
pub const ELIGIBILITY_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Chosen(Category),
    NoneAvailable,
}

/// Never used, or last used before the eligibility window.
#[must_use]
pub fn is_eligible(category: &Category, now: DateTime<Utc>) -> bool {
    match category.last_used_at {
        None => true,
        Some(used) => used < now - Duration::days(ELIGIBILITY_WINDOW_DAYS),
    }
}

/// Active categories in selection order: eligible first, then score
/// descending, then least recently used (never-used first), then id.
#[must_use]
pub fn rank_categories(categories: &[Category], now: DateTime<Utc>) -> Vec<&Category> {
    let mut ranked: Vec<&Category> = categories.iter().filter(|c| c.is_active).collect();
    ranked.sort_by(|a, b| compare(a, b, now));
    ranked
}

/// The top-ranked active category, or [`Selection::NoneAvailable`].
#[must_use]
pub fn select_category(categories: &[Category], now: DateTime<Utc>) -> Selection {
    rank_categories(categories, now)
        .first()
        .map_or(Selection::NoneAvailable, |c| Selection::Chosen((*c).clone()))
}

fn compare(a: &Category, b: &Category, now: DateTime<Utc>) -> Ordering {
    is_eligible(b, now)
        .cmp(&is_eligible(a, now))
        .then_with(|| b.priority_score.total_cmp(&a.priority_score))
        .then_with(|| a.last_used_at.cmp(&b.last_used_at))
        .then_with(|| a.id.cmp(&b.id))
}
