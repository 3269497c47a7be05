//! Persisted entities shared by the store and the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::{Credentials, Platform};

/// Score assigned to a category without engagement history.
pub const DEFAULT_PRIORITY_SCORE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialAccount {
    pub id: i64,
    pub subject: String,
    pub platform: Platform,
    pub account_name: String,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub priority_score: f64,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedItem {
    pub id: i64,
    pub category_id: i64,
    pub social_account_id: i64,
    pub prompt_used: String,
    pub artifact_path: String,
    pub post_reference: String,
    pub published_at: DateTime<Utc>,
}

/// Fields needed to record one successful per-account publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPublishedItem {
    pub category_id: i64,
    pub social_account_id: i64,
    pub prompt_used: String,
    pub artifact_path: String,
    pub post_reference: String,
}

/// Raw engagement counters as reported by a platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

impl Engagement {
    /// Weighted engagement value used for category ranking.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn weighted(&self) -> f64 {
        self.views as f64 * 0.5
            + self.likes as f64 * 0.3
            + self.comments as f64 * 0.1
            + self.shares as f64 * 0.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementSnapshot {
    pub id: i64,
    pub item_id: i64,
    pub engagement: Engagement,
    pub fetched_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_applies_metric_weights() {
        let e = Engagement {
            views: 100,
            likes: 10,
            comments: 5,
            shares: 5,
        };
        // 50 + 3 + 0.5 + 0.5
        assert!((e.weighted() - 54.0).abs() < 1e-9);
    }

    #[test]
    fn weighted_of_empty_engagement_is_zero() {
        assert!(Engagement::default().weighted().abs() < f64::EPSILON);
    }
}
