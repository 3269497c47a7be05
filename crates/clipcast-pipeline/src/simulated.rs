//! Stand-in collaborators used until real platform integrations exist.
//!
//! They produce plausible output without any network access: artifacts are
//! placeholder files, post references are random URLs, and engagement counts
//! are drawn from fixed ranges.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use clipcast_core::{Engagement, SocialAccount};
use rand::Rng;
use uuid::Uuid;

use crate::error::CollaboratorError;
use crate::services::{
    Collaborators, ContentGenerationService, PlatformCommentBot, PlatformMetrics,
    PlatformPublisher, TextGenerationService,
};

impl Collaborators {
    /// Simulated collaborators writing placeholder artifacts to `artifacts_dir`.
    #[must_use]
    pub fn simulated(artifacts_dir: PathBuf) -> Self {
        Self {
            content: Arc::new(SimulatedContentGenerator::new(artifacts_dir)),
            text: Arc::new(SimulatedTextGenerator),
            publisher: Arc::new(SimulatedPublisher),
            metrics: Arc::new(SimulatedMetrics),
            comments: Arc::new(SimulatedCommentBot),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedContentGenerator {
    artifacts_dir: PathBuf,
}

impl SimulatedContentGenerator {
    #[must_use]
    pub fn new(artifacts_dir: PathBuf) -> Self {
        Self { artifacts_dir }
    }
}

#[async_trait]
impl ContentGenerationService for SimulatedContentGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        tokio::fs::create_dir_all(&self.artifacts_dir).await?;

        let file_name = format!(
            "video_{}_{}.mp4",
            Utc::now().format("%Y%m%d%H%M%S"),
            Uuid::new_v4().simple()
        );
        let path = self.artifacts_dir.join(file_name);
        tokio::fs::write(&path, b"placeholder video content").await?;

        tracing::debug!(path = %path.display(), prompt, "wrote simulated artifact");
        Ok(path.display().to_string())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedTextGenerator;

#[async_trait]
impl TextGenerationService for SimulatedTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        Ok(format!("{prompt} - {}", Utc::now().to_rfc3339()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedPublisher;

#[async_trait]
impl PlatformPublisher for SimulatedPublisher {
    async fn publish(
        &self,
        account: &SocialAccount,
        artifact: &str,
        title: &str,
        _description: &str,
    ) -> Result<String, CollaboratorError> {
        let post_reference = format!(
            "https://www.{}.com/post/{}",
            account.platform,
            Uuid::new_v4()
        );
        tracing::debug!(
            account = %account.account_name,
            platform = %account.platform,
            artifact,
            title,
            post_reference,
            "simulated publish"
        );
        Ok(post_reference)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedMetrics;

#[async_trait]
impl PlatformMetrics for SimulatedMetrics {
    async fn fetch(&self, post_reference: &str) -> Result<Engagement, CollaboratorError> {
        let engagement = {
            let mut rng = rand::rng();
            Engagement {
                views: rng.random_range(100..=5000),
                likes: rng.random_range(10..=500),
                comments: rng.random_range(2..=50),
                shares: rng.random_range(1..=20),
            }
        };
        tracing::debug!(post_reference, views = engagement.views, "simulated metrics fetch");
        Ok(engagement)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedCommentBot;

#[async_trait]
impl PlatformCommentBot for SimulatedCommentBot {
    async fn interact(
        &self,
        account: &SocialAccount,
        post_reference: &str,
    ) -> Result<(), CollaboratorError> {
        let replied: u32 = rand::rng().random_range(1..=5);
        tracing::info!(
            account = %account.account_name,
            post_reference,
            replied,
            "replied to comments"
        );
        Ok(())
    }
}
