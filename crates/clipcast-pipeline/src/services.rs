//! Contracts for the external collaborators a run depends on.
//!
//! Every call goes through [`CallPolicy::call`], which bounds it by the
//! configured timeout and aborts it when the run is cancelled.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clipcast_core::{Engagement, SocialAccount};
use tokio_util::sync::CancellationToken;

use crate::error::CollaboratorError;

/// Produces a media artifact from a prompt; returns an artifact reference.
#[async_trait]
pub trait ContentGenerationService: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

/// Produces short text (titles, descriptions) from a prompt.
#[async_trait]
pub trait TextGenerationService: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

/// Publishes an artifact to one account; returns the platform post reference.
#[async_trait]
pub trait PlatformPublisher: Send + Sync {
    async fn publish(
        &self,
        account: &SocialAccount,
        artifact: &str,
        title: &str,
        description: &str,
    ) -> Result<String, CollaboratorError>;
}

/// Reads current engagement counters for a published post.
#[async_trait]
pub trait PlatformMetrics: Send + Sync {
    async fn fetch(&self, post_reference: &str) -> Result<Engagement, CollaboratorError>;
}

/// Engages with comments on a published post. Best-effort.
#[async_trait]
pub trait PlatformCommentBot: Send + Sync {
    async fn interact(
        &self,
        account: &SocialAccount,
        post_reference: &str,
    ) -> Result<(), CollaboratorError>;
}

/// The full set of collaborators one run needs.
#[derive(Clone)]
pub struct Collaborators {
    pub content: Arc<dyn ContentGenerationService>,
    pub text: Arc<dyn TextGenerationService>,
    pub publisher: Arc<dyn PlatformPublisher>,
    pub metrics: Arc<dyn PlatformMetrics>,
    pub comments: Arc<dyn PlatformCommentBot>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Timeout, cancellation and concurrency limits applied to collaborator work.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub concurrency: usize,
    pub cancel: CancellationToken,
}

impl CallPolicy {
    #[must_use]
    pub fn new(timeout: Duration, concurrency: usize, cancel: CancellationToken) -> Self {
        Self {
            timeout,
            concurrency: concurrency.max(1),
            cancel,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs `fut`, failing with [`CollaboratorError::Timeout`] after the
    /// configured timeout or [`CollaboratorError::Cancelled`] as soon as the
    /// run is cancelled.
    ///
    /// # Errors
    ///
    /// Propagates the collaborator's own error unchanged.
    pub async fn call<T, F>(&self, fut: F) -> Result<T, CollaboratorError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(CollaboratorError::Cancelled),
            result = tokio::time::timeout(self.timeout, fut) => match result {
                Ok(inner) => inner,
                Err(_) => Err(CollaboratorError::Timeout(self.timeout)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CallPolicy {
        CallPolicy::new(Duration::from_secs(5), 2, CancellationToken::new())
    }

    #[tokio::test]
    async fn call_passes_through_results() {
        let ok: Result<u8, _> = policy().call(async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<u8, _> = policy()
            .call(async { Err(CollaboratorError::service("test", "boom")) })
            .await;
        assert!(matches!(err, Err(CollaboratorError::Service { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn call_times_out_slow_collaborators() {
        let result: Result<(), _> = policy()
            .call(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(CollaboratorError::Timeout(d)) if d.as_secs() == 5));
    }

    #[tokio::test]
    async fn call_returns_cancelled_once_token_fires() {
        let policy = policy();
        policy.cancel.cancel();
        let result: Result<(), _> = policy.call(std::future::pending()).await;
        assert!(matches!(result, Err(CollaboratorError::Cancelled)));
    }

    #[test]
    fn zero_concurrency_is_clamped_to_one() {
        let policy = CallPolicy::new(Duration::from_secs(1), 0, CancellationToken::new());
        assert_eq!(policy.concurrency, 1);
    }
}
