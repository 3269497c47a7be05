//! The clipcast decision-and-orchestration pipeline.
//!
//! One run syncs a content vertical's accounts, refreshes engagement,
//! re-ranks categories, picks one, generates content for it, fans the
//! content out to every account, and marks the category used. See
//! [`Orchestrator`] for the stage sequence and failure policy.

pub mod error;
pub mod generator;
pub mod metrics;
pub mod orchestrator;
pub mod publisher;
pub mod report;
pub mod scorer;
pub mod selector;
pub mod services;
pub mod simulated;
pub mod state;
pub mod sync;

#[cfg(test)]
pub(crate) mod fakes;

pub use error::{CollaboratorError, PipelineError};
pub use generator::{generate_content, GeneratedContent};
pub use metrics::{collect_metrics, MetricsSummary};
pub use orchestrator::{Orchestrator, RunSettings};
pub use publisher::{publish_to_accounts, PublishJob, PublishOutcome, PublishStatus};
pub use report::{FailureReason, RunOutcome, RunReport};
pub use scorer::{category_score, recalculate_priority_scores, ScoreUpdate};
pub use selector::{is_eligible, rank_categories, select_category, Selection};
pub use services::{
    CallPolicy, Collaborators, ContentGenerationService, PlatformCommentBot, PlatformMetrics,
    PlatformPublisher, TextGenerationService,
};
pub use state::{Stage, StateMachine};
pub use sync::{ensure_initial_categories, synchronize_accounts, SyncSummary};
