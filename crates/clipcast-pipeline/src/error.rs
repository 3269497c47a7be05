use std::time::Duration;

use clipcast_db::DbError;
use thiserror::Error;

use crate::state::Stage;

/// Failure of a single call to an external collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{service} failed: {message}")]
    Service {
        service: &'static str,
        message: String,
    },

    #[error("call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("call cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollaboratorError {
    pub fn service(service: &'static str, message: impl Into<String>) -> Self {
        Self::Service {
            service,
            message: message.into(),
        }
    }
}

/// Stage-level failure. Any of these ends the run in `FAILED`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("failed to sync account '{account}': {source}")]
    AccountSync {
        account: String,
        #[source]
        source: DbError,
    },

    #[error("content generation failed: {0}")]
    Generation(#[source] CollaboratorError),

    #[error("{field} generation failed: {source}")]
    TextGeneration {
        field: &'static str,
        #[source]
        source: CollaboratorError,
    },

    #[error("generated {0} is empty")]
    EmptyOutput(&'static str),

    #[error("no prompt templates to choose from")]
    NoPrompts,

    #[error("no social accounts configured for subject '{0}'")]
    NoAccounts(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("invalid stage transition {from} -> {to}")]
    InvalidTransition { from: Stage, to: Stage },
}

impl PipelineError {
    /// Maps a collaborator failure that aborts the whole stage, keeping
    /// cancellation distinguishable from ordinary errors.
    pub(crate) fn from_generation(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::Cancelled => Self::Cancelled,
            other => Self::Generation(other),
        }
    }

    pub(crate) fn from_text(field: &'static str, err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::Cancelled => Self::Cancelled,
            source => Self::TextGeneration { field, source },
        }
    }
}
