//! Domain types, profile loading, and configuration for clipcast.

pub mod accounts;
pub mod app_config;
pub mod config;
pub mod models;
pub mod profile;

pub use accounts::{AccountDeclaration, Credentials, Platform};
pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, MAX_STALE_RUN_AFTER_SECS};
pub use models::{
    Category, Engagement, EngagementSnapshot, NewPublishedItem, PublishedItem, SocialAccount,
    DEFAULT_PRIORITY_SCORE,
};
pub use profile::{load_profile, render_prompt, Profile, TOPIC_PLACEHOLDER};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read profile {path}: {source}")]
    ProfileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile: {0}")]
    ProfileParse(#[from] serde_yaml::Error),

    #[error("invalid profile: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}
