use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// `None` only for dry runs, which never touch Postgres.
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub artifacts_dir: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub publish_concurrency: usize,
    pub metrics_concurrency: usize,
    pub collaborator_timeout_secs: u64,
    pub stale_run_after_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("artifacts_dir", &self.artifacts_dir)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("publish_concurrency", &self.publish_concurrency)
            .field("metrics_concurrency", &self.metrics_concurrency)
            .field("collaborator_timeout_secs", &self.collaborator_timeout_secs)
            .field("stale_run_after_secs", &self.stale_run_after_secs)
            .finish()
    }
}
