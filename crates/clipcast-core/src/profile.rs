use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::accounts::AccountDeclaration;
use crate::ConfigError;

/// Placeholder substituted with the selected category name.
pub const TOPIC_PLACEHOLDER: &str = "[DYNAMIC_TOPIC]";

/// A content-vertical profile: the subject, its accounts, and the prompt
/// templates used to generate content for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub subject: String,
    #[serde(default)]
    pub accounts: Vec<AccountDeclaration>,
    pub prompts: Vec<String>,
    /// Categories to seed when the category table is empty. Falls back to
    /// [`Profile::default_categories`] when omitted.
    #[serde(default)]
    pub seed_categories: Vec<String>,
}

impl Profile {
    /// Category names to seed on an empty category table.
    #[must_use]
    pub fn initial_categories(&self) -> Vec<String> {
        if self.seed_categories.is_empty() {
            self.default_categories()
        } else {
            self.seed_categories.clone()
        }
    }

    /// Generic starter categories derived from the subject name.
    #[must_use]
    pub fn default_categories(&self) -> Vec<String> {
        let s = capitalize(self.subject.trim());
        vec![
            format!("Quick {s} Tips"),
            format!("{s} Market Analysis"),
            format!("Breaking News in {s}"),
            format!("{s} for Beginners"),
            format!("Myths and Facts about {s}"),
        ]
    }
}

/// Substitute `topic` for every [`TOPIC_PLACEHOLDER`] in `template`.
#[must_use]
pub fn render_prompt(template: &str, topic: &str) -> String {
    template.replace(TOPIC_PLACEHOLDER, topic)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Load and validate a content-vertical profile from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_profile(path: &Path) -> Result<Profile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ProfileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let profile: Profile = serde_yaml::from_str(&content)?;

    validate_profile(&profile)?;

    Ok(profile)
}

fn validate_profile(profile: &Profile) -> Result<(), ConfigError> {
    if profile.subject.trim().is_empty() {
        return Err(ConfigError::Validation(
            "subject must be non-empty".to_string(),
        ));
    }

    if profile.prompts.is_empty() {
        return Err(ConfigError::Validation(
            "at least one prompt template is required".to_string(),
        ));
    }

    for (idx, prompt) in profile.prompts.iter().enumerate() {
        if !prompt.contains(TOPIC_PLACEHOLDER) {
            return Err(ConfigError::Validation(format!(
                "prompt #{} does not contain the {TOPIC_PLACEHOLDER} placeholder",
                idx + 1
            )));
        }
    }

    let mut seen_accounts = HashSet::new();
    for account in &profile.accounts {
        if account.account_name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} account name must be non-empty",
                account.platform()
            )));
        }
        if !seen_accounts.insert((account.platform(), account.account_name.as_str())) {
            return Err(ConfigError::Validation(format!(
                "duplicate account: '{}' on {}",
                account.account_name,
                account.platform()
            )));
        }
    }

    let mut seen_categories = HashSet::new();
    for name in &profile.seed_categories {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "seed category names must be non-empty".to_string(),
            ));
        }
        if !seen_categories.insert(name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate seed category: '{name}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
