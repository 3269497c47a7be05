use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Tiktok,
    Instagram,
    Facebook,
}

impl Platform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(Platform::Youtube),
            "tiktok" => Ok(Platform::Tiktok),
            "instagram" => Ok(Platform::Instagram),
            "facebook" => Ok(Platform::Facebook),
            other => Err(CoreError::UnknownPlatform(other.to_string())),
        }
    }
}

/// Platform-specific API credentials.
///
/// Tagged by `platform` so each variant carries only the fields that
/// platform's API needs. Serialized the same way into the `credentials`
/// JSONB column.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum Credentials {
    Youtube {
        api_key: String,
        oauth_token: String,
    },
    Tiktok {
        access_token: String,
    },
    Instagram {
        username: String,
        password: String,
    },
    Facebook {
        page_id: String,
        user_access_token: String,
    },
}

impl Credentials {
    #[must_use]
    pub fn platform(&self) -> Platform {
        match self {
            Credentials::Youtube { .. } => Platform::Youtube,
            Credentials::Tiktok { .. } => Platform::Tiktok,
            Credentials::Instagram { .. } => Platform::Instagram,
            Credentials::Facebook { .. } => Platform::Facebook,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Youtube { .. } => f
                .debug_struct("Youtube")
                .field("api_key", &"[redacted]")
                .field("oauth_token", &"[redacted]")
                .finish(),
            Credentials::Tiktok { .. } => f
                .debug_struct("Tiktok")
                .field("access_token", &"[redacted]")
                .finish(),
            Credentials::Instagram { username, .. } => f
                .debug_struct("Instagram")
                .field("username", username)
                .field("password", &"[redacted]")
                .finish(),
            Credentials::Facebook { page_id, .. } => f
                .debug_struct("Facebook")
                .field("page_id", page_id)
                .field("user_access_token", &"[redacted]")
                .finish(),
        }
    }
}

/// A social account as declared in a content-vertical profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDeclaration {
    pub account_name: String,
    pub credentials: Credentials,
}

impl AccountDeclaration {
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.credentials.platform()
    }
}
