//! Social login providers
//!
//! Each provider speaks its own OAuth 2.0 dialect; the defaults here describe
//! the public authorization endpoints and the scopes the application asks for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::OAUTH_STATE_KEY_PREFIX;
use crate::errors::DevAssistError;

/// Supported social login providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Yandex,
    Vk,
}

impl Provider {
    /// All supported providers in display order
    pub const ALL: [Self; 3] = [Self::Google, Self::Yandex, Self::Vk];

    /// Route and wire name, e.g. `/auth/callback/vk`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Yandex => "yandex",
            Self::Vk => "vk",
        }
    }

    /// Human-readable provider name
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Yandex => "Yandex",
            Self::Vk => "VK",
        }
    }

    /// Default authorization endpoint
    #[must_use]
    pub const fn default_authorize_url(self) -> &'static str {
        match self {
            Self::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            Self::Yandex => "https://oauth.yandex.ru/authorize",
            Self::Vk => "https://oauth.vk.com/authorize",
        }
    }

    /// Default scopes requested from the provider
    #[must_use]
    pub fn default_scopes(self) -> Vec<String> {
        let scopes: &[&str] = match self {
            Self::Google => &["openid", "email", "profile"],
            Self::Yandex => &["login:email", "login:info"],
            Self::Vk => &["email"],
        };
        scopes.iter().map(|s| (*s).to_string()).collect()
    }

    /// Separator the provider expects between scopes
    #[must_use]
    pub const fn scope_separator(self) -> &'static str {
        match self {
            Self::Vk => ",",
            Self::Google | Self::Yandex => " ",
        }
    }

    /// Tab-scoped storage key holding this provider's pending CSRF state
    #[must_use]
    pub fn state_storage_key(self) -> String {
        format!("{OAUTH_STATE_KEY_PREFIX}{self}")
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = DevAssistError;

    /// Case-insensitive match on the wire name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DevAssistError::InvalidInput(format!("Unknown provider: {s}")))
    }
}
