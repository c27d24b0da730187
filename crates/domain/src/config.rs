//! Configuration structures
//!
//! Plain serde models for the social login flow. Loading (environment, files)
//! lives in `devassist-infra`; these types only carry values and defaults.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    CALLBACK_RECOVERY_DELAY_MS, CALLBACK_ROUTE_PREFIX, DEFAULT_LOGIN_ROUTE,
    DEFAULT_SUCCESS_ROUTE, OAUTH_STATE_TTL_SECS, POPUP_CLOSED_POLL_MS, POPUP_HEIGHT,
    POPUP_TIMEOUT_SECS, POPUP_WIDTH, SESSION_POLL_INTERVAL_SECS, SESSION_WARNING_THRESHOLD_SECS,
};
use crate::{DevAssistError, Provider, Result};

/// Top-level configuration for the social login flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Origin the application is served from (e.g. `https://app.devassist.pro`)
    pub app_origin: String,

    /// Base URL of the auth backend that exchanges authorization codes
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Per-provider OAuth client settings
    #[serde(default)]
    pub providers: HashMap<Provider, ProviderConfig>,

    #[serde(default)]
    pub popup: PopupConfig,

    #[serde(default)]
    pub callback: CallbackConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub state: StateConfig,
}

impl AuthConfig {
    /// Create a configuration with defaults and no providers
    #[must_use]
    pub fn new(app_origin: impl Into<String>) -> Self {
        Self {
            app_origin: app_origin.into(),
            api_base_url: None,
            providers: HashMap::new(),
            popup: PopupConfig::default(),
            callback: CallbackConfig::default(),
            session: SessionConfig::default(),
            state: StateConfig::default(),
        }
    }

    /// Register a provider client
    #[must_use]
    pub fn with_provider(mut self, provider: Provider, config: ProviderConfig) -> Self {
        self.providers.insert(provider, config);
        self
    }

    /// Settings for a provider, if configured
    #[must_use]
    pub fn provider(&self, provider: Provider) -> Option<&ProviderConfig> {
        self.providers.get(&provider)
    }

    /// Serialized origin (`scheme://host[:port]`) used for message filtering
    ///
    /// # Errors
    /// Returns `DevAssistError::Config` if `app_origin` is not an absolute
    /// http(s) URL.
    pub fn origin(&self) -> Result<String> {
        let url = Url::parse(&self.app_origin).map_err(|e| {
            DevAssistError::Config(format!("Invalid app origin '{}': {e}", self.app_origin))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DevAssistError::Config(format!(
                "App origin must use http or https: {}",
                self.app_origin
            )));
        }
        Ok(url.origin().ascii_serialization())
    }

    /// Redirect URI registered with the provider
    ///
    /// # Errors
    /// Returns `DevAssistError::Config` if the app origin is invalid.
    pub fn callback_url(&self, provider: Provider) -> Result<String> {
        Ok(format!("{}{CALLBACK_ROUTE_PREFIX}/{provider}", self.origin()?))
    }

    /// Check that the configuration can drive a login
    ///
    /// # Errors
    /// Returns `DevAssistError::Config` for an invalid origin, an empty client
    /// id, or a malformed authorization URL.
    pub fn validate(&self) -> Result<()> {
        self.origin()?;

        for (provider, settings) in &self.providers {
            if settings.client_id.trim().is_empty() {
                return Err(DevAssistError::Config(format!(
                    "Client id for provider '{provider}' is empty"
                )));
            }
            Url::parse(&settings.authorize_url(*provider)).map_err(|e| {
                DevAssistError::Config(format!(
                    "Invalid authorization URL for provider '{provider}': {e}"
                ))
            })?;
        }

        if self.popup.timeout_secs == 0 {
            return Err(DevAssistError::Config("Popup timeout must be positive".to_string()));
        }

        Ok(())
    }
}

/// OAuth client settings for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OAuth client ID
    pub client_id: String,

    /// Override for the authorization endpoint
    #[serde(default)]
    pub authorize_url: Option<String>,

    /// Scopes to request; provider defaults when empty
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Additional query parameters appended to the authorization URL
    #[serde(default)]
    pub extra_params: BTreeMap<String, String>,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            authorize_url: None,
            scopes: Vec::new(),
            extra_params: BTreeMap::new(),
        }
    }

    /// Configured endpoint or the provider default
    #[must_use]
    pub fn authorize_url(&self, provider: Provider) -> String {
        self.authorize_url
            .clone()
            .unwrap_or_else(|| provider.default_authorize_url().to_string())
    }

    /// Configured scopes or the provider defaults
    #[must_use]
    pub fn scopes(&self, provider: Provider) -> Vec<String> {
        if self.scopes.is_empty() {
            provider.default_scopes()
        } else {
            self.scopes.clone()
        }
    }
}

/// Popup window behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    /// Give up waiting for the provider after this many seconds
    pub timeout_secs: u64,
    /// How often to check whether the user closed the popup
    pub closed_poll_ms: u64,
    pub width: u32,
    pub height: u32,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            timeout_secs: POPUP_TIMEOUT_SECS,
            closed_poll_ms: POPUP_CLOSED_POLL_MS,
            width: POPUP_WIDTH,
            height: POPUP_HEIGHT,
        }
    }
}

impl PopupConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn closed_poll_interval(&self) -> Duration {
        Duration::from_millis(self.closed_poll_ms)
    }
}

/// Callback page routing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackConfig {
    /// Recovery route after a failed login
    pub login_route: String,
    /// Route opened after a successful redirect-mode login
    pub success_route: String,
    /// Delay before navigating away from an error screen
    pub recovery_delay_ms: u64,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            success_route: DEFAULT_SUCCESS_ROUTE.to_string(),
            recovery_delay_ms: CALLBACK_RECOVERY_DELAY_MS,
        }
    }
}

impl CallbackConfig {
    #[must_use]
    pub const fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }
}

/// Session expiry tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub poll_interval_secs: u64,
    pub warning_threshold_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: SESSION_POLL_INTERVAL_SECS,
            warning_threshold_secs: SESSION_WARNING_THRESHOLD_SECS,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub const fn warning_threshold(&self) -> Duration {
        Duration::from_secs(self.warning_threshold_secs)
    }
}

/// CSRF state lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub ttl_secs: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self { ttl_secs: OAUTH_STATE_TTL_SECS }
    }
}

impl StateConfig {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
