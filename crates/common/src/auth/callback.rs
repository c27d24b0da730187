//! Callback receiver
//!
//! Runs at `/auth/callback/{provider}`, interprets the provider's redirect
//! and hands the result to whoever started the login. With an opener window
//! the result is posted back to it ([`OpenerDelivery`]); after a full-page
//! redirect it is stored for the next page and the app navigates on
//! ([`RedirectDelivery`]).
//!
//! Decision order:
//! 1. `error` present: provider-reported failure, state is not checked
//! 2. `code` missing: `MissingAuthorizationCode`
//! 3. `state` must verify against the pending CSRF token

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use devassist_domain::constants::{CALLBACK_ROUTE_PREFIX, SOCIAL_AUTH_RESULT_KEY};
use devassist_domain::{CallbackConfig, Provider};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info, warn};
use url::Url;

use super::error::{AuthFlowError, AuthFlowResult};
use super::messages::AuthMessage;
use super::state::OAuthStateStore;
use super::storage::SessionStorage;
use super::traits::{Navigator, OpenerWindow, PopupWindow};

const FALLBACK_PROVIDER_ERROR: &str = "Authorization error";

/// Query parameters of a provider redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub provider: Provider,
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse an absolute URL or an app-relative location
    ///
    /// # Errors
    /// - `InvalidUrl` if the location is not a callback route
    /// - `UnknownProvider` if the path names an unsupported provider
    pub fn parse(location: &str) -> AuthFlowResult<Self> {
        let url = match Url::parse(location) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse("http://localhost/")?.join(location)?
            }
            Err(err) => return Err(err.into()),
        };
        Self::from_url(&url)
    }

    /// # Errors
    /// See [`CallbackParams::parse`].
    pub fn from_url(url: &Url) -> AuthFlowResult<Self> {
        let name = url
            .path()
            .strip_prefix(CALLBACK_ROUTE_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|rest| rest.trim_end_matches('/'))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .ok_or_else(|| AuthFlowError::InvalidUrl(format!("not a callback route: {}", url.path())))?;

        let provider =
            Provider::from_str(name).map_err(|_| AuthFlowError::UnknownProvider(name.to_string()))?;

        let mut params = Self {
            provider,
            code: None,
            state: None,
            error: None,
            error_description: None,
        };
        for (key, value) in url.query_pairs() {
            let slot = match &*key {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }
        Ok(params)
    }
}

/// Validated callback result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackSuccess {
    pub provider: Provider,
    pub code: String,
    pub state: String,
}

/// What the callback page concluded, ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackOutcome {
    /// Provider from the route, if it could be parsed
    pub provider: Option<Provider>,
    /// `state` parameter as received, even when invalid
    pub state: Option<String>,
    pub result: AuthFlowResult<CallbackSuccess>,
}

/// Status shown by the callback screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum CallbackStatus {
    Loading,
    Success(String),
    Error(String),
}

/// Hands a callback outcome back to the application
#[async_trait]
pub trait CallbackDelivery: Send + Sync {
    /// # Errors
    /// Returns an error if the outcome could not be handed off.
    async fn deliver(&self, outcome: &CallbackOutcome) -> AuthFlowResult<()>;
}

/// Popup mode: post the result to the opener and close the popup
pub struct OpenerDelivery {
    opener: Arc<dyn OpenerWindow>,
    this_window: Arc<dyn PopupWindow>,
    target_origin: String,
}

impl OpenerDelivery {
    pub fn new(
        opener: Arc<dyn OpenerWindow>,
        this_window: Arc<dyn PopupWindow>,
        target_origin: impl Into<String>,
    ) -> Self {
        Self { opener, this_window, target_origin: target_origin.into() }
    }
}

#[async_trait]
impl CallbackDelivery for OpenerDelivery {
    async fn deliver(&self, outcome: &CallbackOutcome) -> AuthFlowResult<()> {
        let message = match &outcome.result {
            Ok(success) => {
                AuthMessage::success(success.provider, success.code.clone(), success.state.clone())
            }
            Err(err) => AuthMessage::from_error(err, outcome.provider),
        };

        if !self.opener.post_message(message.to_value()?, &self.target_origin) {
            warn!(target_origin = %self.target_origin, "Opener did not accept login result");
        }
        self.this_window.close();
        Ok(())
    }
}

/// Result persisted for the page after a full-page redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCallbackResult {
    pub provider: Option<Provider>,
    #[serde(flatten)]
    pub outcome: StoredOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StoredOutcome {
    Success { code: String },
    Error { message: String },
}

/// Redirect mode: persist the result and navigate within the app
pub struct RedirectDelivery {
    storage: Arc<dyn SessionStorage>,
    navigator: Arc<dyn Navigator>,
    config: CallbackConfig,
}

impl RedirectDelivery {
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
        config: CallbackConfig,
    ) -> Self {
        Self { storage, navigator, config }
    }

    /// Read and delete the stored result
    pub fn take_result(storage: &dyn SessionStorage) -> Option<StoredCallbackResult> {
        let raw = storage.remove(SOCIAL_AUTH_RESULT_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(error = %err, "Discarding unreadable social login result");
                None
            }
        }
    }

    fn recovery_delay(&self) -> Duration {
        self.config.recovery_delay()
    }
}

#[async_trait]
impl CallbackDelivery for RedirectDelivery {
    async fn deliver(&self, outcome: &CallbackOutcome) -> AuthFlowResult<()> {
        let stored = StoredCallbackResult {
            provider: outcome.provider,
            outcome: match &outcome.result {
                Ok(success) => StoredOutcome::Success { code: success.code.clone() },
                Err(err) => StoredOutcome::Error { message: err.user_message() },
            },
        };
        self.storage.set(SOCIAL_AUTH_RESULT_KEY, serde_json::to_string(&stored)?);

        if outcome.result.is_ok() {
            self.navigator.navigate(&self.config.success_route);
        } else {
            tokio::time::sleep(self.recovery_delay()).await;
            self.navigator.navigate(&self.config.login_route);
        }
        Ok(())
    }
}

/// Interprets provider redirects and publishes the screen status
pub struct CallbackReceiver {
    states: Arc<OAuthStateStore>,
    delivery: Arc<dyn CallbackDelivery>,
    status: watch::Sender<CallbackStatus>,
}

impl CallbackReceiver {
    pub fn new(states: Arc<OAuthStateStore>, delivery: Arc<dyn CallbackDelivery>) -> Self {
        let (status, _) = watch::channel(CallbackStatus::Loading);
        Self { states, delivery, status }
    }

    /// Pick the delivery adapter by whether an opener exists
    pub fn for_window(
        states: Arc<OAuthStateStore>,
        opener: Option<OpenerDelivery>,
        redirect: RedirectDelivery,
    ) -> Self {
        let delivery: Arc<dyn CallbackDelivery> = match opener {
            Some(opener) => Arc::new(opener),
            None => Arc::new(redirect),
        };
        Self::new(states, delivery)
    }

    #[must_use]
    pub fn status(&self) -> watch::Receiver<CallbackStatus> {
        self.status.subscribe()
    }

    #[must_use]
    pub fn current_status(&self) -> CallbackStatus {
        self.status.borrow().clone()
    }

    /// Validate callback parameters against the pending state
    ///
    /// # Errors
    /// `ProviderReportedError`, `MissingAuthorizationCode` or
    /// `CsrfValidationFailed`, in that order of precedence.
    pub fn process(&self, params: &CallbackParams) -> AuthFlowResult<CallbackSuccess> {
        if let Some(error) = &params.error {
            let message = params
                .error_description
                .clone()
                .unwrap_or_else(|| FALLBACK_PROVIDER_ERROR.to_string());
            warn!(provider = %params.provider, error = %error, "Provider reported an error");
            return Err(AuthFlowError::ProviderReportedError(message));
        }

        let code = params.code.clone().ok_or(AuthFlowError::MissingAuthorizationCode)?;
        let state = params.state.clone().unwrap_or_default();
        self.states.validate(params.provider, &state)?;

        Ok(CallbackSuccess { provider: params.provider, code, state })
    }

    /// Handle the page at `location` end to end
    ///
    /// Returns the outcome after it has been delivered.
    ///
    /// # Errors
    /// Returns an error only if delivery itself failed.
    pub async fn handle(&self, location: &str) -> AuthFlowResult<CallbackOutcome> {
        self.status.send_replace(CallbackStatus::Loading);

        let outcome = match CallbackParams::parse(location) {
            Ok(params) => CallbackOutcome {
                provider: Some(params.provider),
                state: params.state.clone(),
                result: self.process(&params),
            },
            Err(err) => CallbackOutcome { provider: None, state: None, result: Err(err) },
        };

        let status = match &outcome.result {
            Ok(success) => {
                info!(provider = %success.provider, "Social login callback succeeded");
                CallbackStatus::Success(format!(
                    "Signed in with {}. Redirecting...",
                    success.provider.display_name()
                ))
            }
            Err(err) => {
                warn!(error = %err, "Social login callback failed");
                CallbackStatus::Error(err.user_message())
            }
        };
        self.status.send_replace(status);

        if let Err(err) = self.delivery.deliver(&outcome).await {
            error!(error = %err, "Failed to deliver login result");
            self.status.send_replace(CallbackStatus::Error(err.user_message()));
            return Err(err);
        }
        Ok(outcome)
    }
}
