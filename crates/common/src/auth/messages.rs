//! Cross-window message contract
//!
//! The callback page reports back to the window that opened it with one of:
//!
//! ```json
//! {"type": "SOCIAL_AUTH_SUCCESS", "payload": {"provider": "google", "code": "...", "state": "..."}}
//! {"type": "SOCIAL_AUTH_ERROR", "error": "User denied access"}
//! {"type": "SOCIAL_AUTH_ERROR", "error": "...", "provider": "vk", "kind": "csrf"}
//! ```
//!
//! `provider` and `kind` are optional; an error without them is a provider
//! error for whichever attempt is pending.
//!
//! [`MessageBus`] stands in for the opener window's `message` event target.
//! Every delivered event carries the sender's origin so listeners can drop
//! anything that did not come from the application itself.

use std::sync::Arc;

use devassist_domain::Provider;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use super::error::AuthFlowError;
use super::traits::OpenerWindow;

/// Events a slow listener may fall behind by before the oldest are dropped
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Typed login result message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthMessage {
    #[serde(rename = "SOCIAL_AUTH_SUCCESS")]
    Success { payload: AuthSuccessPayload },

    #[serde(rename = "SOCIAL_AUTH_ERROR")]
    Error {
        error: String,
        /// Provider whose callback failed, when the route named one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider: Option<Provider>,
        #[serde(default, skip_serializing_if = "AuthErrorKind::is_provider")]
        kind: AuthErrorKind,
    },
}

/// Which check failed on the callback page
///
/// Messages without a `kind` field are provider errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    #[default]
    Provider,
    Csrf,
    MissingCode,
    Invalid,
}

impl AuthErrorKind {
    fn is_provider(&self) -> bool {
        matches!(self, Self::Provider)
    }

    /// Error the opener settles with for a message of this kind
    #[must_use]
    pub fn into_flow_error(self, message: String) -> AuthFlowError {
        match self {
            Self::Provider | Self::Invalid => AuthFlowError::ProviderReportedError(message),
            Self::Csrf => AuthFlowError::CsrfValidationFailed,
            Self::MissingCode => AuthFlowError::MissingAuthorizationCode,
        }
    }
}

impl From<&AuthFlowError> for AuthErrorKind {
    fn from(err: &AuthFlowError) -> Self {
        match err {
            AuthFlowError::CsrfValidationFailed => Self::Csrf,
            AuthFlowError::MissingAuthorizationCode => Self::MissingCode,
            AuthFlowError::ProviderReportedError(_) => Self::Provider,
            _ => Self::Invalid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSuccessPayload {
    pub provider: Provider,
    pub code: String,
    pub state: String,
}

impl AuthMessage {
    #[must_use]
    pub fn success(provider: Provider, code: impl Into<String>, state: impl Into<String>) -> Self {
        Self::Success {
            payload: AuthSuccessPayload { provider, code: code.into(), state: state.into() },
        }
    }

    /// Provider error with no further detail
    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error { error: error.into(), provider: None, kind: AuthErrorKind::Provider }
    }

    /// Error message for a failed callback
    #[must_use]
    pub fn from_error(err: &AuthFlowError, provider: Option<Provider>) -> Self {
        Self::Error { error: err.user_message(), provider, kind: AuthErrorKind::from(err) }
    }

    /// Parse an arbitrary message body, returning `None` for foreign shapes
    #[must_use]
    pub fn parse(data: &Value) -> Option<Self> {
        serde_json::from_value(data.clone()).ok()
    }

    /// JSON body as posted between windows
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// A `message` event as seen by the receiving window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMessage {
    /// Origin of the window that posted the message
    pub origin: String,
    pub data: Value,
}

/// Message event target of the application window
#[derive(Debug, Clone)]
pub struct MessageBus {
    origin: Arc<str>,
    sender: broadcast::Sender<WindowMessage>,
}

impl MessageBus {
    /// Bus for a window served from `origin`
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_capacity(origin, DEFAULT_BUS_CAPACITY)
    }

    /// Bus whose listeners each buffer up to `capacity` undelivered events
    #[must_use]
    pub fn with_capacity(origin: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        let origin: String = origin.into();
        Self { origin: Arc::from(origin), sender }
    }

    /// Origin of the receiving window
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Register a listener; dropping the receiver unregisters it
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WindowMessage> {
        self.sender.subscribe()
    }

    /// Deliver an event to current listeners, returning how many saw it
    pub fn dispatch(&self, message: WindowMessage) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    /// Handle through which a window at `source_origin` posts to this one
    #[must_use]
    pub fn port(&self, source_origin: impl Into<String>) -> MessagePort {
        MessagePort { bus: self.clone(), source_origin: source_origin.into() }
    }
}

/// `window.opener` as seen from a popup
#[derive(Debug, Clone)]
pub struct MessagePort {
    bus: MessageBus,
    source_origin: String,
}

impl OpenerWindow for MessagePort {
    fn post_message(&self, data: Value, target_origin: &str) -> bool {
        if target_origin != "*" && target_origin != self.bus.origin() {
            debug!(
                target_origin = %target_origin,
                opener_origin = %self.bus.origin(),
                "Dropping message for mismatched target origin"
            );
            return false;
        }
        self.bus.dispatch(WindowMessage { origin: self.source_origin.clone(), data });
        true
    }
}
