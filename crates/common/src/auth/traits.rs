//! Seams between the login flow and its host environment
//!
//! These traits abstract the browsing-context operations the flow depends on
//! (opening windows, posting to the opener, in-app navigation) and the
//! application collaborators it calls into (session context, auth backend).
//! Production hosts implement them over their runtime; tests use the doubles
//! in [`crate::testing::mocks`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devassist_domain::{PopupConfig, Provider};
use serde_json::Value;
use url::Url;

use super::error::AuthFlowResult;
use super::types::AuthSession;

/// Geometry of the authorization popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupFeatures {
    pub width: u32,
    pub height: u32,
    pub left: Option<u32>,
    pub top: Option<u32>,
}

impl PopupFeatures {
    #[must_use]
    pub const fn from_config(config: &PopupConfig) -> Self {
        Self { width: config.width, height: config.height, left: None, top: None }
    }

    /// Center the popup on a screen of the given size
    #[must_use]
    pub const fn centered_on(mut self, screen_width: u32, screen_height: u32) -> Self {
        self.left = Some(screen_width.saturating_sub(self.width) / 2);
        self.top = Some(screen_height.saturating_sub(self.height) / 2);
        self
    }

    /// `window.open` feature string
    #[must_use]
    pub fn to_feature_string(&self) -> String {
        let mut parts = vec![format!("width={}", self.width), format!("height={}", self.height)];
        if let Some(left) = self.left {
            parts.push(format!("left={left}"));
        }
        if let Some(top) = self.top {
            parts.push(format!("top={top}"));
        }
        parts.push("scrollbars=yes".to_string());
        parts.push("resizable=yes".to_string());
        parts.join(",")
    }
}

/// Opens new browsing contexts
pub trait WindowOpener: Send + Sync {
    /// Open `url` in a new window; `None` means the popup was blocked
    fn open(&self, url: &Url, name: &str, features: &PopupFeatures)
        -> Option<Arc<dyn PopupWindow>>;

    /// Available screen size for centering, if known
    fn screen_size(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Handle to an opened window
pub trait PopupWindow: Send + Sync {
    fn is_closed(&self) -> bool;

    fn close(&self);
}

/// The window that opened the current one
pub trait OpenerWindow: Send + Sync {
    /// Post `data` to the opener if its origin matches `target_origin`
    ///
    /// Returns `false` when the message was dropped.
    fn post_message(&self, data: Value, target_origin: &str) -> bool;
}

/// In-app router
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Application auth context consulted by the session timer
#[async_trait]
pub trait SessionContext: Send + Sync {
    /// Expiry of the current session, `None` when logged out
    async fn expires_at(&self) -> Option<DateTime<Utc>>;

    /// Refresh the session and return its new expiry
    ///
    /// # Errors
    /// Returns an error if the refresh was rejected.
    async fn refresh(&self) -> AuthFlowResult<DateTime<Utc>>;

    /// Drop the session
    async fn logout(&self);
}

/// Exchanges authorization codes for sessions
///
/// Token exchange happens server side; implementations only forward
/// `{provider, code}`.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// # Errors
    /// Returns `TokenExchangeFailed` if the backend rejects the code or is
    /// unreachable.
    async fn exchange_code(&self, provider: Provider, code: &str) -> AuthFlowResult<AuthSession>;
}
