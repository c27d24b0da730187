//! Values exchanged between the popup, the callback page and the backend

use chrono::{DateTime, Utc};
use devassist_domain::Provider;
use serde::{Deserialize, Serialize};

/// Authorization code returned by a successful popup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationGrant {
    pub provider: Provider,
    pub code: String,
}

/// Session established by the auth backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    /// User profile as returned by the backend
    pub user: serde_json::Value,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry, when the backend reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Auth backend response body for `POST /auth/oauth/{provider}`
///
/// ```json
/// {"success": true, "user": {...}, "token": "...", "refreshToken": "..."}
/// {"success": false, "error": "Invalid code"}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendAuthResponse {
    pub success: bool,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl BackendAuthResponse {
    /// Convert into a session, or the backend's error message
    ///
    /// # Errors
    /// Returns the backend error text (or a fallback) when `success` is false
    /// or the token is missing.
    pub fn into_session(self, now: DateTime<Utc>) -> Result<AuthSession, String> {
        if !self.success {
            return Err(self.error.unwrap_or_else(|| "Authentication failed".to_string()));
        }
        let token = self.token.ok_or_else(|| "Backend response missing token".to_string())?;
        let expires_at = self.expires_in.map(|secs| now + chrono::Duration::seconds(secs));

        Ok(AuthSession {
            user: self.user.unwrap_or(serde_json::Value::Null),
            token,
            refresh_token: self.refresh_token,
            expires_at,
        })
    }
}
