//! Login flow errors
//!
//! Every failure ends the current login attempt. Nothing here is retried
//! automatically: OAuth state is single-use, so a retry means the user starts
//! a new login.

use devassist_domain::DevAssistError;
use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Result alias for the social login flow
pub type AuthFlowResult<T> = Result<T, AuthFlowError>;

/// Terminal outcome of a failed login attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFlowError {
    /// The authorization window could not be opened
    #[error("popup window was blocked")]
    PopupBlocked,

    /// No result arrived before the popup deadline
    #[error("authorization timed out")]
    AuthTimeout,

    /// The user closed the popup before a result arrived
    #[error("authorization cancelled by user")]
    UserCancelled,

    /// The provider redirected back without a `code` parameter
    #[error("authorization code missing from callback")]
    MissingAuthorizationCode,

    /// The callback `state` did not match the pending CSRF token
    #[error("OAuth state validation failed")]
    CsrfValidationFailed,

    /// The provider returned `error=...` on the callback
    #[error("provider reported an error: {0}")]
    ProviderReportedError(String),

    /// The auth backend rejected the authorization code
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// Another login attempt is still waiting for its popup
    #[error("a login attempt is already in progress")]
    LoginAlreadyInProgress,

    /// Provider name is not supported or not configured
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The system random source failed
    #[error("failed to generate OAuth state: {0}")]
    StateGeneration(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid or incomplete flow configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The message bus was dropped while a request was pending
    #[error("message channel closed")]
    ChannelClosed,
}

impl AuthFlowError {
    /// Text shown on the callback screen and the login form
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::PopupBlocked => {
                "The login window was blocked. Allow popups for this site and try again."
                    .to_string()
            }
            Self::AuthTimeout => "Login timed out. Please try again.".to_string(),
            Self::UserCancelled => "Login was cancelled.".to_string(),
            Self::MissingAuthorizationCode => "Authorization code was not received.".to_string(),
            Self::CsrfValidationFailed => {
                "Security check failed. Please start the login again.".to_string()
            }
            Self::ProviderReportedError(message) | Self::TokenExchangeFailed(message) => {
                message.clone()
            }
            Self::LoginAlreadyInProgress => "A login is already in progress.".to_string(),
            Self::UnknownProvider(name) => format!("Unsupported login provider: {name}"),
            Self::InvalidUrl(_)
            | Self::StateGeneration(_)
            | Self::Serialization(_)
            | Self::Configuration(_)
            | Self::ChannelClosed => "Authorization error. Please try again.".to_string(),
        }
    }
}

impl ErrorClassification for AuthFlowError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UserCancelled | Self::LoginAlreadyInProgress => ErrorSeverity::Info,
            Self::PopupBlocked | Self::AuthTimeout | Self::ProviderReportedError(_) => {
                ErrorSeverity::Warning
            }
            Self::CsrfValidationFailed => ErrorSeverity::Critical,
            Self::MissingAuthorizationCode
            | Self::TokenExchangeFailed(_)
            | Self::UnknownProvider(_)
            | Self::InvalidUrl(_)
            | Self::StateGeneration(_)
            | Self::Serialization(_)
            | Self::Configuration(_)
            | Self::ChannelClosed => ErrorSeverity::Error,
        }
    }
}

impl From<serde_json::Error> for AuthFlowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for AuthFlowError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<DevAssistError> for AuthFlowError {
    fn from(err: DevAssistError) -> Self {
        match err {
            DevAssistError::Network(msg) | DevAssistError::Auth(msg) => {
                Self::TokenExchangeFailed(msg)
            }
            DevAssistError::Security(_) => Self::CsrfValidationFailed,
            other => Self::Configuration(other.to_string()),
        }
    }
}

impl From<AuthFlowError> for DevAssistError {
    fn from(err: AuthFlowError) -> Self {
        match err {
            AuthFlowError::CsrfValidationFailed => Self::Security(err.to_string()),
            AuthFlowError::Configuration(msg) => Self::Config(msg),
            other => Self::Auth(other.to_string()),
        }
    }
}
