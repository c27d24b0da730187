//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for DevAssist
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DevAssistError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for DevAssist operations
pub type Result<T> = std::result::Result<T, DevAssistError>;

impl From<serde_json::Error> for DevAssistError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON error: {err}"))
    }
}

impl From<url::ParseError> for DevAssistError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidInput(format!("Invalid URL: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DevAssistError::Config("missing client id".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing client id");
    }

    #[test]
    fn test_error_serializes_with_tag() {
        let err = DevAssistError::Auth("denied".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "Auth");
        assert_eq!(json["message"], "denied");
    }

    #[test]
    fn test_url_error_conversion() {
        let err: DevAssistError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, DevAssistError::InvalidInput(_)));
    }
}
