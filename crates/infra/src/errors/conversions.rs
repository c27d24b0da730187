//! Conversions from external infrastructure errors into domain errors.

use devassist_domain::DevAssistError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DevAssistError);

impl From<InfraError> for DevAssistError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DevAssistError> for InfraError {
    fn from(value: DevAssistError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoDevAssistError {
    fn into_devassist(self) -> DevAssistError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → DevAssistError */
/* -------------------------------------------------------------------------- */

impl IntoDevAssistError for HttpError {
    fn into_devassist(self) -> DevAssistError {
        if self.is_timeout() {
            return DevAssistError::Network("HTTP request timed out".into());
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return DevAssistError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return DevAssistError::InvalidInput(format!("HTTP response body invalid: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
            return match code {
                401 | 403 => DevAssistError::Auth(message),
                404 => DevAssistError::NotFound(message),
                400..=499 => DevAssistError::InvalidInput(message),
                _ => DevAssistError::Network(message),
            };
        }

        DevAssistError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_devassist())
    }
}

/* -------------------------------------------------------------------------- */
/* config file errors → DevAssistError */
/* -------------------------------------------------------------------------- */

impl IntoDevAssistError for std::io::Error {
    fn into_devassist(self) -> DevAssistError {
        match self.kind() {
            std::io::ErrorKind::NotFound => {
                DevAssistError::Config(format!("Config file not found: {self}"))
            }
            _ => DevAssistError::Config(format!("Failed to read config file: {self}")),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_devassist())
    }
}

impl IntoDevAssistError for toml::de::Error {
    fn into_devassist(self) -> DevAssistError {
        DevAssistError::Config(format!("Invalid TOML format: {self}"))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(value.into_devassist())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
