//! Error classification shared by every DevAssist error type
//!
//! Login failures are terminal for the attempt that produced them, but the
//! UI and the logs still need to know how loud to be about each one. Every
//! error type in the workspace implements [`ErrorClassification`] so callers
//! can make those decisions without matching on concrete variants.
//!
//! ## ErrorSeverity Levels
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected user-driven outcomes | Popup closed by the user |
//! | **Warning** | Degraded but recoverable by the user | Popup blocked, timeout |
//! | **Error** | Failure requiring attention | Provider errors, backend failures |
//! | **Critical** | Security relevant | CSRF state mismatch |
//!
//! ## Example
//!
//! ```rust,ignore
//! use devassist_common::error::{ErrorClassification, ErrorSeverity};
//!
//! fn report<E: ErrorClassification + std::fmt::Display>(err: &E) {
//!     if err.severity() >= ErrorSeverity::Error {
//!         tracing::error!(error = %err, "login failed");
//!     }
//! }
//! ```

use std::fmt;
use std::time::Duration;

use devassist_domain::DevAssistError;

/// Standard interface for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient issues that may succeed if attempted
    /// again without user involvement.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    ///
    /// Used for monitoring, alerting, and logging decisions.
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Get the suggested retry delay if applicable
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl ErrorClassification for DevAssistError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound(_) => ErrorSeverity::Info,
            Self::Auth(_) | Self::Network(_) => ErrorSeverity::Warning,
            Self::Config(_) | Self::InvalidInput(_) => ErrorSeverity::Error,
            Self::Security(_) | Self::Internal(_) => ErrorSeverity::Critical,
        }
    }
}
