//! Tracing initialisation
//!
//! Installs a global `tracing-subscriber` registry filtered by `RUST_LOG`
//! (default `info`). Output is human-readable on a terminal or one JSON
//! object per line for log shippers.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, ANSI colours only on a terminal
    #[default]
    Human,
    /// Newline-delimited JSON
    Json,
}

impl LogFormat {
    /// Read `DEVASSIST_LOG_FORMAT` (`human` or `json`)
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var("DEVASSIST_LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Human,
        }
    }

    fn layer<S>(self) -> Box<dyn Layer<S> + Send + Sync + 'static>
    where
        S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        match self {
            Self::Human => fmt::layer()
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr)
                .boxed(),
            Self::Json => {
                fmt::layer().json().with_current_span(false).with_writer(std::io::stderr).boxed()
            }
        }
    }
}

/// Build the filter from `RUST_LOG`, falling back to `default_directive`
#[must_use]
pub fn env_filter(default_directive: tracing::Level) -> EnvFilter {
    EnvFilter::builder().with_default_directive(default_directive.into()).from_env_lossy()
}

/// Install the global subscriber
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(tracing::Level::INFO))
        .with(format.layer())
        .try_init()
        .context("tracing subscriber already initialized")?;

    tracing::debug!(?format, "tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_deserializes_snake_case() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Human);
    }

    #[test]
    fn test_init_tracing_twice_fails() {
        // Another test may have installed a subscriber first; either way the
        // second call must fail.
        let _ = init_tracing(LogFormat::Human);
        assert!(init_tracing(LogFormat::Json).is_err());
    }
}
