//! Configuration loader
//!
//! Loads the social login configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `DEVASSIST_APP_ORIGIN`: Origin the app is served from (required)
//! - `DEVASSIST_API_BASE_URL`: Auth backend base URL
//! - `DEVASSIST_GOOGLE_CLIENT_ID`, `DEVASSIST_YANDEX_CLIENT_ID`,
//!   `DEVASSIST_VK_CLIENT_ID`: OAuth client ids; a provider is enabled when
//!   its id is set
//! - `DEVASSIST_POPUP_TIMEOUT_SECS`: Popup timeout in seconds
//! - `DEVASSIST_SESSION_WARNING_SECS`: Session warning threshold in seconds
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./devassist.toml` or `./devassist.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. `../` and `../../` variants of the above
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use devassist_domain::{AuthConfig, DevAssistError, Provider, ProviderConfig, Result};

use crate::errors::InfraError;

const CONFIG_FILE_NAMES: [&str; 4] =
    ["devassist.toml", "devassist.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `DevAssistError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<AuthConfig> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    config.validate()?;
    tracing::info!(
        origin = %config.app_origin,
        providers = config.providers.len(),
        "Social login configuration ready"
    );
    Ok(config)
}

/// Load configuration from environment variables
///
/// Only `DEVASSIST_APP_ORIGIN` is required; everything else falls back to the
/// defaults in [`AuthConfig`].
///
/// # Errors
/// Returns `DevAssistError::Config` if the origin is missing or a numeric
/// variable is malformed.
pub fn load_from_env() -> Result<AuthConfig> {
    let mut config = AuthConfig::new(env_var("DEVASSIST_APP_ORIGIN")?);
    config.api_base_url = env_opt("DEVASSIST_API_BASE_URL");

    for provider in Provider::ALL {
        let key = format!("DEVASSIST_{}_CLIENT_ID", provider.to_string().to_ascii_uppercase());
        if let Some(client_id) = env_opt(&key) {
            config.providers.insert(provider, ProviderConfig::new(client_id));
        }
    }

    if let Some(timeout) = env_u64("DEVASSIST_POPUP_TIMEOUT_SECS")? {
        config.popup.timeout_secs = timeout;
    }
    if let Some(threshold) = env_u64("DEVASSIST_SESSION_WARNING_SECS")? {
        config.session.warning_threshold_secs = threshold;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `DevAssistError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<AuthConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DevAssistError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            DevAssistError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| DevAssistError::from(InfraError::from(e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `DevAssistError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<AuthConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| DevAssistError::from(InfraError::from(e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| DevAssistError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(DevAssistError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its two parents, and the
/// executable's directory for the file names listed in the module docs.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `DevAssistError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        DevAssistError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Optional environment variable; blank values count as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parse an optional unsigned integer from an environment variable
///
/// # Errors
/// Returns `DevAssistError::Config` if the variable is set but not a number.
fn env_u64(key: &str) -> Result<Option<u64>> {
    env_opt(key)
        .map(|s| {
            s.parse::<u64>()
                .map_err(|e| DevAssistError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}
