//! # DevAssist Infrastructure
//!
//! I/O-facing pieces of the social login flow.
//!
//! This crate contains:
//! - Configuration loading (environment variables, TOML/JSON files)
//! - Tracing initialisation
//! - The HTTP client for the auth backend's code exchange
//! - [`LoginFlow`], which wires one tab's state store, message bus, login
//!   service and session timer together
//!
//! ## Architecture
//! - Implements traits defined in `devassist-common`
//! - Depends on `devassist-domain` and `devassist-common`
//! - Contains all "impure" code (network, files, environment)

pub mod config;
pub mod errors;
pub mod flow;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use errors::InfraError;
pub use flow::LoginFlow;
pub use http::{HttpAuthBackend, HttpClient};
pub use observability::{init_tracing, LogFormat};
