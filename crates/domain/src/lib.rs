//! # DevAssist Domain
//!
//! Domain types for the DevAssist social login flow.
//!
//! This crate contains:
//! - The social login `Provider` enumeration
//! - Domain error types and Result definitions
//! - Configuration structures for the OAuth popup/redirect flow and the
//!   session timer
//! - Wire constants (message types, storage keys, callback route)
//!
//! ## Architecture
//! - No dependencies on other DevAssist crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
