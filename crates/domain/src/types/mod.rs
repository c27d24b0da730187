//! Domain types and models

pub mod provider;

pub use provider::Provider;
