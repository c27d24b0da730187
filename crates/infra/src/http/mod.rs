//! HTTP plumbing for the auth backend

pub mod backend;
pub mod client;

pub use backend::HttpAuthBackend;
pub use client::{HttpClient, HttpClientBuilder};
