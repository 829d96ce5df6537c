//! # Hearth Runner
//!
//! HTTP adapter for the platform's containerized job-runner service.
//! Implements the [`hearth_runtime::JobRunner`] boundary: submit a job
//! spec, receive an opaque handle, poll for state. Payloads are signed
//! with HMAC-SHA256 so the runner can verify integrity.

pub mod client;
pub mod signing;

// Re-export commonly used types
pub use client::{HttpJobRunner, RunnerConfig};

/// Result type for runner client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for runner client operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Runner API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
