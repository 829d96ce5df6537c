//! # Hearth Runtime
//!
//! The lifecycle orchestration core: a pair of workflows (provision,
//! deprovision) driven as state machines over an external job runner,
//! with execution tracking and a single-active-execution guarantee per
//! target server.
//!
//! The engine performs no background work of its own - executions move
//! forward only when a caller invokes [`engine::WorkflowEngine::advance`],
//! so the same logic can be driven by an HTTP poll, a CLI loop, or a test
//! harness.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod job_runner;
pub mod state_machine;
pub mod tracker;

// Re-export commonly used types
pub use api::{ExecutionStatusView, OrchestrationApi, TriggerReceipt};
pub use config::EngineConfig;
pub use dispatch::PlatformConfig;
pub use engine::WorkflowEngine;
pub use job_runner::{JobPoll, JobRunner, JobSpec, JobState, ResourceLimits, RunnerError};
pub use state_machine::{ExecutionStatus, WorkflowKind};
pub use tracker::ExecutionTracker;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for runtime operations
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An active execution already exists for the target. Expected under
    /// concurrent use; callers surface "already in progress" and retry later.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The job runner rejected dispatch; the execution was finalized FAILED.
    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stored record carried an unparseable status or kind
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The job runner could not be reached while polling; no state changed
    #[error("Job runner error: {0}")]
    Runner(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Map storage errors to runtime domain errors
///
/// This preserves semantic meaning for the caller:
/// - NotFound → NotFound (business logic, non-retryable)
/// - AlreadyActive → Conflict (expected under concurrent triggers)
/// - ValidationError → InvalidInput (bad request data)
/// - PoolExhausted, ConnectionFailed, Database → Internal (retryable upstream)
pub(crate) fn map_storage_error(e: hearth_storage::Error, context: &str) -> Error {
    use hearth_storage::Error as StorageError;
    use tracing::error;

    match e {
        StorageError::NotFound(msg) => Error::NotFound(msg),
        StorageError::AlreadyActive(target) => Error::Conflict(target),
        StorageError::ValidationError(msg) => {
            error!(error = %msg, context = %context, "Validation error");
            Error::InvalidInput(msg)
        }
        _ => {
            let err_msg = format!("{}: {}", context, e);
            error!(error = %err_msg, "Storage error");
            Error::Internal(err_msg)
        }
    }
}
