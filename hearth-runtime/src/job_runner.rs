//! Job runner abstraction
//!
//! The engine dispatches containerized work through this trait without
//! depending on a specific runner implementation. Jobs execute
//! out-of-process: everything they need travels in `JobSpec.environment`,
//! and progress is observed purely by polling - no push notifications are
//! assumed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result type for job runner operations
pub type RunnerResult<T> = std::result::Result<T, RunnerError>;

/// Errors that can occur at the job runner boundary
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Runner API error: {0}")]
    RunnerApi(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Compute resources requested for a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub vcpus: u32,
    pub memory_mib: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            vcpus: 1,
            memory_mib: 1024,
        }
    }
}

/// A unit of work submitted to the runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub command: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub resource_limits: ResourceLimits,
}

/// State of a job as reported by the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// One poll result from the runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPoll {
    pub state: JobState,
    /// Runner-provided detail, attached verbatim to failed executions
    pub detail: Option<String>,
}

/// Abstraction over the asynchronous job execution service.
///
/// Implementations should:
/// - Authenticate with the runner service
/// - Submit the job spec and return an opaque handle for tracking
/// - Answer polls for the job's current state
///
/// Handles are single-owner: one execution owns one handle, never shared.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Submit a job for asynchronous execution
    ///
    /// # Errors
    ///
    /// Returns an error if the runner's queue or capacity rejects the
    /// request, authentication fails, or the request is malformed.
    async fn submit(&self, spec: &JobSpec) -> RunnerResult<String>;

    /// Poll a previously submitted job by handle
    async fn poll(&self, handle: &str) -> RunnerResult<JobPoll>;
}
