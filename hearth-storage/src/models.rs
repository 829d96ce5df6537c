//! Database models for Hearth execution records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Structured failure detail attached to a terminal execution.
///
/// `kind` is one of `"submission"`, `"job"`, `"timeout"`. Job failure
/// detail is stored verbatim as reported by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    pub kind: String,
    pub message: String,
}

impl ExecutionFailure {
    pub fn submission(message: impl Into<String>) -> Self {
        Self {
            kind: "submission".to_string(),
            message: message.into(),
        }
    }

    pub fn job(message: impl Into<String>) -> Self {
        Self {
            kind: "job".to_string(),
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: "timeout".to_string(),
            message: message.into(),
        }
    }
}

/// Execution model for database storage
///
/// One row per workflow run against a target. Rows reaching a terminal
/// status (`succeeded`, `failed`, `timed_out`) are never mutated again.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionModel {
    pub id: Uuid,
    /// Workflow kind: `"provision"` or `"deprovision"`
    pub kind: String,
    pub target_id: String,
    /// Caller-supplied payload, stored as-is
    pub input: sqlx::types::Json<serde_json::Value>,
    /// `queued`, `running`, `succeeded`, `failed` or `timed_out`
    pub status: String,
    /// Opaque reference into the job runner, set once dispatch succeeds
    pub job_handle: Option<String>,
    pub error: Option<sqlx::types::Json<ExecutionFailure>>,
    /// Set at trigger time; `latest` selection orders by this column
    pub started_at: DateTime<Utc>,
    /// Set exactly once, when the execution reaches a terminal status
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionModel {
    /// Whether this record has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "timed_out")
    }

    /// Whether this record still counts against the single-active guard
    pub fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "queued" | "running")
    }
}
