//! Type definitions for the orchestration HTTP API
//!
//! These are the data contracts between the platform front end and the
//! orchestrator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hearth_runtime::{ExecutionStatus, WorkflowKind};

/// Trigger request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub workflow_kind: WorkflowKind,
    pub target_id: String,

    /// Workflow input payload; defaults to an empty object
    #[serde(default = "default_input")]
    pub input: serde_json::Value,
}

fn default_input() -> serde_json::Value {
    serde_json::json!({})
}

/// Response from a successful trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub execution_id: Uuid,
    pub status: ExecutionStatus,
}

/// Error body returned for all failure responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl HealthResponse {
    /// Create a healthy response
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }
    }
}
