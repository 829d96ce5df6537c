//! Orchestration API
//!
//! The single entry point the rest of the platform calls. `trigger`
//! returns as soon as the record is created and the job dispatched;
//! `status` reads the latest execution; progress is observed by polling -
//! there is no push channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::engine::WorkflowEngine;
use crate::state_machine::{ExecutionStatus, WorkflowKind};
use crate::tracker::ExecutionTracker;
use crate::Result;
use hearth_storage::{ExecutionFailure, ExecutionModel, TargetId};

/// Receipt returned from a successful trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerReceipt {
    pub execution_id: Uuid,
    pub status: ExecutionStatus,
}

/// Caller-facing view of a target's latest execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStatusView {
    pub target_id: String,
    pub execution_id: Uuid,
    pub kind: WorkflowKind,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionFailure>,
}

impl ExecutionStatusView {
    fn from_model(execution: &ExecutionModel) -> Result<Self> {
        Ok(Self {
            target_id: execution.target_id.clone(),
            execution_id: execution.id,
            kind: execution.kind.as_str().try_into()?,
            status: execution.status.as_str().try_into()?,
            started_at: execution.started_at,
            ended_at: execution.ended_at,
            error: execution.error.as_ref().map(|e| e.0.clone()),
        })
    }
}

/// Boundary service wrapping the engine and tracker
#[derive(Clone)]
pub struct OrchestrationApi {
    engine: WorkflowEngine,
    tracker: ExecutionTracker,
}

impl OrchestrationApi {
    pub fn new(engine: WorkflowEngine, tracker: ExecutionTracker) -> Self {
        Self { engine, tracker }
    }

    /// Trigger a lifecycle workflow for a target
    ///
    /// Returns immediately - never blocks for job completion. An active
    /// execution for the target yields [`crate::Error::Conflict`] with no
    /// state mutated.
    #[instrument(skip(self, input), fields(kind = kind.as_str(), target_id = %target_id.as_str()))]
    pub async fn trigger(
        &self,
        kind: WorkflowKind,
        target_id: &TargetId,
        input: serde_json::Value,
    ) -> Result<TriggerReceipt> {
        let execution = self.engine.start(kind, target_id, input).await?;

        Ok(TriggerReceipt {
            execution_id: execution.id,
            status: execution.status.as_str().try_into()?,
        })
    }

    /// Latest execution status for a target
    ///
    /// # Errors
    ///
    /// [`crate::Error::NotFound`] when the target has no executions.
    #[instrument(skip(self), fields(target_id = %target_id.as_str()))]
    pub async fn status(&self, target_id: &TargetId) -> Result<ExecutionStatusView> {
        let latest = self.tracker.latest(target_id).await?.ok_or_else(|| {
            crate::Error::NotFound(format!("No executions for target {}", target_id))
        })?;

        ExecutionStatusView::from_model(&latest)
    }

    /// Drive one execution forward by a single poll of the job runner.
    ///
    /// This is the external polling hook: a scheduled check, a front-end
    /// refresh, or a CLI loop calls it repeatedly until the returned view
    /// is terminal.
    #[instrument(skip(self), fields(execution_id = %execution_id))]
    pub async fn advance(&self, execution_id: Uuid) -> Result<ExecutionStatusView> {
        let execution = self.engine.advance(execution_id).await?;
        ExecutionStatusView::from_model(&execution)
    }

    /// Read-only snapshot of one execution
    pub async fn get(&self, execution_id: Uuid) -> Result<ExecutionStatusView> {
        let execution = self.engine.get(execution_id).await?;
        ExecutionStatusView::from_model(&execution)
    }

    /// Whether the target currently has an execution in flight
    pub async fn has_active(&self, target_id: &TargetId) -> Result<bool> {
        self.tracker.has_active(target_id).await
    }
}
