//! Workflow engine for server lifecycle executions
//!
//! Drives one execution of a provision or deprovision workflow from
//! trigger to terminal status. The engine is stateless and thread-safe:
//! all state lives in the execution store, and nothing inside the engine
//! schedules work - executions advance only when a caller polls.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::dispatch::{self, PlatformConfig};
use crate::job_runner::JobRunner;
use crate::map_storage_error;
use crate::state_machine::{self, ExecutionStatus, Transition, WorkflowKind};
use crate::Result;
use hearth_storage::{ExecutionFailure, ExecutionModel, ExecutionStore, TargetId};

/// Stateless workflow engine.
///
/// Safe to share across async tasks; every operation is a bounded number
/// of store calls plus at most one job-runner call - never the job's
/// real-world duration.
#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<dyn ExecutionStore>,
    runner: Arc<dyn JobRunner>,
    platform: PlatformConfig,
    config: EngineConfig,
}

impl WorkflowEngine {
    /// Create a new workflow engine
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        runner: Arc<dyn JobRunner>,
        platform: PlatformConfig,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            runner,
            platform,
            config,
        }
    }

    /// Start a new workflow execution against a target
    ///
    /// Creates the execution record in QUEUED status through the store's
    /// atomic conditional insert, then synchronously dispatches the job.
    /// The conflict check and the record creation are one store operation,
    /// so two racing triggers can never both observe "no active execution".
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Conflict`] if the target already has a queued or
    ///   running execution, under either workflow kind; no record is
    ///   created.
    /// - [`crate::Error::Submission`] if the job runner rejects dispatch
    ///   or the input payload is malformed; the execution is finalized
    ///   FAILED with the detail recorded, in the same call.
    #[instrument(
        skip(self, input),
        fields(kind = kind.as_str(), target_id = %target_id.as_str())
    )]
    pub async fn start(
        &self,
        kind: WorkflowKind,
        target_id: &TargetId,
        input: serde_json::Value,
    ) -> Result<ExecutionModel> {
        let start = Instant::now();

        if target_id.as_str().trim().is_empty() {
            return Err(crate::Error::InvalidInput(
                "target_id cannot be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let mut execution = ExecutionModel {
            id: Uuid::new_v4(),
            kind: kind.as_str().to_string(),
            target_id: target_id.as_str().to_string(),
            input: sqlx::types::Json(input),
            status: ExecutionStatus::Queued.into(),
            job_handle: None,
            error: None,
            started_at: now,
            ended_at: None,
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert_if_idle(&execution)
            .await
            .map_err(|e| map_storage_error(e, "Failed to create execution"))?;

        tracing::debug!(execution_id = %execution.id, "Execution created");

        // Dispatch synchronously; a failure here finalizes the record in
        // the same call so the target does not stay blocked.
        let spec = match dispatch::job_spec_for(kind, target_id, &self.platform, &execution.input.0)
        {
            Ok(spec) => spec,
            Err(e) => {
                let message = e.to_string();
                self.finalize_failed_dispatch(&mut execution, &message)
                    .await?;
                return Err(crate::Error::Submission(message));
            }
        };

        match self.runner.submit(&spec).await {
            Ok(handle) => {
                execution.job_handle = Some(handle);
                execution.updated_at = Utc::now();
                self.store
                    .update(&execution)
                    .await
                    .map_err(|e| map_storage_error(e, "Failed to record job handle"))?;
            }
            Err(e) => {
                error!(
                    execution_id = %execution.id,
                    error = %e,
                    "Job runner rejected dispatch"
                );
                let message = e.to_string();
                self.finalize_failed_dispatch(&mut execution, &message)
                    .await?;
                return Err(crate::Error::Submission(message));
            }
        }

        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            warn!(
                execution_id = %execution.id,
                duration_ms = elapsed.as_millis(),
                "Slow execution creation"
            );
        }
        tracing::debug!(execution_id = %execution.id, "Execution dispatched");

        Ok(execution)
    }

    /// Advance a non-terminal execution by polling the job runner once
    ///
    /// Idempotent: an already-terminal execution is returned unchanged -
    /// a no-op, not an error. Transition planning is the pure function in
    /// [`state_machine::plan_transition`]; this method only applies its
    /// decision to the record.
    #[instrument(skip(self), fields(execution_id = %execution_id))]
    pub async fn advance(&self, execution_id: Uuid) -> Result<ExecutionModel> {
        let mut execution = self
            .store
            .get(execution_id)
            .await
            .map_err(|e| map_storage_error(e, "Failed to get execution"))?;

        let status: ExecutionStatus = execution.status.as_str().try_into()?;
        if status.is_terminal() {
            tracing::debug!(status = %execution.status, "Execution already terminal");
            return Ok(execution);
        }

        let handle = execution.job_handle.clone().ok_or_else(|| {
            crate::Error::Internal(format!(
                "Non-terminal execution {} has no job handle",
                execution.id
            ))
        })?;

        let poll = self
            .runner
            .poll(&handle)
            .await
            .map_err(|e| crate::Error::Runner(e.to_string()))?;

        let elapsed = Utc::now()
            .signed_duration_since(execution.started_at)
            .to_std()
            .unwrap_or_default();
        let deadline_exceeded = elapsed >= self.config.execution_timeout;

        let Some(transition) = state_machine::plan_transition(status, &poll, deadline_exceeded)
        else {
            return Ok(execution);
        };

        match transition {
            Transition::ToRunning => {
                execution.status = ExecutionStatus::Running.into();
                execution.updated_at = Utc::now();
            }
            Transition::Finalize { status, failure } => {
                let now = Utc::now();
                execution.status = status.into();
                execution.error = failure.map(sqlx::types::Json);
                execution.ended_at = Some(now);
                execution.updated_at = now;
                tracing::info!(
                    execution_id = %execution.id,
                    status = %execution.status,
                    "Execution finalized"
                );
            }
        }

        self.store
            .update(&execution)
            .await
            .map_err(|e| map_storage_error(e, "Failed to update execution"))?;

        Ok(execution)
    }

    /// Read-only snapshot of one execution
    pub async fn get(&self, execution_id: Uuid) -> Result<ExecutionModel> {
        self.store
            .get(execution_id)
            .await
            .map_err(|e| map_storage_error(e, "Failed to get execution"))
    }

    /// The engine's configured timeout ceiling
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn finalize_failed_dispatch(
        &self,
        execution: &mut ExecutionModel,
        message: &str,
    ) -> Result<()> {
        let now = Utc::now();
        execution.status = ExecutionStatus::Failed.into();
        execution.error = Some(sqlx::types::Json(ExecutionFailure::submission(message)));
        execution.ended_at = Some(now);
        execution.updated_at = now;

        self.store
            .update(execution)
            .await
            .map_err(|e| map_storage_error(e, "Failed to record dispatch failure"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_runner::{JobPoll, JobSpec, JobState, RunnerError, RunnerResult};
    use async_trait::async_trait;
    use hearth_storage::MemoryStore;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Runner that replays a scripted sequence of poll results
    struct ScriptedRunner {
        reject_submit: bool,
        polls: Mutex<Vec<JobPoll>>,
    }

    impl ScriptedRunner {
        fn new(polls: Vec<JobPoll>) -> Self {
            Self {
                reject_submit: false,
                polls: Mutex::new(polls),
            }
        }

        fn rejecting() -> Self {
            Self {
                reject_submit: true,
                polls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl JobRunner for ScriptedRunner {
        async fn submit(&self, _spec: &JobSpec) -> RunnerResult<String> {
            if self.reject_submit {
                return Err(RunnerError::RunnerApi("queue at capacity".to_string()));
            }
            Ok("job-0001".to_string())
        }

        async fn poll(&self, _handle: &str) -> RunnerResult<JobPoll> {
            let mut polls = self.polls.lock().expect("poll script lock");
            if polls.is_empty() {
                return Ok(JobPoll {
                    state: JobState::Running,
                    detail: None,
                });
            }
            Ok(polls.remove(0))
        }
    }

    fn platform() -> PlatformConfig {
        PlatformConfig {
            backup_bucket: "hearth-backups".to_string(),
            default_instance_type: "t2.medium".to_string(),
            server_fqdn: None,
            ssh_key_pair: None,
        }
    }

    fn engine_with(runner: ScriptedRunner, timeout: Duration) -> WorkflowEngine {
        WorkflowEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(runner),
            platform(),
            EngineConfig::with_execution_timeout(timeout),
        )
    }

    fn default_engine(runner: ScriptedRunner) -> WorkflowEngine {
        engine_with(runner, Duration::from_secs(1800))
    }

    #[tokio::test]
    async fn start_creates_queued_execution_with_job_handle() {
        let engine = default_engine(ScriptedRunner::new(vec![]));

        let execution = engine
            .start(
                WorkflowKind::Provision,
                &TargetId::new("srv-1"),
                serde_json::json!({"version": "1.20.1"}),
            )
            .await
            .expect("start should succeed");

        assert_eq!(execution.status, "queued");
        assert_eq!(execution.job_handle.as_deref(), Some("job-0001"));
        assert!(execution.ended_at.is_none());
    }

    #[tokio::test]
    async fn second_trigger_for_active_target_conflicts() {
        let engine = default_engine(ScriptedRunner::new(vec![]));
        let target = TargetId::new("srv-1");

        engine
            .start(WorkflowKind::Provision, &target, serde_json::json!({}))
            .await
            .expect("first start succeeds");

        let err = engine
            .start(WorkflowKind::Deprovision, &target, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Conflict(_)));
    }

    #[tokio::test]
    async fn rejected_submission_finalizes_failed_synchronously() {
        let engine = default_engine(ScriptedRunner::rejecting());
        let target = TargetId::new("srv-1");

        let err = engine
            .start(WorkflowKind::Provision, &target, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Submission(_)));

        // The failed record is queryable and no longer blocks the target
        let engine2 = engine.clone();
        let execution = engine2
            .start(WorkflowKind::Deprovision, &target, serde_json::json!({}))
            .await
            .expect("target is idle after failed dispatch");
        assert_eq!(execution.kind, "deprovision");
    }

    #[tokio::test]
    async fn malformed_input_finalizes_failed_synchronously() {
        let engine = default_engine(ScriptedRunner::new(vec![]));

        let err = engine
            .start(
                WorkflowKind::Provision,
                &TargetId::new("srv-1"),
                serde_json::json!({"not_a_field": true}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Submission(_)));
    }

    #[tokio::test]
    async fn advance_moves_queued_to_running_then_succeeded() {
        let engine = default_engine(ScriptedRunner::new(vec![
            JobPoll {
                state: JobState::Running,
                detail: None,
            },
            JobPoll {
                state: JobState::Succeeded,
                detail: None,
            },
        ]));

        let execution = engine
            .start(
                WorkflowKind::Provision,
                &TargetId::new("srv-1"),
                serde_json::json!({}),
            )
            .await
            .unwrap();

        let running = engine.advance(execution.id).await.unwrap();
        assert_eq!(running.status, "running");
        assert!(running.ended_at.is_none());

        let done = engine.advance(execution.id).await.unwrap();
        assert_eq!(done.status, "succeeded");
        assert!(done.ended_at.is_some());
    }

    #[tokio::test]
    async fn advance_is_idempotent_after_finalization() {
        let engine = default_engine(ScriptedRunner::new(vec![JobPoll {
            state: JobState::Failed,
            detail: Some("boom".to_string()),
        }]));

        let execution = engine
            .start(
                WorkflowKind::Provision,
                &TargetId::new("srv-1"),
                serde_json::json!({}),
            )
            .await
            .unwrap();

        let failed = engine.advance(execution.id).await.unwrap();
        assert_eq!(failed.status, "failed");
        let first_ended_at = failed.ended_at;
        let first_error = failed.error.clone();

        // Scripted polls are exhausted; further advances must not touch
        // the record or the runner result
        for _ in 0..3 {
            let again = engine.advance(execution.id).await.unwrap();
            assert_eq!(again.status, "failed");
            assert_eq!(again.ended_at, first_ended_at);
            assert_eq!(
                again.error.as_ref().map(|e| e.0.clone()),
                first_error.as_ref().map(|e| e.0.clone())
            );
        }
    }

    #[tokio::test]
    async fn advance_times_out_past_the_ceiling() {
        let engine = engine_with(
            ScriptedRunner::new(vec![JobPoll {
                state: JobState::Running,
                detail: None,
            }]),
            Duration::from_secs(0),
        );

        let execution = engine
            .start(
                WorkflowKind::Provision,
                &TargetId::new("srv-1"),
                serde_json::json!({}),
            )
            .await
            .unwrap();

        let timed_out = engine.advance(execution.id).await.unwrap();
        assert_eq!(timed_out.status, "timed_out");
        assert_eq!(
            timed_out.error.as_ref().map(|e| e.0.kind.as_str()),
            Some("timeout")
        );
    }

    #[tokio::test]
    async fn advance_unknown_execution_is_not_found() {
        let engine = default_engine(ScriptedRunner::new(vec![]));
        let err = engine.advance(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, crate::Error::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_target_is_rejected_before_any_write() {
        let engine = default_engine(ScriptedRunner::new(vec![]));
        let err = engine
            .start(
                WorkflowKind::Provision,
                &TargetId::new("  "),
                serde_json::json!({}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::InvalidInput(_)));
    }
}
