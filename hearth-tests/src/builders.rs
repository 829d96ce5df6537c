//! Type-safe builders for constructing test objects
//!
//! Builders provide a fluent API for seeding execution records directly
//! into a store, bypassing the engine - useful for shaping histories
//! (out-of-order inserts, expired deadlines) the engine itself would
//! never produce in one test.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use hearth_storage::{ExecutionFailure, ExecutionModel};

/// Builder for execution records
pub struct ExecutionBuilder {
    id: Uuid,
    kind: String,
    target_id: String,
    input: serde_json::Value,
    status: String,
    job_handle: Option<String>,
    error: Option<ExecutionFailure>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl ExecutionBuilder {
    /// A queued provision execution for the given target
    pub fn provision(target_id: &str) -> Self {
        Self::new(target_id, "provision")
    }

    /// A queued deprovision execution for the given target
    pub fn deprovision(target_id: &str) -> Self {
        Self::new(target_id, "deprovision")
    }

    fn new(target_id: &str, kind: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            target_id: target_id.to_string(),
            input: serde_json::json!({}),
            status: "queued".to_string(),
            job_handle: Some("job-0000".to_string()),
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    pub fn job_handle(mut self, handle: Option<&str>) -> Self {
        self.job_handle = handle.map(|h| h.to_string());
        self
    }

    pub fn error(mut self, error: ExecutionFailure) -> Self {
        self.error = Some(error);
        self
    }

    /// Shift `started_at` relative to now; negative values move it into
    /// the past
    pub fn started_secs_ago(mut self, secs: i64) -> Self {
        self.started_at = Utc::now() - Duration::seconds(secs);
        self
    }

    pub fn started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = at;
        self
    }

    pub fn ended_at(mut self, at: DateTime<Utc>) -> Self {
        self.ended_at = Some(at);
        self
    }

    /// Build the execution record
    pub fn build(self) -> ExecutionModel {
        let now = Utc::now();
        ExecutionModel {
            id: self.id,
            kind: self.kind,
            target_id: self.target_id,
            input: sqlx::types::Json(self.input),
            status: self.status,
            job_handle: self.job_handle,
            error: self.error.map(sqlx::types::Json),
            started_at: self.started_at,
            ended_at: self.ended_at,
            created_at: now,
            updated_at: now,
        }
    }
}
