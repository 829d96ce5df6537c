//! Execution store abstraction
//!
//! The engine talks to storage through this trait so the same lifecycle
//! logic runs against PostgreSQL in production and the in-memory backend
//! in tests and local development.

use crate::{models::ExecutionModel, Result, TargetId};
use async_trait::async_trait;
use uuid::Uuid;

/// Durable, queryable record of workflow executions.
///
/// Implementations must make `insert_if_idle` atomic: the check for an
/// active execution and the insert of the new record are one operation,
/// never two calls with a gap.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Insert a new execution record, failing with [`crate::Error::AlreadyActive`]
    /// if the target already has an execution in `queued` or `running`
    /// status - under either workflow kind.
    async fn insert_if_idle(&self, execution: &ExecutionModel) -> Result<()>;

    /// Fetch one execution by ID
    async fn get(&self, id: Uuid) -> Result<ExecutionModel>;

    /// Persist an updated execution record
    async fn update(&self, execution: &ExecutionModel) -> Result<()>;

    /// The execution with the greatest `started_at` for the target,
    /// regardless of kind or status
    async fn latest(&self, target_id: &TargetId) -> Result<Option<ExecutionModel>>;

    /// Executions for a target, most recent first
    async fn list_for_target(
        &self,
        target_id: &TargetId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ExecutionModel>>;
}
