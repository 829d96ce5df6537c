//! Execution tracking per target
//!
//! Answers "what is the latest execution for this server" and "is one
//! still in flight". A target's lifecycle phase is never stored - it is
//! always computed from the latest execution record, so there is no
//! mutable phase field to race on.

use std::sync::Arc;

use crate::map_storage_error;
use crate::state_machine::ExecutionStatus;
use crate::Result;
use hearth_storage::{ExecutionModel, ExecutionStore, TargetId};

/// Read model over the execution store
#[derive(Clone)]
pub struct ExecutionTracker {
    store: Arc<dyn ExecutionStore>,
}

impl ExecutionTracker {
    pub fn new(store: Arc<dyn ExecutionStore>) -> Self {
        Self { store }
    }

    /// The execution with the greatest `started_at` for the target,
    /// regardless of workflow kind or status
    pub async fn latest(&self, target_id: &TargetId) -> Result<Option<ExecutionModel>> {
        self.store
            .latest(target_id)
            .await
            .map_err(|e| map_storage_error(e, "Failed to query latest execution"))
    }

    /// Whether the target has a queued or running execution.
    ///
    /// Advisory: the enforcing guard is the store's conditional insert,
    /// not this check.
    pub async fn has_active(&self, target_id: &TargetId) -> Result<bool> {
        let latest = self.latest(target_id).await?;

        match latest {
            Some(execution) => {
                let status: ExecutionStatus = execution.status.as_str().try_into()?;
                Ok(!status.is_terminal())
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use hearth_storage::MemoryStore;
    use uuid::Uuid;

    async fn insert(
        store: &MemoryStore,
        target: &str,
        status: &str,
        offset_secs: i64,
    ) -> ExecutionModel {
        let now = Utc::now();
        let mut execution = ExecutionModel {
            id: Uuid::new_v4(),
            kind: "provision".to_string(),
            target_id: target.to_string(),
            input: sqlx::types::Json(serde_json::json!({})),
            status: "queued".to_string(),
            job_handle: Some("job-1".to_string()),
            error: None,
            started_at: now + Duration::seconds(offset_secs),
            ended_at: None,
            created_at: now,
            updated_at: now,
        };
        store.insert_if_idle(&execution).await.unwrap();
        if status != "queued" {
            execution.status = status.to_string();
            store.update(&execution).await.unwrap();
        }
        execution
    }

    #[tokio::test]
    async fn has_active_reflects_latest_record() {
        let store = Arc::new(MemoryStore::new());
        let tracker = ExecutionTracker::new(store.clone());
        let target = TargetId::new("srv-1");

        assert!(!tracker.has_active(&target).await.unwrap());

        insert(&store, "srv-1", "running", 0).await;
        assert!(tracker.has_active(&target).await.unwrap());
    }

    #[tokio::test]
    async fn terminal_latest_means_idle() {
        let store = Arc::new(MemoryStore::new());
        let tracker = ExecutionTracker::new(store.clone());

        insert(&store, "srv-1", "timed_out", 0).await;
        assert!(!tracker.has_active(&TargetId::new("srv-1")).await.unwrap());
    }

    #[tokio::test]
    async fn latest_spans_workflow_kinds() {
        let store = Arc::new(MemoryStore::new());
        let tracker = ExecutionTracker::new(store.clone());

        insert(&store, "srv-1", "succeeded", 0).await;
        let mut second = insert(&store, "srv-1", "succeeded", 10).await;
        second.kind = "deprovision".to_string();
        store.update(&second).await.unwrap();

        let latest = tracker
            .latest(&TargetId::new("srv-1"))
            .await
            .unwrap()
            .expect("latest exists");
        assert_eq!(latest.id, second.id);
    }
}
