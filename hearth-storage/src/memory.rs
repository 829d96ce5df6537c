//! In-memory execution store
//!
//! Backend for tests and local development. A single async mutex spans the
//! active-execution check and the insert, so the single-active guard holds
//! without a database.

use crate::{models::ExecutionModel, store::ExecutionStore, Result, TargetId};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-memory execution store
#[derive(Default)]
pub struct MemoryStore {
    executions: Mutex<HashMap<Uuid, ExecutionModel>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, for test assertions
    pub async fn len(&self) -> usize {
        self.executions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.executions.lock().await.is_empty()
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn insert_if_idle(&self, execution: &ExecutionModel) -> Result<()> {
        let mut executions = self.executions.lock().await;

        let has_active = executions
            .values()
            .any(|e| e.target_id == execution.target_id && e.is_active());
        if has_active {
            return Err(crate::Error::AlreadyActive(execution.target_id.clone()));
        }

        executions.insert(execution.id, execution.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<ExecutionModel> {
        self.executions
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| crate::Error::NotFound(format!("Execution {}", id)))
    }

    async fn update(&self, execution: &ExecutionModel) -> Result<()> {
        let mut executions = self.executions.lock().await;

        match executions.get_mut(&execution.id) {
            Some(existing) => {
                *existing = execution.clone();
                Ok(())
            }
            None => Err(crate::Error::NotFound(format!(
                "Execution {}",
                execution.id
            ))),
        }
    }

    async fn latest(&self, target_id: &TargetId) -> Result<Option<ExecutionModel>> {
        let executions = self.executions.lock().await;

        let latest = executions
            .values()
            .filter(|e| e.target_id == target_id.as_str())
            .max_by_key(|e| (e.started_at, e.id))
            .cloned();

        Ok(latest)
    }

    async fn list_for_target(
        &self,
        target_id: &TargetId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ExecutionModel>> {
        if limit <= 0 || offset < 0 {
            return Err(crate::Error::ValidationError(
                "Invalid pagination parameters".to_string(),
            ));
        }

        let executions = self.executions.lock().await;

        let mut matching: Vec<ExecutionModel> = executions
            .values()
            .filter(|e| e.target_id == target_id.as_str())
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.started_at, b.id).cmp(&(a.started_at, a.id)));

        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn execution(target: &str, status: &str, started_offset_secs: i64) -> ExecutionModel {
        let now = Utc::now();
        ExecutionModel {
            id: Uuid::new_v4(),
            kind: "provision".to_string(),
            target_id: target.to_string(),
            input: sqlx::types::Json(serde_json::json!({})),
            status: status.to_string(),
            job_handle: None,
            error: None,
            started_at: now + Duration::seconds(started_offset_secs),
            ended_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_rejects_second_active_execution() {
        let store = MemoryStore::new();
        store
            .insert_if_idle(&execution("srv-1", "queued", 0))
            .await
            .unwrap();

        let err = store
            .insert_if_idle(&execution("srv-1", "queued", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::AlreadyActive(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn insert_allows_new_execution_after_terminal() {
        let store = MemoryStore::new();
        let mut first = execution("srv-1", "queued", 0);
        store.insert_if_idle(&first).await.unwrap();

        first.status = "failed".to_string();
        store.update(&first).await.unwrap();

        store
            .insert_if_idle(&execution("srv-1", "queued", 1))
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn latest_picks_greatest_started_at_regardless_of_insert_order() {
        let store = MemoryStore::new();
        let t3 = execution("srv-1", "succeeded", 30);
        let t1 = execution("srv-1", "succeeded", 10);
        let t2 = execution("srv-1", "succeeded", 20);

        // Inserted out of chronological order
        for e in [&t3, &t1, &t2] {
            let mut e = e.clone();
            e.status = "queued".to_string();
            store.insert_if_idle(&e).await.unwrap();
            e.status = "succeeded".to_string();
            store.update(&e).await.unwrap();
        }

        let latest = store
            .latest(&TargetId::new("srv-1"))
            .await
            .unwrap()
            .expect("latest should exist");
        assert_eq!(latest.id, t3.id);
    }

    #[tokio::test]
    async fn latest_is_none_for_unknown_target() {
        let store = MemoryStore::new();
        assert!(store
            .latest(&TargetId::new("srv-unknown"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_unknown_execution_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update(&execution("srv-1", "running", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::NotFound(_)));
    }
}
