//! Pre-wired engine and API fixtures over the in-memory store

use std::sync::Arc;
use std::time::Duration;

use hearth_runtime::{
    EngineConfig, ExecutionTracker, OrchestrationApi, PlatformConfig, WorkflowEngine,
};
use hearth_storage::{ExecutionStore, MemoryStore};

use crate::mocks::MockJobRunner;

/// Platform settings used across tests
pub fn test_platform() -> PlatformConfig {
    PlatformConfig {
        backup_bucket: "hearth-backups-test".to_string(),
        default_instance_type: "t2.medium".to_string(),
        server_fqdn: None,
        ssh_key_pair: None,
    }
}

/// Everything a lifecycle test needs, sharing one store and one runner
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub runner: Arc<MockJobRunner>,
    pub engine: WorkflowEngine,
    pub tracker: ExecutionTracker,
    pub api: OrchestrationApi,
}

impl TestHarness {
    /// Harness with the default 30-minute timeout ceiling
    pub fn new() -> Self {
        Self::with_runner_and_timeout(MockJobRunner::new(), Duration::from_secs(1800))
    }

    pub fn with_runner(runner: MockJobRunner) -> Self {
        Self::with_runner_and_timeout(runner, Duration::from_secs(1800))
    }

    pub fn with_runner_and_timeout(runner: MockJobRunner, timeout: Duration) -> Self {
        let store = Arc::new(MemoryStore::new());
        let runner = Arc::new(runner);
        let dyn_store: Arc<dyn ExecutionStore> = store.clone();

        let engine = WorkflowEngine::new(
            dyn_store.clone(),
            runner.clone(),
            test_platform(),
            EngineConfig::with_execution_timeout(timeout),
        );
        let tracker = ExecutionTracker::new(dyn_store);
        let api = OrchestrationApi::new(engine.clone(), tracker.clone());

        Self {
            store,
            runner,
            engine,
            tracker,
            api,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine over a fresh in-memory store and the given runner
pub fn test_engine(runner: MockJobRunner) -> WorkflowEngine {
    TestHarness::with_runner(runner).engine
}

/// Orchestration API over a fresh in-memory store and the given runner
pub fn test_api(runner: MockJobRunner) -> OrchestrationApi {
    TestHarness::with_runner(runner).api
}
