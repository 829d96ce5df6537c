//! Wiring for CLI commands
//!
//! The CLI talks to the same storage and runner service as the API
//! process, configured through the same environment variables.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use hearth_runner::{HttpJobRunner, RunnerConfig};
use hearth_runtime::{
    EngineConfig, ExecutionTracker, OrchestrationApi, PlatformConfig, WorkflowEngine,
};
use hearth_storage::{ExecutionStore, PostgresStorage};

/// Connect to the execution store
pub async fn connect_storage(database_url: &str) -> Result<Arc<PostgresStorage>> {
    let storage = PostgresStorage::new(database_url)
        .await
        .context("Failed to connect to database")?;
    Ok(Arc::new(storage))
}

/// Build the full orchestration API, including the job runner client
///
/// Requires `HEARTH_RUNNER_URL`, `HEARTH_RUNNER_TOKEN`, `HEARTH_HMAC_SECRET`
/// and `HEARTH_BACKUP_BUCKET` in the environment.
pub async fn build_api(database_url: &str) -> Result<OrchestrationApi> {
    let storage = connect_storage(database_url).await?;

    let runner = HttpJobRunner::new(RunnerConfig {
        base_url: require_env("HEARTH_RUNNER_URL")?,
        auth_token: require_env("HEARTH_RUNNER_TOKEN")?,
        hmac_secret: require_env("HEARTH_HMAC_SECRET")?,
        request_timeout_secs: 30,
    })
    .context("Failed to build job runner client")?;

    let platform = PlatformConfig {
        backup_bucket: require_env("HEARTH_BACKUP_BUCKET")?,
        default_instance_type: std::env::var("HEARTH_DEFAULT_INSTANCE_TYPE")
            .unwrap_or_else(|_| "t2.medium".to_string()),
        server_fqdn: std::env::var("HEARTH_SERVER_FQDN").ok(),
        ssh_key_pair: std::env::var("HEARTH_SSH_KEY_PAIR").ok(),
    };

    let execution_timeout = std::env::var("HEARTH_EXECUTION_TIMEOUT_SECS")
        .ok()
        .map(|v| v.parse::<u64>())
        .transpose()
        .context("Invalid HEARTH_EXECUTION_TIMEOUT_SECS")?
        .map(Duration::from_secs)
        .unwrap_or_else(|| {
            Duration::from_secs(hearth_runtime::config::DEFAULT_EXECUTION_TIMEOUT_SECS)
        });

    let store: Arc<dyn ExecutionStore> = storage;
    let engine = WorkflowEngine::new(
        store.clone(),
        Arc::new(runner),
        platform,
        EngineConfig::with_execution_timeout(execution_timeout),
    );

    Ok(OrchestrationApi::new(engine, ExecutionTracker::new(store)))
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{} environment variable not set", name))
}
