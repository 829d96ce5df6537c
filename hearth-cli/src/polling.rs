//! Status polling for lifecycle executions
//!
//! The engine has no internal scheduler, so the wait loop is the polling
//! driver: each tick advances the execution by one job-runner poll, then
//! renders the result.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::time::{interval, timeout};
use tracing::debug;

use hearth_runtime::{ExecutionStatus, ExecutionStatusView, OrchestrationApi};
use uuid::Uuid;

/// Display execution status to the user
pub fn display_status(view: &ExecutionStatusView) {
    let status_icon = match view.status {
        ExecutionStatus::Queued => "⏳",
        ExecutionStatus::Running => "🔄",
        ExecutionStatus::Succeeded => "✅",
        ExecutionStatus::Failed => "❌",
        ExecutionStatus::TimedOut => "⏱️",
    };

    println!(
        "{} Execution {} is {}",
        status_icon,
        view.execution_id,
        view.status.as_str()
    );

    if let Some(error) = &view.error {
        println!("   Error ({}): {}", error.kind, error.message);
    }

    if view.ended_at.is_none() {
        let elapsed = chrono::Utc::now()
            .signed_duration_since(view.started_at)
            .to_std()
            .unwrap_or_default();
        println!("   Runtime: {:.1}s", elapsed.as_secs_f64());
    }
}

/// Advance and poll an execution until it reaches a terminal status
///
/// Returns the final status or fails once the wait timeout elapses. The
/// wait timeout only bounds this loop; the execution's own TIMED_OUT
/// ceiling is enforced by the engine.
pub async fn poll_until_terminal(
    api: &OrchestrationApi,
    execution_id: Uuid,
    timeout_duration: Duration,
    poll_interval_duration: Duration,
) -> Result<ExecutionStatus> {
    debug!(
        "Polling execution {} with timeout {:?} and interval {:?}",
        execution_id, timeout_duration, poll_interval_duration
    );

    let mut poll_ticker = interval(poll_interval_duration);

    let result = timeout(timeout_duration, async {
        loop {
            poll_ticker.tick().await;

            let view = api
                .advance(execution_id)
                .await
                .context("Failed to advance execution")?;

            debug!(
                "Polled execution {}: status = {}",
                execution_id,
                view.status.as_str()
            );

            display_status(&view);

            if view.status.is_terminal() {
                return Ok(view.status);
            }
        }
    })
    .await;

    match result {
        Ok(status_result) => status_result,
        Err(_) => {
            anyhow::bail!(
                "Execution {} did not complete within wait timeout of {:?}",
                execution_id,
                timeout_duration
            )
        }
    }
}
