//! Provision / deprovision trigger command

use anyhow::{bail, Result};
use std::time::Duration;
use tracing::info;

use hearth_runtime::{ExecutionStatus, WorkflowKind};
use hearth_storage::TargetId;

use crate::context::build_api;
use crate::polling::poll_until_terminal;

/// Options for waiting on the triggered execution
pub struct WaitOptions {
    pub wait: bool,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

/// Trigger a lifecycle workflow for a target, optionally waiting for the
/// terminal status.
pub async fn execute(
    kind: WorkflowKind,
    target_id: &str,
    input: serde_json::Value,
    database_url: &str,
    wait: WaitOptions,
) -> Result<()> {
    let api = build_api(database_url).await?;
    let target = TargetId::new(target_id);

    let receipt = match api.trigger(kind, &target, input).await {
        Ok(receipt) => receipt,
        Err(hearth_runtime::Error::Conflict(_)) => {
            bail!(
                "An execution is already in progress for {}; try again once it finishes",
                target_id
            );
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        execution_id = %receipt.execution_id,
        kind = kind.as_str(),
        target_id = %target_id,
        "Execution triggered"
    );
    println!("Execution {} triggered ({})", receipt.execution_id, kind.as_str());

    if !wait.wait {
        println!("Poll with: hearth status {}", target_id);
        return Ok(());
    }

    let final_status =
        poll_until_terminal(&api, receipt.execution_id, wait.timeout, wait.poll_interval).await?;

    match final_status {
        ExecutionStatus::Succeeded => Ok(()),
        other => bail!("Execution finished with status {:?}", other),
    }
}
