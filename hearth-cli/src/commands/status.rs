//! Status command

use anyhow::Result;
use hearth_runtime::{ExecutionStatus, ExecutionTracker};
use hearth_storage::{ExecutionStore, TargetId};

use crate::context::connect_storage;

/// Show the latest execution for a server, plus recent history.
///
/// Prints the most recent execution of either workflow kind, terminal or
/// not, with its error detail when present.
pub async fn execute(target_id: &str, database_url: &str) -> Result<()> {
    let storage = connect_storage(database_url).await?;
    let tracker = ExecutionTracker::new(storage.clone());
    let target = TargetId::new(target_id);

    let Some(execution) = tracker.latest(&target).await? else {
        println!("No executions for target {}", target_id);
        return Ok(());
    };

    let status: ExecutionStatus = execution.status.as_str().try_into()?;

    println!("Target: {}", target_id);
    println!("Execution: {}", execution.id);
    println!("Workflow: {}", execution.kind);
    println!("Status: {:?}", status);
    println!("Started: {}", execution.started_at);
    if let Some(ended) = execution.ended_at {
        println!("Ended: {}", ended);
    }
    if let Some(error) = execution.error {
        println!("Error ({}): {}", error.0.kind, error.0.message);
    }

    let history = storage.list_for_target(&target, 5, 0).await?;
    if history.len() > 1 {
        println!();
        println!("Recent executions:");
        for entry in history {
            let ended = entry
                .ended_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {}  {:12} {:10} started {}  ended {}",
                entry.id, entry.kind, entry.status, entry.started_at, ended
            );
        }
    }

    Ok(())
}
