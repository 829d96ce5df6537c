//! Engine configuration

use std::time::Duration;

/// Default timeout ceiling for a non-terminal execution.
///
/// Provisioning an instance takes minutes; anything past half an hour
/// without a terminal job signal is treated as lost.
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 1800;

/// Workflow engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ceiling on an execution's non-terminal duration. The first
    /// `advance` call after the ceiling elapses finalizes the execution
    /// TIMED_OUT; the underlying job is not cancelled.
    pub execution_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            execution_timeout: Duration::from_secs(DEFAULT_EXECUTION_TIMEOUT_SECS),
        }
    }
}

impl EngineConfig {
    pub fn with_execution_timeout(timeout: Duration) -> Self {
        Self {
            execution_timeout: timeout,
        }
    }
}
