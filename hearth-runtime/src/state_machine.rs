//! Execution lifecycle state machine
//!
//! Transition planning is a pure function of the current status, the
//! latest job poll result, and whether the timeout ceiling has elapsed -
//! independent of any scheduler, so it can be driven identically by an
//! HTTP poll, a CLI loop, or a test.

use hearth_storage::ExecutionFailure;
use serde::{Deserialize, Serialize};

use crate::job_runner::{JobPoll, JobState};

/// Kind of lifecycle workflow run against a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Bring a server up, restoring world data from the latest backup
    Provision,

    /// Snapshot world data, then tear the server down
    Deprovision,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::Provision => "provision",
            WorkflowKind::Deprovision => "deprovision",
        }
    }
}

impl From<WorkflowKind> for String {
    fn from(kind: WorkflowKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::convert::TryFrom<&str> for WorkflowKind {
    type Error = crate::Error;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s {
            "provision" => Ok(WorkflowKind::Provision),
            "deprovision" => Ok(WorkflowKind::Deprovision),
            _ => Err(crate::Error::InvalidState(format!(
                "Unknown workflow kind: {}",
                s
            ))),
        }
    }
}

/// Status of a workflow execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Record created, job dispatched, not yet observed running
    Queued,

    /// The job runner reported the job running
    Running,

    /// Execution succeeded
    Succeeded,

    /// Execution failed
    Failed,

    /// No terminal job signal within the configured ceiling
    TimedOut,
}

impl ExecutionStatus {
    /// Terminal statuses are final; no execution transitions out of them
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Succeeded | ExecutionStatus::Failed | ExecutionStatus::TimedOut
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Succeeded => "succeeded",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::TimedOut => "timed_out",
        }
    }
}

impl From<ExecutionStatus> for String {
    fn from(status: ExecutionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::convert::TryFrom<&str> for ExecutionStatus {
    type Error = crate::Error;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s {
            "queued" => Ok(ExecutionStatus::Queued),
            "running" => Ok(ExecutionStatus::Running),
            "succeeded" => Ok(ExecutionStatus::Succeeded),
            "failed" => Ok(ExecutionStatus::Failed),
            "timed_out" => Ok(ExecutionStatus::TimedOut),
            _ => Err(crate::Error::InvalidState(format!(
                "Unknown execution status: {}",
                s
            ))),
        }
    }
}

/// Next step for an execution, as decided by [`plan_transition`]
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The job was observed running; move QUEUED → RUNNING
    ToRunning,

    /// Finalize with a terminal status, recording failure detail if any
    Finalize {
        status: ExecutionStatus,
        failure: Option<ExecutionFailure>,
    },
}

/// Validate if a status transition is legal
///
/// # Allowed Transitions
///
/// - Queued → Running
/// - Queued → Succeeded, Failed, TimedOut (first observed poll already terminal)
/// - Running → Succeeded, Failed, TimedOut
pub fn is_valid_transition(from: ExecutionStatus, to: ExecutionStatus) -> bool {
    use ExecutionStatus::*;

    matches!(
        (from, to),
        (Queued, Running)
            | (Queued, Succeeded | Failed | TimedOut)
            | (Running, Succeeded | Failed | TimedOut)
    )
}

/// Decide the next transition for a non-terminal execution
///
/// Returns `None` when nothing changes this tick. A terminal `current`
/// always yields `None` - finalization happens exactly once.
///
/// The timeout ceiling applies only in the absence of a terminal job
/// signal: a poll that reports success or failure wins over an elapsed
/// deadline observed in the same tick.
pub fn plan_transition(
    current: ExecutionStatus,
    poll: &JobPoll,
    deadline_exceeded: bool,
) -> Option<Transition> {
    if current.is_terminal() {
        return None;
    }

    match poll.state {
        JobState::Succeeded => Some(Transition::Finalize {
            status: ExecutionStatus::Succeeded,
            failure: None,
        }),
        JobState::Failed => {
            let detail = poll
                .detail
                .clone()
                .unwrap_or_else(|| "job reported failure without detail".to_string());
            Some(Transition::Finalize {
                status: ExecutionStatus::Failed,
                failure: Some(ExecutionFailure::job(detail)),
            })
        }
        JobState::Pending | JobState::Running if deadline_exceeded => {
            Some(Transition::Finalize {
                status: ExecutionStatus::TimedOut,
                failure: Some(ExecutionFailure::timeout(
                    "no terminal job signal within the configured ceiling",
                )),
            })
        }
        JobState::Running if current == ExecutionStatus::Queued => Some(Transition::ToRunning),
        JobState::Pending | JobState::Running => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(state: JobState) -> JobPoll {
        JobPoll {
            state,
            detail: None,
        }
    }

    #[test]
    fn valid_transitions() {
        use ExecutionStatus::*;

        assert!(is_valid_transition(Queued, Running));
        assert!(is_valid_transition(Queued, Succeeded));
        assert!(is_valid_transition(Running, Succeeded));
        assert!(is_valid_transition(Running, Failed));
        assert!(is_valid_transition(Running, TimedOut));
    }

    #[test]
    fn invalid_transitions() {
        use ExecutionStatus::*;

        assert!(!is_valid_transition(Running, Queued));
        assert!(!is_valid_transition(Succeeded, Running));
        assert!(!is_valid_transition(Failed, Running));
        assert!(!is_valid_transition(TimedOut, Queued));
        assert!(!is_valid_transition(Succeeded, Failed));
    }

    #[test]
    fn terminal_current_never_transitions() {
        for status in [
            ExecutionStatus::Succeeded,
            ExecutionStatus::Failed,
            ExecutionStatus::TimedOut,
        ] {
            assert_eq!(plan_transition(status, &poll(JobState::Succeeded), true), None);
        }
    }

    #[test]
    fn queued_moves_to_running_when_job_runs() {
        assert_eq!(
            plan_transition(ExecutionStatus::Queued, &poll(JobState::Running), false),
            Some(Transition::ToRunning)
        );
        // Already running: nothing to do
        assert_eq!(
            plan_transition(ExecutionStatus::Running, &poll(JobState::Running), false),
            None
        );
    }

    #[test]
    fn pending_job_is_a_no_op_before_deadline() {
        assert_eq!(
            plan_transition(ExecutionStatus::Queued, &poll(JobState::Pending), false),
            None
        );
    }

    #[test]
    fn job_success_finalizes_from_queued_or_running() {
        for current in [ExecutionStatus::Queued, ExecutionStatus::Running] {
            assert_eq!(
                plan_transition(current, &poll(JobState::Succeeded), false),
                Some(Transition::Finalize {
                    status: ExecutionStatus::Succeeded,
                    failure: None,
                })
            );
        }
    }

    #[test]
    fn job_failure_carries_detail_verbatim() {
        let result = plan_transition(
            ExecutionStatus::Running,
            &JobPoll {
                state: JobState::Failed,
                detail: Some("container exited with code 137".to_string()),
            },
            false,
        );
        match result {
            Some(Transition::Finalize { status, failure }) => {
                assert_eq!(status, ExecutionStatus::Failed);
                let failure = failure.expect("failure detail expected");
                assert_eq!(failure.kind, "job");
                assert_eq!(failure.message, "container exited with code 137");
            }
            other => panic!("Expected Failed finalization, got {:?}", other),
        }
    }

    #[test]
    fn deadline_without_terminal_signal_times_out() {
        for state in [JobState::Pending, JobState::Running] {
            let result = plan_transition(ExecutionStatus::Running, &poll(state), true);
            match result {
                Some(Transition::Finalize { status, failure }) => {
                    assert_eq!(status, ExecutionStatus::TimedOut);
                    assert_eq!(failure.expect("failure").kind, "timeout");
                }
                other => panic!("Expected TimedOut finalization, got {:?}", other),
            }
        }
    }

    #[test]
    fn terminal_signal_wins_over_elapsed_deadline() {
        assert_eq!(
            plan_transition(ExecutionStatus::Running, &poll(JobState::Succeeded), true),
            Some(Transition::Finalize {
                status: ExecutionStatus::Succeeded,
                failure: None,
            })
        );
    }

    #[test]
    fn status_string_conversion_round_trips() {
        use ExecutionStatus::*;

        for (status, expected) in [
            (Queued, "queued"),
            (Running, "running"),
            (Succeeded, "succeeded"),
            (Failed, "failed"),
            (TimedOut, "timed_out"),
        ] {
            let s: String = status.into();
            assert_eq!(s, expected);
            let recovered: ExecutionStatus = expected.try_into().expect("valid status");
            assert_eq!(status, recovered);
        }
    }

    #[test]
    fn unknown_status_returns_error() {
        let result: std::result::Result<ExecutionStatus, crate::Error> = "cancelled".try_into();
        assert!(matches!(result, Err(crate::Error::InvalidState(_))));
    }

    #[test]
    fn kind_string_conversion_round_trips() {
        for (kind, expected) in [
            (WorkflowKind::Provision, "provision"),
            (WorkflowKind::Deprovision, "deprovision"),
        ] {
            assert_eq!(kind.as_str(), expected);
            let recovered: WorkflowKind = expected.try_into().expect("valid kind");
            assert_eq!(kind, recovered);
        }
    }
}
