//! Mock implementations for external services
//!
//! The job runner is the orchestrator's only out-of-process dependency
//! during a lifecycle test, so the mock scripts its poll responses: each
//! `poll` consumes the next scripted result, falling back to `running`
//! once the script is exhausted.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use hearth_runtime::job_runner::{
    JobPoll, JobRunner, JobSpec, JobState, RunnerError, RunnerResult,
};

/// Scripted job runner for lifecycle tests
///
/// # Example
///
/// ```
/// use hearth_tests::MockJobRunner;
/// use hearth_runtime::job_runner::{JobPoll, JobState};
///
/// let runner = MockJobRunner::new();
/// runner.script_poll(JobPoll { state: JobState::Succeeded, detail: None });
/// ```
pub struct MockJobRunner {
    reject_submissions_with: Mutex<Option<String>>,
    one_shot_rejections: Mutex<VecDeque<String>>,
    submitted: Mutex<Vec<JobSpec>>,
    polls: Mutex<VecDeque<JobPoll>>,
    handle_counter: AtomicU64,
}

impl MockJobRunner {
    /// Runner that accepts every submission and reports jobs running
    pub fn new() -> Self {
        Self {
            reject_submissions_with: Mutex::new(None),
            one_shot_rejections: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            polls: Mutex::new(VecDeque::new()),
            handle_counter: AtomicU64::new(0),
        }
    }

    /// Reject only the next submission, then accept again
    pub fn reject_next_submission(&self, reason: impl Into<String>) {
        self.one_shot_rejections
            .lock()
            .expect("reject lock")
            .push_back(reason.into());
    }

    /// Runner whose queue rejects every submission
    pub fn rejecting(reason: impl Into<String>) -> Self {
        let runner = Self::new();
        *runner
            .reject_submissions_with
            .lock()
            .expect("reject lock") = Some(reason.into());
        runner
    }

    /// Append one scripted poll result
    pub fn script_poll(&self, poll: JobPoll) {
        self.polls.lock().expect("poll lock").push_back(poll);
    }

    /// Append a scripted terminal result
    pub fn script_state(&self, state: JobState) {
        self.script_poll(JobPoll {
            state,
            detail: None,
        });
    }

    /// Job specs submitted so far, in order
    pub fn submitted(&self) -> Vec<JobSpec> {
        self.submitted.lock().expect("submitted lock").clone()
    }

    /// Number of submissions accepted
    pub fn submission_count(&self) -> usize {
        self.submitted.lock().expect("submitted lock").len()
    }
}

impl Default for MockJobRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobRunner for MockJobRunner {
    async fn submit(&self, spec: &JobSpec) -> RunnerResult<String> {
        if let Some(reason) = self
            .one_shot_rejections
            .lock()
            .expect("reject lock")
            .pop_front()
        {
            return Err(RunnerError::RunnerApi(reason));
        }
        if let Some(reason) = self
            .reject_submissions_with
            .lock()
            .expect("reject lock")
            .clone()
        {
            return Err(RunnerError::RunnerApi(reason));
        }

        self.submitted.lock().expect("submitted lock").push(spec.clone());
        let n = self.handle_counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("job-{:04}", n))
    }

    async fn poll(&self, _handle: &str) -> RunnerResult<JobPoll> {
        let next = self.polls.lock().expect("poll lock").pop_front();
        Ok(next.unwrap_or(JobPoll {
            state: JobState::Running,
            detail: None,
        }))
    }
}
