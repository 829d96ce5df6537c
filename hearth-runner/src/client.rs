//! Job-runner service client
//!
//! Submits containerized jobs to the runner service over HTTP and polls
//! their state. Requests carry a bearer token and an HMAC signature over
//! the body; the client never retries - retry policy belongs to callers.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, instrument};

use crate::signing::sign_payload;
use crate::{Error, Result};
use hearth_runtime::job_runner::{JobPoll, JobRunner, JobSpec, JobState, RunnerError, RunnerResult};

/// Signature header checked by the runner service
pub const SIGNATURE_HEADER: &str = "X-Hearth-Signature";

/// Configuration for the runner service client
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Base URL of the runner service, e.g. `https://runner.internal:8443`
    pub base_url: String,

    /// Bearer token presented on every request
    pub auth_token: String,

    /// Shared secret for HMAC payload signing
    pub hmac_secret: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base_url cannot be empty".to_string()));
        }
        if self.auth_token.trim().is_empty() {
            return Err(Error::Config("auth_token cannot be empty".to_string()));
        }
        if self.hmac_secret.len() < 32 {
            return Err(Error::Config(
                "hmac_secret must be at least 32 bytes".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    state: String,
    detail: Option<String>,
}

/// HTTP implementation of the job runner boundary
pub struct HttpJobRunner {
    base_url: String,
    auth_token: String,
    hmac_secret: String,
    http_client: reqwest::Client,
}

impl HttpJobRunner {
    /// Create a new client, validating configuration up front
    pub fn new(config: RunnerConfig) -> Result<Self> {
        config.validate()?;

        // Bounded client timeout so a wedged runner cannot hang callers
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token,
            hmac_secret: config.hmac_secret,
            http_client,
        })
    }

    /// Submit a job to the runner service
    ///
    /// # Errors
    ///
    /// - 401/403 → [`Error::Auth`]
    /// - 429 and 5xx (queue or capacity rejection) → [`Error::Api`]
    /// - transport failures → [`Error::Http`]
    #[instrument(skip(self, spec), fields(command = ?spec.command))]
    pub async fn submit_job(&self, spec: &JobSpec) -> Result<String> {
        let body = serde_json::to_vec(spec)
            .map_err(|e| Error::Internal(format!("Failed to serialize job spec: {}", e)))?;
        let signature = sign_payload(&body, &self.hmac_secret)?;

        let url = format!("{}/v1/jobs", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .header("Content-Type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(status = %status, detail = %detail, "Job submission rejected");
            return Err(Self::classify_http_failure(status, &detail));
        }

        let submitted: SubmitResponse = response
            .json()
            .await
            .map_err(|e| Error::Api(format!("Malformed submit response: {}", e)))?;

        tracing::debug!(job_id = %submitted.job_id, "Job submitted");
        Ok(submitted.job_id)
    }

    /// Poll a job's current state by handle
    #[instrument(skip(self))]
    pub async fn poll_job(&self, handle: &str) -> Result<JobPoll> {
        let url = format!("{}/v1/jobs/{}", self.base_url, handle);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(status = %status, detail = %detail, "Job poll rejected");
            return Err(Self::classify_http_failure(status, &detail));
        }

        let poll: JobStatusResponse = response
            .json()
            .await
            .map_err(|e| Error::Api(format!("Malformed poll response: {}", e)))?;

        let state = match poll.state.as_str() {
            "pending" => JobState::Pending,
            "running" => JobState::Running,
            "succeeded" => JobState::Succeeded,
            "failed" => JobState::Failed,
            other => {
                return Err(Error::Api(format!("Unknown job state: {}", other)));
            }
        };

        Ok(JobPoll {
            state,
            detail: poll.detail,
        })
    }

    fn classify_http_failure(status: reqwest::StatusCode, detail: &str) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Error::Auth(format!("{}: {}", status, detail));
        }
        Error::Api(format!("{}: {}", status, detail))
    }
}

#[async_trait]
impl JobRunner for HttpJobRunner {
    async fn submit(&self, spec: &JobSpec) -> RunnerResult<String> {
        self.submit_job(spec).await.map_err(map_runner_error)
    }

    async fn poll(&self, handle: &str) -> RunnerResult<JobPoll> {
        self.poll_job(handle).await.map_err(map_runner_error)
    }
}

/// Map client errors into the engine's runner-boundary taxonomy
fn map_runner_error(e: Error) -> RunnerError {
    match e {
        Error::Auth(msg) => RunnerError::Authentication(msg),
        Error::Config(msg) => RunnerError::Configuration(msg),
        Error::Api(msg) => RunnerError::RunnerApi(msg),
        Error::Http(e) => RunnerError::RunnerApi(format!("Transport error: {}", e)),
        Error::Internal(msg) => RunnerError::Internal(msg),
    }
}
