//! Runner service contract tests
//!
//! Verify the HTTP contract between the orchestrator client and the
//! job-runner service: request shape, signature header, handle and state
//! mapping, and failure classification.

use hearth_runner::client::SIGNATURE_HEADER;
use hearth_runner::signing::verify_signature;
use hearth_runner::{HttpJobRunner, RunnerConfig};
use hearth_runtime::job_runner::{JobRunner, JobSpec, JobState, ResourceLimits, RunnerError};
use std::collections::BTreeMap;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const HMAC_SECRET: &str = "0123456789abcdef0123456789abcdef";

fn client_for(server: &MockServer) -> HttpJobRunner {
    HttpJobRunner::new(RunnerConfig {
        base_url: server.uri(),
        auth_token: "test-token".to_string(),
        hmac_secret: HMAC_SECRET.to_string(),
        request_timeout_secs: 5,
    })
    .expect("valid config")
}

fn deploy_spec() -> JobSpec {
    let mut environment = BTreeMap::new();
    environment.insert("HEARTH_TARGET_ID".to_string(), "srv-1".to_string());
    environment.insert("HEARTH_BACKUP_BUCKET".to_string(), "hearth-backups".to_string());

    JobSpec {
        command: vec!["hearth-deployer".to_string(), "up".to_string()],
        environment,
        resource_limits: ResourceLimits::default(),
    }
}

#[tokio::test]
async fn submit_posts_signed_spec_and_returns_handle() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/jobs"))
        .and(header_exists("authorization"))
        .and(header_exists(SIGNATURE_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "job_id": "job-4711"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let handle = client.submit(&deploy_spec()).await.expect("submit succeeds");
    assert_eq!(handle, "job-4711");

    // The signature must verify against the body actually sent
    let requests = server.received_requests().await.expect("recorded requests");
    let request: &Request = &requests[0];
    let signature = request
        .headers
        .get(SIGNATURE_HEADER)
        .expect("signature header present")
        .to_str()
        .expect("ascii signature");
    assert!(verify_signature(&request.body, signature, HMAC_SECRET).expect("verify"));

    // Body carries the full job spec
    let body: serde_json::Value = serde_json::from_slice(&request.body).expect("json body");
    assert_eq!(body["command"][0], "hearth-deployer");
    assert_eq!(body["environment"]["HEARTH_TARGET_ID"], "srv-1");
    assert_eq!(body["resource_limits"]["memory_mib"], 1024);
}

#[tokio::test]
async fn queue_rejection_maps_to_runner_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/jobs"))
        .respond_with(ResponseTemplate::new(429).set_body_string("queue at capacity"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.submit(&deploy_spec()).await.unwrap_err();
    match err {
        RunnerError::RunnerApi(msg) => assert!(msg.contains("429")),
        other => panic!("Expected RunnerApi error, got {:?}", other),
    }
}

#[tokio::test]
async fn auth_rejection_maps_to_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/jobs"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.submit(&deploy_spec()).await.unwrap_err();
    assert!(matches!(err, RunnerError::Authentication(_)));
}

#[tokio::test]
async fn poll_maps_each_reported_state() {
    let server = MockServer::start().await;

    for (wire, expected) in [
        ("pending", JobState::Pending),
        ("running", JobState::Running),
        ("succeeded", JobState::Succeeded),
        ("failed", JobState::Failed),
    ] {
        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/job-4711"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "state": wire,
                "detail": null
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let poll = client.poll("job-4711").await.expect("poll succeeds");
        assert_eq!(poll.state, expected);
    }
}

#[tokio::test]
async fn poll_failure_detail_is_passed_through_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/jobs/job-4711"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "state": "failed",
            "detail": "container exited with code 137"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let poll = client.poll("job-4711").await.expect("poll succeeds");
    assert_eq!(poll.state, JobState::Failed);
    assert_eq!(poll.detail.as_deref(), Some("container exited with code 137"));
}

#[tokio::test]
async fn unknown_job_state_is_an_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/jobs/job-4711"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "state": "paused",
            "detail": null
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.poll("job-4711").await.unwrap_err();
    assert!(matches!(err, RunnerError::RunnerApi(_)));
}
