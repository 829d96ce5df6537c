//! HTTP handlers for the orchestration API

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::types::{ErrorResponse, HealthResponse, TriggerRequest, TriggerResponse};
use hearth_runtime::{ExecutionStatusView, OrchestrationApi};
use hearth_storage::TargetId;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub api: OrchestrationApi,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/executions", post(trigger_handler))
        .route("/v1/executions/{execution_id}/advance", post(advance_handler))
        .route("/v1/servers/{target_id}/status", get(status_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Trigger a lifecycle workflow
///
/// Responds 202 with the execution receipt; the workflow itself runs for
/// minutes and is observed via the status endpoint.
pub async fn trigger_handler(
    State(state): State<AppState>,
    Json(request): Json<TriggerRequest>,
) -> Result<(StatusCode, Json<TriggerResponse>), ApiError> {
    let target_id = TargetId::new(request.target_id.clone());

    let receipt = state
        .api
        .trigger(request.workflow_kind, &target_id, request.input)
        .await?;

    info!(
        execution_id = %receipt.execution_id,
        target_id = %target_id,
        kind = request.workflow_kind.as_str(),
        "Execution triggered"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            execution_id: receipt.execution_id,
            status: receipt.status,
        }),
    ))
}

/// Latest execution status for a target
pub async fn status_handler(
    State(state): State<AppState>,
    Path(target_id): Path<String>,
) -> Result<Json<ExecutionStatusView>, ApiError> {
    let view = state.api.status(&TargetId::new(target_id)).await?;
    Ok(Json(view))
}

/// Drive one execution forward by a single job-runner poll
pub async fn advance_handler(
    State(state): State<AppState>,
    Path(execution_id): Path<Uuid>,
) -> Result<Json<ExecutionStatusView>, ApiError> {
    let view = state.api.advance(execution_id).await?;
    Ok(Json(view))
}

/// Liveness probe
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// HTTP mapping of runtime errors
#[derive(Debug)]
pub struct ApiError(hearth_runtime::Error);

impl From<hearth_runtime::Error> for ApiError {
    fn from(e: hearth_runtime::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use hearth_runtime::Error;

        let (status, message) = match &self.0 {
            Error::Conflict(target) => (
                StatusCode::CONFLICT,
                format!("An execution is already in progress for target {}", target),
            ),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::Submission(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Job dispatch failed: {}", msg),
            ),
            Error::Runner(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Job runner unavailable: {}", msg),
            ),
            Error::InvalidState(_) | Error::Internal(_) => {
                warn!(error = %self.0, "Internal error serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
