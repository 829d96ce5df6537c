//! # Hearth API
//!
//! HTTP boundary for the lifecycle orchestrator:
//!
//! - `POST /v1/executions` - trigger a provision or deprovision workflow
//! - `GET /v1/servers/{target_id}/status` - latest execution for a target
//! - `POST /v1/executions/{id}/advance` - drive one poll of the job runner
//! - `GET /health` - liveness probe
//!
//! Trigger and status return immediately; callers observe progress by
//! polling, which is what keeps the core free of background schedulers.

pub mod config;
pub mod handler;
pub mod types;

pub use config::ApiConfig;
pub use handler::{advance_handler, health_handler, router, status_handler, trigger_handler, AppState};
