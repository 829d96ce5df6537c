//! Hearth orchestration API service
//!
//! # Configuration
//!
//! Environment variables:
//! - DATABASE_URL - PostgreSQL connection string
//! - PORT - HTTP port (default: 8080)
//! - HEARTH_EXECUTION_TIMEOUT_SECS - execution timeout ceiling (default: 1800)
//! - HEARTH_RUNNER_URL / HEARTH_RUNNER_TOKEN / HEARTH_HMAC_SECRET - job runner
//! - HEARTH_BACKUP_BUCKET - world-data backup bucket handed to jobs

use std::sync::Arc;
use std::time::Duration;

use hearth_api::config::{mask_password, ApiConfig};
use hearth_api::handler::{router, AppState};
use hearth_runner::HttpJobRunner;
use hearth_runtime::{ExecutionTracker, OrchestrationApi, WorkflowEngine};
use hearth_storage::{ExecutionStore, PostgresStorage};
use tokio::signal;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // JSON-formatted logs for the platform's log aggregation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearth_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Hearth orchestration API");

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    info!(
        database_url = %mask_password(&config.database_url),
        port = config.port,
        timeout_seconds = config.execution_timeout.as_secs(),
        "Configuration loaded"
    );

    let storage = match PostgresStorage::new(&config.database_url).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(error = %e, "Failed to initialize storage");
            std::process::exit(1);
        }
    };

    info!("Storage initialized successfully");

    let runner = match HttpJobRunner::new(config.runner.clone()) {
        Ok(r) => Arc::new(r),
        Err(e) => {
            error!(error = %e, "Failed to initialize job runner client");
            std::process::exit(1);
        }
    };

    let store: Arc<dyn ExecutionStore> = storage;
    let engine = WorkflowEngine::new(
        store.clone(),
        runner,
        config.platform.clone(),
        config.engine_config(),
    );
    let api = OrchestrationApi::new(engine, ExecutionTracker::new(store));

    let app = router(AppState { api })
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(RequestBodyLimitLayer::new(256 * 1024)); // trigger payloads are small

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, address = %addr, "Failed to bind server");
            std::process::exit(1);
        }
    };

    info!(address = %addr, "Server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }

    info!("Server shut down gracefully");
}

/// Graceful shutdown signal handler
///
/// Waits for SIGTERM or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl-C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
