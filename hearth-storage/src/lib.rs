//! # Hearth Storage
//!
//! Durable execution records for the Hearth server lifecycle orchestrator.
//! Executions are append-then-finalize-once: the workflow engine is the
//! only writer of status transitions.

pub mod memory;
pub mod migrations;
pub mod models;
pub mod postgres;
pub mod store;
pub mod target;

// Re-export commonly used types
pub use memory::MemoryStore;
pub use models::{ExecutionFailure, ExecutionModel};
pub use postgres::PostgresStorage;
pub use store::ExecutionStore;
pub use target::TargetId;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for storage operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Active execution already exists for target: {0}")]
    AlreadyActive(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
