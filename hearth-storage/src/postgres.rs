//! PostgreSQL storage implementation

use crate::{models::ExecutionModel, store::ExecutionStore, Result, TargetId};
use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use std::time::Instant;
use tracing::{error, instrument, warn};
use uuid::Uuid;

/// Configuration for the PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: Option<u64>,
    pub max_lifetime_secs: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 30,
            idle_timeout_secs: None,
            max_lifetime_secs: None,
        }
    }
}

/// PostgreSQL storage backend
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Create a new PostgreSQL storage instance with default configuration
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_pool_config(database_url, PoolConfig::default()).await
    }

    /// Create a new PostgreSQL storage instance using a PoolConfig
    pub async fn with_pool_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        if config.min_connections == 0 {
            return Err(crate::Error::ValidationError(
                "min_connections must be > 0".to_string(),
            ));
        }
        if config.max_connections == 0 || config.max_connections < config.min_connections {
            return Err(crate::Error::ValidationError(
                "max_connections must be >= min_connections and > 0".to_string(),
            ));
        }

        let mut opts = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.acquire_timeout_secs));

        if let Some(idle) = config.idle_timeout_secs {
            opts = opts.idle_timeout(std::time::Duration::from_secs(idle));
        }
        if let Some(max_life) = config.max_lifetime_secs {
            opts = opts.max_lifetime(std::time::Duration::from_secs(max_life));
        }

        let pool = opts.connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Execute a closure within a transaction
    ///
    /// Commits on success, rolls back on error. Slow operations (>100ms)
    /// are logged.
    async fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut Transaction<'_, Postgres>) -> BoxFuture<'c, Result<T>> + Send,
        T: Send,
    {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        let result = match f(&mut tx).await {
            Ok(result) => {
                tx.commit().await?;
                Ok(result)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        };

        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            warn!(
                duration_ms = elapsed.as_millis(),
                "Slow database operation detected"
            );
        }

        result
    }

    // ========== Input Validation Helpers ==========

    /// Validate pagination parameters
    fn validate_pagination_params(limit: i64, offset: i64) -> Result<()> {
        if limit <= 0 {
            return Err(crate::Error::ValidationError(
                "Limit must be greater than 0".to_string(),
            ));
        }
        if limit > 1000 {
            return Err(crate::Error::ValidationError(
                "Limit cannot exceed 1000".to_string(),
            ));
        }
        if offset < 0 {
            return Err(crate::Error::ValidationError(
                "Offset must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate execution status
    fn validate_execution_status(status: &str) -> Result<()> {
        match status {
            "queued" | "running" | "succeeded" | "failed" | "timed_out" => Ok(()),
            _ => Err(crate::Error::ValidationError(format!(
                "Invalid execution status: {}",
                status
            ))),
        }
    }

    /// Validate workflow kind
    fn validate_workflow_kind(kind: &str) -> Result<()> {
        match kind {
            "provision" | "deprovision" => Ok(()),
            _ => Err(crate::Error::ValidationError(format!(
                "Invalid workflow kind: {}",
                kind
            ))),
        }
    }

    /// Validate that a string field is not empty
    fn validate_non_empty_string(value: &str, field_name: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(crate::Error::ValidationError(format!(
                "{} cannot be empty",
                field_name
            )));
        }
        Ok(())
    }

    // ========== Execution Operations ==========

    /// Insert a new execution unless the target already has an active one (atomic)
    ///
    /// The single-active-execution invariant is enforced by a partial unique
    /// index on `target_id WHERE status IN ('queued', 'running')`; the insert
    /// uses `ON CONFLICT DO NOTHING` against that index, so the conflict check
    /// and the record creation are one statement with no race window.
    #[instrument(
        skip(self, execution),
        fields(
            db.system = "postgresql",
            db.operation = "INSERT",
            db.sql.table = "executions",
            execution_id = %execution.id,
            target_id = %execution.target_id,
            kind = %execution.kind
        )
    )]
    pub async fn insert_execution_if_idle(&self, execution: &ExecutionModel) -> Result<()> {
        Self::validate_execution_status(&execution.status)?;
        Self::validate_workflow_kind(&execution.kind)?;
        Self::validate_non_empty_string(&execution.target_id, "Target ID")?;
        if !execution.is_active() {
            return Err(crate::Error::ValidationError(
                "New executions must start in an active status".to_string(),
            ));
        }

        let execution = execution.clone();

        self.with_transaction(|tx| {
            Box::pin(async move {
                let result = sqlx::query(
                    r#"
                    INSERT INTO executions (
                        id, kind, target_id, input, status, job_handle, error,
                        started_at, ended_at, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    ON CONFLICT (target_id)
                    WHERE status IN ('queued', 'running')
                    DO NOTHING
                    "#,
                )
                .bind(execution.id)
                .bind(&execution.kind)
                .bind(&execution.target_id)
                .bind(&execution.input)
                .bind(&execution.status)
                .bind(&execution.job_handle)
                .bind(&execution.error)
                .bind(execution.started_at)
                .bind(execution.ended_at)
                .bind(execution.created_at)
                .bind(execution.updated_at)
                .execute(&mut **tx)
                .await
                .map_err(map_db_error)?;

                if result.rows_affected() == 0 {
                    warn!(
                        target_id = %execution.target_id,
                        "Rejected trigger: target already has an active execution"
                    );
                    return Err(crate::Error::AlreadyActive(execution.target_id.clone()));
                }

                tracing::debug!(execution_id = %execution.id, "Created execution");
                Ok(())
            })
        })
        .await
    }

    /// Get execution by ID
    pub async fn get_execution(&self, id: Uuid) -> Result<ExecutionModel> {
        self.with_transaction(|tx| {
            Box::pin(async move {
                let execution = sqlx::query_as::<_, ExecutionModel>(
                    r#"
                    SELECT id, kind, target_id, input, status, job_handle, error,
                           started_at, ended_at, created_at, updated_at
                    FROM executions
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(map_db_error)?
                .ok_or_else(|| crate::Error::NotFound(format!("Execution {}", id)))?;

                Ok(execution)
            })
        })
        .await
    }

    /// Update an existing execution
    #[instrument(
        skip(self, execution),
        fields(
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.sql.table = "executions",
            execution_id = %execution.id,
            status = %execution.status
        )
    )]
    pub async fn update_execution(&self, execution: &ExecutionModel) -> Result<()> {
        Self::validate_execution_status(&execution.status)?;
        let execution = execution.clone();

        self.with_transaction(|tx| {
            Box::pin(async move {
                let result = sqlx::query(
                    r#"
                    UPDATE executions
                    SET status = $2,
                        job_handle = $3,
                        error = $4,
                        ended_at = $5,
                        updated_at = $6
                    WHERE id = $1
                    "#,
                )
                .bind(execution.id)
                .bind(&execution.status)
                .bind(&execution.job_handle)
                .bind(&execution.error)
                .bind(execution.ended_at)
                .bind(execution.updated_at)
                .execute(&mut **tx)
                .await
                .map_err(map_db_error)?;

                if result.rows_affected() == 0 {
                    return Err(crate::Error::NotFound(format!(
                        "Execution {}",
                        execution.id
                    )));
                }

                Ok(())
            })
        })
        .await
    }

    /// Latest execution for a target, regardless of kind or status
    ///
    /// Selection is a single max over `started_at`; clock skew between
    /// writers is tolerated by ordering on the stored column only.
    #[instrument(skip(self), fields(target_id = %target_id.as_str()))]
    pub async fn latest_execution(&self, target_id: &TargetId) -> Result<Option<ExecutionModel>> {
        let target = target_id.as_str().to_string();

        self.with_transaction(|tx| {
            Box::pin(async move {
                let execution = sqlx::query_as::<_, ExecutionModel>(
                    r#"
                    SELECT id, kind, target_id, input, status, job_handle, error,
                           started_at, ended_at, created_at, updated_at
                    FROM executions
                    WHERE target_id = $1
                    ORDER BY started_at DESC, id DESC
                    LIMIT 1
                    "#,
                )
                .bind(&target)
                .fetch_optional(&mut **tx)
                .await
                .map_err(map_db_error)?;

                Ok(execution)
            })
        })
        .await
    }

    /// List executions for a target with pagination, most recent first
    #[instrument(skip(self), fields(target_id = %target_id.as_str()))]
    pub async fn list_target_executions(
        &self,
        target_id: &TargetId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ExecutionModel>> {
        Self::validate_pagination_params(limit, offset)?;
        let target = target_id.as_str().to_string();

        self.with_transaction(|tx| {
            Box::pin(async move {
                let executions = sqlx::query_as::<_, ExecutionModel>(
                    r#"
                    SELECT id, kind, target_id, input, status, job_handle, error,
                           started_at, ended_at, created_at, updated_at
                    FROM executions
                    WHERE target_id = $1
                    ORDER BY started_at DESC, id DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(&target)
                .bind(limit)
                .bind(offset)
                .fetch_all(&mut **tx)
                .await
                .map_err(map_db_error)?;

                Ok(executions)
            })
        })
        .await
    }

    /// Health check for readiness probes
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_db_error)
    }
}

#[async_trait]
impl ExecutionStore for PostgresStorage {
    async fn insert_if_idle(&self, execution: &ExecutionModel) -> Result<()> {
        self.insert_execution_if_idle(execution).await
    }

    async fn get(&self, id: Uuid) -> Result<ExecutionModel> {
        self.get_execution(id).await
    }

    async fn update(&self, execution: &ExecutionModel) -> Result<()> {
        self.update_execution(execution).await
    }

    async fn latest(&self, target_id: &TargetId) -> Result<Option<ExecutionModel>> {
        self.latest_execution(target_id).await
    }

    async fn list_for_target(
        &self,
        target_id: &TargetId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ExecutionModel>> {
        self.list_target_executions(target_id, limit, offset).await
    }
}

/// Map sqlx errors to storage domain errors, preserving retry semantics
fn map_db_error(err: sqlx::Error) -> crate::Error {
    match &err {
        sqlx::Error::PoolTimedOut => {
            error!(error = %err, "Connection pool timed out");
            return crate::Error::PoolExhausted("Connection pool timed out".to_string());
        }
        sqlx::Error::PoolClosed => {
            error!(error = %err, "Connection pool closed");
            return crate::Error::ConnectionFailed("Connection pool closed".to_string());
        }
        _ => {}
    }

    if let sqlx::Error::Database(db_err) = &err {
        if let Some(code) = db_err.code().as_deref() {
            match code {
                // unique_violation
                "23505" => {
                    warn!(
                        error_code = code,
                        message = db_err.message(),
                        "Unique constraint violation"
                    );
                    return crate::Error::Internal(db_err.message().to_string());
                }
                // not_null_violation / check_violation: bad record shape
                "23502" | "23514" => {
                    warn!(
                        error_code = code,
                        message = db_err.message(),
                        "Constraint violation"
                    );
                    return crate::Error::ValidationError(db_err.message().to_string());
                }
                _ => {}
            }
        }
    }

    crate::Error::Database(err)
}
