//! Migrate command

use anyhow::{Context, Result};
use tracing::info;

use crate::context::connect_storage;

/// Apply all pending database migrations.
pub async fn execute(database_url: &str) -> Result<()> {
    let storage = connect_storage(database_url).await?;

    hearth_storage::migrations::run_migrations(storage.pool())
        .await
        .context("Failed to run migrations")?;

    info!("Migrations applied");
    Ok(())
}
