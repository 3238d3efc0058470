//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! shopfloor migrate
//! ```
//!
//! Migrations live in `crates/api/migrations/` and are embedded at build time.

use std::time::Duration;

use thiserror::Error;

use super::CommandError;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply every pending migration.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = super::database_url()?;

    tracing::info!("Connecting to database...");
    let pool = shopfloor_api::db::create_pool(&database_url, Duration::from_secs(10)).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
