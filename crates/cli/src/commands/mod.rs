//! CLI subcommands.
//!
//! # Environment Variables
//!
//! - `BRIDGE_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

pub mod migrate;
pub mod purge;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Credential store error.
    #[error("Store error: {0}")]
    Store(#[from] voicelink_bridge::store::StoreError),
}

/// Load the database URL the bridge itself would use.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("BRIDGE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("BRIDGE_DATABASE_URL"))
}

/// Connect to the bridge database.
async fn connect() -> Result<PgPool, CommandError> {
    let url = database_url()?;
    tracing::info!("Connecting to bridge database...");
    Ok(voicelink_bridge::db::create_pool(&url).await?)
}
