//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! vl-cli migrate
//! ```
//!
//! # Migration Files
//!
//! Bridge migrations live in `crates/bridge/migrations/` and are embedded in
//! the `voicelink-bridge` crate at compile time.

use super::{CommandError, connect};

/// Run the bridge database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails, or
/// a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running bridge migrations...");
    voicelink_bridge::db::MIGRATOR.run(&pool).await?;

    tracing::info!("Bridge migrations complete!");
    Ok(())
}
