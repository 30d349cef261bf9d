//! `PostgreSQL` connection setup for the bridge.
//!
//! # Schema: `voicelink`
//!
//! ## Tables
//!
//! - `pending_handshake` - Voice platform authorization requests in flight
//! - `linking_code` - One-time linking codes (SHA-256 keyed)
//! - `bearer_token` - Bearer tokens issued to the voice platform (SHA-256 keyed)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/bridge/migrations/` and run via:
//! ```bash
//! cargo run -p voicelink-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

/// Embedded bridge migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
