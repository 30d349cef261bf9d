//! Expired record purge command.
//!
//! The running bridge sweeps its own store periodically. This command is for
//! deployments that run the sweeper rarely or not at all.
//!
//! # Usage
//!
//! ```bash
//! vl-cli purge
//! ```

use voicelink_bridge::store::{CredentialStore, PgStore};
use voicelink_core::{Clock, SystemClock};

use super::{CommandError, connect};

/// Delete every expired handshake, linking code and bearer token.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the store fails.
pub async fn run() -> Result<(), CommandError> {
    let store = PgStore::new(connect().await?);

    let stats = store.purge_expired(SystemClock.now()).await?;

    tracing::info!(
        handshakes = stats.handshakes,
        linking_codes = stats.linking_codes,
        bearer_tokens = stats.bearer_tokens,
        "Purged {} expired records",
        stats.total()
    );
    Ok(())
}
