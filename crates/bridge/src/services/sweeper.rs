//! Background reclamation of expired records.
//!
//! Expiry is always enforced when a record is read; the sweeper only keeps
//! the store from growing without bound.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use voicelink_core::Clock;

use crate::store::CredentialStore;

/// Spawn a task that purges expired records every `interval`.
///
/// The task runs until the returned handle is aborted.
#[must_use]
pub fn spawn_sweeper(
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match store.purge_expired(clock.now()).await {
                Ok(stats) if stats.total() > 0 => {
                    tracing::info!(
                        handshakes = stats.handshakes,
                        linking_codes = stats.linking_codes,
                        bearer_tokens = stats.bearer_tokens,
                        "Purged expired records"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to purge expired records");
                }
            }
        }
    })
}
