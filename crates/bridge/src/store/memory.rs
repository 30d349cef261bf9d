//! In-memory credential store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use voicelink_core::{BearerToken, HandshakeId, LinkingCode};

use super::{
    BearerGrant, CredentialStore, LinkingGrant, PendingHandshake, PurgeStats, StoreError,
};

/// Credential store backed by concurrent hash maps.
///
/// Every record lives only as long as the process. `DashMap::remove` takes
/// the shard write lock, so a take is atomic per key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    handshakes: DashMap<HandshakeId, PendingHandshake>,
    linking_codes: DashMap<LinkingCode, LinkingGrant>,
    bearer_tokens: DashMap<BearerToken, BearerGrant>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Remove every entry for which `expired` holds and return how many went.
fn purge<K, V>(map: &DashMap<K, V>, expired: impl Fn(&V) -> bool) -> u64
where
    K: Eq + std::hash::Hash,
{
    let mut removed = 0;
    map.retain(|_, value| {
        let keep = !expired(value);
        if !keep {
            removed += 1;
        }
        keep
    });
    removed
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_handshake(&self, handshake: PendingHandshake) -> Result<(), StoreError> {
        self.handshakes.insert(handshake.id, handshake);
        Ok(())
    }

    async fn get_handshake(
        &self,
        id: &HandshakeId,
    ) -> Result<Option<PendingHandshake>, StoreError> {
        Ok(self.handshakes.get(id).map(|entry| entry.value().clone()))
    }

    async fn take_handshake(
        &self,
        id: &HandshakeId,
    ) -> Result<Option<PendingHandshake>, StoreError> {
        Ok(self.handshakes.remove(id).map(|(_, handshake)| handshake))
    }

    async fn insert_linking_code(
        &self,
        code: &LinkingCode,
        grant: LinkingGrant,
    ) -> Result<(), StoreError> {
        self.linking_codes.insert(code.clone(), grant);
        Ok(())
    }

    async fn take_linking_code(
        &self,
        code: &LinkingCode,
    ) -> Result<Option<LinkingGrant>, StoreError> {
        Ok(self.linking_codes.remove(code).map(|(_, grant)| grant))
    }

    async fn insert_bearer_token(
        &self,
        token: &BearerToken,
        grant: BearerGrant,
    ) -> Result<(), StoreError> {
        self.bearer_tokens.insert(token.clone(), grant);
        Ok(())
    }

    async fn get_bearer_token(
        &self,
        token: &BearerToken,
    ) -> Result<Option<BearerGrant>, StoreError> {
        Ok(self.bearer_tokens.get(token).map(|entry| entry.value().clone()))
    }

    async fn delete_bearer_token(&self, token: &BearerToken) -> Result<bool, StoreError> {
        Ok(self.bearer_tokens.remove(token).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeStats, StoreError> {
        Ok(PurgeStats {
            handshakes: purge(&self.handshakes, |h| h.is_expired(now)),
            linking_codes: purge(&self.linking_codes, |g| g.is_expired(now)),
            bearer_tokens: purge(&self.bearer_tokens, |g| g.is_expired(now)),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
