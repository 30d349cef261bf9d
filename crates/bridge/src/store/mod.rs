//! Credential store: the only owner of handshake, linking code and bearer
//! token records.
//!
//! # Backends
//!
//! - [`MemoryStore`] - `DashMap` per record kind. Links are lost on restart.
//! - [`PgStore`] - `PostgreSQL` tables in the `voicelink` schema. Linking
//!   codes and bearer tokens are keyed by their SHA-256 digest.
//!
//! Both backends implement `take_*` as a single atomic step per key, so two
//! concurrent takes of the same record can never both succeed.
//!
//! Records are returned as stored. Expiry is judged by the caller against
//! its [`Clock`](voicelink_core::Clock); [`CredentialStore::purge_expired`]
//! only reclaims space.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;
use voicelink_core::{BearerToken, HandshakeId, LinkingCode, StorefrontCredential};

/// Errors that can occur in a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

// =============================================================================
// Records
// =============================================================================

/// A voice platform authorization request waiting for the storefront
/// consent screen to come back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHandshake {
    /// Correlation id, carried inside the signed correlation token
    pub id: HandshakeId,
    /// Voice platform client that started the handshake
    pub client_id: String,
    /// Where the human is sent back to, already checked against the allowlist
    pub redirect_uri: Url,
    /// Voice platform nonce, echoed back verbatim
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingHandshake {
    /// Whether the handshake has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// What a linking code stands for until it is redeemed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkingGrant {
    pub credential: StorefrontCredential,
    pub state: String,
    pub redirect_uri: Url,
    pub client_id: String,
    pub expires_at: DateTime<Utc>,
}

impl LinkingGrant {
    /// Whether the linking code has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// What a bearer token stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerGrant {
    pub credential: StorefrontCredential,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl BearerGrant {
    /// Whether the bearer token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Number of records removed by [`CredentialStore::purge_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub handshakes: u64,
    pub linking_codes: u64,
    pub bearer_tokens: u64,
}

impl PurgeStats {
    /// Total records removed.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.handshakes + self.linking_codes + self.bearer_tokens
    }
}

// =============================================================================
// Store Trait
// =============================================================================

/// Storage primitives for the account-linking records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Store a new pending handshake.
    async fn insert_handshake(&self, handshake: PendingHandshake) -> Result<(), StoreError>;

    /// Fetch a pending handshake without consuming it.
    async fn get_handshake(&self, id: &HandshakeId)
    -> Result<Option<PendingHandshake>, StoreError>;

    /// Atomically fetch and delete a pending handshake.
    async fn take_handshake(
        &self,
        id: &HandshakeId,
    ) -> Result<Option<PendingHandshake>, StoreError>;

    /// Store a freshly issued linking code.
    async fn insert_linking_code(
        &self,
        code: &LinkingCode,
        grant: LinkingGrant,
    ) -> Result<(), StoreError>;

    /// Atomically fetch and delete a linking code.
    async fn take_linking_code(&self, code: &LinkingCode)
    -> Result<Option<LinkingGrant>, StoreError>;

    /// Store a freshly minted bearer token.
    async fn insert_bearer_token(
        &self,
        token: &BearerToken,
        grant: BearerGrant,
    ) -> Result<(), StoreError>;

    /// Fetch a bearer token.
    async fn get_bearer_token(&self, token: &BearerToken)
    -> Result<Option<BearerGrant>, StoreError>;

    /// Delete a bearer token. Returns whether it existed.
    async fn delete_bearer_token(&self, token: &BearerToken) -> Result<bool, StoreError>;

    /// Delete every record that has expired at `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeStats, StoreError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    #![allow(clippy::unwrap_used)]

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use secrecy::SecretString;
    use url::Url;
    use voicelink_core::{HandshakeId, ShopDomain, StorefrontCredential};

    use super::{BearerGrant, LinkingGrant, PendingHandshake};

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    pub fn credential() -> StorefrontCredential {
        StorefrontCredential::new(
            ShopDomain::parse("demo.example").unwrap(),
            SecretString::from("shpat_demo_secret"),
            "unauthenticated_read_product_listings",
        )
    }

    pub fn handshake(now: DateTime<Utc>) -> PendingHandshake {
        PendingHandshake {
            id: HandshakeId::new(),
            client_id: "v1".to_string(),
            redirect_uri: Url::parse("https://voice.example/cb").unwrap(),
            state: "abc".to_string(),
            created_at: now,
            expires_at: now + Duration::minutes(15),
        }
    }

    pub fn linking_grant(now: DateTime<Utc>) -> LinkingGrant {
        LinkingGrant {
            credential: credential(),
            state: "abc".to_string(),
            redirect_uri: Url::parse("https://voice.example/cb").unwrap(),
            client_id: "v1".to_string(),
            expires_at: now + Duration::minutes(10),
        }
    }

    pub fn bearer_grant(now: DateTime<Utc>) -> BearerGrant {
        BearerGrant {
            credential: credential(),
            issued_at: now,
            expires_at: now + Duration::hours(1),
        }
    }
}
