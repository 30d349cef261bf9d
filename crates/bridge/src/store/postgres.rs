//! `PostgreSQL` credential store.
//!
//! # Tables (schema `voicelink`)
//!
//! - `pending_handshake` - keyed by handshake id
//! - `linking_code` - keyed by SHA-256 of the code
//! - `bearer_token` - keyed by SHA-256 of the token
//!
//! Takes are a single `DELETE ... RETURNING`, so concurrent takes of the same
//! row serialize on the row lock and only one of them sees it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use url::Url;
use uuid::Uuid;
use voicelink_core::{BearerToken, HandshakeId, LinkingCode, ShopDomain, StorefrontCredential};

use super::{
    BearerGrant, CredentialStore, LinkingGrant, PendingHandshake, PurgeStats, StoreError,
};

/// Credential store backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Digest used as the primary key for codes and tokens.
fn digest(secret: &str) -> Vec<u8> {
    Sha256::digest(secret.as_bytes()).to_vec()
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct HandshakeRow {
    id: Uuid,
    client_id: String,
    redirect_uri: String,
    state: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<HandshakeRow> for PendingHandshake {
    type Error = StoreError;

    fn try_from(row: HandshakeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: HandshakeId::from_uuid(row.id),
            client_id: row.client_id,
            redirect_uri: parse_redirect_uri(&row.redirect_uri)?,
            state: row.state,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LinkingCodeRow {
    shop: String,
    access_token: String,
    scopes: String,
    state: String,
    redirect_uri: String,
    client_id: String,
    expires_at: DateTime<Utc>,
}

impl TryFrom<LinkingCodeRow> for LinkingGrant {
    type Error = StoreError;

    fn try_from(row: LinkingCodeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            credential: parse_credential(&row.shop, row.access_token, row.scopes)?,
            state: row.state,
            redirect_uri: parse_redirect_uri(&row.redirect_uri)?,
            client_id: row.client_id,
            expires_at: row.expires_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BearerTokenRow {
    shop: String,
    access_token: String,
    scopes: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<BearerTokenRow> for BearerGrant {
    type Error = StoreError;

    fn try_from(row: BearerTokenRow) -> Result<Self, Self::Error> {
        Ok(Self {
            credential: parse_credential(&row.shop, row.access_token, row.scopes)?,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
        })
    }
}

fn parse_redirect_uri(raw: &str) -> Result<Url, StoreError> {
    Url::parse(raw)
        .map_err(|e| StoreError::DataCorruption(format!("invalid redirect_uri in database: {e}")))
}

fn parse_credential(
    shop: &str,
    access_token: String,
    scopes: String,
) -> Result<StorefrontCredential, StoreError> {
    let shop = ShopDomain::parse(shop)
        .map_err(|e| StoreError::DataCorruption(format!("invalid shop in database: {e}")))?;
    Ok(StorefrontCredential::new(
        shop,
        SecretString::from(access_token),
        scopes,
    ))
}

// =============================================================================
// Store Implementation
// =============================================================================

#[async_trait]
impl CredentialStore for PgStore {
    async fn insert_handshake(&self, handshake: PendingHandshake) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO voicelink.pending_handshake
                (id, client_id, redirect_uri, state, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(handshake.id.as_uuid())
        .bind(&handshake.client_id)
        .bind(handshake.redirect_uri.as_str())
        .bind(&handshake.state)
        .bind(handshake.created_at)
        .bind(handshake.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_handshake(
        &self,
        id: &HandshakeId,
    ) -> Result<Option<PendingHandshake>, StoreError> {
        let row = sqlx::query_as::<_, HandshakeRow>(
            r"
            SELECT id, client_id, redirect_uri, state, created_at, expires_at
            FROM voicelink.pending_handshake
            WHERE id = $1
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PendingHandshake::try_from).transpose()
    }

    async fn take_handshake(
        &self,
        id: &HandshakeId,
    ) -> Result<Option<PendingHandshake>, StoreError> {
        let row = sqlx::query_as::<_, HandshakeRow>(
            r"
            DELETE FROM voicelink.pending_handshake
            WHERE id = $1
            RETURNING id, client_id, redirect_uri, state, created_at, expires_at
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PendingHandshake::try_from).transpose()
    }

    async fn insert_linking_code(
        &self,
        code: &LinkingCode,
        grant: LinkingGrant,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO voicelink.linking_code
                (code_hash, shop, access_token, scopes, state, redirect_uri, client_id, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(digest(code.expose_secret()))
        .bind(grant.credential.shop())
        .bind(grant.credential.access_token().expose_secret())
        .bind(grant.credential.scopes())
        .bind(&grant.state)
        .bind(grant.redirect_uri.as_str())
        .bind(&grant.client_id)
        .bind(grant.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn take_linking_code(
        &self,
        code: &LinkingCode,
    ) -> Result<Option<LinkingGrant>, StoreError> {
        let row = sqlx::query_as::<_, LinkingCodeRow>(
            r"
            DELETE FROM voicelink.linking_code
            WHERE code_hash = $1
            RETURNING shop, access_token, scopes, state, redirect_uri, client_id, expires_at
            ",
        )
        .bind(digest(code.expose_secret()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(LinkingGrant::try_from).transpose()
    }

    async fn insert_bearer_token(
        &self,
        token: &BearerToken,
        grant: BearerGrant,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO voicelink.bearer_token
                (token_hash, shop, access_token, scopes, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(digest(token.expose_secret()))
        .bind(grant.credential.shop())
        .bind(grant.credential.access_token().expose_secret())
        .bind(grant.credential.scopes())
        .bind(grant.issued_at)
        .bind(grant.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_bearer_token(
        &self,
        token: &BearerToken,
    ) -> Result<Option<BearerGrant>, StoreError> {
        let row = sqlx::query_as::<_, BearerTokenRow>(
            r"
            SELECT shop, access_token, scopes, issued_at, expires_at
            FROM voicelink.bearer_token
            WHERE token_hash = $1
            ",
        )
        .bind(digest(token.expose_secret()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(BearerGrant::try_from).transpose()
    }

    async fn delete_bearer_token(&self, token: &BearerToken) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM voicelink.bearer_token WHERE token_hash = $1")
            .bind(digest(token.expose_secret()))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeStats, StoreError> {
        let mut tx = self.pool.begin().await?;

        let handshakes =
            sqlx::query("DELETE FROM voicelink.pending_handshake WHERE expires_at <= $1")
                .bind(now)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        let linking_codes = sqlx::query("DELETE FROM voicelink.linking_code WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let bearer_tokens = sqlx::query("DELETE FROM voicelink.bearer_token WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(PurgeStats {
            handshakes,
            linking_codes,
            bearer_tokens,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
