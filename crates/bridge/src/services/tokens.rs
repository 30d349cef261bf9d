//! Bearer token service: the voice platform's view of the bridge.

use chrono::Duration;
use voicelink_core::{BearerToken, Clock, StorefrontCredential};

use super::LinkError;
use super::linking::LinkingCodeIssuer;
use crate::store::{BearerGrant, CredentialStore};

/// The only grant type the token endpoint accepts.
pub const AUTHORIZATION_CODE_GRANT: &str = "authorization_code";

/// A freshly minted bearer token.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: BearerToken,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Mints bearer tokens from linking codes and resolves them to credentials.
pub struct BridgeTokenService<'a> {
    store: &'a dyn CredentialStore,
    clock: &'a dyn Clock,
    linking: LinkingCodeIssuer<'a>,
    ttl: Duration,
}

impl<'a> BridgeTokenService<'a> {
    /// Create a new token service.
    #[must_use]
    pub const fn new(
        store: &'a dyn CredentialStore,
        clock: &'a dyn Clock,
        linking: LinkingCodeIssuer<'a>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            linking,
            ttl,
        }
    }

    /// Redeem a linking code for a bearer token.
    ///
    /// `client_id` is the already-authenticated voice client; a code issued
    /// to a different client is consumed and rejected.
    ///
    /// # Errors
    ///
    /// - `LinkError::UnsupportedGrant` for any grant type but `authorization_code`
    /// - `LinkError::InvalidGrant` if the code is missing or can't be redeemed
    /// - `LinkError::Store` if the store fails
    pub async fn issue_token(
        &self,
        grant_type: &str,
        code: Option<&str>,
        client_id: &str,
    ) -> Result<IssuedToken, LinkError> {
        if grant_type != AUTHORIZATION_CODE_GRANT {
            return Err(LinkError::UnsupportedGrant(grant_type.to_string()));
        }

        let code = code.ok_or(LinkError::InvalidGrant)?;
        let grant = self.linking.redeem(code).await?;

        if grant.client_id != client_id {
            tracing::warn!("Linking code presented by a different client");
            return Err(LinkError::InvalidGrant);
        }

        let token = BearerToken::generate();
        let issued_at = self.clock.now();
        let shop = grant.credential.shop().clone();

        self.store
            .insert_bearer_token(
                &token,
                BearerGrant {
                    credential: grant.credential,
                    issued_at,
                    expires_at: issued_at + self.ttl,
                },
            )
            .await?;

        tracing::info!(shop = %shop, "Bearer token issued");

        Ok(IssuedToken {
            token,
            expires_in: self.ttl.num_seconds(),
        })
    }

    /// Resolve a bearer token to its storefront credential.
    ///
    /// Absent, malformed, unknown and expired tokens are indistinguishable to
    /// the caller. An expired token is deleted on sight.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Unauthenticated` if the token doesn't resolve, or
    /// `LinkError::Store` if the store fails.
    pub async fn lookup_credential(
        &self,
        raw: Option<&str>,
    ) -> Result<StorefrontCredential, LinkError> {
        let token = raw
            .and_then(BearerToken::parse)
            .ok_or(LinkError::Unauthenticated)?;

        let grant = self
            .store
            .get_bearer_token(&token)
            .await?
            .ok_or(LinkError::Unauthenticated)?;

        if grant.is_expired(self.clock.now()) {
            if let Err(error) = self.store.delete_bearer_token(&token).await {
                tracing::warn!(error = %error, "Failed to delete expired bearer token");
            }
            return Err(LinkError::Unauthenticated);
        }

        Ok(grant.credential)
    }
}
