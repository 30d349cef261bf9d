//! Linking code issuance and redemption.

use chrono::Duration;
use url::Url;
use voicelink_core::{Clock, LinkingCode, StorefrontCredential};

use super::LinkError;
use crate::store::{CredentialStore, LinkingGrant, PendingHandshake};

/// A freshly issued linking code and where to send the human with it.
#[derive(Debug)]
pub struct IssuedCode {
    pub code: LinkingCode,
    /// The voice platform redirect URI with `code` and `state` attached
    pub redirect: Url,
}

/// Issues and redeems single-use linking codes.
pub struct LinkingCodeIssuer<'a> {
    store: &'a dyn CredentialStore,
    clock: &'a dyn Clock,
    ttl: Duration,
}

impl<'a> LinkingCodeIssuer<'a> {
    /// Create a new linking code issuer.
    #[must_use]
    pub const fn new(store: &'a dyn CredentialStore, clock: &'a dyn Clock, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Issue a linking code for `credential`, answering `handshake`.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Store` if the code cannot be stored.
    pub async fn issue(
        &self,
        credential: StorefrontCredential,
        handshake: PendingHandshake,
    ) -> Result<IssuedCode, LinkError> {
        let code = LinkingCode::generate();
        let expires_at = self.clock.now() + self.ttl;

        let mut redirect = handshake.redirect_uri.clone();
        redirect
            .query_pairs_mut()
            .append_pair("code", code.expose_secret())
            .append_pair("state", &handshake.state);

        self.store
            .insert_linking_code(
                &code,
                LinkingGrant {
                    credential,
                    state: handshake.state,
                    redirect_uri: handshake.redirect_uri,
                    client_id: handshake.client_id,
                    expires_at,
                },
            )
            .await?;

        tracing::debug!(%expires_at, "Linking code issued");

        Ok(IssuedCode { code, redirect })
    }

    /// Redeem a linking code.
    ///
    /// The code is consumed whatever the outcome; a second redemption, an
    /// unknown code, and an expired code all fail the same way.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::InvalidGrant` if the code can't be redeemed, or
    /// `LinkError::Store` if the store fails.
    pub async fn redeem(&self, raw: &str) -> Result<LinkingGrant, LinkError> {
        let code = LinkingCode::parse(raw).ok_or(LinkError::InvalidGrant)?;

        let grant = self
            .store
            .take_linking_code(&code)
            .await?
            .ok_or(LinkError::InvalidGrant)?;

        if grant.is_expired(self.clock.now()) {
            return Err(LinkError::InvalidGrant);
        }

        Ok(grant)
    }
}
