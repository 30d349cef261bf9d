//! The browser-facing half of account linking.
//!
//! # Flow
//!
//! 1. [`HandshakeFlow::begin`] - the voice platform sends the human to
//!    `/authorize`; a pending handshake is stored and a correlation token
//!    returned for the shop form.
//! 2. [`HandshakeFlow::choose_shop`] - the human names their shop; the
//!    correlation token is re-signed with the shop bound in and becomes
//!    the `state` of the Shopify consent screen.
//! 3. [`HandshakeFlow::complete`] - Shopify redirects back; the callback is
//!    verified, the handshake consumed, the code exchanged, and the human
//!    sent back to the voice platform with a linking code.

use serde::Deserialize;
use url::Url;
use voicelink_core::{Clock, HandshakeId, ShopDomain};

use super::LinkError;
use super::authorizer::StorefrontAuthorizer;
use super::correlation::CorrelationClaims;
use super::linking::LinkingCodeIssuer;
use crate::config::{LifetimeConfig, VoiceClientConfig};
use crate::store::{CredentialStore, PendingHandshake};

/// Query parameters the voice platform sends to `/authorize`.
#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeRequest {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub state: Option<String>,
    pub response_type: Option<String>,
    pub scope: Option<String>,
}

/// Drives a pending handshake from `/authorize` to the voice redirect.
pub struct HandshakeFlow<'a> {
    store: &'a dyn CredentialStore,
    clock: &'a dyn Clock,
    authorizer: &'a StorefrontAuthorizer,
    voice: &'a VoiceClientConfig,
    lifetimes: LifetimeConfig,
}

/// Value of a single query parameter, rejecting duplicates.
fn single_param<'p>(params: &'p [(String, String)], key: &str) -> Result<&'p str, LinkError> {
    let mut values = params.iter().filter(|(k, _)| k == key);
    match (values.next(), values.next()) {
        (Some((_, value)), None) if !value.is_empty() => Ok(value),
        _ => Err(LinkError::InvalidRequest(format!(
            "expected exactly one '{key}' parameter"
        ))),
    }
}

impl<'a> HandshakeFlow<'a> {
    /// Create a new handshake flow.
    #[must_use]
    pub const fn new(
        store: &'a dyn CredentialStore,
        clock: &'a dyn Clock,
        authorizer: &'a StorefrontAuthorizer,
        voice: &'a VoiceClientConfig,
        lifetimes: LifetimeConfig,
    ) -> Self {
        Self {
            store,
            clock,
            authorizer,
            voice,
            lifetimes,
        }
    }

    fn linking_codes(&self) -> LinkingCodeIssuer<'a> {
        LinkingCodeIssuer::new(self.store, self.clock, self.lifetimes.linking_code())
    }

    /// Validate a voice platform authorization request and store it.
    ///
    /// Returns the correlation token for the shop form.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::InvalidRequest` for an unknown client, a redirect
    /// URI outside the allowlist, a missing `state`, or a `response_type`
    /// other than `code`. Nothing is stored in that case.
    pub async fn begin(&self, request: &AuthorizeRequest) -> Result<String, LinkError> {
        let client_id = request
            .client_id
            .as_deref()
            .filter(|id| *id == self.voice.client_id)
            .ok_or_else(|| LinkError::InvalidRequest("unknown client_id".to_string()))?;

        let redirect_uri = request
            .redirect_uri
            .as_deref()
            .and_then(|raw| Url::parse(raw).ok())
            .filter(|url| self.voice.allows_redirect(url))
            .ok_or_else(|| {
                LinkError::InvalidRequest("redirect_uri is not registered".to_string())
            })?;

        let state = request
            .state
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LinkError::InvalidRequest("state is required".to_string()))?;

        if let Some(response_type) = request.response_type.as_deref()
            && response_type != "code"
        {
            return Err(LinkError::InvalidRequest(format!(
                "unsupported response_type '{response_type}'"
            )));
        }

        let now = self.clock.now();
        let handshake = PendingHandshake {
            id: HandshakeId::new(),
            client_id: client_id.to_string(),
            redirect_uri,
            state: state.to_string(),
            created_at: now,
            expires_at: now + self.lifetimes.handshake(),
        };
        let id = handshake.id;
        self.store.insert_handshake(handshake).await?;

        tracing::info!(handshake = %id, "Account linking started");

        let correlation = self
            .authorizer
            .signer()
            .sign(&CorrelationClaims::new(id, now))?;
        Ok(correlation)
    }

    /// Bind `shop` to the handshake behind `correlation` and build the
    /// storefront consent screen URL.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::InvalidRequest` if the correlation token doesn't
    /// verify or its handshake is gone or expired.
    pub async fn choose_shop(
        &self,
        correlation: &str,
        shop: &ShopDomain,
    ) -> Result<String, LinkError> {
        let now = self.clock.now();
        let claims = self.authorizer.signer().verify(correlation, now)?;

        let pending = self
            .store
            .get_handshake(&claims.handshake)
            .await?
            .filter(|h| !h.is_expired(now))
            .ok_or_else(|| LinkError::InvalidRequest("link request expired".to_string()))?;

        tracing::info!(handshake = %pending.id, shop = %shop, "Shop chosen");

        self.authorizer
            .build_authorization_redirect(&pending, shop, now)
    }

    /// Handle the storefront's OAuth callback.
    ///
    /// `params` are the decoded callback query pairs. Returns the voice
    /// platform redirect carrying the linking code and the original `state`.
    ///
    /// Nothing is consumed until the Shopify signature, the correlation
    /// token and the shop all check out.
    ///
    /// # Errors
    ///
    /// - `LinkError::InvalidRequest` for a forged, mismatched, replayed or
    ///   expired callback
    /// - `LinkError::UpstreamAuthFailure` if the code exchange fails
    /// - `LinkError::Store` if the store fails
    pub async fn complete(&self, params: &[(String, String)]) -> Result<Url, LinkError> {
        if !self.authorizer.verify_callback(params) {
            tracing::warn!("Shopify callback signature mismatch");
            return Err(LinkError::InvalidRequest(
                "callback signature mismatch".to_string(),
            ));
        }

        let code = single_param(params, "code")?;
        let state = single_param(params, "state")?;
        let shop = ShopDomain::parse(single_param(params, "shop")?)
            .map_err(|e| LinkError::InvalidRequest(e.to_string()))?;

        let now = self.clock.now();
        let claims = self.authorizer.signer().verify(state, now)?;
        if claims.shop.as_ref() != Some(&shop) {
            tracing::warn!(shop = %shop, "Callback shop does not match the chosen shop");
            return Err(LinkError::InvalidRequest("shop mismatch".to_string()));
        }

        let pending = self
            .store
            .take_handshake(&claims.handshake)
            .await?
            .filter(|h| !h.is_expired(now))
            .ok_or_else(|| {
                LinkError::InvalidRequest("link request already used or expired".to_string())
            })?;

        let credential = self
            .authorizer
            .exchange_code_for_credential(code, &shop)
            .await?;

        let issued = self.linking_codes().issue(credential, pending).await?;

        tracing::info!(handshake = %claims.handshake, shop = %shop, "Account linking completed");

        Ok(issued.redirect)
    }
}
