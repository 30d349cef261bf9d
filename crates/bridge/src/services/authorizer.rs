//! Storefront authorizer: the bridge's side of Shopify OAuth.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use voicelink_core::{ShopDomain, StorefrontCredential};

use super::LinkError;
use super::correlation::{CorrelationClaims, CorrelationSigner};
use crate::shopify::{ShopifyOAuthClient, verify_callback_hmac};
use crate::store::PendingHandshake;

/// Builds consent screen redirects and turns storefront codes into
/// credentials.
#[derive(Debug, Clone)]
pub struct StorefrontAuthorizer {
    client: ShopifyOAuthClient,
    signer: CorrelationSigner,
}

impl StorefrontAuthorizer {
    /// Create an authorizer.
    #[must_use]
    pub const fn new(client: ShopifyOAuthClient, signer: CorrelationSigner) -> Self {
        Self { client, signer }
    }

    /// Get the correlation token signer.
    #[must_use]
    pub const fn signer(&self) -> &CorrelationSigner {
        &self.signer
    }

    /// Build the consent screen URL for `pending` on `shop`.
    ///
    /// The `state` sent to Shopify is a correlation token binding the
    /// handshake id and the shop, so the callback can recover both without
    /// trusting anything else Shopify or the browser sends. No side effects.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::InvalidRequest` if the correlation token cannot be
    /// signed.
    pub fn build_authorization_redirect(
        &self,
        pending: &PendingHandshake,
        shop: &ShopDomain,
        now: DateTime<Utc>,
    ) -> Result<String, LinkError> {
        let claims = CorrelationClaims::with_shop(pending.id, shop.clone(), now);
        let state = self.signer.sign(&claims)?;
        Ok(self.client.authorization_url(shop, &state))
    }

    /// Check the Shopify HMAC on decoded callback query pairs.
    #[must_use]
    pub fn verify_callback(&self, params: &[(String, String)]) -> bool {
        verify_callback_hmac(params, self.client.client_secret().expose_secret())
    }

    /// Exchange a storefront authorization code for a credential.
    ///
    /// One attempt, no retry.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::UpstreamAuthFailure` if Shopify rejects the code or
    /// cannot be reached in time.
    pub async fn exchange_code_for_credential(
        &self,
        code: &str,
        shop: &ShopDomain,
    ) -> Result<StorefrontCredential, LinkError> {
        match self.client.exchange_code(shop, code).await {
            Ok(token) => {
                tracing::info!(shop = %shop, scopes = %token.scope, "Storefront code exchanged");
                Ok(StorefrontCredential::new(
                    shop.clone(),
                    SecretString::from(token.access_token),
                    token.scope,
                ))
            }
            Err(e) => {
                tracing::warn!(shop = %shop, error = %e, "Storefront code exchange failed");
                Err(LinkError::UpstreamAuthFailure(e.to_string()))
            }
        }
    }
}
