//! Shopify OAuth client.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;
use voicelink_core::ShopDomain;

use super::ShopifyError;
use crate::config::ShopifyOAuthConfig;

/// Longest slice of an error body kept for logs.
const MAX_ERROR_BODY: usize = 200;

/// Response from `POST /admin/oauth/access_token`.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone, Deserialize)]
pub struct ShopifyTokenResponse {
    /// Offline access token for the shop
    pub access_token: String,
    /// Comma-separated scopes actually granted
    #[serde(default)]
    pub scope: String,
}

impl std::fmt::Debug for ShopifyTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyTokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Client for Shopify's per-shop OAuth endpoints.
#[derive(Clone)]
pub struct ShopifyOAuthClient {
    inner: Arc<ShopifyOAuthClientInner>,
}

impl std::fmt::Debug for ShopifyOAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyOAuthClient")
            .field("client_id", &self.inner.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scopes", &self.inner.scopes)
            .finish_non_exhaustive()
    }
}

struct ShopifyOAuthClientInner {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    scopes: String,
    redirect_uri: String,
    origin_override: Option<Url>,
}

impl ShopifyOAuthClient {
    /// Create a new OAuth client.
    ///
    /// # Arguments
    ///
    /// * `config` - Shopify app configuration
    /// * `redirect_uri` - Absolute URL of the bridge's `/shopify/callback`
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ShopifyOAuthConfig, redirect_uri: String) -> Result<Self, ShopifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.exchange_timeout)
            .connect_timeout(config.exchange_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ShopifyOAuthClientInner {
                client,
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                scopes: config.scopes.clone(),
                redirect_uri,
                origin_override: config.origin_override.clone(),
            }),
        })
    }

    /// Get the app's client secret (used to verify callback signatures).
    #[must_use]
    pub fn client_secret(&self) -> &SecretString {
        &self.inner.client_secret
    }

    /// Origin that serves the OAuth endpoints for `shop`.
    fn origin(&self, shop: &ShopDomain) -> String {
        self.inner.origin_override.as_ref().map_or_else(
            || format!("https://{shop}"),
            |url| url.as_str().trim_end_matches('/').to_string(),
        )
    }

    /// Generate the consent screen URL for `shop`.
    ///
    /// # Arguments
    ///
    /// * `shop` - The merchant's shop domain
    /// * `state` - Opaque value Shopify echoes back on the callback
    ///
    /// # Returns
    ///
    /// The full authorization URL to redirect the merchant to.
    #[must_use]
    pub fn authorization_url(&self, shop: &ShopDomain, state: &str) -> String {
        format!(
            "{}/admin/oauth/authorize?\
            client_id={}&\
            scope={}&\
            redirect_uri={}&\
            state={}",
            self.origin(shop),
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(&self.inner.scopes),
            urlencoding::encode(&self.inner.redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for an offline access token.
    ///
    /// Makes exactly one request; nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or times out, if Shopify rejects
    /// the code, or if the response carries no token.
    pub async fn exchange_code(
        &self,
        shop: &ShopDomain,
        code: &str,
    ) -> Result<ShopifyTokenResponse, ShopifyError> {
        let url = format!("{}/admin/oauth/access_token", self.origin(shop));

        let params = [
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
        ];

        let response = self.inner.client.post(&url).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Rejected {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let token: ShopifyTokenResponse = response.json().await?;
        if token.access_token.trim().is_empty() {
            return Err(ShopifyError::MissingToken);
        }

        Ok(token)
    }
}
