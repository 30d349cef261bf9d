//! Application state shared across handlers.

use std::sync::Arc;

use voicelink_core::Clock;

use crate::config::BridgeConfig;
use crate::services::{
    BridgeTokenService, CorrelationError, CorrelationSigner, HandshakeFlow, LinkingCodeIssuer,
    StorefrontAuthorizer,
};
use crate::shopify::{ShopifyError, ShopifyOAuthClient};
use crate::store::CredentialStore;

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("shopify client error: {0}")]
    Shopify(#[from] ShopifyError),
    #[error("correlation signer error: {0}")]
    Correlation(#[from] CorrelationError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and hands out request-scoped
/// services that borrow the store and clock.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: BridgeConfig,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    authorizer: StorefrontAuthorizer,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Bridge configuration
    /// * `store` - Backing credential store
    /// * `clock` - Time source for every expiry decision
    ///
    /// # Errors
    ///
    /// Returns an error if the Shopify client or the correlation signer
    /// cannot be built.
    pub fn new(
        config: BridgeConfig,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StateError> {
        let client = ShopifyOAuthClient::new(&config.shopify, config.shopify_callback_url())?;
        let signer =
            CorrelationSigner::new(&config.state_secret, config.lifetimes.handshake())?;
        let authorizer = StorefrontAuthorizer::new(client, signer);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                clock,
                authorizer,
            }),
        })
    }

    /// Get a reference to the bridge configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Get a handle to the credential store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    /// Get a handle to the clock.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Get a reference to the storefront authorizer.
    #[must_use]
    pub fn authorizer(&self) -> &StorefrontAuthorizer {
        &self.inner.authorizer
    }

    /// The browser-facing handshake flow.
    #[must_use]
    pub fn handshakes(&self) -> HandshakeFlow<'_> {
        HandshakeFlow::new(
            self.inner.store.as_ref(),
            self.inner.clock.as_ref(),
            &self.inner.authorizer,
            &self.inner.config.voice,
            self.inner.config.lifetimes,
        )
    }

    /// The bearer token service.
    #[must_use]
    pub fn tokens(&self) -> BridgeTokenService<'_> {
        let store = self.inner.store.as_ref();
        let clock = self.inner.clock.as_ref();
        BridgeTokenService::new(
            store,
            clock,
            LinkingCodeIssuer::new(store, clock, self.inner.config.lifetimes.linking_code()),
            self.inner.config.lifetimes.bearer_token(),
        )
    }
}
