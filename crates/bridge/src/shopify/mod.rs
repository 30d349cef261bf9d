//! Shopify OAuth for storefront account linking.
//!
//! # Flow
//!
//! 1. Build the consent screen URL with [`ShopifyOAuthClient::authorization_url`]
//! 2. Shopify redirects the merchant back to `/shopify/callback`
//! 3. Verify the callback with [`verify_callback_hmac`]
//! 4. Exchange the code for an access token with [`ShopifyOAuthClient::exchange_code`]
//!
//! The bridge never calls any other Shopify API: the access token is handed
//! to the voice platform's skill backend through `/credential-lookup`.

mod signature;
mod oauth;

pub use signature::{sign_callback_params, verify_callback_hmac};
pub use oauth::{ShopifyOAuthClient, ShopifyTokenResponse};

use thiserror::Error;

/// Errors that can occur when talking to Shopify's OAuth endpoints.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed (connect, timeout, or body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Shopify answered the code exchange with a non-success status.
    #[error("token exchange rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status returned by Shopify
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Shopify answered with a success status but no usable token.
    #[error("token exchange returned no access token")]
    MissingToken,

    /// The origin override could not be combined with the endpoint path.
    #[error("invalid OAuth endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
