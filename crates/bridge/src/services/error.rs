//! Account-linking error types.

use thiserror::Error;

use crate::store::StoreError;

/// Errors produced by the account-linking services.
///
/// The first four are the protocol outcomes the voice platform and the
/// merchant can observe. None of them are retried internally.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The storefront rejected the code exchange or could not be reached.
    #[error("storefront authorization failed: {0}")]
    UpstreamAuthFailure(String),

    /// The linking code is unknown, expired, already redeemed, or was issued
    /// to another client.
    #[error("invalid grant")]
    InvalidGrant,

    /// The token request used a grant type other than `authorization_code`.
    #[error("unsupported grant type: {0}")]
    UnsupportedGrant(String),

    /// The bearer token is absent, malformed, unknown, or expired.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The voice platform client failed to authenticate.
    #[error("invalid client")]
    InvalidClient,

    /// The request is malformed, forged, or no longer valid.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The credential store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
