//! Account-linking services.
//!
//! # Services
//!
//! - `handshake` - `/authorize` through `/shopify/callback`
//! - `authorizer` - Shopify consent screen URL and code exchange
//! - `correlation` - signed tokens carrying a handshake through redirects
//! - `linking` - single-use linking codes
//! - `tokens` - bearer tokens and credential lookup
//! - `client_auth` - voice platform client credentials
//! - `sweeper` - periodic purge of expired records
//!
//! Services borrow the store and clock from [`AppState`](crate::state::AppState)
//! for the duration of one request.

pub mod authorizer;
pub mod client_auth;
pub mod correlation;
mod error;
pub mod handshake;
pub mod linking;
pub mod sweeper;
pub mod tokens;

pub use authorizer::StorefrontAuthorizer;
pub use client_auth::ClientCredentials;
pub use correlation::{CorrelationClaims, CorrelationError, CorrelationSigner};
pub use error::LinkError;
pub use handshake::{AuthorizeRequest, HandshakeFlow};
pub use linking::{IssuedCode, LinkingCodeIssuer};
pub use sweeper::spawn_sweeper;
pub use tokens::{AUTHORIZATION_CODE_GRANT, BridgeTokenService, IssuedToken};
