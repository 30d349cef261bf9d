//! HTTP route handlers for the bridge.
//!
//! # Route Structure
//!
//! ```text
//! # Linking pages (human, browser)
//! GET  /authorize              - Start linking, ask for the shop
//! GET  /authorize/shop         - Bind the shop, redirect to its consent screen
//! GET  /shopify/callback       - Finish the storefront leg, redirect to the voice platform
//!
//! # Voice platform (JSON)
//! POST /token                  - Exchange a linking code for a bearer token
//! GET  /credential-lookup      - Resolve a bearer token to the storefront credential
//!
//! # Operations
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (store reachable)
//! ```

pub mod authorize;
pub mod health;
pub mod shopify_callback;
pub mod token;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{authorize_rate_limiter, token_rate_limiter};
use crate::state::AppState;

/// Create the linking page routes router.
pub fn authorize_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(authorize::authorize))
        .route("/shop", get(authorize::choose_shop))
}

/// Create all routes for the bridge.
///
/// With `rate_limit` set, `/authorize*` and `/token` are limited per client IP.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    let mut linking = Router::new().nest("/authorize", authorize_routes());
    let mut voice = Router::new().route("/token", post(token::token));

    if rate_limit {
        linking = linking.layer(authorize_rate_limiter());
        voice = voice.layer(token_rate_limiter());
    }

    Router::new()
        .merge(linking)
        .merge(voice)
        .route("/credential-lookup", get(token::credential_lookup))
        .route("/shopify/callback", get(shopify_callback::callback))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}
