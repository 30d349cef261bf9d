//! Voicelink account-linking bridge library.
//!
//! The bridge lets a voice assistant platform link a user's account to a
//! Shopify storefront. It plays OAuth provider towards the voice platform
//! and OAuth client towards the storefront, and hands the voice platform an
//! opaque bearer token that resolves back to the storefront credential.
//!
//! This crate provides the bridge as a library so the binary, the CLI and
//! the integration tests share one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;
pub mod store;

use axum::{Router, body::Body, http::Request};
use tower_http::trace::TraceLayer;

use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Build the complete application router.
///
/// Request spans record the method and path only; query strings carry
/// codes and correlation tokens and are never logged.
pub fn build_router(state: AppState) -> Router {
    let rate_limit = state.config().rate_limit;

    routes::routes(rate_limit)
        .with_state(state)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
