//! Shopify OAuth callback handler.

use axum::{
    extract::{RawQuery, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::error::PageError;
use crate::state::AppState;

/// Finish the storefront leg and send the human back to the voice platform.
///
/// The raw query is decoded here rather than with `Query` because the HMAC
/// covers every parameter Shopify sent, including ones the bridge ignores.
///
/// # Route
///
/// `GET /shopify/callback?code&shop&state&hmac&timestamp[&host]`
pub async fn callback(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, PageError> {
    let params: Vec<(String, String)> =
        url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();

    let redirect = state.handshakes().complete(&params).await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, redirect.to_string())]).into_response())
}
