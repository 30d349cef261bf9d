//! Account-linking entry pages.
//!
//! The voice platform opens `/authorize` in the human's browser. The page asks
//! which shop to link; submitting it lands on `/authorize/shop`, which sends
//! the browser on to the storefront's consent screen.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use voicelink_core::ShopDomain;

use crate::error::PageError;
use crate::services::{AuthorizeRequest, LinkError};
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// Shop selection form.
#[derive(Template, WebTemplate)]
#[template(path = "authorize.html")]
pub struct AuthorizeTemplate {
    /// Correlation token carried through the form
    pub handshake: String,
    /// Previously entered shop, echoed back on error
    pub shop: String,
    pub error: Option<String>,
}

// =============================================================================
// Query Types
// =============================================================================

/// Shop form submission.
#[derive(Debug, Default, Deserialize)]
pub struct ShopQuery {
    pub handshake: Option<String>,
    pub shop: Option<String>,
}

fn malformed_query(rejection: &QueryRejection) -> PageError {
    PageError(LinkError::InvalidRequest(rejection.body_text()))
}

// =============================================================================
// Handlers
// =============================================================================

/// Start account linking and ask for the shop.
///
/// # Route
///
/// `GET /authorize?client_id&redirect_uri&state[&response_type&scope]`
pub async fn authorize(
    State(state): State<AppState>,
    query: Result<Query<AuthorizeRequest>, QueryRejection>,
) -> Result<AuthorizeTemplate, PageError> {
    let Query(request) = query.map_err(|e| malformed_query(&e))?;

    let handshake = state.handshakes().begin(&request).await?;

    Ok(AuthorizeTemplate {
        handshake,
        shop: String::new(),
        error: None,
    })
}

/// Bind the chosen shop and redirect to its consent screen.
///
/// An unusable shop re-renders the form; an invalid or expired handshake is
/// terminal.
///
/// # Route
///
/// `GET /authorize/shop?handshake&shop`
pub async fn choose_shop(
    State(state): State<AppState>,
    query: Result<Query<ShopQuery>, QueryRejection>,
) -> Result<Response, PageError> {
    let Query(query) = query.map_err(|e| malformed_query(&e))?;

    let handshake = query
        .handshake
        .filter(|h| !h.is_empty())
        .ok_or_else(|| LinkError::InvalidRequest("missing handshake".to_string()))?;

    // Reject a forged handshake before echoing it back into a page
    state
        .authorizer()
        .signer()
        .verify(&handshake, state.clock().now())
        .map_err(LinkError::from)?;

    let entered = query.shop.unwrap_or_default();
    let shop = match ShopDomain::parse(&entered) {
        Ok(shop) => shop,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected shop input");
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                AuthorizeTemplate {
                    handshake,
                    shop: entered,
                    error: Some(format!("That doesn't look like a shop address: {e}.")),
                },
            )
                .into_response());
        }
    };

    let consent_url = state.handshakes().choose_shop(&handshake, &shop).await?;

    Ok(Redirect::to(&consent_url).into_response())
}
