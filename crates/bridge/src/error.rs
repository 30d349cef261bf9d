//! Unified error handling with Sentry integration.
//!
//! Two response flavours:
//!
//! - [`AppError`] for the voice platform's JSON endpoints (`/token`,
//!   `/credential-lookup`), answering with OAuth-style error bodies
//! - [`PageError`] for the browser-facing linking pages, answering with an
//!   HTML page that tells the human to start over from the voice app
//!
//! Server errors are captured to Sentry before responding. Clients only ever
//! see the uniform bodies below, never the error detail.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::LinkError;

/// Capture server-side failures to Sentry and the error log.
fn report(err: &LinkError) {
    if matches!(
        err,
        LinkError::Store(_) | LinkError::UpstreamAuthFailure(_)
    ) {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            error = %err,
            sentry_event_id = %event_id,
            "Request error"
        );
    } else {
        tracing::debug!(error = %err, "Request rejected");
    }
}

// =============================================================================
// JSON Errors
// =============================================================================

/// Error type for the voice platform's JSON endpoints.
#[derive(Debug, Error)]
pub enum AppError {
    /// Account-linking failure.
    #[error(transparent)]
    Link(#[from] LinkError),
}

impl AppError {
    /// Status, OAuth error code and `WWW-Authenticate` challenge.
    const fn parts(&self) -> (StatusCode, &'static str, Option<&'static str>) {
        let Self::Link(err) = self;
        match err {
            LinkError::InvalidGrant | LinkError::UnsupportedGrant(_) => {
                (StatusCode::BAD_REQUEST, "invalid_grant", None)
            }
            LinkError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request", None),
            LinkError::InvalidClient => (
                StatusCode::UNAUTHORIZED,
                "invalid_client",
                Some("Basic realm=\"voicelink\""),
            ),
            LinkError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                Some("Bearer realm=\"voicelink\""),
            ),
            LinkError::UpstreamAuthFailure(_) => (StatusCode::BAD_GATEWAY, "server_error", None),
            LinkError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let Self::Link(err) = &self;
        report(err);

        let (status, code, challenge) = self.parts();
        let mut response = (status, Json(json!({ "error": code }))).into_response();

        let headers = response.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        if let Some(challenge) = challenge {
            headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }

        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// =============================================================================
// HTML Errors
// =============================================================================

/// Terminal error page shown to the human during linking.
#[derive(Template, WebTemplate)]
#[template(path = "link_error.html")]
pub struct LinkErrorTemplate {
    pub title: &'static str,
    pub message: &'static str,
}

/// Error type for the browser-facing linking pages.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct PageError(#[from] pub LinkError);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        report(&self.0);

        let (status, title, message) = match &self.0 {
            LinkError::UpstreamAuthFailure(_) => (
                StatusCode::BAD_GATEWAY,
                "Your store didn't confirm the link",
                "We couldn't confirm access with your store. Please start linking again from the voice app.",
            ),
            LinkError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong",
                "We couldn't finish linking your account. Please start linking again from the voice app.",
            ),
            _ => (
                StatusCode::BAD_REQUEST,
                "This link request is no longer valid",
                "The link request has expired, was already used, or could not be verified. Please start linking again from the voice app.",
            ),
        };

        (status, LinkErrorTemplate { title, message }).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;
    use crate::store::StoreError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_oauth_error_bodies() {
        let cases = [
            (LinkError::InvalidGrant, StatusCode::BAD_REQUEST, "invalid_grant"),
            (
                LinkError::UnsupportedGrant("password".to_string()),
                StatusCode::BAD_REQUEST,
                "invalid_grant",
            ),
            (LinkError::InvalidClient, StatusCode::UNAUTHORIZED, "invalid_client"),
            (LinkError::Unauthenticated, StatusCode::UNAUTHORIZED, "unauthorized"),
            (
                LinkError::InvalidRequest("x".to_string()),
                StatusCode::BAD_REQUEST,
                "invalid_request",
            ),
            (
                LinkError::Store(StoreError::DataCorruption("secret detail".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
            ),
        ];

        for (err, status, code) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
            assert_eq!(
                response.headers().get(header::CACHE_CONTROL).unwrap(),
                "no-store"
            );
            assert_eq!(body_json(response).await, json!({ "error": code }));
        }
    }

    #[test]
    fn test_auth_challenges() {
        let response = AppError::from(LinkError::Unauthenticated).into_response();
        assert!(
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("Bearer")
        );

        let response = AppError::from(LinkError::InvalidClient).into_response();
        assert!(
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("Basic")
        );
    }

    #[test]
    fn test_page_error_status_codes() {
        fn get_status(err: LinkError) -> StatusCode {
            PageError::from(err).into_response().status()
        }

        assert_eq!(
            get_status(LinkError::InvalidRequest("forged".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(LinkError::UpstreamAuthFailure("rejected".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(LinkError::Store(StoreError::DataCorruption(String::new()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
