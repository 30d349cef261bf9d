//! Response headers for the linking pages and the voice platform endpoints.
//!
//! The bridge serves two unstyled HTML pages with no scripts, images or
//! subresources, plus JSON. Nothing may be framed, cached or fetched
//! cross-origin. The one allowance is the shop form, which is answered with a
//! 303 to the storefront's consent screen, so `form-action` permits `https:`.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// Content Security Policy for pages that load nothing.
const CONTENT_SECURITY_POLICY_VALUE: &str = "default-src 'none'; \
     base-uri 'none'; \
     form-action 'self' https:; \
     frame-ancestors 'none'";

/// Headers set on every response, overriding anything a handler set.
const LINKING_HEADERS: [(HeaderName, &str); 7] = [
    (CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY_VALUE),
    (X_FRAME_OPTIONS, "DENY"),
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    // The voice platform's `state` travels in our URLs
    (REFERRER_POLICY, "no-referrer"),
    (CACHE_CONTROL, "no-store, max-age=0"),
    (
        HeaderName::from_static("cross-origin-opener-policy"),
        "same-origin",
    ),
    (
        HeaderName::from_static("cross-origin-resource-policy"),
        "same-origin",
    ),
];

/// Apply [`LINKING_HEADERS`] to every response, error pages included.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in LINKING_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }

    response
}
