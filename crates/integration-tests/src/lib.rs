//! Integration test harness for the voicelink bridge.
//!
//! Drives the real router in-process with `axum_test::TestServer`, backed by
//! a [`MemoryStore`], a [`ManualClock`] and a mock Shopify OAuth server bound
//! on an ephemeral port.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p voicelink-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `account_linking` - End-to-end linking and upstream failures
//! - `callback_security` - Forged, replayed and mismatched requests
//! - `token_endpoint` - Client authentication, code redemption, token lookup
//! - `operations` - Health checks and response headers

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use axum_test::{TestResponse, TestServer};
use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use secrecy::SecretString;
use serde_json::json;
use tokio::task::JoinHandle;
use url::Url;
use voicelink_bridge::build_router;
use voicelink_bridge::config::{
    BridgeConfig, LifetimeConfig, ShopifyOAuthConfig, VoiceClientConfig,
};
use voicelink_bridge::shopify::sign_callback_params;
use voicelink_bridge::state::AppState;
use voicelink_bridge::store::MemoryStore;
use voicelink_core::ManualClock;

// =============================================================================
// Fixtures
// =============================================================================

pub const SHOPIFY_CLIENT_ID: &str = "shopify-app-client";
pub const SHOPIFY_CLIENT_SECRET: &str = "shopify-app-secret";
pub const VOICE_CLIENT_ID: &str = "v1";
pub const VOICE_CLIENT_SECRET: &str = "voice-client-secret";
pub const VOICE_REDIRECT_URI: &str = "https://voice.example/cb";
pub const VOICE_STATE: &str = "abc";
pub const SHOP: &str = "demo.example";
pub const SHOP_ACCESS_TOKEN: &str = "shpat_demo_0123456789abcdef";

const STATE_SECRET: &str = "k7Qz1pR9vXw3Lm8Tn2Yb6Hc4Jd0Fg5Se";

/// A fixed instant all test clocks start from.
#[must_use]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

// =============================================================================
// Mock Shopify
// =============================================================================

#[derive(Clone, Default)]
struct MockShopifyState {
    /// Authorization code -> access token; removed on first exchange
    codes: Arc<DashMap<String, String>>,
    exchanges: Arc<AtomicUsize>,
}

/// In-process stand-in for a shop's `/admin/oauth/access_token` endpoint.
///
/// Authorization codes are single use, like Shopify's.
pub struct MockShopify {
    origin: Url,
    state: MockShopifyState,
    handle: JoinHandle<()>,
}

async fn access_token(
    State(state): State<MockShopifyState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.exchanges.fetch_add(1, Ordering::SeqCst);

    let client_ok = form.get("client_id").map(String::as_str) == Some(SHOPIFY_CLIENT_ID)
        && form.get("client_secret").map(String::as_str) == Some(SHOPIFY_CLIENT_SECRET);
    if !client_ok {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "errors": "[API] Invalid API key or access token" })),
        )
            .into_response();
    }

    let granted = form
        .get("code")
        .and_then(|code| state.codes.remove(code))
        .map(|(_, token)| token);

    match granted {
        Some(token) => Json(json!({
            "access_token": token,
            "scope": "unauthenticated_read_product_listings",
        }))
        .into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_request",
                "error_description": "The authorization code was not found or was already used",
            })),
        )
            .into_response(),
    }
}

impl MockShopify {
    /// Start the mock on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = MockShopifyState::default();
        let app = Router::new()
            .route("/admin/oauth/access_token", post(access_token))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("failed to bind mock Shopify");
        let addr = listener.local_addr().expect("mock Shopify has no address");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let origin = Url::parse(&format!("http://{addr}")).expect("mock origin is a valid URL");

        Self {
            origin,
            state,
            handle,
        }
    }

    /// Origin the bridge should send OAuth requests to.
    #[must_use]
    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    /// Register an authorization code that exchanges for `access_token`.
    pub fn grant(&self, code: &str, access_token: &str) {
        self.state
            .codes
            .insert(code.to_string(), access_token.to_string());
    }

    /// Number of code exchanges attempted so far.
    #[must_use]
    pub fn exchanges(&self) -> usize {
        self.state.exchanges.load(Ordering::SeqCst)
    }
}

impl Drop for MockShopify {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// =============================================================================
// Test Bridge
// =============================================================================

fn test_config(shopify_origin: &Url, lifetimes: LifetimeConfig) -> BridgeConfig {
    BridgeConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: Url::parse("https://bridge.test").expect("static URL"),
        state_secret: SecretString::from(STATE_SECRET),
        database_url: None,
        lifetimes,
        sweep_interval: StdDuration::from_secs(60),
        rate_limit: false,
        shopify: ShopifyOAuthConfig {
            client_id: SHOPIFY_CLIENT_ID.to_string(),
            client_secret: SecretString::from(SHOPIFY_CLIENT_SECRET),
            scopes: "unauthenticated_read_product_listings".to_string(),
            exchange_timeout: StdDuration::from_secs(5),
            origin_override: Some(shopify_origin.clone()),
        },
        voice: VoiceClientConfig {
            client_id: VOICE_CLIENT_ID.to_string(),
            client_secret: SecretString::from(VOICE_CLIENT_SECRET),
            redirect_uris: vec![Url::parse(VOICE_REDIRECT_URI).expect("static URL")],
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// The bridge router wired to a mock Shopify, an in-memory store and a
/// manually advanced clock.
pub struct TestBridge {
    pub server: TestServer,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub shopify: MockShopify,
}

/// Value of a query parameter in an absolute URL.
#[must_use]
pub fn query_param(url: &str, key: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Value of the hidden `<input name="{name}">` in a rendered page.
#[must_use]
pub fn hidden_input(html: &str, name: &str) -> Option<String> {
    let marker = format!("name=\"{name}\" value=\"");
    let start = html.find(&marker)? + marker.len();
    let rest = html.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end).map(str::to_string)
}

/// Callback parameters as Shopify would send them, HMAC included.
#[must_use]
pub fn signed_callback(code: &str, shop: &str, state: &str) -> Vec<(String, String)> {
    let mut params = vec![
        ("code".to_string(), code.to_string()),
        ("host".to_string(), "ZGVtby5leGFtcGxlL2FkbWlu".to_string()),
        ("shop".to_string(), shop.to_string()),
        ("state".to_string(), state.to_string()),
        ("timestamp".to_string(), t0().timestamp().to_string()),
    ];
    let hmac = sign_callback_params(&params, SHOPIFY_CLIENT_SECRET);
    params.push(("hmac".to_string(), hmac));
    params
}

impl TestBridge {
    /// Start a bridge with default lifetimes.
    pub async fn start() -> Self {
        Self::start_with(LifetimeConfig::default()).await
    }

    /// Start a bridge with custom lifetimes.
    ///
    /// # Panics
    ///
    /// Panics if the bridge cannot be built.
    pub async fn start_with(lifetimes: LifetimeConfig) -> Self {
        let shopify = MockShopify::start().await;
        let clock = Arc::new(ManualClock::new(t0()));
        let store = Arc::new(MemoryStore::new());

        let state = AppState::new(
            test_config(shopify.origin(), lifetimes),
            store.clone(),
            clock.clone(),
        )
        .expect("failed to build bridge state");
        let server = TestServer::new(build_router(state)).expect("failed to create test server");

        Self {
            server,
            clock,
            store,
            shopify,
        }
    }

    /// `GET /authorize` with the given query parameters.
    pub async fn authorize_with(&self, params: &[(&str, &str)]) -> TestResponse {
        let mut request = self.server.get("/authorize");
        for (key, value) in params {
            request = request.add_query_param(key, value);
        }
        request.await
    }

    /// Start linking as the voice platform would; returns the correlation
    /// token from the shop form.
    ///
    /// # Panics
    ///
    /// Panics if the page isn't served or carries no handshake.
    pub async fn authorize(&self) -> String {
        let response = self
            .authorize_with(&[
                ("client_id", VOICE_CLIENT_ID),
                ("redirect_uri", VOICE_REDIRECT_URI),
                ("state", VOICE_STATE),
                ("response_type", "code"),
            ])
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        hidden_input(&response.text(), "handshake").expect("shop form has a handshake field")
    }

    /// `GET /authorize/shop`.
    pub async fn choose_shop_raw(&self, handshake: &str, shop: &str) -> TestResponse {
        self.server
            .get("/authorize/shop")
            .add_query_param("handshake", handshake)
            .add_query_param("shop", shop)
            .await
    }

    /// Submit the shop form; returns the `state` of the consent screen URL.
    ///
    /// # Panics
    ///
    /// Panics unless the bridge redirects to the mock consent screen.
    pub async fn choose_shop(&self, handshake: &str, shop: &str) -> String {
        let response = self.choose_shop_raw(handshake, shop).await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

        let location = location(&response);
        assert!(location.starts_with(self.shopify.origin().as_str().trim_end_matches('/')));
        query_param(&location, "state").expect("consent URL carries state")
    }

    /// `GET /shopify/callback` with exactly these parameters.
    pub async fn callback(&self, params: &[(String, String)]) -> TestResponse {
        let mut request = self.server.get("/shopify/callback");
        for (key, value) in params {
            request = request.add_query_param(key, value);
        }
        request.await
    }

    /// Run the browser half of linking with storefront code `shopify_code`;
    /// returns the bridge's redirect back to the voice platform.
    ///
    /// # Panics
    ///
    /// Panics if any step fails.
    pub async fn link(&self, shopify_code: &str) -> String {
        let handshake = self.authorize().await;
        let state = self.choose_shop(&handshake, SHOP).await;

        let response = self
            .callback(&signed_callback(shopify_code, SHOP, &state))
            .await;
        assert_eq!(response.status_code(), StatusCode::FOUND);
        location(&response)
    }

    /// Grant a fresh storefront code and run linking; returns the linking code.
    ///
    /// # Panics
    ///
    /// Panics if linking fails.
    pub async fn linking_code(&self, shopify_code: &str) -> String {
        self.shopify.grant(shopify_code, SHOP_ACCESS_TOKEN);
        let redirect = self.link(shopify_code).await;
        query_param(&redirect, "code").expect("voice redirect carries a code")
    }

    /// `POST /token` as a form with the voice client's credentials.
    pub async fn exchange(&self, code: &str) -> TestResponse {
        self.server
            .post("/token")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", VOICE_CLIENT_ID),
                ("client_secret", VOICE_CLIENT_SECRET),
                ("redirect_uri", VOICE_REDIRECT_URI),
            ])
            .await
    }

    /// Link and exchange; returns the bearer token.
    ///
    /// # Panics
    ///
    /// Panics if either step fails.
    pub async fn bearer_token(&self, shopify_code: &str) -> String {
        let code = self.linking_code(shopify_code).await;
        let response = self.exchange(&code).await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body: serde_json::Value = response.json();
        body["access_token"]
            .as_str()
            .expect("token response has access_token")
            .to_string()
    }

    /// `GET /credential-lookup` with an optional `Authorization` header value.
    ///
    /// # Panics
    ///
    /// Panics if `authorization` is not a valid header value.
    pub async fn lookup(&self, authorization: Option<&str>) -> TestResponse {
        let mut request = self.server.get("/credential-lookup");
        if let Some(value) = authorization {
            request = request.add_header(
                header::AUTHORIZATION,
                HeaderValue::from_str(value).expect("valid header value"),
            );
        }
        request.await
    }
}

/// The `Location` header of a redirect.
///
/// # Panics
///
/// Panics if the response has no readable `Location` header.
#[must_use]
pub fn location(response: &TestResponse) -> String {
    response
        .header(header::LOCATION)
        .to_str()
        .expect("Location is ASCII")
        .to_string()
}

/// Name of the request ID header the bridge echoes.
#[must_use]
pub fn request_id_header() -> HeaderName {
    HeaderName::from_static(voicelink_bridge::middleware::request_id::REQUEST_ID_HEADER)
}
