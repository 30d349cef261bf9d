#![allow(clippy::unwrap_used)]

//! Token exchange and credential lookup as seen by the voice platform.

use axum::http::{HeaderValue, StatusCode, header};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use chrono::Duration;
use serde_json::json;
use voicelink_integration_tests::{
    SHOP, SHOP_ACCESS_TOKEN, TestBridge, VOICE_CLIENT_ID, VOICE_CLIENT_SECRET,
};

// =============================================================================
// Client Authentication
// =============================================================================

#[tokio::test]
async fn test_basic_auth_and_json_body() {
    let bridge = TestBridge::start().await;
    let code = bridge.linking_code("SFCODE1").await;

    let basic = BASE64_STANDARD.encode(format!("{VOICE_CLIENT_ID}:{VOICE_CLIENT_SECRET}"));
    let response = bridge
        .server
        .post("/token")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {basic}")).unwrap(),
        )
        .json(&json!({ "grant_type": "authorization_code", "code": code }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["expires_in"], 3600);
}

#[tokio::test]
async fn test_wrong_client_secret_leaves_code_intact() {
    let bridge = TestBridge::start().await;
    let code = bridge.linking_code("SFCODE1").await;

    let response = bridge
        .server
        .post("/token")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", VOICE_CLIENT_ID),
            ("client_secret", "guessed"),
        ])
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<serde_json::Value>(), json!({ "error": "invalid_client" }));
    assert!(
        response
            .header(header::WWW_AUTHENTICATE)
            .to_str()
            .unwrap()
            .starts_with("Basic")
    );

    // Checked before the code was touched
    let response = bridge.exchange(&code).await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_client_credentials() {
    let bridge = TestBridge::start().await;
    let code = bridge.linking_code("SFCODE1").await;

    let response = bridge
        .server
        .post("/token")
        .form(&[("grant_type", "authorization_code"), ("code", code.as_str())])
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<serde_json::Value>(), json!({ "error": "invalid_client" }));
}

// =============================================================================
// Code Redemption
// =============================================================================

#[tokio::test]
async fn test_unsupported_grant_type() {
    let bridge = TestBridge::start().await;
    let code = bridge.linking_code("SFCODE1").await;

    let response = bridge
        .server
        .post("/token")
        .form(&[
            ("grant_type", "refresh_token"),
            ("code", code.as_str()),
            ("client_id", VOICE_CLIENT_ID),
            ("client_secret", VOICE_CLIENT_SECRET),
        ])
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<serde_json::Value>(), json!({ "error": "invalid_grant" }));
}

#[tokio::test]
async fn test_linking_code_is_single_use() {
    let bridge = TestBridge::start().await;
    let code = bridge.linking_code("SFCODE1").await;

    assert_eq!(bridge.exchange(&code).await.status_code(), StatusCode::OK);

    let response = bridge.exchange(&code).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<serde_json::Value>(), json!({ "error": "invalid_grant" }));
}

#[tokio::test]
async fn test_unknown_and_malformed_codes() {
    let bridge = TestBridge::start().await;

    for code in ["", "SFCODE1", "vlc_", "vlc_AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"] {
        let response = bridge.exchange(code).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "code {code:?}");
        assert_eq!(response.json::<serde_json::Value>(), json!({ "error": "invalid_grant" }));
    }

    // Not a string
    let response = bridge
        .server
        .post("/token")
        .json(&json!({
            "grant_type": "authorization_code",
            "code": 12345,
            "client_id": VOICE_CLIENT_ID,
            "client_secret": VOICE_CLIENT_SECRET,
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<serde_json::Value>(), json!({ "error": "invalid_grant" }));

    // Repeated, even when one of them is genuine
    let code = bridge.linking_code("SFCODE1").await;
    let response = bridge
        .server
        .post("/token")
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("code", code.as_str()),
            ("client_id", VOICE_CLIENT_ID),
            ("client_secret", VOICE_CLIENT_SECRET),
        ])
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<serde_json::Value>(), json!({ "error": "invalid_grant" }));
}

#[tokio::test]
async fn test_concurrent_redemption_has_one_winner() {
    let bridge = TestBridge::start().await;
    let code = bridge.linking_code("SFCODE1").await;

    let (a, b, c, d) = tokio::join!(
        bridge.exchange(&code),
        bridge.exchange(&code),
        bridge.exchange(&code),
        bridge.exchange(&code),
    );

    let statuses = [a, b, c, d].map(|r| r.status_code());
    let winners = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let losers = statuses
        .iter()
        .filter(|s| **s == StatusCode::BAD_REQUEST)
        .count();
    assert_eq!((winners, losers), (1, 3));
}

#[tokio::test]
async fn test_linking_code_accepted_at_9_59() {
    let bridge = TestBridge::start().await;
    let code = bridge.linking_code("SFCODE1").await;

    bridge.clock.advance(Duration::seconds(9 * 60 + 59));

    assert_eq!(bridge.exchange(&code).await.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_linking_code_rejected_at_10_01() {
    let bridge = TestBridge::start().await;
    let code = bridge.linking_code("SFCODE1").await;

    bridge.clock.advance(Duration::seconds(10 * 60 + 1));

    let response = bridge.exchange(&code).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<serde_json::Value>(), json!({ "error": "invalid_grant" }));
}

// =============================================================================
// Credential Lookup
// =============================================================================

#[tokio::test]
async fn test_lookup_failures_are_indistinguishable() {
    let bridge = TestBridge::start().await;
    let token = bridge.bearer_token("SFCODE1").await;

    bridge.clock.advance(Duration::hours(1));

    let expired = format!("Bearer {token}");
    let unknown = "Bearer vlat_AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_string();
    let cases = [
        None,
        Some("Bearer"),
        Some("Bearer not-a-token"),
        Some(unknown.as_str()),
        Some(expired.as_str()),
        Some("Basic djE6eA=="),
    ];

    let mut bodies = Vec::new();
    for authorization in cases {
        let response = bridge.lookup(authorization).await;
        assert_eq!(
            response.status_code(),
            StatusCode::UNAUTHORIZED,
            "authorization {authorization:?}"
        );
        bodies.push(response.text());
    }

    let first = bodies.first().unwrap();
    assert!(bodies.iter().all(|b| b == first));
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(first).unwrap(),
        json!({ "error": "unauthorized" })
    );
}

#[tokio::test]
async fn test_lookup_within_lifetime() {
    let bridge = TestBridge::start().await;
    let token = bridge.bearer_token("SFCODE1").await;

    bridge.clock.advance(Duration::minutes(59));

    let response = bridge.lookup(Some(&format!("Bearer {token}"))).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<serde_json::Value>(),
        json!({ "shopIdentifier": SHOP, "shopCredentialSecret": SHOP_ACCESS_TOKEN })
    );
}

#[tokio::test]
async fn test_token_responses_are_not_cached() {
    let bridge = TestBridge::start().await;
    let code = bridge.linking_code("SFCODE1").await;

    let response = bridge.exchange(&code).await;
    let cache_control = response.header(header::CACHE_CONTROL);
    assert!(cache_control.to_str().unwrap().contains("no-store"));

    let token: serde_json::Value = response.json();
    let response = bridge
        .lookup(Some(&format!(
            "Bearer {}",
            token["access_token"].as_str().unwrap()
        )))
        .await;
    let cache_control = response.header(header::CACHE_CONTROL);
    assert!(cache_control.to_str().unwrap().contains("no-store"));
}
