//! Signed correlation tokens.
//!
//! A correlation token threads a pending handshake through the browser and
//! the storefront's consent screen without any cookie or session. It is the
//! `handshake` parameter of `/authorize/shop` and the `state` parameter sent
//! to Shopify.
//!
//! # Format
//!
//! ```text
//! base64url(json claims) "." base64url(HMAC-SHA256(key, first part))
//! ```
//!
//! The claims are not encrypted; they contain nothing but the handshake id,
//! the chosen shop, and the issue time.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use voicelink_core::{HandshakeId, ShopDomain};

use super::LinkError;

type HmacSha256 = Hmac<Sha256>;

/// Tolerated clock skew for tokens that claim to be from the future.
const MAX_FUTURE_SKEW_SECS: i64 = 30;

/// Errors that can occur when signing or verifying a correlation token.
#[derive(Debug, Error)]
pub enum CorrelationError {
    /// The token is not two base64url parts with JSON claims.
    #[error("malformed correlation token")]
    Malformed,

    /// The signature does not match the claims.
    #[error("correlation token signature mismatch")]
    BadSignature,

    /// The token is older than the handshake lifetime.
    #[error("correlation token expired")]
    Expired,

    /// The signing key was rejected.
    #[error("invalid correlation signing key")]
    InvalidKey,

    /// The claims could not be serialized.
    #[error("failed to encode correlation claims: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<CorrelationError> for LinkError {
    fn from(err: CorrelationError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

/// What a correlation token asserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationClaims {
    /// The pending handshake this token belongs to
    #[serde(rename = "h")]
    pub handshake: HandshakeId,
    /// The shop the merchant chose, once known
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub shop: Option<ShopDomain>,
    /// Issue time, seconds since the Unix epoch
    #[serde(rename = "iat")]
    pub issued_at: i64,
}

impl CorrelationClaims {
    /// Claims for a handshake that has no shop yet.
    #[must_use]
    pub fn new(handshake: HandshakeId, now: DateTime<Utc>) -> Self {
        Self {
            handshake,
            shop: None,
            issued_at: now.timestamp(),
        }
    }

    /// Claims binding a shop to the handshake.
    #[must_use]
    pub fn with_shop(handshake: HandshakeId, shop: ShopDomain, now: DateTime<Utc>) -> Self {
        Self {
            handshake,
            shop: Some(shop),
            issued_at: now.timestamp(),
        }
    }
}

/// Signs and verifies correlation tokens.
///
/// Implements `Debug` manually to redact the key.
#[derive(Clone)]
pub struct CorrelationSigner {
    mac: HmacSha256,
    max_age: Duration,
}

impl std::fmt::Debug for CorrelationSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationSigner")
            .field("key", &"[REDACTED]")
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl CorrelationSigner {
    /// Create a signer.
    ///
    /// # Arguments
    ///
    /// * `secret` - Signing key
    /// * `max_age` - How long a token stays valid after it is issued
    ///
    /// # Errors
    ///
    /// Returns `CorrelationError::InvalidKey` if the key is rejected.
    pub fn new(secret: &SecretString, max_age: Duration) -> Result<Self, CorrelationError> {
        let mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|_| CorrelationError::InvalidKey)?;
        Ok(Self { mac, max_age })
    }

    /// Sign `claims` into an opaque token.
    ///
    /// # Errors
    ///
    /// Returns `CorrelationError::Encode` if the claims cannot be serialized.
    pub fn sign(&self, claims: &CorrelationClaims) -> Result<String, CorrelationError> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token and return its claims.
    ///
    /// The signature is checked (in constant time) before the claims are
    /// parsed.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, the signature does not
    /// match, or the token was issued more than `max_age` before `now`.
    pub fn verify(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<CorrelationClaims, CorrelationError> {
        let (payload, signature) = token.split_once('.').ok_or(CorrelationError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| CorrelationError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| CorrelationError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| CorrelationError::Malformed)?;
        let claims: CorrelationClaims =
            serde_json::from_slice(&json).map_err(|_| CorrelationError::Malformed)?;

        let issued_at =
            DateTime::from_timestamp(claims.issued_at, 0).ok_or(CorrelationError::Malformed)?;
        if issued_at > now + Duration::seconds(MAX_FUTURE_SKEW_SECS) {
            return Err(CorrelationError::Malformed);
        }
        if now >= issued_at + self.max_age {
            return Err(CorrelationError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn signer() -> CorrelationSigner {
        CorrelationSigner::new(
            &SecretString::from("k3y-for-correlation-tests-0123456789"),
            Duration::minutes(15),
        )
        .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = signer();
        let claims = CorrelationClaims::with_shop(
            HandshakeId::new(),
            ShopDomain::parse("demo.example").unwrap(),
            now(),
        );

        let token = signer.sign(&claims).unwrap();
        assert_eq!(signer.verify(&token, now()).unwrap(), claims);
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = signer()
            .sign(&CorrelationClaims::new(HandshakeId::new(), now()))
            .unwrap();
        assert!(
            token
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
        );
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let signer = signer();
        let token = signer
            .sign(&CorrelationClaims::with_shop(
                HandshakeId::new(),
                ShopDomain::parse("demo.example").unwrap(),
                now(),
            ))
            .unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        // Same signature, different shop
        let forged_claims = CorrelationClaims::with_shop(
            HandshakeId::new(),
            ShopDomain::parse("evil.example").unwrap(),
            now(),
        );
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{forged_payload}.{signature}");

        assert!(matches!(
            signer.verify(&forged, now()),
            Err(CorrelationError::BadSignature)
        ));
    }

    #[test]
    fn test_other_key_is_rejected() {
        let other = CorrelationSigner::new(
            &SecretString::from("a-different-key-entirely-9876543210"),
            Duration::minutes(15),
        )
        .unwrap();
        let token = other
            .sign(&CorrelationClaims::new(HandshakeId::new(), now()))
            .unwrap();

        assert!(matches!(
            signer().verify(&token, now()),
            Err(CorrelationError::BadSignature)
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        let signer = signer();
        for token in ["", "nodot", "a.b.c", "!!!.???", "abc."] {
            assert!(signer.verify(token, now()).is_err(), "accepted {token:?}");
        }
    }

    #[test]
    fn test_expiry() {
        let signer = signer();
        let token = signer
            .sign(&CorrelationClaims::new(HandshakeId::new(), now()))
            .unwrap();

        assert!(signer.verify(&token, now() + Duration::minutes(14)).is_ok());
        assert!(matches!(
            signer.verify(&token, now() + Duration::minutes(15)),
            Err(CorrelationError::Expired)
        ));
    }

    #[test]
    fn test_future_tokens_are_rejected() {
        let signer = signer();
        let token = signer
            .sign(&CorrelationClaims::new(
                HandshakeId::new(),
                now() + Duration::hours(1),
            ))
            .unwrap();

        assert!(matches!(
            signer.verify(&token, now()),
            Err(CorrelationError::Malformed)
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug_output = format!("{:?}", signer());
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("k3y-for-correlation"));
    }
}
