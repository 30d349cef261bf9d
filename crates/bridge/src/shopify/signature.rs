//! Shopify callback HMAC signatures.
//!
//! Shopify signs every OAuth callback with the app's client secret: the
//! query parameters other than `hmac` and `signature` are sorted by key,
//! joined as `key=value` with `&`, and tagged with HMAC-SHA256 (hex).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Parameters that never take part in the signed message.
const UNSIGNED_PARAMS: &[&str] = &["hmac", "signature"];

/// Build the message Shopify signs from decoded query pairs.
fn signed_message(params: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = params
        .iter()
        .filter(|(key, _)| !UNSIGNED_PARAMS.contains(&key.as_str()))
        .collect();

    // Sort alphabetically by key
    pairs.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Compute the hex HMAC Shopify would attach to these callback parameters.
///
/// Any `hmac` or `signature` entries in `params` are ignored.
#[must_use]
pub fn sign_callback_params(params: &[(String, String)], client_secret: &str) -> String {
    // HMAC accepts keys of any length
    let Ok(mut mac) = HmacSha256::new_from_slice(client_secret.as_bytes()) else {
        return String::new();
    };
    mac.update(signed_message(params).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify the `hmac` parameter of a Shopify OAuth callback.
///
/// Returns `false` if the parameter is missing, appears more than once, is
/// not hex, or does not match. The comparison is constant time.
#[must_use]
pub fn verify_callback_hmac(params: &[(String, String)], client_secret: &str) -> bool {
    let mut provided = params.iter().filter(|(key, _)| key == "hmac");
    let (Some((_, provided_hmac)), None) = (provided.next(), provided.next()) else {
        return false;
    };

    let Ok(provided_bytes) = hex::decode(provided_hmac) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(client_secret.as_bytes()) else {
        return false;
    };
    mac.update(signed_message(params).as_bytes());

    mac.verify_slice(&provided_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "hush";

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_signed_message_sorts_and_skips_hmac() {
        let params = pairs(&[
            ("timestamp", "1337178173"),
            ("hmac", "ignored"),
            ("shop", "demo.example"),
            ("code", "SFCODE1"),
        ]);
        assert_eq!(
            signed_message(&params),
            "code=SFCODE1&shop=demo.example&timestamp=1337178173"
        );
    }

    #[test]
    fn test_known_vector() {
        // Example from Shopify's OAuth documentation
        let params = pairs(&[
            ("code", "0907a61c0c8d55e99db179b68161bc00"),
            ("shop", "some-shop.myshopify.com"),
            ("state", "0.6784241404160823"),
            ("timestamp", "1337178173"),
        ]);
        assert_eq!(
            sign_callback_params(&params, SECRET),
            "700e2dadb827fcc8609e9d5ce208b2e9cdaab9df07390d2cbca10d7c328fc4bf"
        );
    }

    #[test]
    fn test_verify_accepts_valid_signature() {
        let mut params = pairs(&[
            ("code", "SFCODE1"),
            ("shop", "demo.example"),
            ("state", "token"),
        ]);
        let hmac = sign_callback_params(&params, SECRET);
        params.push(("hmac".to_string(), hmac));

        assert!(verify_callback_hmac(&params, SECRET));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let mut params = pairs(&[("code", "SFCODE1"), ("shop", "demo.example")]);
        let hmac = sign_callback_params(&params, SECRET);
        params.push(("hmac".to_string(), hmac));

        // Wrong secret
        assert!(!verify_callback_hmac(&params, "other-secret"));

        // Changed value
        let mut tampered = params.clone();
        if let Some(pair) = tampered.iter_mut().find(|(k, _)| k == "shop") {
            pair.1 = "evil.example".to_string();
        }
        assert!(!verify_callback_hmac(&tampered, SECRET));

        // Added parameter
        let mut extended = params.clone();
        extended.push(("extra".to_string(), "1".to_string()));
        assert!(!verify_callback_hmac(&extended, SECRET));
    }

    #[test]
    fn test_verify_rejects_missing_or_malformed_hmac() {
        let params = pairs(&[("code", "SFCODE1"), ("shop", "demo.example")]);
        assert!(!verify_callback_hmac(&params, SECRET));

        let mut not_hex = params.clone();
        not_hex.push(("hmac".to_string(), "zz-not-hex".to_string()));
        assert!(!verify_callback_hmac(&not_hex, SECRET));

        let hmac = sign_callback_params(&params, SECRET);
        let mut duplicated = params;
        duplicated.push(("hmac".to_string(), hmac.clone()));
        duplicated.push(("hmac".to_string(), hmac));
        assert!(!verify_callback_hmac(&duplicated, SECRET));
    }
}
