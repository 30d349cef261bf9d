//! Storefront credential type.

use secrecy::{ExposeSecret, SecretString};

use super::ShopDomain;

/// Credential proving the bridge may act against one storefront.
///
/// Produced only by a successful storefront OAuth code exchange. The access
/// token is the merchant's long-lived secret: the voice platform never sees
/// it directly, only through a bearer token issued by the bridge.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct StorefrontCredential {
    shop: ShopDomain,
    access_token: SecretString,
    scopes: String,
}

impl StorefrontCredential {
    /// Create a new storefront credential.
    #[must_use]
    pub fn new(shop: ShopDomain, access_token: SecretString, scopes: impl Into<String>) -> Self {
        Self {
            shop,
            access_token,
            scopes: scopes.into(),
        }
    }

    /// The shop this credential belongs to.
    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        &self.shop
    }

    /// The storefront access token.
    #[must_use]
    pub const fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    /// Comma-separated scopes granted by the storefront.
    #[must_use]
    pub fn scopes(&self) -> &str {
        &self.scopes
    }
}

impl PartialEq for StorefrontCredential {
    fn eq(&self, other: &Self) -> bool {
        self.shop == other.shop
            && self.scopes == other.scopes
            && self.access_token.expose_secret() == other.access_token.expose_secret()
    }
}

impl Eq for StorefrontCredential {}

impl std::fmt::Debug for StorefrontCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontCredential")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn credential(token: &str) -> StorefrontCredential {
        StorefrontCredential::new(
            ShopDomain::parse("demo.example").unwrap(),
            SecretString::from(token),
            "unauthenticated_read_product_listings",
        )
    }

    #[test]
    fn test_accessors() {
        let cred = credential("shpat_abc123");
        assert_eq!(cred.shop().as_str(), "demo.example");
        assert_eq!(cred.access_token().expose_secret(), "shpat_abc123");
        assert_eq!(cred.scopes(), "unauthenticated_read_product_listings");
    }

    #[test]
    fn test_equality_compares_secret() {
        assert_eq!(credential("shpat_abc123"), credential("shpat_abc123"));
        assert_ne!(credential("shpat_abc123"), credential("shpat_xyz789"));
    }

    #[test]
    fn test_debug_redacts_access_token() {
        let debug_output = format!("{:?}", credential("super_secret_shop_token"));
        assert!(debug_output.contains("demo.example"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_shop_token"));
    }
}
