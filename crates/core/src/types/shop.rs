//! Shop domain type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopDomainError {
    /// The input string is empty.
    #[error("shop domain cannot be empty")]
    Empty,
    /// The input string is too short or too long.
    #[error("shop domain must be between {min} and {max} characters")]
    InvalidLength {
        /// Minimum allowed length.
        min: usize,
        /// Maximum allowed length.
        max: usize,
    },
    /// The domain has no dot separating labels.
    #[error("shop domain must contain at least one dot")]
    MissingDot,
    /// A label contains a character outside `[a-z0-9-]`.
    #[error("shop domain contains invalid character '{0}'")]
    InvalidCharacter(char),
    /// A label is empty or starts/ends with a hyphen.
    #[error("shop domain contains an invalid label")]
    InvalidLabel,
}

/// A storefront's host name, e.g. `demo.myshopify.com`.
///
/// The shop domain is what the merchant types into the linking page and what
/// Shopify echoes back on the OAuth callback. It ends up interpolated into
/// outbound URLs (`https://{shop}/admin/oauth/...`), so parsing is strict:
/// anything that could smuggle a scheme, path, port, or userinfo is rejected.
///
/// ## Normalization
///
/// - Surrounding whitespace is trimmed
/// - An `https://` or `http://` prefix and a single trailing `/` are removed
/// - The result is lowercased
///
/// ## Examples
///
/// ```
/// use voicelink_core::ShopDomain;
///
/// let shop = ShopDomain::parse(" https://Demo.MyShopify.com/ ").unwrap();
/// assert_eq!(shop.as_str(), "demo.myshopify.com");
///
/// assert!(ShopDomain::parse("demo").is_err());               // no dot
/// assert!(ShopDomain::parse("demo.example/admin").is_err()); // path
/// assert!(ShopDomain::parse("evil.com:8443").is_err());      // port
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Minimum length of a shop domain (`a.b`).
    pub const MIN_LENGTH: usize = 3;
    /// Maximum length of a DNS name.
    pub const MAX_LENGTH: usize = 253;

    /// Parse and normalize a `ShopDomain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the normalized input is empty, has the wrong
    /// length, has no dot, or contains a label that is not a valid DNS label.
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        let lowered = s.trim().to_ascii_lowercase();
        let stripped = lowered
            .strip_prefix("https://")
            .or_else(|| lowered.strip_prefix("http://"))
            .unwrap_or(&lowered);
        let normalized = stripped.strip_suffix('/').unwrap_or(stripped);

        if normalized.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        if normalized.len() < Self::MIN_LENGTH || normalized.len() > Self::MAX_LENGTH {
            return Err(ShopDomainError::InvalidLength {
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(c) = normalized
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '.'))
        {
            return Err(ShopDomainError::InvalidCharacter(c));
        }

        if !normalized.contains('.') {
            return Err(ShopDomainError::MissingDot);
        }

        for label in normalized.split('.') {
            if label.is_empty()
                || label.len() > 63
                || label.starts_with('-')
                || label.ends_with('-')
            {
                return Err(ShopDomainError::InvalidLabel);
            }
        }

        Ok(Self(normalized.to_owned()))
    }

    /// Returns the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ShopDomain` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = ShopDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShopDomain> for String {
    fn from(shop: ShopDomain) -> Self {
        shop.0
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ShopDomain {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ShopDomain {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ShopDomain {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
