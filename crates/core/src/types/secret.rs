//! Opaque, unguessable secret values handed to the voice platform.
//!
//! Use the `define_secret_value!` macro to create a prefixed newtype around a
//! random base64url string. Each type has its own prefix, so a bearer token
//! can never be mistaken for a linking code (and vice versa) even before any
//! store lookup happens.

/// Number of random bytes in every generated secret value (256 bits).
pub const SECRET_VALUE_BYTES: usize = 32;

/// Length of the base64url (unpadded) encoding of [`SECRET_VALUE_BYTES`].
pub const SECRET_VALUE_ENCODED_LEN: usize = 43;

/// Macro to define an opaque secret value type.
///
/// Creates a newtype wrapper around `String` with:
/// - `generate()` drawing [`SECRET_VALUE_BYTES`] bytes from the OS-seeded CSPRNG
/// - `parse()` returning `None` for anything that is not well-formed
/// - `expose_secret()` for the places that must put the value on the wire
/// - `Debug` that redacts the value
/// - `Clone`, `PartialEq`, `Eq`, `Hash` (usable as a map key)
///
/// There is deliberately no `Display` impl, so the value can't end up in a
/// log line through `{}` formatting.
///
/// # Example
///
/// ```rust
/// # use voicelink_core::define_secret_value;
/// define_secret_value!(SessionKey, "sk_");
///
/// let key = SessionKey::generate();
/// assert!(key.expose_secret().starts_with("sk_"));
/// assert!(SessionKey::parse(key.expose_secret()).is_some());
/// assert!(SessionKey::parse("sk_short").is_none());
/// ```
#[macro_export]
macro_rules! define_secret_value {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            /// Prefix carried by every value of this type.
            pub const PREFIX: &'static str = $prefix;

            /// Generate a fresh random value.
            #[must_use]
            pub fn generate() -> Self {
                use $crate::__private::base64::Engine as _;
                use $crate::__private::rand::RngCore as _;

                let mut bytes = [0u8; $crate::types::secret::SECRET_VALUE_BYTES];
                $crate::__private::rand::rng().fill_bytes(&mut bytes);
                let encoded = $crate::__private::base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);
                Self(format!("{}{}", Self::PREFIX, encoded))
            }

            /// Parse a value received from a client.
            ///
            /// Returns `None` unless the input has the right prefix, the
            /// right length, and only base64url characters. This is a shape
            /// check only; it says nothing about whether the value was ever
            /// issued.
            #[must_use]
            pub fn parse(s: &str) -> Option<Self> {
                let body = s.strip_prefix(Self::PREFIX)?;
                let well_formed = body.len() == $crate::types::secret::SECRET_VALUE_ENCODED_LEN
                    && body
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
                well_formed.then(|| Self(s.to_owned()))
            }

            /// Returns the raw value.
            #[must_use]
            pub fn expose_secret(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&"[REDACTED]").finish()
            }
        }
    };
}

// Define the values exchanged with the voice platform
define_secret_value!(LinkingCode, "vlc_");
define_secret_value!(BearerToken, "vlat_");
