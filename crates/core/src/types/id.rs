//! Newtype ID for pending account-linking handshakes.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a pending handshake.
///
/// Generated when the voice platform first redirects a human to the bridge.
/// The id itself is never trusted on its own: it only travels to the browser
/// and the storefront inside a signed correlation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandshakeId(Uuid);

impl HandshakeId {
    /// Create a new random handshake id (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HandshakeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandshakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for HandshakeId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<HandshakeId> for Uuid {
    fn from(id: HandshakeId) -> Self {
        id.0
    }
}
