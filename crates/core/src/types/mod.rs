//! Core types for voicelink.
//!
//! This module provides type-safe wrappers for the account-linking domain.

pub mod clock;
pub mod credential;
pub mod id;
pub mod secret;
pub mod shop;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::StorefrontCredential;
pub use id::HandshakeId;
pub use secret::{BearerToken, LinkingCode};
pub use shop::{ShopDomain, ShopDomainError};
