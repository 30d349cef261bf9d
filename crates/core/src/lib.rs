//! voicelink core - Shared types library.
//!
//! This crate provides the types shared by the voicelink components:
//! - `bridge` - Account-linking HTTP service (voice platform ↔ Shopify)
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Shop domains, storefront credentials, opaque secret values,
//!   handshake ids and the clock abstraction

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

#[doc(hidden)]
pub mod __private {
    pub use base64;
    pub use rand;
}
