//! Shared domain types for the Tamarind storefront.
//!
//! Everything here is plain data: IDs, money, identities, and the product
//! snapshots that cart and wishlist entries carry around. Behavior lives in
//! `tamarind-storefront`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
