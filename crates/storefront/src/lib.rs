//! Headless storefront client: session, cart, wishlist, and checkout state
//! for host applications to render.
//!
//! Everything hangs off a [`StorefrontContext`]. The context owns the REST
//! client, the payment gateway client, device-local storage, and the stores;
//! session changes fan out to the stores through an explicit observer list.
//!
//! ```no_run
//! use tamarind_storefront::{StorefrontConfig, StorefrontContext};
//!
//! # async fn run() -> Result<(), tamarind_storefront::ConfigError> {
//! let config = StorefrontConfig::from_env()?;
//! let context = StorefrontContext::new(&config);
//! context.start().await;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod context;
pub mod gateway;
pub mod notify;
pub mod orders;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod wishlist;

#[cfg(test)]
mod testing;

pub use api::{ApiError, CommerceApi, PaymentSession, RestClient};
pub use cart::{CartError, CartStore};
pub use checkout::{Checkout, CheckoutError, CheckoutStep, ShippingForm};
pub use config::{ConfigError, StorefrontConfig};
pub use context::StorefrontContext;
pub use gateway::{CardGateway, GatewayError, PaymentConfirmation, PaymentGateway};
pub use notify::{Notifier, TransactionNotice, TransactionOutcome, WebhookNotifier};
pub use orders::{OrderStatusAdmin, StatusOutcome, StatusOverride};
pub use session::{SessionObserver, SessionSnapshot, SessionState};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use wishlist::WishlistStore;
