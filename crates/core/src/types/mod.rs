//! Core type definitions.

mod catalog;
mod id;
mod identity;
mod money;
mod status;

pub use catalog::{CartLine, Product, WishlistEntry};
pub use id::{CustomerId, LineItemId, OrderId, ProductId};
pub use identity::Identity;
pub use money::{CurrencyCode, Money};
pub use status::{DeliveryTier, OrderStatus};
