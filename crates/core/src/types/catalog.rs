//! Product snapshots and the line items that reference them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{LineItemId, ProductId};
use super::money::Money;

/// A product as the remote catalog describes it.
///
/// Immutable from the storefront's perspective; line items carry a
/// denormalized copy so they render without re-fetching the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price. `None` when the snapshot predates a catalog match; all
    /// total computations treat it as zero.
    pub price: Option<Money>,
    /// Available stock count.
    pub stock: i64,
    /// Category label.
    pub category: String,
}

impl Product {
    /// Snapshot used when a remote cart entry has no catalog match.
    ///
    /// Guarantees every line item has a product to display.
    #[must_use]
    pub fn placeholder(id: ProductId) -> Self {
        Self {
            id,
            name: "Unavailable product".to_string(),
            price: None,
            stock: 0,
            category: String::new(),
        }
    }
}

/// One cart entry: a product reference plus a positive quantity.
///
/// Invariant: at most one line per distinct product within a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Server-issued when authenticated, `guest-<productId>` otherwise.
    pub id: LineItemId,
    pub product_id: ProductId,
    /// Denormalized product snapshot for display.
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// Price times quantity, with a missing price treated as zero.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        let unit = self.product.price.map_or(Decimal::ZERO, |p| p.amount);
        unit * Decimal::from(self.quantity)
    }
}

/// One wishlist entry. Same shape as a cart line, without a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub id: LineItemId,
    pub product_id: ProductId,
    pub product: Product,
}
