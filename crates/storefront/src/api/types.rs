//! Wire types for the commerce REST API.
//!
//! Kept separate from the domain types in `tamarind-core`: these mirror what
//! the remote actually sends and receives.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tamarind_core::{CustomerId, DeliveryTier, LineItemId, OrderId, OrderStatus, ProductId};

// =============================================================================
// Cart & Wishlist
// =============================================================================

/// A cart entry as the remote stores it: no product snapshot, just the
/// reference. The cart store hydrates it against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCartEntry {
    pub id: LineItemId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A wishlist entry as the remote stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteWishlistEntry {
    pub id: LineItemId,
    pub product_id: ProductId,
}

// =============================================================================
// Orders
// =============================================================================

/// The order creation request built from a checkout draft.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPayload {
    /// Client-generated key so a retried submission cannot create two orders.
    pub idempotency_key: Uuid,
    pub customer_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub delivery: DeliveryTier,
    pub lines: Vec<OrderPayloadLine>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    /// Lowercase ISO 4217 code.
    pub currency: String,
}

/// One line of an order payload, snapshotted at order-creation time.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPayloadLine {
    pub product_id: ProductId,
    pub name: String,
    /// Missing when the snapshot had no catalog match; the remote treats it
    /// as zero, matching the client-side total.
    pub unit_price: Option<Decimal>,
    pub quantity: u32,
}

/// Response to order creation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedOrder {
    pub id: OrderId,
}

/// Order detail as reported by the remote.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDetail {
    pub id: OrderId,
    pub status: OrderStatus,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment
// =============================================================================

/// An active payment session issued by the gateway for one order.
///
/// Replaced, never mutated: refreshing payment yields a new session and the
/// old secret is dead. Expires server-side after a bounded window.
#[derive(Debug, Clone)]
pub struct PaymentSession {
    /// Gateway session identifier (safe to log).
    pub id: String,
    pub order_id: OrderId,
    /// Opaque confirmation secret, scoped to this session.
    pub client_secret: SecretString,
}

/// Wire shape of a payment-initialization response.
#[derive(Debug, Deserialize)]
pub(crate) struct PaymentSessionWire {
    pub id: String,
    pub client_secret: String,
}

impl PaymentSessionWire {
    pub(crate) fn into_session(self, order_id: OrderId) -> PaymentSession {
        PaymentSession {
            id: self.id,
            order_id,
            client_secret: SecretString::from(self.client_secret),
        }
    }
}

// =============================================================================
// Profile
// =============================================================================

/// The authenticated user's profile.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Free-form role string as the remote reports it; convert through
    /// `Identity::from_role` before branching on it.
    pub role: String,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_payment_session_wire_conversion() {
        let wire = PaymentSessionWire {
            id: "ps_123".to_string(),
            client_secret: "ps_123_secret_abc".to_string(),
        };
        let session = wire.into_session(OrderId::new("ord-1"));
        assert_eq!(session.id, "ps_123");
        assert_eq!(session.client_secret.expose_secret(), "ps_123_secret_abc");
    }

    #[test]
    fn test_profile_update_skips_absent_fields() {
        let update = ProfileUpdate {
            name: Some("Ada".to_string()),
            phone: None,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Ada"}));
    }

    #[test]
    fn test_remote_cart_entry_deserializes() {
        let entry: RemoteCartEntry =
            serde_json::from_str(r#"{"id":"li-1","product_id":"p-1","quantity":2}"#).unwrap();
        assert_eq!(entry.quantity, 2);
        assert_eq!(entry.product_id, ProductId::new("p-1"));
    }
}
