//! Commerce REST API port and client.
//!
//! # Architecture
//!
//! - The remote API is the source of truth for authenticated carts, orders,
//!   and payments - no local sync, direct calls with reload-after-write
//! - Stores depend on the [`CommerceApi`] trait, never on the concrete
//!   client, so tests substitute scripted fakes
//! - Product catalog responses are cached in-memory via `moka` (5 minute
//!   TTL); mutable state (cart, orders, payment) is never cached

mod rest;
pub mod types;

pub use rest::RestClient;
pub use types::{
    CreatedOrder, OrderDetail, OrderPayload, OrderPayloadLine, PaymentSession, ProfileUpdate,
    RemoteCartEntry, RemoteWishlistEntry, UserProfile,
};

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use tamarind_core::{LineItemId, OrderId, OrderStatus, Product, ProductId};

/// Errors that can occur when talking to the commerce API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Remote rejected the credential (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Endpoint shape not supported (405).
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Remote rejected the request body (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Rate limited by the remote.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success response.
    #[error("remote error ({status}): {message}")]
    Remote { status: u16, message: String },
}

impl ApiError {
    /// Map a non-success HTTP status to the taxonomy.
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Self::Unauthorized(message),
            404 => Self::NotFound(message),
            405 => Self::MethodNotAllowed(message),
            400 => Self::BadRequest(message),
            _ => Self::Remote { status, message },
        }
    }

    /// Whether this error means "not logged in".
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether a status-style update should retry the alternate endpoint
    /// shape (404/405).
    #[must_use]
    pub const fn is_endpoint_shape_mismatch(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::MethodNotAllowed(_))
    }
}

/// The consumed surface of the commerce REST API.
///
/// All requests carry a bearer credential when one is set; clearing the
/// credential removes the authorization header rather than sending an empty
/// one.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    /// Set or clear the bearer credential used for subsequent requests.
    fn set_credential(&self, token: Option<SecretString>);

    /// List the product catalog.
    async fn list_products(&self) -> Result<Vec<Product>, ApiError>;

    /// Fetch the authenticated user's cart entries.
    async fn cart_entries(&self) -> Result<Vec<RemoteCartEntry>, ApiError>;

    /// Create or increment a cart entry for a product.
    async fn add_cart_entry(&self, product_id: &ProductId, quantity: u32) -> Result<(), ApiError>;

    /// Update the quantity of an existing cart entry.
    async fn update_cart_entry(&self, id: &LineItemId, quantity: u32) -> Result<(), ApiError>;

    /// Delete a cart entry.
    async fn delete_cart_entry(&self, id: &LineItemId) -> Result<(), ApiError>;

    /// Delete every cart entry.
    async fn clear_cart(&self) -> Result<(), ApiError>;

    /// Fetch the authenticated user's wishlist entries.
    async fn wishlist_entries(&self) -> Result<Vec<RemoteWishlistEntry>, ApiError>;

    /// Add a product to the wishlist.
    async fn add_wishlist_entry(&self, product_id: &ProductId) -> Result<(), ApiError>;

    /// Remove a wishlist entry.
    async fn remove_wishlist_entry(&self, id: &LineItemId) -> Result<(), ApiError>;

    /// Create an order from a draft; returns the server-issued order id.
    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderId, ApiError>;

    /// Initialize (or re-initialize) payment for an order.
    ///
    /// Each call returns a fresh payment session; the previous one, if any,
    /// is dead to the gateway.
    async fn init_payment(&self, order_id: &OrderId) -> Result<PaymentSession, ApiError>;

    /// Fetch order detail.
    async fn order_detail(&self, order_id: &OrderId) -> Result<OrderDetail, ApiError>;

    /// Fetch the authenticated user's profile.
    async fn profile(&self) -> Result<UserProfile, ApiError>;

    /// Update the authenticated user's profile.
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError>;

    /// Update an order's status (admin).
    ///
    /// Implementations retry the alternate endpoint shape on 404/405 before
    /// surfacing the error.
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), ApiError>;
}
