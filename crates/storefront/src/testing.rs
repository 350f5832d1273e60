//! Shared test doubles for in-crate unit tests.

use async_trait::async_trait;
use secrecy::SecretString;

use tamarind_core::{LineItemId, OrderId, OrderStatus, Product, ProductId};

use crate::api::{
    ApiError, CommerceApi, OrderDetail, OrderPayload, PaymentSession, ProfileUpdate,
    RemoteCartEntry, RemoteWishlistEntry, UserProfile,
};

/// An API that panics on any call: guest-mode operations must never touch
/// the network.
pub struct PanicApi;

#[async_trait]
impl CommerceApi for PanicApi {
    fn set_credential(&self, _token: Option<SecretString>) {}

    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn cart_entries(&self) -> Result<Vec<RemoteCartEntry>, ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn add_cart_entry(&self, _: &ProductId, _: u32) -> Result<(), ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn update_cart_entry(&self, _: &LineItemId, _: u32) -> Result<(), ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn delete_cart_entry(&self, _: &LineItemId) -> Result<(), ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn wishlist_entries(&self) -> Result<Vec<RemoteWishlistEntry>, ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn add_wishlist_entry(&self, _: &ProductId) -> Result<(), ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn remove_wishlist_entry(&self, _: &LineItemId) -> Result<(), ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn create_order(&self, _: &OrderPayload) -> Result<OrderId, ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn init_payment(&self, _: &OrderId) -> Result<PaymentSession, ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn order_detail(&self, _: &OrderId) -> Result<OrderDetail, ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn profile(&self) -> Result<UserProfile, ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn update_profile(&self, _: &ProfileUpdate) -> Result<(), ApiError> {
        panic!("guest mode must not call the API")
    }

    async fn update_order_status(&self, _: &OrderId, _: OrderStatus) -> Result<(), ApiError> {
        panic!("guest mode must not call the API")
    }
}
