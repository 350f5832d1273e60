//! Authenticated cart behavior against the remote API.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::Decimal;
use tamarind_core::{LineItemId, ProductId};
use tamarind_integration_tests::{FakeApi, administrator_snapshot, customer_snapshot, product};
use tamarind_storefront::api::{ApiError, CommerceApi, RemoteCartEntry};
use tamarind_storefront::cart::{CartError, CartStore};
use tamarind_storefront::session::SessionObserver;
use tamarind_storefront::storage::{KeyValueStore, MemoryStore};

fn entry(line: &str, product_id: &str, quantity: u32) -> RemoteCartEntry {
    RemoteCartEntry {
        id: LineItemId::new(line),
        product_id: ProductId::new(product_id),
        quantity,
    }
}

async fn customer_cart() -> (CartStore, Arc<FakeApi>, Arc<MemoryStore>) {
    let api = Arc::new(FakeApi::new());
    let storage = Arc::new(MemoryStore::new());
    let cart = CartStore::new(
        Arc::clone(&api) as Arc<dyn CommerceApi>,
        Arc::clone(&storage) as Arc<dyn KeyValueStore>,
    );
    cart.session_changed(&customer_snapshot("c-1")).await;
    (cart, api, storage)
}

#[tokio::test]
async fn test_remote_entries_hydrate_against_the_catalog() {
    let (cart, api, _storage) = customer_cart().await;
    api.set_products(vec![product("mug", 1000)]);
    api.set_cart(vec![entry("li-1", "mug", 2), entry("li-2", "ghost", 1)]);

    cart.load().await;

    let items = cart.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].product.name, "Product mug");
    // Unknown product renders as a placeholder, never dropped
    assert_eq!(items[1].product.price, None);
    assert_eq!(cart.total(), Decimal::new(2000, 2));
    assert_eq!(cart.count(), 3);
}

#[tokio::test]
async fn test_remove_issues_one_delete_and_one_reload() {
    let (cart, api, _storage) = customer_cart().await;
    api.set_products(vec![product("mug", 1000), product("bowl", 550)]);
    api.set_cart(vec![entry("li-1", "mug", 1), entry("li-2", "bowl", 1)]);
    cart.load().await;
    let before = api.calls().len();

    cart.remove_item(&LineItemId::new("li-2")).await;

    assert_eq!(api.call_count("delete_cart_entry"), 1);
    // One reload = one cart_entries + one list_products after the delete
    let after: Vec<String> = api.calls().split_off(before);
    assert_eq!(
        after,
        vec!["delete_cart_entry", "cart_entries", "list_products"]
    );
    // The visible list is the reload's response
    let items = cart.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, LineItemId::new("li-1"));
}

#[tokio::test]
async fn test_failed_remove_keeps_the_previous_list() {
    let (cart, api, _storage) = customer_cart().await;
    api.set_products(vec![product("mug", 1000)]);
    api.set_cart(vec![entry("li-1", "mug", 1)]);
    cart.load().await;

    api.fail_next(
        "delete_cart_entry",
        ApiError::Remote {
            status: 500,
            message: "boom".to_string(),
        },
    );
    cart.remove_item(&LineItemId::new("li-1")).await;

    assert_eq!(cart.items().len(), 1);
    assert_eq!(api.call_count("delete_cart_entry"), 1);
}

#[tokio::test]
async fn test_unauthorized_operations_fall_back_to_guest_semantics() {
    let (cart, api, storage) = customer_cart().await;
    api.fail_next(
        "add_cart_entry",
        ApiError::Unauthorized("token expired".to_string()),
    );

    cart.add_item(&product("mug", 1000), 2).await.unwrap();

    // The add landed in the guest cart, not the remote one
    assert_eq!(cart.count(), 2);
    assert!(storage.get("tamarind.cart").is_some());
    assert_eq!(api.call_count("cart_entries"), 1, "no reload after the 401");
}

#[tokio::test]
async fn test_administrators_see_an_empty_cart_and_cannot_add() {
    let api = Arc::new(FakeApi::new());
    api.set_cart(vec![entry("li-1", "mug", 1)]);
    let storage = Arc::new(MemoryStore::new());
    let cart = CartStore::new(
        Arc::clone(&api) as Arc<dyn CommerceApi>,
        Arc::clone(&storage) as Arc<dyn KeyValueStore>,
    );

    cart.session_changed(&administrator_snapshot("c-9")).await;

    assert!(cart.items().is_empty());
    assert!(matches!(
        cart.add_item(&product("mug", 1000), 1).await,
        Err(CartError::AdministratorsCannotShop)
    ));
    assert_eq!(api.call_count("cart_entries"), 0);
}

#[tokio::test]
async fn test_administrator_mutations_leave_the_guest_cart_untouched() {
    let api = Arc::new(FakeApi::new());
    let storage = Arc::new(MemoryStore::new());
    let cart = CartStore::new(
        Arc::clone(&api) as Arc<dyn CommerceApi>,
        Arc::clone(&storage) as Arc<dyn KeyValueStore>,
    );

    // A shopper left two items in the device's guest cart
    cart.add_item(&product("mug", 1000), 2).await.unwrap();
    let guest_raw = storage.get("tamarind.cart").unwrap();

    cart.session_changed(&administrator_snapshot("c-9")).await;
    cart.clear().await;
    cart.remove_item(&LineItemId::new("guest-mug")).await;
    cart.set_quantity(&ProductId::new("mug"), 7).await;

    assert_eq!(storage.get("tamarind.cart").as_deref(), Some(guest_raw.as_str()));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_clear_issues_remote_delete_and_resets_locally() {
    let (cart, api, _storage) = customer_cart().await;
    api.set_products(vec![product("mug", 1000)]);
    api.set_cart(vec![entry("li-1", "mug", 2)]);
    cart.load().await;

    cart.clear().await;

    assert_eq!(api.call_count("clear_cart"), 1);
    assert!(cart.items().is_empty());
}
