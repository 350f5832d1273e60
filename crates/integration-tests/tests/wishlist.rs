//! Wishlist behavior across session modes.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use tamarind_core::{LineItemId, ProductId};
use tamarind_integration_tests::{FakeApi, customer_snapshot, product};
use tamarind_storefront::api::{ApiError, CommerceApi, RemoteWishlistEntry};
use tamarind_storefront::session::SessionObserver;
use tamarind_storefront::storage::{KeyValueStore, MemoryStore};
use tamarind_storefront::wishlist::WishlistStore;

async fn customer_wishlist() -> (WishlistStore, Arc<FakeApi>) {
    let api = Arc::new(FakeApi::new());
    let storage = Arc::new(MemoryStore::new());
    let wishlist = WishlistStore::new(
        Arc::clone(&api) as Arc<dyn CommerceApi>,
        Arc::clone(&storage) as Arc<dyn KeyValueStore>,
    );
    wishlist.session_changed(&customer_snapshot("c-1")).await;
    (wishlist, api)
}

#[tokio::test]
async fn test_toggle_adds_remotely_then_reloads() {
    let (wishlist, api) = customer_wishlist().await;
    let mug = product("mug", 1000);
    api.set_products(vec![mug.clone()]);

    wishlist.toggle(&mug).await;

    assert_eq!(api.call_count("add_wishlist_entry"), 1);
    assert_eq!(api.call_count("wishlist_entries"), 2, "initial load plus the reload");
    assert!(wishlist.contains(&mug.id));
}

#[tokio::test]
async fn test_toggle_removes_an_existing_entry() {
    let (wishlist, api) = customer_wishlist().await;
    let mug = product("mug", 1000);
    api.set_products(vec![mug.clone()]);
    api.set_wishlist(vec![RemoteWishlistEntry {
        id: LineItemId::new("wl-mug"),
        product_id: ProductId::new("mug"),
    }]);
    wishlist.load().await;
    assert!(wishlist.contains(&mug.id));

    wishlist.toggle(&mug).await;

    assert_eq!(api.call_count("remove_wishlist_entry"), 1);
    assert!(!wishlist.contains(&mug.id));
}

#[tokio::test]
async fn test_failed_toggle_forces_a_reload_to_server_truth() {
    let (wishlist, api) = customer_wishlist().await;
    let mug = product("mug", 1000);
    api.set_products(vec![mug.clone()]);
    api.fail_next(
        "add_wishlist_entry",
        ApiError::Remote {
            status: 500,
            message: "boom".to_string(),
        },
    );

    wishlist.toggle(&mug).await;

    // The optimistic add was not kept; the list matches the remote (empty)
    assert!(!wishlist.contains(&mug.id));
    assert_eq!(api.call_count("wishlist_entries"), 2, "initial load plus the forced reload");
}

#[tokio::test]
async fn test_unauthorized_toggle_applies_guest_semantics() {
    let api = Arc::new(FakeApi::new());
    let storage = Arc::new(MemoryStore::new());
    let wishlist = WishlistStore::new(
        Arc::clone(&api) as Arc<dyn CommerceApi>,
        Arc::clone(&storage) as Arc<dyn KeyValueStore>,
    );
    wishlist.session_changed(&customer_snapshot("c-1")).await;

    let mug = product("mug", 1000);
    api.fail_next(
        "add_wishlist_entry",
        ApiError::Unauthorized("token expired".to_string()),
    );
    wishlist.toggle(&mug).await;

    assert!(wishlist.contains(&mug.id));
    assert!(storage.get("tamarind.wishlist").is_some());
}
