//! Session mode switches: credential fan-out and store reloads.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::SecretString;
use tamarind_core::{CustomerId, Identity, LineItemId, ProductId};
use tamarind_integration_tests::{FakeApi, product};
use tamarind_storefront::api::{CommerceApi, RemoteCartEntry};
use tamarind_storefront::cart::CartStore;
use tamarind_storefront::session::{SessionObserver, SessionState};
use tamarind_storefront::storage::{KeyValueStore, MemoryStore, keys};

struct Rig {
    session: SessionState,
    cart: CartStore,
    api: Arc<FakeApi>,
    storage: Arc<MemoryStore>,
}

/// Session wired to a cart the way the context wires it: credential sync
/// first, then the store.
fn rig() -> Rig {
    let api = Arc::new(FakeApi::new());
    let storage = Arc::new(MemoryStore::new());
    let session = SessionState::new(Arc::clone(&storage) as Arc<dyn KeyValueStore>);
    let cart = CartStore::new(
        Arc::clone(&api) as Arc<dyn CommerceApi>,
        Arc::clone(&storage) as Arc<dyn KeyValueStore>,
    );

    struct CredentialSync(Arc<FakeApi>);
    #[async_trait::async_trait]
    impl SessionObserver for CredentialSync {
        async fn session_changed(
            &self,
            snapshot: &tamarind_storefront::session::SessionSnapshot,
        ) {
            self.0.set_credential(snapshot.token.clone());
        }
    }

    session.subscribe(Arc::new(CredentialSync(Arc::clone(&api))));
    session.subscribe(Arc::new(cart.clone()));
    Rig {
        session,
        cart,
        api,
        storage,
    }
}

#[tokio::test]
async fn test_login_triggers_exactly_one_load_for_the_new_mode() {
    let rig = rig();
    rig.api.set_products(vec![product("mug", 1000)]);
    rig.api.set_cart(vec![RemoteCartEntry {
        id: LineItemId::new("li-1"),
        product_id: ProductId::new("mug"),
        quantity: 2,
    }]);

    rig.session
        .login(SecretString::from("tok-1"), "user", CustomerId::new("c-1"))
        .await;

    assert_eq!(rig.api.call_count("cart_entries"), 1);
    assert_eq!(rig.cart.count(), 2);
    // Credential reached the API before the reload ran
    assert_eq!(
        rig.api.calls().first().map(String::as_str),
        Some("set_credential(some)")
    );
}

#[tokio::test]
async fn test_logout_shows_the_guest_list_not_the_remote_one() {
    let rig = rig();
    rig.api.set_products(vec![product("mug", 1000)]);
    rig.api.set_cart(vec![RemoteCartEntry {
        id: LineItemId::new("li-1"),
        product_id: ProductId::new("mug"),
        quantity: 5,
    }]);

    // Guest buys nothing, logs in, sees the remote cart, logs out
    rig.session
        .login(SecretString::from("tok-1"), "user", CustomerId::new("c-1"))
        .await;
    assert_eq!(rig.cart.count(), 5);

    rig.session.logout().await;

    assert_eq!(rig.cart.count(), 0, "remote lines must not leak into guest mode");
    assert_eq!(rig.session.snapshot().identity, Identity::Guest);
}

#[tokio::test]
async fn test_guest_cart_survives_a_login_logout_round_trip() {
    let rig = rig();
    rig.cart.session_changed(&rig.session.snapshot()).await;
    rig.cart.add_item(&product("mug", 1000), 2).await.unwrap();

    rig.session
        .login(SecretString::from("tok-1"), "user", CustomerId::new("c-1"))
        .await;
    assert_eq!(rig.cart.count(), 0, "remote cart is empty for this customer");

    rig.session.logout().await;

    // The guest cart was never merged or destroyed
    assert_eq!(rig.cart.count(), 2);
    assert_eq!(rig.cart.total(), Decimal::new(2000, 2));
    assert!(rig.storage.get(keys::GUEST_CART).is_some());
}

#[tokio::test]
async fn test_restore_of_a_stored_credential_hydrates_authenticated() {
    let rig = rig();
    rig.session
        .login(SecretString::from("tok-1"), "user", CustomerId::new("c-1"))
        .await;

    // Fresh session over the same storage, as on app start
    let session = SessionState::new(Arc::clone(&rig.storage) as Arc<dyn KeyValueStore>);
    session.subscribe(Arc::new(rig.cart.clone()));
    session.restore().await;

    assert!(session.snapshot().identity.is_authenticated());
}
