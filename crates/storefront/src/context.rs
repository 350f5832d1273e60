//! Storefront context: owns every collaborator and wires the observer
//! graph. There are no global singletons; hosts reach all state through a
//! context instance.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::api::{CommerceApi, RestClient};
use crate::cart::CartStore;
use crate::checkout::Checkout;
use crate::config::StorefrontConfig;
use crate::gateway::{CardGateway, PaymentGateway};
use crate::notify::{Notifier, WebhookNotifier};
use crate::orders::OrderStatusAdmin;
use crate::session::{SessionObserver, SessionSnapshot, SessionState};
use crate::storage::{JsonFileStore, KeyValueStore, MemoryStore};
use crate::wishlist::WishlistStore;

/// The assembled storefront. Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct StorefrontContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    session: SessionState,
    cart: CartStore,
    wishlist: WishlistStore,
    checkout: Checkout,
    orders: OrderStatusAdmin,
}

/// Pushes the session credential into the API client. Subscribed first so
/// every store reload that follows runs with the new credential.
struct CredentialSync {
    api: Arc<dyn CommerceApi>,
}

#[async_trait]
impl SessionObserver for CredentialSync {
    async fn session_changed(&self, session: &SessionSnapshot) {
        self.api.set_credential(session.token.clone());
    }
}

impl StorefrontContext {
    /// Assemble a context from configuration.
    #[must_use]
    pub fn new(config: &StorefrontConfig) -> Self {
        let storage: Arc<dyn KeyValueStore> = match &config.storage_path {
            Some(path) => Arc::new(JsonFileStore::open(path.clone())),
            None => Arc::new(MemoryStore::new()),
        };

        let api: Arc<dyn CommerceApi> = Arc::new(RestClient::new(config.api_base_url.clone()));
        let gateway: Arc<dyn PaymentGateway> =
            Arc::new(CardGateway::new(&config.gateway, config.currency));
        let notifier: Arc<dyn Notifier> = Arc::new(WebhookNotifier::new(config.audit.as_ref()));

        let session = SessionState::new(Arc::clone(&storage));
        let cart = CartStore::new(Arc::clone(&api), Arc::clone(&storage));
        let wishlist = WishlistStore::new(Arc::clone(&api), Arc::clone(&storage));
        let checkout = Checkout::new(
            Arc::clone(&api),
            gateway,
            notifier,
            cart.clone(),
            config.currency,
        );
        let orders = OrderStatusAdmin::new(Arc::clone(&api), Arc::clone(&storage));

        // Credential sync must run before the stores reload
        session.subscribe(Arc::new(CredentialSync {
            api: Arc::clone(&api),
        }));
        session.subscribe(Arc::new(cart.clone()));
        session.subscribe(Arc::new(wishlist.clone()));

        Self {
            inner: Arc::new(ContextInner {
                session,
                cart,
                wishlist,
                checkout,
                orders,
            }),
        }
    }

    /// Restore the persisted session and hydrate the stores for its mode.
    #[instrument(skip(self))]
    pub async fn start(&self) {
        self.inner.session.restore().await;
    }

    /// Tear the session down; stores fall back to guest mode.
    pub async fn logout(&self) {
        self.inner.session.logout().await;
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    /// The single checkout instance for this context.
    #[must_use]
    pub fn checkout(&self) -> &Checkout {
        &self.inner.checkout
    }

    #[must_use]
    pub fn orders(&self) -> &OrderStatusAdmin {
        &self.inner.orders
    }
}
