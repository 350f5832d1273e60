//! Cart store: the authoritative line-item list for the current session mode.
//!
//! Guest carts live in device storage and are written synchronously after
//! every mutation; guest operations never fail. Authenticated carts live on
//! the remote: every mutation issues the write and then reloads the full
//! cart, so callers observe either the pre-mutation list or the fully synced
//! post-mutation list, never an intermediate. The two lists are never merged
//! across a mode switch.
//!
//! A remote 401 on a cart operation is treated as "not logged in" and falls
//! back to guest semantics silently; other remote failures leave the
//! pre-mutation list visible.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{instrument, warn};

use tamarind_core::{CartLine, Identity, LineItemId, Product, ProductId};

use crate::api::{ApiError, CommerceApi};
use crate::session::{SessionObserver, SessionSnapshot};
use crate::storage::{KeyValueStore, keys};

/// Errors surfaced by cart mutations.
///
/// Guest-mode operations cannot fail; only administrative suppression and
/// authenticated remote failures produce errors.
#[derive(Debug, Error)]
pub enum CartError {
    /// The current identity is administrative. Administrators do not shop.
    #[error("administrators cannot shop")]
    AdministratorsCannotShop,

    /// The remote write failed; the pre-mutation cart is still visible.
    #[error(transparent)]
    Remote(#[from] ApiError),
}

/// Reactive cart store. Cheaply cloneable via `Arc`; all clones share state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    api: Arc<dyn CommerceApi>,
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<CartState>,
    loading: AtomicBool,
}

#[derive(Default)]
struct CartState {
    identity: Identity,
    items: Vec<CartLine>,
}

impl CartStore {
    /// Create an empty cart store in guest mode.
    #[must_use]
    pub fn new(api: Arc<dyn CommerceApi>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                api,
                storage,
                state: Mutex::new(CartState::default()),
                loading: AtomicBool::new(false),
            }),
        }
    }

    // =========================================================================
    // Read surface
    // =========================================================================

    /// Current line items, in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartLine> {
        self.with_state(|state| state.items.clone())
    }

    /// Sum of quantities across items.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.with_state(|state| state.items.iter().map(|line| line.quantity).sum())
    }

    /// Sum of (snapshot price x quantity); a missing price counts as zero.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.with_state(|state| state.items.iter().map(CartLine::line_total).sum())
    }

    /// Whether a load is in flight (drives the busy indicator).
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Rebuild the item list for the current session mode.
    ///
    /// Guest: deserialize from device storage, treating missing or corrupt
    /// data as an empty cart. Authenticated: fetch remote entries plus the
    /// catalog and hydrate each entry with its product snapshot, falling back
    /// to a placeholder so every line renders. Administrative identities get
    /// a forced-empty cart.
    #[instrument(skip(self))]
    pub async fn load(&self) {
        self.inner.loading.store(true, Ordering::SeqCst);

        let identity = self.with_state(|state| state.identity.clone());
        let items = match identity {
            Identity::Administrator(_) => Vec::new(),
            Identity::Guest => self.read_guest(),
            Identity::Customer(_) => match self.load_remote().await {
                Ok(items) => items,
                Err(e) if e.is_unauthorized() => {
                    warn!("Cart load unauthorized, falling back to guest cart");
                    self.read_guest()
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load cart, keeping current items");
                    self.with_state(|state| state.items.clone())
                }
            },
        };

        self.with_state(|state| state.items = items);
        self.inner.loading.store(false, Ordering::SeqCst);
    }

    /// Add `quantity` of a product, merging into an existing line item.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::AdministratorsCannotShop`] for administrative
    /// identities and [`CartError::Remote`] when an authenticated write fails
    /// for a reason other than 401.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_item(&self, product: &Product, quantity: u32) -> Result<(), CartError> {
        let identity = self.with_state(|state| state.identity.clone());

        if identity.is_administrator() {
            return Err(CartError::AdministratorsCannotShop);
        }
        if quantity == 0 {
            return Ok(());
        }

        if identity.is_authenticated() {
            match self.inner.api.add_cart_entry(&product.id, quantity).await {
                Ok(()) => {
                    // Read-after-write: re-fetch rather than merge optimistically
                    self.load().await;
                    return Ok(());
                }
                Err(e) if e.is_unauthorized() => {
                    warn!("Cart add unauthorized, applying guest semantics");
                }
                Err(e) => return Err(CartError::Remote(e)),
            }
        }

        self.merge_guest(product, quantity);
        Ok(())
    }

    /// Remove a line item. Remote failures are swallowed: the pre-mutation
    /// list stays visible and the next load resynchronizes.
    #[instrument(skip(self), fields(line_id = %id))]
    pub async fn remove_item(&self, id: &LineItemId) {
        let identity = self.with_state(|state| state.identity.clone());

        // The administrative cart is forced empty; the device's guest cart
        // must survive untouched
        if identity.is_administrator() {
            return;
        }

        if identity.is_authenticated() {
            match self.inner.api.delete_cart_entry(id).await {
                Ok(()) => {
                    self.load().await;
                    return;
                }
                Err(e) if e.is_unauthorized() => {
                    warn!("Cart remove unauthorized, applying guest semantics");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to remove cart entry");
                    return;
                }
            }
        }

        self.with_state(|state| state.items.retain(|line| &line.id != id));
        self.persist_guest();
    }

    /// Set the quantity of the line referencing `product_id`.
    ///
    /// A quantity below 1 is a no-op: removal is explicit, never implied.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn set_quantity(&self, product_id: &ProductId, quantity: u32) {
        if quantity < 1 {
            return;
        }

        let identity = self.with_state(|state| state.identity.clone());
        if identity.is_administrator() {
            return;
        }

        if identity.is_authenticated() {
            let line_id = self.with_state(|state| {
                state
                    .items
                    .iter()
                    .find(|line| &line.product_id == product_id)
                    .map(|line| line.id.clone())
            });
            let Some(line_id) = line_id else {
                return;
            };

            match self.inner.api.update_cart_entry(&line_id, quantity).await {
                Ok(()) => {
                    self.load().await;
                    return;
                }
                Err(e) if e.is_unauthorized() => {
                    warn!("Cart update unauthorized, applying guest semantics");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to update cart entry");
                    return;
                }
            }
        }

        self.with_state(|state| {
            for line in &mut state.items {
                if &line.product_id == product_id {
                    line.quantity = quantity;
                }
            }
        });
        self.persist_guest();
    }

    /// Empty the cart.
    ///
    /// Guest: clear the list and remove the persisted key. Authenticated:
    /// issue a remote delete-all, then reset locally without a reload (the
    /// result is known). A failed remote delete is logged; the next load
    /// resynchronizes with server truth.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        let identity = self.with_state(|state| state.identity.clone());
        if identity.is_administrator() {
            return;
        }

        if identity.is_authenticated() {
            if let Err(e) = self.inner.api.clear_cart().await {
                warn!(error = %e, "Failed to clear remote cart");
            }
            self.with_state(|state| state.items.clear());
            return;
        }

        self.with_state(|state| state.items.clear());
        self.inner.storage.remove(keys::GUEST_CART);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn with_state<T>(&self, f: impl FnOnce(&mut CartState) -> T) -> T {
        let mut guard = self
            .inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    async fn load_remote(&self) -> Result<Vec<CartLine>, ApiError> {
        let entries = self.inner.api.cart_entries().await?;
        let catalog = self.inner.api.list_products().await?;
        let by_id: HashMap<&ProductId, &Product> =
            catalog.iter().map(|product| (&product.id, product)).collect();

        Ok(entries
            .into_iter()
            .map(|entry| {
                let product = by_id.get(&entry.product_id).map_or_else(
                    || Product::placeholder(entry.product_id.clone()),
                    |product| (*product).clone(),
                );
                CartLine {
                    id: entry.id,
                    product_id: entry.product_id,
                    product,
                    quantity: entry.quantity,
                }
            })
            .collect())
    }

    fn read_guest(&self) -> Vec<CartLine> {
        self.inner
            .storage
            .get(keys::GUEST_CART)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn merge_guest(&self, product: &Product, quantity: u32) {
        self.with_state(|state| {
            if let Some(line) = state
                .items
                .iter_mut()
                .find(|line| line.product_id == product.id)
            {
                line.quantity += quantity;
            } else {
                state.items.push(CartLine {
                    id: LineItemId::for_guest(&product.id),
                    product_id: product.id.clone(),
                    product: product.clone(),
                    quantity,
                });
            }
        });
        self.persist_guest();
    }

    fn persist_guest(&self) {
        let items = self.with_state(|state| state.items.clone());
        match serde_json::to_string(&items) {
            Ok(raw) => self.inner.storage.set(keys::GUEST_CART, &raw),
            Err(e) => warn!(error = %e, "Failed to serialize guest cart"),
        }
    }
}

#[async_trait]
impl SessionObserver for CartStore {
    /// Mode transition: adopt the new identity and re-run `load()` once.
    /// The previous mode's list is discarded, never merged.
    async fn session_changed(&self, session: &SessionSnapshot) {
        self.with_state(|state| {
            state.identity = session.identity.clone();
            state.items.clear();
        });
        self.load().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::PanicApi;
    use tamarind_core::{CurrencyCode, Money};

    fn product(id: &str, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Some(Money::new(Decimal::new(cents, 2), CurrencyCode::USD)),
            stock: 25,
            category: "tea".to_string(),
        }
    }

    fn guest_store() -> (CartStore, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        let cart = CartStore::new(
            Arc::new(PanicApi),
            Arc::clone(&storage) as Arc<dyn KeyValueStore>,
        );
        (cart, storage)
    }

    fn persisted(storage: &MemoryStore) -> Vec<CartLine> {
        storage
            .get(keys::GUEST_CART)
            .map(|raw| serde_json::from_str(&raw).unwrap())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_guest_add_merges_same_product() {
        let (cart, _storage) = guest_store();
        let p = product("a", 1000);

        cart.add_item(&p, 1).await.unwrap();
        cart.add_item(&p, 2).await.unwrap();

        let items = cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().quantity, 3);
        assert_eq!(cart.total(), Decimal::new(3000, 2));
        assert_eq!(cart.count(), 3);
    }

    #[tokio::test]
    async fn test_guest_persistence_mirrors_memory() {
        let (cart, storage) = guest_store();
        let a = product("a", 1000);
        let b = product("b", 550);

        cart.add_item(&a, 1).await.unwrap();
        assert_eq!(persisted(&storage), cart.items());

        cart.add_item(&b, 4).await.unwrap();
        assert_eq!(persisted(&storage), cart.items());

        cart.set_quantity(&b.id, 2).await;
        assert_eq!(persisted(&storage), cart.items());

        cart.remove_item(&LineItemId::for_guest(&a.id)).await;
        assert_eq!(persisted(&storage), cart.items());
    }

    #[tokio::test]
    async fn test_guest_set_quantity_below_one_is_noop() {
        let (cart, _storage) = guest_store();
        let p = product("a", 1000);
        cart.add_item(&p, 2).await.unwrap();

        cart.set_quantity(&p.id, 0).await;

        let items = cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_guest_clear_removes_storage_key() {
        let (cart, storage) = guest_store();
        cart.add_item(&product("a", 1000), 1).await.unwrap();

        cart.clear().await;

        assert!(cart.items().is_empty());
        assert!(storage.get(keys::GUEST_CART).is_none());
    }

    #[tokio::test]
    async fn test_guest_load_corrupt_storage_is_empty() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::GUEST_CART, "not json");
        let cart = CartStore::new(
            Arc::new(PanicApi),
            Arc::clone(&storage) as Arc<dyn KeyValueStore>,
        );

        cart.load().await;
        assert!(cart.items().is_empty());
    }

    #[tokio::test]
    async fn test_guest_line_ids_are_synthesized() {
        let (cart, _storage) = guest_store();
        let p = product("sku-7", 999);
        cart.add_item(&p, 1).await.unwrap();

        assert_eq!(
            cart.items().first().unwrap().id,
            LineItemId::new("guest-sku-7")
        );
    }

    #[tokio::test]
    async fn test_total_treats_missing_price_as_zero() {
        let (cart, _storage) = guest_store();
        let mut p = product("a", 1000);
        p.price = None;
        cart.add_item(&p, 3).await.unwrap();

        assert_eq!(cart.total(), Decimal::ZERO);
        assert_eq!(cart.count(), 3);
    }
}
