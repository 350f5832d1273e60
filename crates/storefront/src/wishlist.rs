//! Wishlist store: saved items without quantities.
//!
//! Same shape as the cart store, minus quantities and minus administrative
//! suppression. A failed remote toggle is followed by a forced reload so the
//! list resynchronizes with server truth instead of trusting the optimistic
//! local change.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{instrument, warn};

use tamarind_core::{Identity, LineItemId, Product, ProductId, WishlistEntry};

use crate::api::{ApiError, CommerceApi};
use crate::session::{SessionObserver, SessionSnapshot};
use crate::storage::{KeyValueStore, keys};

/// Reactive wishlist store. Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistStoreInner>,
}

struct WishlistStoreInner {
    api: Arc<dyn CommerceApi>,
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<WishlistState>,
    loading: AtomicBool,
}

#[derive(Default)]
struct WishlistState {
    identity: Identity,
    entries: Vec<WishlistEntry>,
}

impl WishlistStore {
    /// Create an empty wishlist store in guest mode.
    #[must_use]
    pub fn new(api: Arc<dyn CommerceApi>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(WishlistStoreInner {
                api,
                storage,
                state: Mutex::new(WishlistState::default()),
                loading: AtomicBool::new(false),
            }),
        }
    }

    /// Current entries, in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<WishlistEntry> {
        self.with_state(|state| state.entries.clone())
    }

    /// Whether the wishlist holds the given product.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.with_state(|state| {
            state
                .entries
                .iter()
                .any(|entry| &entry.product_id == product_id)
        })
    }

    /// Whether a load is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    /// Rebuild the entry list for the current session mode.
    #[instrument(skip(self))]
    pub async fn load(&self) {
        self.inner.loading.store(true, Ordering::SeqCst);

        let identity = self.with_state(|state| state.identity.clone());
        let entries = if identity.is_authenticated() {
            match self.load_remote().await {
                Ok(entries) => entries,
                Err(e) if e.is_unauthorized() => {
                    warn!("Wishlist load unauthorized, falling back to guest wishlist");
                    self.read_guest()
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load wishlist, keeping current entries");
                    self.with_state(|state| state.entries.clone())
                }
            }
        } else {
            self.read_guest()
        };

        self.with_state(|state| state.entries = entries);
        self.inner.loading.store(false, Ordering::SeqCst);
    }

    /// Add the product if absent, remove it if present.
    ///
    /// The store resolves existing-vs-new by product identifier. Remote
    /// failures trigger a forced reload instead of an error.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn toggle(&self, product: &Product) {
        let identity = self.with_state(|state| state.identity.clone());
        let existing = self.with_state(|state| {
            state
                .entries
                .iter()
                .find(|entry| entry.product_id == product.id)
                .map(|entry| entry.id.clone())
        });

        if identity.is_authenticated() {
            let result = match &existing {
                Some(id) => self.inner.api.remove_wishlist_entry(id).await,
                None => self.inner.api.add_wishlist_entry(&product.id).await,
            };

            match result {
                Ok(()) => {
                    self.load().await;
                    return;
                }
                Err(e) if e.is_unauthorized() => {
                    warn!("Wishlist toggle unauthorized, applying guest semantics");
                }
                Err(e) => {
                    // Resynchronize with server truth rather than trusting
                    // the optimistic local state
                    warn!(error = %e, "Wishlist toggle failed, forcing reload");
                    self.load().await;
                    return;
                }
            }
        }

        self.with_state(|state| {
            if existing.is_some() {
                state.entries.retain(|entry| entry.product_id != product.id);
            } else {
                state.entries.push(WishlistEntry {
                    id: LineItemId::for_guest(&product.id),
                    product_id: product.id.clone(),
                    product: product.clone(),
                });
            }
        });
        self.persist_guest();
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut WishlistState) -> T) -> T {
        let mut guard = self
            .inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    async fn load_remote(&self) -> Result<Vec<WishlistEntry>, ApiError> {
        let entries = self.inner.api.wishlist_entries().await?;
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
                WishlistEntry {
                    id: entry.id,
                    product_id: entry.product_id,
                    product,
                }
            })
            .collect())
    }

    fn read_guest(&self) -> Vec<WishlistEntry> {
        self.inner
            .storage
            .get(keys::GUEST_WISHLIST)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn persist_guest(&self) {
        let entries = self.with_state(|state| state.entries.clone());
        match serde_json::to_string(&entries) {
            Ok(raw) => self.inner.storage.set(keys::GUEST_WISHLIST, &raw),
            Err(e) => warn!(error = %e, "Failed to serialize guest wishlist"),
        }
    }
}

#[async_trait]
impl SessionObserver for WishlistStore {
    /// Mode transition: adopt the new identity and re-run `load()` once.
    async fn session_changed(&self, session: &SessionSnapshot) {
        self.with_state(|state| {
            state.identity = session.identity.clone();
            state.entries.clear();
        });
        self.load().await;
    }
}
