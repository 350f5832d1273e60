//! Key-value persistence port for device-local state.
//!
//! Guest carts, guest wishlists, the stored credential, and admin-side order
//! status overrides all live behind this trait. Stores depend on the trait,
//! never on a concrete mechanism, so tests swap in `MemoryStore`.
//!
//! Operations are synchronous and infallible from the caller's point of
//! view: the backing store is the sole source of truth for guest mode and a
//! write that cannot land is logged, not surfaced.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Well-known storage keys.
pub mod keys {
    /// Guest cart line items (JSON list).
    pub const GUEST_CART: &str = "tamarind.cart";
    /// Guest wishlist entries (JSON list).
    pub const GUEST_WISHLIST: &str = "tamarind.wishlist";
    /// Stored credential record (JSON).
    pub const CREDENTIAL: &str = "tamarind.credential";
    /// Order-status overrides (JSON map of order id to status + timestamp).
    pub const ORDER_STATUS_OVERRIDES: &str = "tamarind.order_status_overrides";
}

/// Device-local key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str);

    /// Remove a key. Removing an absent key is a no-op.
    fn remove(&self, key: &str);
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory store for tests and ephemeral contexts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .map(|entries| entries.get(key).cloned())
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

// =============================================================================
// JsonFileStore
// =============================================================================

/// File-backed store: one JSON document, rewritten on every mutation.
///
/// The whole map is loaded at construction; a missing or corrupt file starts
/// empty. IO failures on write are logged and swallowed.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating parent directories as needed.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<HashMap<String, String>>(&raw).ok())
            .unwrap_or_default();

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn flush(&self, entries: &HashMap<String, String>) {
        if let Some(parent) = self.path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to create storage directory");
            return;
        }

        match serde_json::to_string_pretty(entries) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.path, raw) {
                    tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist storage file");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize storage entries");
            }
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .map(|entries| entries.get(key).cloned())
            .unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
            self.flush(&entries);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
            self.flush(&entries);
        }
    }
}
