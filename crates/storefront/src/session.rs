//! Session state and its observer contract.
//!
//! Tracks whether the current visitor is a guest or an authenticated
//! identity, derived from the credential persisted in device storage.
//! Dependent stores subscribe explicitly through [`SessionObserver`] instead
//! of listening to an ambient broadcast; on every session change each
//! observer is notified exactly once, in subscription order.
//!
//! Token validation rules are out of scope: the stored credential record is
//! trusted at restore time and a corrupt record degrades to guest.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use tamarind_core::{CustomerId, Identity};

use crate::storage::{KeyValueStore, keys};

/// The current session, as handed to observers and API callers.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub identity: Identity,
    /// Bearer credential; `None` for guests.
    pub token: Option<SecretString>,
}

impl SessionSnapshot {
    /// A guest session with no credential.
    #[must_use]
    pub const fn guest() -> Self {
        Self {
            identity: Identity::Guest,
            token: None,
        }
    }
}

/// Persisted credential record (JSON under [`keys::CREDENTIAL`]).
#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    token: String,
    role: String,
    customer_id: String,
}

/// A consumer that must react when the session changes mode.
///
/// Stores implement this to re-run their load for the new mode; the
/// previous mode's in-memory list is discarded, never merged.
#[async_trait]
pub trait SessionObserver: Send + Sync {
    async fn session_changed(&self, session: &SessionSnapshot);
}

/// Owns the session snapshot and the observer list.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<SessionStateInner>,
}

struct SessionStateInner {
    storage: Arc<dyn KeyValueStore>,
    current: Mutex<SessionSnapshot>,
    observers: Mutex<Vec<Arc<dyn SessionObserver>>>,
}

impl SessionState {
    /// Create a guest session backed by the given storage.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(SessionStateInner {
                storage,
                current: Mutex::new(SessionSnapshot::guest()),
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register an observer. Observers are notified in subscription order,
    /// so wire credential consumers before the stores that reload.
    pub fn subscribe(&self, observer: Arc<dyn SessionObserver>) {
        if let Ok(mut observers) = self.inner.observers.lock() {
            observers.push(observer);
        }
    }

    /// The current session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner
            .current
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Restore the session from the stored credential on app start.
    ///
    /// A missing or corrupt record yields a guest session. Observers are
    /// notified either way so stores hydrate for the restored mode.
    #[instrument(skip(self))]
    pub async fn restore(&self) {
        let snapshot = self
            .inner
            .storage
            .get(keys::CREDENTIAL)
            .and_then(|raw| serde_json::from_str::<StoredCredential>(&raw).ok())
            .map_or_else(SessionSnapshot::guest, |stored| SessionSnapshot {
                identity: Identity::from_role(&stored.role, CustomerId::new(stored.customer_id)),
                token: Some(SecretString::from(stored.token)),
            });

        info!(authenticated = snapshot.identity.is_authenticated(), "Session restored");
        self.replace(snapshot).await;
    }

    /// Record a successful login and notify observers.
    #[instrument(skip(self, token))]
    pub async fn login(&self, token: SecretString, role: &str, customer_id: CustomerId) {
        let stored = StoredCredential {
            token: token.expose_secret().to_string(),
            role: role.to_string(),
            customer_id: customer_id.to_string(),
        };
        match serde_json::to_string(&stored) {
            Ok(raw) => self.inner.storage.set(keys::CREDENTIAL, &raw),
            Err(e) => warn!(error = %e, "Failed to persist credential"),
        }

        let snapshot = SessionSnapshot {
            identity: Identity::from_role(role, customer_id),
            token: Some(token),
        };
        self.replace(snapshot).await;
    }

    /// Destroy the session on explicit logout.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.inner.storage.remove(keys::CREDENTIAL);
        self.replace(SessionSnapshot::guest()).await;
    }

    /// Destroy the session after credential expiry or an unrecoverable
    /// authentication failure from the remote.
    #[instrument(skip(self))]
    pub async fn invalidate(&self) {
        warn!("Session invalidated by remote");
        self.inner.storage.remove(keys::CREDENTIAL);
        self.replace(SessionSnapshot::guest()).await;
    }

    async fn replace(&self, snapshot: SessionSnapshot) {
        if let Ok(mut current) = self.inner.current.lock() {
            *current = snapshot.clone();
        }

        // Snapshot the observer list so the lock is not held across awaits
        let observers = self
            .inner
            .observers
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        for observer in observers {
            observer.session_changed(&snapshot).await;
        }
    }
}
