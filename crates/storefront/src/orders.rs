//! Administrative order-status updates with a local fallback.
//!
//! The remote client already retries the alternate endpoint shape when a
//! status route answers 404 or 405. When the update still fails, the chosen
//! status is recorded in device storage so the admin UI can keep displaying
//! it; overrides are display fallbacks only and never sync back.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use tamarind_core::{OrderId, OrderStatus};

use crate::api::CommerceApi;
use crate::storage::{KeyValueStore, keys};

/// A status the remote never acknowledged, kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOverride {
    pub status: OrderStatus,
    pub recorded_at: DateTime<Utc>,
}

/// How a status update settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// The remote accepted the update.
    Updated,
    /// The remote refused; the status is recorded locally.
    CachedLocally,
}

/// Order-status admin surface.
#[derive(Clone)]
pub struct OrderStatusAdmin {
    api: Arc<dyn CommerceApi>,
    storage: Arc<dyn KeyValueStore>,
}

impl OrderStatusAdmin {
    #[must_use]
    pub fn new(api: Arc<dyn CommerceApi>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self { api, storage }
    }

    /// Push a status update, falling back to a local override when the
    /// remote refuses.
    #[instrument(skip(self))]
    pub async fn set_status(&self, order_id: &OrderId, status: OrderStatus) -> StatusOutcome {
        match self.api.update_order_status(order_id, status).await {
            Ok(()) => {
                self.clear_override(order_id);
                StatusOutcome::Updated
            }
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Status update failed, caching locally");
                self.record_override(order_id, status);
                StatusOutcome::CachedLocally
            }
        }
    }

    /// The locally recorded status for an order, if any.
    #[must_use]
    pub fn override_for(&self, order_id: &OrderId) -> Option<StatusOverride> {
        self.read_overrides().remove(order_id.as_str())
    }

    fn record_override(&self, order_id: &OrderId, status: OrderStatus) {
        let mut overrides = self.read_overrides();
        overrides.insert(
            order_id.as_str().to_string(),
            StatusOverride {
                status,
                recorded_at: Utc::now(),
            },
        );
        self.write_overrides(&overrides);
    }

    fn clear_override(&self, order_id: &OrderId) {
        let mut overrides = self.read_overrides();
        if overrides.remove(order_id.as_str()).is_some() {
            self.write_overrides(&overrides);
        }
    }

    fn read_overrides(&self) -> HashMap<String, StatusOverride> {
        self.storage
            .get(keys::ORDER_STATUS_OVERRIDES)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn write_overrides(&self, overrides: &HashMap<String, StatusOverride>) {
        match serde_json::to_string(overrides) {
            Ok(raw) => self.storage.set(keys::ORDER_STATUS_OVERRIDES, &raw),
            Err(e) => warn!(error = %e, "Failed to serialize status overrides"),
        }
    }
}
