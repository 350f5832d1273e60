//! Fire-and-forget transaction audit notifications.
//!
//! Checkout dispatches one notice per settled payment attempt. Delivery is
//! spawned off the calling task and its outcome never feeds back into the
//! purchase flow; a failed delivery is logged and dropped.

use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use tamarind_core::{OrderId, ProductId};

use crate::config::AuditConfig;

/// How the payment attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionOutcome {
    Completed,
    Failed,
}

/// Audit record for one settled payment attempt.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionNotice {
    pub outcome: TransactionOutcome,
    pub order_id: OrderId,
    /// Gateway reference; present only for completed payments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    pub amount: Decimal,
    /// Lowercase ISO 4217 code.
    pub currency: String,
    pub lines: Vec<NoticeLine>,
}

/// One purchased line inside a notice.
#[derive(Debug, Clone, Serialize)]
pub struct NoticeLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
}

/// Audit sink. `dispatch` returns immediately; delivery happens in the
/// background.
pub trait Notifier: Send + Sync {
    fn dispatch(&self, notice: TransactionNotice);
}

/// POSTs each notice as JSON to a configured webhook, with an optional
/// bearer token. Built disabled when no endpoint is configured.
#[derive(Clone)]
pub struct WebhookNotifier {
    inner: Arc<WebhookNotifierInner>,
}

struct WebhookNotifierInner {
    http: reqwest::Client,
    target: Option<Target>,
}

struct Target {
    endpoint: Url,
    token: Option<SecretString>,
}

impl WebhookNotifier {
    /// Build from configuration. An absent configuration disables delivery.
    #[must_use]
    pub fn new(config: Option<&AuditConfig>) -> Self {
        Self {
            inner: Arc::new(WebhookNotifierInner {
                http: reqwest::Client::new(),
                target: config.map(|audit| Target {
                    endpoint: audit.webhook_url.clone(),
                    token: audit.token.clone(),
                }),
            }),
        }
    }
}

impl Notifier for WebhookNotifier {
    fn dispatch(&self, notice: TransactionNotice) {
        let Some(target) = &self.inner.target else {
            debug!(order_id = %notice.order_id, "Audit webhook not configured, dropping notice");
            return;
        };

        let http = self.inner.http.clone();
        let endpoint = target.endpoint.clone();
        let token = target.token.clone();

        tokio::spawn(async move {
            let mut request = http.post(endpoint).json(&notice);
            if let Some(token) = token {
                request = request.bearer_auth(token.expose_secret());
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(order_id = %notice.order_id, "Audit notice delivered");
                }
                Ok(response) => {
                    warn!(
                        order_id = %notice.order_id,
                        status = response.status().as_u16(),
                        "Audit notice rejected"
                    );
                }
                Err(e) => {
                    warn!(order_id = %notice.order_id, error = %e, "Audit notice delivery failed");
                }
            }
        });
    }
}
