//! Card-payment gateway client interface.
//!
//! The gateway issues order-scoped payment sessions (created through the
//! commerce API) and confirms card payments against a session's secret. The
//! storefront consumes it behind the [`PaymentGateway`] trait so checkout
//! tests run against a scripted fake.

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use tamarind_core::{CurrencyCode, DeliveryTier, Money};

use crate::api::PaymentSession;
use crate::config::GatewayConfig;

/// The gateway's charge floor in minor units (0.35 in the major unit).
/// Orders below this are rejected before any remote call is made.
const MINIMUM_CHARGE_MINOR_UNITS: i64 = 35;

/// Errors returned by the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway refused the confirmation. The message is inspected for
    /// session-expiry markers by the checkout orchestrator.
    #[error("payment declined: {0}")]
    Declined(String),

    /// Any other gateway response.
    #[error("gateway error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// A confirmed payment.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    /// Gateway payment reference, reported in the audit notification.
    pub reference: String,
}

/// Consumed surface of the payment gateway's client SDK.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// The minimum amount the gateway will charge.
    fn minimum_charge(&self) -> Money;

    /// Confirm a card payment against the session's secret.
    async fn confirm_card_payment(
        &self,
        session: &PaymentSession,
    ) -> Result<PaymentConfirmation, GatewayError>;
}

// =============================================================================
// Wallet-style payment request
// =============================================================================

/// Configuration for a platform payment-request object (wallet one-tap
/// payment). Built from the order draft; the host UI renders it and feeds
/// events back.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequestOptions {
    pub amount: Decimal,
    /// Lowercase ISO 4217 code.
    pub currency: String,
    pub shipping_options: Vec<ShippingOption>,
}

/// One selectable shipping option inside a payment request.
#[derive(Debug, Clone, Serialize)]
pub struct ShippingOption {
    pub id: String,
    pub label: String,
    pub fee: Decimal,
}

impl From<DeliveryTier> for ShippingOption {
    fn from(tier: DeliveryTier) -> Self {
        let id = match tier {
            DeliveryTier::Standard => "standard",
            DeliveryTier::Express => "express",
        };
        Self {
            id: id.to_string(),
            label: tier.label().to_string(),
            fee: tier.fee(),
        }
    }
}

/// Events a rendered payment request emits back to the storefront.
#[derive(Debug, Clone)]
pub enum PaymentRequestEvent {
    PaymentMethodSelected { method_id: String },
    ShippingOptionChanged { option_id: String },
}

// =============================================================================
// CardGateway
// =============================================================================

/// Reqwest-backed gateway client.
#[derive(Clone)]
pub struct CardGateway {
    http: reqwest::Client,
    base_url: Url,
    publishable_key: String,
    currency: CurrencyCode,
}

/// Wire shape of a confirmation response.
#[derive(Debug, Deserialize)]
struct ConfirmResponse {
    status: String,
    reference: Option<String>,
    error: Option<String>,
}

impl CardGateway {
    /// Create a gateway client from configuration.
    #[must_use]
    pub fn new(config: &GatewayConfig, currency: CurrencyCode) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            publishable_key: config.publishable_key.clone(),
            currency,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl PaymentGateway for CardGateway {
    fn minimum_charge(&self) -> Money {
        Money::new(Decimal::new(MINIMUM_CHARGE_MINOR_UNITS, 2), self.currency)
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn confirm_card_payment(
        &self,
        session: &PaymentSession,
    ) -> Result<PaymentConfirmation, GatewayError> {
        let response = self
            .http
            .post(self.endpoint(&format!("/v1/sessions/{}/confirm", session.id)))
            .bearer_auth(&self.publishable_key)
            .json(&serde_json::json!({
                "client_secret": session.client_secret.expose_secret(),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(500)
                .collect::<String>();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let confirm: ConfirmResponse = response.json().await?;
        if confirm.status == "succeeded" {
            Ok(PaymentConfirmation {
                reference: confirm.reference.unwrap_or_default(),
            })
        } else {
            Err(GatewayError::Declined(
                confirm
                    .error
                    .unwrap_or_else(|| format!("payment {}", confirm.status)),
            ))
        }
    }
}
