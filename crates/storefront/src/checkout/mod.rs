//! Checkout orchestrator.
//!
//! A single state machine drives the purchase flow:
//!
//! ```text
//! Idle -> ShippingForm -> CreatingOrder -> SyncingPayment
//!      -> PaymentForm -> ProcessingPayment -> Success
//! ```
//!
//! One checkout instance exists per context. Entering the flow while a
//! purchase is already in progress is rejected; `abandon` resets from any
//! step without cancelling the remote order record.

mod draft;

pub use draft::{FieldError, OrderDraft, ShippingForm};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use tamarind_core::{CurrencyCode, DeliveryTier, Money, OrderId};

use crate::api::{ApiError, CommerceApi, PaymentSession};
use crate::cart::CartStore;
use crate::gateway::{GatewayError, PaymentGateway, PaymentRequestOptions, ShippingOption};
use crate::notify::{NoticeLine, Notifier, TransactionNotice, TransactionOutcome};

/// Gateway payment sessions expire after roughly fifteen minutes; the
/// proactive refresh fires at nine so the secret never goes stale while the
/// customer fills in card details.
const REFRESH_AFTER: Duration = Duration::from_secs(9 * 60);

/// Where the purchase flow currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckoutStep {
    #[default]
    Idle,
    ShippingForm,
    CreatingOrder,
    SyncingPayment,
    PaymentForm,
    ProcessingPayment,
    Success,
}

/// Caller-side misuse of the checkout flow. Remote and gateway failures are
/// not errors to the caller: they move the state machine and surface
/// through [`Checkout::step`] and [`Checkout::error`].
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart total is under the gateway's charge floor.
    #[error("order total is below the minimum of {minimum}")]
    BelowMinimum { minimum: Money },

    /// A purchase is already in progress.
    #[error("checkout is already in progress")]
    AlreadyActive,

    /// The action is not valid from the current step.
    #[error("action not available from step {0:?}")]
    WrongStep(CheckoutStep),

    /// The shipping form failed validation.
    #[error("shipping details are incomplete")]
    InvalidShipping(Vec<FieldError>),
}

/// The checkout orchestrator. Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Checkout {
    inner: Arc<CheckoutInner>,
}

struct CheckoutInner {
    api: Arc<dyn CommerceApi>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    cart: CartStore,
    currency: CurrencyCode,
    state: Mutex<CheckoutState>,
}

#[derive(Default)]
struct CheckoutState {
    step: CheckoutStep,
    error: Option<String>,
    shipping: ShippingForm,
    draft: Option<OrderDraft>,
    order_id: Option<OrderId>,
    payment: Option<PaymentSession>,
    /// Bumped on every session install; a refresh timer only acts if the
    /// generation it was armed with is still current.
    generation: u64,
    refresh_task: Option<JoinHandle<()>>,
}

impl Checkout {
    /// Create an idle checkout over the given collaborators.
    #[must_use]
    pub fn new(
        api: Arc<dyn CommerceApi>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        cart: CartStore,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            inner: Arc::new(CheckoutInner {
                api,
                gateway,
                notifier,
                cart,
                currency,
                state: Mutex::new(CheckoutState::default()),
            }),
        }
    }

    // ===== Flow transitions =====

    /// Enter the flow from `Idle` (or after a completed purchase).
    ///
    /// Guarded by the gateway's charge floor: a cart under the minimum
    /// stays `Idle` with a message naming the threshold, and no remote call
    /// is made.
    #[instrument(skip(self))]
    pub fn begin(&self) -> Result<(), CheckoutError> {
        let minimum = self.inner.gateway.minimum_charge();
        let total = self.inner.cart.total();

        self.with_state(|state| {
            if !matches!(state.step, CheckoutStep::Idle | CheckoutStep::Success) {
                return Err(CheckoutError::AlreadyActive);
            }
            if total < minimum.amount {
                state.error = Some(format!("Minimum order value is {minimum}"));
                return Err(CheckoutError::BelowMinimum { minimum });
            }
            state.step = CheckoutStep::ShippingForm;
            state.error = None;
            // References from a completed purchase must not read as current
            state.draft = None;
            state.order_id = None;
            state.payment = None;
            Ok(())
        })
    }

    /// Submit shipping details and drive the flow to `PaymentForm`.
    ///
    /// The entered form is preserved even when validation or a remote call
    /// fails. The cart is snapshotted into an immutable draft at
    /// submission; later cart edits do not alter the in-flight order.
    #[instrument(skip(self, form))]
    pub async fn submit_shipping(&self, form: ShippingForm) -> Result<(), CheckoutError> {
        let draft = self.with_state(|state| {
            if state.step != CheckoutStep::ShippingForm {
                return Err(CheckoutError::WrongStep(state.step));
            }
            state.shipping = form.clone();

            let errors = form.validate();
            if !errors.is_empty() {
                state.error = Some(
                    errors
                        .iter()
                        .map(|e| e.message.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                );
                return Err(CheckoutError::InvalidShipping(errors));
            }

            let draft = OrderDraft::new(form, self.inner.cart.items(), self.inner.currency);
            state.draft = Some(draft.clone());
            state.step = CheckoutStep::CreatingOrder;
            state.error = None;
            Ok(draft)
        })?;

        let order_id = match self.inner.api.create_order(&draft.to_payload()).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Order creation failed");
                self.fail_to_idle(classify_api_error(&e));
                return Ok(());
            }
        };

        self.with_state(|state| {
            state.order_id = Some(order_id.clone());
            state.step = CheckoutStep::SyncingPayment;
        });

        match self.inner.api.init_payment(&order_id).await {
            Ok(session) => self.install_session(session),
            Err(e) => {
                warn!(error = %e, "Payment session creation failed");
                self.fail_to_idle(classify_api_error(&e));
            }
        }
        Ok(())
    }

    /// Confirm the card payment for the current session.
    ///
    /// A failure the gateway attributes to session expiry triggers exactly
    /// one refresh attempt: on success the flow returns to `PaymentForm`
    /// with the fresh session, on failure the session is discarded and the
    /// flow falls back to `ShippingForm`. Any other failure dispatches a
    /// failure notice and stays on `PaymentForm`.
    #[instrument(skip(self))]
    pub async fn confirm_payment(&self) -> Result<(), CheckoutError> {
        let staged = self.with_state(|state| {
            if state.step != CheckoutStep::PaymentForm {
                return Err(CheckoutError::WrongStep(state.step));
            }
            state.step = CheckoutStep::ProcessingPayment;
            state.error = None;
            Ok((
                state.payment.clone(),
                state.draft.clone(),
                state.order_id.clone(),
            ))
        })?;

        let (Some(session), Some(draft), Some(order_id)) = staged else {
            warn!("Payment state incomplete, resetting");
            self.abandon();
            return Ok(());
        };

        match self.inner.gateway.confirm_card_payment(&session).await {
            Ok(confirmation) => {
                info!(order_id = %order_id, "Payment confirmed");
                self.cancel_timer();
                self.inner.cart.clear().await;
                self.inner.notifier.dispatch(notice(
                    TransactionOutcome::Completed,
                    &order_id,
                    Some(confirmation.reference),
                    &draft,
                ));
                self.with_state(|state| {
                    state.step = CheckoutStep::Success;
                    state.payment = None;
                    state.error = None;
                });
            }
            Err(e) if is_session_expired(&e.to_string(), &session.id) => {
                info!(order_id = %order_id, "Payment session expired, refreshing once");
                match self.inner.api.init_payment(&order_id).await {
                    Ok(fresh) => self.install_session(fresh),
                    Err(refresh_err) => {
                        warn!(error = %refresh_err, "Session refresh failed");
                        self.cancel_timer();
                        self.with_state(|state| {
                            state.payment = None;
                            state.step = CheckoutStep::ShippingForm;
                            state.error = Some(classify_api_error(&refresh_err));
                        });
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Payment confirmation failed");
                self.inner.notifier.dispatch(notice(
                    TransactionOutcome::Failed,
                    &order_id,
                    None,
                    &draft,
                ));
                self.with_state(|state| {
                    state.step = CheckoutStep::PaymentForm;
                    state.error = Some(classify_gateway_error(&e));
                });
            }
        }
        Ok(())
    }

    /// Walk away from the flow. Resets to `Idle` and discards local order
    /// and payment references; the remote order record is not cancelled.
    #[instrument(skip(self))]
    pub fn abandon(&self) {
        self.cancel_timer();
        self.with_state(|state| {
            state.step = CheckoutStep::Idle;
            state.error = None;
            state.draft = None;
            state.order_id = None;
            state.payment = None;
        });
    }

    // ===== UI surface =====

    #[must_use]
    pub fn step(&self) -> CheckoutStep {
        self.with_state(|state| state.step)
    }

    /// Message describing the most recent failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.with_state(|state| state.error.clone())
    }

    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        self.with_state(|state| state.order_id.clone())
    }

    /// Client secret for the active payment session.
    #[must_use]
    pub fn payment_secret(&self) -> Option<SecretString> {
        self.with_state(|state| {
            state
                .payment
                .as_ref()
                .map(|session| session.client_secret.clone())
        })
    }

    /// Amount the customer is charged, once a draft exists.
    #[must_use]
    pub fn amount_due(&self) -> Option<Decimal> {
        self.with_state(|state| state.draft.as_ref().map(OrderDraft::total))
    }

    /// Wallet payment-request configuration for the current draft.
    #[must_use]
    pub fn payment_request_options(&self) -> Option<PaymentRequestOptions> {
        self.with_state(|state| {
            state.draft.as_ref().map(|draft| PaymentRequestOptions {
                amount: draft.total(),
                currency: draft.currency.code().to_string(),
                shipping_options: vec![
                    ShippingOption::from(DeliveryTier::Standard),
                    ShippingOption::from(DeliveryTier::Express),
                ],
            })
        })
    }

    /// Shipping values as last entered, preserved across failures.
    #[must_use]
    pub fn shipping(&self) -> ShippingForm {
        self.with_state(|state| state.shipping.clone())
    }

    // ===== Internals =====

    fn with_state<T>(&self, f: impl FnOnce(&mut CheckoutState) -> T) -> T {
        let mut guard = self
            .inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    fn fail_to_idle(&self, message: String) {
        self.cancel_timer();
        self.with_state(|state| {
            state.step = CheckoutStep::Idle;
            state.error = Some(message);
            state.draft = None;
            state.order_id = None;
            state.payment = None;
        });
    }

    /// Adopt a payment session, move to `PaymentForm`, and arm the refresh
    /// timer. Any previously armed timer is cancelled.
    fn install_session(&self, session: PaymentSession) {
        self.cancel_timer();
        let generation = self.with_state(|state| {
            state.generation += 1;
            state.payment = Some(session);
            state.step = CheckoutStep::PaymentForm;
            state.error = None;
            state.generation
        });
        self.arm_refresh_timer(generation);
    }

    fn arm_refresh_timer(&self, generation: u64) {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(REFRESH_AFTER).await;
            let Some(inner) = weak.upgrade() else { return };
            Self { inner }.refresh_if_current(generation).await;
        });
        self.with_state(|state| {
            if let Some(previous) = state.refresh_task.replace(handle) {
                previous.abort();
            }
        });
    }

    /// Timer body: refresh only if the flow is still waiting on the same
    /// session it was armed for.
    async fn refresh_if_current(&self, generation: u64) {
        let order_id = self.with_state(|state| {
            if state.step == CheckoutStep::PaymentForm && state.generation == generation {
                state.order_id.clone()
            } else {
                None
            }
        });
        let Some(order_id) = order_id else { return };

        match self.inner.api.init_payment(&order_id).await {
            Ok(session) => {
                info!(order_id = %order_id, "Payment session refreshed proactively");
                self.install_session(session);
            }
            Err(e) => warn!(error = %e, "Proactive session refresh failed"),
        }
    }

    fn cancel_timer(&self) {
        if let Some(task) = self.with_state(|state| state.refresh_task.take()) {
            task.abort();
        }
    }
}

/// Map a remote failure to the message shown to the customer.
fn classify_api_error(error: &ApiError) -> String {
    match error {
        ApiError::Unauthorized(_) => {
            "Your session has expired. Please log in again.".to_string()
        }
        ApiError::NotFound(_) => {
            "That item is no longer available. Please refresh and try again.".to_string()
        }
        ApiError::BadRequest(message) => message.clone(),
        _ => "Something went wrong. Please try again.".to_string(),
    }
}

fn classify_gateway_error(error: &GatewayError) -> String {
    match error {
        GatewayError::Declined(message) => message.clone(),
        _ => "Payment could not be processed. Please try again.".to_string(),
    }
}

/// Whether a confirmation failure means the payment session went stale.
/// Matches on expiry keywords or the exact session identifier.
fn is_session_expired(message: &str, session_id: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("expired") || lowered.contains("invalid") || message.contains(session_id)
}

fn notice(
    outcome: TransactionOutcome,
    order_id: &OrderId,
    payment_reference: Option<String>,
    draft: &OrderDraft,
) -> TransactionNotice {
    TransactionNotice {
        outcome,
        order_id: order_id.clone(),
        payment_reference,
        amount: draft.total(),
        currency: draft.currency.code().to_string(),
        lines: draft
            .lines
            .iter()
            .map(|line| NoticeLine {
                product_id: line.product_id.clone(),
                name: line.product.name.clone(),
                quantity: line.quantity,
                unit_price: line.product.price.as_ref().map(|price| price.amount),
            })
            .collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry_matches_keywords_case_insensitively() {
        assert!(is_session_expired("Session EXPIRED", "ps_1"));
        assert!(is_session_expired("payment declined: invalid session", "ps_1"));
        assert!(!is_session_expired("card declined", "ps_1"));
    }

    #[test]
    fn test_session_expiry_matches_exact_session_id() {
        assert!(is_session_expired("no such session ps_42", "ps_42"));
        assert!(!is_session_expired("no such session ps_421x", "ps_42x"));
    }

    #[test]
    fn test_api_error_classification() {
        assert!(classify_api_error(&ApiError::Unauthorized("no".to_string())).contains("log in"));
        assert!(classify_api_error(&ApiError::NotFound("gone".to_string())).contains("refresh"));
        assert_eq!(
            classify_api_error(&ApiError::BadRequest("quantity exceeds stock".to_string())),
            "quantity exceeds stock"
        );
        assert!(
            classify_api_error(&ApiError::Remote {
                status: 500,
                message: "boom".to_string(),
            })
            .contains("try again")
        );
    }

    #[test]
    fn test_gateway_error_classification_passes_decline_reason() {
        assert_eq!(
            classify_gateway_error(&GatewayError::Declined("card declined".to_string())),
            "card declined"
        );
    }
}
