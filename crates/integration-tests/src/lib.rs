//! Integration tests for Tamarind.
//!
//! The storefront is exercised end to end against scripted fakes: a
//! [`FakeApi`] standing in for the commerce REST API, a [`FakeGateway`] for
//! the payment gateway, and a [`RecordingNotifier`] capturing audit notices.
//! Every fake keeps a call log so tests can assert not just outcomes but
//! which remote operations ran and how often.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;

use tamarind_core::{
    CurrencyCode, CustomerId, Identity, LineItemId, Money, OrderId, OrderStatus, Product,
    ProductId,
};
use tamarind_storefront::api::{
    ApiError, CommerceApi, OrderDetail, OrderPayload, PaymentSession, ProfileUpdate,
    RemoteCartEntry, RemoteWishlistEntry, UserProfile,
};
use tamarind_storefront::checkout::ShippingForm;
use tamarind_storefront::gateway::{GatewayError, PaymentConfirmation, PaymentGateway};
use tamarind_storefront::notify::{Notifier, TransactionNotice};
use tamarind_storefront::session::SessionSnapshot;

// =============================================================================
// FakeApi
// =============================================================================

/// In-memory commerce API with scripted failures and a call log.
#[derive(Default)]
pub struct FakeApi {
    inner: Mutex<FakeApiInner>,
    calls: Mutex<Vec<String>>,
}

#[derive(Default)]
struct FakeApiInner {
    products: Vec<Product>,
    cart: Vec<RemoteCartEntry>,
    wishlist: Vec<RemoteWishlistEntry>,
    failures: HashMap<String, VecDeque<ApiError>>,
    captured_orders: Vec<OrderPayload>,
    order_seq: u32,
    session_seq: u32,
}

impl FakeApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the remote catalog.
    pub fn set_products(&self, products: Vec<Product>) {
        self.inner().products = products;
    }

    /// Seed the remote cart.
    pub fn set_cart(&self, entries: Vec<RemoteCartEntry>) {
        self.inner().cart = entries;
    }

    /// Seed the remote wishlist.
    pub fn set_wishlist(&self, entries: Vec<RemoteWishlistEntry>) {
        self.inner().wishlist = entries;
    }

    /// Script the next call to `op` to fail with `error`.
    pub fn fail_next(&self, op: &str, error: ApiError) {
        self.inner()
            .failures
            .entry(op.to_string())
            .or_default()
            .push_back(error);
    }

    /// Every operation invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// How many times `op` was invoked.
    #[must_use]
    pub fn call_count(&self, op: &str) -> usize {
        self.calls().iter().filter(|name| *name == op).count()
    }

    /// The most recent order-creation payload the fake accepted.
    #[must_use]
    pub fn last_order(&self) -> Option<OrderPayload> {
        self.inner().captured_orders.last().cloned()
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, FakeApiInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn log(&self, op: &str) {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(op.to_string());
    }

    fn take_failure(&self, op: &str) -> Option<ApiError> {
        self.inner()
            .failures
            .get_mut(op)
            .and_then(VecDeque::pop_front)
    }

    fn check(&self, op: &str) -> Result<(), ApiError> {
        self.log(op);
        match self.take_failure(op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CommerceApi for FakeApi {
    fn set_credential(&self, token: Option<SecretString>) {
        self.log(if token.is_some() {
            "set_credential(some)"
        } else {
            "set_credential(none)"
        });
    }

    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        self.check("list_products")?;
        Ok(self.inner().products.clone())
    }

    async fn cart_entries(&self) -> Result<Vec<RemoteCartEntry>, ApiError> {
        self.check("cart_entries")?;
        Ok(self.inner().cart.clone())
    }

    async fn add_cart_entry(&self, product_id: &ProductId, quantity: u32) -> Result<(), ApiError> {
        self.check("add_cart_entry")?;
        let mut inner = self.inner();
        if let Some(entry) = inner
            .cart
            .iter_mut()
            .find(|entry| &entry.product_id == product_id)
        {
            entry.quantity += quantity;
        } else {
            inner.cart.push(RemoteCartEntry {
                id: LineItemId::new(format!("li-{product_id}")),
                product_id: product_id.clone(),
                quantity,
            });
        }
        Ok(())
    }

    async fn update_cart_entry(&self, id: &LineItemId, quantity: u32) -> Result<(), ApiError> {
        self.check("update_cart_entry")?;
        if let Some(entry) = self.inner().cart.iter_mut().find(|entry| &entry.id == id) {
            entry.quantity = quantity;
        }
        Ok(())
    }

    async fn delete_cart_entry(&self, id: &LineItemId) -> Result<(), ApiError> {
        self.check("delete_cart_entry")?;
        self.inner().cart.retain(|entry| &entry.id != id);
        Ok(())
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        self.check("clear_cart")?;
        self.inner().cart.clear();
        Ok(())
    }

    async fn wishlist_entries(&self) -> Result<Vec<RemoteWishlistEntry>, ApiError> {
        self.check("wishlist_entries")?;
        Ok(self.inner().wishlist.clone())
    }

    async fn add_wishlist_entry(&self, product_id: &ProductId) -> Result<(), ApiError> {
        self.check("add_wishlist_entry")?;
        let mut inner = self.inner();
        if !inner
            .wishlist
            .iter()
            .any(|entry| &entry.product_id == product_id)
        {
            inner.wishlist.push(RemoteWishlistEntry {
                id: LineItemId::new(format!("wl-{product_id}")),
                product_id: product_id.clone(),
            });
        }
        Ok(())
    }

    async fn remove_wishlist_entry(&self, id: &LineItemId) -> Result<(), ApiError> {
        self.check("remove_wishlist_entry")?;
        self.inner().wishlist.retain(|entry| &entry.id != id);
        Ok(())
    }

    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderId, ApiError> {
        self.check("create_order")?;
        let mut inner = self.inner();
        inner.captured_orders.push(payload.clone());
        inner.order_seq += 1;
        Ok(OrderId::new(format!("ord-{}", inner.order_seq)))
    }

    async fn init_payment(&self, order_id: &OrderId) -> Result<PaymentSession, ApiError> {
        self.check("init_payment")?;
        let mut inner = self.inner();
        inner.session_seq += 1;
        Ok(PaymentSession {
            id: format!("ps-{}", inner.session_seq),
            order_id: order_id.clone(),
            client_secret: SecretString::from(format!("secret-{}", inner.session_seq)),
        })
    }

    async fn order_detail(&self, order_id: &OrderId) -> Result<OrderDetail, ApiError> {
        self.check("order_detail")?;
        Ok(OrderDetail {
            id: order_id.clone(),
            status: OrderStatus::Pending,
            total: Decimal::ZERO,
            created_at: Utc::now(),
        })
    }

    async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.check("profile")?;
        Ok(UserProfile {
            id: CustomerId::new("c-1"),
            name: "Test Customer".to_string(),
            email: "customer@example.com".to_string(),
            phone: None,
            role: "user".to_string(),
        })
    }

    async fn update_profile(&self, _update: &ProfileUpdate) -> Result<(), ApiError> {
        self.check("update_profile")
    }

    async fn update_order_status(
        &self,
        _order_id: &OrderId,
        _status: OrderStatus,
    ) -> Result<(), ApiError> {
        self.check("update_order_status")
    }
}

// =============================================================================
// FakeGateway
// =============================================================================

/// Gateway with scripted confirmation outcomes. Unscripted confirmations
/// succeed with the reference `pay_ok`.
#[derive(Default)]
pub struct FakeGateway {
    outcomes: Mutex<VecDeque<Result<PaymentConfirmation, GatewayError>>>,
    confirm_calls: AtomicUsize,
}

impl FakeGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome of the next confirmation.
    pub fn script(&self, outcome: Result<PaymentConfirmation, GatewayError>) {
        self.outcomes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(outcome);
    }

    #[must_use]
    pub fn confirm_calls(&self) -> usize {
        self.confirm_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn minimum_charge(&self) -> Money {
        Money::new(Decimal::new(35, 2), CurrencyCode::USD)
    }

    async fn confirm_card_payment(
        &self,
        _session: &PaymentSession,
    ) -> Result<PaymentConfirmation, GatewayError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Ok(PaymentConfirmation {
                    reference: "pay_ok".to_string(),
                })
            })
    }
}

// =============================================================================
// RecordingNotifier
// =============================================================================

/// Captures dispatched notices instead of delivering them.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<TransactionNotice>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<TransactionNotice> {
        self.notices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn dispatch(&self, notice: TransactionNotice) {
        self.notices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(notice);
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A catalog product priced in whole cents.
#[must_use]
pub fn product(id: &str, unit_cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        price: Some(Money::new(Decimal::new(unit_cents, 2), CurrencyCode::USD)),
        stock: 25,
        category: "mugs".to_string(),
    }
}

/// An authenticated customer session.
#[must_use]
pub fn customer_snapshot(customer_id: &str) -> SessionSnapshot {
    SessionSnapshot {
        identity: Identity::Customer(CustomerId::new(customer_id)),
        token: Some(SecretString::from(format!("token-{customer_id}"))),
    }
}

/// An administrator session.
#[must_use]
pub fn administrator_snapshot(customer_id: &str) -> SessionSnapshot {
    SessionSnapshot {
        identity: Identity::Administrator(CustomerId::new(customer_id)),
        token: Some(SecretString::from(format!("token-{customer_id}"))),
    }
}

/// A shipping form that passes validation.
#[must_use]
pub fn valid_shipping() -> ShippingForm {
    ShippingForm {
        name: "Ada Lovelace".to_string(),
        phone: "+44 20 7946 0000".to_string(),
        street: "1 St James's Square".to_string(),
        city: "London".to_string(),
        postal_code: "SW1Y 4JU".to_string(),
        country: "GB".to_string(),
        delivery: tamarind_core::DeliveryTier::Standard,
    }
}
