//! Commerce REST API client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP. Caches the product catalog using `moka`
//! (5-minute TTL); everything else is fetched fresh on every call.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use tamarind_core::{LineItemId, OrderId, OrderStatus, Product, ProductId};

use super::types::{
    CreatedOrder, OrderDetail, OrderPayload, PaymentSession, PaymentSessionWire, ProfileUpdate,
    RemoteCartEntry, RemoteWishlistEntry, UserProfile,
};
use super::{ApiError, CommerceApi};

const CATALOG_CACHE_KEY: &str = "products";

/// Client for the commerce REST API.
///
/// Cheaply cloneable via `Arc`. The bearer credential is shared across
/// clones, so the session layer updates it in one place.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

struct RestClientInner {
    http: reqwest::Client,
    base_url: Url,
    credential: Mutex<Option<SecretString>>,
    catalog_cache: Cache<String, Arc<Vec<Product>>>,
}

impl RestClient {
    /// Create a new API client for the given base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        let catalog_cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(RestClientInner {
                http: reqwest::Client::new(),
                base_url,
                credential: Mutex::new(None),
                catalog_cache,
            }),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.inner.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Attach the bearer credential when one is set. Absence of a credential
    /// removes the header rather than sending an empty one.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .inner
            .credential
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        match token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Check the response status and map failures to the error taxonomy.
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(500)
            .collect::<String>();

        Err(ApiError::from_status(status.as_u16(), message))
    }

    /// Send a request and decode the JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::check(request.send().await?).await?;

        // Read as text first for better error diagnostics
        let body = response.text().await?;
        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "Failed to parse API response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    /// Send a request, discarding the response body.
    async fn send_unit(&self, request: RequestBuilder) -> Result<(), ApiError> {
        Self::check(request.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl CommerceApi for RestClient {
    fn set_credential(&self, token: Option<SecretString>) {
        if let Ok(mut guard) = self.inner.credential.lock() {
            *guard = token;
        }
    }

    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(products) = self.inner.catalog_cache.get(CATALOG_CACHE_KEY).await {
            debug!("Cache hit for product catalog");
            return Ok((*products).clone());
        }

        let request = self.authorize(self.inner.http.get(self.endpoint("/products")));
        let products: Vec<Product> = self.send_json(request).await?;

        self.inner
            .catalog_cache
            .insert(CATALOG_CACHE_KEY.to_string(), Arc::new(products.clone()))
            .await;

        Ok(products)
    }

    #[instrument(skip(self))]
    async fn cart_entries(&self) -> Result<Vec<RemoteCartEntry>, ApiError> {
        let request = self.authorize(self.inner.http.get(self.endpoint("/cart")));
        self.send_json(request).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_cart_entry(&self, product_id: &ProductId, quantity: u32) -> Result<(), ApiError> {
        let request = self
            .authorize(self.inner.http.post(self.endpoint("/cart")))
            .json(&serde_json::json!({
                "product_id": product_id,
                "quantity": quantity,
            }));
        self.send_unit(request).await
    }

    #[instrument(skip(self), fields(entry_id = %id))]
    async fn update_cart_entry(&self, id: &LineItemId, quantity: u32) -> Result<(), ApiError> {
        let request = self
            .authorize(
                self.inner
                    .http
                    .patch(self.endpoint(&format!("/cart/{id}"))),
            )
            .json(&serde_json::json!({ "quantity": quantity }));
        self.send_unit(request).await
    }

    #[instrument(skip(self), fields(entry_id = %id))]
    async fn delete_cart_entry(&self, id: &LineItemId) -> Result<(), ApiError> {
        let request = self.authorize(
            self.inner
                .http
                .delete(self.endpoint(&format!("/cart/{id}"))),
        );
        self.send_unit(request).await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), ApiError> {
        let request = self.authorize(self.inner.http.delete(self.endpoint("/cart")));
        self.send_unit(request).await
    }

    #[instrument(skip(self))]
    async fn wishlist_entries(&self) -> Result<Vec<RemoteWishlistEntry>, ApiError> {
        let request = self.authorize(self.inner.http.get(self.endpoint("/wishlist")));
        self.send_json(request).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_wishlist_entry(&self, product_id: &ProductId) -> Result<(), ApiError> {
        let request = self
            .authorize(self.inner.http.post(self.endpoint("/wishlist")))
            .json(&serde_json::json!({ "product_id": product_id }));
        self.send_unit(request).await
    }

    #[instrument(skip(self), fields(entry_id = %id))]
    async fn remove_wishlist_entry(&self, id: &LineItemId) -> Result<(), ApiError> {
        let request = self.authorize(
            self.inner
                .http
                .delete(self.endpoint(&format!("/wishlist/{id}"))),
        );
        self.send_unit(request).await
    }

    #[instrument(skip(self, payload))]
    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderId, ApiError> {
        let request = self
            .authorize(self.inner.http.post(self.endpoint("/orders")))
            .json(payload);
        let created: CreatedOrder = self.send_json(request).await?;
        Ok(created.id)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn init_payment(&self, order_id: &OrderId) -> Result<PaymentSession, ApiError> {
        let request = self.authorize(
            self.inner
                .http
                .post(self.endpoint(&format!("/orders/{order_id}/payment"))),
        );
        let wire: PaymentSessionWire = self.send_json(request).await?;
        Ok(wire.into_session(order_id.clone()))
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn order_detail(&self, order_id: &OrderId) -> Result<OrderDetail, ApiError> {
        let request = self.authorize(
            self.inner
                .http
                .get(self.endpoint(&format!("/orders/{order_id}"))),
        );
        self.send_json(request).await
    }

    #[instrument(skip(self))]
    async fn profile(&self) -> Result<UserProfile, ApiError> {
        let request = self.authorize(self.inner.http.get(self.endpoint("/me")));
        self.send_json(request).await
    }

    #[instrument(skip(self, update))]
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError> {
        let request = self
            .authorize(self.inner.http.patch(self.endpoint("/me")))
            .json(update);
        self.send_unit(request).await
    }

    #[instrument(skip(self), fields(order_id = %order_id, status = %status))]
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({ "status": status });

        let request = self
            .authorize(
                self.inner
                    .http
                    .patch(self.endpoint(&format!("/orders/{order_id}/status"))),
            )
            .json(&body);

        match self.send_unit(request).await {
            Err(e) if e.is_endpoint_shape_mismatch() => {
                // Older API deployments only accept a whole-order update
                warn!(error = %e, "Status endpoint rejected, retrying alternate shape");
                let fallback = self
                    .authorize(
                        self.inner
                            .http
                            .put(self.endpoint(&format!("/orders/{order_id}"))),
                    )
                    .json(&body);
                self.send_unit(fallback).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let client = RestClient::new(Url::parse("https://api.example.com/v1/").unwrap());
        assert_eq!(
            client.endpoint("/products"),
            "https://api.example.com/v1/products"
        );
        assert_eq!(
            client.endpoint("cart"),
            "https://api.example.com/v1/cart"
        );
    }
}
