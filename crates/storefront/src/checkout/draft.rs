//! Shipping form validation and the immutable order draft.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tamarind_core::{CartLine, CurrencyCode, DeliveryTier};

use crate::api::{OrderPayload, OrderPayloadLine};

/// Shipping details entered by the customer. Preserved across failed
/// submissions so the customer never retypes the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingForm {
    pub name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub delivery: DeliveryTier,
}

/// A single failed validation on the shipping form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn required(field: &'static str) -> Self {
        Self {
            field,
            message: format!("{field} is required"),
        }
    }
}

impl ShippingForm {
    /// Validate the form. Whitespace-only values count as missing.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("name", &self.name),
            ("phone", &self.phone),
            ("street", &self.street),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ] {
            if value.trim().is_empty() {
                errors.push(FieldError::required(field));
            }
        }
        errors
    }
}

/// Snapshot of the cart and shipping details taken when the form is
/// submitted. Later cart edits do not alter an in-flight draft.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub shipping: ShippingForm,
    pub lines: Vec<CartLine>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub currency: CurrencyCode,
}

impl OrderDraft {
    /// Build a draft from the current cart contents and a validated form.
    #[must_use]
    pub fn new(shipping: ShippingForm, lines: Vec<CartLine>, currency: CurrencyCode) -> Self {
        let subtotal = lines.iter().map(CartLine::line_total).sum();
        let delivery_fee = shipping.delivery.fee();
        Self {
            shipping,
            lines,
            subtotal,
            delivery_fee,
            currency,
        }
    }

    /// Amount the customer is charged.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.subtotal + self.delivery_fee
    }

    /// The wire payload for order creation. Each call mints a fresh
    /// idempotency key; one payload is built per submission attempt.
    #[must_use]
    pub fn to_payload(&self) -> OrderPayload {
        OrderPayload {
            idempotency_key: Uuid::new_v4(),
            customer_name: self.shipping.name.clone(),
            phone: self.shipping.phone.clone(),
            street: self.shipping.street.clone(),
            city: self.shipping.city.clone(),
            postal_code: self.shipping.postal_code.clone(),
            country: self.shipping.country.clone(),
            delivery: self.shipping.delivery,
            lines: self
                .lines
                .iter()
                .map(|line| OrderPayloadLine {
                    product_id: line.product_id.clone(),
                    name: line.product.name.clone(),
                    unit_price: line.product.price.as_ref().map(|price| price.amount),
                    quantity: line.quantity,
                })
                .collect(),
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            total: self.total(),
            currency: self.currency.code().to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tamarind_core::{LineItemId, Money, Product, ProductId};

    fn valid_form() -> ShippingForm {
        ShippingForm {
            name: "Ada Lovelace".to_string(),
            phone: "+44 20 7946 0000".to_string(),
            street: "1 St James's Square".to_string(),
            city: "London".to_string(),
            postal_code: "SW1Y 4JU".to_string(),
            country: "GB".to_string(),
            delivery: DeliveryTier::Standard,
        }
    }

    fn line(id: &str, unit_cents: i64, quantity: u32) -> CartLine {
        let product_id = ProductId::new(id);
        CartLine {
            id: LineItemId::for_guest(&product_id),
            product_id: product_id.clone(),
            product: Product {
                id: product_id,
                name: format!("Product {id}"),
                price: Some(Money::new(Decimal::new(unit_cents, 2), CurrencyCode::USD)),
                stock: 10,
                category: "mugs".to_string(),
            },
            quantity,
        }
    }

    #[test]
    fn test_validate_passes_complete_form() {
        assert!(valid_form().validate().is_empty());
    }

    #[test]
    fn test_validate_flags_whitespace_only_fields() {
        let mut form = valid_form();
        form.city = "   ".to_string();
        form.phone = String::new();

        let errors = form.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["phone", "city"]);
    }

    #[test]
    fn test_draft_totals_include_delivery_fee() {
        let mut form = valid_form();
        form.delivery = DeliveryTier::Express;
        let draft = OrderDraft::new(
            form,
            vec![line("a", 1000, 2), line("b", 550, 1)],
            CurrencyCode::USD,
        );

        assert_eq!(draft.subtotal, Decimal::new(2550, 2));
        assert_eq!(draft.delivery_fee, Decimal::new(1500, 2));
        assert_eq!(draft.total(), Decimal::new(4050, 2));
    }

    #[test]
    fn test_payload_carries_lines_and_currency() {
        let draft = OrderDraft::new(valid_form(), vec![line("a", 1000, 3)], CurrencyCode::USD);
        let payload = draft.to_payload();

        assert_eq!(payload.lines.len(), 1);
        assert_eq!(payload.lines[0].quantity, 3);
        assert_eq!(payload.lines[0].unit_price, Some(Decimal::new(1000, 2)));
        assert_eq!(payload.currency, "usd");
        assert_eq!(payload.total, Decimal::new(3500, 2));
    }

    #[test]
    fn test_each_payload_gets_a_fresh_idempotency_key() {
        let draft = OrderDraft::new(valid_form(), vec![line("a", 1000, 1)], CurrencyCode::USD);
        assert_ne!(draft.to_payload().idempotency_key, draft.to_payload().idempotency_key);
    }
}
