//! Newtype IDs for type-safe entity references.
//!
//! The remote catalog and order APIs issue opaque string identifiers, so the
//! wrappers are string-backed. Use the `define_id!` macro to create new ones.

/// Macro to define a type-safe ID wrapper around an opaque string.
///
/// Creates a newtype with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>` and `From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use tamarind_core::define_id;
/// define_id!(ProductId);
/// define_id!(OrderId);
///
/// let product_id = ProductId::new("prod-1");
/// let order_id = OrderId::new("ord-1");
///
/// // These are different types, so this won't compile:
/// // let _: ProductId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID, returning the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

define_id!(ProductId);
define_id!(LineItemId);
define_id!(OrderId);
define_id!(CustomerId);

impl LineItemId {
    /// Synthesize the ID used for a guest-mode line item.
    ///
    /// Guest entries never touch the server, so the ID is derived from the
    /// product it references.
    #[must_use]
    pub fn for_guest(product_id: &ProductId) -> Self {
        Self::new(format!("guest-{product_id}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_types() {
        let product = ProductId::new("p-1");
        assert_eq!(product.as_str(), "p-1");
        assert_eq!(product.to_string(), "p-1");
    }

    #[test]
    fn test_guest_line_item_id() {
        let id = LineItemId::for_guest(&ProductId::new("sku-42"));
        assert_eq!(id.as_str(), "guest-sku-42");
    }

    #[test]
    fn test_serde_transparent() {
        let id = OrderId::new("ord-9");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ord-9\"");
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
