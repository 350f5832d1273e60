//! Visitor identity as a closed tagged variant.
//!
//! The remote API reports roles as free-form strings ("admin", "user", …).
//! Everything past the session boundary works with this enum instead, so the
//! few decision points (cart suppression, route access) can match
//! exhaustively.

use serde::{Deserialize, Serialize};

use super::id::CustomerId;

/// Who the current visitor is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "role", content = "customer_id", rename_all = "snake_case")]
pub enum Identity {
    /// No valid credential present; cart and wishlist are device-local.
    #[default]
    Guest,
    /// Authenticated shopper.
    Customer(CustomerId),
    /// Authenticated staff identity. Administrators do not shop.
    Administrator(CustomerId),
}

impl Identity {
    /// Whether a credential backs this identity.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Guest)
    }

    /// Whether this is a staff identity.
    #[must_use]
    pub const fn is_administrator(&self) -> bool {
        matches!(self, Self::Administrator(_))
    }

    /// Build an identity from the role string the remote API reports.
    ///
    /// Matching is case-insensitive; unknown roles are treated as plain
    /// customers rather than rejected.
    #[must_use]
    pub fn from_role(role: &str, customer_id: CustomerId) -> Self {
        match role.to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Self::Administrator(customer_id),
            _ => Self::Customer(customer_id),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_role_case_insensitive() {
        let id = CustomerId::new("c-1");
        assert!(Identity::from_role("ADMIN", id.clone()).is_administrator());
        assert!(Identity::from_role("Admin", id.clone()).is_administrator());
        assert!(!Identity::from_role("user", id).is_administrator());
    }

    #[test]
    fn test_guest_is_not_authenticated() {
        assert!(!Identity::Guest.is_authenticated());
        assert!(Identity::Customer(CustomerId::new("c-2")).is_authenticated());
    }
}
