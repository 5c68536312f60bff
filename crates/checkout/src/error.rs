//! Checkout error types.

use std::time::Duration;

use domain::{OrderId, ValidationError};
use payment_code::PaymentCodeError;
use thiserror::Error;

use crate::state::CheckoutState;

/// Errors that can occur during checkout operations.
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    /// Bad postal code, tax id or missing required field. Fixed by re-editing.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The address is valid but outside the delivery area.
    #[error("{message}")]
    Serviceability {
        city: String,
        region: String,
        message: String,
    },

    /// The order ledger could not record the order. The cart is untouched.
    #[error("Order ledger error: {0}")]
    Ledger(String),

    /// The ledger did not answer in time and returned no order id.
    #[error("Order submission timed out after {0:?}")]
    Timeout(Duration),

    /// The payment code could not be derived. When `order_id` is set the
    /// order already exists in the ledger.
    #[error("Payment code could not be issued{}: {source}", order_suffix(.order_id))]
    Configuration {
        order_id: Option<OrderId>,
        source: PaymentCodeError,
    },

    /// Profile store error.
    #[error("Profile store error: {0}")]
    ProfileStore(String),

    /// Postal lookup service error.
    #[error("Postal lookup error: {0}")]
    PostalLookup(String),

    /// Cart store error.
    #[error("Cart store error: {0}")]
    CartStore(String),

    /// The customer cancelled the checkout.
    #[error("Checkout was cancelled")]
    Cancelled,

    /// Checkout cannot proceed without items.
    #[error("Cart is empty")]
    EmptyCart,

    /// Session is in the wrong state for the requested operation.
    #[error("Invalid checkout state: expected {expected}, actual {actual}")]
    InvalidState {
        expected: &'static str,
        actual: CheckoutState,
    },
}

fn order_suffix(order_id: &Option<OrderId>) -> String {
    order_id
        .as_ref()
        .map(|id| format!(" for order {id}"))
        .unwrap_or_default()
}

impl CheckoutError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            CheckoutError::Validation(_) => "validation-error",
            CheckoutError::Serviceability { .. } => "serviceability-error",
            CheckoutError::Ledger(_) => "ledger-error",
            CheckoutError::Timeout(_) => "timeout",
            CheckoutError::Configuration { .. } => "configuration-error",
            CheckoutError::ProfileStore(_) => "profile-store-error",
            CheckoutError::PostalLookup(_) => "postal-lookup-error",
            CheckoutError::CartStore(_) => "cart-store-error",
            CheckoutError::Cancelled => "cancelled",
            CheckoutError::EmptyCart => "empty-cart",
            CheckoutError::InvalidState { .. } => "invalid-state",
        }
    }

    /// True for errors the customer fixes by editing the address form.
    pub fn is_field_error(&self) -> bool {
        matches!(
            self,
            CheckoutError::Validation(_) | CheckoutError::Serviceability { .. }
        )
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;
    use domain::AddressField;

    #[test]
    fn test_reason_codes_are_distinct_for_escalated_failures() {
        let ledger = CheckoutError::Ledger("down".to_string());
        let timeout = CheckoutError::Timeout(Duration::from_secs(15));
        let config = CheckoutError::Configuration {
            order_id: Some(OrderId::new("rec1")),
            source: PaymentCodeError::MissingPayeeKey,
        };

        assert_eq!(ledger.code(), "ledger-error");
        assert_eq!(timeout.code(), "timeout");
        assert_eq!(config.code(), "configuration-error");
    }

    #[test]
    fn test_configuration_message_names_the_order() {
        let err = CheckoutError::Configuration {
            order_id: Some(OrderId::new("rec1")),
            source: PaymentCodeError::MissingPayeeKey,
        };
        assert_eq!(
            err.to_string(),
            "Payment code could not be issued for order rec1: Payee key is not configured"
        );
    }

    #[test]
    fn test_field_errors() {
        let validation =
            CheckoutError::from(ValidationError::single(AddressField::City, "City is required"));
        assert!(validation.is_field_error());
        assert_eq!(validation.code(), "validation-error");
        assert!(!CheckoutError::Cancelled.is_field_error());
    }
}
