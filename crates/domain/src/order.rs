//! Order snapshots exchanged with the order ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::DeliveryAddress;
use crate::cart::{CartLine, Totals};
use crate::value_objects::{CustomerId, OrderId};

/// How the customer pays for the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Instant payment through a merchant-presented QR code.
    #[default]
    Pix,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "pix",
        }
    }
}

/// Ledger-side status of an order.
///
/// Only `AwaitingPayment` is set by checkout; later transitions are
/// driven by whatever polls the ledger.
///
/// ```text
/// AwaitingPayment ──┬──► Paid
///                   └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    AwaitingPayment,
    Paid,
    Cancelled,
}

impl OrderStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "AwaitingPayment",
            OrderStatus::Paid => "Paid",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything the ledger needs to record an order. Built once per
/// checkout attempt from the cart snapshot and the confirmed address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer_id: CustomerId,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub tax_id: Option<String>,
    pub lines: Vec<CartLine>,
    pub totals: Totals,
    pub address: DeliveryAddress,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
}

/// An order acknowledged by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub lines: Vec<CartLine>,
    pub totals: Totals,
    pub address: DeliveryAddress,
    pub tax_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Binds a draft to the identifier the ledger returned.
    pub fn from_draft(order_id: OrderId, draft: OrderDraft) -> Self {
        Self {
            order_id,
            customer_id: draft.customer_id,
            lines: draft.lines,
            totals: draft.totals,
            address: draft.address,
            tax_id: draft.tax_id,
            payment_method: draft.payment_method,
            status: draft.status,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::compute_totals;
    use crate::value_objects::Money;

    fn draft() -> OrderDraft {
        let lines = vec![CartLine::new("shirt", "store-a", Money::from_cents(5000), 1).unwrap()];
        let totals = compute_totals(&lines, Money::from_cents(2000), Money::from_cents(340));
        OrderDraft {
            customer_id: CustomerId::new("cust-1"),
            customer_email: Some("ana@example.com".to_string()),
            customer_name: None,
            tax_id: None,
            lines,
            totals,
            address: DeliveryAddress::default(),
            payment_method: PaymentMethod::Pix,
            status: OrderStatus::AwaitingPayment,
        }
    }

    #[test]
    fn test_from_draft_keeps_snapshot() {
        let draft = draft();
        let order = Order::from_draft(OrderId::new("rec123"), draft.clone());

        assert_eq!(order.order_id.as_str(), "rec123");
        assert_eq!(order.customer_id, draft.customer_id);
        assert_eq!(order.lines, draft.lines);
        assert_eq!(order.totals, draft.totals);
        assert_eq!(order.status, OrderStatus::AwaitingPayment);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::AwaitingPayment.is_terminal());
        assert!(OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_payment_method_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&PaymentMethod::Pix).unwrap(), "\"pix\"");
        assert_eq!(PaymentMethod::Pix.as_str(), "pix");
    }
}
