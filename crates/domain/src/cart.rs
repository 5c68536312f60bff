//! Cart lines and the totals calculator.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{ItemId, MerchantId, Money};

/// Largest `unit_price × quantity` a single line may carry (R$100,000,000.00).
///
/// Keeps every reachable total far below `i64::MAX` cents.
pub const MAX_LINE_TOTAL_CENTS: i64 = 10_000_000_000;

/// A line of the customer's cart, as read from the cart store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: ItemId,
    pub merchant_id: MerchantId,
    pub unit_price: Money,
    /// Always at least 1.
    pub quantity: u32,
    pub size_label: Option<String>,
}

impl CartLine {
    /// Creates a validated cart line.
    pub fn new(
        item_id: impl Into<ItemId>,
        merchant_id: impl Into<MerchantId>,
        unit_price: Money,
        quantity: u32,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        if unit_price.is_negative() {
            return Err(DomainError::InvalidPrice {
                price: unit_price.cents(),
            });
        }
        let within_limit = unit_price
            .checked_multiply(quantity)
            .is_some_and(|total| total.cents() <= MAX_LINE_TOTAL_CENTS);
        if !within_limit {
            return Err(DomainError::LineTotalTooLarge {
                price: unit_price.cents(),
                quantity,
                max: MAX_LINE_TOTAL_CENTS,
            });
        }

        Ok(Self {
            item_id: item_id.into(),
            merchant_id: merchant_id.into(),
            unit_price,
            quantity,
            size_label: None,
        })
    }

    /// Sets the size label (e.g. "M", "42").
    pub fn with_size(mut self, size_label: impl Into<String>) -> Self {
        self.size_label = Some(size_label.into());
        self
    }

    /// Returns `unit_price * quantity`.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Derived checkout totals. Never persisted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub service_fee: Money,
    pub grand_total: Money,
    /// Number of distinct merchants the delivery fee was charged for.
    pub store_count: usize,
}

/// Delivery and service fees applied to every checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub per_store_fee: Money,
    pub service_fee: Money,
}

impl FeeSchedule {
    pub fn new(per_store_fee: Money, service_fee: Money) -> Self {
        Self {
            per_store_fee,
            service_fee,
        }
    }

    /// Computes the totals for `lines` under this fee schedule.
    pub fn totals(&self, lines: &[CartLine]) -> Totals {
        compute_totals(lines, self.per_store_fee, self.service_fee)
    }
}

/// Computes subtotal, fees and grand total for a cart.
///
/// An empty cart yields all-zero totals. Otherwise the delivery fee is
/// charged once per distinct merchant, not per line. Arithmetic saturates,
/// so lines that bypassed [`CartLine::new`] can never produce a negative
/// total.
pub fn compute_totals(lines: &[CartLine], per_store_fee: Money, service_fee: Money) -> Totals {
    if lines.is_empty() {
        return Totals::default();
    }

    let subtotal: Money = lines.iter().map(CartLine::line_total).sum();
    let store_count = lines
        .iter()
        .map(|line| &line.merchant_id)
        .collect::<HashSet<_>>()
        .len();
    let delivery_fee = per_store_fee.multiply(u32::try_from(store_count).unwrap_or(u32::MAX));

    Totals {
        subtotal,
        delivery_fee,
        service_fee,
        grand_total: subtotal + delivery_fee + service_fee,
        store_count,
    }
}
