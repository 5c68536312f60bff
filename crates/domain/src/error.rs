//! Domain error types.

use thiserror::Error;

/// Errors raised when constructing domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Cart line quantity must be at least one.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Prices cannot be negative.
    #[error("Invalid price: {price} (must not be negative)")]
    InvalidPrice { price: i64 },

    /// `unit_price × quantity` exceeds the largest line total accepted.
    #[error("Line total for price {price} x {quantity} exceeds the maximum of {max} cents")]
    LineTotalTooLarge { price: i64, quantity: u32, max: i64 },

    /// A decimal money string could not be parsed.
    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),

    /// A serviceable-region entry could not be parsed.
    #[error("Invalid serviceable region entry: {0:?} (expected City/UF)")]
    InvalidRegion(String),
}
