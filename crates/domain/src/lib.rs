//! Domain layer for the storefront checkout.
//!
//! This crate provides the pure building blocks checkout composes:
//! - Money and identifier value objects
//! - Cart lines and the totals calculator
//! - Delivery addresses with field-scoped validation
//! - Postal-code and tax-id check-digit validation
//! - The serviceable-region allowlist
//! - Order snapshots submitted to the ledger

pub mod address;
pub mod cart;
pub mod error;
pub mod order;
pub mod region;
pub mod validation;
pub mod value_objects;

pub use address::{
    AddressField, DeliveryAddress, FieldError, ValidationError, validate_optional_tax_id,
};
pub use cart::{CartLine, FeeSchedule, MAX_LINE_TOTAL_CENTS, Totals, compute_totals};
pub use error::DomainError;
pub use order::{Order, OrderDraft, OrderStatus, PaymentMethod};
pub use region::{
    Locality, ServiceableRegions, fold_diacritics, is_serviceable_region, normalize_city,
};
pub use validation::{
    is_valid_postal_code, is_valid_tax_id, mask_postal_code, mask_tax_id, normalize_digits,
};
pub use value_objects::{CustomerId, ItemId, MerchantId, Money, OrderId};
