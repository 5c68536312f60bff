//! Payment code error types.

use thiserror::Error;

/// Errors raised while encoding or decoding a payment payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentCodeError {
    /// No payee key is configured, so no payable code can be produced.
    #[error("Payee key is not configured")]
    MissingPayeeKey,

    /// The payee key cannot fit inside the payee account template.
    #[error("Payee key is {len} characters long (max {max})")]
    PayeeKeyTooLong { len: usize, max: usize },

    /// A configured merchant field is empty.
    #[error("Merchant {0} is not configured")]
    MissingMerchantField(&'static str),

    /// Currency code must be three digits.
    #[error("Invalid currency code: {0:?} (expected 3 digits)")]
    InvalidCurrency(String),

    /// A TLV value does not fit the two-digit length prefix.
    #[error("Value for tag {tag} is {len} characters long (max 99)")]
    ValueTooLong { tag: String, len: usize },

    /// Tags are exactly two ASCII digits.
    #[error("Invalid tag: {0:?}")]
    InvalidTag(String),

    /// Payload ended in the middle of a field.
    #[error("Payload truncated at offset {offset}")]
    Truncated { offset: usize },

    /// A length prefix is not two digits.
    #[error("Invalid length prefix at offset {offset}")]
    InvalidLength { offset: usize },

    /// Payload does not end with the `6304` checksum field.
    #[error("Payload has no checksum field")]
    MissingChecksum,

    /// Checksum does not match the payload contents.
    #[error("Checksum mismatch: payload says {found}, computed {expected}")]
    ChecksumMismatch { expected: String, found: String },
}

/// Convenience type alias for codec results.
pub type Result<T> = std::result::Result<T, PaymentCodeError>;
