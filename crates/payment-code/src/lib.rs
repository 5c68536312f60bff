//! Merchant-presented payment QR payloads.
//!
//! A payload is a fixed sequence of tag-length-value fields followed by a
//! CRC16 checksum field. This crate only produces and parses the text;
//! rendering it as a scannable image is left to the caller.
//!
//! ```text
//! 00 format │ 01 initiation │ 26 payee │ 52 MCC │ 53 currency │ [54 amount]
//! 58 country │ 59 name │ 60 city │ 62 reference │ 63 CRC16
//! ```

pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod tlv;

pub use crc::{checksum_hex, crc16_ccitt};
pub use decoder::DecodedPaymentCode;
pub use encoder::{InitiationMethod, Merchant, PAYEE_SCHEME, PaymentCode, encode, issue, tags};
pub use error::PaymentCodeError;
pub use tlv::{TlvField, parse_fields, tlv};
