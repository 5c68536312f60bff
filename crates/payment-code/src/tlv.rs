//! Tag-length-value primitive.
//!
//! A field is a two-digit tag, a two-digit decimal length and that many
//! characters of value. Lengths count characters, not bytes.

use serde::{Deserialize, Serialize};

use crate::error::{PaymentCodeError, Result};

/// Largest value the two-digit length prefix can describe.
pub const MAX_VALUE_LEN: usize = 99;

/// Encodes one field as `tag + len + value`.
pub fn tlv(tag: &str, value: &str) -> Result<String> {
    if !is_tag(tag) {
        return Err(PaymentCodeError::InvalidTag(tag.to_string()));
    }

    let len = value.chars().count();
    if len > MAX_VALUE_LEN {
        return Err(PaymentCodeError::ValueTooLong {
            tag: tag.to_string(),
            len,
        });
    }

    Ok(format!("{tag}{len:02}{value}"))
}

fn is_tag(tag: &str) -> bool {
    tag.len() == 2 && tag.bytes().all(|b| b.is_ascii_digit())
}

/// A decoded field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlvField {
    pub tag: String,
    pub value: String,
}

/// Splits a concatenation of fields back into its parts, in order.
pub fn parse_fields(input: &str) -> Result<Vec<TlvField>> {
    let chars: Vec<char> = input.chars().collect();
    let mut fields = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let header = chars
            .get(pos..pos + 4)
            .ok_or(PaymentCodeError::Truncated { offset: pos })?;

        let tag: String = header[..2].iter().collect();
        if !is_tag(&tag) {
            return Err(PaymentCodeError::InvalidTag(tag));
        }

        let len_digits: String = header[2..].iter().collect();
        if !len_digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PaymentCodeError::InvalidLength { offset: pos + 2 });
        }
        let len: usize = len_digits
            .parse()
            .map_err(|_| PaymentCodeError::InvalidLength { offset: pos + 2 })?;

        let start = pos + 4;
        let value: String = chars
            .get(start..start + len)
            .ok_or(PaymentCodeError::Truncated { offset: start })?
            .iter()
            .collect();

        fields.push(TlvField { tag, value });
        pos = start + len;
    }

    Ok(fields)
}
