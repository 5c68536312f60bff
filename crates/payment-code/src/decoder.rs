//! Payload decoding, for reconciliation and round-trip checks.

use domain::Money;

use crate::crc::checksum_hex;
use crate::encoder::{InitiationMethod, tags};
use crate::error::{PaymentCodeError, Result};
use crate::tlv::{TlvField, parse_fields};

/// A payload split back into its fields, with the checksum verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPaymentCode {
    fields: Vec<TlvField>,
    checksum: String,
}

impl DecodedPaymentCode {
    /// Verifies the trailing checksum and tokenizes the payload by tag.
    pub fn parse(payload: &str) -> Result<Self> {
        let char_count = payload.chars().count();
        if char_count < 8 {
            return Err(PaymentCodeError::MissingChecksum);
        }

        let split = payload
            .char_indices()
            .nth(char_count - 4)
            .map(|(i, _)| i)
            .ok_or(PaymentCodeError::MissingChecksum)?;
        let (signed, found) = payload.split_at(split);

        let body = signed
            .strip_suffix("6304")
            .ok_or(PaymentCodeError::MissingChecksum)?;

        let expected = checksum_hex(signed);
        if !found.eq_ignore_ascii_case(&expected) {
            return Err(PaymentCodeError::ChecksumMismatch {
                expected,
                found: found.to_string(),
            });
        }

        Ok(Self {
            fields: parse_fields(body)?,
            checksum: found.to_ascii_uppercase(),
        })
    }

    /// Top-level fields in payload order, checksum excluded.
    pub fn fields(&self) -> &[TlvField] {
        &self.fields
    }

    /// Value of the first top-level field with `tag`.
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.tag == tag)
            .map(|f| f.value.as_str())
    }

    /// Value of `sub_tag` inside the template field `tag`.
    pub fn nested(&self, tag: &str, sub_tag: &str) -> Option<String> {
        let template = self.get(tag)?;
        parse_fields(template)
            .ok()?
            .into_iter()
            .find(|f| f.tag == sub_tag)
            .map(|f| f.value)
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn initiation_method(&self) -> Option<InitiationMethod> {
        self.get(tags::INITIATION_METHOD)
            .and_then(InitiationMethod::from_code)
    }

    pub fn payee_scheme(&self) -> Option<String> {
        self.nested(tags::PAYEE_ACCOUNT, tags::PAYEE_SCHEME_ID)
    }

    pub fn payee_key(&self) -> Option<String> {
        self.nested(tags::PAYEE_ACCOUNT, tags::PAYEE_KEY)
    }

    /// Transaction amount; `None` for reusable codes.
    pub fn amount(&self) -> Option<Money> {
        self.get(tags::AMOUNT)
            .and_then(|a| Money::parse_decimal(a).ok())
    }

    pub fn currency(&self) -> Option<&str> {
        self.get(tags::CURRENCY)
    }

    pub fn country(&self) -> Option<&str> {
        self.get(tags::COUNTRY)
    }

    pub fn merchant_name(&self) -> Option<&str> {
        self.get(tags::MERCHANT_NAME)
    }

    pub fn merchant_city(&self) -> Option<&str> {
        self.get(tags::MERCHANT_CITY)
    }

    /// Reference label binding the payload to an order.
    pub fn reference(&self) -> Option<String> {
        self.nested(tags::ADDITIONAL_DATA, tags::REFERENCE_LABEL)
    }
}
