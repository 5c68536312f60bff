//! Payload assembly.

use std::str::FromStr;

use domain::{Money, OrderId, fold_diacritics};
use serde::{Deserialize, Serialize};

use crate::crc::checksum_hex;
use crate::error::{PaymentCodeError, Result};
use crate::tlv::tlv;

/// Identifier of the instant-payment network inside the payee template.
pub const PAYEE_SCHEME: &str = "br.gov.bcb.pix";

/// Field tags, in the order they appear in a payload.
pub mod tags {
    pub const PAYLOAD_FORMAT: &str = "00";
    pub const INITIATION_METHOD: &str = "01";
    pub const PAYEE_ACCOUNT: &str = "26";
    pub const MERCHANT_CATEGORY: &str = "52";
    pub const CURRENCY: &str = "53";
    pub const AMOUNT: &str = "54";
    pub const COUNTRY: &str = "58";
    pub const MERCHANT_NAME: &str = "59";
    pub const MERCHANT_CITY: &str = "60";
    pub const ADDITIONAL_DATA: &str = "62";
    pub const CHECKSUM: &str = "63";

    /// Sub-tags of [`PAYEE_ACCOUNT`].
    pub const PAYEE_SCHEME_ID: &str = "00";
    pub const PAYEE_KEY: &str = "01";

    /// Sub-tag of [`ADDITIONAL_DATA`].
    pub const REFERENCE_LABEL: &str = "05";
}

const PAYLOAD_FORMAT_VERSION: &str = "01";
const MERCHANT_CATEGORY_UNCLASSIFIED: &str = "0000";
const COUNTRY_CODE: &str = "BR";
/// Checksum tag and length, appended before the CRC is computed.
const CHECKSUM_PLACEHOLDER: &str = "6304";

pub const MAX_NAME_LEN: usize = 25;
pub const MAX_CITY_LEN: usize = 15;
pub const MAX_REFERENCE_LEN: usize = 25;
/// Room left in the payee template after the scheme sub-field and the
/// key's own tag and length.
pub const MAX_PAYEE_KEY_LEN: usize = crate::tlv::MAX_VALUE_LEN - (4 + PAYEE_SCHEME.len()) - 4;

/// Whether a code may be paid repeatedly or is bound to one amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitiationMethod {
    /// Reusable code without an amount (`11`).
    Static,
    /// Single-use code carrying the amount (`12`).
    #[default]
    Dynamic,
}

impl InitiationMethod {
    /// Wire value of the point-of-initiation field.
    pub fn code(&self) -> &'static str {
        match self {
            InitiationMethod::Static => "11",
            InitiationMethod::Dynamic => "12",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "11" => Some(InitiationMethod::Static),
            "12" => Some(InitiationMethod::Dynamic),
            _ => None,
        }
    }
}

impl FromStr for InitiationMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" | "11" => Ok(InitiationMethod::Static),
            "dynamic" | "12" => Ok(InitiationMethod::Dynamic),
            other => Err(format!("unknown initiation method {other:?}")),
        }
    }
}

/// Payee details printed into every code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merchant {
    payee_key: Option<String>,
    name: String,
    city: String,
    uppercase_name: bool,
    currency_code: String,
}

impl Merchant {
    /// Creates a merchant with no payee key, upper-cased name and the
    /// `986` currency code.
    pub fn new(name: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            payee_key: None,
            name: name.into(),
            city: city.into(),
            uppercase_name: true,
            currency_code: "986".to_string(),
        }
    }

    pub fn with_payee_key(mut self, key: impl Into<String>) -> Self {
        self.payee_key = Some(key.into());
        self
    }

    pub fn with_uppercase_name(mut self, uppercase: bool) -> Self {
        self.uppercase_name = uppercase;
        self
    }

    pub fn with_currency_code(mut self, code: impl Into<String>) -> Self {
        self.currency_code = code.into();
        self
    }

    /// The trimmed payee key, if one is configured and non-blank.
    pub fn payee_key(&self) -> Option<&str> {
        self.payee_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn currency_code(&self) -> &str {
        &self.currency_code
    }

    /// Name as printed in the payload: ASCII-folded, optionally upper-cased,
    /// at most 25 characters.
    pub fn display_name(&self) -> String {
        let folded = fold_diacritics(self.name.trim());
        let name = if self.uppercase_name {
            folded.to_uppercase()
        } else {
            folded
        };
        truncate(&name, MAX_NAME_LEN)
    }

    /// City as printed in the payload: ASCII-folded, at most 15 characters.
    pub fn display_city(&self) -> String {
        truncate(&fold_diacritics(self.city.trim()), MAX_CITY_LEN)
    }

    /// Checks that a configured payee key fits the payee template. An
    /// absent key passes; [`Merchant::validate`] rejects it at issuance.
    pub fn check_payee_key(&self) -> Result<()> {
        match self.payee_key() {
            Some(key) if key.chars().count() > MAX_PAYEE_KEY_LEN => {
                Err(PaymentCodeError::PayeeKeyTooLong {
                    len: key.chars().count(),
                    max: MAX_PAYEE_KEY_LEN,
                })
            }
            _ => Ok(()),
        }
    }

    /// Checks everything an issuance needs, without encoding anything.
    pub fn validate(&self) -> Result<()> {
        self.payee_key().ok_or(PaymentCodeError::MissingPayeeKey)?;
        self.check_payee_key()?;
        if self.name.trim().is_empty() {
            return Err(PaymentCodeError::MissingMerchantField("name"));
        }
        if self.city.trim().is_empty() {
            return Err(PaymentCodeError::MissingMerchantField("city"));
        }
        if self.currency_code.len() != 3 || !self.currency_code.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(PaymentCodeError::InvalidCurrency(self.currency_code.clone()));
        }
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// A payment payload bound to the order it pays for.
///
/// Always recomputable from the order, so it is never stored separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCode {
    pub payload: String,
    pub bound_order_id: OrderId,
}

/// Encodes a complete, checksummed payload.
///
/// `amount` is only written for [`InitiationMethod::Dynamic`] codes.
/// `reference` is truncated to 25 characters; an empty reference is
/// written as `***`.
pub fn encode(
    merchant: &Merchant,
    method: InitiationMethod,
    amount: Money,
    reference: &str,
) -> Result<String> {
    merchant.validate()?;
    let payee_key = merchant
        .payee_key()
        .ok_or(PaymentCodeError::MissingPayeeKey)?;

    let payee_account = format!(
        "{}{}",
        tlv(tags::PAYEE_SCHEME_ID, PAYEE_SCHEME)?,
        tlv(tags::PAYEE_KEY, payee_key)?
    );

    let reference = match truncate(reference.trim(), MAX_REFERENCE_LEN) {
        r if r.is_empty() => "***".to_string(),
        r => r,
    };

    let mut payload = String::with_capacity(160);
    payload.push_str(&tlv(tags::PAYLOAD_FORMAT, PAYLOAD_FORMAT_VERSION)?);
    payload.push_str(&tlv(tags::INITIATION_METHOD, method.code())?);
    payload.push_str(&tlv(tags::PAYEE_ACCOUNT, &payee_account)?);
    payload.push_str(&tlv(
        tags::MERCHANT_CATEGORY,
        MERCHANT_CATEGORY_UNCLASSIFIED,
    )?);
    payload.push_str(&tlv(tags::CURRENCY, merchant.currency_code())?);
    if method == InitiationMethod::Dynamic {
        payload.push_str(&tlv(tags::AMOUNT, &amount.to_decimal_string())?);
    }
    payload.push_str(&tlv(tags::COUNTRY, COUNTRY_CODE)?);
    payload.push_str(&tlv(tags::MERCHANT_NAME, &merchant.display_name())?);
    payload.push_str(&tlv(tags::MERCHANT_CITY, &merchant.display_city())?);
    payload.push_str(&tlv(
        tags::ADDITIONAL_DATA,
        &tlv(tags::REFERENCE_LABEL, &reference)?,
    )?);

    payload.push_str(CHECKSUM_PLACEHOLDER);
    let checksum = checksum_hex(&payload);
    payload.push_str(&checksum);

    Ok(payload)
}

/// Derives the payment code for an order. Pure: the same inputs always
/// give the same payload.
pub fn issue(
    merchant: &Merchant,
    method: InitiationMethod,
    order_id: &OrderId,
    amount: Money,
) -> Result<PaymentCode> {
    let payload = encode(merchant, method, amount, order_id.as_str())?;
    Ok(PaymentCode {
        payload,
        bound_order_id: order_id.clone(),
    })
}
