//! Value objects shared across the checkout domain.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Customer identifier issued by the authentication provider.
    CustomerId
);

string_id!(
    /// Order identifier assigned by the order ledger.
    OrderId
);

string_id!(
    /// Catalog item identifier.
    ItemId
);

string_id!(
    /// Identifier of the store (merchant) selling an item.
    MerchantId
);

/// Money amount in minor units (centavos) so cent-level arithmetic is exact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = R$10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-unit portion.
    pub fn units(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after whole units).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity, saturating at the largest representable
    /// amount.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents.saturating_mul(i64::from(quantity)),
        }
    }

    /// Multiplies by a quantity, or `None` on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Adds two amounts, or `None` on overflow.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.cents.checked_add(rhs.cents).map(Money::from_cents)
    }

    /// Formats the amount with exactly two decimals and a `.` separator,
    /// without a currency symbol (`"123.40"`).
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.cents < 0 { "-" } else { "" };
        format!("{sign}{}.{:02}", self.units().abs(), self.cents_part())
    }

    /// Parses a non-negative decimal amount such as `"20"`, `"3.4"` or `"3,40"`.
    ///
    /// At most two fractional digits are accepted; anything else is rejected
    /// rather than rounded.
    pub fn parse_decimal(input: &str) -> Result<Money, DomainError> {
        let invalid = || DomainError::InvalidAmount(input.to_string());
        let s = input.trim();

        let (whole, frac) = match s.split_once(['.', ',']) {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: i64 = whole.parse().map_err(|_| invalid())?;
        let cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        units
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents))
            .map(Money::from_cents)
            .ok_or_else(invalid)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-R${}.{:02}", self.units().abs(), self.cents_part())
        } else {
            write!(f, "R${}.{:02}", self.units(), self.cents_part())
        }
    }
}

/// Saturating: sums never wrap around to a negative amount.
impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}
