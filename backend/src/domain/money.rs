//! Fixed-point money in ledger minor units.
//!
//! Amounts are counted in stroops (10^-7 of the ledger's base unit) and held
//! in an `i64`. Decimal strings are parsed exactly; equality is integer
//! equality, so `"100"` and `"100.0000000"` are the same amount while
//! `"99.99"` is not.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of fractional digits carried by [`Money`].
pub const DECIMALS: usize = 7;
const SCALE: i64 = 10_000_000;

/// Errors raised while parsing or combining amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// The input was empty.
    #[error("amount must not be empty")]
    Empty,
    /// The input was not a plain decimal number.
    #[error("amount must be a decimal number such as 100.5")]
    Malformed,
    /// More fractional digits than the ledger supports.
    #[error("amount supports at most 7 decimal places")]
    TooPrecise,
    /// Negative amounts are not representable.
    #[error("amount must not be negative")]
    Negative,
    /// The result does not fit in the supported range.
    #[error("amount is too large")]
    Overflow,
}

/// Non-negative monetary amount with seven decimal places.
///
/// # Examples
/// ```
/// use chama_backend::domain::Money;
///
/// let contribution: Money = "100.0".parse().expect("valid amount");
/// let pot = contribution.checked_mul(3).expect("no overflow");
/// assert_eq!(pot.to_string(), "300.0");
/// assert_ne!(contribution, "99.99".parse().expect("valid amount"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Money(i64);

impl Money {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Construct from a raw stroop count.
    ///
    /// # Errors
    /// Returns [`MoneyError::Negative`] for negative counts.
    pub const fn from_stroops(stroops: i64) -> Result<Self, MoneyError> {
        if stroops < 0 {
            Err(MoneyError::Negative)
        } else {
            Ok(Self(stroops))
        }
    }

    /// Raw stroop count.
    #[must_use]
    pub const fn stroops(self) -> i64 {
        self.0
    }

    /// Whether the amount is greater than zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Add two amounts.
    ///
    /// # Errors
    /// Returns [`MoneyError::Overflow`] when the sum exceeds the range.
    pub const fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        match self.0.checked_add(other.0) {
            Some(value) => Ok(Self(value)),
            None => Err(MoneyError::Overflow),
        }
    }

    /// Multiply by a member count.
    ///
    /// # Errors
    /// Returns [`MoneyError::Overflow`] when the product exceeds the range.
    pub fn checked_mul(self, factor: u32) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(i64::from(factor))
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Sum a sequence of amounts.
    ///
    /// # Errors
    /// Returns [`MoneyError::Overflow`] when the total exceeds the range.
    pub fn sum<I>(amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

fn parse_digits(digits: &str) -> Result<i64, MoneyError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MoneyError::Malformed);
    }
    digits.parse::<i64>().map_err(|_| MoneyError::Overflow)
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(MoneyError::Empty);
        }
        if value.starts_with('-') {
            return Err(MoneyError::Negative);
        }
        let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
        let whole_units = parse_digits(whole)?;
        let fraction_units = if fraction.is_empty() {
            if value.ends_with('.') {
                return Err(MoneyError::Malformed);
            }
            0
        } else {
            if fraction.len() > DECIMALS {
                return Err(MoneyError::TooPrecise);
            }
            let padded = format!("{fraction:0<DECIMALS$}");
            parse_digits(&padded)?
        };
        whole_units
            .checked_mul(SCALE)
            .and_then(|units| units.checked_add(fraction_units))
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0.div_euclid(SCALE);
        let fraction = format!("{:0>DECIMALS$}", self.0.rem_euclid(SCALE));
        let trimmed = fraction.trim_end_matches('0');
        if trimmed.is_empty() {
            write!(f, "{whole}.0")
        } else {
            write!(f, "{whole}.{trimmed}")
        }
    }
}

impl TryFrom<String> for Money {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Money> for String {
    fn from(value: Money) -> Self {
        value.to_string()
    }
}
