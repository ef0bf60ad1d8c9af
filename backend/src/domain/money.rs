//! Monetary amounts held as whole cents.
//!
//! Fines never go negative, so the amount is an unsigned cent count. The wire
//! form is a decimal string with two fractional digits (`"6.00"`), which
//! keeps clients away from floating point.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors raised when parsing a decimal amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    /// The input was empty once trimmed.
    Empty,
    /// The input was not a plain non-negative decimal.
    Malformed,
    /// More than two fractional digits were supplied.
    TooPrecise,
    /// The amount does not fit in the cent counter.
    Overflow,
}

impl fmt::Display for MoneyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "amount must not be empty"),
            Self::Malformed => write!(f, "amount must be a non-negative decimal"),
            Self::TooPrecise => write!(f, "amount may have at most two decimal places"),
            Self::Overflow => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for MoneyParseError {}

/// Non-negative amount of money with two-decimal precision.
///
/// # Examples
/// ```
/// use library_backend::domain::Money;
///
/// let fine = Money::from_cents(600);
/// assert_eq!(fine.to_string(), "6.00");
/// assert_eq!("6".parse::<Money>().expect("valid amount"), fine);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Money(u64);

impl Money {
    /// No charge.
    pub const ZERO: Self = Self(0);

    /// Construct from a cent count.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Amount in cents.
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Multiply by a count, saturating at the largest representable amount.
    #[must_use]
    pub const fn saturating_times(self, count: u64) -> Self {
        Self(self.0.saturating_mul(count))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0.div_euclid(100), self.0.rem_euclid(100))
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(MoneyParseError::Empty);
        }
        let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MoneyParseError::Malformed);
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MoneyParseError::Malformed);
        }
        if fraction.len() > 2 {
            return Err(MoneyParseError::TooPrecise);
        }

        let whole: u64 = whole.parse().map_err(|_| MoneyParseError::Overflow)?;
        let mut fraction_cents: u64 = 0;
        for (position, digit) in fraction.bytes().enumerate() {
            let weight = if position == 0 { 10 } else { 1 };
            fraction_cents += u64::from(digit - b'0') * weight;
        }

        whole
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(fraction_cents))
            .map(Self)
            .ok_or(MoneyParseError::Overflow)
    }
}

impl From<Money> for String {
    fn from(value: Money) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Money {
    type Error = MoneyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0.00")]
    #[case(5, "0.05")]
    #[case(600, "6.00")]
    #[case(1_234, "12.34")]
    fn displays_two_decimals(#[case] cents: u64, #[case] expected: &str) {
        assert_eq!(Money::from_cents(cents).to_string(), expected);
    }

    #[rstest]
    #[case("6", 600)]
    #[case("6.5", 650)]
    #[case(" 12.34 ", 1_234)]
    #[case("0.05", 5)]
    fn parses_decimal_strings(#[case] raw: &str, #[case] cents: u64) {
        assert_eq!(raw.parse::<Money>(), Ok(Money::from_cents(cents)));
    }

    #[rstest]
    #[case("", MoneyParseError::Empty)]
    #[case("-1", MoneyParseError::Malformed)]
    #[case("1.2.3", MoneyParseError::Malformed)]
    #[case(".50", MoneyParseError::Malformed)]
    #[case("1.005", MoneyParseError::TooPrecise)]
    #[case("184467440737095516.16", MoneyParseError::Overflow)]
    fn rejects_bad_amounts(#[case] raw: &str, #[case] expected: MoneyParseError) {
        assert_eq!(raw.parse::<Money>(), Err(expected));
    }

    #[rstest]
    fn saturates_instead_of_wrapping() {
        assert_eq!(
            Money::from_cents(u64::MAX).saturating_times(2),
            Money::from_cents(u64::MAX)
        );
    }
}
