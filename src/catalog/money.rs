//! Fixed-point currency amounts.

use crate::error::{Error, Result};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// An amount in cents.
///
/// Parses from and displays as a two-decimal string:
///
/// ```
/// use occamdb::catalog::Money;
///
/// let m: Money = "44.44".parse()?;
/// assert_eq!(m.cents(), 4444);
/// assert_eq!(Money::from_units(119).to_string(), "119.00");
/// # Ok::<(), occamdb::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Zero
    pub const ZERO: Money = Money(0);

    /// Amount from cents
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Amount from whole units, saturating at the representable range
    pub const fn from_units(units: i64) -> Self {
        Money(units.saturating_mul(100))
    }

    /// Add, failing instead of saturating
    ///
    /// # Errors
    /// [`Error::InvalidInput`] if the sum does not fit.
    pub fn checked_add(self, rhs: Money) -> Result<Money> {
        self.0
            .checked_add(rhs.0)
            .map(Money)
            .ok_or_else(|| Error::InvalidInput(format!("amount overflow: {} + {}", self, rhs)))
    }

    /// Amount in cents
    pub const fn cents(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("invalid amount '{}'", s));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty()
            || frac.len() > 2
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(invalid)?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

/// Saturating addition; see [`Money::checked_add`] for the failing form.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}
