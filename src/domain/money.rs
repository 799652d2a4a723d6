//! Fixed-point currency.
//!
//! The ledger never touches floating point: all balances, prices, and
//! amounts are integer cents.

use std::fmt;

use crate::domain::error::PapertradeError;

/// An amount of money in integer cents. $50.00 is `Cents(5000)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub fn from_dollars(dollars: i64) -> Self {
        Cents(dollars * 100)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Cents) -> Option<Cents> {
        self.0.checked_add(other.0).map(Cents)
    }

    pub fn checked_sub(self, other: Cents) -> Option<Cents> {
        self.0.checked_sub(other.0).map(Cents)
    }

    /// Unit price times share count. `None` on overflow.
    pub fn checked_mul_shares(self, shares: u32) -> Option<Cents> {
        self.0.checked_mul(i64::from(shares)).map(Cents)
    }

    /// Parse a user-supplied dollar amount such as `50`, `50.25`, or
    /// `$1,234.56`. At most two decimal places; negatives are rejected
    /// (no form in the application accepts a negative amount).
    pub fn parse(input: &str) -> Result<Cents, PapertradeError> {
        let cleaned: String = input
            .trim()
            .trim_start_matches('$')
            .chars()
            .filter(|c| *c != ',')
            .collect();

        let invalid = || PapertradeError::validation(format!("invalid amount: {input}"));

        if cleaned.is_empty() || cleaned.starts_with('-') {
            return Err(invalid());
        }

        let (units_str, frac_str) = match cleaned.split_once('.') {
            Some((u, f)) => (u, f),
            None => (cleaned.as_str(), ""),
        };

        let units: i64 = if units_str.is_empty() {
            0
        } else {
            units_str.parse().map_err(|_| invalid())?
        };

        let frac: i64 = match frac_str.len() {
            0 => 0,
            1 => frac_str.parse::<i64>().map_err(|_| invalid())? * 10,
            2 => frac_str.parse().map_err(|_| invalid())?,
            _ => return Err(invalid()),
        };

        units
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .map(Cents)
            .ok_or_else(invalid)
    }
}

/// Renders as USD with thousands separators: `$1,234.56`, `-$0.01`.
impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let frac = abs % 100;

        let digits = units.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }

        write!(f, "{sign}${grouped}.{frac:02}")
    }
}
