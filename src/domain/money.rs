//! Money types
//!
//! Domain primitives for monetary values in integer minor units (kopecks,
//! cents). Values are validated at construction time, so an invalid amount
//! or a negative balance cannot exist in the system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum value in minor units (one trillion major units at 100 minor each).
const MAX_MINOR_UNITS: i64 = 100_000_000_000_000;

/// Amount represents a validated transfer sum.
///
/// # Invariants
/// - Value is strictly positive
/// - Value never exceeds `MAX_MINOR_UNITS`
///
/// # Example
/// ```
/// use cardbank::domain::Amount;
///
/// let amount = Amount::new(150_00).unwrap();
/// assert_eq!(amount.minor_units(), 150_00);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

/// Errors that can occur when constructing money values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(i64),

    #[error("Balance cannot be negative (got {0})")]
    Negative(i64),

    #[error("Value exceeds maximum allowed ({MAX_MINOR_UNITS})")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `MoneyError::NotPositive` if value <= 0
    /// - `MoneyError::Overflow` if value exceeds the system maximum
    pub fn new(minor_units: i64) -> Result<Self, MoneyError> {
        // Rule 1: Must be strictly positive
        if minor_units <= 0 {
            return Err(MoneyError::NotPositive(minor_units));
        }

        // Rule 2: Bounded so balance arithmetic cannot overflow i64
        if minor_units > MAX_MINOR_UNITS {
            return Err(MoneyError::Overflow);
        }

        Ok(Self(minor_units))
    }

    /// Get the value in minor units.
    pub fn minor_units(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Amount {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .parse()
            .map_err(|e: std::num::ParseIntError| MoneyError::ParseError(e.to_string()))?;
        Amount::new(value)
    }
}

impl TryFrom<i64> for Amount {
    type Error = MoneyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Balance represents a card balance (zero or positive minor units).
/// Unlike Amount, Balance can be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Balance(i64);

impl Balance {
    /// Create a new balance (zero or positive)
    pub fn new(minor_units: i64) -> Result<Self, MoneyError> {
        if minor_units < 0 {
            return Err(MoneyError::Negative(minor_units));
        }

        if minor_units > MAX_MINOR_UNITS {
            return Err(MoneyError::Overflow);
        }

        Ok(Self(minor_units))
    }

    /// Create a zero balance
    pub fn zero() -> Self {
        Self(0)
    }

    /// Get the value in minor units
    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// Check if the balance covers a withdrawal of `amount`
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.minor_units()
    }

    /// Add an amount to the balance
    pub fn credit(&self, amount: &Amount) -> Result<Balance, MoneyError> {
        let new_value = self
            .0
            .checked_add(amount.minor_units())
            .ok_or(MoneyError::Overflow)?;
        Balance::new(new_value)
    }

    /// Subtract an amount from the balance.
    /// Fails with `MoneyError::Negative` when funds are insufficient.
    pub fn debit(&self, amount: &Amount) -> Result<Balance, MoneyError> {
        Balance::new(self.0 - amount.minor_units())
    }
}

impl TryFrom<i64> for Balance {
    type Error = MoneyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Balance::new(value)
    }
}

impl From<Balance> for i64 {
    fn from(balance: Balance) -> Self {
        balance.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}
