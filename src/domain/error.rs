//! Domain error types
//!
//! Business-rule violations raised by the bank service. Each variant knows
//! the request field it is reported under, so converting into a
//! [`ValidationResult`] is mechanical. Infrastructure faults are not part
//! of this taxonomy; they propagate as store errors.

use thiserror::Error;

use super::validation::ValidationResult;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DomainError {
    #[error("card not found")]
    FromCardNotFound,

    #[error("card not found")]
    ToCardNotFound,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("mismatch")]
    CurrencyMismatch,

    #[error("cannot transfer to the same card")]
    SameCardTransfer,

    #[error("card is blocked")]
    FromCardBlocked,

    #[error("card is blocked")]
    ToCardBlocked,

    #[error("amount exceeds balance limit")]
    BalanceOverflow,

    #[error("issuance failed")]
    IssuanceFailed,
}

impl DomainError {
    /// The request field this violation is keyed by.
    pub fn field(&self) -> &'static str {
        match self {
            DomainError::FromCardNotFound | DomainError::FromCardBlocked => "from",
            DomainError::ToCardNotFound
            | DomainError::ToCardBlocked
            | DomainError::SameCardTransfer => "to",
            DomainError::InsufficientFunds | DomainError::BalanceOverflow => "sum",
            DomainError::CurrencyMismatch => "currency",
            DomainError::IssuanceFailed => "card",
        }
    }
}

impl From<DomainError> for ValidationResult {
    fn from(error: DomainError) -> Self {
        ValidationResult::with_error(error.field(), error.to_string())
    }
}
