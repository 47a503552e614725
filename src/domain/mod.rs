//! Domain module
//!
//! Core domain types and business rules.

pub mod card;
pub mod card_number;
pub mod error;
pub mod money;
pub mod validation;

pub use card::{Card, CardKind, CardStatus, Currency, Transaction, TransactionStatus, User};
pub use card_number::{check_card_emitter, CardNumber, CardNumberError, Issuer};
pub use error::DomainError;
pub use money::{Amount, Balance, MoneyError};
pub use validation::ValidationResult;
