//! cardbank library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod bank;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod store;
pub mod validation;

pub use bank::BankService;
pub use config::Config;
pub use domain::{
    check_card_emitter, Amount, Balance, Card, CardKind, CardNumber, CardStatus, Currency,
    DomainError, MoneyError, Transaction, TransactionStatus, User, ValidationResult,
};
pub use error::{AppError, AppResult};
pub use store::{CardStore, InMemoryStore, PgStore, StoreError, TransactionStore};
