//! Persistence boundary
//!
//! Narrow repository contracts the bank service consumes. Balance writes
//! are guarded by per-card version stamps; `commit_transfer` is the single
//! atomic unit covering both balance updates and the ledger insert.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::card::{Card, Transaction};
use crate::domain::card_number::CardNumber;
use crate::domain::money::Balance;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Errors crossing the persistence boundary.
///
/// `VersionConflict` is the only variant the core reacts to; everything
/// else propagates to the HTTP layer as an internal failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Optimistic version check failed on a balance write.
    #[error("version conflict on card {number}: expected {expected}")]
    VersionConflict { number: CardNumber, expected: i64 },

    /// A card with this number already exists.
    #[error("card {0} already exists")]
    Duplicate(CardNumber),

    /// A stored row failed to decode into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Database fault. Not recoverable by the core.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

/// A version-guarded balance write, one side of a transfer.
#[derive(Debug, Clone)]
pub struct BalanceWrite {
    pub number: CardNumber,
    pub new_balance: Balance,
    pub expected_version: i64,
}

/// Card persistence contract.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// All cards owned by `owner`.
    async fn all(&self, owner: Uuid) -> Result<Vec<Card>, StoreError>;

    /// A card by number, restricted to `owner`.
    async fn get(&self, owner: Uuid, number: &CardNumber) -> Result<Option<Card>, StoreError>;

    /// A card by number regardless of owner (transfer targets).
    async fn find(&self, number: &CardNumber) -> Result<Option<Card>, StoreError>;

    /// Persist a freshly opened card. `Duplicate` when the number is taken.
    async fn add(&self, card: &Card) -> Result<(), StoreError>;

    /// Write a new balance iff the card's version still matches.
    async fn update_balance(&self, write: &BalanceWrite) -> Result<(), StoreError>;

    /// Atomically apply both sides of a transfer and append its ledger
    /// record. Either all three writes commit or none do; a failed version
    /// check on either card aborts the whole unit with `VersionConflict`.
    async fn commit_transfer(
        &self,
        debit: &BalanceWrite,
        credit: &BalanceWrite,
        record: &Transaction,
    ) -> Result<(), StoreError>;
}

/// Transaction ledger contract. Append-only.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Append a ledger record outside of a transfer commit.
    async fn add(&self, transaction: &Transaction) -> Result<(), StoreError>;

    /// Transactions touching `number`, newest first, for a card owned by
    /// `owner`. `skip`/`take` paginate the ordered sequence.
    async fn list(
        &self,
        owner: Uuid,
        number: &CardNumber,
        skip: usize,
        take: usize,
    ) -> Result<Vec<Transaction>, StoreError>;
}
