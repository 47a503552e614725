//! In-memory store
//!
//! Single-process implementation of the store contracts, used by the test
//! suite. One lock guards cards and ledger together, which makes
//! `commit_transfer` atomic by construction while still exercising the
//! same version-stamp discipline as the Postgres store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::card::{Card, Transaction};
use crate::domain::card_number::CardNumber;

use super::{BalanceWrite, CardStore, StoreError, TransactionStore};

#[derive(Debug, Default)]
struct Inner {
    cards: HashMap<CardNumber, Card>,
    // Appended in commit order, i.e. chronologically.
    ledger: Vec<Transaction>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a card directly, bypassing issuance. Test setup only.
    pub fn put_card(&self, card: Card) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.cards.insert(card.number.clone(), card);
    }

    fn apply_write(inner: &mut Inner, write: &BalanceWrite) -> Result<(), StoreError> {
        let card = inner
            .cards
            .get_mut(&write.number)
            .ok_or_else(|| StoreError::VersionConflict {
                number: write.number.clone(),
                expected: write.expected_version,
            })?;

        if card.version != write.expected_version {
            return Err(StoreError::VersionConflict {
                number: write.number.clone(),
                expected: write.expected_version,
            });
        }

        card.balance = write.new_balance;
        card.version += 1;
        Ok(())
    }
}

#[async_trait]
impl CardStore for InMemoryStore {
    async fn all(&self, owner: Uuid) -> Result<Vec<Card>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut cards: Vec<Card> = inner
            .cards
            .values()
            .filter(|card| card.owner == owner)
            .cloned()
            .collect();
        cards.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
        Ok(cards)
    }

    async fn get(&self, owner: Uuid, number: &CardNumber) -> Result<Option<Card>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .cards
            .get(number)
            .filter(|card| card.owner == owner)
            .cloned())
    }

    async fn find(&self, number: &CardNumber) -> Result<Option<Card>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner.cards.get(number).cloned())
    }

    async fn add(&self, card: &Card) -> Result<(), StoreError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if inner.cards.contains_key(&card.number) {
            return Err(StoreError::Duplicate(card.number.clone()));
        }
        inner.cards.insert(card.number.clone(), card.clone());
        Ok(())
    }

    async fn update_balance(&self, write: &BalanceWrite) -> Result<(), StoreError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        Self::apply_write(&mut inner, write)
    }

    async fn commit_transfer(
        &self,
        debit: &BalanceWrite,
        credit: &BalanceWrite,
        record: &Transaction,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().expect("store lock poisoned");

        // Version-check both sides before touching either, so a conflict
        // leaves the map untouched.
        for write in [debit, credit] {
            let current = inner
                .cards
                .get(&write.number)
                .map(|card| card.version)
                .ok_or_else(|| StoreError::VersionConflict {
                    number: write.number.clone(),
                    expected: write.expected_version,
                })?;
            if current != write.expected_version {
                return Err(StoreError::VersionConflict {
                    number: write.number.clone(),
                    expected: write.expected_version,
                });
            }
        }

        Self::apply_write(&mut inner, debit)?;
        Self::apply_write(&mut inner, credit)?;
        inner.ledger.push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn add(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.ledger.push(transaction.clone());
        Ok(())
    }

    async fn list(
        &self,
        owner: Uuid,
        number: &CardNumber,
        skip: usize,
        take: usize,
    ) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.read().expect("store lock poisoned");

        let owned = inner
            .cards
            .get(number)
            .map(|card| card.owner == owner)
            .unwrap_or(false);
        if !owned {
            return Ok(Vec::new());
        }

        // Ledger is chronological; walking it backwards yields newest first.
        Ok(inner
            .ledger
            .iter()
            .rev()
            .filter(|tx| tx.from == *number || tx.to == *number)
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }
}
