//! Postgres store
//!
//! sqlx-backed implementation of the store contracts. Balance writes carry
//! a `WHERE version = $n` guard; `commit_transfer` wraps both guarded
//! updates and the ledger insert in one sql transaction, updating cards in
//! card-number order so concurrent transfers acquire row locks
//! deterministically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::card::{Card, CardKind, CardStatus, Currency, Transaction, TransactionStatus};
use crate::domain::card_number::CardNumber;
use crate::domain::money::{Amount, Balance};

use super::{BalanceWrite, CardStore, StoreError, TransactionStore};

/// Postgres unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

type CardRow = (
    String,            // number
    Uuid,              // owner
    String,            // name
    String,            // currency
    String,            // kind
    i64,               // balance
    String,            // status
    i64,               // version
    DateTime<Utc>,     // opened_at
);

type TransactionRow = (
    Uuid,              // id
    String,            // from_number
    String,            // to_number
    i64,               // amount
    String,            // currency
    String,            // status
    DateTime<Utc>,     // created_at
);

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn card_from_row(row: CardRow) -> Result<Card, StoreError> {
        let (number, owner, name, currency, kind, balance, status, version, opened_at) = row;
        Ok(Card {
            number: number
                .parse::<CardNumber>()
                .map_err(|e| StoreError::Corrupt(format!("card number: {e}")))?,
            owner,
            name,
            currency: currency
                .parse::<Currency>()
                .map_err(|_| StoreError::Corrupt(format!("currency: {currency}")))?,
            kind: kind
                .parse::<CardKind>()
                .map_err(|_| StoreError::Corrupt(format!("card kind: {kind}")))?,
            balance: Balance::new(balance)
                .map_err(|e| StoreError::Corrupt(format!("balance: {e}")))?,
            status: match status.as_str() {
                "active" => CardStatus::Active,
                "blocked" => CardStatus::Blocked,
                other => return Err(StoreError::Corrupt(format!("card status: {other}"))),
            },
            version,
            opened_at,
        })
    }

    fn transaction_from_row(row: TransactionRow) -> Result<Transaction, StoreError> {
        let (id, from, to, amount, currency, status, created_at) = row;
        Ok(Transaction {
            id,
            from: from
                .parse::<CardNumber>()
                .map_err(|e| StoreError::Corrupt(format!("card number: {e}")))?,
            to: to
                .parse::<CardNumber>()
                .map_err(|e| StoreError::Corrupt(format!("card number: {e}")))?,
            amount: Amount::new(amount)
                .map_err(|e| StoreError::Corrupt(format!("amount: {e}")))?,
            currency: currency
                .parse::<Currency>()
                .map_err(|_| StoreError::Corrupt(format!("currency: {currency}")))?,
            status: match status.as_str() {
                "completed" => TransactionStatus::Completed,
                "failed" => TransactionStatus::Failed,
                other => return Err(StoreError::Corrupt(format!("transaction status: {other}"))),
            },
            created_at,
        })
    }

    fn status_str(status: CardStatus) -> &'static str {
        match status {
            CardStatus::Active => "active",
            CardStatus::Blocked => "blocked",
        }
    }

    fn tx_status_str(status: TransactionStatus) -> &'static str {
        match status {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }

    async fn insert_transaction<'e, E>(record: &Transaction, executor: E) -> Result<(), StoreError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, from_number, to_number, amount, currency, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.from.as_str())
        .bind(record.to.as_str())
        .bind(record.amount.minor_units())
        .bind(record.currency.code())
        .bind(Self::tx_status_str(record.status))
        .bind(record.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CardStore for PgStore {
    async fn all(&self, owner: Uuid) -> Result<Vec<Card>, StoreError> {
        let rows: Vec<CardRow> = sqlx::query_as(
            r#"
            SELECT number, owner, name, currency, kind, balance, status, version, opened_at
            FROM cards
            WHERE owner = $1
            ORDER BY opened_at
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::card_from_row).collect()
    }

    async fn get(&self, owner: Uuid, number: &CardNumber) -> Result<Option<Card>, StoreError> {
        let row: Option<CardRow> = sqlx::query_as(
            r#"
            SELECT number, owner, name, currency, kind, balance, status, version, opened_at
            FROM cards
            WHERE owner = $1 AND number = $2
            "#,
        )
        .bind(owner)
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::card_from_row).transpose()
    }

    async fn find(&self, number: &CardNumber) -> Result<Option<Card>, StoreError> {
        let row: Option<CardRow> = sqlx::query_as(
            r#"
            SELECT number, owner, name, currency, kind, balance, status, version, opened_at
            FROM cards
            WHERE number = $1
            "#,
        )
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::card_from_row).transpose()
    }

    async fn add(&self, card: &Card) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO cards (number, owner, name, currency, kind, balance, status, version, opened_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(card.number.as_str())
        .bind(card.owner)
        .bind(&card.name)
        .bind(card.currency.code())
        .bind(card.kind.name())
        .bind(card.balance.minor_units())
        .bind(Self::status_str(card.status))
        .bind(card.version)
        .bind(card.opened_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(StoreError::Duplicate(card.number.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_balance(&self, write: &BalanceWrite) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE cards
            SET balance = $1, version = version + 1
            WHERE number = $2 AND version = $3
            "#,
        )
        .bind(write.new_balance.minor_units())
        .bind(write.number.as_str())
        .bind(write.expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::VersionConflict {
                number: write.number.clone(),
                expected: write.expected_version,
            });
        }
        Ok(())
    }

    async fn commit_transfer(
        &self,
        debit: &BalanceWrite,
        credit: &BalanceWrite,
        record: &Transaction,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Fixed lock order across concurrent transfers between the same
        // pair of cards.
        let mut writes = [debit, credit];
        writes.sort_by(|a, b| a.number.cmp(&b.number));

        for write in writes {
            let result = sqlx::query(
                r#"
                UPDATE cards
                SET balance = $1, version = version + 1
                WHERE number = $2 AND version = $3
                "#,
            )
            .bind(write.new_balance.minor_units())
            .bind(write.number.as_str())
            .bind(write.expected_version)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(StoreError::VersionConflict {
                    number: write.number.clone(),
                    expected: write.expected_version,
                });
            }
        }

        Self::insert_transaction(record, &mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for PgStore {
    async fn add(&self, transaction: &Transaction) -> Result<(), StoreError> {
        Self::insert_transaction(transaction, &self.pool).await
    }

    async fn list(
        &self,
        owner: Uuid,
        number: &CardNumber,
        skip: usize,
        take: usize,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.from_number, t.to_number, t.amount, t.currency, t.status, t.created_at
            FROM transactions t
            JOIN cards c ON c.number = $2 AND c.owner = $1
            WHERE t.from_number = $2 OR t.to_number = $2
            ORDER BY t.created_at DESC, t.id
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(owner)
        .bind(number.as_str())
        .bind(skip as i64)
        .bind(take as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::transaction_from_row).collect()
    }
}
