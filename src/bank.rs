//! Bank service
//!
//! Orchestrates card issuance and money transfers over the store
//! contracts. Business-rule failures come back through a
//! [`ValidationResult`] next to an absent entity; store faults propagate
//! as errors. The service never retries a conflicted transfer itself, the
//! caller decides.

use std::sync::Arc;

use crate::domain::card::{Card, CardKind, Currency, Transaction, User};
use crate::domain::card_number::{check_card_emitter, CardNumber, Issuer};
use crate::domain::error::DomainError;
use crate::domain::money::{Amount, MoneyError};
use crate::domain::validation::ValidationResult;
use crate::error::{AppError, AppResult};
use crate::store::{BalanceWrite, CardStore, StoreError, TransactionStore};

/// Bounded regeneration attempts when a generated number collides.
const MAX_GENERATION_ATTEMPTS: u32 = 8;

/// Issuing network per product kind.
fn issuer_for(kind: CardKind) -> Issuer {
    match kind {
        CardKind::Debit => Issuer::Visa,
        CardKind::Credit => Issuer::Mastercard,
    }
}

pub struct BankService {
    cards: Arc<dyn CardStore>,
    transactions: Arc<dyn TransactionStore>,
}

impl BankService {
    pub fn new(cards: Arc<dyn CardStore>, transactions: Arc<dyn TransactionStore>) -> Self {
        Self {
            cards,
            transactions,
        }
    }

    /// Issue a new card for `user`: a fresh checker-valid number, zero
    /// balance, active status. Number collisions are regenerated a bounded
    /// number of times; exhaustion reports `"card": "issuance failed"`.
    /// Either the card is fully persisted and returned, or nothing is.
    pub async fn try_open_new_card(
        &self,
        user: &User,
        name: &str,
        currency: Currency,
        kind: CardKind,
    ) -> AppResult<(Option<Card>, ValidationResult)> {
        for attempt in 0..MAX_GENERATION_ATTEMPTS {
            let number = CardNumber::generate(issuer_for(kind), &mut rand::thread_rng());
            debug_assert!(check_card_emitter(number.as_str()));

            let card = Card::open(
                number,
                user.id,
                name.trim().to_string(),
                currency,
                kind,
            );

            match self.cards.add(&card).await {
                Ok(()) => {
                    tracing::info!(
                        owner = %user.id,
                        number = %card.number,
                        currency = %currency,
                        "card issued"
                    );
                    return Ok((Some(card), ValidationResult::new()));
                }
                Err(StoreError::Duplicate(number)) => {
                    tracing::debug!(
                        %number,
                        attempt,
                        "generated card number collided, regenerating"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(owner = %user.id, "card issuance exhausted generation attempts");
        Ok((None, DomainError::IssuanceFailed.into()))
    }

    /// Transfer `sum` from the user's own card to any existing card.
    ///
    /// Rule checks short-circuit at the first failure, each depending on
    /// the previous one resolving: source lookup (owned), target lookup,
    /// same-card, blocked status, currency match, funds. No balance moves
    /// on any failure. A version conflict during the commit is reported as
    /// the distinguished retryable entry without mutating anything.
    pub async fn try_transfer_money(
        &self,
        user: &User,
        sum: Amount,
        from: &str,
        to: &str,
    ) -> AppResult<(Option<Transaction>, ValidationResult)> {
        let Ok(from_number) = from.parse::<CardNumber>() else {
            return Ok((None, DomainError::FromCardNotFound.into()));
        };
        let Ok(to_number) = to.parse::<CardNumber>() else {
            return Ok((None, DomainError::ToCardNotFound.into()));
        };

        let Some(from_card) = self.cards.get(user.id, &from_number).await? else {
            return Ok((None, DomainError::FromCardNotFound.into()));
        };
        let Some(to_card) = self.cards.find(&to_number).await? else {
            return Ok((None, DomainError::ToCardNotFound.into()));
        };

        if let Err(violation) = check_transfer_rules(&from_card, &to_card, &sum) {
            return Ok((None, violation.into()));
        }

        let debited = match from_card.balance.debit(&sum) {
            Ok(balance) => balance,
            Err(_) => return Ok((None, DomainError::InsufficientFunds.into())),
        };
        let credited = match to_card.balance.credit(&sum) {
            Ok(balance) => balance,
            Err(MoneyError::Overflow) => {
                return Ok((None, DomainError::BalanceOverflow.into()))
            }
            Err(e) => return Err(AppError::Internal(e.to_string())),
        };

        let record = Transaction::completed(
            from_number.clone(),
            to_number.clone(),
            sum,
            from_card.currency,
        );

        let debit = BalanceWrite {
            number: from_number.clone(),
            new_balance: debited,
            expected_version: from_card.version,
        };
        let credit = BalanceWrite {
            number: to_number.clone(),
            new_balance: credited,
            expected_version: to_card.version,
        };

        match self.cards.commit_transfer(&debit, &credit, &record).await {
            Ok(()) => {
                tracing::info!(
                    transaction = %record.id,
                    from = %from_number,
                    to = %to_number,
                    sum = sum.minor_units(),
                    "transfer completed"
                );
                Ok((Some(record), ValidationResult::new()))
            }
            Err(StoreError::VersionConflict { number, .. }) => {
                tracing::warn!(%number, "transfer hit a concurrent modification");
                Ok((None, ValidationResult::conflict()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Transactions touching one of the user's cards, newest first.
    pub async fn transactions(
        &self,
        user: &User,
        number: &CardNumber,
        skip: usize,
        take: usize,
    ) -> AppResult<Vec<Transaction>> {
        Ok(self.transactions.list(user.id, number, skip, take).await?)
    }

    /// All cards owned by the user.
    pub async fn cards(&self, user: &User) -> AppResult<Vec<Card>> {
        Ok(self.cards.all(user.id).await?)
    }

    /// One of the user's cards by number.
    pub async fn card(&self, user: &User, number: &CardNumber) -> AppResult<Option<Card>> {
        Ok(self.cards.get(user.id, number).await?)
    }
}

/// Pre-commit rule checks, in dependency order.
fn check_transfer_rules(from: &Card, to: &Card, sum: &Amount) -> Result<(), DomainError> {
    if from.number == to.number {
        return Err(DomainError::SameCardTransfer);
    }
    if from.is_blocked() {
        return Err(DomainError::FromCardBlocked);
    }
    if to.is_blocked() {
        return Err(DomainError::ToCardBlocked);
    }
    if from.currency != to.currency {
        return Err(DomainError::CurrencyMismatch);
    }
    if !from.balance.is_sufficient_for(sum) {
        return Err(DomainError::InsufficientFunds);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::CardStatus;
    use crate::domain::money::Balance;
    use crate::store::InMemoryStore;
    use uuid::Uuid;

    fn service() -> (Arc<InMemoryStore>, BankService) {
        let store = Arc::new(InMemoryStore::new());
        let service = BankService::new(store.clone(), store.clone());
        (store, service)
    }

    fn alice() -> User {
        User::new(Uuid::new_v4(), "Alice")
    }

    fn seeded_card(store: &InMemoryStore, owner: &User, number: &str, balance: i64) -> CardNumber {
        let number: CardNumber = number.parse().unwrap();
        let mut card = Card::open(
            number.clone(),
            owner.id,
            "Seeded".to_string(),
            Currency::Rub,
            CardKind::Debit,
        );
        card.balance = Balance::new(balance).unwrap();
        store.put_card(card);
        number
    }

    #[tokio::test]
    async fn test_open_new_card() {
        let (_, service) = service();
        let user = alice();

        let (card, result) = service
            .try_open_new_card(&user, "Alice", Currency::Rub, CardKind::Debit)
            .await
            .unwrap();

        assert!(!result.has_errors());
        let card = card.unwrap();
        assert!(check_card_emitter(card.number.as_str()));
        assert_eq!(card.balance, Balance::zero());
        assert_eq!(card.status, CardStatus::Active);
        assert_eq!(card.owner, user.id);
        assert_eq!(card.number.issuer(), Issuer::Visa);
    }

    #[tokio::test]
    async fn test_open_credit_card_uses_mastercard() {
        let (_, service) = service();
        let user = alice();

        let (card, _) = service
            .try_open_new_card(&user, "Credit", Currency::Usd, CardKind::Credit)
            .await
            .unwrap();

        assert_eq!(card.unwrap().number.issuer(), Issuer::Mastercard);
    }

    #[tokio::test]
    async fn test_issued_cards_are_listed() {
        let (_, service) = service();
        let user = alice();

        for name in ["One", "Two", "Three"] {
            let (card, _) = service
                .try_open_new_card(&user, name, Currency::Rub, CardKind::Debit)
                .await
                .unwrap();
            assert!(card.is_some());
        }

        let cards = service.cards(&user).await.unwrap();
        assert_eq!(cards.len(), 3);

        let stranger = alice();
        assert!(service.cards(&stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_moves_money_and_records() {
        let (store, service) = service();
        let user = alice();
        let from = seeded_card(&store, &user, "4532015112830366", 500_00);
        let to = seeded_card(&store, &user, "4242424242424242", 0);

        let (record, result) = service
            .try_transfer_money(&user, Amount::new(100_00).unwrap(), from.as_str(), to.as_str())
            .await
            .unwrap();

        assert!(!result.has_errors());
        let record = record.unwrap();
        assert_eq!(record.amount.minor_units(), 100_00);
        assert_eq!(record.status, crate::domain::card::TransactionStatus::Completed);

        let from_card = service.card(&user, &from).await.unwrap().unwrap();
        let to_card = service.card(&user, &to).await.unwrap().unwrap();
        assert_eq!(from_card.balance.minor_units(), 400_00);
        assert_eq!(to_card.balance.minor_units(), 100_00);

        // Conservation
        assert_eq!(
            from_card.balance.minor_units() + to_card.balance.minor_units(),
            500_00
        );
    }

    #[tokio::test]
    async fn test_insufficient_funds_is_idempotent() {
        let (store, service) = service();
        let user = alice();
        let from = seeded_card(&store, &user, "4532015112830366", 500_00);
        let to = seeded_card(&store, &user, "4242424242424242", 0);

        for _ in 0..3 {
            let (record, result) = service
                .try_transfer_money(
                    &user,
                    Amount::new(1000_00).unwrap(),
                    from.as_str(),
                    to.as_str(),
                )
                .await
                .unwrap();

            assert!(record.is_none());
            assert_eq!(
                result.messages_for("sum"),
                Some(&["insufficient funds".to_string()][..])
            );
        }

        // Both balances untouched, no ledger entries
        assert_eq!(
            service.card(&user, &from).await.unwrap().unwrap().balance.minor_units(),
            500_00
        );
        assert_eq!(
            service.card(&user, &to).await.unwrap().unwrap().balance.minor_units(),
            0
        );
        assert!(service.transactions(&user, &from, 0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_currency_mismatch_rejected() {
        let (store, service) = service();
        let user = alice();
        let from = seeded_card(&store, &user, "4532015112830366", 500_00);

        let to_number: CardNumber = "4242424242424242".parse().unwrap();
        let mut usd_card = Card::open(
            to_number.clone(),
            user.id,
            "Dollar".to_string(),
            Currency::Usd,
            CardKind::Debit,
        );
        usd_card.balance = Balance::new(100).unwrap();
        store.put_card(usd_card);

        let (record, result) = service
            .try_transfer_money(&user, Amount::new(1).unwrap(), from.as_str(), to_number.as_str())
            .await
            .unwrap();

        assert!(record.is_none());
        assert_eq!(
            result.messages_for("currency"),
            Some(&["mismatch".to_string()][..])
        );
        assert_eq!(
            service.card(&user, &from).await.unwrap().unwrap().balance.minor_units(),
            500_00
        );
    }

    #[tokio::test]
    async fn test_card_not_found_errors() {
        let (store, service) = service();
        let user = alice();
        let from = seeded_card(&store, &user, "4532015112830366", 500_00);

        // Unknown target
        let (record, result) = service
            .try_transfer_money(
                &user,
                Amount::new(100).unwrap(),
                from.as_str(),
                "4242424242424242",
            )
            .await
            .unwrap();
        assert!(record.is_none());
        assert_eq!(
            result.messages_for("to"),
            Some(&["card not found".to_string()][..])
        );

        // Source not owned by the caller
        let stranger = alice();
        let (record, result) = service
            .try_transfer_money(
                &stranger,
                Amount::new(100).unwrap(),
                from.as_str(),
                "4242424242424242",
            )
            .await
            .unwrap();
        assert!(record.is_none());
        assert_eq!(
            result.messages_for("from"),
            Some(&["card not found".to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_same_card_rejected() {
        let (store, service) = service();
        let user = alice();
        let from = seeded_card(&store, &user, "4532015112830366", 500_00);

        let (record, result) = service
            .try_transfer_money(&user, Amount::new(100).unwrap(), from.as_str(), from.as_str())
            .await
            .unwrap();

        assert!(record.is_none());
        assert_eq!(
            result.messages_for("to"),
            Some(&["cannot transfer to the same card".to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_blocked_card_cannot_send_or_receive() {
        let (store, service) = service();
        let user = alice();
        let from = seeded_card(&store, &user, "4532015112830366", 500_00);

        let to_number: CardNumber = "4242424242424242".parse().unwrap();
        let mut blocked = Card::open(
            to_number.clone(),
            user.id,
            "Blocked".to_string(),
            Currency::Rub,
            CardKind::Debit,
        );
        blocked.status = CardStatus::Blocked;
        store.put_card(blocked);

        let (record, result) = service
            .try_transfer_money(&user, Amount::new(100).unwrap(), from.as_str(), to_number.as_str())
            .await
            .unwrap();
        assert!(record.is_none());
        assert_eq!(
            result.messages_for("to"),
            Some(&["card is blocked".to_string()][..])
        );

        let (record, result) = service
            .try_transfer_money(&user, Amount::new(100).unwrap(), to_number.as_str(), from.as_str())
            .await
            .unwrap();
        assert!(record.is_none());
        assert_eq!(
            result.messages_for("from"),
            Some(&["card is blocked".to_string()][..])
        );
    }

    #[tokio::test]
    async fn test_concurrent_transfers_drain_exactly() {
        const TASKS: usize = 10;
        const EACH: i64 = 50_00;

        let (store, service) = service();
        let service = Arc::new(service);
        let user = alice();
        let from = seeded_card(&store, &user, "4532015112830366", TASKS as i64 * EACH);
        let to = seeded_card(&store, &user, "4242424242424242", 0);

        let mut handles = Vec::new();
        for _ in 0..TASKS {
            let service = service.clone();
            let user = user.clone();
            let from = from.clone();
            let to = to.clone();
            handles.push(tokio::spawn(async move {
                // Retry on conflict, as a real caller would; the service
                // itself never retries.
                loop {
                    let (record, result) = service
                        .try_transfer_money(
                            &user,
                            Amount::new(EACH).unwrap(),
                            from.as_str(),
                            to.as_str(),
                        )
                        .await
                        .unwrap();
                    if record.is_some() {
                        return;
                    }
                    assert!(result.is_conflict(), "unexpected failure: {result:?}");
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let from_card = service.card(&user, &from).await.unwrap().unwrap();
        let to_card = service.card(&user, &to).await.unwrap().unwrap();
        assert_eq!(from_card.balance.minor_units(), 0);
        assert_eq!(to_card.balance.minor_units(), TASKS as i64 * EACH);

        // No lost update: every transfer left exactly one ledger record
        let records = service.transactions(&user, &from, 0, 100).await.unwrap();
        assert_eq!(records.len(), TASKS);
        let total: i64 = records.iter().map(|r| r.amount.minor_units()).sum();
        assert_eq!(total, TASKS as i64 * EACH);
    }

    #[tokio::test]
    async fn test_transaction_listing_pagination() {
        let (store, service) = service();
        let user = alice();
        let from = seeded_card(&store, &user, "4532015112830366", 1000_00);
        let to = seeded_card(&store, &user, "4242424242424242", 0);

        for sum in 1..=15 {
            let (record, _) = service
                .try_transfer_money(&user, Amount::new(sum).unwrap(), from.as_str(), to.as_str())
                .await
                .unwrap();
            assert!(record.is_some());
        }

        // Newest first: ranks 2 through 11 of 15
        let page = service.transactions(&user, &from, 1, 10).await.unwrap();
        assert_eq!(page.len(), 10);
        let sums: Vec<i64> = page.iter().map(|r| r.amount.minor_units()).collect();
        assert_eq!(sums, (5..=14).rev().collect::<Vec<i64>>());
    }
}
