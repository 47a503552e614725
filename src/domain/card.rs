//! Card, transaction and user entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::card_number::CardNumber;
use super::money::{Amount, Balance};

/// Currencies the bank issues cards in. No conversion between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Rub,
    Usd,
    Eur,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Rub => "RUB",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RUB" => Ok(Currency::Rub),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            _ => Err(UnknownVariant),
        }
    }
}

/// The product kind of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Debit,
    Credit,
}

impl CardKind {
    pub fn name(&self) -> &'static str {
        match self {
            CardKind::Debit => "debit",
            CardKind::Credit => "credit",
        }
    }
}

impl FromStr for CardKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debit" => Ok(CardKind::Debit),
            "credit" => Ok(CardKind::Credit),
            _ => Err(UnknownVariant),
        }
    }
}

/// Marker error for enum parsing; validation turns it into a field message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized value")]
pub struct UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Blocked,
}

impl Default for CardStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// The caller's resolved identity, threaded explicitly through every core
/// call. Resolution itself belongs to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
}

impl User {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A payment card.
///
/// # Invariants
/// - `number` passes the card-emitter check (held by `CardNumber`)
/// - `balance >= 0` at all observable times (held by `Balance`)
/// - `version` counts committed balance writes, for optimistic concurrency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub number: CardNumber,
    pub owner: Uuid,
    pub name: String,
    pub currency: Currency,
    pub kind: CardKind,
    pub balance: Balance,
    pub status: CardStatus,
    pub version: i64,
    pub opened_at: DateTime<Utc>,
}

impl Card {
    /// Open a fresh card: zero balance, active, version 0.
    pub fn open(
        number: CardNumber,
        owner: Uuid,
        name: String,
        currency: Currency,
        kind: CardKind,
    ) -> Self {
        Self {
            number,
            owner,
            name,
            currency,
            kind,
            balance: Balance::zero(),
            status: CardStatus::Active,
            version: 0,
            opened_at: Utc::now(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.status == CardStatus::Blocked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Failed,
}

/// An append-only ledger entry recording a completed transfer.
/// Never mutated or deleted once persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub from: CardNumber,
    pub to: CardNumber,
    pub amount: Amount,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn completed(
        from: CardNumber,
        to: CardNumber,
        amount: Amount,
        currency: Currency,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from,
            to,
            amount,
            currency,
            status: TransactionStatus::Completed,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_parse() {
        assert_eq!("RUB".parse::<Currency>(), Ok(Currency::Rub));
        assert_eq!("usd".parse::<Currency>(), Ok(Currency::Usd));
        assert_eq!("GBP".parse::<Currency>(), Err(UnknownVariant));
    }

    #[test]
    fn test_card_kind_parse() {
        assert_eq!("debit".parse::<CardKind>(), Ok(CardKind::Debit));
        assert_eq!("Credit".parse::<CardKind>(), Ok(CardKind::Credit));
        assert_eq!("prepaid".parse::<CardKind>(), Err(UnknownVariant));
    }

    #[test]
    fn test_open_card_defaults() {
        let number: CardNumber = "4532015112830366".parse().unwrap();
        let owner = Uuid::new_v4();
        let card = Card::open(
            number.clone(),
            owner,
            "Salary".to_string(),
            Currency::Rub,
            CardKind::Debit,
        );

        assert_eq!(card.number, number);
        assert_eq!(card.owner, owner);
        assert_eq!(card.balance, Balance::zero());
        assert_eq!(card.status, CardStatus::Active);
        assert_eq!(card.version, 0);
        assert!(!card.is_blocked());
    }
}
