//! API Routes
//!
//! HTTP endpoint definitions. Thin layer: deserialize, run the DTO
//! validators, delegate to the bank service, map the outcome to a status
//! code.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bank::BankService;
use crate::domain::card::{
    Card, CardKind, CardStatus, Currency, Transaction, TransactionStatus, User,
};
use crate::domain::card_number::{check_card_emitter, CardNumber};
use crate::domain::money::Amount;
use crate::domain::validation::ValidationResult;
use crate::error::AppError;
use crate::validation::{validate_open_card_dto, validate_transfer_dto, OpenCardDto, TransferDto};

/// Transactions returned per page, matching the original listing endpoint.
const TRANSACTIONS_PAGE_SIZE: usize = 10;

pub type AppState = Arc<BankService>;

// =========================================================================
// Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CardResponse {
    pub number: String,
    pub name: String,
    pub currency: Currency,
    pub kind: CardKind,
    pub balance: i64,
    pub status: CardStatus,
    pub opened_at: DateTime<Utc>,
}

impl From<Card> for CardResponse {
    fn from(card: Card) -> Self {
        Self {
            number: card.number.to_string(),
            name: card.name,
            currency: card.currency,
            kind: card.kind,
            balance: card.balance.minor_units(),
            status: card.status,
            opened_at: card.opened_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub sum: i64,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            from: tx.from.to_string(),
            to: tx.to.to_string(),
            sum: tx.amount.minor_units(),
            currency: tx.currency,
            status: tx.status,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    #[serde(default)]
    pub skip: usize,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router. Nested under `/api` by the binary.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/cards", get(list_cards).post(open_card))
        .route("/cards/:number", get(get_card))
        .route("/transactions", post(transfer))
        .route("/transactions/:number", get(list_transactions))
}

/// Checker gate shared by the number-addressed endpoints.
fn parse_checked_number(raw: &str) -> Result<CardNumber, AppError> {
    if !check_card_emitter(raw) {
        return Err(AppError::Validation(ValidationResult::with_error(
            "number",
            "this card number is invalid",
        )));
    }
    raw.parse()
        .map_err(|_| AppError::InvalidRequest("malformed card number".to_string()))
}

// =========================================================================
// GET /cards
// =========================================================================

/// List the current user's cards
async fn list_cards(
    State(service): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<CardResponse>>, AppError> {
    let cards = service.cards(&user).await?;
    Ok(Json(cards.into_iter().map(CardResponse::from).collect()))
}

// =========================================================================
// GET /cards/:number
// =========================================================================

/// One of the current user's cards by number
async fn get_card(
    State(service): State<AppState>,
    Extension(user): Extension<User>,
    Path(number): Path<String>,
) -> Result<Json<CardResponse>, AppError> {
    let number = parse_checked_number(&number)?;

    let card = service
        .card(&user, &number)
        .await?
        .ok_or_else(|| AppError::CardNotFound(number.to_string()))?;

    Ok(Json(card.into()))
}

// =========================================================================
// POST /cards
// =========================================================================

/// Open a new card for the current user
async fn open_card(
    State(service): State<AppState>,
    Extension(user): Extension<User>,
    Json(dto): Json<OpenCardDto>,
) -> Result<(StatusCode, Json<CardResponse>), AppError> {
    let result = validate_open_card_dto(&dto);
    if result.has_errors() {
        return Err(AppError::Validation(result));
    }

    // Validated above; re-parse defensively rather than unwrap.
    let currency: Currency = dto
        .currency
        .parse()
        .map_err(|_| AppError::InvalidRequest("unrecognized currency".to_string()))?;
    let kind: CardKind = dto
        .kind
        .parse()
        .map_err(|_| AppError::InvalidRequest("unrecognized card kind".to_string()))?;

    let (card, result) = service
        .try_open_new_card(&user, &dto.name, currency, kind)
        .await?;

    match card {
        Some(card) => Ok((StatusCode::CREATED, Json(card.into()))),
        None => Err(AppError::from_validation(result)),
    }
}

// =========================================================================
// POST /transactions
// =========================================================================

/// Transfer money between cards
async fn transfer(
    State(service): State<AppState>,
    Extension(user): Extension<User>,
    Json(dto): Json<TransferDto>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let result = validate_transfer_dto(&dto);
    if result.has_errors() {
        return Err(AppError::Validation(result));
    }

    let sum = Amount::new(dto.sum)
        .map_err(|e| AppError::InvalidRequest(format!("Invalid sum: {e}")))?;

    let (transaction, result) = service
        .try_transfer_money(&user, sum, &dto.from, &dto.to)
        .await?;

    match transaction {
        Some(transaction) => Ok((StatusCode::CREATED, Json(transaction.into()))),
        None => Err(AppError::from_validation(result)),
    }
}

// =========================================================================
// GET /transactions/:number?skip=N
// =========================================================================

/// Page through transactions on one of the current user's cards,
/// newest first
async fn list_transactions(
    State(service): State<AppState>,
    Extension(user): Extension<User>,
    Path(number): Path<String>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let number = parse_checked_number(&number)?;

    let transactions = service
        .transactions(&user, &number, query.skip, TRANSACTIONS_PAGE_SIZE)
        .await?;

    Ok(Json(
        transactions
            .into_iter()
            .map(TransactionResponse::from)
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_card_dto_deserialize() {
        let json = r#"{"name": "Salary", "currency": "RUB", "kind": "debit"}"#;
        let dto: OpenCardDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.name, "Salary");
        assert_eq!(dto.currency, "RUB");
        assert_eq!(dto.kind, "debit");
    }

    #[test]
    fn test_transfer_dto_deserialize() {
        let json = r#"{
            "sum": 10000,
            "from": "4532015112830366",
            "to": "4242424242424242"
        }"#;
        let dto: TransferDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.sum, 10000);
        assert_eq!(dto.from, "4532015112830366");
    }

    #[test]
    fn test_transactions_query_defaults() {
        let query: TransactionsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.skip, 0);
    }

    #[test]
    fn test_parse_checked_number() {
        assert!(parse_checked_number("4532015112830366").is_ok());
        assert!(matches!(
            parse_checked_number("4532015112830367"),
            Err(AppError::Validation(_))
        ));
    }
}
