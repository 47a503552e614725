//! DTO validation service
//!
//! Field and cross-field validators for the open-card and transfer request
//! bodies. Every failing rule appends one message keyed by its field name;
//! rules accumulate instead of short-circuiting, so a caller sees all of
//! their input problems at once. Pure functions, no I/O.

use serde::Deserialize;

use crate::domain::card::{CardKind, Currency};
use crate::domain::card_number::check_card_emitter;
use crate::domain::validation::ValidationResult;

/// Longest accepted card display name.
pub const MAX_CARD_NAME_LEN: usize = 64;

/// Request body for opening a new card.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenCardDto {
    pub name: String,
    pub currency: String,
    pub kind: String,
}

/// Request body for a money transfer. `sum` is in minor units.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferDto {
    pub sum: i64,
    pub from: String,
    pub to: String,
}

/// Validate an open-card request.
///
/// Checks: name non-empty and bounded, currency recognized, kind recognized.
pub fn validate_open_card_dto(dto: &OpenCardDto) -> ValidationResult {
    let mut result = ValidationResult::new();

    let name = dto.name.trim();
    if name.is_empty() {
        result.add("name", "must not be empty");
    } else if name.len() > MAX_CARD_NAME_LEN {
        result.add(
            "name",
            format!("must be at most {MAX_CARD_NAME_LEN} characters"),
        );
    }

    if dto.currency.parse::<Currency>().is_err() {
        result.add("currency", "unrecognized currency");
    }

    if dto.kind.parse::<CardKind>().is_err() {
        result.add("kind", "unrecognized card kind");
    }

    result
}

/// Validate a transfer request.
///
/// Checks: sum strictly positive, both card numbers present and
/// checker-valid, source and target differ.
pub fn validate_transfer_dto(dto: &TransferDto) -> ValidationResult {
    let mut result = ValidationResult::new();

    if dto.sum <= 0 {
        result.add("sum", "must be positive");
    }

    check_number_field(&mut result, "from", &dto.from);
    check_number_field(&mut result, "to", &dto.to);

    if !dto.from.is_empty() && dto.from == dto.to {
        result.add("to", "cannot transfer to the same card");
    }

    result
}

fn check_number_field(result: &mut ValidationResult, field: &'static str, value: &str) {
    if value.is_empty() {
        result.add(field, "must not be empty");
    } else if !check_card_emitter(value) {
        result.add(field, "this card number is invalid");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_NUMBER: &str = "4532015112830366";
    const OTHER_NUMBER: &str = "4242424242424242";

    fn open_card(name: &str, currency: &str, kind: &str) -> OpenCardDto {
        OpenCardDto {
            name: name.to_string(),
            currency: currency.to_string(),
            kind: kind.to_string(),
        }
    }

    #[test]
    fn test_open_card_ok() {
        let result = validate_open_card_dto(&open_card("Salary", "RUB", "debit"));
        assert!(!result.has_errors());
    }

    #[test]
    fn test_open_card_failures_accumulate() {
        let result = validate_open_card_dto(&open_card("", "GBP", "prepaid"));

        assert!(result.has_errors());
        assert!(result.messages_for("name").is_some());
        assert!(result.messages_for("currency").is_some());
        assert!(result.messages_for("kind").is_some());
    }

    #[test]
    fn test_open_card_name_too_long() {
        let long = "x".repeat(MAX_CARD_NAME_LEN + 1);
        let result = validate_open_card_dto(&open_card(&long, "USD", "credit"));

        assert!(result.messages_for("name").is_some());
        assert!(result.messages_for("currency").is_none());
    }

    #[test]
    fn test_transfer_ok() {
        let dto = TransferDto {
            sum: 100_00,
            from: VALID_NUMBER.to_string(),
            to: OTHER_NUMBER.to_string(),
        };
        assert!(!validate_transfer_dto(&dto).has_errors());
    }

    #[test]
    fn test_transfer_rejects_non_positive_sum() {
        for sum in [0, -1] {
            let dto = TransferDto {
                sum,
                from: VALID_NUMBER.to_string(),
                to: OTHER_NUMBER.to_string(),
            };
            let result = validate_transfer_dto(&dto);
            assert!(result.messages_for("sum").is_some(), "sum {sum} accepted");
        }
    }

    #[test]
    fn test_transfer_rejects_bad_numbers() {
        let dto = TransferDto {
            sum: 100,
            from: String::new(),
            to: "4532015112830367".to_string(), // checksum broken
        };
        let result = validate_transfer_dto(&dto);

        assert_eq!(
            result.messages_for("from"),
            Some(&["must not be empty".to_string()][..])
        );
        assert_eq!(
            result.messages_for("to"),
            Some(&["this card number is invalid".to_string()][..])
        );
    }

    #[test]
    fn test_transfer_rejects_same_card() {
        let dto = TransferDto {
            sum: 100,
            from: VALID_NUMBER.to_string(),
            to: VALID_NUMBER.to_string(),
        };
        let result = validate_transfer_dto(&dto);
        assert_eq!(
            result.messages_for("to"),
            Some(&["cannot transfer to the same card".to_string()][..])
        );
    }
}
