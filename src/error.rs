//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::validation::ValidationResult;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Validation failed")]
    Validation(ValidationResult),

    #[error("Concurrent modification detected")]
    Conflict(ValidationResult),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    // Server errors (5xx)
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    /// Wrap a validation result, routing the distinguished concurrency
    /// entry to the conflict status.
    pub fn from_validation(result: ValidationResult) -> Self {
        if result.is_conflict() {
            AppError::Conflict(result)
        } else {
            AppError::Validation(result)
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationResult>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details, errors) = match self {
            // 400 Bad Request
            AppError::InvalidRequest(ref msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                Some(msg.clone()),
                None,
            ),
            AppError::Validation(ref result) => (
                StatusCode::BAD_REQUEST,
                "validation_failed",
                None,
                Some(result.clone()),
            ),
            // 404 Not Found
            AppError::CardNotFound(ref number) => (
                StatusCode::NOT_FOUND,
                "card_not_found",
                Some(number.clone()),
                None,
            ),

            // 409 Conflict
            AppError::Conflict(ref result) => (
                StatusCode::CONFLICT,
                "version_conflict",
                None,
                Some(result.clone()),
            ),

            // 500 Internal Server Error
            AppError::Store(ref e) => {
                tracing::error!("Store error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    None,
                    None,
                )
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    None,
                    None,
                )
            }
            AppError::Config(ref e) => {
                tracing::error!("Config error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "config_error",
                    None,
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
            errors,
        };

        (status, Json(body)).into_response()
    }
}
