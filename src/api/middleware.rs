//! API Middleware
//!
//! Current-user resolution and request logging.

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::domain::card::User;

fn reject(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": message, "error_code": code })),
    )
        .into_response()
}

/// Resolve the caller from the `X-User-Id` header (with an optional
/// `X-User-Name`) and insert a [`User`] request extension. Handlers and the
/// core receive the user explicitly; there is no request-scoped global.
pub async fn current_user_middleware(
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let Some(raw_id) = headers.get("X-User-Id").and_then(|v| v.to_str().ok()) else {
        return Err(reject(
            StatusCode::UNAUTHORIZED,
            "missing_user_id",
            "Missing X-User-Id header",
        ));
    };
    let id = Uuid::parse_str(raw_id).map_err(|_| {
        reject(
            StatusCode::BAD_REQUEST,
            "invalid_user_id",
            "Invalid X-User-Id header format",
        )
    })?;

    let name = headers
        .get("X-User-Name")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    request.extensions_mut().insert(User::new(id, name));
    Ok(next.run(request).await)
}

/// Header values never written to logs.
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie"];

fn masked_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if SENSITIVE_HEADERS.contains(&name.as_str()) {
                "[REDACTED]"
            } else {
                value.to_str().unwrap_or("[invalid utf8]")
            };
            (name.to_string(), shown.to_string())
        })
        .collect()
}

/// Log every request with its outcome and latency.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = masked_headers(request.headers());

    tracing::info!(%method, %uri, ?headers, "request received");

    let start = std::time::Instant::now();
    let response = next.run(request).await;

    tracing::info!(
        %method,
        %uri,
        status = %response.status(),
        elapsed_ms = %start.elapsed().as_millis(),
        "request completed"
    );

    response
}
