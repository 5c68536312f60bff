//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::DomainError;
use serde_json::json;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Malformed cart line.
    Domain(DomainError),
    /// Checkout failure.
    Checkout(CheckoutError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, "not-found", msg),
            ApiError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, "bad-request", msg),
            ApiError::Domain(err) => {
                error_body(StatusCode::BAD_REQUEST, "invalid-cart", err.to_string())
            }
            ApiError::Checkout(err) => checkout_error_to_response(err),
        }
    }
}

fn error_body(status: StatusCode, code: &str, message: String) -> Response {
    (status, Json(json!({ "error": message, "code": code }))).into_response()
}

fn checkout_error_to_response(err: CheckoutError) -> Response {
    let status = match &err {
        CheckoutError::Validation(_) | CheckoutError::Serviceability { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CheckoutError::EmptyCart => StatusCode::BAD_REQUEST,
        CheckoutError::InvalidState { .. } | CheckoutError::Cancelled => StatusCode::CONFLICT,
        CheckoutError::Ledger(_)
        | CheckoutError::ProfileStore(_)
        | CheckoutError::PostalLookup(_)
        | CheckoutError::CartStore(_) => StatusCode::BAD_GATEWAY,
        CheckoutError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        CheckoutError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut body = json!({ "error": err.to_string(), "code": err.code() });
    match &err {
        CheckoutError::Validation(validation) => {
            body["fields"] = json!(validation.errors);
        }
        CheckoutError::Configuration {
            order_id: Some(order_id),
            ..
        } => {
            body["order_id"] = json!(order_id);
        }
        _ => {}
    }

    (status, Json(body)).into_response()
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}
