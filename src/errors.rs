//! Engine-wide error taxonomy.
//!
//! Every fallible engine operation returns `EngineResult<T>`. The status-code
//! mapping lives here so the HTTP boundary never has to re-derive it from the
//! error message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {message}")]
    Validation { code: String, message: String, details: Option<serde_json::Value> },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("conflict ({code}): {message}")]
    Conflict { code: String, message: String },

    #[error("provider communication error: {message}")]
    ProviderCommunication { message: String },

    #[error("provider declined: {message}")]
    ProviderDeclined { message: String, details: Option<serde_json::Value> },

    #[error("rate limited: {message}")]
    RateLimit { message: String },

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("lock error: {message}")]
    Lock { message: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { code: "validation_error".to_string(), message: message.into(), details: None }
    }

    /// A validation failure with a specific machine-readable code instead of
    /// the generic `validation_error` (e.g. `invalid_transaction_state`).
    pub fn validation_with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { code: code.into(), message: message.into(), details: None }
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict { code: code.into(), message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn lock(message: impl Into<String>) -> Self {
        Self::Lock { message: message.into() }
    }

    /// Pure function from error kind to HTTP status code, per the error
    /// handling design: the status code never depends on the message text.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::RateLimit { .. } => 429,
            Self::ProviderDeclined { .. } => 402,
            Self::ProviderCommunication { .. } | Self::Lock { .. } => 503,
            Self::Database { .. } | Self::Configuration { .. } | Self::Internal { .. } => 500,
        }
    }

    /// `Validation` and `Conflict` carry their own specific code
    /// (invalid_transaction_state, idempotency_key_conflict, ...); every
    /// other kind has a fixed code.
    pub fn code(&self) -> String {
        match self {
            Self::Validation { code, .. } => code.clone(),
            Self::Unauthorized { .. } => "unauthorized".to_string(),
            Self::NotFound { .. } => "not_found".to_string(),
            Self::Conflict { code, .. } => code.clone(),
            Self::ProviderCommunication { .. } => "provider_communication_error".to_string(),
            Self::ProviderDeclined { .. } => "provider_declined".to_string(),
            Self::RateLimit { .. } => "rate_limited".to_string(),
            Self::Database { .. } => "database_error".to_string(),
            Self::Lock { .. } => "lock_error".to_string(),
            Self::Configuration { .. } => "configuration_error".to_string(),
            Self::Internal { .. } => "internal_error".to_string(),
        }
    }
}

/// The HTTP boundary: handlers return `EngineResult<Json<T>>` directly so the
/// status code and machine-readable code survive all the way out, instead of
/// collapsing through a generic `loco_rs::Error` string.
impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

/// Domain-specific error recorded on a transaction when the last attempt
/// failed. Distinct from `EngineError`: this is the payload, not the
/// propagation mechanism, and it is what persists to `transactions.error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionError {
    pub code: String,
    pub message: String,
    pub recoverable: bool,
    pub retryable: bool,
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_is_pure_function_of_kind() {
        assert_eq!(EngineError::validation("x").status_code(), 400);
        assert_eq!(EngineError::Unauthorized { message: "x".into() }.status_code(), 401);
        assert_eq!(EngineError::not_found("x").status_code(), 404);
        assert_eq!(EngineError::conflict("state_conflict", "x").status_code(), 409);
        assert_eq!(EngineError::conflict("idempotency_key_conflict", "x").status_code(), 409);
        assert_eq!(EngineError::RateLimit { message: "x".into() }.status_code(), 429);
        assert_eq!(EngineError::ProviderDeclined { message: "x".into(), details: None }.status_code(), 402);
        assert_eq!(EngineError::lock("x").status_code(), 503);
        assert_eq!(EngineError::internal("x").status_code(), 500);
    }

    #[test]
    fn conflict_carries_its_own_code() {
        let err = EngineError::conflict("idempotency_key_conflict", "dup");
        assert_eq!(err.code(), "idempotency_key_conflict");
    }

    #[test]
    fn validation_with_code_stays_a_400() {
        let err = EngineError::validation_with_code("invalid_transaction_state", "not retryable");
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.code(), "invalid_transaction_state");
    }

    #[test]
    fn code_is_fixed_for_non_conflict_kinds() {
        assert_eq!(EngineError::validation("x").code(), "validation_error");
        assert_eq!(EngineError::not_found("x").code(), "not_found");
    }
}

impl TransactionError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, recoverable: bool, retryable: bool) -> Self {
        Self { code: code.into(), message: message.into(), recoverable, retryable, details: None }
    }

    pub fn retry_limit_exceeded() -> Self {
        Self::new("RETRY_LIMIT_EXCEEDED", "maximum retry attempts exceeded", true, false)
    }

    pub fn manual_retry() -> Self {
        Self::new("MANUAL_RETRY", "manual retry requested by operator", true, true)
    }

    pub fn system_error(message: impl Into<String>) -> Self {
        Self::new("SYSTEM_ERROR", message, false, false)
    }
}
