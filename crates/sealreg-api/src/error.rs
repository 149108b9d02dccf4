//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps registry and boundary-validation errors to HTTP status codes and a
//! JSON body carrying a machine-readable code. Internal details are never
//! returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sealreg_registry::RegistryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "ALREADY_FINALIZED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context. `ALREADY_FINALIZED` carries the stored value here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Record not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request fields failed boundary validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to act for the requested owner (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A record with the requested id exists (409).
    #[error("{0}")]
    DuplicateId(String),

    /// Finalize on a finalized record (409). Non-fatal; carries the stored
    /// value.
    #[error("record {id} is already finalized")]
    AlreadyFinalized { id: String, value: u32 },

    /// Handle malformed, unbound or reused (422).
    #[error("{0}")]
    InvalidHandle(String),

    /// Disclosure proof rejected (422).
    #[error("{0}")]
    ProofInvalid(String),

    /// A component this endpoint needs is not configured (503).
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error (500). Logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::DuplicateId(_) => (StatusCode::CONFLICT, "DUPLICATE_ID"),
            Self::AlreadyFinalized { .. } => (StatusCode::CONFLICT, "ALREADY_FINALIZED"),
            Self::InvalidHandle(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_HANDLE"),
            Self::ProofInvalid(_) => (StatusCode::UNPROCESSABLE_ENTITY, "PROOF_INVALID"),
            Self::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::AlreadyFinalized { id, value } => {
                Some(serde_json::json!({ "id": id, "storedValue": value }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateId(_) => Self::DuplicateId(err.to_string()),
            RegistryError::InvalidInput(msg) => Self::Validation(msg),
            RegistryError::InvalidHandle { .. } => Self::InvalidHandle(err.to_string()),
            RegistryError::NotFound(_) => Self::NotFound(err.to_string()),
            RegistryError::AlreadyFinalized { id, value } => Self::AlreadyFinalized {
                id: id.to_string(),
                value: value.get(),
            },
            RegistryError::ProofInvalid { .. } => Self::ProofInvalid(err.to_string()),
            RegistryError::Persistence(msg) => Self::Internal(msg),
        }
    }
}

impl From<sealreg_core::ValidationError> for AppError {
    fn from(err: sealreg_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
