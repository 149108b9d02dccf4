//! # Request Extraction & Boundary Validation
//!
//! Request DTOs carry strings and hex; [`Validate`] turns them into the
//! registry's typed inputs so handlers only ever see validated values.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Request types that convert into a validated domain value.
pub trait Validate {
    /// The validated form.
    type Valid;

    /// Check and convert. The error selects the response code.
    fn validate(self) -> Result<Self::Valid, AppError>;
}

/// Extract a JSON body, mapping deserialization errors to
/// [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and convert it through [`Validate`].
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T::Valid, AppError> {
    extract_json(result)?.validate()
}

/// Decode a hex request field, mapping failure through `err`.
pub(crate) fn hex_field(
    field: &str,
    value: &str,
    err: impl FnOnce(String) -> AppError,
) -> Result<Vec<u8>, AppError> {
    sealreg_crypto::hex::decode(value.trim()).map_err(|e| err(format!("{field}: {e}")))
}
