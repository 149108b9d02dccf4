//! # Authentication Middleware
//!
//! Optional bearer-token authentication. The token names the caller's
//! reader class and identity, which decide how record metadata is filtered
//! on the read path.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {reader_class}:{identity}:{secret}
//! Bearer {secret}                            — treated as auditor
//! ```
//!
//! `reader_class` is `public`, `owner` or `auditor`; `identity` may be
//! empty. An `owner` token only sees restricted fields of records whose
//! owner equals `identity`.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sealreg_core::Identity;
use sealreg_registry::Reader;
use sealreg_state::ReaderClass;
use subtle::ConstantTimeEq;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// The authenticated caller, injected into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Class claimed by the token.
    pub reader_class: ReaderClass,
    /// Identity named by the token, if any.
    pub identity: Option<Identity>,
}

impl CallerIdentity {
    /// Full-visibility caller without an identity.
    pub fn auditor() -> Self {
        Self {
            reader_class: ReaderClass::Auditor,
            identity: None,
        }
    }

    /// Read-path reader for this caller.
    pub fn reader(&self) -> Reader {
        Reader {
            class: self.reader_class,
            identity: self.identity.clone(),
        }
    }
}

impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Auth configuration injected into request extensions.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token against the configured secret.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.as_slice() {
        [secret] => {
            if constant_time_token_eq(secret, expected_secret) {
                Ok(CallerIdentity::auditor())
            } else {
                Err("invalid bearer token".into())
            }
        }
        [class, identity, secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }
            let reader_class: ReaderClass = class.parse()?;
            let identity = if identity.is_empty() {
                None
            } else {
                Some(Identity::new(*identity).map_err(|e| format!("invalid identity: {e}"))?)
            };
            Ok(CallerIdentity {
                reader_class,
                identity,
            })
        }
        _ => Err(
            "invalid token format, expected {reader_class}:{identity}:{secret} or {secret}".into(),
        ),
    }
}

/// Validate the `Authorization` header and inject a [`CallerIdentity`].
///
/// With no token configured every request is an auditor (development mode).
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let Some(expected) = expected else {
        request.extensions_mut().insert(CallerIdentity::auditor());
        return next.run(request).await;
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(provided) => match parse_bearer_token(provided, &expected) {
                Ok(identity) => {
                    request.extensions_mut().insert(identity);
                    next.run(request).await
                }
                Err(msg) => {
                    tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                    unauthorized_response(&msg)
                }
            },
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                unauthorized_response("authorization header must use Bearer scheme")
            }
        },
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            unauthorized_response("missing authorization header")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
