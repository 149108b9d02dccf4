//! # sealreg-api — HTTP Service for the Sealed Registry
//!
//! ## API Surface
//!
//! | Method | Path                          | Handler                              |
//! |--------|-------------------------------|--------------------------------------|
//! | POST   | `/v1/records`                 | [`routes::records`] create           |
//! | POST   | `/v1/records/{id}/finalize`   | [`routes::records`] finalize         |
//! | GET    | `/v1/records`                 | [`routes::records`] list ids         |
//! | GET    | `/v1/records/{id}`            | [`routes::records`] filtered view    |
//! | GET    | `/v1/events?since=N`          | [`routes::events`] replay            |
//! | GET    | `/openapi.json`               | [`openapi`]                          |
//! | GET    | `/health/liveness`, `/health/readiness`, `/metrics` | unauthenticated |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Assemble the application router.
///
/// Health probes and `/metrics` are mounted outside the auth middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::records::router())
        .merge(routes::events::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route("/metrics", axum::routing::get(prometheus_metrics))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}

/// GET /metrics — Prometheus exposition.
///
/// Record gauges are refreshed from the registry on each scrape.
async fn prometheus_metrics(State(state): State<AppState>) -> Result<String, AppError> {
    let handle = state
        .prometheus
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("metrics recorder not installed".into()))?;

    let counts = state.registry.counts();
    metrics::gauge!("sealreg_records", "state" => "pending").set(counts.pending as f64);
    metrics::gauge!("sealreg_records", "state" => "finalized").set(counts.finalized as f64);
    metrics::gauge!("sealreg_last_event_sequence").set(state.registry.last_sequence() as f64);

    Ok(handle.render())
}
