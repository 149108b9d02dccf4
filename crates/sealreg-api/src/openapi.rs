//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// OpenAPI document for the whole API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sealed Registry API",
        version = "0.1.0",
        description = "Records whose sensitive field is an encrypted handle, finalized once by a verified disclosure proof."
    ),
    paths(
        crate::routes::records::create_record,
        crate::routes::records::finalize_record,
        crate::routes::records::list_records,
        crate::routes::records::get_record,
        crate::routes::events::list_events,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::records::CreateRecordRequest,
        crate::routes::records::FinalizeRequest,
        crate::routes::records::RecordResponse,
        crate::routes::records::RecordIdsResponse,
        crate::routes::events::EventsResponse,
    )),
    tags(
        (name = "records", description = "Record creation, finalization and reads"),
        (name = "events", description = "Registry notification replay"),
    )
)]
pub struct ApiDoc;

/// Router serving `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
