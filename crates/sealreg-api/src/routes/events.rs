//! # Events API
//!
//! Replay of the registry's sequenced notifications. Clients poll with the
//! last sequence they saw.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use sealreg_registry::RegistryEvent;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::state::AppState;

/// Replay cursor.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventsQuery {
    /// Return events with a sequence greater than this. Defaults to 0.
    pub since: Option<u64>,
}

/// A page of events.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    /// `RecordCreated` / `Disclosed` events in sequence order.
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<RegistryEvent>,
    /// Latest sequence number assigned by the registry.
    pub last_sequence: u64,
}

/// Build the events router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/events", get(list_events))
}

/// GET /v1/events — Events after `since`.
#[utoipa::path(
    get,
    path = "/v1/events",
    params(EventsQuery),
    responses((status = 200, description = "Events in sequence order", body = EventsResponse)),
    tag = "events"
)]
pub(crate) async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventsResponse> {
    let events = state.registry.events_since(query.since.unwrap_or(0));
    let last_sequence = state.registry.last_sequence();
    Json(EventsResponse {
        events,
        last_sequence,
    })
}
