//! # Records API
//!
//! Create, finalize and read registry records. Handles, proofs and the
//! disclosed value travel as hex:
//!
//! - handle: 32 bytes
//! - creation proof: 64-byte Ed25519 signature
//! - disclosed value: 4 bytes, big-endian
//! - disclosure proof: 96 bytes (authority key ‖ signature)

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use sealreg_core::{Identity, RecordId};
use sealreg_fhe::{Handle, InputProof};
use sealreg_registry::{NewRecord, RecordView};
use sealreg_state::PublicMetadata;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, hex_field, Validate};
use crate::state::AppState;

/// Creation request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    /// Creator-chosen record id.
    pub id: String,
    /// Identity the handle was bound to; becomes the owner.
    pub owner: String,
    /// 32-byte handle, hex.
    pub encrypted_field: String,
    /// 64-byte coprocessor input proof, hex.
    pub proof: String,
    /// Plaintext attributes. Keys prefixed `restricted.` are hidden from
    /// public readers.
    #[serde(default)]
    pub public_fields: BTreeMap<String, String>,
}

impl Validate for CreateRecordRequest {
    type Valid = NewRecord;

    fn validate(self) -> Result<NewRecord, AppError> {
        let id = RecordId::new(self.id)?;
        let owner = Identity::new(self.owner)?;
        let public_metadata =
            PublicMetadata::new(self.public_fields).map_err(|e| AppError::Validation(e.to_string()))?;
        let encrypted_field = Handle::from_hex(&self.encrypted_field)
            .map_err(|e| AppError::InvalidHandle(format!("encryptedField: {e}")))?;
        let proof = InputProof::from_hex(&self.proof)
            .map_err(|e| AppError::InvalidHandle(format!("proof: {e}")))?;
        Ok(NewRecord {
            id,
            owner,
            encrypted_field,
            public_metadata,
            proof,
        })
    }
}

/// Finalize request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    /// Disclosed value as 4 big-endian bytes, hex.
    pub disclosed_value_encoded: String,
    /// 96-byte disclosure proof, hex.
    pub proof: String,
}

/// Finalize request after hex decoding. Lengths are checked by the registry.
#[derive(Debug)]
pub struct EncodedDisclosure {
    pub value: Vec<u8>,
    pub proof: Vec<u8>,
}

impl Validate for FinalizeRequest {
    type Valid = EncodedDisclosure;

    fn validate(self) -> Result<EncodedDisclosure, AppError> {
        Ok(EncodedDisclosure {
            value: hex_field(
                "disclosedValueEncoded",
                &self.disclosed_value_encoded,
                AppError::Validation,
            )?,
            proof: hex_field("proof", &self.proof, AppError::ProofInvalid)?,
        })
    }
}

/// A record as returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub id: String,
    pub owner: String,
    /// Handle, hex.
    pub encrypted_field: String,
    /// Metadata visible to `readerClass`.
    pub public_metadata: BTreeMap<String, String>,
    /// `PENDING` or `FINALIZED`.
    pub state: String,
    /// Present iff `state` is `FINALIZED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosed_value: Option<u32>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<String>,
    /// Class the metadata was filtered for.
    pub reader_class: String,
}

impl From<RecordView> for RecordResponse {
    fn from(view: RecordView) -> Self {
        Self {
            id: view.id.to_string(),
            owner: view.owner.to_string(),
            encrypted_field: view.encrypted_field.to_hex(),
            public_metadata: view.public_metadata,
            state: view.state.to_string(),
            disclosed_value: view.disclosed_value.map(|v| v.get()),
            created_at: view.created_at.to_iso8601(),
            finalized_at: view.finalized_at.map(|t| t.to_iso8601()),
            reader_class: view.reader_class.to_string(),
        }
    }
}

/// Record ids in insertion order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordIdsResponse {
    pub ids: Vec<String>,
    pub count: usize,
}

/// Build the records router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/records", post(create_record).get(list_records))
        .route("/v1/records/{id}", get(get_record))
        .route("/v1/records/{id}/finalize", post(finalize_record))
}

fn parse_id(raw: String) -> Result<RecordId, AppError> {
    Ok(RecordId::new(raw)?)
}

fn check_owner(caller: &CallerIdentity, owner: &Identity) -> Result<(), AppError> {
    match &caller.identity {
        Some(identity) if identity != owner => Err(AppError::Forbidden(format!(
            "caller {identity} cannot create a record owned by {owner}"
        ))),
        _ => Ok(()),
    }
}

/// POST /v1/records — Create a pending record.
///
/// A caller whose token names an identity may only create records it owns.
#[utoipa::path(
    post,
    path = "/v1/records",
    request_body = CreateRecordRequest,
    responses(
        (status = 201, description = "Record created", body = RecordResponse),
        (status = 403, description = "Caller identity differs from owner", body = crate::error::ErrorBody),
        (status = 409, description = "Duplicate id", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid handle or fields", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
pub(crate) async fn create_record(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateRecordRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RecordResponse>), AppError> {
    let new_record = extract_validated_json(body)?;
    check_owner(&caller, &new_record.owner)?;
    let record = state.registry.create(new_record)?;
    let view = RecordView::new(&record, &caller.reader());
    Ok((StatusCode::CREATED, Json(view.into())))
}

/// POST /v1/records/{id}/finalize — Record a verified disclosure.
#[utoipa::path(
    post,
    path = "/v1/records/{id}/finalize",
    params(("id" = String, Path, description = "Record id")),
    request_body = FinalizeRequest,
    responses(
        (status = 200, description = "Record finalized", body = RecordResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already finalized; details carry the stored value", body = crate::error::ErrorBody),
        (status = 422, description = "Proof rejected", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
pub(crate) async fn finalize_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: CallerIdentity,
    body: Result<Json<FinalizeRequest>, JsonRejection>,
) -> Result<Json<RecordResponse>, AppError> {
    let id = parse_id(id)?;
    let disclosure = extract_validated_json(body)?;
    let record = state
        .registry
        .finalize_encoded(&id, &disclosure.value, &disclosure.proof)?;
    Ok(Json(RecordView::new(&record, &caller.reader()).into()))
}

/// GET /v1/records — List record ids.
#[utoipa::path(
    get,
    path = "/v1/records",
    responses((status = 200, description = "Ids in insertion order", body = RecordIdsResponse)),
    tag = "records"
)]
pub(crate) async fn list_records(State(state): State<AppState>) -> Json<RecordIdsResponse> {
    let ids: Vec<String> = state
        .registry
        .list_ids()
        .iter()
        .map(ToString::to_string)
        .collect();
    Json(RecordIdsResponse {
        count: ids.len(),
        ids,
    })
}

/// GET /v1/records/{id} — Read one record, filtered for the caller.
#[utoipa::path(
    get,
    path = "/v1/records/{id}",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Record found", body = RecordResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
pub(crate) async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    caller: CallerIdentity,
) -> Result<Json<RecordResponse>, AppError> {
    let id = parse_id(id)?;
    let view = state.registry.view(&id, &caller.reader())?;
    Ok(Json(view.into()))
}
