//! # HTTP Tests for sealreg-api
//!
//! Drives the router with `oneshot` against an in-memory registry, using the
//! simulated coprocessor to produce real handles and proofs.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sealreg_api::state::{AppConfig, AppState};
use sealreg_core::{Identity, RegistryId};
use sealreg_crypto::hex;
use sealreg_fhe::{
    ClearValue, Disclosure, EncryptedInput, EncryptedValueCapability, HandleBinding,
    Requester, SimulatedCoprocessor,
};
use sealreg_registry::Registry;
use serde_json::{json, Value};
use tower::ServiceExt;

const REGISTRY: &str = "reg-api";

struct TestApp {
    router: Router,
    coprocessor: SimulatedCoprocessor,
}

impl TestApp {
    fn new(auth_token: Option<&str>) -> Self {
        let registry_id = RegistryId::new(REGISTRY).unwrap();
        let coprocessor = SimulatedCoprocessor::random(registry_id.clone());
        let registry = Registry::in_memory(registry_id, coprocessor.proof_verifier());
        let config = AppConfig {
            port: 0,
            auth_token: auth_token.map(str::to_string),
        };
        Self {
            router: sealreg_api::app(AppState::new(Arc::new(registry), config)),
            coprocessor,
        }
    }

    async fn encrypt(&self, owner: &str, value: u32) -> EncryptedInput {
        let binding = HandleBinding::new(
            RegistryId::new(REGISTRY).unwrap(),
            Identity::new(owner).unwrap(),
        );
        self.coprocessor
            .encrypt(ClearValue::from(value), &binding)
            .await
            .unwrap()
    }

    async fn disclose(&self, input: &EncryptedInput, owner: &str) -> Disclosure {
        self.coprocessor
            .request_disclosure(&input.handle, &Requester::from(Identity::new(owner).unwrap()))
            .await
            .unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

fn create_body(id: &str, owner: &str, input: &EncryptedInput) -> Value {
    json!({
        "id": id,
        "owner": owner,
        "encryptedField": input.handle.to_hex(),
        "proof": input.proof.to_hex(),
        "publicFields": {"category": "loan", "restricted.branch": "north"},
    })
}

fn finalize_body(disclosure: &Disclosure) -> Value {
    json!({
        "disclosedValueEncoded": hex::encode(&disclosure.value.encode()),
        "proof": disclosure.proof.to_hex(),
    })
}

// -- Health -------------------------------------------------------------------

#[tokio::test]
async fn health_probes_respond() {
    let app = TestApp::new(Some("s3cret"));
    for uri in ["/health/liveness", "/health/readiness"] {
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn metrics_unavailable_without_recorder() {
    let app = TestApp::new(None);
    let (status, body) = app.get("/metrics", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn openapi_document_served() {
    let app = TestApp::new(None);
    let (status, body) = app.get("/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/records"].is_object());
}

// -- Lifecycle ----------------------------------------------------------------

#[tokio::test]
async fn create_disclose_finalize_scenario() {
    let app = TestApp::new(None);
    let input = app.encrypt("0xAA", 138).await;

    let (status, created) = app.post("/v1/records", &create_body("rec-1", "0xAA", &input)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["state"], "PENDING");
    assert_eq!(created["encryptedField"], input.handle.to_hex());
    assert!(created.get("disclosedValue").is_none());

    let disclosure = app.disclose(&input, "0xAA").await;
    let (status, finalized) = app
        .post("/v1/records/rec-1/finalize", &finalize_body(&disclosure))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finalized["state"], "FINALIZED");
    assert_eq!(finalized["disclosedValue"], 138);

    let (status, again) = app
        .post("/v1/records/rec-1/finalize", &finalize_body(&disclosure))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["error"]["code"], "ALREADY_FINALIZED");
    assert_eq!(again["error"]["details"]["storedValue"], 138);

    let (status, events) = app.get("/v1/events?since=0", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(events["lastSequence"], 2);
    assert_eq!(events["events"][0]["type"], "RecordCreated");
    assert_eq!(events["events"][1]["type"], "Disclosed");
    assert_eq!(events["events"][1]["disclosedValue"], 138);

    let (_, tail) = app.get("/v1/events?since=1", None).await;
    assert_eq!(tail["events"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn list_returns_ids_in_insertion_order() {
    let app = TestApp::new(None);
    for id in ["rec-b", "rec-a", "rec-c"] {
        let input = app.encrypt("0xAA", 1).await;
        let (status, _) = app.post("/v1/records", &create_body(id, "0xAA", &input)).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, body) = app.get("/v1/records", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ids"], json!(["rec-b", "rec-a", "rec-c"]));
    assert_eq!(body["count"], 3);
}

// -- Rejections -----------------------------------------------------------------

#[tokio::test]
async fn duplicate_id_is_conflict() {
    let app = TestApp::new(None);
    let first = app.encrypt("0xAA", 1).await;
    let second = app.encrypt("0xBB", 2).await;
    app.post("/v1/records", &create_body("rec-1", "0xAA", &first)).await;

    let (status, body) = app.post("/v1/records", &create_body("rec-1", "0xBB", &second)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_ID");

    let (_, record) = app.get("/v1/records/rec-1", None).await;
    assert_eq!(record["owner"], "0xAA");
}

#[tokio::test]
async fn handle_bound_to_other_owner_is_invalid_handle() {
    let app = TestApp::new(None);
    let input = app.encrypt("0xAA", 1).await;
    let (status, body) = app.post("/v1/records", &create_body("rec-1", "0xBB", &input)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_HANDLE");
}

#[tokio::test]
async fn malformed_handle_hex_is_invalid_handle() {
    let app = TestApp::new(None);
    let input = app.encrypt("0xAA", 1).await;
    let mut body = create_body("rec-1", "0xAA", &input);
    body["encryptedField"] = json!("abcd");
    let (status, body) = app.post("/v1/records", &body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_HANDLE");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = TestApp::new(None);
    let (status, body) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/v1/records")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn proof_for_other_record_is_proof_invalid() {
    let app = TestApp::new(None);
    let a = app.encrypt("0xAA", 10).await;
    let b = app.encrypt("0xAA", 10).await;
    app.post("/v1/records", &create_body("rec-a", "0xAA", &a)).await;
    app.post("/v1/records", &create_body("rec-b", "0xAA", &b)).await;

    let disclosure_a = app.disclose(&a, "0xAA").await;
    let (status, body) = app
        .post("/v1/records/rec-b/finalize", &finalize_body(&disclosure_a))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "PROOF_INVALID");

    let (_, record) = app.get("/v1/records/rec-b", None).await;
    assert_eq!(record["state"], "PENDING");
}

#[tokio::test]
async fn value_of_wrong_width_is_validation_error() {
    let app = TestApp::new(None);
    let input = app.encrypt("0xAA", 5).await;
    app.post("/v1/records", &create_body("rec-1", "0xAA", &input)).await;
    let disclosure = app.disclose(&input, "0xAA").await;

    let mut body = finalize_body(&disclosure);
    body["disclosedValueEncoded"] = json!("05");
    let (status, body) = app.post("/v1/records/rec-1/finalize", &body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_record_is_not_found() {
    let app = TestApp::new(None);
    let (status, body) = app.get("/v1/records/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let input = app.encrypt("0xAA", 5).await;
    let disclosure = app.disclose(&input, "0xAA").await;
    let (status, _) = app
        .post("/v1/records/ghost/finalize", &finalize_body(&disclosure))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Reader classes -------------------------------------------------------------

#[tokio::test]
async fn restricted_metadata_follows_reader_class() {
    let app = TestApp::new(Some("s3cret"));
    let input = app.encrypt("0xAA", 1).await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/records")
                .header("content-type", "application/json")
                .header("Authorization", "Bearer s3cret")
                .body(Body::from(create_body("rec-1", "0xAA", &input).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let (_, public) = app.get("/v1/records/rec-1", Some("public::s3cret")).await;
    assert_eq!(public["readerClass"], "public");
    assert!(public["publicMetadata"].get("restricted.branch").is_none());
    assert_eq!(public["publicMetadata"]["category"], "loan");

    let (_, owner) = app.get("/v1/records/rec-1", Some("owner:0xAA:s3cret")).await;
    assert_eq!(owner["readerClass"], "owner");
    assert_eq!(owner["publicMetadata"]["restricted.branch"], "north");

    let (_, stranger) = app.get("/v1/records/rec-1", Some("owner:0xBB:s3cret")).await;
    assert_eq!(stranger["readerClass"], "public");

    let (_, auditor) = app.get("/v1/records/rec-1", Some("s3cret")).await;
    assert_eq!(auditor["readerClass"], "auditor");
    assert_eq!(auditor["publicMetadata"]["restricted.branch"], "north");
}

#[tokio::test]
async fn api_routes_require_token_when_configured() {
    let app = TestApp::new(Some("s3cret"));
    let (status, body) = app.get("/v1/records", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn token_identity_must_own_created_record() {
    let app = TestApp::new(Some("s3cret"));
    let input = app.encrypt("0xAA", 1).await;
    let create_as = |token: &str| {
        Request::builder()
            .method("POST")
            .uri("/v1/records")
            .header("content-type", "application/json")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::from(create_body("rec-1", "0xAA", &input).to_string()))
            .unwrap()
    };

    let (status, body) = app.send(create_as("owner:0xBB:s3cret")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
    let (status, _) = app.get("/v1/records/rec-1", Some("s3cret")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, created) = app.send(create_as("owner:0xAA:s3cret")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["owner"], "0xAA");
}
