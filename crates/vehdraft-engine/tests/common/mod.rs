//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use vehdraft_client::DraftApiClient;
use vehdraft_core::Draft;
use vehdraft_engine::{AutoFillOrchestrator, DraftPersistence, DraftStore, PersistenceConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CERTIFIED_AT: &str = "2026-03-01T10:00:00Z";

pub fn client(server: &MockServer) -> DraftApiClient {
    DraftApiClient::with_base_url(&server.uri(), 5).expect("client construction should not fail")
}

pub fn orchestrator(server: &MockServer, store: &DraftStore) -> Arc<AutoFillOrchestrator> {
    Arc::new(AutoFillOrchestrator::new(client(server), store.clone()))
}

pub fn persistence(server: &MockServer, store: &DraftStore, debounce_ms: u64) -> DraftPersistence {
    DraftPersistence::new(
        client(server),
        store.clone(),
        PersistenceConfig {
            debounce: Duration::from_millis(debounce_ms),
            autosave_interval: Duration::from_secs(60),
        },
    )
}

/// Gives the store a listing id without marking anything dirty.
pub fn adopt_listing(store: &DraftStore, listing_id: &str) {
    store.hydrate(
        Draft {
            listing_id: Some(listing_id.to_owned()),
            ..Draft::default()
        },
        store.edit_seq(),
    );
}

pub fn certified_field(name: &str, value: &str) -> Value {
    json!({
        "fieldName": name,
        "fieldValue": value,
        "source": "SIV",
        "sourceTimestamp": CERTIFIED_AT,
        "isCertified": true
    })
}

pub fn source(key: &str, status: &str) -> Value {
    json!({ "adapterKey": key, "status": status })
}

/// Lookup envelope with both members JSON-encoded, as the backend sends them.
pub fn lookup_body(fields: &[Value], sources: &[Value]) -> Value {
    json!({
        "fields": Value::Array(fields.to_vec()).to_string(),
        "sources": Value::Array(sources.to_vec()).to_string(),
    })
}

pub async fn mount_lookup(server: &MockServer, body: &Value) {
    Mock::given(method("POST"))
        .and(path("/vehicle/lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Clio registered "AB-123-CD": three fields certified by the SIV registry.
pub fn clio_lookup() -> Value {
    lookup_body(
        &[
            certified_field("make", "Renault"),
            certified_field("model", "Clio"),
            certified_field("fuelType", "diesel"),
        ],
        &[source("siv", "success"), source("ademe", "success")],
    )
}
