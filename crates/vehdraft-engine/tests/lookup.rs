//! Auto-fill lookup behaviour against a mocked aggregation endpoint.

mod common;

use std::time::Duration;

use serde_json::json;
use vehdraft_core::{FieldStatus, IdentifierType};
use vehdraft_engine::{DraftStore, LookupOutcome, LookupState};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{certified_field, clio_lookup, lookup_body, mount_lookup, orchestrator, source};

#[tokio::test]
async fn plate_lookup_certifies_returned_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vehicle/lookup"))
        .and(body_partial_json(json!({ "identifier": "AB-123-CD", "identifierType": "plate" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(clio_lookup()))
        .expect(1)
        .mount(&server)
        .await;

    let store = DraftStore::new();
    let orchestrator = orchestrator(&server, &store);
    let outcome = orchestrator.lookup("ab 123 cd", IdentifierType::Plate).await;

    assert!(matches!(
        outcome,
        LookupOutcome::Applied { state: LookupState::Success, fields_updated: 3, .. }
    ));
    let draft = store.snapshot();
    assert_eq!(draft.fields.len(), 3);
    for state in draft.fields.values() {
        assert_eq!(state.status(), FieldStatus::Certified);
        assert_eq!(state.certified_source(), Some("SIV"));
        assert!(state.certified_timestamp().is_some());
    }
    assert_eq!(draft.visibility_score, None, "score waits for the backend");

    let view = orchestrator.view();
    assert_eq!(view.state, LookupState::Success);
    assert_eq!(view.fields.len(), 3);
    assert_eq!(view.identifier, Some(("AB-123-CD".to_owned(), IdentifierType::Plate)));
}

#[tokio::test]
async fn declared_fields_survive_a_lookup_that_does_not_cover_them() {
    let server = MockServer::start().await;
    mount_lookup(&server, &clio_lookup()).await;

    let store = DraftStore::new();
    store.update_field("color", Some("blue".into()), vehdraft_core::Provenance::Declared);
    let orchestrator = orchestrator(&server, &store);
    orchestrator.lookup("AB-123-CD", IdentifierType::Plate).await;

    let color = store.field_state("color").unwrap();
    assert_eq!(color.value, Some("blue".into()));
    assert_eq!(color.status(), FieldStatus::Declared);
}

#[tokio::test]
async fn some_failed_sources_make_a_partial_lookup() {
    let server = MockServer::start().await;
    let body = lookup_body(
        &[certified_field("make", "Peugeot")],
        &[
            source("siv", "success"),
            source("ademe", "failed"),
            source("histovec", "success"),
            source("rappels", "failed"),
            source("critair", "success"),
        ],
    );
    mount_lookup(&server, &body).await;

    let store = DraftStore::new();
    let orchestrator = orchestrator(&server, &store);
    let outcome = orchestrator.lookup("AB-123-CD", IdentifierType::Plate).await;

    assert!(matches!(outcome, LookupOutcome::Applied { state: LookupState::Partial, .. }));
    assert_eq!(orchestrator.view().sources.len(), 5);
    assert_eq!(
        store.field_state("make").unwrap().status(),
        FieldStatus::Certified
    );
}

#[tokio::test]
async fn all_sources_failed_leaves_store_untouched() {
    let server = MockServer::start().await;
    let body = lookup_body(
        &[],
        &[source("siv", "failed"), source("ademe", "failed")],
    );
    mount_lookup(&server, &body).await;

    let store = DraftStore::new();
    let orchestrator = orchestrator(&server, &store);
    let version = store.version();
    let outcome = orchestrator.lookup("AB-123-CD", IdentifierType::Plate).await;

    assert!(matches!(outcome, LookupOutcome::AllSourcesFailed { .. }));
    assert_eq!(
        orchestrator.view().state,
        LookupState::Error("all services unavailable".to_owned())
    );
    assert_eq!(orchestrator.view().sources.len(), 2);
    assert_eq!(store.version(), version);
}

#[tokio::test]
async fn malformed_fields_payload_is_an_error() {
    let server = MockServer::start().await;
    mount_lookup(&server, &json!({ "fields": "{broken", "sources": "[]" })).await;

    let store = DraftStore::new();
    let orchestrator = orchestrator(&server, &store);
    let outcome = orchestrator.lookup("AB-123-CD", IdentifierType::Plate).await;

    assert!(matches!(outcome, LookupOutcome::Failed { malformed: true, .. }));
    assert!(matches!(orchestrator.view().state, LookupState::Error(_)));
    assert!(store.snapshot().fields.is_empty());
}

#[tokio::test]
async fn transport_failure_is_an_error_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vehicle/lookup"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({ "message": "gateway down" })))
        .mount(&server)
        .await;

    let store = DraftStore::new();
    let orchestrator = orchestrator(&server, &store);
    let outcome = orchestrator.lookup("AB-123-CD", IdentifierType::Plate).await;

    assert_eq!(
        outcome,
        LookupOutcome::Failed {
            message: "gateway down".to_owned(),
            malformed: false
        }
    );
    assert_eq!(
        orchestrator.view().state,
        LookupState::Error("gateway down".to_owned())
    );
}

#[tokio::test]
async fn invalid_identifier_never_reaches_the_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vehicle/lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(clio_lookup()))
        .expect(0)
        .mount(&server)
        .await;

    let store = DraftStore::new();
    let orchestrator = orchestrator(&server, &store);
    let outcome = orchestrator.lookup("VF1-TOO-SHORT", IdentifierType::Vin).await;

    assert!(matches!(outcome, LookupOutcome::Failed { malformed: false, .. }));
    assert!(matches!(orchestrator.view().state, LookupState::Error(_)));
}

#[tokio::test]
async fn only_the_latest_lookup_reaches_the_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vehicle/lookup"))
        .and(body_partial_json(json!({ "identifier": "AA-111-AA" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(lookup_body(
                    &[certified_field("make", "Citroen")],
                    &[source("siv", "success")],
                ))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vehicle/lookup"))
        .and(body_partial_json(json!({ "identifier": "BB-222-BB" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(lookup_body(
            &[certified_field("make", "Renault")],
            &[source("siv", "success")],
        )))
        .mount(&server)
        .await;

    let store = DraftStore::new();
    let orchestrator = orchestrator(&server, &store);

    let slow = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.lookup("AA-111-AA", IdentifierType::Plate).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    let fast = orchestrator.lookup("BB-222-BB", IdentifierType::Plate).await;
    let slow = slow.await.unwrap();

    assert_eq!(slow, LookupOutcome::Superseded);
    assert!(matches!(fast, LookupOutcome::Applied { .. }));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(store.field_state("make").unwrap().value, Some("Renault".into()));
    assert_eq!(
        orchestrator.view().identifier,
        Some(("BB-222-BB".to_owned(), IdentifierType::Plate))
    );
}

#[tokio::test]
async fn reset_abandons_in_flight_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vehicle/lookup"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(clio_lookup())
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let store = DraftStore::new();
    let orchestrator = orchestrator(&server, &store);
    let pending = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.lookup("AB-123-CD", IdentifierType::Plate).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    orchestrator.reset();

    assert_eq!(pending.await.unwrap(), LookupOutcome::Superseded);
    assert_eq!(orchestrator.view().state, LookupState::Idle);
    assert!(store.snapshot().fields.is_empty());
}
