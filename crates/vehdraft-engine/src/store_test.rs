use vehdraft_core::{Certification, DraftPhoto, FieldStatus};

use super::*;

fn certified(name: &str, value: &str) -> CertifiedFieldResult {
    CertifiedFieldResult {
        field_name: name.to_owned(),
        field_value: Some(value.into()),
        source: "SIV".to_owned(),
        source_timestamp: "2026-03-01T10:00:00Z".parse().unwrap(),
        is_certified: true,
    }
}

fn declared(store: &DraftStore, name: &str, value: &str) {
    store.update_field(name, Some(value.into()), Provenance::Declared);
}

#[test]
fn initialize_fields_certifies_covered_fields() {
    let store = DraftStore::new();
    let changed = store.initialize_fields(&[
        certified("make", "Renault"),
        certified("model", "Clio"),
        certified("fuelType", "diesel"),
    ]);

    assert_eq!(changed, 3);
    let draft = store.snapshot();
    assert_eq!(draft.fields.len(), 3);
    assert!(draft
        .fields
        .values()
        .all(|f| f.status() == FieldStatus::Certified && f.certified_source() == Some("SIV")));
    assert!(draft.is_dirty);
    assert_eq!(draft.visibility_score, None, "score is never computed locally");
}

#[test]
fn initialize_fields_leaves_uncovered_fields_alone() {
    let store = DraftStore::new();
    declared(&store, "color", "blue");
    store.initialize_fields(&[certified("make", "Renault")]);
    store.initialize_fields(&[certified("model", "Clio")]);

    let color = store.field_state("color").unwrap();
    assert_eq!(color.value, Some("blue".into()));
    assert_eq!(color.status(), FieldStatus::Declared);
    assert_eq!(store.field_state("make").unwrap().value, Some("Renault".into()));
}

#[test]
fn initialize_fields_overwrites_declared_value() {
    let store = DraftStore::new();
    declared(&store, "make", "Renaut");
    store.initialize_fields(&[certified("make", "Renault")]);

    let make = store.field_state("make").unwrap();
    assert_eq!(make.value, Some("Renault".into()));
    assert_eq!(make.status(), FieldStatus::Certified);
}

#[test]
fn initialize_fields_keeps_audit_record() {
    let store = DraftStore::new();
    store.initialize_fields(&[certified("make", "Renault")]);
    declared(&store, "make", "Renault Sport");
    store.set_original_certified_value("make", "Renault".into());

    store.initialize_fields(&[certified("make", "Renault")]);

    let make = store.field_state("make").unwrap();
    assert_eq!(make.status(), FieldStatus::Certified);
    assert_eq!(make.original_certified_value, Some("Renault".into()));
}

#[test]
fn identical_results_do_not_bump_version() {
    let store = DraftStore::new();
    store.initialize_fields(&[certified("make", "Renault")]);
    let version = store.version();
    assert_eq!(store.initialize_fields(&[certified("make", "Renault")]), 0);
    assert_eq!(store.version(), version);
}

#[test]
fn update_field_marks_dirty_and_creates_entry() {
    let store = DraftStore::new();
    assert!(!store.is_dirty());
    declared(&store, "mileage", "52000");
    assert!(store.is_dirty());
    assert_eq!(
        store.field_state("mileage").unwrap().status(),
        FieldStatus::Declared
    );
}

#[test]
fn set_original_certified_value_requires_entry() {
    let store = DraftStore::new();
    assert!(!store.set_original_certified_value("make", "Renault".into()));
    assert!(store.field_state("make").is_none());
}

#[test]
fn audit_record_survives_declared_edits() {
    let store = DraftStore::new();
    store.initialize_fields(&[certified("make", "Renault")]);
    declared(&store, "make", "Renault Sport");
    assert!(store.set_original_certified_value("make", "Renault".into()));

    declared(&store, "make", "Renault Sport RS");
    declared(&store, "mileage", "40000");

    let make = store.field_state("make").unwrap();
    assert_eq!(make.original_certified_value, Some("Renault".into()));
    assert_eq!(make.value, Some("Renault Sport RS".into()));
}

#[test]
fn rollback_restores_snapshot_exactly() {
    let store = DraftStore::new();
    store.initialize_fields(&[certified("make", "Renault")]);
    let before = store.field_state("make");
    declared(&store, "make", "Dacia");
    let optimistic = store.field_state("make").unwrap();

    assert!(store.rollback_field("make", &optimistic, before.clone()));

    let after = store.field_state("make").unwrap();
    assert_eq!(Some(after), before);
}

#[test]
fn rollback_without_snapshot_clears_to_empty() {
    let store = DraftStore::new();
    declared(&store, "color", "red");
    let optimistic = store.field_state("color").unwrap();

    assert!(store.rollback_field("color", &optimistic, None));

    let color = store.field_state("color").unwrap();
    assert_eq!(color.status(), FieldStatus::Empty);
    assert_eq!(color.value, None);
}

#[test]
fn rollback_skips_field_edited_since() {
    let store = DraftStore::new();
    declared(&store, "color", "red");
    let optimistic = store.field_state("color").unwrap();
    declared(&store, "color", "green");

    assert!(!store.rollback_field("color", &optimistic, None));
    assert_eq!(store.field_state("color").unwrap().value, Some("green".into()));
}

#[test]
fn apply_score_overwrites_reported_metrics_only() {
    let store = DraftStore::new();
    store.apply_score(&ScoreUpdate {
        visibility_score: Some(40.0),
        visibility_label: Some("fair".to_owned()),
        completion_percentage: Some(50.0),
    });
    store.apply_score(&ScoreUpdate {
        visibility_score: Some(55.0),
        ..ScoreUpdate::default()
    });

    let draft = store.snapshot();
    assert_eq!(draft.visibility_score, Some(55.0));
    assert_eq!(draft.visibility_label.as_deref(), Some("fair"));
    assert_eq!(draft.completion_percentage, Some(50.0));
}

#[test]
fn only_one_save_slot() {
    let store = DraftStore::new();
    let ticket = store.begin_save().expect("first save claims the slot");
    assert!(store.snapshot().is_saving);
    assert!(store.begin_save().is_none());
    store.abort_save(ticket);
    assert!(!store.snapshot().is_saving);
    assert!(store.begin_save().is_some());
}

#[test]
fn finish_save_adopts_listing_and_clears_dirty() {
    let store = DraftStore::new();
    declared(&store, "make", "Peugeot");
    let ticket = store.begin_save().unwrap();
    let now = Utc::now();
    store.finish_save(ticket, Some("lst_1".to_owned()), now);

    let draft = store.snapshot();
    assert_eq!(draft.listing_id.as_deref(), Some("lst_1"));
    assert!(!draft.is_dirty);
    assert!(!draft.is_saving);
    assert_eq!(draft.last_saved_at, Some(now));
}

#[test]
fn finish_save_keeps_existing_listing_id() {
    let store = DraftStore::new();
    let first = store.begin_save().unwrap();
    store.finish_save(first, Some("lst_1".to_owned()), Utc::now());
    let second = store.begin_save().unwrap();
    store.finish_save(second, Some("lst_other".to_owned()), Utc::now());
    assert_eq!(store.listing_id().as_deref(), Some("lst_1"));
}

#[test]
fn edit_during_save_keeps_draft_dirty() {
    let store = DraftStore::new();
    declared(&store, "make", "Peugeot");
    let ticket = store.begin_save().unwrap();
    declared(&store, "model", "208");
    store.finish_save(ticket, Some("lst_1".to_owned()), Utc::now());
    assert!(store.is_dirty());
}

#[test]
fn hydrate_replaces_untouched_store() {
    let store = DraftStore::new();
    let baseline = store.edit_seq();
    let mut restored = Draft {
        listing_id: Some("lst_9".to_owned()),
        is_dirty: true,
        photos: vec![DraftPhoto {
            url: "https://cdn.example.test/1.jpg".to_owned(),
            position: 0,
        }],
        ..Draft::default()
    };
    restored.fields.insert(
        "make".to_owned(),
        FieldState {
            field_name: "make".to_owned(),
            value: Some("Renault".into()),
            provenance: Provenance::Certified(Certification {
                source: "SIV".to_owned(),
                certified_at: "2026-03-01T10:00:00Z".parse().unwrap(),
            }),
            original_certified_value: None,
        },
    );

    assert!(!store.hydrate(restored, baseline));
    let draft = store.snapshot();
    assert_eq!(draft.listing_id.as_deref(), Some("lst_9"));
    assert_eq!(draft.photos.len(), 1);
    assert!(!draft.is_dirty, "a freshly restored draft is clean");
}

#[test]
fn hydrate_merges_when_edited_meanwhile() {
    let store = DraftStore::new();
    let baseline = store.edit_seq();
    declared(&store, "make", "Peugeot");

    let mut restored = Draft {
        listing_id: Some("lst_9".to_owned()),
        ..Draft::default()
    };
    for (name, value) in [("make", "Renault"), ("model", "Clio")] {
        restored.fields.insert(
            name.to_owned(),
            FieldState {
                field_name: name.to_owned(),
                value: Some(value.into()),
                provenance: Provenance::Declared,
                original_certified_value: None,
            },
        );
    }

    assert!(store.hydrate(restored, baseline));
    let draft = store.snapshot();
    assert_eq!(draft.fields["make"].value, Some("Peugeot".into()));
    assert_eq!(draft.fields["model"].value, Some("Clio".into()));
    assert_eq!(draft.listing_id.as_deref(), Some("lst_9"));
    assert!(draft.is_dirty);
}

#[test]
fn reset_clears_everything() {
    let store = DraftStore::new();
    store.initialize_fields(&[certified("make", "Renault")]);
    store.apply_score(&ScoreUpdate {
        visibility_score: Some(10.0),
        ..ScoreUpdate::default()
    });
    store.reset_draft_state();
    assert_eq!(store.snapshot(), Draft::default());
}

#[tokio::test]
async fn subscribers_see_every_mutation() {
    let store = DraftStore::new();
    let mut rx = store.subscribe();
    declared(&store, "make", "Renault");
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), store.version());
}
