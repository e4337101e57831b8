//! Draft Restore: one-shot rehydration of a saved draft into the store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

use vehdraft_client::{ApiError, DraftApiClient, LoadDraftPayload};
use vehdraft_core::{
    Certification, Draft, FieldSchema, FieldState, FieldValue, Provenance,
};

use crate::error::DraftError;
use crate::store::DraftStore;

/// Listing key carrying the audit records of overridden certified values.
const ORIGINAL_VALUES_KEY: &str = "originalCertifiedValues";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub listing_id: String,
    pub field_count: usize,
    pub certified_count: usize,
    pub photo_count: usize,
    /// The seller edited fields while the draft was loading, so the restored
    /// values only filled the gaps.
    pub merged_with_edits: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored(RestoreSummary),
    /// This listing was already restored into the store.
    AlreadyLoaded,
}

pub struct DraftRestore {
    client: DraftApiClient,
    store: DraftStore,
    schema: Arc<FieldSchema>,
    restored: Mutex<Option<String>>,
}

impl DraftRestore {
    #[must_use]
    pub fn new(client: DraftApiClient, store: DraftStore, schema: Arc<FieldSchema>) -> Self {
        Self {
            client,
            store,
            schema,
            restored: Mutex::new(None),
        }
    }

    fn lock_restored(&self) -> MutexGuard<'_, Option<String>> {
        self.restored.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads `listing_id` and hydrates the store with it, once.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::Api`] if the draft cannot be loaded or any of its
    /// sub-payloads is malformed. The store is untouched in that case and a
    /// later call may try again.
    pub async fn restore(&self, listing_id: &str) -> Result<RestoreOutcome, DraftError> {
        {
            let mut restored = self.lock_restored();
            if restored.as_deref() == Some(listing_id) {
                tracing::debug!(listing_id, "draft already restored");
                return Ok(RestoreOutcome::AlreadyLoaded);
            }
            *restored = Some(listing_id.to_owned());
        }

        let baseline = self.store.edit_seq();
        let draft = match self.load(listing_id).await {
            Ok(draft) => draft,
            Err(e) => {
                let mut restored = self.lock_restored();
                if restored.as_deref() == Some(listing_id) {
                    *restored = None;
                }
                tracing::warn!(listing_id, error = %e, "draft restore failed");
                return Err(e.into());
            }
        };

        let summary = RestoreSummary {
            listing_id: listing_id.to_owned(),
            field_count: draft.fields.len(),
            certified_count: draft.certified_fields().count(),
            photo_count: draft.photos.len(),
            merged_with_edits: self.store.hydrate(draft, baseline),
        };
        tracing::info!(
            listing_id,
            fields = summary.field_count,
            certified = summary.certified_count,
            photos = summary.photo_count,
            merged = summary.merged_with_edits,
            "draft restored"
        );
        Ok(RestoreOutcome::Restored(summary))
    }

    async fn load(&self, listing_id: &str) -> Result<Draft, ApiError> {
        let payload = self.client.load_draft(listing_id).await?;
        build_draft(listing_id, &payload, &self.schema)
    }
}

/// Turns a loaded payload into a clean draft.
///
/// Schema fields found in the listing become declared values; certified
/// entries then upgrade the fields they name, provided those carry a value.
pub(crate) fn build_draft(
    listing_id: &str,
    payload: &LoadDraftPayload,
    schema: &FieldSchema,
) -> Result<Draft, ApiError> {
    let listing = payload.decode_listing()?;
    let certified = payload.decode_certified_fields()?;
    let mut photos = payload.decode_photos()?;
    photos.sort_by_key(|p| p.position);

    let mut draft = Draft {
        listing_id: Some(listing_id.to_owned()),
        photos,
        visibility_score: listing.get("visibilityScore").and_then(Value::as_f64),
        visibility_label: listing
            .get("visibilityLabel")
            .and_then(Value::as_str)
            .map(str::to_owned),
        completion_percentage: listing.get("completionPercentage").and_then(Value::as_f64),
        ..Draft::default()
    };

    for name in schema.names() {
        let Some(value) = listing.get(name).and_then(FieldValue::from_json) else {
            continue;
        };
        if value.is_blank() {
            continue;
        }
        draft.fields.insert(
            name.to_owned(),
            FieldState {
                field_name: name.to_owned(),
                value: Some(value),
                provenance: Provenance::Declared,
                original_certified_value: None,
            },
        );
    }

    for entry in certified {
        match draft.fields.get_mut(&entry.field_name) {
            Some(state) => {
                state.provenance = Provenance::Certified(Certification {
                    source: entry.source,
                    certified_at: entry.source_timestamp,
                });
            }
            None => tracing::debug!(
                field = %entry.field_name,
                "certified entry has no restored value, skipping"
            ),
        }
    }

    if let Some(originals) = listing.get(ORIGINAL_VALUES_KEY).and_then(Value::as_object) {
        apply_original_values(&mut draft, originals);
    }

    Ok(draft)
}

fn apply_original_values(draft: &mut Draft, originals: &Map<String, Value>) {
    for (name, raw) in originals {
        if let (Some(state), Some(value)) =
            (draft.fields.get_mut(name), FieldValue::from_json(raw))
        {
            state.original_certified_value = Some(value);
        }
    }
}
