//! Field State Store: the authoritative client-side view of a draft.
//!
//! [`DraftStore`] is a cloneable handle over one owned [`Draft`]. Every
//! mutation bumps a version counter and notifies subscribers. Field-content
//! mutations also bump a separate edit sequence, which lets writers that
//! suspended on the network (saves, restores) detect that the fields moved
//! underneath them and merge instead of overwriting.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use vehdraft_core::{CertifiedFieldResult, Draft, FieldState, FieldValue, Provenance, ScoreUpdate};

#[derive(Debug, Clone)]
pub struct DraftStore {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<StoreState>,
    versions: watch::Sender<u64>,
}

#[derive(Debug, Default)]
struct StoreState {
    draft: Draft,
    version: u64,
    edit_seq: u64,
}

/// What a mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    None,
    Meta,
    Fields,
}

/// Proof that the caller holds the single whole-draft save slot.
#[derive(Debug)]
pub struct SaveTicket {
    edit_seq: u64,
    snapshot: Draft,
}

impl SaveTicket {
    /// The draft as it was when the save started.
    #[must_use]
    pub fn snapshot(&self) -> &Draft {
        &self.snapshot
    }
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftStore {
    #[must_use]
    pub fn new() -> Self {
        let (versions, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(StoreState::default()),
                versions,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Draft) -> (R, Change)) -> R {
        let (result, version) = {
            let mut state = self.lock();
            let (result, change) = f(&mut state.draft);
            if change == Change::None {
                return result;
            }
            if change == Change::Fields {
                state.edit_seq += 1;
            }
            state.version += 1;
            (result, state.version)
        };
        self.shared.versions.send_replace(version);
        result
    }

    /// Receives the store version after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.versions.subscribe()
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Sequence number of the last field-content mutation.
    #[must_use]
    pub fn edit_seq(&self) -> u64 {
        self.lock().edit_seq
    }

    #[must_use]
    pub fn snapshot(&self) -> Draft {
        self.lock().draft.clone()
    }

    #[must_use]
    pub fn field_state(&self, field_name: &str) -> Option<FieldState> {
        self.lock().draft.fields.get(field_name).cloned()
    }

    #[must_use]
    pub fn listing_id(&self) -> Option<String> {
        self.lock().draft.listing_id.clone()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.lock().draft.is_dirty
    }

    /// Writes lookup results into the store.
    ///
    /// Each covered field is overwritten with the result's value and
    /// provenance; fields the results do not mention are left alone. An
    /// existing audit record survives the overwrite. Returns how many
    /// fields actually changed.
    pub fn initialize_fields(&self, results: &[CertifiedFieldResult]) -> usize {
        self.mutate(|draft| {
            let mut changed = 0;
            for result in results {
                let mut next = FieldState::from_result(result);
                if let Some(existing) = draft.fields.get(&result.field_name) {
                    next.original_certified_value = existing.original_certified_value.clone();
                    if existing.same_content(&next) {
                        continue;
                    }
                }
                draft.fields.insert(result.field_name.clone(), next);
                changed += 1;
            }
            if changed == 0 {
                return (0, Change::None);
            }
            draft.is_dirty = true;
            (changed, Change::Fields)
        })
    }

    /// Sets a field's value and provenance directly. Always marks the draft dirty.
    pub fn update_field(&self, field_name: &str, value: Option<FieldValue>, provenance: Provenance) {
        self.mutate(|draft| {
            let entry = draft
                .fields
                .entry(field_name.to_owned())
                .or_insert_with(|| FieldState::empty(field_name));
            entry.value = value;
            entry.provenance = provenance;
            draft.is_dirty = true;
            ((), Change::Fields)
        });
    }

    /// Records what a certified field held before the seller overrode it.
    ///
    /// No-op when the field has no entry. Returns whether the record was set.
    pub fn set_original_certified_value(&self, field_name: &str, value: FieldValue) -> bool {
        self.mutate(|draft| match draft.fields.get_mut(field_name) {
            Some(entry) if entry.original_certified_value.as_ref() != Some(&value) => {
                entry.original_certified_value = Some(value);
                (true, Change::Meta)
            }
            Some(_) => (true, Change::None),
            None => (false, Change::None),
        })
    }

    /// Restores a field to `snapshot` (or to empty when there is none), but
    /// only if it still holds `expected`. Returns whether the rollback applied.
    ///
    /// The audit record is never dropped by a rollback.
    pub fn rollback_field(
        &self,
        field_name: &str,
        expected: &FieldState,
        snapshot: Option<FieldState>,
    ) -> bool {
        self.mutate(|draft| {
            let Some(current) = draft.fields.get_mut(field_name) else {
                return (false, Change::None);
            };
            if !current.same_content(expected) {
                return (false, Change::None);
            }
            let audit = current.original_certified_value.take();
            let mut restored = snapshot.unwrap_or_else(|| FieldState::empty(field_name));
            restored.original_certified_value = restored.original_certified_value.or(audit);
            *current = restored;
            (true, Change::Fields)
        })
    }

    /// Overwrites whichever score metrics the update reports.
    pub fn apply_score(&self, update: &ScoreUpdate) -> bool {
        self.mutate(|draft| {
            let mut changed = false;
            if let Some(score) = update.visibility_score {
                changed |= draft.visibility_score != Some(score);
                draft.visibility_score = Some(score);
            }
            if let Some(label) = &update.visibility_label {
                changed |= draft.visibility_label.as_ref() != Some(label);
                draft.visibility_label = Some(label.clone());
            }
            if let Some(completion) = update.completion_percentage {
                changed |= draft.completion_percentage != Some(completion);
                draft.completion_percentage = Some(completion);
            }
            (changed, if changed { Change::Meta } else { Change::None })
        })
    }

    /// Claims the whole-draft save slot. `None` while another save is in flight.
    pub fn begin_save(&self) -> Option<SaveTicket> {
        let mut state = self.lock();
        if state.draft.is_saving {
            return None;
        }
        state.draft.is_saving = true;
        state.version += 1;
        let ticket = SaveTicket {
            edit_seq: state.edit_seq,
            snapshot: state.draft.clone(),
        };
        let version = state.version;
        drop(state);
        self.shared.versions.send_replace(version);
        Some(ticket)
    }

    /// Releases the save slot after a successful save.
    ///
    /// Adopts `listing_id` if the draft had none and stamps `saved_at`. The
    /// dirty flag is only cleared when no field changed since the save began;
    /// otherwise the newer edits still need persisting.
    pub fn finish_save(&self, ticket: SaveTicket, listing_id: Option<String>, saved_at: DateTime<Utc>) {
        let mut state = self.lock();
        let unchanged = state.edit_seq == ticket.edit_seq;
        let draft = &mut state.draft;
        draft.is_saving = false;
        if draft.listing_id.is_none() {
            draft.listing_id = listing_id;
        }
        draft.last_saved_at = Some(saved_at);
        if unchanged {
            draft.is_dirty = false;
        }
        state.version += 1;
        let version = state.version;
        drop(state);
        self.shared.versions.send_replace(version);
    }

    /// Releases the save slot after a failed save. The draft stays dirty.
    pub fn abort_save(&self, ticket: SaveTicket) {
        drop(ticket);
        self.mutate(|draft| {
            draft.is_saving = false;
            ((), Change::Meta)
        });
    }

    /// Replaces the draft with a restored one.
    ///
    /// If fields were edited since `baseline_edit_seq` was read, the restored
    /// draft is merged instead: restored fields only fill names that are
    /// missing or empty locally, and the draft stays dirty. Returns `true`
    /// when a merge happened.
    pub fn hydrate(&self, restored: Draft, baseline_edit_seq: u64) -> bool {
        let mut state = self.lock();
        let merged = state.edit_seq != baseline_edit_seq;
        if merged {
            let draft = &mut state.draft;
            for (name, field) in restored.fields {
                let fill = draft.fields.get(&name).is_none_or(FieldState::is_empty);
                if fill {
                    draft.fields.insert(name, field);
                }
            }
            if draft.listing_id.is_none() {
                draft.listing_id = restored.listing_id;
            }
            if draft.photos.is_empty() {
                draft.photos = restored.photos;
            }
            draft.visibility_score = draft.visibility_score.or(restored.visibility_score);
            if draft.visibility_label.is_none() {
                draft.visibility_label = restored.visibility_label;
            }
            draft.completion_percentage =
                draft.completion_percentage.or(restored.completion_percentage);
            draft.is_dirty = true;
        } else {
            state.draft = Draft {
                is_dirty: false,
                is_saving: false,
                ..restored
            };
        }
        state.edit_seq += 1;
        state.version += 1;
        let version = state.version;
        drop(state);
        self.shared.versions.send_replace(version);
        merged
    }

    /// Clears everything back to an empty draft.
    pub fn reset_draft_state(&self) {
        self.mutate(|draft| {
            *draft = Draft::default();
            ((), Change::Fields)
        });
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
