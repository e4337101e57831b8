//! Score feedback: server-computed score metrics flow straight into the store.
//!
//! The visibility score, its label and the completion percentage are never
//! computed locally. Whatever a successful persistence call reports replaces
//! the corresponding draft metric; metrics it leaves out keep their value.

use vehdraft_client::{SaveDraftResponse, UpdateFieldResponse};
use vehdraft_core::ScoreUpdate;

use crate::store::DraftStore;

/// Applies a score update to the store. Returns whether any metric changed.
pub fn publish(store: &DraftStore, update: &ScoreUpdate) -> bool {
    if update.is_empty() {
        return false;
    }
    let changed = store.apply_score(update);
    if changed {
        tracing::debug!(
            score = ?update.visibility_score,
            label = ?update.visibility_label,
            completion = ?update.completion_percentage,
            "score updated"
        );
    }
    changed
}

pub fn publish_field_sync(store: &DraftStore, response: &UpdateFieldResponse) -> bool {
    publish(store, &response.score())
}

pub fn publish_save(store: &DraftStore, response: &SaveDraftResponse) -> bool {
    publish(store, &response.score())
}
