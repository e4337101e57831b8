//! The listing draft aggregate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::{FieldState, FieldValue};

/// A photo already attached to a saved draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPhoto {
    pub url: String,
    #[serde(default)]
    pub position: u32,
}

/// Server-computed documentation metrics. `None` means "not reported".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    #[serde(default)]
    pub visibility_score: Option<f64>,
    #[serde(default)]
    pub visibility_label: Option<String>,
    #[serde(default)]
    pub completion_percentage: Option<f64>,
}

impl ScoreUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visibility_score.is_none()
            && self.visibility_label.is_none()
            && self.completion_percentage.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// `None` until the first successful save.
    pub listing_id: Option<String>,
    pub fields: BTreeMap<String, FieldState>,
    pub photos: Vec<DraftPhoto>,
    pub visibility_score: Option<f64>,
    pub visibility_label: Option<String>,
    pub completion_percentage: Option<f64>,
    pub is_dirty: bool,
    pub is_saving: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl Draft {
    /// Values of every field that carries a usable value.
    #[must_use]
    pub fn non_empty_values(&self) -> BTreeMap<String, FieldValue> {
        self.fields
            .iter()
            .filter(|(_, state)| !state.is_empty())
            .filter_map(|(name, state)| state.value.clone().map(|v| (name.clone(), v)))
            .collect()
    }

    /// Fields currently backed by a certification.
    pub fn certified_fields(&self) -> impl Iterator<Item = &FieldState> {
        self.fields
            .values()
            .filter(|state| state.certified_source().is_some())
    }
}
