//! Draft backend request and response types.
//!
//! The lookup and load endpoints return some sub-payloads as JSON-encoded
//! strings rather than nested objects; the `decode_*` helpers parse those
//! and report failures as [`ApiError::Deserialize`] with the sub-payload name
//! as context.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use vehdraft_core::{
    CertifiedFieldResult, Draft, DraftPhoto, FieldValue, IdentifierType, ScoreUpdate,
    SourceStatus,
};

use crate::error::ApiError;

fn decode_encoded<T: DeserializeOwned>(raw: &str, context: &str) -> Result<T, ApiError> {
    serde_json::from_str(raw).map_err(|e| ApiError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LookupRequest<'a> {
    pub identifier: &'a str,
    pub identifier_type: IdentifierType,
}

/// Aggregated lookup answer: both members are JSON-encoded arrays.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupPayload {
    pub fields: String,
    pub sources: String,
}

impl LookupPayload {
    /// # Errors
    ///
    /// Returns [`ApiError::Deserialize`] if `fields` is not a JSON array of
    /// certified field results.
    pub fn decode_fields(&self) -> Result<Vec<CertifiedFieldResult>, ApiError> {
        decode_encoded(&self.fields, "lookup.fields")
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Deserialize`] if `sources` is not a JSON array of
    /// source statuses.
    pub fn decode_sources(&self) -> Result<Vec<SourceStatus>, ApiError> {
        decode_encoded(&self.sources, "lookup.sources")
    }
}

// ---------------------------------------------------------------------------
// updateField
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateFieldRequest<'a> {
    pub listing_id: &'a str,
    pub field_name: &'a str,
    pub value: Option<&'a FieldValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFieldResponse {
    #[serde(default)]
    pub visibility_score: Option<f64>,
    /// Set by the backend when this edit overrode a certified value.
    #[serde(default)]
    pub previous_certified_value: Option<FieldValue>,
}

impl UpdateFieldResponse {
    #[must_use]
    pub fn score(&self) -> ScoreUpdate {
        ScoreUpdate {
            visibility_score: self.visibility_score,
            ..ScoreUpdate::default()
        }
    }
}

// ---------------------------------------------------------------------------
// saveDraft
// ---------------------------------------------------------------------------

/// A certified field as carried by a whole-draft save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertifiedFieldEntry {
    pub field_name: String,
    pub source: String,
    pub source_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDraftRequest {
    pub listing_id: Option<String>,
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub certified_fields: Vec<CertifiedFieldEntry>,
}

impl SaveDraftRequest {
    /// Serializes every non-empty field value plus the certified field list.
    #[must_use]
    pub fn from_draft(draft: &Draft) -> Self {
        let certified_fields = draft
            .certified_fields()
            .filter_map(|state| {
                Some(CertifiedFieldEntry {
                    field_name: state.field_name.clone(),
                    source: state.certified_source()?.to_owned(),
                    source_timestamp: state.certified_timestamp()?,
                })
            })
            .collect();
        Self {
            listing_id: draft.listing_id.clone(),
            fields: draft.non_empty_values(),
            certified_fields,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDraftResponse {
    pub success: bool,
    #[serde(default)]
    pub listing_id: Option<String>,
    #[serde(default)]
    pub visibility_score: Option<f64>,
    #[serde(default)]
    pub visibility_label: Option<String>,
    #[serde(default)]
    pub completion_percentage: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SaveDraftResponse {
    #[must_use]
    pub fn score(&self) -> ScoreUpdate {
        ScoreUpdate {
            visibility_score: self.visibility_score,
            visibility_label: self.visibility_label.clone(),
            completion_percentage: self.completion_percentage,
        }
    }
}

// ---------------------------------------------------------------------------
// loadDraft
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoadDraftRequest<'a> {
    pub listing_id: &'a str,
}

/// A previously saved draft: three JSON-encoded sub-payloads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadDraftPayload {
    pub listing: String,
    #[serde(default = "empty_json_array")]
    pub certified_fields: String,
    #[serde(default = "empty_json_array")]
    pub photos: String,
}

fn empty_json_array() -> String {
    "[]".to_owned()
}

impl LoadDraftPayload {
    /// # Errors
    ///
    /// Returns [`ApiError::Deserialize`] if `listing` is not a JSON object.
    pub fn decode_listing(&self) -> Result<serde_json::Map<String, serde_json::Value>, ApiError> {
        decode_encoded(&self.listing, "loadDraft.listing")
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Deserialize`] if `certifiedFields` is not a JSON
    /// array of certified field entries.
    pub fn decode_certified_fields(&self) -> Result<Vec<CertifiedFieldEntry>, ApiError> {
        decode_encoded(&self.certified_fields, "loadDraft.certifiedFields")
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Deserialize`] if `photos` is not a JSON array of photos.
    pub fn decode_photos(&self) -> Result<Vec<DraftPhoto>, ApiError> {
        decode_encoded(&self.photos, "loadDraft.photos")
    }
}
