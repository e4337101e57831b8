//! Per-field state of a listing draft.
//!
//! A field's value comes either from the seller (declared) or from an
//! external lookup source (certified). [`Provenance`] carries the
//! certification metadata inside the `Certified` variant, so a certified
//! field without a source and timestamp cannot be constructed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scalar value of a draft field: free text or a JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(serde_json::Number),
    Text(String),
}

impl FieldValue {
    /// `true` for text that is empty or whitespace-only. Numbers are never blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Number(_) => false,
            FieldValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Converts a JSON scalar into a field value. Arrays, objects, booleans
    /// and null have no field representation.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(FieldValue::Text(s.clone())),
            serde_json::Value::Number(n) => Some(FieldValue::Number(n.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    Empty,
    Declared,
    Certified,
}

impl std::fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldStatus::Empty => write!(f, "empty"),
            FieldStatus::Declared => write!(f, "declared"),
            FieldStatus::Certified => write!(f, "certified"),
        }
    }
}

/// Which external source certified a value, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub source: String,
    pub certified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Provenance {
    Empty,
    Declared,
    Certified(Certification),
}

impl Provenance {
    /// Provenance of a value typed by the seller: declared when non-empty.
    #[must_use]
    pub fn for_user_value(value: Option<&FieldValue>) -> Self {
        match value {
            Some(v) if !v.is_blank() => Provenance::Declared,
            _ => Provenance::Empty,
        }
    }

    #[must_use]
    pub fn status(&self) -> FieldStatus {
        match self {
            Provenance::Empty => FieldStatus::Empty,
            Provenance::Declared => FieldStatus::Declared,
            Provenance::Certified(_) => FieldStatus::Certified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldState {
    pub field_name: String,
    pub value: Option<FieldValue>,
    #[serde(flatten)]
    pub provenance: Provenance,
    /// What the certifying source said before the seller overrode it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_certified_value: Option<FieldValue>,
}

impl FieldState {
    #[must_use]
    pub fn empty(field_name: &str) -> Self {
        Self {
            field_name: field_name.to_owned(),
            value: None,
            provenance: Provenance::Empty,
            original_certified_value: None,
        }
    }

    /// Builds the state a lookup result maps to: certified when the source
    /// vouches for the value, declared otherwise.
    #[must_use]
    pub fn from_result(result: &CertifiedFieldResult) -> Self {
        let provenance = if result.is_certified {
            Provenance::Certified(Certification {
                source: result.source.clone(),
                certified_at: result.source_timestamp,
            })
        } else {
            Provenance::for_user_value(result.field_value.as_ref())
        };
        Self {
            field_name: result.field_name.clone(),
            value: result.field_value.clone(),
            provenance,
            original_certified_value: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> FieldStatus {
        self.provenance.status()
    }

    #[must_use]
    pub fn certified_source(&self) -> Option<&str> {
        match &self.provenance {
            Provenance::Certified(c) => Some(c.source.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn certified_timestamp(&self) -> Option<DateTime<Utc>> {
        match &self.provenance {
            Provenance::Certified(c) => Some(c.certified_at),
            _ => None,
        }
    }

    /// `true` when the field carries no usable value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.as_ref().is_none_or(FieldValue::is_blank)
    }

    /// Compares value and provenance, ignoring the audit record.
    #[must_use]
    pub fn same_content(&self, other: &FieldState) -> bool {
        self.value == other.value && self.provenance == other.provenance
    }
}

/// One field as returned by the multi-source lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertifiedFieldResult {
    pub field_name: String,
    #[serde(default)]
    pub field_value: Option<FieldValue>,
    pub source: String,
    pub source_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_certified: bool,
}
