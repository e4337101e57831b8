use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

static FIELD_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Date,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Text => write!(f, "text"),
            FieldKind::Number => write!(f, "number"),
            FieldKind::Date => write!(f, "date"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: FieldKind,
}

fn default_kind() -> FieldKind {
    FieldKind::Text
}

impl FieldSpec {
    /// Human-readable label, falling back to the field name.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// The set of draft fields the backend knows about.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSchema {
    pub fields: Vec<FieldSpec>,
}

impl FieldSchema {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Load and validate the field schema from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_field_schema(path: &Path) -> Result<FieldSchema, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SchemaFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let schema: FieldSchema =
        serde_yaml::from_str(&content).map_err(ConfigError::SchemaFileParse)?;

    validate_schema(&schema)?;

    Ok(schema)
}

fn validate_schema(schema: &FieldSchema) -> Result<(), ConfigError> {
    if schema.fields.is_empty() {
        return Err(ConfigError::Validation(
            "field schema must declare at least one field".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for field in &schema.fields {
        if !FIELD_NAME_RE.is_match(&field.name) {
            return Err(ConfigError::Validation(format!(
                "invalid field name '{}'; expected a letter followed by letters, digits or '_'",
                field.name
            )));
        }

        if !seen.insert(field.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate field name: '{}'",
                field.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
