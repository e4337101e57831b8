//! Vehicle identifiers accepted by the multi-source lookup.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Registration plate in the `AA-123-AA` format, dashes and spaces optional.
static PLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]{2})[-\s]?([0-9]{3})[-\s]?([A-Z]{2})$").expect("valid regex")
});

/// 17-character VIN; I, O and Q are never used.
static VIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierType {
    Plate,
    Vin,
}

impl std::fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierType::Plate => write!(f, "plate"),
            IdentifierType::Vin => write!(f, "vin"),
        }
    }
}

impl std::str::FromStr for IdentifierType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plate" => Ok(IdentifierType::Plate),
            "vin" => Ok(IdentifierType::Vin),
            other => Err(format!("unknown identifier type '{other}'")),
        }
    }
}

/// Normalizes a raw identifier into the canonical form sent to the backend.
///
/// Plates come out as `AB-123-CD`; VINs are upper-cased with whitespace removed.
///
/// # Errors
///
/// Returns [`CoreError::InvalidIdentifier`] when the input does not match the
/// expected format for `kind`.
pub fn normalize_identifier(raw: &str, kind: IdentifierType) -> Result<String, CoreError> {
    let upper = raw.trim().to_ascii_uppercase();
    let invalid = |reason: &str| CoreError::InvalidIdentifier {
        kind,
        value: raw.to_owned(),
        reason: reason.to_owned(),
    };

    match kind {
        IdentifierType::Plate => {
            let caps = PLATE_RE
                .captures(&upper)
                .ok_or_else(|| invalid("expected a plate like AB-123-CD"))?;
            Ok(format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]))
        }
        IdentifierType::Vin => {
            let compact: String = upper.chars().filter(|c| !c.is_whitespace()).collect();
            if VIN_RE.is_match(&compact) {
                Ok(compact)
            } else {
                Err(invalid(
                    "expected 17 characters from A-Z and 0-9, excluding I, O and Q",
                ))
            }
        }
    }
}
