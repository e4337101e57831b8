mod app_config;
mod config;
pub mod draft;
pub mod field;
pub mod identifier;
pub mod schema;
pub mod source;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use draft::{Draft, DraftPhoto, ScoreUpdate};
pub use field::{CertifiedFieldResult, Certification, FieldState, FieldStatus, FieldValue, Provenance};
pub use identifier::{normalize_identifier, IdentifierType};
pub use schema::{load_field_schema, FieldKind, FieldSchema, FieldSpec};
pub use source::{degraded_sources, AdapterStatus, CacheStatus, SourceStatus};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid {kind} identifier '{value}': {reason}")]
    InvalidIdentifier {
        kind: IdentifierType,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read field schema file {path}: {source}")]
    SchemaFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse field schema file: {0}")]
    SchemaFileParse(#[from] serde_yaml::Error),

    #[error("field schema validation failed: {0}")]
    Validation(String),
}
