use thiserror::Error;

/// Errors returned by the draft backend client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status and an error object.
    #[error("backend rejected {endpoint} ({status}): {message}")]
    Rejected {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// `saveDraft` answered 2xx but reported `"success": false`.
    #[error("draft save was not accepted: {0}")]
    SaveNotAccepted(String),

    /// The response body, or one of its JSON-encoded sub-payloads, could not
    /// be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ApiError {
    /// `true` when the backend produced a response that could not be parsed,
    /// as opposed to a transport failure or an explicit rejection.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, ApiError::Deserialize { .. })
    }
}
