//! HTTP client for the listing-draft backend.
//!
//! Wraps `reqwest` with JSON request/response handling, error-object
//! extraction for non-2xx answers, and retry of idempotent reads. The
//! draft-mutating endpoints live in `drafts.rs`.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use vehdraft_core::{AppConfig, IdentifierType};

use crate::error::ApiError;
use crate::retry::retry_with_backoff;
use crate::types::{LookupPayload, LookupRequest};

const DEFAULT_USER_AGENT: &str = "vehdraft/0.1 (listing-drafts)";

pub(crate) const LOOKUP_PATH: &str = "vehicle/lookup";
pub(crate) const UPDATE_FIELD_PATH: &str = "drafts/field";
pub(crate) const SAVE_DRAFT_PATH: &str = "drafts/save";
pub(crate) const LOAD_DRAFT_PATH: &str = "drafts/load";

/// Client for the listing-draft backend.
///
/// Use [`DraftApiClient::from_config`] in the binary or
/// [`DraftApiClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct DraftApiClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl DraftApiClient {
    /// Creates a client from application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`ApiError::InvalidBaseUrl`] if the configured base
    /// URL does not parse.
    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        Ok(Self::build(
            &config.api_base_url,
            config.request_timeout(),
            &config.user_agent,
        )?
        .with_retry_policy(config.max_retries, config.retry_backoff_base_ms))
    }

    /// Creates a client with a custom base URL and no read retries.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`ApiError::InvalidBaseUrl`] if `base_url` is not a
    /// valid URL.
    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        Self::build(base_url, Duration::from_secs(timeout_secs), DEFAULT_USER_AGENT)
    }

    fn build(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `Url::join` appends to the base path
        // instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ApiError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    /// Sets how many times idempotent reads are retried on transient errors.
    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Runs the multi-source lookup for a normalized vehicle identifier.
    ///
    /// The backend fans out to every adapter and answers with JSON-encoded
    /// `fields` and `sources`; decoding them is left to the caller so a
    /// malformed sub-payload can be told apart from a transport failure.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Http`] on network failure.
    /// - [`ApiError::Rejected`] on a non-2xx answer.
    /// - [`ApiError::Deserialize`] if the envelope does not match.
    pub async fn lookup(
        &self,
        identifier: &str,
        identifier_type: IdentifierType,
    ) -> Result<LookupPayload, ApiError> {
        let body = &LookupRequest {
            identifier,
            identifier_type,
        };
        retry_with_backoff(self.max_retries, self.backoff_base_ms, LOOKUP_PATH, move || {
            self.post_json(LOOKUP_PATH, body)
        })
        .await
    }

    pub(crate) fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub(crate) fn backoff_base_ms(&self) -> u64 {
        self.backoff_base_ms
    }

    /// Resolves an endpoint path against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    /// Sends a JSON POST, maps non-2xx answers to [`ApiError::Rejected`],
    /// and parses the body as `T`.
    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Rejected {
                endpoint: path.to_owned(),
                status: status.as_u16(),
                message: error_message(&text, status),
            });
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Deserialize {
            context: path.to_owned(),
            source: e,
        })
    }
}

/// Pulls the human-readable message out of a backend error object.
///
/// Accepts `{"message": ...}` and `{"error": ...}`; falls back to the raw
/// body, then to the status reason.
pub(crate) fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let from_object = parsed.as_ref().and_then(|v| {
        v.get("message")
            .or_else(|| v.get("error"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
    });

    from_object
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_owned()
        })
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
