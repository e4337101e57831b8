//! Draft persistence endpoints for the backend client.

use vehdraft_core::FieldValue;

use crate::client::{DraftApiClient, LOAD_DRAFT_PATH, SAVE_DRAFT_PATH, UPDATE_FIELD_PATH};
use crate::error::ApiError;
use crate::retry::retry_with_backoff;
use crate::types::{
    LoadDraftPayload, LoadDraftRequest, SaveDraftRequest, SaveDraftResponse, UpdateFieldRequest,
    UpdateFieldResponse,
};

impl DraftApiClient {
    /// Persists a single field of an existing listing.
    ///
    /// The answer carries the recomputed visibility score and, when the edit
    /// replaced a certified value, what that value was. Never retried.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Rejected`] when the backend refuses the edit.
    /// - [`ApiError::Http`] on network failure.
    /// - [`ApiError::Deserialize`] if the response shape is unexpected.
    pub async fn update_field(
        &self,
        listing_id: &str,
        field_name: &str,
        value: Option<&FieldValue>,
    ) -> Result<UpdateFieldResponse, ApiError> {
        let body = UpdateFieldRequest {
            listing_id,
            field_name,
            value,
        };
        self.post_json(UPDATE_FIELD_PATH, &body).await
    }

    /// Saves the whole draft as one unit. Never retried.
    ///
    /// # Errors
    ///
    /// - [`ApiError::SaveNotAccepted`] when the backend answers
    ///   `"success": false`.
    /// - [`ApiError::Rejected`] on a non-2xx answer.
    /// - [`ApiError::Http`] on network failure.
    /// - [`ApiError::Deserialize`] if the response shape is unexpected.
    pub async fn save_draft(
        &self,
        request: &SaveDraftRequest,
    ) -> Result<SaveDraftResponse, ApiError> {
        let response: SaveDraftResponse = self.post_json(SAVE_DRAFT_PATH, request).await?;
        if !response.success {
            return Err(ApiError::SaveNotAccepted(
                response
                    .message
                    .clone()
                    .unwrap_or_else(|| "backend reported success=false".to_owned()),
            ));
        }
        Ok(response)
    }

    /// Loads a previously saved draft. Retried on transient errors.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Rejected`] on a non-2xx answer (e.g. unknown listing).
    /// - [`ApiError::Http`] on network failure.
    /// - [`ApiError::Deserialize`] if the envelope does not match.
    pub async fn load_draft(&self, listing_id: &str) -> Result<LoadDraftPayload, ApiError> {
        let body = &LoadDraftRequest { listing_id };
        retry_with_backoff(
            self.max_retries(),
            self.backoff_base_ms(),
            LOAD_DRAFT_PATH,
            move || self.post_json(LOAD_DRAFT_PATH, body),
        )
        .await
    }
}
