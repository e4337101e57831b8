use thiserror::Error;
use vehdraft_client::ApiError;

#[derive(Debug, Error)]
pub enum DraftError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A manual whole-draft save failed. The draft stays dirty, so the
    /// caller can offer to retry.
    #[error("draft save failed: {source}")]
    SaveFailed {
        #[source]
        source: ApiError,
    },
}

impl DraftError {
    /// `true` when the caller should offer a retry action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, DraftError::SaveFailed { .. })
    }
}
