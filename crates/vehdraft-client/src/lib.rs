pub mod client;
mod drafts;
pub mod error;
mod retry;
pub mod types;

pub use client::DraftApiClient;
pub use error::ApiError;
pub use types::{
    CertifiedFieldEntry, LoadDraftPayload, LookupPayload, SaveDraftRequest, SaveDraftResponse,
    UpdateFieldResponse,
};
