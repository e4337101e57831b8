//! Client-side engine for vehicle listing drafts.
//!
//! Reconciles seller-declared values with values certified by external
//! lookup sources into one [`DraftStore`], persists edits optimistically,
//! and keeps the server-computed score in sync.

mod epoch;
mod error;
pub mod orchestrator;
pub mod persistence;
pub mod restore;
pub mod resync;
pub mod score;
pub mod store;

pub use epoch::{Epoch, EpochTicket};
pub use error::DraftError;
pub use orchestrator::{AutoFillOrchestrator, LookupOutcome, LookupState, LookupView};
pub use persistence::{AutosaveHandle, DraftPersistence, PersistenceConfig, SaveOutcome, SaveTrigger};
pub use restore::{DraftRestore, RestoreOutcome, RestoreSummary};
pub use resync::{ResyncCoordinator, ResyncPhase, ResyncResult, ResyncView};
pub use store::DraftStore;
