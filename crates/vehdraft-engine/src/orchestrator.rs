//! Auto-Fill Orchestrator: multi-source vehicle lookup into the draft store.
//!
//! A lookup cancels whatever lookup is still in flight, takes a fresh epoch
//! ticket and asks the aggregation endpoint for every source at once. The
//! response is committed only if no newer lookup began in the meantime; the
//! cancellation token merely stops the superseded task early, the epoch check
//! is what guarantees a stale response never reaches the store.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use vehdraft_client::{ApiError, DraftApiClient};
use vehdraft_core::{
    normalize_identifier, CertifiedFieldResult, IdentifierType, SourceStatus,
};

use crate::epoch::{Epoch, EpochTicket};
use crate::store::DraftStore;

pub const ALL_SOURCES_FAILED: &str = "all services unavailable";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LookupState {
    #[default]
    Idle,
    Loading,
    Success,
    Partial,
    Error(String),
}

/// What presentation code renders for the current lookup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LookupView {
    pub state: LookupState,
    /// Normalized identifier of the latest lookup.
    pub identifier: Option<(String, IdentifierType)>,
    pub fields: Vec<CertifiedFieldResult>,
    pub sources: Vec<SourceStatus>,
    /// Epoch generation the view belongs to. Changes with every new lookup.
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// Results reached the store. `state` is `Success` or `Partial`.
    Applied {
        state: LookupState,
        fields_updated: usize,
        sources: Vec<SourceStatus>,
    },
    /// Every adapter failed; the store was left alone.
    AllSourcesFailed { sources: Vec<SourceStatus> },
    /// Transport failure, malformed payload or invalid identifier.
    Failed { message: String, malformed: bool },
    /// A newer lookup (or a reset) took over before this one could commit.
    Superseded,
}

pub struct AutoFillOrchestrator {
    client: DraftApiClient,
    store: DraftStore,
    epoch: Epoch,
    in_flight: Mutex<Option<CancellationToken>>,
    view: watch::Sender<LookupView>,
}

impl AutoFillOrchestrator {
    #[must_use]
    pub fn new(client: DraftApiClient, store: DraftStore) -> Self {
        let (view, _) = watch::channel(LookupView::default());
        Self {
            client,
            store,
            epoch: Epoch::new(),
            in_flight: Mutex::new(None),
            view,
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn view(&self) -> LookupView {
        self.view.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LookupView> {
        self.view.subscribe()
    }

    #[must_use]
    pub fn store(&self) -> &DraftStore {
        &self.store
    }

    /// Runs a lookup for `identifier` and commits its results if it is still
    /// the latest lookup when the response arrives.
    pub async fn lookup(&self, identifier: &str, kind: IdentifierType) -> LookupOutcome {
        let normalized = normalize_identifier(identifier, kind);
        let (ticket, token, retained_sources) = {
            let mut in_flight = self.lock_in_flight();
            if let Some(previous) = in_flight.take() {
                previous.cancel();
            }
            let token = CancellationToken::new();
            *in_flight = Some(token.clone());
            let ticket = self.epoch.begin();

            // A failed re-lookup of the same vehicle keeps its last known sources.
            let previous = self.view.borrow().clone();
            let same_vehicle = matches!(
                (&normalized, &previous.identifier),
                (Ok(n), Some((id, k))) if id == n && *k == kind
            );
            let retained_sources = if same_vehicle {
                previous.sources
            } else {
                Vec::new()
            };
            if let Ok(n) = &normalized {
                self.view.send_replace(LookupView {
                    state: LookupState::Loading,
                    identifier: Some((n.clone(), kind)),
                    fields: Vec::new(),
                    sources: Vec::new(),
                    generation: ticket.generation(),
                });
            }
            (ticket, token, retained_sources)
        };

        let normalized = match normalized {
            Ok(normalized) => normalized,
            Err(e) => {
                tracing::warn!(identifier, kind = %kind, error = %e, "rejected lookup identifier");
                let message = e.to_string();
                return self.commit(ticket, |view| {
                    view.identifier = Some((identifier.trim().to_owned(), kind));
                    view.fields.clear();
                    view.sources.clear();
                    view.state = LookupState::Error(message.clone());
                    LookupOutcome::Failed {
                        message,
                        malformed: false,
                    }
                });
            }
        };
        tracing::info!(identifier = %normalized, kind = %kind, generation = ticket.generation(), "lookup started");

        let response = tokio::select! {
            () = token.cancelled() => {
                tracing::debug!(generation = ticket.generation(), "lookup cancelled");
                return LookupOutcome::Superseded;
            }
            response = self.client.lookup(&normalized, kind) => response,
        };

        let decoded = response.and_then(|payload| {
            let fields = payload.decode_fields()?;
            let sources = payload.decode_sources()?;
            Ok((fields, sources))
        });

        self.commit(ticket, |view| {
            view.identifier = Some((normalized.clone(), kind));
            match decoded {
                Ok((fields, sources)) => self.apply_results(view, fields, sources),
                Err(e) => {
                    tracing::warn!(identifier = %normalized, error = %e, "lookup failed");
                    let malformed = e.is_malformed();
                    let message = failure_message(&e);
                    view.sources = retained_sources;
                    view.state = LookupState::Error(message.clone());
                    LookupOutcome::Failed { message, malformed }
                }
            }
        })
    }

    /// Runs `apply` against the view, but only while `ticket` is current.
    ///
    /// The in-flight lock is held across the epoch check and the commit, so a
    /// lookup that begins concurrently either invalidates this ticket first
    /// or starts after the commit is visible.
    fn commit(
        &self,
        ticket: EpochTicket,
        apply: impl FnOnce(&mut LookupView) -> LookupOutcome,
    ) -> LookupOutcome {
        let mut in_flight = self.lock_in_flight();
        if !self.epoch.is_current(ticket) {
            tracing::debug!(generation = ticket.generation(), "discarding stale lookup response");
            return LookupOutcome::Superseded;
        }
        *in_flight = None;

        let mut view = self.view.borrow().clone();
        view.generation = ticket.generation();
        let outcome = apply(&mut view);
        self.view.send_replace(view);
        outcome
    }

    fn apply_results(
        &self,
        view: &mut LookupView,
        fields: Vec<CertifiedFieldResult>,
        sources: Vec<SourceStatus>,
    ) -> LookupOutcome {
        let failed = sources.iter().filter(|s| s.is_failed()).count();
        view.sources.clone_from(&sources);

        if !sources.is_empty() && failed == sources.len() {
            tracing::warn!(failed, "every lookup source failed");
            view.fields.clear();
            view.state = LookupState::Error(ALL_SOURCES_FAILED.to_owned());
            return LookupOutcome::AllSourcesFailed { sources };
        }

        let fields_updated = self.store.initialize_fields(&fields);
        let state = if failed == 0 {
            LookupState::Success
        } else {
            LookupState::Partial
        };
        tracing::info!(
            fields = fields.len(),
            fields_updated,
            sources = sources.len(),
            failed,
            "lookup applied"
        );
        view.fields = fields;
        view.state = state.clone();
        LookupOutcome::Applied {
            state,
            fields_updated,
            sources,
        }
    }

    /// Abandons any in-flight lookup and returns the view to idle.
    ///
    /// The draft store is left as is.
    pub fn reset(&self) {
        let mut in_flight = self.lock_in_flight();
        if let Some(token) = in_flight.take() {
            token.cancel();
        }
        let generation = self.epoch.invalidate();
        self.view.send_replace(LookupView {
            generation,
            ..LookupView::default()
        });
    }

    /// Cancels the in-flight lookup, if any. Its response will be dropped.
    pub fn shutdown(&self) {
        if let Some(token) = self.lock_in_flight().take() {
            token.cancel();
        }
        self.epoch.invalidate();
    }
}

impl Drop for AutoFillOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn failure_message(err: &ApiError) -> String {
    match err {
        ApiError::Rejected { message, .. } => message.clone(),
        ApiError::Deserialize { context, .. } => format!("malformed lookup response ({context})"),
        other => other.to_string(),
    }
}
