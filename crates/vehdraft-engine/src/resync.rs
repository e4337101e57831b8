//! Resync Coordinator: surfaces degraded lookup sources and re-runs the lookup.
//!
//! The degraded list is never stored here. Every [`ResyncCoordinator::view`]
//! derives it from the orchestrator's latest sources, so a fresh lookup is
//! reflected immediately.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use vehdraft_core::{degraded_sources, SourceStatus};

use crate::orchestrator::{AutoFillOrchestrator, LookupOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncResult {
    pub updated_field_count: usize,
    /// Adapters that still failed on the resync lookup.
    pub failed_adapters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResyncPhase {
    #[default]
    Idle,
    /// Degraded sources were found and a resync can be offered.
    Checking,
    Syncing,
    Done(ResyncResult),
    Error(String),
}

/// What the staleness banner shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ResyncView {
    pub phase: ResyncPhase,
    pub degraded: Vec<SourceStatus>,
}

#[derive(Debug, Default)]
struct PhaseState {
    phase: ResyncPhase,
    /// Lookup generation a `Done`/`Error` phase belongs to.
    generation: u64,
    /// Lookup generation whose banner the seller dismissed.
    dismissed: Option<u64>,
}

pub struct ResyncCoordinator {
    orchestrator: Arc<AutoFillOrchestrator>,
    state: Mutex<PhaseState>,
}

impl ResyncCoordinator {
    #[must_use]
    pub fn new(orchestrator: Arc<AutoFillOrchestrator>) -> Self {
        Self {
            orchestrator,
            state: Mutex::new(PhaseState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PhaseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current banner, or `None` when idle with nothing degraded.
    ///
    /// A `Done` or `Error` outcome is dropped back to idle once a lookup
    /// other than the resync itself has replaced the source list.
    #[must_use]
    pub fn view(&self) -> Option<ResyncView> {
        let lookup = self.orchestrator.view();
        let degraded = degraded_sources(&lookup.sources);
        let mut state = self.lock();
        if matches!(state.phase, ResyncPhase::Done(_) | ResyncPhase::Error(_))
            && state.generation != lookup.generation
        {
            state.phase = ResyncPhase::Idle;
        }
        let phase = state.phase.clone();
        let dismissed = state.dismissed == Some(lookup.generation);
        drop(state);

        let quiet = matches!(phase, ResyncPhase::Idle | ResyncPhase::Checking);
        if quiet && (degraded.is_empty() || dismissed) {
            return None;
        }
        Some(ResyncView { phase, degraded })
    }

    /// Inspects the latest sources and offers a resync when some are degraded.
    pub fn check(&self) -> Option<ResyncView> {
        let lookup = self.orchestrator.view();
        let degraded = degraded_sources(&lookup.sources);
        {
            let mut state = self.lock();
            let dismissed = state.dismissed == Some(lookup.generation);
            match state.phase {
                ResyncPhase::Idle if !degraded.is_empty() && !dismissed => {
                    tracing::debug!(degraded = degraded.len(), "degraded lookup sources detected");
                    state.phase = ResyncPhase::Checking;
                }
                ResyncPhase::Checking if degraded.is_empty() => state.phase = ResyncPhase::Idle,
                _ => {}
            }
        }
        self.view()
    }

    /// Re-runs the lookup for the identifier of the latest lookup.
    ///
    /// Ends in `Done` when the lookup came back, even if individual adapters
    /// failed again, and in `Error` only when the call itself failed.
    pub async fn on_resync(&self) -> ResyncPhase {
        let Some((identifier, kind)) = self.orchestrator.view().identifier else {
            return self.finish(ResyncPhase::Error("no lookup to resync".to_owned()));
        };
        {
            let mut state = self.lock();
            if state.phase == ResyncPhase::Syncing {
                return ResyncPhase::Syncing;
            }
            state.phase = ResyncPhase::Syncing;
        }
        tracing::info!(identifier = %identifier, kind = %kind, "resync started");

        let phase = match self.orchestrator.lookup(&identifier, kind).await {
            LookupOutcome::Applied {
                fields_updated,
                sources,
                ..
            } => ResyncPhase::Done(ResyncResult {
                updated_field_count: fields_updated,
                failed_adapters: failed_adapters(&sources),
            }),
            LookupOutcome::AllSourcesFailed { sources } => ResyncPhase::Done(ResyncResult {
                updated_field_count: 0,
                failed_adapters: failed_adapters(&sources),
            }),
            LookupOutcome::Failed { message, .. } => ResyncPhase::Error(message),
            LookupOutcome::Superseded => {
                tracing::debug!("resync superseded by a newer lookup");
                ResyncPhase::Idle
            }
        };
        self.finish(phase)
    }

    fn finish(&self, phase: ResyncPhase) -> ResyncPhase {
        match &phase {
            ResyncPhase::Done(result) => tracing::info!(
                updated = result.updated_field_count,
                still_failed = result.failed_adapters.len(),
                "resync finished"
            ),
            ResyncPhase::Error(message) => tracing::warn!(error = %message, "resync failed"),
            _ => {}
        }
        let mut state = self.lock();
        state.phase = phase.clone();
        state.generation = self.orchestrator.view().generation;
        phase
    }

    /// Hides the banner until a new lookup replaces the source list.
    pub fn dismiss(&self) {
        let generation = self.orchestrator.view().generation;
        let mut state = self.lock();
        if state.phase != ResyncPhase::Syncing {
            state.phase = ResyncPhase::Idle;
            state.dismissed = Some(generation);
        }
    }
}

fn failed_adapters(sources: &[SourceStatus]) -> Vec<String> {
    sources
        .iter()
        .filter(|s| s.is_failed())
        .map(|s| s.adapter_key.clone())
        .collect()
}
