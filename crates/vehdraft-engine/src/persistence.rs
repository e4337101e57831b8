//! Draft Persistence Engine.
//!
//! Two independent paths write the draft back to the backend:
//!
//! - **Per-field sync.** Every edit is applied to the store immediately and a
//!   debounce timer keyed by field name is (re)started. When it fires, the
//!   latest value is sent on its own. A rejected edit rolls the field back to
//!   what it held immediately before that edit was applied.
//! - **Whole-draft save.** All non-empty values plus the certified field list
//!   go out as one unit, either on demand or from the periodic autosave when
//!   the draft is dirty. Only one save runs at a time.
//!
//! Both paths feed the returned score into the store through [`crate::score`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use vehdraft_client::{DraftApiClient, SaveDraftRequest};
use vehdraft_core::{AppConfig, FieldState, FieldValue, Provenance};

use crate::error::DraftError;
use crate::score;
use crate::store::DraftStore;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceConfig {
    /// Quiet period after the last edit of a field before it is synced.
    pub debounce: Duration,
    pub autosave_interval: Duration,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
        }
    }
}

impl PersistenceConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.field_sync_debounce_ms),
            autosave_interval: Duration::from_secs(config.autosave_interval_secs),
        }
    }
}

/// Who asked for a whole-draft save. Decides how a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    /// The seller pressed save: failures are returned as errors.
    Manual,
    /// The periodic autosave: failures are only logged.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { listing_id: Option<String> },
    /// Another whole-draft save was already in flight.
    AlreadySaving,
    /// Autosave found nothing dirty.
    NothingToSave,
    /// An autosave failed. The draft stays dirty for the next attempt.
    FailedQuietly,
}

struct PendingSync {
    seq: u64,
    /// Field state right after the latest optimistic edit.
    optimistic: FieldState,
    /// Field state immediately before the latest optimistic edit.
    snapshot: Option<FieldState>,
    timer: JoinHandle<()>,
}

struct Inner {
    client: DraftApiClient,
    store: DraftStore,
    config: PersistenceConfig,
    pending: Mutex<HashMap<String, PendingSync>>,
    next_seq: AtomicU64,
}

pub struct DraftPersistence {
    inner: Arc<Inner>,
}

impl DraftPersistence {
    #[must_use]
    pub fn new(client: DraftApiClient, store: DraftStore, config: PersistenceConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                store,
                config,
                pending: Mutex::new(HashMap::new()),
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &DraftStore {
        &self.inner.store
    }

    /// Applies a seller edit to the store and schedules its remote sync.
    ///
    /// Blank values are stored as empty. Must be called inside a tokio
    /// runtime.
    pub fn update_field(&self, field_name: &str, value: Option<FieldValue>) {
        let value = value.filter(|v| !v.is_blank());
        let provenance = Provenance::for_user_value(value.as_ref());
        let inner = &self.inner;

        let mut pending = inner.lock_pending();
        if let Some(previous) = pending.remove(field_name) {
            previous.timer.abort();
        }
        let snapshot = inner.store.field_state(field_name);

        inner.store.update_field(field_name, value, provenance);
        let Some(optimistic) = inner.store.field_state(field_name) else {
            return;
        };

        let seq = inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let task_inner = Arc::clone(inner);
        let task_field = field_name.to_owned();
        let debounce = inner.config.debounce;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            task_inner.fire(&task_field, seq).await;
        });

        tracing::debug!(field = %field_name, seq, "field sync scheduled");
        pending.insert(
            field_name.to_owned(),
            PendingSync {
                seq,
                optimistic,
                snapshot,
                timer,
            },
        );
    }

    /// Names of fields whose debounce timer has not fired yet.
    #[must_use]
    pub fn pending_fields(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock_pending().keys().cloned().collect();
        names.sort();
        names
    }

    /// Fires every pending field sync now and waits for them to finish.
    pub async fn flush(&self) {
        let drained: Vec<(String, PendingSync)> = self.inner.lock_pending().drain().collect();
        for (field_name, pending) in drained {
            pending.timer.abort();
            self.inner.sync(&field_name, pending.optimistic, pending.snapshot).await;
        }
    }

    /// Saves the whole draft.
    ///
    /// An autosave is skipped when the draft is clean. While another save is
    /// in flight this returns [`SaveOutcome::AlreadySaving`] without a request.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::SaveFailed`] when a manual save fails. Autosave
    /// failures are logged and reported as [`SaveOutcome::FailedQuietly`].
    pub async fn save_draft(&self, trigger: SaveTrigger) -> Result<SaveOutcome, DraftError> {
        self.inner.save_draft(trigger).await
    }

    /// Starts the periodic autosave. It stops when the handle is dropped or
    /// this engine goes away.
    #[must_use]
    pub fn start_autosave(&self) -> AutosaveHandle {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.autosave_interval;
        let task = tokio::spawn(autosave_loop(weak, period));
        tracing::info!(interval_secs = period.as_secs(), "autosave started");
        AutosaveHandle { task: Some(task) }
    }

    /// Cancels every pending debounce timer. Edits whose sync had not fired
    /// stay in the store and go out with the next whole-draft save.
    pub fn shutdown(&self) {
        let drained: Vec<(String, PendingSync)> = self.inner.lock_pending().drain().collect();
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "cancelling pending field syncs");
        }
        for (_, pending) in drained {
            pending.timer.abort();
        }
    }
}

impl Drop for DraftPersistence {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn lock_pending(&self) -> MutexGuard<'_, HashMap<String, PendingSync>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Debounce timer callback. A timer that was superseded by a newer edit
    /// finds someone else's entry and does nothing.
    async fn fire(&self, field_name: &str, seq: u64) {
        let entry = {
            let mut pending = self.lock_pending();
            match pending.get(field_name) {
                Some(entry) if entry.seq == seq => pending.remove(field_name),
                _ => None,
            }
        };
        if let Some(entry) = entry {
            self.sync(field_name, entry.optimistic, entry.snapshot).await;
        }
    }

    async fn sync(&self, field_name: &str, optimistic: FieldState, snapshot: Option<FieldState>) {
        let Some(listing_id) = self.store.listing_id() else {
            tracing::debug!(field = %field_name, "no listing yet, field goes out with the next save");
            return;
        };

        match self
            .client
            .update_field(&listing_id, field_name, optimistic.value.as_ref())
            .await
        {
            Ok(response) => {
                score::publish_field_sync(&self.store, &response);
                if let Some(previous) = response.previous_certified_value {
                    self.store.set_original_certified_value(field_name, previous);
                }
                tracing::debug!(listing_id = %listing_id, field = %field_name, "field synced");
            }
            Err(e) => {
                let rolled_back = self.store.rollback_field(field_name, &optimistic, snapshot);
                tracing::warn!(
                    listing_id = %listing_id,
                    field = %field_name,
                    error = %e,
                    rolled_back,
                    "field sync rejected"
                );
            }
        }
    }

    async fn save_draft(&self, trigger: SaveTrigger) -> Result<SaveOutcome, DraftError> {
        if trigger == SaveTrigger::Auto && !self.store.is_dirty() {
            return Ok(SaveOutcome::NothingToSave);
        }
        let Some(ticket) = self.store.begin_save() else {
            tracing::debug!(?trigger, "save already in flight");
            return Ok(SaveOutcome::AlreadySaving);
        };

        let request = SaveDraftRequest::from_draft(ticket.snapshot());
        match self.client.save_draft(&request).await {
            Ok(response) => {
                score::publish_save(&self.store, &response);
                self.store
                    .finish_save(ticket, response.listing_id, Utc::now());
                let listing_id = self.store.listing_id();
                tracing::info!(?trigger, listing_id = ?listing_id, fields = request.fields.len(), "draft saved");
                Ok(SaveOutcome::Saved { listing_id })
            }
            Err(e) => {
                self.store.abort_save(ticket);
                match trigger {
                    SaveTrigger::Manual => {
                        tracing::warn!(error = %e, "draft save failed");
                        Err(DraftError::SaveFailed { source: e })
                    }
                    SaveTrigger::Auto => {
                        tracing::warn!(error = %e, "autosave failed, will retry on next tick");
                        Ok(SaveOutcome::FailedQuietly)
                    }
                }
            }
        }
    }
}

const MIN_AUTOSAVE_INTERVAL: Duration = Duration::from_millis(1);

async fn autosave_loop(inner: Weak<Inner>, period: Duration) {
    // `interval` panics on a zero period.
    let mut ticker = tokio::time::interval(period.max(MIN_AUTOSAVE_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            tracing::debug!("persistence engine dropped, autosave exiting");
            return;
        };
        if let Err(e) = inner.save_draft(SaveTrigger::Auto).await {
            tracing::error!(error = %e, "autosave returned an error");
        }
    }
}

/// Running autosave task. Aborted on drop.
#[derive(Debug)]
pub struct AutosaveHandle {
    task: Option<JoinHandle<()>>,
}

impl AutosaveHandle {
    pub fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
