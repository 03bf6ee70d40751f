//! Session service: entity store plus persistence gateway.
//!
//! # Responsibility
//! - Expose the operation surface used by UI/FFI/CLI callers.
//! - Pair every state change with a save attempt before returning.
//!
//! # Invariants
//! - Callers never observe a mutated state that has not been offered to the
//!   gateway.
//! - Save failures are kept as a warning (`last_save_error`) and never undo
//!   the in-memory mutation.
//! - Not-found updates/deletes are no-ops reported as `false`.
//! - A failed import leaves the state untouched.

use crate::clock::{default_clock, Clock};
use crate::codec::{self, CodecError};
use crate::id::{default_id_generator, IdGenerator};
use crate::model::note::{Note, NoteDraft, NotePatch};
use crate::model::state::AppState;
use crate::model::task::{CompletionState, Task, TaskDraft, TaskPatch};
use crate::model::transaction::{Transaction, TransactionDraft};
use crate::model::EntityId;
use crate::persistence::{
    LoadOutcome, LoadSource, PersistError, PersistenceGateway, StorageSlot,
};
use crate::query::{self, DayProgress, FinanceSummary};
use crate::schema::RepairReport;
use crate::store::{EntityStore, StoreError, StoreResult};
use chrono::NaiveDate;
use log::{debug, info, warn};

/// Use-case service over one storage slot.
pub struct LifeService<S: StorageSlot> {
    store: EntityStore,
    gateway: PersistenceGateway<S>,
    last_load: LoadOutcomeSummary,
    last_save_error: Option<PersistError>,
}

/// Load metadata kept after startup (the state itself moves into the store).
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcomeSummary {
    pub source: LoadSource,
    pub report: RepairReport,
}

impl<S: StorageSlot> LifeService<S> {
    /// Loads state from `gateway` with default id and clock strategies.
    pub fn open(gateway: PersistenceGateway<S>) -> Self {
        Self::open_with(gateway, default_id_generator(), default_clock())
    }

    /// Loads state from `gateway` with injected strategies.
    pub fn open_with(
        mut gateway: PersistenceGateway<S>,
        ids: Box<dyn IdGenerator + Send>,
        clock: Box<dyn Clock + Send>,
    ) -> Self {
        let LoadOutcome {
            state,
            source,
            report,
        } = gateway.load(ids.as_ref());
        let mut service = Self {
            store: EntityStore::new(state, ids, clock),
            gateway,
            last_load: LoadOutcomeSummary { source, report },
            last_save_error: None,
        };
        // Persist repairs right away so the slot holds a well-formed document.
        if !service.last_load.report.is_clean() {
            service.flush();
        }
        service
    }

    pub fn state(&self) -> &AppState {
        self.store.state()
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.store.transactions()
    }

    pub fn notes(&self) -> &[Note] {
        self.store.notes()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    pub fn last_load(&self) -> &LoadOutcomeSummary {
        &self.last_load
    }

    /// Most recent save failure, cleared by the next successful save.
    pub fn last_save_error(&self) -> Option<&PersistError> {
        self.last_save_error.as_ref()
    }

    /// Current calendar day according to the service clock.
    pub fn today(&self) -> NaiveDate {
        self.store.clock().today()
    }

    pub fn add_task(&mut self, draft: TaskDraft) -> EntityId {
        let id = self.store.add_task(draft);
        debug!("event=task_add module=service status=ok id={id}");
        self.flush();
        id
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> bool {
        let result = self.store.update_task(id, patch);
        self.finish("task_update", id, result)
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let removed = self.store.delete_task(id);
        self.finish_delete("task_delete", id, removed)
    }

    /// Toggles completion as seen on the clock's current day.
    pub fn toggle_task_completion(&mut self, id: &str) -> Option<CompletionState> {
        let today = self.today();
        self.toggle_task_completion_on(id, today)
    }

    /// Toggles completion as seen on `today`.
    pub fn toggle_task_completion_on(
        &mut self,
        id: &str,
        today: NaiveDate,
    ) -> Option<CompletionState> {
        match self.store.toggle_task_completion(id, today) {
            Ok(state) => {
                debug!("event=task_toggle module=service status=ok id={id} today={today}");
                self.flush();
                Some(state)
            }
            Err(err) => {
                debug!("event=task_toggle module=service status=noop error={err}");
                None
            }
        }
    }

    /// Records a transaction; `None` when the amount is not finite.
    pub fn add_transaction(&mut self, draft: TransactionDraft) -> Option<EntityId> {
        match self.store.add_transaction(draft) {
            Ok(id) => {
                debug!("event=transaction_add module=service status=ok id={id}");
                self.flush();
                Some(id)
            }
            Err(err) => {
                warn!("event=transaction_add module=service status=rejected error={err}");
                None
            }
        }
    }

    pub fn delete_transaction(&mut self, id: &str) -> bool {
        let removed = self.store.delete_transaction(id);
        self.finish_delete("transaction_delete", id, removed)
    }

    pub fn add_note(&mut self, draft: NoteDraft) -> EntityId {
        let id = self.store.add_note(draft);
        debug!("event=note_add module=service status=ok id={id}");
        self.flush();
        id
    }

    pub fn update_note(&mut self, id: &str, patch: NotePatch) -> bool {
        let result = self.store.update_note(id, patch);
        self.finish("note_update", id, result)
    }

    pub fn delete_note(&mut self, id: &str) -> bool {
        let removed = self.store.delete_note(id);
        self.finish_delete("note_delete", id, removed)
    }

    /// Clears every collection. Destructive; callers confirm beforehand.
    pub fn reset_all(&mut self) {
        let entities = self.store.state().len();
        self.store.reset_all();
        info!("event=state_reset module=service status=ok removed_entities={entities}");
        self.flush();
    }

    /// Pretty JSON backup of the full state.
    pub fn export_snapshot(&self) -> Result<String, CodecError> {
        codec::export_snapshot(self.store.state())
    }

    /// Replaces the full state from a backup document.
    ///
    /// Returns `false` (state unchanged) when the text is not a JSON object.
    pub fn import_snapshot(&mut self, text: &str) -> bool {
        let imported = match codec::import_snapshot(text, self.store.ids()) {
            Ok(imported) => imported,
            Err(err) => {
                warn!(
                    "event=snapshot_import module=service status=rejected bytes={} error={}",
                    text.len(),
                    err
                );
                return false;
            }
        };

        if let Err(err) = self.gateway.backup_current("before_import") {
            warn!("event=snapshot_import module=service status=backup_failed error={err}");
        }
        let report = imported.report;
        self.store.replace_state(imported.state);
        info!(
            "event=snapshot_import module=service status=ok entities={} dropped_records={} corrected_weekly={} regenerated_ids={}",
            self.store.state().len(),
            report.dropped_records,
            report.corrected_weekly_completions,
            report.regenerated_ids
        );
        self.flush();
        true
    }

    /// Tasks applying to `day`, open first, then by priority.
    pub fn agenda(&self, day: NaiveDate) -> Vec<&Task> {
        query::agenda_for(self.store.tasks(), day)
    }

    pub fn day_progress(&self, day: NaiveDate) -> DayProgress {
        query::day_progress(self.store.tasks(), day)
    }

    /// Notes in display order (pinned, then most recently updated).
    pub fn notes_for_display(&self) -> Vec<&Note> {
        query::notes_for_display(self.store.notes())
    }

    pub fn finance_summary(&self) -> FinanceSummary {
        query::finance_summary(self.store.transactions())
    }

    /// Writes the current state again, e.g. after a storage failure cleared.
    ///
    /// Returns whether the save succeeded.
    pub fn flush(&mut self) -> bool {
        match self.gateway.save(self.store.state()) {
            Ok(()) => {
                self.last_save_error = None;
                true
            }
            Err(err) => {
                warn!("event=state_flush module=service status=degraded error={err}");
                self.last_save_error = Some(err);
                false
            }
        }
    }

    fn finish(&mut self, event: &'static str, id: &str, result: StoreResult<()>) -> bool {
        match result {
            Ok(()) => {
                debug!("event={event} module=service status=ok id={id}");
                self.flush();
                true
            }
            Err(StoreError::NotFound { .. }) => {
                debug!("event={event} module=service status=noop reason=not_found id={id}");
                false
            }
            Err(err) => {
                warn!("event={event} module=service status=rejected id={id} error={err}");
                false
            }
        }
    }

    fn finish_delete(&mut self, event: &'static str, id: &str, removed: bool) -> bool {
        if removed {
            debug!("event={event} module=service status=ok id={id}");
            self.flush();
        } else {
            debug!("event={event} module=service status=noop reason=not_found id={id}");
        }
        removed
    }
}
