//! In-memory entity store.
//!
//! # Responsibility
//! - Own the task, transaction and note collections.
//! - Apply create/update/delete mutations and the completion toggle.
//!
//! # Invariants
//! - Tasks and transactions are appended; notes are prepended (newest first).
//! - `toggle_task_completion` is the only path that changes completion state.
//! - Weekly tasks never hold a `completed` flag (enforced by the model).
//! - Deletes are idempotent hard removals.
//! - The store never performs I/O; persistence is the caller's concern.

use crate::clock::Clock;
use crate::id::IdGenerator;
use crate::model::note::{Note, NoteDraft, NotePatch};
use crate::model::state::AppState;
use crate::model::task::{CompletionState, Task, TaskDraft, TaskPatch};
use crate::model::transaction::{normalize_category, Transaction, TransactionDraft};
use crate::model::{EntityId, ExtraFields};
use crate::recurrence::is_completed_on;
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity collections addressable by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Task,
    Transaction,
    Note,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Transaction => "transaction",
            Self::Note => "note",
        }
    }
}

/// Store-level mutation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    NotFound { kind: EntityKind, id: EntityId },
    /// Transaction amount is NaN or infinite.
    InvalidAmount(f64),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{} not found: {id}", kind.as_str()),
            Self::InvalidAmount(value) => write!(f, "transaction amount must be finite: {value}"),
        }
    }
}

impl Error for StoreError {}

/// Single owner of all entities for one session.
pub struct EntityStore {
    state: AppState,
    ids: Box<dyn IdGenerator + Send>,
    clock: Box<dyn Clock + Send>,
}

impl EntityStore {
    /// Creates a store over an initial state (typically from the gateway).
    pub fn new(
        state: AppState,
        ids: Box<dyn IdGenerator + Send>,
        clock: Box<dyn Clock + Send>,
    ) -> Self {
        Self { state, ids, clock }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.state.transactions
    }

    pub fn notes(&self) -> &[Note] {
        &self.state.notes
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.state.tasks.iter().find(|task| task.id == id)
    }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.state.transactions.iter().find(|tx| tx.id == id)
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.state.notes.iter().find(|note| note.id == id)
    }

    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Appends a new, not completed task and returns its id.
    pub fn add_task(&mut self, draft: TaskDraft) -> EntityId {
        let task = Task::new(self.ids.next_id(), draft, self.clock.now_millis());
        let id = task.id.clone();
        self.state.tasks.push(task);
        id
    }

    /// Merges `patch` into the task with `id`.
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> StoreResult<()> {
        let task = self.task_mut(id)?;
        task.apply_patch(patch);
        Ok(())
    }

    /// Removes the task with `id`. Returns whether anything was removed.
    pub fn delete_task(&mut self, id: &str) -> bool {
        remove_by(&mut self.state.tasks, |task| task.id == id)
    }

    /// Flips completion of the task with `id` as seen on `today`.
    ///
    /// - Recurring: done today -> cleared; otherwise stamped with `today`.
    /// - One-off: flag flipped; `false -> true` stamps `lastCompletedDate`,
    ///   `true -> false` leaves it untouched.
    pub fn toggle_task_completion(
        &mut self,
        id: &str,
        today: NaiveDate,
    ) -> StoreResult<CompletionState> {
        let task = self.task_mut(id)?;
        match task.completion() {
            CompletionState::Recurring(_) => {
                if is_completed_on(task, today) {
                    task.set_last_completed_date(None);
                } else {
                    task.set_last_completed_date(Some(today));
                }
            }
            CompletionState::Once(completed) => {
                task.set_once_completed(!completed);
                if !completed {
                    task.set_last_completed_date(Some(today));
                }
            }
        }
        Ok(task.completion())
    }

    /// Appends a new transaction and returns its id.
    ///
    /// # Errors
    /// - `StoreError::InvalidAmount` for NaN or infinite values.
    pub fn add_transaction(&mut self, draft: TransactionDraft) -> StoreResult<EntityId> {
        if !draft.value.is_finite() {
            return Err(StoreError::InvalidAmount(draft.value));
        }
        let transaction = Transaction {
            id: self.ids.next_id(),
            kind: draft.kind,
            value: draft.value.abs(),
            category: normalize_category(draft.category.as_deref()),
            date: draft.date,
            note: draft.note,
            created_at: self.clock.now_millis(),
            extra: ExtraFields::new(),
        };
        let id = transaction.id.clone();
        self.state.transactions.push(transaction);
        Ok(id)
    }

    pub fn delete_transaction(&mut self, id: &str) -> bool {
        remove_by(&mut self.state.transactions, |tx| tx.id == id)
    }

    /// Prepends a new note and returns its id.
    pub fn add_note(&mut self, draft: NoteDraft) -> EntityId {
        let note = Note::new(self.ids.next_id(), draft, self.clock.now_millis());
        let id = note.id.clone();
        self.state.notes.insert(0, note);
        id
    }

    /// Merges `patch` and refreshes `updatedAt`, even for an empty patch.
    pub fn update_note(&mut self, id: &str, patch: NotePatch) -> StoreResult<()> {
        let now = self.clock.now_millis();
        let note = self
            .state
            .notes
            .iter_mut()
            .find(|note| note.id == id)
            .ok_or_else(|| not_found(EntityKind::Note, id))?;
        note.apply_patch(patch, now);
        Ok(())
    }

    pub fn delete_note(&mut self, id: &str) -> bool {
        remove_by(&mut self.state.notes, |note| note.id == id)
    }

    /// Clears every collection. Top-level unknown fields are kept.
    pub fn reset_all(&mut self) {
        self.state.tasks.clear();
        self.state.transactions.clear();
        self.state.notes.clear();
    }

    /// Replaces the whole state (import path).
    pub fn replace_state(&mut self, state: AppState) {
        self.state = state;
    }

    fn task_mut(&mut self, id: &str) -> StoreResult<&mut Task> {
        self.state
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| not_found(EntityKind::Task, id))
    }
}

fn not_found(kind: EntityKind, id: &str) -> StoreError {
    StoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}

fn remove_by<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> bool {
    let before = items.len();
    items.retain(|item| !matches(item));
    items.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::id::SequentialIds;
    use crate::model::task::WeekdaySet;
    use crate::model::transaction::TransactionType;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn store_at(day: &str) -> (EntityStore, ManualClock) {
        let clock = ManualClock::on_day(date(day));
        let store = EntityStore::new(
            AppState::default(),
            Box::new(SequentialIds::new("id")),
            Box::new(clock.clone()),
        );
        (store, clock)
    }

    #[test]
    fn add_task_assigns_id_timestamp_and_open_state() {
        let (mut store, clock) = store_at("2024-01-08");
        let id = store.add_task(TaskDraft::new("pay rent", date("2024-01-10")));

        let task = store.task(&id).unwrap();
        assert_eq!(id, "id-1");
        assert_eq!(task.created_at, clock.now_millis());
        assert_eq!(task.completion(), CompletionState::Once(false));
    }

    #[test]
    fn recurring_toggle_is_an_involution_per_day() {
        let (mut store, _) = store_at("2024-01-08");
        let draft =
            TaskDraft::new("stretch", date("2024-01-01")).weekly(WeekdaySet::from_indices([1]));
        let id = store.add_task(draft);
        let today = date("2024-01-08");

        let first = store.toggle_task_completion(&id, today).unwrap();
        assert_eq!(first, CompletionState::Recurring(Some(today)));
        let second = store.toggle_task_completion(&id, today).unwrap();
        assert_eq!(second, CompletionState::Recurring(None));
        assert!(!store.task(&id).unwrap().completed_flag());
    }

    #[test]
    fn recurring_toggle_on_new_day_marks_done_again() {
        let (mut store, _) = store_at("2024-01-08");
        let draft =
            TaskDraft::new("stretch", date("2024-01-01")).weekly(WeekdaySet::from_indices([1]));
        let id = store.add_task(draft);

        store.toggle_task_completion(&id, date("2024-01-08")).unwrap();
        let state = store.toggle_task_completion(&id, date("2024-01-15")).unwrap();
        assert_eq!(state, CompletionState::Recurring(Some(date("2024-01-15"))));
    }

    #[test]
    fn once_undo_keeps_last_completed_date() {
        let (mut store, _) = store_at("2024-01-08");
        let id = store.add_task(TaskDraft::new("dentist", date("2024-01-08")));

        store.toggle_task_completion(&id, date("2024-01-08")).unwrap();
        let undone = store.toggle_task_completion(&id, date("2024-01-09")).unwrap();

        let task = store.task(&id).unwrap();
        assert_eq!(undone, CompletionState::Once(false));
        assert_eq!(task.last_completed_date(), Some(date("2024-01-08")));
    }

    #[test]
    fn update_task_merges_given_fields_only() {
        let (mut store, _) = store_at("2024-01-08");
        let id = store.add_task(
            TaskDraft::new("pay rent", date("2024-01-10")).description("bank transfer"),
        );
        store.toggle_task_completion(&id, date("2024-01-08")).unwrap();

        store
            .update_task(
                &id,
                TaskPatch {
                    title: Some("pay rent early".to_string()),
                    date: Some(date("2024-01-09")),
                    priority: Some(crate::model::task::Priority::High),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        let task = store.task(&id).unwrap();
        assert_eq!(task.title, "pay rent early");
        assert_eq!(task.date, date("2024-01-09"));
        assert_eq!(task.priority, crate::model::task::Priority::High);
        assert_eq!(task.description.as_deref(), Some("bank transfer"));
        assert_eq!(task.completion(), CompletionState::Once(true));

        let err = store
            .update_task("missing", TaskPatch::default())
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                kind: EntityKind::Task,
                id: "missing".to_string()
            }
        );
    }

    #[test]
    fn toggle_unknown_task_reports_not_found() {
        let (mut store, _) = store_at("2024-01-08");
        let err = store
            .toggle_task_completion("missing", date("2024-01-08"))
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                kind: EntityKind::Task,
                id: "missing".to_string()
            }
        );
    }

    #[test]
    fn notes_are_prepended_and_update_refreshes_timestamp() {
        let (mut store, clock) = store_at("2024-01-08");
        let first = store.add_note(NoteDraft::new("a", "first"));
        let second = store.add_note(NoteDraft::new("b", "second"));
        assert_eq!(store.notes()[0].id, second);

        clock.advance_millis(5_000);
        store.update_note(&first, NotePatch::default()).unwrap();
        assert_eq!(store.note(&first).unwrap().updated_at, clock.now_millis());
        assert_eq!(store.note(&first).unwrap().content, "first");
    }

    #[test]
    fn transactions_default_category_and_reject_non_finite_amounts() {
        let (mut store, _) = store_at("2024-01-08");
        let id = store
            .add_transaction(TransactionDraft::new(
                TransactionType::Expense,
                -42.5,
                date("2024-01-08"),
            ))
            .unwrap();
        let tx = store.transaction(&id).unwrap();
        assert_eq!(tx.value, 42.5);
        assert_eq!(tx.category, "General");

        let err = store
            .add_transaction(TransactionDraft::new(
                TransactionType::Income,
                f64::NAN,
                date("2024-01-08"),
            ))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidAmount(_)));
        assert_eq!(store.transactions().len(), 1);
    }

    #[test]
    fn deletes_are_idempotent() {
        let (mut store, _) = store_at("2024-01-08");
        let id = store.add_task(TaskDraft::new("temp", date("2024-01-08")));
        store.add_task(TaskDraft::new("keep", date("2024-01-08")));

        assert!(store.delete_task(&id));
        let after_first = store.tasks().to_vec();
        assert!(!store.delete_task(&id));
        assert_eq!(store.tasks(), after_first.as_slice());
    }
}
