//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Translate loosely typed UI input (strings, day indices) into engine
//!   drafts and patches.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every mutation reports a non-fatal `save_warning` when persisting failed;
//!   the mutation itself is kept.
//! - Dates cross the boundary as `YYYY-MM-DD` strings.

use crate::session::with_session;
use chrono::NaiveDate;
use lifesync_core::recurrence::is_completed_on;
use lifesync_core::schema::parse_calendar_date;
use lifesync_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    LifeService, NoteDraft, NotePatch, Priority, Recurrence, StorageSlot, TaskDraft, TaskPatch,
    TransactionDraft, TransactionType, WeekdaySet,
};

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes engine logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether the operation was applied.
    pub ok: bool,
    /// Id of the created entity, when one was created.
    pub id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
    /// Set when the change is live in memory but could not be persisted.
    pub save_warning: Option<String>,
}

impl ActionResponse {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
            save_warning: None,
        }
    }
}

/// Completion toggle result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleResponse {
    pub ok: bool,
    /// Completion as seen today after the toggle.
    pub completed: bool,
    pub message: String,
    pub save_warning: Option<String>,
}

/// Serialized state document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotResponse {
    pub ok: bool,
    /// JSON document; empty when `ok` is false.
    pub json: String,
    pub message: String,
}

/// One agenda row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaItem {
    pub id: String,
    pub title: String,
    /// `high|medium|low`.
    pub priority: String,
    pub recurring: bool,
    pub completed: bool,
}

/// Tasks applying to one day, open first, then by priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaResponse {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub items: Vec<AgendaItem>,
    pub completed: u32,
    pub scheduled: u32,
}

/// Creates a task.
///
/// `weekly_days` (0 = Sunday .. 6 = Saturday) makes the task weekly; `None`
/// creates a one-off task. `priority` defaults to `medium`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_add(
    title: String,
    date: String,
    weekly_days: Option<Vec<u8>>,
    priority: Option<String>,
    description: Option<String>,
) -> ActionResponse {
    let draft = match build_task_draft(title, &date, weekly_days, priority, description) {
        Ok(draft) => draft,
        Err(message) => return ActionResponse::rejected(format!("task_add failed: {message}")),
    };
    with_session(|service| {
        let id = service.add_task(draft);
        created("Task created.", id, service)
    })
}

/// Updates task fields; `None` leaves a field unchanged.
///
/// - `recurrence`: `once|weekly`; `weekly` requires `weekly_days`, and
///   `weekly_days` alone implies `weekly`.
/// - `description`: empty string clears it.
#[flutter_rust_bridge::frb(sync)]
pub fn task_update(
    id: String,
    title: Option<String>,
    date: Option<String>,
    recurrence: Option<String>,
    weekly_days: Option<Vec<u8>>,
    priority: Option<String>,
    description: Option<String>,
) -> ActionResponse {
    let patch = match build_task_patch(title, date, recurrence, weekly_days, priority, description)
    {
        Ok(patch) => patch,
        Err(message) => {
            return ActionResponse::rejected(format!("task_update failed: {message}"))
        }
    };
    with_session(|service| {
        let updated = service.update_task(&id, patch);
        changed(updated, "Task updated.", "task", &id, service)
    })
}

/// Deletes a task; deleting a missing id is reported but harmless.
#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(id: String) -> ActionResponse {
    with_session(|service| {
        let removed = service.delete_task(&id);
        changed(removed, "Task deleted.", "task", &id, service)
    })
}

/// Toggles completion for today.
#[flutter_rust_bridge::frb(sync)]
pub fn task_toggle(id: String) -> ToggleResponse {
    with_session(|service| {
        let today = service.today();
        match service.toggle_task_completion_on(&id, today) {
            Some(_) => {
                let completed = service
                    .store()
                    .task(&id)
                    .is_some_and(|task| is_completed_on(task, today));
                ToggleResponse {
                    ok: true,
                    completed,
                    message: if completed {
                        "Task completed.".to_string()
                    } else {
                        "Task reopened.".to_string()
                    },
                    save_warning: save_warning(service),
                }
            }
            None => ToggleResponse {
                ok: false,
                completed: false,
                message: format!("task `{id}` not found"),
                save_warning: None,
            },
        }
    })
}

/// Records an income or expense. `kind` is `income|expense`.
#[flutter_rust_bridge::frb(sync)]
pub fn transaction_add(
    kind: String,
    value: f64,
    date: String,
    category: Option<String>,
    note: Option<String>,
) -> ActionResponse {
    let draft = match build_transaction_draft(&kind, value, &date, category, note) {
        Ok(draft) => draft,
        Err(message) => {
            return ActionResponse::rejected(format!("transaction_add failed: {message}"))
        }
    };
    with_session(|service| match service.add_transaction(draft) {
        Some(id) => created("Transaction recorded.", id, service),
        None => ActionResponse::rejected("transaction_add failed: amount must be finite"),
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn transaction_delete(id: String) -> ActionResponse {
    with_session(|service| {
        let removed = service.delete_transaction(&id);
        changed(removed, "Transaction deleted.", "transaction", &id, service)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn note_add(title: String, content: String, is_pinned: bool) -> ActionResponse {
    with_session(|service| {
        let id = service.add_note(NoteDraft::new(title, content).pinned(is_pinned));
        created("Note created.", id, service)
    })
}

/// Updates note fields; `updatedAt` is refreshed even when nothing changes.
#[flutter_rust_bridge::frb(sync)]
pub fn note_update(
    id: String,
    title: Option<String>,
    content: Option<String>,
    is_pinned: Option<bool>,
) -> ActionResponse {
    let patch = NotePatch {
        title,
        content,
        is_pinned,
    };
    with_session(|service| {
        let updated = service.update_note(&id, patch);
        changed(updated, "Note updated.", "note", &id, service)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn note_delete(id: String) -> ActionResponse {
    with_session(|service| {
        let removed = service.delete_note(&id);
        changed(removed, "Note deleted.", "note", &id, service)
    })
}

/// Clears all tasks, transactions and notes.
///
/// `confirmed` must be `true`; the UI asks the user before calling.
#[flutter_rust_bridge::frb(sync)]
pub fn reset_all(confirmed: bool) -> ActionResponse {
    if !confirmed {
        return ActionResponse::rejected("reset_all requires confirmation");
    }
    with_session(|service| {
        service.reset_all();
        ActionResponse {
            ok: true,
            id: None,
            message: "All data cleared.".to_string(),
            save_warning: save_warning(service),
        }
    })
}

/// Pretty-printed backup document of the full state.
#[flutter_rust_bridge::frb(sync)]
pub fn export_snapshot() -> SnapshotResponse {
    with_session(|service| match service.export_snapshot() {
        Ok(json) => SnapshotResponse {
            ok: true,
            json,
            message: "Snapshot exported.".to_string(),
        },
        Err(err) => SnapshotResponse {
            ok: false,
            json: String::new(),
            message: format!("export_snapshot failed: {err}"),
        },
    })
}

/// Replaces the full state from a backup document.
///
/// Invalid documents are rejected and leave the state untouched.
#[flutter_rust_bridge::frb(sync)]
pub fn import_snapshot(json: String) -> ActionResponse {
    with_session(|service| {
        if service.import_snapshot(&json) {
            ActionResponse {
                ok: true,
                id: None,
                message: format!("Imported {} item(s).", service.state().len()),
                save_warning: save_warning(service),
            }
        } else {
            ActionResponse::rejected("import_snapshot failed: not a valid backup file")
        }
    })
}

/// Compact JSON of the current state, as persisted.
#[flutter_rust_bridge::frb(sync)]
pub fn state_json() -> SnapshotResponse {
    with_session(|service| match serde_json::to_string(service.state()) {
        Ok(json) => SnapshotResponse {
            ok: true,
            json,
            message: String::new(),
        },
        Err(err) => SnapshotResponse {
            ok: false,
            json: String::new(),
            message: format!("state_json failed: {err}"),
        },
    })
}

/// Agenda of the engine's current day.
#[flutter_rust_bridge::frb(sync)]
pub fn agenda_today() -> AgendaResponse {
    with_session(|service| {
        let today = service.today();
        let items = service
            .agenda(today)
            .into_iter()
            .map(|task| AgendaItem {
                id: task.id.clone(),
                title: task.title.clone(),
                priority: task.priority.as_str().to_string(),
                recurring: task.is_recurring(),
                completed: is_completed_on(task, today),
            })
            .collect();
        let progress = service.day_progress(today);
        AgendaResponse {
            date: today.format("%Y-%m-%d").to_string(),
            items,
            completed: u32::try_from(progress.completed).unwrap_or(u32::MAX),
            scheduled: u32::try_from(progress.scheduled).unwrap_or(u32::MAX),
        }
    })
}

fn created<S: StorageSlot>(message: &str, id: String, service: &LifeService<S>) -> ActionResponse {
    ActionResponse {
        ok: true,
        id: Some(id),
        message: message.to_string(),
        save_warning: save_warning(service),
    }
}

fn changed<S: StorageSlot>(
    applied: bool,
    message: &str,
    kind: &str,
    id: &str,
    service: &LifeService<S>,
) -> ActionResponse {
    if !applied {
        return ActionResponse::rejected(format!("{kind} `{id}` not found"));
    }
    ActionResponse {
        ok: true,
        id: None,
        message: message.to_string(),
        save_warning: save_warning(service),
    }
}

fn save_warning<S: StorageSlot>(service: &LifeService<S>) -> Option<String> {
    service
        .last_save_error()
        .map(|err| format!("Changes are kept for this session but could not be saved: {err}"))
}

fn build_task_draft(
    title: String,
    date: &str,
    weekly_days: Option<Vec<u8>>,
    priority: Option<String>,
    description: Option<String>,
) -> Result<TaskDraft, String> {
    let mut draft = TaskDraft::new(title, parse_date(date)?);
    if let Some(days) = weekly_days {
        draft = draft.weekly(parse_weekdays(&days)?);
    }
    if let Some(priority) = priority {
        draft = draft.priority(parse_priority(&priority)?);
    }
    if let Some(description) = description.filter(|text| !text.trim().is_empty()) {
        draft = draft.description(description);
    }
    Ok(draft)
}

fn build_task_patch(
    title: Option<String>,
    date: Option<String>,
    recurrence: Option<String>,
    weekly_days: Option<Vec<u8>>,
    priority: Option<String>,
    description: Option<String>,
) -> Result<TaskPatch, String> {
    let days = weekly_days.map(|days| parse_weekdays(&days)).transpose()?;
    let recurrence = match (recurrence.as_deref().map(str::trim), days) {
        (None, None) => None,
        (Some("once"), _) => Some(Recurrence::Once),
        (Some("weekly") | None, Some(days)) => Some(Recurrence::Weekly(days)),
        (Some("weekly"), None) => return Err("weekly recurrence requires weekly_days".into()),
        (Some(other), _) => return Err(format!("unknown recurrence `{other}`")),
    };
    Ok(TaskPatch {
        title,
        description: description.map(|text| Some(text).filter(|text| !text.trim().is_empty())),
        date: date.as_deref().map(parse_date).transpose()?,
        recurrence,
        priority: priority.as_deref().map(parse_priority).transpose()?,
    })
}

fn build_transaction_draft(
    kind: &str,
    value: f64,
    date: &str,
    category: Option<String>,
    note: Option<String>,
) -> Result<TransactionDraft, String> {
    let kind = TransactionType::parse(kind)
        .ok_or_else(|| format!("unknown transaction type `{kind}`; expected income|expense"))?;
    let mut draft = TransactionDraft::new(kind, value, parse_date(date)?);
    if let Some(category) = category {
        draft = draft.category(category);
    }
    if let Some(note) = note.filter(|text| !text.trim().is_empty()) {
        draft = draft.note(note);
    }
    Ok(draft)
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    parse_calendar_date(value).ok_or_else(|| format!("invalid date `{value}`; expected YYYY-MM-DD"))
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::parse(value)
        .ok_or_else(|| format!("unknown priority `{value}`; expected high|medium|low"))
}

fn parse_weekdays(days: &[u8]) -> Result<WeekdaySet, String> {
    if let Some(day) = days.iter().find(|day| **day > 6) {
        return Err(format!("weekday index {day} out of range 0..=6"));
    }
    Ok(WeekdaySet::from_indices(days.iter().copied()))
}
