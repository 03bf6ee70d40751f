//! Task domain model.
//!
//! # Responsibility
//! - Define the task record, its recurrence rule and priority.
//! - Hold completion state as one tagged variant per recurrence kind.
//!
//! # Invariants
//! - A weekly task has no `completed` flag in memory; it always serializes
//!   `completed: false`.
//! - Completion fields are only mutable from inside the crate (entity store
//!   toggle path); patches cannot reach them.

use super::{optional_date, EntityId, ExtraFields};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::de::{Deserializer, SeqAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task priority.
///
/// Declaration order is the sort order: `High < Medium < Low`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Stable lowercase label used in the wire format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Parses the wire label; unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Set of weekday indices where `0 = Sunday` and `6 = Saturday`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builds a set from raw indices, ignoring anything outside `0..=6`.
    pub fn from_indices(indices: impl IntoIterator<Item = u8>) -> Self {
        let mut set = Self::empty();
        for index in indices {
            set.insert(index);
        }
        set
    }

    /// Inserts one index. Returns `false` when the index is out of range.
    pub fn insert(&mut self, index: u8) -> bool {
        if index > 6 {
            return false;
        }
        self.0 |= 1 << index;
        true
    }

    pub fn contains_index(self, index: u8) -> bool {
        index <= 6 && self.0 & (1 << index) != 0
    }

    pub fn contains(self, weekday: Weekday) -> bool {
        self.contains_index(weekday.num_days_from_sunday() as u8)
    }

    /// Whether the weekday of `date` belongs to the set.
    pub fn matches(self, date: NaiveDate) -> bool {
        self.contains(date.weekday())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Indices in ascending order.
    pub fn indices(self) -> impl Iterator<Item = u8> {
        (0u8..=6).filter(move |index| self.contains_index(*index))
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.indices())
    }
}

impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DaysVisitor;

        impl<'de> Visitor<'de> for DaysVisitor {
            type Value = WeekdaySet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array of weekday indices")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut set = WeekdaySet::empty();
                while let Some(index) = seq.next_element::<i64>()? {
                    if let Ok(index) = u8::try_from(index) {
                        set.insert(index);
                    }
                }
                Ok(set)
            }
        }

        deserializer.deserialize_seq(DaysVisitor)
    }
}

/// Recurrence rule of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    /// Applies only on the anchor date.
    Once,
    /// Applies on matching weekdays from the anchor date onwards.
    Weekly(WeekdaySet),
}

impl Recurrence {
    pub fn is_recurring(self) -> bool {
        matches!(self, Self::Weekly(_))
    }
}

/// Recurrence-aware completion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    /// One-off task completion flag.
    Once(bool),
    /// Most recent day a recurring task was marked done.
    Recurring(Option<NaiveDate>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schedule {
    Once { completed: bool },
    Weekly { days: WeekdaySet },
}

/// Input for creating a task. Completion always starts cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub recurrence: Recurrence,
    pub priority: Priority,
}

impl TaskDraft {
    /// Medium-priority one-off task on `date`.
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: None,
            date,
            recurrence: Recurrence::Once,
            priority: Priority::Medium,
        }
    }

    pub fn weekly(mut self, days: WeekdaySet) -> Self {
        self.recurrence = Recurrence::Weekly(days);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update for a task. `None` leaves the field untouched.
///
/// Completion state is intentionally absent; use the toggle operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub recurrence: Option<Recurrence>,
    pub priority: Option<Priority>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "TaskRecord", from = "TaskRecord")]
pub struct Task {
    pub id: EntityId,
    pub title: String,
    pub description: Option<String>,
    /// Anchor date: the single day of a one-off task, first day of a weekly one.
    pub date: NaiveDate,
    pub priority: Priority,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub extra: ExtraFields,
    schedule: Schedule,
    last_completed_date: Option<NaiveDate>,
    recurrence_extra: ExtraFields,
}

impl Task {
    /// Creates a not-yet-completed task from a draft.
    pub fn new(id: EntityId, draft: TaskDraft, created_at: i64) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            date: draft.date,
            priority: draft.priority,
            created_at,
            extra: ExtraFields::new(),
            schedule: schedule_for(draft.recurrence, false),
            last_completed_date: None,
            recurrence_extra: ExtraFields::new(),
        }
    }

    pub fn recurrence(&self) -> Recurrence {
        match self.schedule {
            Schedule::Once { .. } => Recurrence::Once,
            Schedule::Weekly { days } => Recurrence::Weekly(days),
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence().is_recurring()
    }

    pub fn completion(&self) -> CompletionState {
        match self.schedule {
            Schedule::Once { completed } => CompletionState::Once(completed),
            Schedule::Weekly { .. } => CompletionState::Recurring(self.last_completed_date),
        }
    }

    /// Stored `completed` flag. Always `false` for weekly tasks.
    pub fn completed_flag(&self) -> bool {
        matches!(self.schedule, Schedule::Once { completed: true })
    }

    pub fn last_completed_date(&self) -> Option<NaiveDate> {
        self.last_completed_date
    }

    /// Unrecognized fields of the stored `recurrence` object.
    pub fn recurrence_extra(&self) -> &ExtraFields {
        &self.recurrence_extra
    }

    /// Merges a patch. Switching recurrence converts completion state: a
    /// weekly task never carries `completed`, and a task becoming one-off
    /// starts not completed. Unrecognized recurrence fields are kept.
    pub fn apply_patch(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(recurrence) = patch.recurrence {
            let keep_flag = match (self.schedule, recurrence) {
                (Schedule::Once { completed }, Recurrence::Once) => completed,
                _ => false,
            };
            self.schedule = schedule_for(recurrence, keep_flag);
        }
    }

    /// Sets the one-off completion flag. No-op for weekly tasks.
    pub(crate) fn set_once_completed(&mut self, completed: bool) {
        if let Schedule::Once { .. } = self.schedule {
            self.schedule = Schedule::Once { completed };
        }
    }

    pub(crate) fn set_last_completed_date(&mut self, date: Option<NaiveDate>) {
        self.last_completed_date = date;
    }
}

fn schedule_for(recurrence: Recurrence, completed: bool) -> Schedule {
    match recurrence {
        Recurrence::Once => Schedule::Once { completed },
        Recurrence::Weekly(days) => Schedule::Weekly { days },
    }
}

/// Wire tag of the recurrence object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceType {
    #[default]
    Once,
    Weekly,
}

/// Wire shape of `recurrence`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRecord {
    #[serde(rename = "type")]
    pub kind: RecurrenceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<WeekdaySet>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Wire shape of a task as stored and exported.
///
/// This is the only place where a weekly task may carry `completed: true`;
/// converting into `Task` drops that flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub recurrence: RecurrenceRecord,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "optional_date"
    )]
    pub last_completed_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl TaskRecord {
    /// Whether this record carries the inconsistent weekly + completed shape.
    pub fn has_stuck_weekly_completion(&self) -> bool {
        self.recurrence.kind == RecurrenceType::Weekly && self.completed
    }
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        let schedule = match record.recurrence.kind {
            RecurrenceType::Once => Schedule::Once {
                completed: record.completed,
            },
            RecurrenceType::Weekly => Schedule::Weekly {
                days: record.recurrence.days.unwrap_or_default(),
            },
        };
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            date: record.date,
            priority: record.priority,
            created_at: record.created_at,
            extra: record.extra,
            schedule,
            last_completed_date: record.last_completed_date,
            recurrence_extra: record.recurrence.extra,
        }
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        let completed = task.completed_flag();
        let recurrence = match task.schedule {
            Schedule::Once { .. } => RecurrenceRecord {
                kind: RecurrenceType::Once,
                days: None,
                extra: task.recurrence_extra,
            },
            Schedule::Weekly { days } => RecurrenceRecord {
                kind: RecurrenceType::Weekly,
                days: Some(days),
                extra: task.recurrence_extra,
            },
        };
        Self {
            completed,
            id: task.id,
            title: task.title,
            description: task.description,
            date: task.date,
            recurrence,
            priority: task.priority,
            last_completed_date: task.last_completed_date,
            created_at: task.created_at,
            extra: task.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn priority_orders_high_first() {
        let mut values = vec![Priority::Low, Priority::High, Priority::Medium];
        values.sort();
        assert_eq!(values, vec![Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn weekday_set_ignores_out_of_range_indices() {
        let set = WeekdaySet::from_indices([1, 3, 7, 200, 3]);
        assert_eq!(set.indices().collect::<Vec<_>>(), vec![1, 3]);
        assert!(set.contains(Weekday::Mon));
        assert!(!set.contains(Weekday::Sun));
    }

    #[test]
    fn weekly_record_with_completed_true_loses_flag() {
        let record: TaskRecord = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "title": "stretch",
            "date": "2024-01-01",
            "recurrence": { "type": "weekly", "days": [1] },
            "priority": "low",
            "completed": true,
            "createdAt": 1
        }))
        .unwrap();
        assert!(record.has_stuck_weekly_completion());

        let task = Task::from(record);
        assert!(!task.completed_flag());
        assert_eq!(task.completion(), CompletionState::Recurring(None));

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["completed"], serde_json::json!(false));
        assert_eq!(json["recurrence"]["days"], serde_json::json!([1]));
    }

    #[test]
    fn recurrence_extras_survive_patch_and_serialization() {
        let mut task: Task = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "title": "gym",
            "date": "2024-01-01",
            "recurrence": { "type": "weekly", "days": [1], "interval": 2 },
            "priority": "high",
            "completed": false,
            "createdAt": 1
        }))
        .unwrap();
        assert_eq!(task.recurrence_extra()["interval"], serde_json::json!(2));

        task.apply_patch(TaskPatch {
            recurrence: Some(Recurrence::Weekly(WeekdaySet::from_indices([3]))),
            ..TaskPatch::default()
        });
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(
            json["recurrence"],
            serde_json::json!({ "type": "weekly", "days": [3], "interval": 2 })
        );
    }

    #[test]
    fn empty_last_completed_date_reads_as_absent() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "title": "water plants",
            "date": "2024-01-01",
            "recurrence": { "type": "once" },
            "priority": "medium",
            "completed": false,
            "lastCompletedDate": "",
            "createdAt": 0
        }))
        .unwrap();
        assert_eq!(task.last_completed_date(), None);
    }

    #[test]
    fn patch_to_weekly_clears_once_flag_and_back_starts_open() {
        let mut task = Task::new("t1".into(), TaskDraft::new("run", date("2024-01-01")), 0);
        task.set_once_completed(true);

        task.apply_patch(TaskPatch {
            recurrence: Some(Recurrence::Weekly(WeekdaySet::from_indices([2]))),
            ..TaskPatch::default()
        });
        assert!(!task.completed_flag());
        assert!(task.is_recurring());

        task.apply_patch(TaskPatch {
            recurrence: Some(Recurrence::Once),
            ..TaskPatch::default()
        });
        assert_eq!(task.completion(), CompletionState::Once(false));
    }
}
