//! Shape validation and repair for persisted/imported state documents.
//!
//! # Responsibility
//! - Turn any parsed JSON value into a well-formed `AppState`.
//! - Count every correction in a `RepairReport` for diagnostics.
//!
//! # Invariants
//! - Never fails: wrong-typed input degrades to empty collections or dropped
//!   records, never to an error.
//! - Used identically by startup load and snapshot import.
//! - Weekly tasks stored with `completed: true` come out not completed.
//! - Unrecognized fields are kept in each record's `extra` map.

use crate::id::IdGenerator;
use crate::model::note::Note;
use crate::model::state::AppState;
use crate::model::task::{
    Priority, RecurrenceRecord, RecurrenceType, Task, TaskRecord, WeekdaySet,
};
use crate::model::transaction::{normalize_category, Transaction, TransactionType};
use crate::model::{EntityId, ExtraFields};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;

static CALENDAR_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:[T ][0-9:.]*(?:Z|[+-]\d{2}:?\d{2})?)?$")
        .expect("valid calendar date regex")
});

/// Summary of corrections applied while repairing one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Collections that were missing, `null` or not arrays.
    pub coerced_collections: Vec<&'static str>,
    /// Records dropped because they were unusable.
    pub dropped_records: usize,
    /// Weekly tasks that were stored as completed.
    pub corrected_weekly_completions: usize,
    /// Records that received a fresh id (missing, blank or duplicate).
    pub regenerated_ids: usize,
    /// Individual fields replaced by their defaults.
    pub defaulted_fields: usize,
}

impl RepairReport {
    /// Whether the document was already well-formed.
    pub fn is_clean(&self) -> bool {
        self == &Self::default()
    }
}

/// Repairs a whole state document.
///
/// Non-object documents produce an empty state with all collections reported
/// as coerced.
pub fn repair_document(document: Value, ids: &dyn IdGenerator) -> (AppState, RepairReport) {
    let mut report = RepairReport::default();
    let mut root = match document {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let tasks = take_collection(&mut root, "tasks", &mut report);
    let transactions = take_collection(&mut root, "transactions", &mut report);
    let notes = take_collection(&mut root, "notes", &mut report);

    let mut repairer = Repairer {
        ids,
        report,
        seen: HashSet::new(),
    };
    let tasks = tasks
        .into_iter()
        .filter_map(|raw| repairer.task(raw))
        .collect();
    repairer.seen.clear();
    let transactions = transactions
        .into_iter()
        .filter_map(|raw| repairer.transaction(raw))
        .collect();
    repairer.seen.clear();
    let notes = notes
        .into_iter()
        .filter_map(|raw| repairer.note(raw))
        .collect();

    let state = AppState {
        tasks,
        transactions,
        notes,
        extra: root,
    };
    (state, repairer.report)
}

/// Parses a calendar date from `YYYY-MM-DD` or an ISO datetime prefix.
pub fn parse_calendar_date(text: &str) -> Option<NaiveDate> {
    let captures = CALENDAR_DATE_RE.captures(text.trim())?;
    NaiveDate::parse_from_str(captures.get(1)?.as_str(), "%Y-%m-%d").ok()
}

fn take_collection(
    root: &mut Map<String, Value>,
    key: &'static str,
    report: &mut RepairReport,
) -> Vec<Value> {
    match root.remove(key) {
        Some(Value::Array(items)) => items,
        _ => {
            report.coerced_collections.push(key);
            Vec::new()
        }
    }
}

struct Repairer<'a> {
    ids: &'a dyn IdGenerator,
    report: RepairReport,
    seen: HashSet<EntityId>,
}

impl Repairer<'_> {
    fn task(&mut self, raw: Value) -> Option<Task> {
        let mut fields = self.record_fields(raw)?;
        let Some(date) = self.date(&mut fields, "date") else {
            self.report.dropped_records += 1;
            return None;
        };
        let id = self.id(&mut fields);
        let title = self.string_or_default(&mut fields, "title");
        let description = take_string(&mut fields, "description");
        let recurrence = self.recurrence(&mut fields);
        let priority = match take_string(&mut fields, "priority") {
            Some(label) => Priority::parse(&label).unwrap_or_else(|| {
                self.report.defaulted_fields += 1;
                Priority::Medium
            }),
            None => {
                self.report.defaulted_fields += 1;
                Priority::Medium
            }
        };
        let completed = self.bool_or_default(&mut fields, "completed");
        let last_completed_date = self.optional_date(&mut fields, "lastCompletedDate");
        let created_at = self.millis_or_default(&mut fields, "createdAt");

        let record = TaskRecord {
            id,
            title,
            description,
            date,
            recurrence,
            priority,
            completed,
            last_completed_date,
            created_at,
            extra: fields,
        };
        if record.has_stuck_weekly_completion() {
            self.report.corrected_weekly_completions += 1;
        }
        Some(Task::from(record))
    }

    fn transaction(&mut self, raw: Value) -> Option<Transaction> {
        let mut fields = self.record_fields(raw)?;
        let kind = take_string(&mut fields, "type")
            .as_deref()
            .and_then(TransactionType::parse);
        let value = take_number(&mut fields, "value").filter(|value| value.is_finite());
        let date = self.date(&mut fields, "date");
        let (Some(kind), Some(value), Some(date)) = (kind, value, date) else {
            self.report.dropped_records += 1;
            return None;
        };
        let value = if value < 0.0 {
            self.report.defaulted_fields += 1;
            value.abs()
        } else {
            value
        };
        let id = self.id(&mut fields);
        let category = match take_string(&mut fields, "category") {
            Some(category) if !category.trim().is_empty() => category,
            _ => {
                self.report.defaulted_fields += 1;
                normalize_category(None)
            }
        };
        let note = take_string(&mut fields, "note");
        let created_at = self.millis_or_default(&mut fields, "createdAt");

        Some(Transaction {
            id,
            kind,
            value,
            category,
            date,
            note,
            created_at,
            extra: fields,
        })
    }

    fn note(&mut self, raw: Value) -> Option<Note> {
        let mut fields = self.record_fields(raw)?;
        let id = self.id(&mut fields);
        let title = self.string_or_default(&mut fields, "title");
        let content = self.string_or_default(&mut fields, "content");
        let is_pinned = self.bool_or_default(&mut fields, "isPinned");
        let updated_at = self.millis_or_default(&mut fields, "updatedAt");

        Some(Note {
            id,
            title,
            content,
            is_pinned,
            updated_at,
            extra: fields,
        })
    }

    fn record_fields(&mut self, raw: Value) -> Option<ExtraFields> {
        match raw {
            Value::Object(fields) => Some(fields),
            _ => {
                self.report.dropped_records += 1;
                None
            }
        }
    }

    /// Keeps a usable id, otherwise assigns a fresh one. Duplicates within a
    /// collection are treated as unusable.
    fn id(&mut self, fields: &mut ExtraFields) -> EntityId {
        let existing = take_string(fields, "id")
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty() && !self.seen.contains(id));
        let id = match existing {
            Some(id) => id,
            None => {
                self.report.regenerated_ids += 1;
                self.ids.next_id()
            }
        };
        self.seen.insert(id.clone());
        id
    }

    fn recurrence(&mut self, fields: &mut ExtraFields) -> RecurrenceRecord {
        let Some(Value::Object(mut rule)) = fields.remove("recurrence") else {
            return RecurrenceRecord::default();
        };
        let kind = take_string(&mut rule, "type");
        let days = rule.remove("days");
        let (kind, days) = match (kind.as_deref().map(str::trim), days) {
            (Some("weekly"), Some(Value::Array(items))) => (
                RecurrenceType::Weekly,
                Some(WeekdaySet::from_indices(items.iter().filter_map(weekday_index))),
            ),
            (Some("weekly"), _) => {
                self.report.defaulted_fields += 1;
                (RecurrenceType::Weekly, Some(WeekdaySet::empty()))
            }
            (Some("once"), _) => (RecurrenceType::Once, None),
            _ => {
                self.report.defaulted_fields += 1;
                (RecurrenceType::Once, None)
            }
        };
        // Whatever is left in the rule object is carried through untouched.
        RecurrenceRecord {
            kind,
            days,
            extra: rule,
        }
    }

    fn date(&mut self, fields: &mut ExtraFields, key: &str) -> Option<NaiveDate> {
        take_string(fields, key).and_then(|text| parse_calendar_date(&text))
    }

    fn optional_date(&mut self, fields: &mut ExtraFields, key: &str) -> Option<NaiveDate> {
        let text = take_string(fields, key)?;
        if text.trim().is_empty() {
            return None;
        }
        let parsed = parse_calendar_date(&text);
        if parsed.is_none() {
            self.report.defaulted_fields += 1;
        }
        parsed
    }

    fn string_or_default(&mut self, fields: &mut ExtraFields, key: &str) -> String {
        take_string(fields, key).unwrap_or_else(|| {
            self.report.defaulted_fields += 1;
            String::new()
        })
    }

    fn bool_or_default(&mut self, fields: &mut ExtraFields, key: &str) -> bool {
        match fields.remove(key) {
            None | Some(Value::Null) => false,
            Some(value) => coerce_bool(&value).unwrap_or_else(|| {
                self.report.defaulted_fields += 1;
                false
            }),
        }
    }

    fn millis_or_default(&mut self, fields: &mut ExtraFields, key: &str) -> i64 {
        match take_number(fields, key) {
            Some(value) if value.is_finite() => value.round() as i64,
            _ => {
                self.report.defaulted_fields += 1;
                0
            }
        }
    }
}

fn take_string(fields: &mut ExtraFields, key: &str) -> Option<String> {
    match fields.remove(key)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn take_number(fields: &mut ExtraFields, key: &str) -> Option<f64> {
    match fields.remove(key)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn weekday_index(value: &Value) -> Option<u8> {
    let index = match value {
        Value::Number(number) => number.as_i64()?,
        Value::String(text) => text.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    u8::try_from(index).ok().filter(|index| *index <= 6)
}
