//! Read-time projections over the current state.
//!
//! # Responsibility
//! - Day agenda and week window selection for tasks.
//! - Pinned/recency ordering for notes.
//! - Ledger totals.
//!
//! # Invariants
//! - Projections borrow from the state and never mutate it.
//! - Orderings are deterministic: ties keep storage order.

use crate::model::note::Note;
use crate::model::task::Task;
use crate::model::transaction::{Transaction, TransactionType};
use crate::recurrence::{agenda_order, is_completed_on, is_scheduled_on, is_scheduled_within};
use chrono::NaiveDate;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Length of the "week" window used by agenda views.
pub const WEEK_SPAN_DAYS: u32 = 7;

/// Tasks applying to `day`, open first, then by priority.
pub fn agenda_for(tasks: &[Task], day: NaiveDate) -> Vec<&Task> {
    let mut agenda: Vec<&Task> = tasks
        .iter()
        .filter(|task| is_scheduled_on(task, day))
        .collect();
    agenda.sort_by(|a, b| agenda_order(a, b, day));
    agenda
}

/// Tasks applying to any of the `span` days starting at `start`, ordered as
/// seen on `start`.
pub fn tasks_within(tasks: &[Task], start: NaiveDate, span: u32) -> Vec<&Task> {
    let mut selected: Vec<&Task> = tasks
        .iter()
        .filter(|task| is_scheduled_within(task, start, span))
        .collect();
    selected.sort_by(|a, b| agenda_order(a, b, start));
    selected
}

/// Scheduled vs. completed counts for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayProgress {
    pub scheduled: usize,
    pub completed: usize,
}

impl DayProgress {
    pub fn pending(self) -> usize {
        self.scheduled.saturating_sub(self.completed)
    }
}

pub fn day_progress(tasks: &[Task], day: NaiveDate) -> DayProgress {
    tasks
        .iter()
        .filter(|task| is_scheduled_on(task, day))
        .fold(DayProgress::default(), |mut progress, task| {
            progress.scheduled += 1;
            if is_completed_on(task, day) {
                progress.completed += 1;
            }
            progress
        })
}

/// Notes for display: pinned first, then most recently updated.
pub fn notes_for_display(notes: &[Note]) -> Vec<&Note> {
    let mut ordered: Vec<&Note> = notes.iter().collect();
    ordered.sort_by_key(|note| (Reverse(note.is_pinned), Reverse(note.updated_at)));
    ordered
}

/// Case-insensitive title/content search, in display order.
pub fn search_notes<'a>(notes: &'a [Note], term: &str) -> Vec<&'a Note> {
    let needle = term.trim().to_lowercase();
    notes_for_display(notes)
        .into_iter()
        .filter(|note| {
            needle.is_empty()
                || note.title.to_lowercase().contains(&needle)
                || note.content.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Ledger totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FinanceSummary {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

pub fn finance_summary<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> FinanceSummary {
    let (income, expense) =
        transactions
            .into_iter()
            .fold((0.0, 0.0), |(income, expense), tx| match tx.kind {
                TransactionType::Income => (income + tx.value, expense),
                TransactionType::Expense => (income, expense + tx.value),
            });
    FinanceSummary {
        income,
        expense,
        balance: income - expense,
    }
}

/// Per-day income/expense totals in ascending date order.
pub fn daily_totals(transactions: &[Transaction]) -> Vec<(NaiveDate, FinanceSummary)> {
    let mut days: BTreeMap<NaiveDate, Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions {
        days.entry(tx.date).or_default().push(tx);
    }
    days.into_iter()
        .map(|(day, entries)| (day, finance_summary(entries)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::note::NoteDraft;
    use crate::model::task::{Priority, TaskDraft, WeekdaySet};
    use crate::model::ExtraFields;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn tx(kind: TransactionType, value: f64, day: &str) -> Transaction {
        Transaction {
            id: format!("{}-{value}", kind.as_str()),
            kind,
            value,
            category: "General".into(),
            date: date(day),
            note: None,
            created_at: 0,
            extra: ExtraFields::new(),
        }
    }

    #[test]
    fn agenda_includes_weekly_and_once_tasks_for_the_day() {
        let monday = date("2024-01-08");
        let tasks = vec![
            Task::new(
                "weekly".into(),
                TaskDraft::new("gym", date("2024-01-01")).weekly(WeekdaySet::from_indices([1])),
                0,
            ),
            Task::new(
                "once".into(),
                TaskDraft::new("call", monday).priority(Priority::High),
                0,
            ),
            Task::new("other".into(), TaskDraft::new("later", date("2024-01-09")), 0),
        ];

        let ids: Vec<&str> = agenda_for(&tasks, monday)
            .iter()
            .map(|task| task.id.as_str())
            .collect();
        assert_eq!(ids, vec!["once", "weekly"]);
        assert_eq!(
            day_progress(&tasks, monday),
            DayProgress {
                scheduled: 2,
                completed: 0
            }
        );
        assert_eq!(day_progress(&tasks, monday).pending(), 2);
        assert_eq!(tasks_within(&tasks, monday, WEEK_SPAN_DAYS).len(), 3);
    }

    #[test]
    fn notes_order_pinned_then_recent() {
        let old_pinned = Note::new("a".into(), NoteDraft::new("a", "").pinned(true), 1);
        let recent = Note::new("b".into(), NoteDraft::new("b", ""), 50);
        let older = Note::new("c".into(), NoteDraft::new("c", "Groceries"), 10);
        let notes = vec![older, recent, old_pinned];

        let ids: Vec<&str> = notes_for_display(&notes)
            .iter()
            .map(|note| note.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(search_notes(&notes, "grocer").len(), 1);
    }

    #[test]
    fn finance_summary_nets_income_and_expense() {
        let entries = vec![
            tx(TransactionType::Income, 1000.0, "2024-01-02"),
            tx(TransactionType::Expense, 250.5, "2024-01-01"),
            tx(TransactionType::Expense, 49.5, "2024-01-02"),
        ];
        let summary = finance_summary(&entries);
        assert_eq!(summary.income, 1000.0);
        assert_eq!(summary.expense, 300.0);
        assert_eq!(summary.balance, 700.0);

        let daily = daily_totals(&entries);
        assert_eq!(daily[0].0, date("2024-01-01"));
        assert_eq!(daily[1].1.balance, 950.5);
    }
}
