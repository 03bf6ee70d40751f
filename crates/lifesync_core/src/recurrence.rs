//! Recurrence evaluation for tasks.
//!
//! # Responsibility
//! - Decide whether a task applies to a calendar day.
//! - Decide whether a task counts as completed on a calendar day.
//!
//! # Invariants
//! - Pure functions: no clock access, no mutation.
//! - Only calendar days are compared; there is no time-of-day component.
//! - A weekly task never applies before its anchor date; the anchor day itself
//!   applies when its weekday matches.

use crate::model::task::{CompletionState, Recurrence, Task};
use chrono::{Days, NaiveDate};
use std::cmp::Ordering;

/// Returns whether `task` applies to `day`.
pub fn is_scheduled_on(task: &Task, day: NaiveDate) -> bool {
    match task.recurrence() {
        Recurrence::Once => day == task.date,
        Recurrence::Weekly(days) => day >= task.date && days.matches(day),
    }
}

/// Returns whether `task` counts as done on `day`.
///
/// One-off tasks ignore `day`; recurring tasks are done only on the day they
/// were last marked.
pub fn is_completed_on(task: &Task, day: NaiveDate) -> bool {
    match task.completion() {
        CompletionState::Once(completed) => completed,
        CompletionState::Recurring(last) => last == Some(day),
    }
}

/// Returns whether `task` applies to any of `span` consecutive days starting
/// at `start`.
pub fn is_scheduled_within(task: &Task, start: NaiveDate, span: u32) -> bool {
    (0..span).any(|offset| {
        start
            .checked_add_days(Days::new(u64::from(offset)))
            .is_some_and(|day| is_scheduled_on(task, day))
    })
}

/// Agenda ordering for `day`: open tasks first, then by priority
/// (`high` first). Equal keys keep their relative order under a stable sort.
pub fn agenda_order(a: &Task, b: &Task, day: NaiveDate) -> Ordering {
    is_completed_on(a, day)
        .cmp(&is_completed_on(b, day))
        .then(a.priority.cmp(&b.priority))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{Priority, TaskDraft, WeekdaySet};

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn mondays_from_new_year() -> Task {
        let draft =
            TaskDraft::new("review budget", date("2024-01-01")).weekly(WeekdaySet::from_indices([1]));
        Task::new("weekly".into(), draft, 0)
    }

    #[test]
    fn weekly_task_respects_anchor_and_weekday() {
        let task = mondays_from_new_year();
        assert!(is_scheduled_on(&task, date("2024-01-08")));
        assert!(!is_scheduled_on(&task, date("2023-12-25")));
        assert!(!is_scheduled_on(&task, date("2024-01-02")));
    }

    #[test]
    fn weekly_task_is_scheduled_on_matching_anchor_day() {
        let task = mondays_from_new_year();
        assert!(is_scheduled_on(&task, date("2024-01-01")));
    }

    #[test]
    fn weekly_task_with_no_days_is_never_scheduled() {
        let draft = TaskDraft::new("nothing", date("2024-01-01")).weekly(WeekdaySet::empty());
        let task = Task::new("empty".into(), draft, 0);
        assert!(!is_scheduled_within(&task, date("2024-01-01"), 28));
    }

    #[test]
    fn once_task_is_scheduled_only_on_its_date() {
        let task = Task::new("once".into(), TaskDraft::new("dentist", date("2024-03-05")), 0);
        assert!(is_scheduled_on(&task, date("2024-03-05")));
        assert!(!is_scheduled_on(&task, date("2024-03-06")));
        assert!(is_scheduled_within(&task, date("2024-02-28"), 7));
        assert!(!is_scheduled_within(&task, date("2024-02-27"), 7));
    }

    #[test]
    fn once_completion_ignores_reference_day() {
        let mut task = Task::new("once".into(), TaskDraft::new("dentist", date("2024-03-05")), 0);
        task.set_once_completed(true);
        for day in ["2020-01-01", "2024-03-05", "2030-12-31"] {
            assert!(is_completed_on(&task, date(day)));
        }
    }

    #[test]
    fn weekly_completion_matches_last_completed_day_only() {
        let mut task = mondays_from_new_year();
        task.set_last_completed_date(Some(date("2024-01-08")));
        assert!(is_completed_on(&task, date("2024-01-08")));
        assert!(!is_completed_on(&task, date("2024-01-15")));
    }

    #[test]
    fn agenda_order_puts_open_high_priority_first() {
        let day = date("2024-01-08");
        let low = Task::new(
            "low".into(),
            TaskDraft::new("low", day).priority(Priority::Low),
            0,
        );
        let mut done_high = Task::new(
            "done".into(),
            TaskDraft::new("done", day).priority(Priority::High),
            0,
        );
        done_high.set_once_completed(true);
        let high = Task::new(
            "high".into(),
            TaskDraft::new("high", day).priority(Priority::High),
            0,
        );

        let mut tasks = vec![&done_high, &low, &high];
        tasks.sort_by(|a, b| agenda_order(a, b, day));
        let ids: Vec<&str> = tasks.iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "low", "done"]);
    }
}
