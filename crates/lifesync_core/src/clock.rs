//! Time sources for entity timestamps and "today".

use chrono::{DateTime, Local, NaiveDate, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Wall clock used for `createdAt` / `updatedAt` stamps and the current day.
pub trait Clock {
    /// Unix epoch milliseconds.
    fn now_millis(&self) -> i64;
    /// Current calendar day in the user's timezone.
    fn today(&self) -> NaiveDate;
}

/// System time; "today" follows the local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually driven clock. Clones share the same instant.
///
/// "Today" is the UTC calendar day of the current instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn at_millis(millis: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(millis)),
        }
    }

    /// Midnight UTC of `day`.
    pub fn on_day(day: NaiveDate) -> Self {
        let millis = day
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().timestamp_millis())
            .unwrap_or_default();
        Self::at_millis(millis)
    }

    pub fn advance_millis(&self, delta: i64) {
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }

    fn today(&self) -> NaiveDate {
        DateTime::<Utc>::from_timestamp_millis(self.now_millis())
            .map(|instant| instant.date_naive())
            .unwrap_or_default()
    }
}

/// Returns the default clock used by services.
pub fn default_clock() -> Box<dyn Clock + Send> {
    Box::new(SystemClock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let clock = ManualClock::on_day(day);
        let handle = clock.clone();

        handle.advance_millis(86_400_000);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
    }
}
