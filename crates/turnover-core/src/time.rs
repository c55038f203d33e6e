//! Day windows for schedule queries.
//!
//! A [`ScheduleWindow`] is a half-open range of calendar days
//! `[start, start + days)`. All dates are local to the property; conversion
//! from instants happens once, in [`today_in`] or during feed normalization.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};

/// Default number of days in a schedule window.
pub const DEFAULT_WINDOW_DAYS: i64 = 14;

/// A rolling range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    /// First day of the window (inclusive).
    pub start: NaiveDate,
    /// Day after the last day of the window (exclusive).
    pub end: NaiveDate,
}

impl ScheduleWindow {
    /// Creates a window of `days` days starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `days <= 0` or the window runs past
    /// the last representable date.
    pub fn new(start: NaiveDate, days: i64) -> ScheduleResult<Self> {
        if days <= 0 {
            return Err(ScheduleError::configuration(format!(
                "window_days must be > 0, got {}",
                days
            )));
        }
        let end = start
            .checked_add_days(Days::new(days as u64))
            .ok_or_else(|| {
                ScheduleError::configuration(format!(
                    "window of {} days starting {} overflows the calendar",
                    days, start
                ))
            })?;
        Ok(Self { start, end })
    }

    /// Number of days covered.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Last day inside the window.
    pub fn last_day(&self) -> NaiveDate {
        self.end.pred_opt().unwrap_or(self.start)
    }

    /// Checks if a date falls within this window.
    ///
    /// Uses half-open interval semantics: `[start, end)`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Checks if the half-open day range `[from, until)` shares a day with
    /// this window.
    pub fn intersects(&self, from: NaiveDate, until: NaiveDate) -> bool {
        from < self.end && until > self.start
    }

    /// Iterates over every day of the window in order.
    pub fn dates(self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }
}

/// Returns the current calendar date in the given timezone.
pub fn today_in<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    now.with_timezone(tz).date_naive()
}
