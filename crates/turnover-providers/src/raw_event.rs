//! Raw event type from calendar feeds.
//!
//! This module defines [`RawEvent`], a representation of a booking exactly as
//! it appears in a unit's feed, before normalization into a
//! [`StayInterval`](turnover_core::StayInterval).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// The time specification for a raw event.
///
/// Feeds carry times in three shapes:
/// - UTC datetimes (`20240105T100000Z`)
/// - Date-only values for all-day bookings (`VALUE=DATE:20240105`)
/// - Wall-clock datetimes, either floating or with a `TZID`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum RawEventTime {
    /// A specific datetime in UTC.
    DateTime(DateTime<Utc>),
    /// Wall-clock time with no usable zone; read in the property timezone.
    Local(NaiveDateTime),
    /// An all-day date (no specific time).
    Date(NaiveDate),
}

impl RawEventTime {
    /// Creates a RawEventTime from a UTC datetime.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a RawEventTime from a floating wall-clock time.
    pub fn from_local(dt: NaiveDateTime) -> Self {
        Self::Local(dt)
    }

    /// Creates a RawEventTime from a date (all-day event).
    pub fn from_date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    /// Returns true if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }
}

/// A raw booking event from a unit's feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// The event `UID`, synthesized when the feed omits one.
    pub id: String,

    /// The unit whose feed this event came from.
    pub unit_id: String,

    /// When the stay starts.
    pub start: RawEventTime,

    /// When the stay ends.
    pub end: RawEventTime,

    /// The event summary (`Reserved`, `Airbnb (Not available)`, a guest name).
    pub summary: Option<String>,

    /// The event status (e.g., "confirmed", "tentative", "cancelled").
    pub status: Option<String>,
}

impl RawEvent {
    /// Creates a new raw event with the minimum required fields.
    pub fn new(
        id: impl Into<String>,
        unit_id: impl Into<String>,
        start: RawEventTime,
        end: RawEventTime,
    ) -> Self {
        Self {
            id: id.into(),
            unit_id: unit_id.into(),
            start,
            end,
            summary: None,
            status: None,
        }
    }

    /// Returns the effective title, falling back to "(No title)" if empty.
    pub fn effective_title(&self) -> &str {
        self.summary
            .as_ref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.as_str())
            .unwrap_or("(No title)")
    }

    /// Returns true if the event is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.eq_ignore_ascii_case("cancelled"))
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}
