//! RawEvent to StayInterval conversion pipeline.
//!
//! This module turns the raw events of one feed into [`StayInterval`]s:
//! 1. Converts each raw time to a calendar date in the property timezone
//! 2. Applies the end-exclusive rule for all-day bookings
//! 3. Drops cancelled, zero-length and out-of-horizon events
//!
//! Dropped events never abort the batch; each one is reported as a
//! [`Warning`] next to the surviving intervals.

use chrono::{Days, NaiveDate};
use chrono_tz::Tz;
use tracing::{debug, warn};
use turnover_core::{StayInterval, Warning};

use crate::raw_event::{RawEvent, RawEventTime};

/// Default number of days either side of the reference date that events may
/// fall in before they are discarded.
pub const DEFAULT_HORIZON_DAYS: u64 = 730;

/// Options controlling normalization.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// The timezone of the rental property.
    pub timezone: Tz,
    /// The date the horizon is centered on, usually today.
    pub reference: NaiveDate,
    /// Days either side of `reference` an event may touch.
    pub horizon_days: u64,
}

impl NormalizeOptions {
    /// Creates options with the default horizon.
    pub fn new(timezone: Tz, reference: NaiveDate) -> Self {
        Self {
            timezone,
            reference,
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }

    /// Builder method to set the horizon.
    pub fn with_horizon_days(mut self, days: u64) -> Self {
        self.horizon_days = days;
        self
    }

    /// The inclusive `(first, last)` dates of the horizon.
    fn horizon(&self) -> (NaiveDate, NaiveDate) {
        let days = Days::new(self.horizon_days);
        (
            self.reference.checked_sub_days(days).unwrap_or(NaiveDate::MIN),
            self.reference.checked_add_days(days).unwrap_or(NaiveDate::MAX),
        )
    }
}

/// Converts a [`RawEventTime`] to a calendar date.
///
/// All-day dates are taken as-is. An all-day end is exclusive in the feed
/// format, so it already names the checkout morning.
pub fn to_local_date(time: &RawEventTime, timezone: &Tz) -> NaiveDate {
    match time {
        RawEventTime::DateTime(dt) => dt.with_timezone(timezone).date_naive(),
        RawEventTime::Local(naive) => naive.date(),
        RawEventTime::Date(date) => *date,
    }
}

/// Converts a [`RawEvent`] to a [`StayInterval`].
///
/// # Errors
///
/// Returns a normalization warning when the stay is zero-length or negative
/// after conversion, or lies entirely outside the horizon.
pub fn normalize_event(raw: &RawEvent, options: &NormalizeOptions) -> Result<StayInterval, Warning> {
    let check_in = to_local_date(&raw.start, &options.timezone);
    let check_out = to_local_date(&raw.end, &options.timezone);

    let (first, last) = options.horizon();
    if check_out < first || check_in > last {
        return Err(Warning::normalization(
            &raw.unit_id,
            format!(
                "booking {} ({} to {}) is outside the {}-day horizon around {}",
                raw.id, check_in, check_out, options.horizon_days, options.reference
            ),
        ));
    }

    StayInterval::new(&raw.unit_id, check_in, check_out, &raw.id).map_err(|_| {
        Warning::normalization(
            &raw.unit_id,
            format!(
                "booking {} ends on or before it starts ({} to {})",
                raw.id, check_in, check_out
            ),
        )
    })
}

/// Normalizes a batch of raw events.
///
/// Cancelled events are skipped silently. Every other dropped event yields
/// one warning.
pub fn normalize_events<I>(events: I, options: &NormalizeOptions) -> (Vec<StayInterval>, Vec<Warning>)
where
    I: IntoIterator<Item = RawEvent>,
{
    let mut intervals = Vec::new();
    let mut warnings = Vec::new();

    for raw in events {
        if raw.is_cancelled() {
            debug!(uid = %raw.id, unit = %raw.unit_id, "Skipping cancelled event");
            continue;
        }
        match normalize_event(&raw, options) {
            Ok(interval) => intervals.push(interval),
            Err(warning) => {
                warn!(unit = %warning.unit_id, detail = %warning.detail, "Dropped event");
                warnings.push(warning);
            }
        }
    }

    (intervals, warnings)
}
