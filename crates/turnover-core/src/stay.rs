//! Guest stays.
//!
//! A [`StayInterval`] is the canonical form of one booking after feed
//! normalization: plain calendar dates, with the checkout date being the
//! morning the guest leaves.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};

/// One guest stay for one unit.
///
/// `check_out` is always strictly after `check_in`; zero-length and inverted
/// stays cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayInterval {
    unit_id: String,
    check_in: NaiveDate,
    check_out: NaiveDate,
    source_uid: String,
}

impl StayInterval {
    /// Creates a stay, rejecting `check_out <= check_in`.
    pub fn new(
        unit_id: impl Into<String>,
        check_in: NaiveDate,
        check_out: NaiveDate,
        source_uid: impl Into<String>,
    ) -> ScheduleResult<Self> {
        let unit_id = unit_id.into();
        if check_out <= check_in {
            return Err(ScheduleError::InvalidStay {
                unit_id,
                check_in,
                check_out,
            });
        }
        Ok(Self {
            unit_id,
            check_in,
            check_out,
            source_uid: source_uid.into(),
        })
    }

    /// The rental unit this stay belongs to.
    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    /// Arrival date.
    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    /// Departure date, the morning cleaning is due.
    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Identifier of the event in the origin feed.
    pub fn source_uid(&self) -> &str {
        &self.source_uid
    }

    /// Number of nights booked.
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Returns true if both stays occupy at least one common night.
    ///
    /// Back-to-back stays (one checks out the day the other checks in) do not
    /// overlap.
    pub fn overlaps(&self, other: &StayInterval) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}
