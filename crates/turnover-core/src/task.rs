//! Cleaning tasks derived from stays.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What happens at a unit on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    /// A guest leaves and nobody arrives the same day.
    CheckoutOnly,
    /// A guest leaves and the next guest arrives the same day.
    SameDayTurnover,
    /// A guest arrives with no departure that day. Informational only.
    CheckinOnly,
}

impl TaskKind {
    /// Returns true if this kind requires a cleaning visit.
    pub fn requires_cleaning(&self) -> bool {
        matches!(self, Self::CheckoutOnly | Self::SameDayTurnover)
    }

    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutOnly => "CHECKOUT_ONLY",
            Self::SameDayTurnover => "SAME_DAY_TURNOVER",
            Self::CheckinOnly => "CHECKIN_ONLY",
        }
    }

    /// Short label used in message text.
    pub fn short_label(&self) -> &'static str {
        match self {
            Self::CheckoutOnly => "out/clean",
            Self::SameDayTurnover => "out/clean/in",
            Self::CheckinOnly => "check-in",
        }
    }

    /// Label used in spreadsheet rows.
    pub fn action_label(&self) -> &'static str {
        match self {
            Self::CheckoutOnly => "Check-out / Clean",
            Self::SameDayTurnover => "Check-out / Clean / Check-in",
            Self::CheckinOnly => "Check-in",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the cleaning schedule: a unit on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningTask {
    /// The rental unit.
    pub unit_id: String,
    /// Day the task happens.
    pub date: NaiveDate,
    /// Kind of task.
    pub kind: TaskKind,
    /// Arrival date of the next guest, set for same-day turnovers only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_check_in: Option<NaiveDate>,
    /// Set when the task comes from overlapping bookings of the same unit.
    #[serde(default)]
    pub conflict: bool,
}

impl CleaningTask {
    /// A checkout with no arrival the same day.
    pub fn checkout(unit_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            unit_id: unit_id.into(),
            date,
            kind: TaskKind::CheckoutOnly,
            next_check_in: None,
            conflict: false,
        }
    }

    /// A checkout followed by an arrival on the same date.
    pub fn turnover(unit_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            unit_id: unit_id.into(),
            date,
            kind: TaskKind::SameDayTurnover,
            next_check_in: Some(date),
            conflict: false,
        }
    }

    /// An arrival with no checkout the same day.
    pub fn check_in(unit_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            unit_id: unit_id.into(),
            date,
            kind: TaskKind::CheckinOnly,
            next_check_in: None,
            conflict: false,
        }
    }

    /// Builder method to set the conflict marker.
    pub fn with_conflict(mut self, conflict: bool) -> Self {
        self.conflict = conflict;
        self
    }

    /// Returns true if a cleaner has to visit.
    pub fn requires_cleaning(&self) -> bool {
        self.kind.requires_cleaning()
    }
}
