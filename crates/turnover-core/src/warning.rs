//! Non-fatal problems collected while building a schedule.

use serde::{Deserialize, Serialize};

/// Category of a non-fatal problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// The unit's feed could not be downloaded.
    FetchError,
    /// The unit's feed is not valid calendar data.
    ParseError,
    /// A single event was dropped during normalization.
    NormalizationError,
    /// Two bookings of the same unit overlap.
    ConflictWarning,
}

impl WarningKind {
    /// Returns the name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchError => "FetchError",
            Self::ParseError => "ParseError",
            Self::NormalizationError => "NormalizationError",
            Self::ConflictWarning => "ConflictWarning",
        }
    }

    /// Returns true if the whole unit was excluded from the run.
    pub fn excludes_unit(&self) -> bool {
        matches!(self, Self::FetchError | Self::ParseError)
    }
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded non-fatal problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// The unit the problem belongs to.
    pub unit_id: String,
    /// What went wrong.
    pub kind: WarningKind,
    /// Human-readable detail.
    pub detail: String,
}

impl Warning {
    /// Creates a warning.
    pub fn new(unit_id: impl Into<String>, kind: WarningKind, detail: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            kind,
            detail: detail.into(),
        }
    }

    /// Creates a fetch warning.
    pub fn fetch(unit_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(unit_id, WarningKind::FetchError, detail)
    }

    /// Creates a parse warning.
    pub fn parse(unit_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(unit_id, WarningKind::ParseError, detail)
    }

    /// Creates a normalization warning.
    pub fn normalization(unit_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(unit_id, WarningKind::NormalizationError, detail)
    }

    /// Creates a conflict warning.
    pub fn conflict(unit_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(unit_id, WarningKind::ConflictWarning, detail)
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.unit_id, self.kind, self.detail)
    }
}
