//! Schedule error types.
//!
//! Only caller mistakes are errors. Data-quality problems found in feeds are
//! reported as [`Warning`](crate::Warning) values instead.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for schedule operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Errors raised by the schedule engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The request itself is invalid (e.g. a non-positive window).
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A stay whose checkout is not after its check-in.
    #[error("invalid stay for {unit_id}: check-out {check_out} is not after check-in {check_in}")]
    InvalidStay {
        unit_id: String,
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
}

impl ScheduleError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns true for configuration errors.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_display() {
        let err = ScheduleError::configuration("window_days must be > 0, got 0");
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "configuration error: window_days must be > 0, got 0"
        );
    }

    #[test]
    fn invalid_stay_display() {
        let err = ScheduleError::InvalidStay {
            unit_id: "Flat 7".to_string(),
            check_in: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        };
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("Flat 7"));
        assert!(err.to_string().contains("2024-01-05"));
    }
}
