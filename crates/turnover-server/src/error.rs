//! Server error types.

use std::io;
use thiserror::Error;
use turnover_core::ScheduleError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
///
/// Per-unit feed failures are not errors here; they end up as warnings on
/// the schedule.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (output files, directories).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The schedule request itself was invalid.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// HTTP delivery error.
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The scheduler is no longer running.
    #[error("Scheduler is not running")]
    SchedulerStopped,
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an HTTP error.
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Returns true if the error comes from an invalid request or setup.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Config { .. } => true,
            Self::Schedule(e) => e.is_configuration(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_errors_are_transparent() {
        let err: ServerError = ScheduleError::configuration("window_days must be > 0").into();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "configuration error: window_days must be > 0");
    }

    #[test]
    fn http_error_is_not_configuration() {
        let err = ServerError::http("HTTP 500");
        assert!(!err.is_configuration());
        assert_eq!(err.to_string(), "HTTP error: HTTP 500");
    }
}
