//! Error types for feed operations.
//!
//! This module defines the errors that can occur while fetching or parsing a
//! unit's calendar feed. They are per-unit: the engine turns each one into a
//! [`Warning`] and carries on with the other units.

use std::fmt;
use thiserror::Error;
use turnover_core::{Warning, WarningKind};

/// The category of a provider error.
///
/// The code decides which warning kind a failed unit is reported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Network error - connection failed, DNS resolution, TLS, etc.
    NetworkError,
    /// The fetch did not finish within its timeout.
    Timeout,
    /// The server answered with a non-success HTTP status.
    HttpStatus,
    /// The response body could not be read.
    InvalidResponse,
    /// The body is not valid calendar data.
    ParseError,
    /// Configuration error - missing or invalid feed URL.
    ConfigurationError,
}

impl ProviderErrorCode {
    /// Returns a human-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::Timeout => "timeout",
            Self::HttpStatus => "http_status",
            Self::InvalidResponse => "invalid_response",
            Self::ParseError => "parse_error",
            Self::ConfigurationError => "configuration_error",
        }
    }

    /// The warning kind this error is reported as.
    pub fn warning_kind(&self) -> WarningKind {
        match self {
            Self::ParseError => WarningKind::ParseError,
            _ => WarningKind::FetchError,
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while fetching or parsing a feed.
#[derive(Debug, Error)]
pub struct ProviderError {
    /// The error code categorizing this error.
    code: ProviderErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The unit whose feed failed, if known.
    unit: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            unit: None,
            source: None,
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Timeout, message)
    }

    /// Creates an HTTP status error.
    pub fn http_status(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::HttpStatus, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ParseError, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Sets the unit for this error.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the unit, if set.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Converts this error into a warning for the given unit.
    pub fn to_warning(&self, unit_id: &str) -> Warning {
        Warning::new(
            unit_id,
            self.code.warning_kind(),
            format!("{}: {}", self.code, self.message),
        )
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref unit) = self.unit {
            write!(f, "[{}] ", unit)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
