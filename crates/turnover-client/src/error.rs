//! Client error types.

use std::fmt;

use turnover_providers::ProviderError;
use turnover_server::ServerError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Feed source could not be set up.
    Provider(String),
    /// Building the schedule failed.
    Schedule(String),
    /// One or more outputs failed.
    Dispatch(String),
    /// Rendering the output failed.
    Render(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Provider(msg) => write!(f, "provider error: {}", msg),
            Self::Schedule(msg) => write!(f, "schedule error: {}", msg),
            Self::Dispatch(msg) => write!(f, "dispatch failed: {}", msg),
            Self::Render(msg) => write!(f, "render error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err.to_string())
    }
}

impl From<ServerError> for ClientError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Io(err) => Self::Io(err),
            ServerError::Config { message } => Self::Config(message),
            err => Self::Schedule(err.to_string()),
        }
    }
}
