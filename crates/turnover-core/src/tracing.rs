//! Log setup for the `turnover` binary.
//!
//! One-shot commands write compact lines to stderr so stdout only carries the
//! schedule. The daemon writes JSON lines with timestamps and source
//! locations. `RUST_LOG` always wins over the mode's level.

use std::io;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// How the process logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// A one-shot command. `debug` lowers the level and adds source locations.
    Cli { debug: bool },
    /// The long-running daily scheduler.
    Daemon,
}

impl LogMode {
    /// Picks the mode for a command line. `--debug` keeps the compact
    /// output even for the daemon so it stays readable in a terminal.
    pub fn for_command(debug: bool, daemon: bool) -> Self {
        if daemon && !debug {
            LogMode::Daemon
        } else {
            LogMode::Cli { debug }
        }
    }

    pub fn level(self) -> Level {
        match self {
            LogMode::Cli { debug: false } => Level::WARN,
            LogMode::Cli { debug: true } => Level::DEBUG,
            LogMode::Daemon => Level::INFO,
        }
    }

    fn directive(self) -> String {
        format!("turnover={}", self.level())
    }

    fn env_filter(self, rust_log: Option<&str>) -> Result<EnvFilter, TracingError> {
        match rust_log {
            Some(directives) if !directives.trim().is_empty() => {
                Ok(EnvFilter::try_new(directives)?)
            }
            _ => Ok(EnvFilter::try_new(self.directive())?),
        }
    }
}

/// Installs the global subscriber for `mode`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set or `RUST_LOG`
/// holds an invalid directive.
pub fn init_tracing(mode: LogMode) -> Result<(), TracingError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = mode.env_filter(rust_log.as_deref())?;

    match mode {
        LogMode::Cli { debug } => {
            let layer = fmt::layer()
                .compact()
                .without_time()
                .with_writer(io::stderr)
                .with_target(debug)
                .with_file(debug)
                .with_line_number(debug);
            let subscriber = tracing_subscriber::registry().with(filter).with(layer);
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogMode::Daemon => {
            let layer = fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_file(true)
                .with_line_number(true);
            let subscriber = tracing_subscriber::registry().with(filter).with(layer);
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}
