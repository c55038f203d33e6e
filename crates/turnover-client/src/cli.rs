//! Command-line interface definition.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use turnover_core::OutputFormat;

/// turnover - Cleaning schedules from rental calendars
#[derive(Debug, Parser)]
#[command(name = "turnover")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "TURNOVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the cleaning schedule
    Schedule {
        /// Number of days to cover (defaults to `default_days`)
        #[arg(long, short, value_parser = clap::value_parser!(i64).range(1..=60))]
        days: Option<i64>,

        /// First day of the window, YYYY-MM-DD (defaults to today)
        #[arg(long, short)]
        start: Option<NaiveDate>,

        /// Output format: text, rows or json
        #[arg(long, short, default_value = "text")]
        format: OutputFormat,
    },

    /// Build the schedule and deliver it to every configured output
    RunNow {
        /// Number of days to cover (defaults to `default_days`)
        #[arg(long, short, value_parser = clap::value_parser!(i64).range(1..=60))]
        days: Option<i64>,
    },

    /// Run the daily delivery in the foreground
    Daemon,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

impl Command {
    /// Returns true for long-running commands.
    pub fn is_daemon(&self) -> bool {
        matches!(self, Self::Daemon)
    }
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
