//! turnover client library.
//!
//! This crate provides the `turnover` command line:
//! - CLI argument parsing
//! - `config.toml` loading with secret references
//! - The `schedule`, `run-now`, `daemon` and `config` commands

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;
