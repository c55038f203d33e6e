//! turnover CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use turnover_core::{LogMode, init_tracing};

use turnover_client::cli::{Cli, Command, ConfigAction};
use turnover_client::commands;
use turnover_client::config::ClientConfig;
use turnover_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mode = LogMode::for_command(cli.debug, cli.command.is_daemon());
    if let Err(e) = init_tracing(mode) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = if cli.config.is_some() {
        ClientConfig::load_from(&config_path).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().map_err(ClientError::Config)?
    };

    match cli.command {
        Command::Schedule {
            days,
            start,
            format,
        } => commands::schedule::run(&config, days, start, format).await,
        Command::RunNow { days } => commands::run_now::run(&config, days).await,
        Command::Daemon => commands::daemon::run(&config).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}
