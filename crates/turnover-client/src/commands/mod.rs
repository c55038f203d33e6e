//! Subcommand implementations.

pub mod config;
pub mod daemon;
pub mod run_now;
pub mod schedule;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use turnover_providers::HttpFeedSource;
use turnover_server::{Dispatcher, FileSink, ScheduleEngine, WebhookSink};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Builds an engine fetching feeds over HTTP.
pub fn build_engine(config: &ClientConfig) -> ClientResult<ScheduleEngine> {
    let engine_config = config.engine_config().map_err(ClientError::Config)?;
    if engine_config.units.is_empty() {
        warn!(
            path = %ClientConfig::default_path().display(),
            "No units with a feed URL configured"
        );
    }
    let source = HttpFeedSource::new(config.feed_source_config())?;
    Ok(ScheduleEngine::new(engine_config, Arc::new(source)))
}

/// Wraps an engine with the outputs from the `[output]` and `[webhook]` sections.
pub fn build_dispatcher(config: &ClientConfig, engine: ScheduleEngine) -> ClientResult<Dispatcher> {
    let mut dispatcher = Dispatcher::new(Arc::new(engine)).with_title(&config.output.title);

    if let Some(ref directory) = config.output.directory {
        dispatcher = dispatcher.with_sink(Box::new(FileSink::new(directory)));
    }

    if let Some(url) = config.webhook_url().map_err(ClientError::Config)? {
        let timeout = Duration::from_secs(config.fetch.timeout_secs);
        dispatcher = dispatcher.with_sink(Box::new(WebhookSink::new(url, timeout)?));
    }

    debug!(sinks = ?dispatcher.sink_names(), "Dispatcher ready");
    Ok(dispatcher)
}
