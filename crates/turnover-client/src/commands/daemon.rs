//! `turnover daemon`: deliver the schedule every day at `run_hour`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use turnover_server::{DailyScheduler, Dispatcher};

use crate::config::{ClientConfig, check_window_days};
use crate::error::{ClientError, ClientResult};

/// Runs the daily scheduler in the foreground until Ctrl-C.
pub async fn run(config: &ClientConfig) -> ClientResult<()> {
    if !config.daemon.enabled {
        return Err(ClientError::Config(
            "the daemon is disabled; set `enabled = true` under [daemon]".to_string(),
        ));
    }
    config.validate().map_err(ClientError::Config)?;
    check_window_days(config.default_days).map_err(ClientError::Config)?;

    let engine = super::build_engine(config)?;
    let dispatcher = Arc::new(super::build_dispatcher(config, engine)?);
    let days = config.default_days;

    let scheduler = DailyScheduler::new(config.scheduler_config().map_err(ClientError::Config)?);
    let handle = scheduler.handle();

    info!(
        run_hour = config.daemon.run_hour,
        days = days,
        sinks = ?dispatcher.sink_names(),
        "Daemon starting"
    );

    let scheduler_task = tokio::spawn(scheduler.run(move || deliver(dispatcher.clone(), days)));

    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    if let Err(e) = handle.stop().await {
        warn!(error = %e, "Failed to send stop command to scheduler");
    }

    let _ = tokio::time::timeout(Duration::from_secs(5), scheduler_task).await;

    let state = handle.state().await;
    info!(
        runs = state.runs,
        consecutive_failures = state.consecutive_failures,
        "Daemon stopped"
    );
    Ok(())
}

/// One daily run: the summary on success, the sink results if any output failed.
pub async fn deliver(dispatcher: Arc<Dispatcher>, days: i64) -> Result<String, String> {
    let outcome = dispatcher.run_now(days).await.map_err(|e| e.to_string())?;
    if outcome.is_success() {
        Ok(outcome.summary())
    } else {
        Err(outcome.results_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use turnover_core::FakeClock;
    use turnover_providers::{MemoryFeedSource, ProviderError};
    use turnover_server::{EngineConfig, FileSink, ScheduleEngine, UnitFeed};

    fn dispatcher(source: MemoryFeedSource) -> Dispatcher {
        let config = EngineConfig::new(vec![UnitFeed::new("Flat 7", "https://example.com/7.ics")]);
        let clock = FakeClock::new(Utc.with_ymd_and_hms(2024, 1, 9, 8, 0, 0).unwrap());
        let engine = ScheduleEngine::with_clock(config, Arc::new(source), Arc::new(clock));
        Dispatcher::new(Arc::new(engine))
    }

    #[tokio::test]
    async fn deliver_reports_feed_warnings_as_success() {
        let source = MemoryFeedSource::new().with_error(
            "https://example.com/7.ics",
            ProviderError::timeout("no response after 30s"),
        );

        let summary = deliver(Arc::new(dispatcher(source)), 14).await.unwrap();
        assert!(summary.contains("Warnings:"));
        assert!(summary.contains("Flat 7 [FetchError]"));
    }

    #[tokio::test]
    async fn deliver_fails_when_an_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        std::fs::write(&blocker, "x").unwrap();

        let source = MemoryFeedSource::new();
        let dispatcher = dispatcher(source).with_sink(Box::new(FileSink::new(&blocker)));

        let err = deliver(Arc::new(dispatcher), 14).await.unwrap_err();
        assert!(err.starts_with("file failed:"), "{}", err);
    }

    #[tokio::test]
    async fn disabled_daemon_refuses_to_start() {
        let mut config = ClientConfig::default();
        config.daemon.enabled = false;

        let err = run(&config).await.unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
