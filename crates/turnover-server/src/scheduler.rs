//! Daily background runs.
//!
//! The scheduler wakes every poll interval and fires once per local day, on
//! the first poll that falls inside the configured hour. The day is marked as
//! done whether the run succeeds or not, so a failing run is not retried
//! until the next day.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};
use turnover_core::{Clock, SystemClock};

use crate::error::{ServerError, ServerResult};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Local hour (0-23) at which the daily run fires.
    pub run_hour: u32,
    /// How often the clock is checked.
    pub poll_interval: Duration,
    /// Timezone the hour and the day are read in.
    pub timezone: Tz,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            run_hour: 8,
            poll_interval: Duration::from_secs(60),
            timezone: chrono_tz::Europe::London,
        }
    }
}

impl SchedulerConfig {
    /// Creates a config firing at `run_hour`.
    pub fn new(run_hour: u32) -> Self {
        Self {
            run_hour,
            ..Default::default()
        }
    }

    /// Builder: set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Builder: set the timezone.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }
}

/// Returns true if a daily run is due at local time `now`.
pub fn should_run(now: NaiveDateTime, run_hour: u32, last_run_date: Option<NaiveDate>) -> bool {
    now.hour() == run_hour && last_run_date != Some(now.date())
}

/// Commands that can be sent to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Run immediately, outside the daily slot.
    RunNow,
    /// Stop the scheduler.
    Stop,
}

/// How the last run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run finished; carries its summary.
    Succeeded(String),
    /// The run failed; carries the error message.
    Failed(String),
}

/// Scheduler state.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    /// Local date of the last daily run.
    pub last_run_date: Option<NaiveDate>,
    /// When the last run (daily or manual) started.
    pub last_run_at: Option<DateTime<Utc>>,
    /// How the last run ended.
    pub last_outcome: Option<RunOutcome>,
    /// Number of consecutive failed runs.
    pub consecutive_failures: u32,
    /// Total runs since start.
    pub runs: u32,
}

impl SchedulerState {
    /// Creates a new scheduler state.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, at: DateTime<Utc>, outcome: RunOutcome) {
        self.runs += 1;
        self.last_run_at = Some(at);
        match outcome {
            RunOutcome::Succeeded(_) => self.consecutive_failures = 0,
            RunOutcome::Failed(_) => self.consecutive_failures += 1,
        }
        self.last_outcome = Some(outcome);
    }
}

/// Shared scheduler state.
pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

/// Creates a new shared scheduler state.
pub fn new_scheduler_state() -> SharedSchedulerState {
    Arc::new(RwLock::new(SchedulerState::new()))
}

/// Fires a job once a day at a fixed local hour.
pub struct DailyScheduler {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    state: SharedSchedulerState,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl DailyScheduler {
    /// Creates a new scheduler using the system clock.
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a new scheduler reading time from `clock`.
    pub fn with_clock(config: SchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            clock,
            state: new_scheduler_state(),
            command_tx,
            command_rx,
        }
    }

    /// Returns a handle for sending commands to the scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
        }
    }

    /// Returns the shared state.
    pub fn state(&self) -> SharedSchedulerState {
        self.state.clone()
    }

    /// Runs the scheduler loop until stopped.
    ///
    /// `job` is called for every run and returns a summary on success or an
    /// error message on failure.
    pub async fn run<F, Fut>(self, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<String, String>> + Send,
    {
        // The sender stays alive so dropping every handle does not stop the loop.
        let Self {
            config,
            clock,
            state,
            command_tx: _command_tx,
            mut command_rx,
        } = self;

        info!(
            run_hour = config.run_hour,
            poll_secs = config.poll_interval.as_secs(),
            timezone = %config.timezone,
            "Scheduler started"
        );

        loop {
            let now = clock.now();
            let local = now.with_timezone(&config.timezone).naive_local();
            let last_run_date = state.read().await.last_run_date;

            if should_run(local, config.run_hour, last_run_date) {
                info!(date = %local.date(), "Starting daily run");
                state.write().await.last_run_date = Some(local.date());
                execute(&job, &state, now).await;
            } else {
                debug!(local = %local, "Daily run not due");
            }

            tokio::select! {
                _ = tokio::time::sleep(config.poll_interval) => {}
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::RunNow) => {
                            info!("Received RunNow command");
                            execute(&job, &state, clock.now()).await;
                        }
                        Some(SchedulerCommand::Stop) | None => {
                            info!("Scheduler stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}

async fn execute<F, Fut>(job: &F, state: &SharedSchedulerState, at: DateTime<Utc>)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<String, String>>,
{
    let outcome = match job().await {
        Ok(summary) => {
            info!("Run completed successfully");
            RunOutcome::Succeeded(summary)
        }
        Err(e) => {
            warn!(error = %e, "Run failed");
            RunOutcome::Failed(e)
        }
    };
    state.write().await.record(at, outcome);
}

/// Handle for sending commands to a running scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedSchedulerState,
}

impl SchedulerHandle {
    /// Triggers an immediate run.
    pub async fn run_now(&self) -> ServerResult<()> {
        self.send(SchedulerCommand::RunNow).await
    }

    /// Stops the scheduler.
    pub async fn stop(&self) -> ServerResult<()> {
        self.send(SchedulerCommand::Stop).await
    }

    /// Returns the current scheduler state.
    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }

    async fn send(&self, command: SchedulerCommand) -> ServerResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ServerError::SchedulerStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::TimeZone;
    use turnover_core::FakeClock;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    mod should_run {
        use super::*;

        #[test]
        fn fires_in_run_hour() {
            assert!(should_run(local(2024, 1, 5, 8, 0), 8, None));
            assert!(should_run(local(2024, 1, 5, 8, 59), 8, None));
        }

        #[test]
        fn waits_outside_run_hour() {
            assert!(!should_run(local(2024, 1, 5, 7, 59), 8, None));
            assert!(!should_run(local(2024, 1, 5, 9, 0), 8, None));
        }

        #[test]
        fn fires_once_per_day() {
            let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
            assert!(!should_run(local(2024, 1, 5, 8, 30), 8, Some(today)));
            assert!(should_run(local(2024, 1, 6, 8, 0), 8, Some(today)));
        }
    }

    #[test]
    fn state_records_outcomes() {
        let mut state = SchedulerState::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap();

        state.record(at, RunOutcome::Failed("boom".to_string()));
        state.record(at, RunOutcome::Failed("boom".to_string()));
        assert_eq!(state.consecutive_failures, 2);

        state.record(at, RunOutcome::Succeeded("ok".to_string()));
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.runs, 3);
        assert_eq!(state.last_run_at, Some(at));
    }

    fn counting_job(count: Arc<AtomicU32>, fail: bool) -> impl Fn() -> std::future::Ready<Result<String, String>> + Send + Sync + 'static {
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if fail {
                Err("feed server down".to_string())
            } else {
                Ok("sent".to_string())
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_once_per_day_at_run_hour() {
        // 08:00 UTC in January is 08:00 in London.
        let clock = FakeClock::new(Utc.with_ymd_and_hms(2024, 1, 5, 7, 59, 0).unwrap());
        let scheduler = DailyScheduler::with_clock(SchedulerConfig::new(8), Arc::new(clock.clone()));
        let handle = scheduler.handle();
        let count = Arc::new(AtomicU32::new(0));

        let task = tokio::spawn(scheduler.run(counting_job(count.clone(), false)));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        clock.set(Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 30).unwrap());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Later polls in the same hour do nothing.
        clock.set(Utc.with_ymd_and_hms(2024, 1, 5, 8, 30, 0).unwrap());
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        clock.set(Utc.with_ymd_and_hms(2024, 1, 6, 8, 0, 0).unwrap());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        let state = handle.state().await;
        assert_eq!(state.last_run_date, NaiveDate::from_ymd_opt(2024, 1, 6));
        assert_eq!(state.last_outcome, Some(RunOutcome::Succeeded("sent".to_string())));

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_run_is_not_retried_same_day() {
        let clock = FakeClock::new(Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap());
        let scheduler = DailyScheduler::with_clock(SchedulerConfig::new(8), Arc::new(clock));
        let handle = scheduler.handle();
        let count = Arc::new(AtomicU32::new(0));

        let task = tokio::spawn(scheduler.run(counting_job(count.clone(), true)));

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let state = handle.state().await;
        assert_eq!(state.consecutive_failures, 1);
        assert_eq!(
            state.last_outcome,
            Some(RunOutcome::Failed("feed server down".to_string()))
        );

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn run_now_command_runs_immediately() {
        let clock = FakeClock::new(Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap());
        let scheduler = DailyScheduler::with_clock(SchedulerConfig::new(8), Arc::new(clock));
        let handle = scheduler.handle();
        let count = Arc::new(AtomicU32::new(0));

        let task = tokio::spawn(scheduler.run(counting_job(count.clone(), false)));

        handle.run_now().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        // Manual runs do not consume the daily slot.
        assert_eq!(handle.state().await.last_run_date, None);

        handle.stop().await.unwrap();
        task.await.unwrap();
        assert!(handle.run_now().await.is_err());
    }
}
