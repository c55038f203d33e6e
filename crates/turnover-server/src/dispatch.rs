//! Delivery of built schedules.
//!
//! A [`Dispatcher`] builds the schedule once and hands the resulting
//! [`ScheduleReport`] to each [`ScheduleSink`] in turn. Sinks are independent:
//! one failing never keeps the next from running, and every outcome ends up
//! as one line in the [`DispatchOutcome`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info};
use turnover_core::format::{format_text, rows_with_header};
use turnover_core::Schedule;
use turnover_providers::BoxFuture;

use crate::engine::ScheduleEngine;
use crate::error::{ServerError, ServerResult};

/// Result type for sink deliveries.
pub type DispatchResult<T> = ServerResult<T>;

/// Line reported when no sink is configured.
pub const NO_OUTPUTS_MESSAGE: &str = "No external outputs configured.";

/// Default report title.
pub const DEFAULT_TITLE: &str = "Cleaner Schedule";

/// Everything a sink may need from one build.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleReport {
    /// Report title.
    pub title: String,
    /// When the report was built.
    pub generated_at: DateTime<Utc>,
    /// The local date of the run; names output files.
    pub run_date: NaiveDate,
    /// The schedule itself.
    pub schedule: Schedule,
    /// Rendered message text.
    pub text: String,
    /// Spreadsheet cells, header first.
    pub rows: Vec<Vec<String>>,
}

impl ScheduleReport {
    /// Renders a report for a built schedule.
    pub fn new(
        title: impl Into<String>,
        generated_at: DateTime<Utc>,
        run_date: NaiveDate,
        schedule: Schedule,
    ) -> Self {
        let text = format_text(&schedule);
        let rows = rows_with_header(&schedule);
        Self {
            title: title.into(),
            generated_at,
            run_date,
            schedule,
            text,
            rows,
        }
    }

    /// Base name for output files, e.g. `cleaner_schedule_20240105`.
    pub fn file_stem(&self) -> String {
        format!("cleaner_schedule_{}", self.run_date.format("%Y%m%d"))
    }
}

/// A delivery target for built schedules.
pub trait ScheduleSink: Send + Sync {
    /// Returns the name used in outcome lines (e.g., "file", "webhook").
    fn name(&self) -> &str;

    /// Delivers the report, returning a short description of what happened.
    fn deliver<'a>(&'a self, report: &'a ScheduleReport) -> BoxFuture<'a, DispatchResult<String>>;
}

/// Writes the text and the spreadsheet rows into a directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    directory: PathBuf,
}

impl FileSink {
    /// Creates a sink writing into `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// The output directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    async fn write(&self, report: &ScheduleReport) -> DispatchResult<String> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let stem = report.file_stem();
        let text_path = self.directory.join(format!("{}.txt", stem));
        let rows_path = self.directory.join(format!("{}.json", stem));

        let text = format!("{}\n\n{}\n", report.title, report.text);
        tokio::fs::write(&text_path, text).await?;
        tokio::fs::write(&rows_path, serde_json::to_vec_pretty(&report.rows)?).await?;

        Ok(format!(
            "wrote {} and {}",
            text_path.display(),
            rows_path.display()
        ))
    }
}

impl ScheduleSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn deliver<'a>(&'a self, report: &'a ScheduleReport) -> BoxFuture<'a, DispatchResult<String>> {
        Box::pin(self.write(report))
    }
}

/// POSTs the JSON report to a URL.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    /// Creates a webhook sink.
    pub fn new(url: impl Into<String>, timeout: Duration) -> DispatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServerError::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn post(&self, report: &ScheduleReport) -> DispatchResult<String> {
        let response = self
            .client
            .post(&self.url)
            .json(report)
            .send()
            .await
            .map_err(|e| ServerError::http(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(format!("posted ({})", status))
        } else {
            Err(ServerError::http(format!("HTTP {}", status)))
        }
    }
}

impl ScheduleSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    fn deliver<'a>(&'a self, report: &'a ScheduleReport) -> BoxFuture<'a, DispatchResult<String>> {
        Box::pin(self.post(report))
    }
}

/// The result of a dispatch run.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// The report handed to the sinks.
    pub report: ScheduleReport,
    /// One line per sink, in order.
    pub results: Vec<String>,
    /// Number of sinks that failed.
    pub failures: usize,
}

impl DispatchOutcome {
    /// Returns true if every sink succeeded.
    pub fn is_success(&self) -> bool {
        self.failures == 0
    }

    /// The sink results as one block of text.
    pub fn results_text(&self) -> String {
        self.results.join("\n")
    }

    /// The schedule text followed by the sink results.
    pub fn summary(&self) -> String {
        format!("{}\n\n---\n{}", self.report.text, self.results_text())
    }
}

/// Builds a schedule and delivers it to every sink.
pub struct Dispatcher {
    engine: Arc<ScheduleEngine>,
    sinks: Vec<Box<dyn ScheduleSink>>,
    title: String,
}

impl Dispatcher {
    /// Creates a dispatcher with no sinks.
    pub fn new(engine: Arc<ScheduleEngine>) -> Self {
        Self {
            engine,
            sinks: Vec::new(),
            title: DEFAULT_TITLE.to_string(),
        }
    }

    /// Builder: add a sink. Sinks run in the order they were added.
    pub fn with_sink(mut self, sink: Box<dyn ScheduleSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Builder: set the report title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Names of the configured sinks.
    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Returns the engine.
    pub fn engine(&self) -> &ScheduleEngine {
        &self.engine
    }

    /// Builds the schedule for `window_days` days from today and delivers it.
    ///
    /// # Errors
    ///
    /// Only a failed build is an error. Sink failures are reported in the
    /// outcome.
    pub async fn run_now(&self, window_days: i64) -> ServerResult<DispatchOutcome> {
        let today = self.engine.today();
        let schedule = self.engine.build(today, window_days).await?;
        let report = ScheduleReport::new(&self.title, self.engine.now(), today, schedule);

        let mut results = Vec::with_capacity(self.sinks.len().max(1));
        let mut failures = 0;

        for sink in &self.sinks {
            match sink.deliver(&report).await {
                Ok(detail) => {
                    info!(sink = sink.name(), detail = %detail, "Delivered schedule");
                    results.push(format!("{}: {}", sink.name(), detail));
                }
                Err(e) => {
                    error!(sink = sink.name(), error = %e, "Failed to deliver schedule");
                    results.push(format!("{} failed: {}", sink.name(), e));
                    failures += 1;
                }
            }
        }

        if self.sinks.is_empty() {
            results.push(NO_OUTPUTS_MESSAGE.to_string());
        }

        Ok(DispatchOutcome {
            report,
            results,
            failures,
        })
    }
}
