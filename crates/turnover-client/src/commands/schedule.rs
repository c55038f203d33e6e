//! `turnover schedule`: print the schedule.

use chrono::NaiveDate;
use tracing::info;
use turnover_core::OutputFormat;
use turnover_core::format::render;
use turnover_server::ScheduleEngine;

use crate::config::{ClientConfig, check_window_days};
use crate::error::{ClientError, ClientResult};

/// Builds the schedule and prints it.
pub async fn run(
    config: &ClientConfig,
    days: Option<i64>,
    start: Option<NaiveDate>,
    format: OutputFormat,
) -> ClientResult<()> {
    let days = days.unwrap_or(config.default_days);
    check_window_days(days).map_err(ClientError::Config)?;

    let engine = super::build_engine(config)?;
    let output = render_schedule(&engine, start, days, format).await?;
    println!("{}", output);
    Ok(())
}

/// Builds the schedule from `start` (today if unset) and renders it.
pub async fn render_schedule(
    engine: &ScheduleEngine,
    start: Option<NaiveDate>,
    days: i64,
    format: OutputFormat,
) -> ClientResult<String> {
    let start = start.unwrap_or_else(|| engine.today());
    let schedule = engine.build(start, days).await?;
    info!(
        tasks = schedule.tasks.len(),
        warnings = schedule.warnings.len(),
        "Schedule built"
    );
    render(&schedule, format).map_err(|e| ClientError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use turnover_core::FakeClock;
    use turnover_providers::{MemoryFeedSource, ProviderError};
    use turnover_server::{EngineConfig, UnitFeed};

    const FLAT_7: &str = "BEGIN:VCALENDAR\r\n\
        VERSION:2.0\r\n\
        BEGIN:VEVENT\r\n\
        UID:a1@example.com\r\n\
        DTSTART;VALUE=DATE:20240101\r\n\
        DTEND;VALUE=DATE:20240105\r\n\
        SUMMARY:Reserved\r\n\
        END:VEVENT\r\n\
        BEGIN:VEVENT\r\n\
        UID:a2@example.com\r\n\
        DTSTART;VALUE=DATE:20240105\r\n\
        DTEND;VALUE=DATE:20240108\r\n\
        SUMMARY:Reserved\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";

    fn engine(source: MemoryFeedSource) -> ScheduleEngine {
        let config = EngineConfig::new(vec![
            UnitFeed::new("Flat 7", "https://example.com/7.ics"),
            UnitFeed::new("Flat 8", "https://example.com/8.ics"),
        ]);
        let clock = FakeClock::new(Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap());
        ScheduleEngine::with_clock(config, Arc::new(source), Arc::new(clock))
    }

    #[tokio::test]
    async fn renders_text_from_today() {
        let source = MemoryFeedSource::new()
            .with_feed("https://example.com/7.ics", FLAT_7)
            .with_error(
                "https://example.com/8.ics",
                ProviderError::http_status("HTTP 500"),
            );

        let text = render_schedule(&engine(source), None, 7, OutputFormat::Text)
            .await
            .unwrap();

        assert!(text.contains("Fri 05 Jan - Flat 7: out/clean/in"), "{}", text);
        assert!(text.contains("Mon 08 Jan - Flat 7: out/clean"), "{}", text);
        assert!(!text.contains("Mon 01 Jan"), "{}", text);
        assert!(text.contains("Flat 8 [FetchError]"), "{}", text);
    }

    #[tokio::test]
    async fn renders_rows_from_start_date() {
        let source = MemoryFeedSource::new()
            .with_feed("https://example.com/7.ics", FLAT_7)
            .with_feed("https://example.com/8.ics", "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR");
        let start = NaiveDate::from_ymd_opt(2024, 1, 1);

        let rows = render_schedule(&engine(source), start, 3, OutputFormat::Rows)
            .await
            .unwrap();

        let lines: Vec<&str> = rows.lines().collect();
        assert_eq!(lines[0], "Date\tFlat\tAction");
        assert_eq!(lines[1], "2024-01-01 (Mon)\tFlat 7\tCheck-in");
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn zero_day_window_fails() {
        let source = MemoryFeedSource::new();
        let err = render_schedule(&engine(source), None, 0, OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Schedule(_)));
    }

    #[tokio::test]
    async fn run_rejects_days_out_of_range() {
        let config = ClientConfig::default();
        let err = run(&config, Some(61), None, OutputFormat::Text)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
