//! Output formatting for cleaning schedules.
//!
//! This module renders a [`Schedule`] for the delivery channels:
//! - **Text**: one line per day, suitable for chat messages and terminals
//! - **Rows**: spreadsheet rows (`Date | Flat | Action`)
//! - **JSON**: the serialized schedule, warnings included
//!
//! Every output is derived from the schedule alone; nothing here touches
//! feed data.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schedule::Schedule;
use crate::task::CleaningTask;

/// Text used when the window holds no check-ins or check-outs.
pub const EMPTY_SCHEDULE_TEXT: &str = "No check-ins or check-outs in the selected window.";

/// Marker appended to tasks coming from overlapping bookings.
pub const CONFLICT_MARKER: &str = "(!)";

/// The output format for schedule display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Human-readable message text.
    #[default]
    Text,
    /// Tab-separated spreadsheet rows with a header.
    Rows,
    /// Machine-readable JSON output.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "rows" => Ok(Self::Rows),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown output format `{}` (expected text, rows or json)",
                other
            )),
        }
    }
}

/// One spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// Date as `YYYY-MM-DD (Day)`.
    pub date: String,
    /// Unit name.
    pub unit: String,
    /// What the cleaner has to do.
    pub action: String,
}

impl ScheduleRow {
    /// Header cells, in column order.
    pub const HEADER: [&'static str; 3] = ["Date", "Flat", "Action"];

    fn from_task(task: &CleaningTask) -> Self {
        let mut action = task.kind.action_label().to_string();
        if task.conflict {
            action.push_str(" (conflict)");
        }
        Self {
            date: task.date.format("%Y-%m-%d (%a)").to_string(),
            unit: task.unit_id.clone(),
            action,
        }
    }

    /// The row as cells, in column order.
    pub fn cells(&self) -> [&str; 3] {
        [self.date.as_str(), self.unit.as_str(), self.action.as_str()]
    }
}

/// Renders a schedule in the requested format.
pub fn render(schedule: &Schedule, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(format_text(schedule)),
        OutputFormat::Rows => Ok(format_rows_tsv(schedule)),
        OutputFormat::Json => format_json(schedule),
    }
}

/// Formats a schedule as message text.
///
/// ```text
/// Fri 05 Jan - Flat 7: out/clean/in; Flat 8: check-in
/// Mon 08 Jan - Flat 7: out/clean
/// ```
pub fn format_text(schedule: &Schedule) -> String {
    let mut lines: Vec<String> = schedule
        .by_date()
        .into_iter()
        .map(|(date, tasks)| {
            let items: Vec<String> = tasks.into_iter().map(text_item).collect();
            format!("{} - {}", date.format("%a %d %b"), items.join("; "))
        })
        .collect();

    if lines.is_empty() {
        lines.push(EMPTY_SCHEDULE_TEXT.to_string());
    }

    if !schedule.warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings:".to_string());
        lines.extend(schedule.warnings.iter().map(|w| format!("- {}", w)));
    }

    lines.join("\n")
}

fn text_item(task: &CleaningTask) -> String {
    if task.conflict {
        format!(
            "{}: {} {}",
            task.unit_id,
            task.kind.short_label(),
            CONFLICT_MARKER
        )
    } else {
        format!("{}: {}", task.unit_id, task.kind.short_label())
    }
}

/// Builds spreadsheet rows, one per task, without the header.
pub fn schedule_rows(schedule: &Schedule) -> Vec<ScheduleRow> {
    schedule.tasks.iter().map(ScheduleRow::from_task).collect()
}

/// Builds spreadsheet cells with the header as the first row.
pub fn rows_with_header(schedule: &Schedule) -> Vec<Vec<String>> {
    let mut rows = vec![ScheduleRow::HEADER.iter().map(|c| c.to_string()).collect()];
    rows.extend(
        schedule_rows(schedule)
            .iter()
            .map(|row| row.cells().iter().map(|c| c.to_string()).collect()),
    );
    rows
}

/// Formats the rows as tab-separated text with a header line.
pub fn format_rows_tsv(schedule: &Schedule) -> String {
    rows_with_header(schedule)
        .iter()
        .map(|row| row.join("\t"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats a schedule as pretty-printed JSON.
pub fn format_json(schedule: &Schedule) -> serde_json::Result<String> {
    serde_json::to_string_pretty(schedule)
}
