//! Schedule merging.
//!
//! Reduces the stays of every unit to one ordered list of [`CleaningTask`]s
//! for a [`ScheduleWindow`]:
//!
//! 1. Stays are grouped per unit and sorted by check-in (ties by source uid)
//! 2. Overlapping stays of one unit are flagged and reported, never dropped
//! 3. Every checkout becomes a task; a checkout on a day somebody else
//!    arrives at the same unit becomes a same-day turnover
//! 4. Arrivals not already covered by a turnover become check-in entries
//! 5. Only days inside the window are kept, ordered by `(date, unit_id)`
//!
//! Data-quality problems are returned as [`Warning`]s next to the tasks.
//! The only error is an invalid window.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ScheduleResult;
use crate::stay::StayInterval;
use crate::task::{CleaningTask, TaskKind};
use crate::time::ScheduleWindow;
use crate::warning::{Warning, WarningKind};

/// Options for schedule building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOptions {
    /// Emit [`TaskKind::CheckinOnly`] entries for arrivals without a
    /// same-day checkout.
    pub include_check_ins: bool,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            include_check_ins: true,
        }
    }
}

impl ScheduleOptions {
    /// Builder: toggle check-in entries.
    pub fn with_check_ins(mut self, include: bool) -> Self {
        self.include_check_ins = include;
        self
    }
}

/// A built schedule: ordered tasks plus everything that went wrong on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// The requested window.
    pub window: ScheduleWindow,
    /// Tasks sorted by `(date, unit_id)`.
    pub tasks: Vec<CleaningTask>,
    /// Non-fatal problems, in the order they were found.
    pub warnings: Vec<Warning>,
}

impl Schedule {
    /// Creates an empty schedule for a window.
    pub fn empty(window: ScheduleWindow) -> Self {
        Self {
            window,
            tasks: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Returns true if there are no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks on a given day.
    pub fn tasks_on(&self, date: NaiveDate) -> impl Iterator<Item = &CleaningTask> {
        self.tasks.iter().filter(move |t| t.date == date)
    }

    /// Tasks grouped by day, in date order. Days without tasks are absent.
    pub fn by_date(&self) -> BTreeMap<NaiveDate, Vec<&CleaningTask>> {
        let mut days: BTreeMap<NaiveDate, Vec<&CleaningTask>> = BTreeMap::new();
        for task in &self.tasks {
            days.entry(task.date).or_default().push(task);
        }
        days
    }

    /// Number of tasks that need a cleaner.
    pub fn cleaning_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.requires_cleaning()).count()
    }

    /// Warnings of one kind.
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    /// Prepends warnings collected before the merge (fetch, parse, normalize).
    pub fn with_upstream_warnings(mut self, mut upstream: Vec<Warning>) -> Self {
        upstream.append(&mut self.warnings);
        self.warnings = upstream;
        self
    }
}

/// Builds the schedule for `window_days` days starting at `window_start`
/// with default options.
///
/// # Errors
///
/// Returns a configuration error if `window_days <= 0`.
pub fn build_schedule(
    intervals: &[StayInterval],
    window_start: NaiveDate,
    window_days: i64,
) -> ScheduleResult<Schedule> {
    build_schedule_with(
        intervals,
        window_start,
        window_days,
        &ScheduleOptions::default(),
    )
}

/// Builds the schedule with explicit options.
///
/// # Errors
///
/// Returns a configuration error if `window_days <= 0`.
pub fn build_schedule_with(
    intervals: &[StayInterval],
    window_start: NaiveDate,
    window_days: i64,
    options: &ScheduleOptions,
) -> ScheduleResult<Schedule> {
    let window = ScheduleWindow::new(window_start, window_days)?;
    let mut warnings = Vec::new();
    let mut tasks: BTreeMap<(NaiveDate, String), CleaningTask> = BTreeMap::new();

    for (unit_id, mut stays) in partition_by_unit(intervals) {
        stays.sort_by(|a, b| {
            a.check_in()
                .cmp(&b.check_in())
                .then_with(|| a.source_uid().cmp(b.source_uid()))
        });

        let conflicted = detect_conflicts(unit_id, &stays, &window, &mut warnings);
        let arrivals: HashSet<NaiveDate> = stays.iter().map(|s| s.check_in()).collect();

        for (stay, &conflict) in stays.iter().zip(&conflicted) {
            let date = stay.check_out();
            if !window.contains(date) {
                continue;
            }
            let task = if arrivals.contains(&date) {
                CleaningTask::turnover(unit_id, date)
            } else {
                CleaningTask::checkout(unit_id, date)
            };
            insert_checkout(&mut tasks, task.with_conflict(conflict));
        }

        if options.include_check_ins {
            for (stay, &conflict) in stays.iter().zip(&conflicted) {
                let date = stay.check_in();
                if !window.contains(date) {
                    continue;
                }
                tasks
                    .entry((date, unit_id.to_string()))
                    .and_modify(|existing| {
                        if existing.kind == TaskKind::CheckinOnly {
                            existing.conflict |= conflict;
                        }
                    })
                    .or_insert_with(|| CleaningTask::check_in(unit_id, date).with_conflict(conflict));
            }
        }
    }

    let schedule = Schedule {
        window,
        tasks: tasks.into_values().collect(),
        warnings,
    };

    info!(
        start = %window.start,
        days = window.days(),
        tasks = schedule.tasks.len(),
        cleanings = schedule.cleaning_count(),
        warnings = schedule.warnings.len(),
        "Built cleaning schedule"
    );

    Ok(schedule)
}

/// Groups stays by unit, units in name order.
fn partition_by_unit(intervals: &[StayInterval]) -> BTreeMap<&str, Vec<&StayInterval>> {
    let mut units: BTreeMap<&str, Vec<&StayInterval>> = BTreeMap::new();
    for stay in intervals {
        units.entry(stay.unit_id()).or_default().push(stay);
    }
    units
}

/// Flags every stay that overlaps another stay of the same unit.
///
/// `stays` must be sorted by check-in. One warning is recorded per
/// overlapping pair whose shared nights touch the window.
fn detect_conflicts(
    unit_id: &str,
    stays: &[&StayInterval],
    window: &ScheduleWindow,
    warnings: &mut Vec<Warning>,
) -> Vec<bool> {
    let mut conflicted = vec![false; stays.len()];
    // Earlier stays still occupied on the current stay's check-in night.
    let mut active: Vec<usize> = Vec::new();

    for (idx, stay) in stays.iter().enumerate() {
        active.retain(|&prev_idx| stays[prev_idx].check_out() > stay.check_in());

        for &prev_idx in &active {
            let prev = stays[prev_idx];
            if !prev.overlaps(stay) {
                continue;
            }
            conflicted[prev_idx] = true;
            conflicted[idx] = true;

            let overlap_end = prev.check_out().min(stay.check_out());
            if window.intersects(stay.check_in(), overlap_end) {
                warn!(
                    unit = %unit_id,
                    first = %prev.source_uid(),
                    second = %stay.source_uid(),
                    "Overlapping bookings"
                );
                warnings.push(Warning::conflict(
                    unit_id,
                    format!(
                        "bookings {} ({} to {}) and {} ({} to {}) overlap",
                        prev.source_uid(),
                        prev.check_in(),
                        prev.check_out(),
                        stay.source_uid(),
                        stay.check_in(),
                        stay.check_out()
                    ),
                ));
            }
        }

        active.push(idx);
    }

    conflicted
}

/// Inserts a checkout-triggered task, collapsing duplicates on the same
/// unit and day.
fn insert_checkout(tasks: &mut BTreeMap<(NaiveDate, String), CleaningTask>, task: CleaningTask) {
    let key = (task.date, task.unit_id.clone());
    match tasks.get_mut(&key) {
        Some(existing) => {
            debug!(unit = %task.unit_id, date = %task.date, "Collapsing duplicate checkout");
            if task.kind == TaskKind::SameDayTurnover {
                existing.kind = TaskKind::SameDayTurnover;
                existing.next_check_in = task.next_check_in;
            }
            existing.conflict |= task.conflict;
        }
        None => {
            tasks.insert(key, task);
        }
    }
}
