//! Core types: stays, cleaning tasks, schedule merging, formatting

pub mod clock;
pub mod error;
pub mod format;
pub mod schedule;
pub mod stay;
pub mod task;
pub mod time;
pub mod tracing;
pub mod warning;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{ScheduleError, ScheduleResult};
pub use format::{OutputFormat, ScheduleRow, format_json, format_text, schedule_rows};
pub use schedule::{Schedule, ScheduleOptions, build_schedule, build_schedule_with};
pub use stay::StayInterval;
pub use task::{CleaningTask, TaskKind};
pub use time::{ScheduleWindow, today_in};
pub use tracing::{LogMode, TracingError, init_tracing};
pub use warning::{Warning, WarningKind};
