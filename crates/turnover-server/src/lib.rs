//! Engine, feed cache, dispatch and daily scheduler.
//!
//! This crate runs the cleaning schedule end to end:
//! - Concurrent per-unit feed fetching with timeouts
//! - Feed caching with expiry
//! - Delivery of the built schedule to configured sinks
//! - A daily background run at a fixed local hour
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use turnover_providers::{HttpFeedSource, HttpFeedSourceConfig};
//! use turnover_server::{EngineConfig, ScheduleEngine, UnitFeed};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = HttpFeedSource::new(HttpFeedSourceConfig::default())?;
//!     let config = EngineConfig::new(vec![UnitFeed::new("Flat 7", "https://example.com/7.ics")]);
//!     let engine = ScheduleEngine::new(config, Arc::new(source));
//!
//!     let schedule = engine.build_from_today(14).await?;
//!     println!("{}", turnover_core::format_text(&schedule));
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod dispatch;
mod engine;
mod error;
mod scheduler;

pub use cache::{CacheEntry, FeedCache, MemoryFeedCache};
pub use config::{EngineConfig, UnitFeed};
pub use dispatch::{
    DEFAULT_TITLE, DispatchOutcome, DispatchResult, Dispatcher, FileSink, NO_OUTPUTS_MESSAGE,
    ScheduleReport, ScheduleSink, WebhookSink,
};
pub use engine::ScheduleEngine;
pub use error::{ServerError, ServerResult};
pub use scheduler::{
    DailyScheduler, RunOutcome, SchedulerCommand, SchedulerConfig, SchedulerHandle,
    SchedulerState, SharedSchedulerState, new_scheduler_state, should_run,
};
