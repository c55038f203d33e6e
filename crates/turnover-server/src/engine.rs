//! Schedule engine: fetch every unit, parse, normalize, merge.
//!
//! Feeds are fetched concurrently, one future per unit, each under its own
//! timeout. A unit that fails to fetch or parse contributes a warning and no
//! stays; the other units still make it into the schedule.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures_util::future::join_all;
use tracing::{debug, info, warn};
use turnover_core::{
    Clock, Schedule, ScheduleWindow, StayInterval, SystemClock, Warning, build_schedule_with,
    today_in,
};
use turnover_providers::{
    FeedSource, NormalizeOptions, ProviderError, ProviderResult, normalize_events, parse_feed,
};

use crate::cache::{FeedCache, MemoryFeedCache};
use crate::config::{EngineConfig, UnitFeed};
use crate::error::ServerResult;

/// What one unit contributed to a build.
#[derive(Debug, Default)]
struct UnitLoad {
    intervals: Vec<StayInterval>,
    warnings: Vec<Warning>,
}

impl UnitLoad {
    fn failed(warning: Warning) -> Self {
        Self {
            intervals: Vec::new(),
            warnings: vec![warning],
        }
    }
}

/// Builds schedules from the configured units' feeds.
pub struct ScheduleEngine {
    config: EngineConfig,
    source: Arc<dyn FeedSource>,
    cache: Option<Arc<dyn FeedCache>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ScheduleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleEngine")
            .field("config", &self.config)
            .field("source", &self.source.name())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl ScheduleEngine {
    /// Creates an engine using the system clock.
    ///
    /// A non-zero `cache_ttl` in the configuration enables an in-memory feed
    /// cache.
    pub fn new(config: EngineConfig, source: Arc<dyn FeedSource>) -> Self {
        Self::with_clock(config, source, Arc::new(SystemClock))
    }

    /// Creates an engine reading time from `clock`.
    pub fn with_clock(config: EngineConfig, source: Arc<dyn FeedSource>, clock: Arc<dyn Clock>) -> Self {
        let cache: Option<Arc<dyn FeedCache>> = if config.cache_ttl.is_zero() {
            None
        } else {
            Some(Arc::new(MemoryFeedCache::new(clock.clone())))
        };
        Self {
            config,
            source,
            cache,
            clock,
        }
    }

    /// Builder: use a specific feed cache.
    pub fn with_cache(mut self, cache: Arc<dyn FeedCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The current instant.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Today's date in the property timezone.
    pub fn today(&self) -> NaiveDate {
        today_in(self.clock.now(), &self.config.timezone)
    }

    /// Builds the schedule for `window_days` days from `window_start`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid window, before any feed
    /// is fetched. Feed problems are warnings on the returned schedule.
    pub async fn build(&self, window_start: NaiveDate, window_days: i64) -> ServerResult<Schedule> {
        ScheduleWindow::new(window_start, window_days)?;

        let options = NormalizeOptions::new(self.config.timezone, self.today())
            .with_horizon_days(self.config.horizon_days);

        let units: Vec<&UnitFeed> = self.config.configured_units().collect();
        let skipped = self.config.units.len() - units.len();
        if skipped > 0 {
            debug!(skipped = skipped, "Skipping units without a feed URL");
        }

        let loads = join_all(units.iter().map(|unit| self.load_unit(unit, &options))).await;

        let mut intervals = Vec::new();
        let mut warnings = Vec::new();
        for load in loads {
            intervals.extend(load.intervals);
            warnings.extend(load.warnings);
        }

        let schedule =
            build_schedule_with(&intervals, window_start, window_days, &self.config.schedule)?;

        info!(
            units = units.len(),
            stays = intervals.len(),
            tasks = schedule.tasks.len(),
            warnings = warnings.len() + schedule.warnings.len(),
            "Built schedule"
        );

        Ok(schedule.with_upstream_warnings(warnings))
    }

    /// Builds the schedule starting today.
    pub async fn build_from_today(&self, window_days: i64) -> ServerResult<Schedule> {
        self.build(self.today(), window_days).await
    }

    async fn load_unit(&self, unit: &UnitFeed, options: &NormalizeOptions) -> UnitLoad {
        let bytes = match self.fetch_unit(unit).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(unit = %unit.name, error = %e, "Failed to fetch feed");
                return UnitLoad::failed(e.to_warning(&unit.name));
            }
        };

        let feed = match parse_feed(&bytes, &unit.name) {
            Ok(feed) => feed,
            Err(e) => {
                warn!(unit = %unit.name, error = %e, "Failed to parse feed");
                return UnitLoad::failed(e.to_warning(&unit.name));
            }
        };

        let mut warnings: Vec<Warning> = feed
            .incomplete()
            .iter()
            .map(|uid| {
                Warning::normalization(
                    &unit.name,
                    format!("booking {} has no usable start date", uid),
                )
            })
            .collect();

        let (intervals, dropped) = normalize_events(feed, options);
        warnings.extend(dropped);

        info!(unit = %unit.name, stays = intervals.len(), "Loaded feed");
        UnitLoad {
            intervals,
            warnings,
        }
    }

    async fn fetch_unit(&self, unit: &UnitFeed) -> ProviderResult<Vec<u8>> {
        if let Some(cache) = &self.cache
            && let Some(bytes) = cache.get(&unit.name)
        {
            debug!(unit = %unit.name, "Using cached feed");
            return Ok(bytes);
        }

        let timeout = self.config.fetch_timeout;
        let bytes = tokio::time::timeout(timeout, self.source.fetch(&unit.url))
            .await
            .map_err(|_| {
                ProviderError::timeout(format!("no response after {}s", timeout.as_secs()))
            })?
            .map_err(|e| e.with_unit(&unit.name))?;

        if let Some(cache) = &self.cache {
            let ttl = chrono::Duration::from_std(self.config.cache_ttl)
                .unwrap_or_else(|_| chrono::Duration::zero());
            cache.evict_expired();
            cache.put(&unit.name, bytes.clone(), self.clock.now() + ttl);
        }

        Ok(bytes)
    }
}
