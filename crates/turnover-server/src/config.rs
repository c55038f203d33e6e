//! Engine configuration.

use std::time::Duration;

use chrono_tz::Tz;
use turnover_core::ScheduleOptions;
use turnover_providers::DEFAULT_HORIZON_DAYS;

/// One unit and where its feed lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFeed {
    /// Unit name, used as `unit_id` everywhere downstream.
    pub name: String,
    /// Feed URL. Empty means the unit is not wired up yet.
    pub url: String,
}

impl UnitFeed {
    /// Creates a unit feed.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Returns true if the unit has a feed URL.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Units to fetch, in report order.
    pub units: Vec<UnitFeed>,

    /// The property timezone; decides which calendar day a datetime is on.
    pub timezone: Tz,

    /// Days either side of today that events may fall in.
    pub horizon_days: u64,

    /// Per-unit fetch timeout.
    pub fetch_timeout: Duration,

    /// How long a fetched feed is reused. Zero disables the cache.
    pub cache_ttl: Duration,

    /// Options passed to the merger.
    pub schedule: ScheduleOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            units: Vec::new(),
            timezone: chrono_tz::Europe::London,
            horizon_days: DEFAULT_HORIZON_DAYS,
            fetch_timeout: Duration::from_secs(30),
            cache_ttl: Duration::ZERO,
            schedule: ScheduleOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration for the given units.
    pub fn new(units: Vec<UnitFeed>) -> Self {
        Self {
            units,
            ..Default::default()
        }
    }

    /// Builder: set the property timezone.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Builder: set the normalization horizon.
    pub fn with_horizon_days(mut self, days: u64) -> Self {
        self.horizon_days = days;
        self
    }

    /// Builder: set the per-unit fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Builder: set the feed cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Builder: include or omit check-in entries.
    pub fn with_check_ins(mut self, include: bool) -> Self {
        self.schedule = self.schedule.with_check_ins(include);
        self
    }

    /// Units that have a feed URL.
    pub fn configured_units(&self) -> impl Iterator<Item = &UnitFeed> {
        self.units.iter().filter(|unit| unit.is_configured())
    }
}
