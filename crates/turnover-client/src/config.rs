//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/turnover/config.toml` by default.
//!
//! Feed and webhook URLs support secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;
use turnover_core::time::DEFAULT_WINDOW_DAYS;
use turnover_providers::{DEFAULT_HORIZON_DAYS, HttpFeedSourceConfig, parse_feed_url};
use turnover_server::{DEFAULT_TITLE, EngineConfig, SchedulerConfig, UnitFeed};

use crate::secret;

/// Allowed values for `default_days` and `--days`.
pub const WINDOW_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=60;

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the turnover client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Property timezone (IANA name).
    pub timezone: String,

    /// Days covered when `--days` is not given.
    pub default_days: i64,

    /// Days either side of today that bookings may fall in.
    pub horizon_days: u64,

    /// Report plain check-ins as tasks.
    pub include_check_ins: bool,

    /// Units and their feeds, in report order.
    pub units: Vec<UnitSettings>,

    /// Feed fetching settings.
    pub fetch: FetchSettings,

    /// Daily run settings.
    pub daemon: DaemonSettings,

    /// File output settings.
    pub output: OutputSettings,

    /// Webhook output settings.
    pub webhook: WebhookSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/London".to_string(),
            default_days: DEFAULT_WINDOW_DAYS,
            horizon_days: DEFAULT_HORIZON_DAYS,
            include_check_ins: true,
            units: Vec::new(),
            fetch: FetchSettings::default(),
            daemon: DaemonSettings::default(),
            output: OutputSettings::default(),
            webhook: WebhookSettings::default(),
        }
    }
}

/// One rental unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitSettings {
    /// Unit name as shown in the schedule.
    pub name: String,

    /// Feed URL (supports `pass::` and `env::` prefixes). Empty skips the unit.
    pub url: String,
}

/// Feed fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Per-unit fetch timeout in seconds.
    pub timeout_secs: u64,

    /// How long a fetched feed is reused, in seconds. Zero disables the cache.
    pub cache_ttl_secs: u64,

    /// User-Agent header sent to feed hosts.
    pub user_agent: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            cache_ttl_secs: 0,
            user_agent: None,
        }
    }
}

/// Daily run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Whether `turnover daemon` may run.
    pub enabled: bool,

    /// Local hour (0-23) of the daily run.
    pub run_hour: u32,

    /// Seconds between checks.
    pub poll_interval_secs: u64,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            run_hour: 8,
            poll_interval_secs: 60,
        }
    }
}

/// File output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory for schedule files. Unset disables the file output.
    pub directory: Option<PathBuf>,

    /// Report title.
    pub title: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: None,
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

/// Webhook output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    /// URL receiving the JSON report (supports `pass::` and `env::` prefixes).
    pub url: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("turnover")
    }

    /// Parses the configured timezone.
    pub fn timezone(&self) -> Result<Tz, String> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| format!("unknown timezone `{}`", self.timezone))
    }

    /// Checks the configuration without resolving secret references.
    pub fn validate(&self) -> Result<(), String> {
        self.timezone()?;
        check_window_days(self.default_days)?;

        if self.daemon.run_hour > 23 {
            return Err(format!(
                "daemon.run_hour must be between 0 and 23, got {}",
                self.daemon.run_hour
            ));
        }
        if self.daemon.poll_interval_secs == 0 {
            return Err("daemon.poll_interval_secs must be greater than 0".to_string());
        }
        if self.fetch.timeout_secs == 0 {
            return Err("fetch.timeout_secs must be greater than 0".to_string());
        }

        let mut seen = HashSet::new();
        for unit in &self.units {
            let name = unit.name.trim();
            if name.is_empty() {
                return Err("every [[units]] entry needs a name".to_string());
            }
            if !seen.insert(name) {
                return Err(format!("unit `{}` is listed more than once", name));
            }
            let url = unit.url.trim();
            if !url.is_empty() && !secret::is_reference(url) {
                parse_feed_url(url).map_err(|e| format!("unit `{}`: {}", name, e.message()))?;
            }
        }

        if let Some(url) = self.webhook.url.as_deref()
            && !secret::is_reference(url)
        {
            check_webhook_url(url)?;
        }

        Ok(())
    }

    /// Builds the engine configuration, resolving feed URLs.
    ///
    /// Units without a URL are left out.
    pub fn engine_config(&self) -> Result<EngineConfig, String> {
        let mut units = Vec::with_capacity(self.units.len());
        for unit in &self.units {
            if unit.url.trim().is_empty() {
                debug!(unit = %unit.name, "Skipping unit without a feed URL");
                continue;
            }
            let url = secret::resolve(unit.url.trim())
                .map_err(|e| format!("failed to resolve feed URL for `{}`: {}", unit.name, e))?;
            units.push(UnitFeed::new(unit.name.trim(), url));
        }

        Ok(EngineConfig::new(units)
            .with_timezone(self.timezone()?)
            .with_horizon_days(self.horizon_days)
            .with_fetch_timeout(Duration::from_secs(self.fetch.timeout_secs))
            .with_cache_ttl(Duration::from_secs(self.fetch.cache_ttl_secs))
            .with_check_ins(self.include_check_ins))
    }

    /// Builds the HTTP feed source configuration.
    pub fn feed_source_config(&self) -> HttpFeedSourceConfig {
        let config = HttpFeedSourceConfig::default()
            .with_timeout(Duration::from_secs(self.fetch.timeout_secs));
        match self.fetch.user_agent.as_deref() {
            Some(agent) if !agent.trim().is_empty() => config.with_user_agent(agent.trim()),
            _ => config,
        }
    }

    /// Builds the daily scheduler configuration.
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, String> {
        Ok(SchedulerConfig::new(self.daemon.run_hour)
            .with_poll_interval(Duration::from_secs(self.daemon.poll_interval_secs))
            .with_timezone(self.timezone()?))
    }

    /// Resolves the webhook URL, if one is configured.
    pub fn webhook_url(&self) -> Result<Option<String>, String> {
        match self.webhook.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => secret::resolve(url)
                .map(Some)
                .map_err(|e| format!("failed to resolve webhook URL: {}", e)),
            _ => Ok(None),
        }
    }
}

/// Checks a window length against [`WINDOW_DAYS_RANGE`].
pub fn check_window_days(days: i64) -> Result<(), String> {
    if WINDOW_DAYS_RANGE.contains(&days) {
        Ok(())
    } else {
        Err(format!(
            "days must be between {} and {}, got {}",
            WINDOW_DAYS_RANGE.start(),
            WINDOW_DAYS_RANGE.end(),
            days
        ))
    }
}

fn check_webhook_url(url: &str) -> Result<(), String> {
    let parsed = url::Url::parse(url).map_err(|e| format!("invalid webhook URL: {}", e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!("webhook URL must use http or https, not {}", scheme)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_content: &str) -> ClientConfig {
        toml::from_str(toml_content).unwrap()
    }

    mod loading {
        use super::*;
        use std::io::Write;

        #[test]
        fn empty_file_gives_defaults() {
            let config = parse("");
            assert_eq!(config.timezone, "Europe/London");
            assert_eq!(config.default_days, 14);
            assert_eq!(config.horizon_days, 730);
            assert!(config.include_check_ins);
            assert!(config.units.is_empty());
            assert_eq!(config.fetch.timeout_secs, 30);
            assert_eq!(config.fetch.cache_ttl_secs, 0);
            assert!(config.daemon.enabled);
            assert_eq!(config.daemon.run_hour, 8);
            assert_eq!(config.output.title, "Cleaner Schedule");
            assert!(config.output.directory.is_none());
            assert!(config.webhook.url.is_none());
        }

        #[test]
        fn full_file() {
            let config = parse(
                r#"
timezone = "Europe/Lisbon"
default_days = 7
include_check_ins = false

[[units]]
name = "Flat 7"
url = "https://example.com/7.ics"

[[units]]
name = "Flat 8"
url = ""

[fetch]
timeout_secs = 10
cache_ttl_secs = 300
user_agent = "cleaning-bot/1.0"

[daemon]
run_hour = 6

[output]
directory = "/tmp/schedules"
title = "Rota"

[webhook]
url = "env::TURNOVER_HOOK"
"#,
            );

            assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Lisbon);
            assert_eq!(config.default_days, 7);
            assert!(!config.include_check_ins);
            assert_eq!(config.units.len(), 2);
            assert_eq!(config.units[1].name, "Flat 8");
            assert_eq!(config.fetch.cache_ttl_secs, 300);
            assert_eq!(config.daemon.run_hour, 6);
            assert_eq!(config.daemon.poll_interval_secs, 60);
            assert_eq!(
                config.output.directory,
                Some(PathBuf::from("/tmp/schedules"))
            );
            assert_eq!(config.webhook.url.as_deref(), Some("env::TURNOVER_HOOK"));
            assert!(config.validate().is_ok());
        }

        #[test]
        fn load_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "default_days = 3\n\n[[units]]\nname = \"Flat 7\"").unwrap();

            let config = ClientConfig::load_from(file.path()).unwrap();
            assert_eq!(config.default_days, 3);
            assert_eq!(config.units[0].url, "");
        }

        #[test]
        fn load_from_missing_file_errors() {
            let dir = tempfile::tempdir().unwrap();
            let err = ClientConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
            assert!(err.starts_with("failed to read"));
        }

        #[test]
        fn load_from_invalid_toml_errors() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "default_days = \"fourteen\"").unwrap();

            let err = ClientConfig::load_from(file.path()).unwrap_err();
            assert!(err.starts_with("failed to parse config"));
        }

        #[test]
        fn default_path_ends_with_app_dir() {
            let path = ClientConfig::default_path();
            assert!(path.ends_with("turnover/config.toml"));
        }

        #[test]
        fn dump_round_trips() {
            let mut config = ClientConfig::default();
            config.units.push(UnitSettings {
                name: "Flat 7".into(),
                url: "env::FLAT7".into(),
            });
            config.output.directory = Some(PathBuf::from("/srv/rota"));

            let dumped = toml::to_string_pretty(&config).unwrap();
            let reparsed = parse(&dumped);
            assert_eq!(reparsed.units[0].url, "env::FLAT7");
            assert_eq!(reparsed.output.directory, config.output.directory);
        }
    }

    mod validation {
        use super::*;

        fn with_units(units: &[(&str, &str)]) -> ClientConfig {
            ClientConfig {
                units: units
                    .iter()
                    .map(|(name, url)| UnitSettings {
                        name: name.to_string(),
                        url: url.to_string(),
                    })
                    .collect(),
                ..ClientConfig::default()
            }
        }

        #[test]
        fn unknown_timezone() {
            let config = ClientConfig {
                timezone: "Mars/Olympus_Mons".into(),
                ..ClientConfig::default()
            };
            assert_eq!(
                config.validate().unwrap_err(),
                "unknown timezone `Mars/Olympus_Mons`"
            );
        }

        #[test]
        fn window_days_bounds() {
            assert!(check_window_days(1).is_ok());
            assert!(check_window_days(60).is_ok());
            assert_eq!(
                check_window_days(0).unwrap_err(),
                "days must be between 1 and 60, got 0"
            );
            assert!(check_window_days(61).is_err());

            let config = ClientConfig {
                default_days: 90,
                ..ClientConfig::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn run_hour_bounds() {
            let mut config = ClientConfig::default();
            config.daemon.run_hour = 23;
            assert!(config.validate().is_ok());
            config.daemon.run_hour = 24;
            assert!(config.validate().unwrap_err().contains("run_hour"));
        }

        #[test]
        fn duplicate_unit_names() {
            let config = with_units(&[
                ("Flat 7", "https://example.com/a.ics"),
                ("Flat 7 ", "https://example.com/b.ics"),
            ]);
            assert_eq!(
                config.validate().unwrap_err(),
                "unit `Flat 7` is listed more than once"
            );
        }

        #[test]
        fn blank_unit_name() {
            let config = with_units(&[("  ", "https://example.com/a.ics")]);
            assert!(config.validate().is_err());
        }

        #[test]
        fn feed_url_syntax() {
            let config = with_units(&[("Flat 7", "ftp://example.com/a.ics")]);
            let err = config.validate().unwrap_err();
            assert!(err.starts_with("unit `Flat 7`"), "{}", err);

            // References and empty URLs are only checked when resolved.
            let config = with_units(&[("Flat 7", "env::FLAT7"), ("Flat 8", "")]);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn webhook_url_syntax() {
            let mut config = ClientConfig::default();
            config.webhook.url = Some("not a url".into());
            assert!(config.validate().unwrap_err().starts_with("invalid webhook URL"));

            config.webhook.url = Some("mailto:ops@example.com".into());
            assert_eq!(
                config.validate().unwrap_err(),
                "webhook URL must use http or https, not mailto"
            );

            config.webhook.url = Some("https://hooks.example.com/rota".into());
            assert!(config.validate().is_ok());
        }
    }

    mod conversion {
        use super::*;

        #[test]
        fn engine_config_skips_units_without_url() {
            let config = parse(
                r#"
timezone = "America/New_York"
horizon_days = 365
include_check_ins = false

[[units]]
name = "Flat 7"
url = "https://example.com/7.ics"

[[units]]
name = "Flat 8"

[fetch]
timeout_secs = 5
cache_ttl_secs = 120
"#,
            );

            let engine = config.engine_config().unwrap();
            assert_eq!(
                engine.units,
                vec![UnitFeed::new("Flat 7", "https://example.com/7.ics")]
            );
            assert_eq!(engine.timezone, chrono_tz::America::New_York);
            assert_eq!(engine.horizon_days, 365);
            assert_eq!(engine.fetch_timeout, Duration::from_secs(5));
            assert_eq!(engine.cache_ttl, Duration::from_secs(120));
            assert!(!engine.schedule.include_check_ins);
        }

        #[test]
        fn engine_config_resolves_env_references() {
            unsafe {
                std::env::set_var("_TURNOVER_CFG_FLAT9", "https://example.com/9.ics");
            }
            let config = parse(
                r#"
[[units]]
name = "Flat 9"
url = "env::_TURNOVER_CFG_FLAT9"
"#,
            );

            let engine = config.engine_config().unwrap();
            assert_eq!(engine.units[0].url, "https://example.com/9.ics");
        }

        #[test]
        fn engine_config_unresolved_reference_errors() {
            let config = parse(
                r#"
[[units]]
name = "Flat 9"
url = "env::_TURNOVER_CFG_UNSET"
"#,
            );

            let err = config.engine_config().unwrap_err();
            assert!(err.starts_with("failed to resolve feed URL for `Flat 9`"));
        }

        #[test]
        fn scheduler_config_uses_daemon_section() {
            let config = parse("timezone = \"Asia/Tokyo\"\n[daemon]\nrun_hour = 7\npoll_interval_secs = 30\n");
            let scheduler = config.scheduler_config().unwrap();
            assert_eq!(scheduler.run_hour, 7);
            assert_eq!(scheduler.poll_interval, Duration::from_secs(30));
            assert_eq!(scheduler.timezone, chrono_tz::Asia::Tokyo);
        }

        #[test]
        fn webhook_url_resolution() {
            let mut config = ClientConfig::default();
            assert_eq!(config.webhook_url().unwrap(), None);

            config.webhook.url = Some("  ".into());
            assert_eq!(config.webhook_url().unwrap(), None);

            config.webhook.url = Some("https://hooks.example.com/rota".into());
            assert_eq!(
                config.webhook_url().unwrap().as_deref(),
                Some("https://hooks.example.com/rota")
            );
        }
    }
}
