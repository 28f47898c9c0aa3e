//! Runtime configuration from environment variables

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DUMP_URL: &str = "https://www2.uthgard.net/herald/api/dump";
pub const DEFAULT_LAST_WEEK_DAYS: i64 = 8;

/// Configuration for the herald runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct HeraldConfig {
    /// URL of the full character dump
    pub dump_url: String,

    /// Local dump file; takes precedence over `dump_url` when set
    pub dump_file: Option<PathBuf>,

    /// Root directory of the series files
    pub data_dir: PathBuf,

    /// Seconds between refresh cycles
    pub refresh_interval_secs: u64,

    /// Trailing window for last-week rankings, in days
    pub last_week_days: i64,

    /// Upper bound on one snapshot fetch, in seconds
    pub fetch_timeout_secs: u64,
}

impl HeraldConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `HERALD_DUMP_URL` (default: https://www2.uthgard.net/herald/api/dump)
    /// - `HERALD_DUMP_FILE` (default: unset)
    /// - `HERALD_DATA_DIR` (default: data)
    /// - `HERALD_REFRESH_INTERVAL_SECS` (default: 1800)
    /// - `HERALD_LAST_WEEK_DAYS` (default: 8)
    /// - `HERALD_FETCH_TIMEOUT_SECS` (default: 60)
    pub fn from_env() -> Self {
        Self {
            dump_url: env::var("HERALD_DUMP_URL").unwrap_or_else(|_| DEFAULT_DUMP_URL.to_string()),

            dump_file: env::var("HERALD_DUMP_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),

            data_dir: env::var("HERALD_DATA_DIR")
                .unwrap_or_else(|_| "data".to_string())
                .into(),

            refresh_interval_secs: env::var("HERALD_REFRESH_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(30 * 60),

            last_week_days: env::var("HERALD_LAST_WEEK_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|days| *days > 0)
                .unwrap_or(DEFAULT_LAST_WEEK_DAYS),

            fetch_timeout_secs: env::var("HERALD_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(60),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Falls back to the 8-day default when the configured days do not fit
    pub fn last_week_window(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::try_days(self.last_week_days)
            .unwrap_or_else(|| chrono::TimeDelta::days(DEFAULT_LAST_WEEK_DAYS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 6] = [
        "HERALD_DUMP_URL",
        "HERALD_DUMP_FILE",
        "HERALD_DATA_DIR",
        "HERALD_REFRESH_INTERVAL_SECS",
        "HERALD_LAST_WEEK_DAYS",
        "HERALD_FETCH_TIMEOUT_SECS",
    ];

    // Defaults and overrides share one test: the process environment is global.
    #[test]
    fn test_config_from_env() {
        for var in VARS {
            env::remove_var(var);
        }

        let config = HeraldConfig::from_env();
        assert_eq!(config.dump_url, DEFAULT_DUMP_URL);
        assert_eq!(config.dump_file, None);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.refresh_interval(), Duration::from_secs(1800));
        assert_eq!(config.last_week_window(), chrono::TimeDelta::days(8));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(60));

        env::set_var("HERALD_DUMP_FILE", "/tmp/dump.json");
        env::set_var("HERALD_DATA_DIR", "/tmp/herald");
        env::set_var("HERALD_REFRESH_INTERVAL_SECS", "600");
        env::set_var("HERALD_LAST_WEEK_DAYS", "7");
        env::set_var("HERALD_FETCH_TIMEOUT_SECS", "0");

        let config = HeraldConfig::from_env();
        assert_eq!(config.dump_file, Some(PathBuf::from("/tmp/dump.json")));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/herald"));
        assert_eq!(config.refresh_interval_secs, 600);
        assert_eq!(config.last_week_days, 7);
        // zero is rejected in favour of the default
        assert_eq!(config.fetch_timeout_secs, 60);

        // a window too large for a duration falls back to the default
        env::set_var("HERALD_LAST_WEEK_DAYS", "9000000000000000");
        let config = HeraldConfig::from_env();
        assert_eq!(config.last_week_window(), chrono::TimeDelta::days(8));

        for var in VARS {
            env::remove_var(var);
        }
    }
}
