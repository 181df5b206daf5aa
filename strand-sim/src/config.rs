//! Simulator configuration, read from `STRAND_*` environment variables.
//!
//! A `.env` file in the working directory is honoured. Unset variables fall
//! back to the defaults below; malformed or out-of-range values are errors.

use crate::error::{SimError, SimResult};
use std::env;
use std::str::FromStr;
use strand_eventlog::{DEFAULT_NOTIFY_CAPACITY, MAX_NOTIFY_CAPACITY};
use strand_projector::ProjectionConfig;

/// Simulator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Writer workload
    pub workload: WorkloadConfig,

    /// Projection worker settings
    pub projection: ProjectionConfig,

    /// Buffered commit notices per subscriber
    pub notify_capacity: usize,

    pub log_format: LogFormat,
}

/// Concurrent writer workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadConfig {
    /// Number of concurrent writer tasks
    pub writers: usize,
    /// Appends performed by each writer
    pub batches_per_writer: usize,
    /// Events per append
    pub batch_size: u64,
    /// Aggregates every writer contends on (in addition to its own)
    pub shared_aggregates: usize,
    /// Attempts per append before giving up on conflicts
    pub max_attempts: u32,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {:?} (expected pretty or json)", other)),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> SimResult<Self> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();

        let workload_defaults = WorkloadConfig::default();
        let workload = WorkloadConfig {
            writers: load_env("STRAND_WRITERS", workload_defaults.writers)?,
            batches_per_writer: load_env(
                "STRAND_BATCHES_PER_WRITER",
                workload_defaults.batches_per_writer,
            )?,
            batch_size: at_least_one(
                "STRAND_BATCH_SIZE",
                load_env("STRAND_BATCH_SIZE", workload_defaults.batch_size)?,
            )?,
            shared_aggregates: load_env("STRAND_SHARED_AGGREGATES", workload_defaults.shared_aggregates)?,
            max_attempts: at_least_one(
                "STRAND_MAX_ATTEMPTS",
                load_env("STRAND_MAX_ATTEMPTS", workload_defaults.max_attempts)?,
            )?,
        };

        let projection_defaults = ProjectionConfig::default();
        let projection = ProjectionConfig {
            page_size: at_least_one(
                "STRAND_PROJECTION_PAGE_SIZE",
                load_env("STRAND_PROJECTION_PAGE_SIZE", projection_defaults.page_size)?,
            )?,
            poll_interval_ms: load_env("STRAND_PROJECTION_POLL_MS", projection_defaults.poll_interval_ms)?,
        };

        Ok(Self {
            workload,
            projection,
            notify_capacity: check_notify_capacity(load_env(
                "STRAND_NOTIFY_CAPACITY",
                DEFAULT_NOTIFY_CAPACITY,
            )?)?,
            log_format: load_env("STRAND_LOG_FORMAT", LogFormat::default())?,
        })
    }

    /// Small, fast configuration for tests.
    pub fn test() -> Self {
        Self {
            workload: WorkloadConfig {
                writers: 4,
                batches_per_writer: 5,
                batch_size: 2,
                shared_aggregates: 1,
                max_attempts: 50,
            },
            projection: ProjectionConfig {
                page_size: 16,
                poll_interval_ms: 5,
            },
            notify_capacity: 64,
            log_format: LogFormat::Pretty,
        }
    }
}

fn load_env<T: FromStr>(key: &str, default: T) -> SimResult<T> {
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map_err(|_| SimError::Config(format!("Invalid {} value: {}", key, val))),
        Err(_) => Ok(default),
    }
}

fn at_least_one<T: PartialOrd + From<u8>>(key: &str, value: T) -> SimResult<T> {
    if value < T::from(1) {
        return Err(SimError::Config(format!("{} must be at least 1", key)));
    }
    Ok(value)
}

fn check_notify_capacity(capacity: usize) -> SimResult<usize> {
    if capacity == 0 || capacity > MAX_NOTIFY_CAPACITY {
        return Err(SimError::Config(format!(
            "STRAND_NOTIFY_CAPACITY must be between 1 and {}, got {}",
            MAX_NOTIFY_CAPACITY, capacity
        )));
    }
    Ok(capacity)
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            writers: 8,
            batches_per_writer: 25,
            batch_size: 3,
            shared_aggregates: 2,
            max_attempts: 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workload: WorkloadConfig::default(),
            projection: ProjectionConfig::default(),
            notify_capacity: DEFAULT_NOTIFY_CAPACITY,
            log_format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.workload.writers, 8);
        assert_eq!(config.notify_capacity, DEFAULT_NOTIFY_CAPACITY);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.workload.shared_aggregates, 1);
        assert_eq!(config.projection.page_size, 16);
    }

    #[test]
    fn test_load_env_parses_and_defaults() {
        env::set_var("STRAND_TEST_ONLY_WRITERS", " 12 ");
        assert_eq!(load_env("STRAND_TEST_ONLY_WRITERS", 1usize).unwrap(), 12);

        env::remove_var("STRAND_TEST_ONLY_MISSING");
        assert_eq!(load_env("STRAND_TEST_ONLY_MISSING", 7u64).unwrap(), 7);
    }

    #[test]
    fn test_load_env_rejects_garbage() {
        env::set_var("STRAND_TEST_ONLY_BAD", "many");

        let err = load_env("STRAND_TEST_ONLY_BAD", 1usize).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
        assert!(err.to_string().contains("STRAND_TEST_ONLY_BAD"));
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_zero_rejected_for_counts() {
        assert!(at_least_one("STRAND_BATCH_SIZE", 0u64).is_err());
        assert_eq!(at_least_one("STRAND_MAX_ATTEMPTS", 3u32).unwrap(), 3);
    }

    #[test]
    fn test_notify_capacity_bounds() {
        assert_eq!(check_notify_capacity(1).unwrap(), 1);
        assert_eq!(check_notify_capacity(MAX_NOTIFY_CAPACITY).unwrap(), MAX_NOTIFY_CAPACITY);
        assert!(check_notify_capacity(0).is_err());

        let err = check_notify_capacity(usize::MAX).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
        assert!(err.to_string().contains("STRAND_NOTIFY_CAPACITY"));
    }
}
