//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use grouppurge_infra::jobs::{JobReaper, RunnerConfig};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Runtime settings.
///
/// | variable | default |
/// |---|---|
/// | `BIND_ADDR` | `0.0.0.0:8080` |
/// | `MIN_BATCH_DELAY_MS` | `1000` |
/// | `MAX_BATCH_SIZE` | `100` |
/// | `JOB_RETENTION_SECS` | `3600` |
/// | `REAP_INTERVAL_SECS` | `600` |
/// | `SEED_PATH` | unset |
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub runner: RunnerConfig,
    pub reaper: JobReaper,
    /// JSON seed data for the in-memory backend.
    pub seed_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            runner: RunnerConfig::default(),
            reaper: JobReaper::default(),
            seed_path: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source. Invalid values fall
    /// back to their default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let default_delay_ms = u64::try_from(defaults.runner.min_delay.as_millis()).unwrap_or(u64::MAX);

        let bind_addr = parse_or(&lookup, "BIND_ADDR", defaults.bind_addr);
        let min_delay_ms = parse_or(&lookup, "MIN_BATCH_DELAY_MS", default_delay_ms);
        let max_batch_size = parse_or(&lookup, "MAX_BATCH_SIZE", defaults.runner.max_batch_size);
        let retention_secs = parse_or(
            &lookup,
            "JOB_RETENTION_SECS",
            defaults.reaper.retention.as_secs(),
        );
        let interval_secs = parse_or(
            &lookup,
            "REAP_INTERVAL_SECS",
            defaults.reaper.interval.as_secs(),
        );

        let min_delay_ms = if min_delay_ms == 0 {
            warn!("MIN_BATCH_DELAY_MS must be positive; using default");
            default_delay_ms
        } else {
            min_delay_ms
        };
        let interval_secs = if interval_secs == 0 {
            warn!("REAP_INTERVAL_SECS must be positive; using default");
            defaults.reaper.interval.as_secs()
        } else {
            interval_secs
        };

        Self {
            bind_addr,
            runner: RunnerConfig::default()
                .with_min_delay(Duration::from_millis(min_delay_ms))
                .with_max_batch_size(max_batch_size),
            reaper: JobReaper::new(
                Duration::from_secs(interval_secs),
                Duration::from_secs(retention_secs),
            ),
            seed_path: lookup("SEED_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(e) => {
                warn!(variable = key, value = %raw, error = %e, default = %default, "invalid setting; using default");
                default
            }
        },
    }
}
