//! Layered engine configuration.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. Environment variables prefixed `AUDITFLOW_`, with `__` separating the
//!    section from the key (`AUDITFLOW_SCHEDULER__MAX_CONCURRENCY=4`)

use crate::audit::services::{CancellationRegistry, SchedulerConfig};
use camino::Utf8Path;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix for engine settings.
pub const ENV_PREFIX: &str = "AUDITFLOW_";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Figment extraction or merge failed.
    #[error("configuration error: {0}")]
    Figment(Box<figment::Error>),

    /// A field holds a value the engine cannot run with.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted field path.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Parallel analyses per task.
    pub max_concurrency: usize,
    /// Minimum gap between dispatches, in milliseconds.
    pub inter_dispatch_gap_ms: u64,
    /// Files analyzed per task at most.
    pub max_files: usize,
    /// Analyzer attempts per file.
    pub max_attempts: u32,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            max_concurrency: 2,
            inter_dispatch_gap_ms: 500,
            max_files: 200,
            max_attempts: 3,
        }
    }
}

/// Per-file limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    /// Largest file handed to the analyzer, in bytes.
    pub max_file_bytes: u64,
    /// Time allowed for one analyzer call, in seconds.
    pub analyzer_timeout_secs: u64,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_file_bytes: 200_000,
            analyzer_timeout_secs: 120,
        }
    }
}

/// Progress flush cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlushSection {
    /// Flush after this many processed files.
    pub every_files: u64,
    /// Flush at least this often, in milliseconds.
    pub interval_ms: u64,
}

impl Default for FlushSection {
    fn default() -> Self {
        Self {
            every_files: 5,
            interval_ms: 2_000,
        }
    }
}

/// Observer polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSection {
    /// Delay between store polls, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ProgressSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3_000,
        }
    }
}

/// Cancellation registry bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CancellationSection {
    /// Outstanding intents kept in memory.
    pub capacity: usize,
    /// Lifetime of an unobserved intent, in seconds.
    pub ttl_secs: u64,
}

impl Default for CancellationSection {
    fn default() -> Self {
        Self {
            capacity: 1_024,
            ttl_secs: 3_600,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker pool settings.
    #[serde(default)]
    pub scheduler: SchedulerSection,
    /// Per-file limits.
    #[serde(default)]
    pub limits: LimitsSection,
    /// Progress flush cadence.
    #[serde(default)]
    pub flush: FlushSection,
    /// Observer polling.
    #[serde(default)]
    pub progress: ProgressSection,
    /// Cancellation registry bounds.
    #[serde(default)]
    pub cancellation: CancellationSection,
}

impl EngineConfig {
    /// Loads and validates configuration from defaults, an optional TOML
    /// file, and the environment.
    ///
    /// A missing file is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a source cannot be parsed or a value is
    /// out of range.
    pub fn load(file: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment(file))
    }

    /// Builds the provider chain without extracting it.
    #[must_use]
    pub fn figment(file: Option<&Utf8Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path.as_std_path()));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extracts and validates configuration from a prepared figment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when extraction or validation fails.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero_checks = [
            (self.scheduler.max_concurrency == 0, "scheduler.max_concurrency"),
            (self.scheduler.max_files == 0, "scheduler.max_files"),
            (self.scheduler.max_attempts == 0, "scheduler.max_attempts"),
            (self.flush.every_files == 0, "flush.every_files"),
            (self.progress.poll_interval_ms == 0, "progress.poll_interval_ms"),
            (self.cancellation.capacity == 0, "cancellation.capacity"),
        ];
        zero_checks
            .into_iter()
            .find(|(is_zero, _)| *is_zero)
            .map_or(Ok(()), |(_, field)| {
                Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be at least 1",
                })
            })
    }

    /// Returns the scheduler parameters.
    #[must_use]
    pub const fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrency: self.scheduler.max_concurrency,
            inter_dispatch_gap: Duration::from_millis(self.scheduler.inter_dispatch_gap_ms),
            max_files: self.scheduler.max_files,
            max_attempts: self.scheduler.max_attempts,
            max_file_bytes: self.limits.max_file_bytes,
            flush_every_files: self.flush.every_files,
            flush_interval: Duration::from_millis(self.flush.interval_ms),
        }
    }

    /// Returns the time allowed for one analyzer call.
    #[must_use]
    pub const fn analyzer_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.analyzer_timeout_secs)
    }

    /// Returns the progress polling interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.progress.poll_interval_ms)
    }

    /// Builds a cancellation registry with the configured bounds.
    #[must_use]
    pub fn cancellation_registry(&self) -> CancellationRegistry {
        CancellationRegistry::new(
            self.cancellation.capacity,
            Duration::from_secs(self.cancellation.ttl_secs),
        )
    }
}
