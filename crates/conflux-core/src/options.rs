//! Pipeline options and checkpoint configuration.
//!
//! Options are supplied by the host application (often deserialized from a
//! config file) and consumed read-only by the environment builder. The
//! core reports on checkpoint settings but never alters them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sentinel master address meaning "pick the environment automatically".
pub const MASTER_AUTO: &str = "[auto]";

/// Sentinel master address meaning "run embedded/locally".
pub const MASTER_LOCAL: &str = "[local]";

/// Which execution environment a plan targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerTarget {
    /// Resolve from the master address: sentinel values run locally,
    /// anything else is treated as a cluster endpoint.
    #[default]
    Auto,
    /// Always run embedded, ignoring the master address.
    Local,
    /// Always submit to the cluster at the master address.
    Cluster,
}

/// Recognized pipeline options.
///
/// Durations are carried as milliseconds for (de)serialization, matching
/// how intervals travel in config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Which execution environment to use.
    pub runner_target: RunnerTarget,
    /// Cluster endpoint, or a `[auto]`/`[local]` sentinel.
    pub master_address: String,
    /// Whether the engine's checkpointing is enabled.
    pub checkpointing_enabled: bool,
    /// Checkpoint interval in milliseconds; meaningful only when enabled.
    pub checkpoint_interval_ms: Option<u64>,
    /// Operator parallelism. `None` derives a default from available
    /// resources at plan-build time.
    pub parallelism: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            runner_target: RunnerTarget::Auto,
            master_address: MASTER_AUTO.to_string(),
            checkpointing_enabled: false,
            checkpoint_interval_ms: None,
            parallelism: None,
        }
    }
}

/// Default checkpoint interval when checkpointing is enabled without an
/// explicit interval.
pub const DEFAULT_CHECKPOINT_INTERVAL_MS: u64 = 10_000;

impl PipelineOptions {
    /// Enables checkpointing with the given interval.
    #[must_use]
    pub fn with_checkpointing(mut self, interval: Duration) -> Self {
        self.checkpointing_enabled = true;
        #[allow(clippy::cast_possible_truncation)]
        let ms = interval.as_millis() as u64;
        self.checkpoint_interval_ms = Some(ms);
        self
    }

    /// Sets the parallelism.
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Sets the master address.
    #[must_use]
    pub fn with_master_address(mut self, address: impl Into<String>) -> Self {
        self.master_address = address.into();
        self
    }

    /// Returns whether the master address is one of the local sentinels.
    #[must_use]
    pub fn master_is_sentinel(&self) -> bool {
        self.master_address == MASTER_AUTO || self.master_address == MASTER_LOCAL
    }

    /// Derives the effective checkpoint configuration.
    #[must_use]
    pub fn checkpoint_config(&self) -> CheckpointConfig {
        if self.checkpointing_enabled {
            CheckpointConfig::enabled(Duration::from_millis(
                self.checkpoint_interval_ms
                    .unwrap_or(DEFAULT_CHECKPOINT_INTERVAL_MS),
            ))
        } else {
            CheckpointConfig::disabled()
        }
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns `OptionsError` if parallelism is zero, the checkpoint
    /// interval is zero while checkpointing is enabled, or a cluster
    /// target is combined with a sentinel master address.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.parallelism == Some(0) {
            return Err(OptionsError::InvalidParallelism);
        }
        if self.checkpointing_enabled && self.checkpoint_interval_ms == Some(0) {
            return Err(OptionsError::InvalidCheckpointInterval);
        }
        if self.runner_target == RunnerTarget::Cluster && self.master_is_sentinel() {
            return Err(OptionsError::MissingMasterAddress);
        }
        Ok(())
    }
}

/// The engine's checkpoint configuration, attached to plans verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointConfig {
    /// Whether checkpointing is enabled.
    pub enabled: bool,
    /// Interval between checkpoints; meaningful only when enabled.
    pub interval: Duration,
}

impl CheckpointConfig {
    /// Checkpointing disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            interval: Duration::ZERO,
        }
    }

    /// Checkpointing enabled at the given interval.
    #[must_use]
    pub fn enabled(interval: Duration) -> Self {
        Self {
            enabled: true,
            interval,
        }
    }
}

/// Errors from pipeline option validation.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// Parallelism must be at least 1.
    #[error("parallelism must be at least 1")]
    InvalidParallelism,

    /// The checkpoint interval must be positive when checkpointing is on.
    #[error("checkpoint interval must be > 0 when checkpointing is enabled")]
    InvalidCheckpointInterval,

    /// A cluster target needs a concrete master address.
    #[error("cluster target requires a concrete master address, got a sentinel")]
    MissingMasterAddress,
}
