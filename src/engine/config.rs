//! Engine configuration.
//!
//! [`EngineConfig`] sizes and names the worker pool used by
//! [`AsyncSystemsManager`](crate::engine::scheduler::AsyncSystemsManager).
//! It can be built in code or read from TOML; missing fields take their
//! defaults.
//!
//! ```toml
//! worker_threads = 4
//! thread_name_prefix = "sim-worker"
//! scheduler_group = 0
//! ```

use std::num::NonZeroUsize;
use std::thread;

use serde::Deserialize;

use crate::engine::error::ConfigError;
use crate::engine::types::{TaskGroup, DEFAULT_TASK_GROUP};

/// Worker pool and scheduling settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Number of worker threads. Defaults to the available parallelism.
    pub worker_threads: usize,

    /// Prefix of worker thread names; workers are named `{prefix}-{index}`.
    pub thread_name_prefix: String,

    /// Task group the scheduler dispatches systems in.
    pub scheduler_group: TaskGroup,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: thread::available_parallelism().map_or(1, NonZeroUsize::get),
            thread_name_prefix: "raccoon-worker".to_owned(),
            scheduler_group: DEFAULT_TASK_GROUP,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::Invalid {
                field: "worker_threads",
                reason: "at least one worker thread is required".to_owned(),
            });
        }
        if self.thread_name_prefix.contains('\0') {
            return Err(ConfigError::Invalid {
                field: "thread_name_prefix",
                reason: "thread names cannot contain NUL bytes".to_owned(),
            });
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = EngineConfig::from_toml_str("worker_threads = 3").unwrap();
        assert_eq!(config.worker_threads, 3);
        assert_eq!(config.thread_name_prefix, "raccoon-worker");
        assert_eq!(config.scheduler_group, DEFAULT_TASK_GROUP);
    }

    #[test]
    fn zero_workers_are_rejected() {
        let err = EngineConfig::from_toml_str("worker_threads = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "worker_threads", .. }));
    }

    #[test]
    fn unknown_fields_fail_to_parse() {
        assert!(matches!(EngineConfig::from_toml_str("workers = 2"), Err(ConfigError::Parse(_))));
    }
}
