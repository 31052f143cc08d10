//! Resource fixtures and event loop tunables.

use crate::data_source::ResourceSpec;
use async_runtime::{SchedulerConfig, DEFAULT_TASK_BUDGET};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a [`PatternsConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON for this shape
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document parsed but describes an unusable setup
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything a run needs besides the strategy.
///
/// ```json
/// {
///   "resources": [
///     { "id": 1, "name": "stench", "latency_ms": 100 },
///     { "id": 2, "name": "drizzle", "latency_ms": 250, "fail": true }
///   ],
///   "task_budget": 10000
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternsConfig {
    /// Resources served by the simulated source, in lookup order
    #[serde(default = "default_resources")]
    pub resources: Vec<ResourceSpec>,
    /// Executed tasks allowed per run; `null` disables the limit
    #[serde(default = "default_task_budget")]
    pub task_budget: Option<u64>,
}

fn default_resources() -> Vec<ResourceSpec> {
    vec![
        ResourceSpec::new(1, "stench", 100),
        ResourceSpec::new(2, "drizzle", 250),
        ResourceSpec::new(3, "speed-boost", 500),
    ]
}

fn default_task_budget() -> Option<u64> {
    Some(DEFAULT_TASK_BUDGET)
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            resources: default_resources(),
            task_budget: default_task_budget(),
        }
    }
}

impl PatternsConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Self::from_json_str(&json)
    }

    /// Checks that the resources can be looked up unambiguously.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resources.is_empty() {
            return Err(ConfigError::Invalid("at least one resource is required".to_string()));
        }
        let mut seen = HashSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.id) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate resource id {}",
                    resource.id
                )));
            }
            if resource.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "resource {} has an empty name",
                    resource.id
                )));
            }
        }
        if self.task_budget == Some(0) {
            return Err(ConfigError::Invalid("task_budget must be positive".to_string()));
        }
        Ok(())
    }

    /// Resource ids in configured order.
    pub fn ids(&self) -> Vec<u32> {
        self.resources.iter().map(|resource| resource.id).collect()
    }

    /// The resource with `id`, if configured.
    pub fn resource(&self, id: u32) -> Option<&ResourceSpec> {
        self.resources.iter().find(|resource| resource.id == id)
    }

    /// Marks resource `id` as failing.
    pub fn set_failing(&mut self, id: u32) -> Result<(), ConfigError> {
        let resource = self
            .resources
            .iter_mut()
            .find(|resource| resource.id == id)
            .ok_or_else(|| ConfigError::Invalid(format!("no resource with id {id}")))?;
        resource.fail = true;
        Ok(())
    }

    /// Scheduler settings for the event loop.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            task_budget: self.task_budget,
        }
    }
}
