//! Registry configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entity::DEFAULT_ENTITY_GROWTH;
use crate::error::{EcsError, Result};

/// Tunables for a [`Registry`](crate::Registry).
///
/// Missing fields in a JSON document take their default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Slots added to the entity table when it is full
    pub entity_growth: u32,

    /// Size of a dedicated worker pool; `None` runs ticks on the global rayon pool
    pub worker_threads: Option<usize>,

    /// Name prefix for dedicated worker threads
    pub thread_name: String,

    /// Log unordered systems whose storage accesses conflicted
    pub warn_on_access_conflicts: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            entity_growth: DEFAULT_ENTITY_GROWTH,
            worker_threads: None,
            thread_name: "packed-ecs-worker".to_string(),
            warn_on_access_conflicts: true,
        }
    }
}

impl RegistryConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RegistryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.entity_growth == 0 {
            return Err(EcsError::ConfigError(
                "entity_growth must be greater than zero".to_string(),
            ));
        }
        if self.worker_threads == Some(0) {
            return Err(EcsError::ConfigError(
                "worker_threads must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn with_entity_growth(mut self, growth: u32) -> Self {
        self.entity_growth = growth;
        self
    }
}
