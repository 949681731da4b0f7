//! Engine configuration.
//!
//! Configuration is plain serde data with every field defaulted, so a config
//! file only needs to name what it changes. The binary reads the path from
//! `DRAW_ENGINE_CONFIG`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tally::TallyPolicy;

/// Default bound on work items processed by one command.
pub const DEFAULT_MAX_CASCADE_STEPS: usize = 10_000;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV_VAR: &str = "DRAW_ENGINE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("maxCascadeSteps must be at least 1")]
    ZeroCascadeSteps,
}

/// Configuration for a [`DrawEngine`](crate::cascade::DrawEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Tie-break and disqualification rules for round-robin finishing order.
    pub tally_policy: TallyPolicy,

    /// Seed for RANDOM feed profiles. Each command starts from this seed, so
    /// replaying the same commands yields the same placements. Unset means
    /// seeded from entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,

    /// Work items one command may process before it is treated as runaway.
    pub max_cascade_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tally_policy: TallyPolicy::default(),
            random_seed: None,
            max_cascade_steps: DEFAULT_MAX_CASCADE_STEPS,
        }
    }
}

impl EngineConfig {
    pub fn with_tally_policy(mut self, policy: TallyPolicy) -> Self {
        self.tally_policy = policy;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_max_cascade_steps(mut self, steps: usize) -> Self {
        self.max_cascade_steps = steps;
        self
    }

    /// Parses a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Loads the file named by `DRAW_ENGINE_CONFIG`, or the defaults when the
    /// variable is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_json_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cascade_steps == 0 {
            return Err(ConfigError::ZeroCascadeSteps);
        }
        Ok(())
    }
}
