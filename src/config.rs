//! Evaluator configuration.
//!
//! Read from TOML with a tolerant reader: every field has a default, so a file
//! only needs to name the settings it changes, and unknown keys are ignored.
//!
//! ```toml
//! backend = "parallel"
//! parallel_threshold = 4096
//! chunk_size = 512
//! distance_epsilon = 1e-12
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compiled::DEFAULT_DISTANCE_EPSILON;
use crate::error::{BondForceError, BondForceResult};

/// Which kernel executes a pass over all bonds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Serial, deterministic summation order.
    Reference,
    /// Rayon work-stealing over chunks of bonds.
    Parallel,
    /// Reference below `parallel_threshold` bonds, parallel otherwise.
    #[default]
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
    /// Bonds per rayon work item.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_distance_epsilon")]
    pub distance_epsilon: f64,
}

fn default_parallel_threshold() -> usize {
    1024
}
fn default_chunk_size() -> usize {
    256
}
fn default_distance_epsilon() -> f64 {
    DEFAULT_DISTANCE_EPSILON
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Auto,
            parallel_threshold: default_parallel_threshold(),
            chunk_size: default_chunk_size(),
            distance_epsilon: default_distance_epsilon(),
        }
    }
}

impl EvaluatorConfig {
    pub fn from_toml_str(content: &str) -> BondForceResult<Self> {
        let config: EvaluatorConfig = toml::from_str(content)
            .map_err(|e| BondForceError::Config(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> BondForceResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BondForceError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> BondForceResult<()> {
        if self.chunk_size == 0 {
            return Err(BondForceError::Config("chunk_size must be at least 1".to_string()));
        }
        if !(self.distance_epsilon > 0.0 && self.distance_epsilon.is_finite()) {
            return Err(BondForceError::Config(format!(
                "distance_epsilon must be positive and finite, got {}",
                self.distance_epsilon
            )));
        }
        Ok(())
    }

    /// Resolves `Auto` for a given number of bonds.
    pub fn backend_for(&self, num_bonds: usize) -> Backend {
        match self.backend {
            Backend::Auto if num_bonds >= self.parallel_threshold => Backend::Parallel,
            Backend::Auto => Backend::Reference,
            other => other,
        }
    }
}
