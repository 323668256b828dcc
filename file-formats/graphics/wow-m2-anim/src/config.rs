//! Simulation settings

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::error::{AnimError, Result};
use crate::instance::MAX_STATE_SLOTS;

/// Options for the animation system
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct SimulationConfig {
    /// Split entities across worker threads
    pub parallel: bool,
    /// Maximum number of threads to use (0 = rayon's global pool)
    pub max_threads: usize,
    /// Minimum number of entities handed to one worker
    pub min_partition_size: usize,
    /// State slots per entity, at most 64
    pub max_state_slots: usize,
    /// Base seed of the per-entity variation RNG
    pub rng_seed: u64,
    /// Multiplier applied to every tick's delta time
    pub time_scale: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_threads: 0,
            min_partition_size: 64,
            max_state_slots: MAX_STATE_SLOTS,
            rng_seed: 1312,
            time_scale: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Sequential configuration, handy for deterministic tests
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Check that the values can be used
    pub fn validate(&self) -> Result<()> {
        if self.max_state_slots == 0 || self.max_state_slots > MAX_STATE_SLOTS {
            return Err(AnimError::ConfigError(format!(
                "max_state_slots must be within 1..={MAX_STATE_SLOTS}, got {}",
                self.max_state_slots
            )));
        }

        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(AnimError::ConfigError(format!(
                "time_scale must be a finite non-negative number, got {}",
                self.time_scale
            )));
        }

        Ok(())
    }

    /// Number of entities per partition for `count` entities
    pub fn partition_size(&self, count: usize, threads: usize) -> usize {
        let threads = threads.max(1);
        self.min_partition_size.max(count.div_ceil(threads)).max(1)
    }

    /// Load settings from JSON, missing fields keep their defaults
    #[cfg(feature = "serde-support")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AnimError::ConfigError(format!("Failed to parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}
