//! # Simulation Configuration
//!
//! Every tunable scalar of the collision pipeline lives in [`SimulationConfig`]:
//! how many prisms to generate and where, how often to tick, which spatial
//! index backend to build, and how hard the narrow phase may work.
//!
//! ## Design Goals
//!
//! - **Serializable**: Loads from and saves to TOML or RON via [`Config`]
//! - **Partial files**: Every field has a default, so a file may set only a few
//! - **Type Safe**: [`SimulationConfig::validate`] rejects values the pipeline cannot run with

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::foundation::time::duration_from_secs;
use crate::physics::collision::NarrowPhaseConfig;
use crate::spatial::{IndexBackend, PartitionConfig};

pub use crate::config::{Config, ConfigError};

/// # Simulation Configuration
///
/// Region radii are half-widths: bodies are placed uniformly in
/// `[-radius_xz, radius_xz]` on X and Z and `[-radius_y, radius_y]` on Y.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of prisms generated at setup
    pub body_count: usize,
    /// Half-width of the placement region on X and Z
    pub region_radius_xz: f32,
    /// Half-height of the placement region on Y
    pub region_radius_y: f32,
    /// Largest absolute scale on X and Z
    pub max_scale_xz: f32,
    /// Largest absolute scale on Y
    pub max_scale_y: f32,
    /// Smallest absolute scale, as a fraction of the per-axis maximum
    pub min_scale_fraction: f32,
    /// Wall-clock time between ticks, in seconds
    pub tick_interval_secs: f32,
    /// Seed for the setup RNG
    pub seed: u64,
    /// Zero the vertical component before narrow-phase tests
    pub planar_only: bool,
    /// Which spatial index the broad phase is built on
    pub index_backend: IndexBackend,
    /// Skip candidate pairs already tested this tick
    pub dedupe_pairs: bool,
    /// Spatial index subdivision limits
    pub partition: PartitionConfig,
    /// Narrow-phase iteration cap and contact tolerance
    pub narrow_phase: NarrowPhaseConfig,
}

impl SimulationConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self {
            body_count: 10,
            region_radius_xz: 5.0,
            region_radius_y: 5.0,
            max_scale_xz: 5.0,
            max_scale_y: 5.0,
            min_scale_fraction: 0.1,
            tick_interval_secs: 0.5,
            seed: 0,
            planar_only: false,
            index_backend: IndexBackend::Octree,
            dedupe_pairs: false,
            partition: PartitionConfig::default(),
            narrow_phase: NarrowPhaseConfig::default(),
        }
    }

    /// Set the number of generated bodies
    #[must_use]
    pub fn with_body_count(mut self, count: usize) -> Self {
        self.body_count = count;
        self
    }

    /// Set the placement region half-extents
    #[must_use]
    pub fn with_region(mut self, radius_xz: f32, radius_y: f32) -> Self {
        self.region_radius_xz = radius_xz;
        self.region_radius_y = radius_y;
        self
    }

    /// Set the per-axis scale limits
    #[must_use]
    pub fn with_max_scale(mut self, scale_xz: f32, scale_y: f32) -> Self {
        self.max_scale_xz = scale_xz;
        self.max_scale_y = scale_y;
        self
    }

    /// Set the setup seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the tick interval in seconds
    #[must_use]
    pub fn with_tick_interval(mut self, secs: f32) -> Self {
        self.tick_interval_secs = secs;
        self
    }

    /// Restrict narrow-phase tests to the XZ plane
    #[must_use]
    pub fn with_planar_only(mut self, planar: bool) -> Self {
        self.planar_only = planar;
        self
    }

    /// Pick the spatial index backend
    #[must_use]
    pub fn with_index_backend(mut self, backend: IndexBackend) -> Self {
        self.index_backend = backend;
        self
    }

    /// Enable or disable per-tick pair de-duplication
    #[must_use]
    pub fn with_dedupe_pairs(mut self, dedupe: bool) -> Self {
        self.dedupe_pairs = dedupe;
        self
    }

    /// Tick interval as a [`Duration`]
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        duration_from_secs(self.tick_interval_secs)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.body_count == 0 {
            return Err(ConfigError::Invalid("body_count must be at least 1".to_string()));
        }

        let positive = [
            ("region_radius_xz", self.region_radius_xz),
            ("region_radius_y", self.region_radius_y),
            ("max_scale_xz", self.max_scale_xz),
            ("max_scale_y", self.max_scale_y),
            ("tick_interval_secs", self.tick_interval_secs),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }

        if !(self.min_scale_fraction > 0.0 && self.min_scale_fraction <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "min_scale_fraction must be in (0, 1], got {}",
                self.min_scale_fraction
            )));
        }

        self.partition.validate()?;
        self.narrow_phase.validate()?;

        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for SimulationConfig {}
