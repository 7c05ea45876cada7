//! The simulated world: bodies plus the collision pipeline that moves them

use std::time::Duration;

use crate::bodies::{BodyIndex, BodyRegistry};
use crate::core::SimulationConfig;
use crate::foundation::math::{Transform, Vec3};
use crate::foundation::time::Stopwatch;
use crate::physics::{CollisionState, Dimension, PassStats, PhysicsCollisionSystem};
use crate::simulation::SimulationError;
use crate::spatial::IndexBackend;

/// Outcome of one pipeline pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// 1-based tick number
    pub tick: u64,
    /// Pairs yielded by the broad phase
    pub candidates: usize,
    /// Narrow-phase tests run
    pub tests: usize,
    /// Collisions confirmed and resolved
    pub hits: usize,
    /// Narrow-phase errors counted as misses
    pub narrow_phase_failures: usize,
    /// Wall-clock time spent in the pass
    pub elapsed: Duration,
}

impl TickReport {
    fn new(tick: u64, stats: PassStats, elapsed: Duration) -> Self {
        Self {
            tick,
            candidates: stats.candidates,
            tests: stats.tests,
            hits: stats.hits,
            narrow_phase_failures: stats.failures,
            elapsed,
        }
    }
}

/// Read-only view of one body for drawing
#[derive(Debug, Clone, Copy)]
pub struct BodyView<'a> {
    /// Stable body index
    pub index: BodyIndex,
    /// World-space cross-section
    pub points: &'a [Vec3],
    /// Centre of the vertical extent, relative to the cross-section
    pub mid_y: f32,
    /// Vertical extent
    pub height: f32,
    /// Part of a hit during the latest tick
    pub colliding: bool,
    /// Presentation transform
    pub handle: &'a Transform,
}

/// Bodies, their collision flags and the pipeline that updates them
pub struct PrismWorld {
    config: SimulationConfig,
    registry: BodyRegistry,
    collisions: PhysicsCollisionSystem,
    ticks: u64,
}

impl PrismWorld {
    /// Generate bodies from the configuration and build the pipeline
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError`] if the configuration is invalid.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        let registry = BodyRegistry::generate(&config)?;
        Self::from_registry(config, registry)
    }

    /// Build the pipeline around an existing registry
    ///
    /// `config.body_count` and the setup fields are ignored; everything else
    /// applies.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError`] if the configuration is invalid.
    pub fn from_registry(config: SimulationConfig, registry: BodyRegistry) -> Result<Self, SimulationError> {
        config.validate()?;
        let collisions = PhysicsCollisionSystem::from_config(&config, registry.len());

        log::info!(
            "World ready: {} bodies, {} index, {} narrow phase",
            registry.len(),
            config.index_backend,
            if config.planar_only { "planar" } else { "spatial" }
        );

        Ok(Self {
            config,
            registry,
            collisions,
            ticks: 0,
        })
    }

    /// Run one complete pass synchronously
    pub fn tick(&mut self) -> TickReport {
        let stopwatch = Stopwatch::start_new();
        self.begin_tick();
        self.finish_tick(&stopwatch)
    }

    /// Clear the flags and rebuild the index
    pub(crate) fn begin_tick(&mut self) {
        self.collisions.prepare(&self.registry);
    }

    /// Stream, test and resolve the candidates of the tick begun earlier
    pub(crate) fn finish_tick(&mut self, stopwatch: &Stopwatch) -> TickReport {
        let stats = self.collisions.resolve_candidates(&mut self.registry);
        self.ticks += 1;

        let report = TickReport::new(self.ticks, stats, stopwatch.elapsed());
        log::debug!(
            "Tick {}: {} candidates, {} tests, {} hits, {} failures in {:?}",
            report.tick,
            report.candidates,
            report.tests,
            report.hits,
            report.narrow_phase_failures,
            report.elapsed
        );
        report
    }

    /// Every body in index order
    pub fn bodies(&self) -> impl Iterator<Item = BodyView<'_>> {
        let state = self.collisions.collision_state();
        self.registry
            .prisms()
            .iter()
            .zip(self.registry.handles())
            .enumerate()
            .map(move |(index, (prism, handle))| BodyView {
                index,
                points: prism.points(),
                mid_y: prism.mid_y(),
                height: prism.height(),
                colliding: state.is_colliding(index),
                handle,
            })
    }

    /// Flags from the latest tick
    #[must_use]
    pub const fn collision_state(&self) -> &CollisionState {
        self.collisions.collision_state()
    }

    /// The body registry
    #[must_use]
    pub const fn registry(&self) -> &BodyRegistry {
        &self.registry
    }

    /// Configuration the world was built with
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Active spatial index backend
    #[must_use]
    pub fn index_backend(&self) -> IndexBackend {
        self.collisions.spatial_index().backend()
    }

    /// Whether narrow-phase tests ignore height
    #[must_use]
    pub const fn is_planar(&self) -> bool {
        matches!(self.collisions.dimension(), Dimension::Planar)
    }

    /// Number of completed ticks
    #[must_use]
    pub const fn ticks_completed(&self) -> u64 {
        self.ticks
    }

    /// Number of bodies
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.registry.len()
    }
}
