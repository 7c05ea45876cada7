//! Core collision pipeline
//!
//! Based on Game Engine Architecture 3rd Edition, Chapter 13:
//! "The collision detection system is typically split into two phases:
//! broad-phase and narrow-phase."
//!
//! One pass clears the collision flags, rebuilds the spatial index from the
//! current centroids, then streams candidate pairs through the narrow phase
//! and resolves every hit immediately. A pair resolved early in the pass can
//! change the geometry a later pair sees.

use crate::bodies::{BodyIndex, BodyRegistry, Prism};
use crate::core::SimulationConfig;
use crate::foundation::math::Vec3;
use crate::physics::broad_phase::{CandidatePair, CandidatePairs, Collision};
use crate::physics::collision::{Dimension, GjkEpa, NarrowPhase};
use crate::physics::response::resolve;
use crate::spatial::{SpatialIndex, AABB};

/// Per-body "currently colliding" flags, indexed by [`BodyIndex`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionState(Vec<bool>);

impl CollisionState {
    /// All flags false
    #[must_use]
    pub fn new(body_count: usize) -> Self {
        Self(vec![false; body_count])
    }

    /// Reset every flag to false
    pub fn clear(&mut self) {
        self.0.fill(false);
    }

    /// Flag both sides of a confirmed hit
    pub fn mark(&mut self, pair: CandidatePair) {
        for index in [pair.a, pair.b] {
            if let Some(flag) = self.0.get_mut(index) {
                *flag = true;
            }
        }
    }

    /// Whether the body was part of a hit this tick
    #[must_use]
    pub fn is_colliding(&self, index: BodyIndex) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    /// Number of flagged bodies
    #[must_use]
    pub fn colliding_count(&self) -> usize {
        self.0.iter().filter(|&&flag| flag).count()
    }

    /// Raw flags in index order
    #[must_use]
    pub fn flags(&self) -> &[bool] {
        &self.0
    }
}

/// Counts gathered while streaming one tick's candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Pairs yielded by the broad phase
    pub candidates: usize,
    /// Narrow-phase tests run
    pub tests: usize,
    /// Confirmed and resolved collisions
    pub hits: usize,
    /// Tests that errored and were counted as misses
    pub failures: usize,
}

/// Broad phase, narrow phase and response over a [`BodyRegistry`]
pub struct PhysicsCollisionSystem {
    /// Spatial partitioning structure for broad-phase
    index: Box<dyn SpatialIndex>,

    /// Exact pair test
    narrow_phase: Box<dyn NarrowPhase>,

    /// Which point set each prism contributes to the narrow phase
    dimension: Dimension,

    /// Flags for the current tick
    state: CollisionState,

    /// Skip pairs already tested this tick
    dedupe_pairs: bool,
}

impl PhysicsCollisionSystem {
    /// Create a system from explicit parts
    #[must_use]
    pub fn new(
        index: Box<dyn SpatialIndex>,
        narrow_phase: Box<dyn NarrowPhase>,
        dimension: Dimension,
        body_count: usize,
    ) -> Self {
        Self {
            index,
            narrow_phase,
            dimension,
            state: CollisionState::new(body_count),
            dedupe_pairs: false,
        }
    }

    /// Build the index backend and GJK/EPA tester the configuration asks for
    #[must_use]
    pub fn from_config(config: &SimulationConfig, body_count: usize) -> Self {
        let region = AABB::new(
            Vec3::new(-config.region_radius_xz, -config.region_radius_y, -config.region_radius_xz),
            Vec3::new(config.region_radius_xz, config.region_radius_y, config.region_radius_xz),
        );
        let dimension = if config.planar_only {
            Dimension::Planar
        } else {
            Dimension::Spatial
        };

        let mut system = Self::new(
            config.index_backend.build(region, config.partition),
            Box::new(GjkEpa::new(dimension, config.narrow_phase)),
            dimension,
            body_count,
        );
        system.dedupe_pairs = config.dedupe_pairs;
        system
    }

    /// Enable or disable per-tick pair de-duplication
    pub fn set_dedupe_pairs(&mut self, enabled: bool) {
        self.dedupe_pairs = enabled;
    }

    /// First half of a tick: clear the flags and rebuild the index
    pub fn prepare(&mut self, registry: &BodyRegistry) {
        self.state.clear();
        self.index.rebuild(&registry.positions());
        log::trace!(
            "Index rebuilt: {} bodies in {} occupied leaves",
            self.index.occupant_count(),
            self.index.occupied_leaf_count()
        );
    }

    /// Second half of a tick: stream candidates, test each and resolve hits
    pub fn resolve_candidates(&mut self, registry: &mut BodyRegistry) -> PassStats {
        let mut stats = PassStats::default();
        let pairs = CandidatePairs::new(self.index.as_ref()).deduplicated(self.dedupe_pairs);

        for pair in pairs {
            stats.candidates += 1;
            let (Some(prism_a), Some(prism_b)) = (registry.prism(pair.a), registry.prism(pair.b)) else {
                log::warn!("Candidate pair {pair:?} names a missing body");
                continue;
            };

            let points_a = narrow_phase_points(self.dimension, prism_a);
            let points_b = narrow_phase_points(self.dimension, prism_b);
            stats.tests += 1;

            match self.narrow_phase.collide(&points_a, &points_b) {
                Ok(Some(penetration)) => {
                    let collision = Collision { pair, penetration };
                    self.state.mark(pair);
                    resolve(registry, &collision);
                    stats.hits += 1;
                }
                Ok(None) => {
                    log::trace!("Pair {} / {} clear", pair.a, pair.b);
                }
                Err(err) => {
                    log::warn!("Narrow phase failed for {} / {}: {err}", pair.a, pair.b);
                    stats.failures += 1;
                }
            }
        }

        stats
    }

    /// A whole pass in one call
    pub fn step(&mut self, registry: &mut BodyRegistry) -> PassStats {
        self.prepare(registry);
        self.resolve_candidates(registry)
    }

    /// Flags from the latest pass
    #[must_use]
    pub const fn collision_state(&self) -> &CollisionState {
        &self.state
    }

    /// Spatial index for direct access (e.g. for visualization)
    #[must_use]
    pub fn spatial_index(&self) -> &dyn SpatialIndex {
        self.index.as_ref()
    }

    /// Narrow-phase dimension in use
    #[must_use]
    pub const fn dimension(&self) -> Dimension {
        self.dimension
    }
}

/// The point set a prism contributes in the given dimension
#[must_use]
pub fn narrow_phase_points(dimension: Dimension, prism: &Prism) -> Vec<Vec3> {
    match dimension {
        Dimension::Planar => prism.planar_points(),
        Dimension::Spatial => prism.hull_points(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision::{CollisionError, Penetration, Simplex};
    use crate::spatial::{IndexBackend, PartitionConfig};

    fn create_test_system(body_count: usize) -> PhysicsCollisionSystem {
        let bounds = AABB::new(Vec3::new(-10.0, -10.0, -10.0), Vec3::new(10.0, 10.0, 10.0));
        let index = IndexBackend::Octree.build(bounds, PartitionConfig::default());
        PhysicsCollisionSystem::new(index, Box::new(GjkEpa::default()), Dimension::Spatial, body_count)
    }

    fn boxes(offsets: &[f32]) -> BodyRegistry {
        BodyRegistry::from_prisms(
            offsets
                .iter()
                .map(|&x| Prism::cuboid(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 1.0, 1.0)).unwrap())
                .collect(),
        )
    }

    /// Narrow phase that always fails
    struct Broken;

    impl NarrowPhase for Broken {
        fn intersects(&self, _a: &[Vec3], _b: &[Vec3]) -> Result<Option<Simplex>, CollisionError> {
            Err(CollisionError::NonConvergence { iterations: 0 })
        }

        fn penetration(&self, _a: &[Vec3], _b: &[Vec3], _simplex: &Simplex) -> Result<Penetration, CollisionError> {
            Err(CollisionError::DegenerateSimplex)
        }
    }

    #[test]
    fn test_collision_detection() {
        let mut registry = boxes(&[0.0, 0.6]);
        let mut system = create_test_system(registry.len());

        let stats = system.step(&mut registry);
        assert_eq!(stats.hits, 1);
        assert!(system.collision_state().is_colliding(0));
        assert!(system.collision_state().is_colliding(1));
    }

    #[test]
    fn test_separated_bodies_untouched() {
        let mut registry = boxes(&[0.0, 3.0, -4.0]);
        let before = registry.prisms().to_vec();
        let mut system = create_test_system(registry.len());

        let stats = system.step(&mut registry);
        assert_eq!(stats.hits, 0);
        assert!(stats.tests > 0);
        assert_eq!(registry.prisms(), before.as_slice());
        assert_eq!(system.collision_state().colliding_count(), 0);
    }

    #[test]
    fn test_failures_count_as_misses() {
        let mut registry = boxes(&[0.0, 0.6]);
        let before = registry.prisms().to_vec();
        let bounds = AABB::new(Vec3::new(-10.0, -10.0, -10.0), Vec3::new(10.0, 10.0, 10.0));
        let mut system = PhysicsCollisionSystem::new(
            IndexBackend::QuadTree.build(bounds, PartitionConfig::default()),
            Box::new(Broken),
            Dimension::Spatial,
            registry.len(),
        );

        let stats = system.step(&mut registry);
        assert_eq!(stats.failures, stats.tests);
        assert!(stats.failures > 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(registry.prisms(), before.as_slice());
    }

    #[test]
    fn test_state_mark_and_clear() {
        let mut state = CollisionState::new(3);
        state.mark(CandidatePair { a: 2, b: 0 });
        assert_eq!(state.flags(), &[true, false, true]);
        assert!(!state.is_colliding(7));

        state.clear();
        assert_eq!(state.colliding_count(), 0);
        assert_eq!(state.flags().len(), 3);
    }
}
