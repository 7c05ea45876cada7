//! Narrow-phase collision detection for convex point sets
//!
//! Based on Game Engine Architecture 3rd Edition, Section 13.3.5:
//! GJK answers "do these convex shapes intersect?" by searching the Minkowski
//! difference `A - B` for the origin. When it succeeds, the enclosing simplex
//! seeds EPA, which expands it into a polytope until the face nearest the
//! origin gives the penetration depth and direction.
//!
//! # Module Organization
//!
//! - [`gjk`] - 3D intersection test and the [`Simplex`] it produces
//! - [`epa`] - 3D penetration extraction
//! - [`planar`] - both algorithms restricted to the XZ plane
//!
//! # Conventions
//!
//! [`Penetration::direction`] points out of A and into B. Moving A by
//! `-separation / 2` and B by `+separation / 2` leaves them touching.

pub mod epa;
pub mod gjk;
pub mod planar;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::foundation::math::Vec3;

pub use gjk::Simplex;

/// Errors raised by body construction and the narrow phase
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CollisionError {
    /// A body with fewer than 3 points or a non-finite coordinate
    #[error("malformed body with {points} points (need at least 3 finite points)")]
    MalformedBody {
        /// Number of points the body was given
        points: usize,
    },

    /// GJK or EPA hit the iteration cap
    #[error("narrow phase did not converge within {iterations} iterations")]
    NonConvergence {
        /// The cap that was reached
        iterations: usize,
    },

    /// The simplex or polytope collapsed and no valid face remains
    #[error("degenerate simplex")]
    DegenerateSimplex,
}

/// Narrow-phase limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrowPhaseConfig {
    /// Cap on GJK and EPA iterations for a single pair
    pub max_iterations: usize,
    /// Overlaps this shallow count as touching, not colliding
    pub contact_tolerance: f32,
}

impl Default for NarrowPhaseConfig {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            contact_tolerance: 1e-5,
        }
    }
}

impl NarrowPhaseConfig {
    /// Validate the limits
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero iteration cap or a negative
    /// tolerance.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "narrow_phase.max_iterations must be at least 1".to_string(),
            ));
        }
        if !self.contact_tolerance.is_finite() || self.contact_tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "narrow_phase.contact_tolerance must be non-negative, got {}",
                self.contact_tolerance
            )));
        }
        Ok(())
    }
}

/// Penetration of two overlapping convex shapes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Distance B must move along `direction` (or A against it) to separate
    pub depth: f32,
    /// Unit axis pointing out of A and into B
    pub direction: Vec3,
}

impl Penetration {
    /// The separation vector `depth * direction`
    #[must_use]
    pub fn separation(&self) -> Vec3 {
        self.direction * self.depth
    }
}

/// Exact convex-convex intersection and penetration test
pub trait NarrowPhase: Send + Sync {
    /// Intersection test; `Ok(None)` means the shapes are disjoint or only
    /// touching
    ///
    /// # Errors
    ///
    /// Returns [`CollisionError`] when the search fails to converge.
    fn intersects(&self, a: &[Vec3], b: &[Vec3]) -> Result<Option<Simplex>, CollisionError>;

    /// Penetration of two shapes already known to intersect, seeded by the
    /// simplex [`NarrowPhase::intersects`] produced
    ///
    /// # Errors
    ///
    /// Returns [`CollisionError`] when the polytope degenerates or the
    /// expansion fails to converge.
    fn penetration(&self, a: &[Vec3], b: &[Vec3], simplex: &Simplex) -> Result<Penetration, CollisionError>;

    /// Depth at or below which an overlap is reported as a miss
    fn contact_tolerance(&self) -> f32 {
        0.0
    }

    /// Run both stages; `Ok(None)` for disjoint or touching shapes
    ///
    /// # Errors
    ///
    /// Propagates failures from either stage.
    fn collide(&self, a: &[Vec3], b: &[Vec3]) -> Result<Option<Penetration>, CollisionError> {
        let Some(simplex) = self.intersects(a, b)? else {
            return Ok(None);
        };
        let penetration = self.penetration(a, b, &simplex)?;
        Ok((penetration.depth > self.contact_tolerance()).then_some(penetration))
    }
}

/// Which space the narrow phase works in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dimension {
    /// XZ plane only; the vertical component is ignored
    Planar,
    /// Full 3D
    #[default]
    Spatial,
}

/// GJK intersection plus EPA penetration, in 2D or 3D
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GjkEpa {
    /// Planar or spatial
    pub dimension: Dimension,
    /// Iteration cap and tolerance
    pub config: NarrowPhaseConfig,
}

impl GjkEpa {
    /// Create a tester for the given dimension
    #[must_use]
    pub const fn new(dimension: Dimension, config: NarrowPhaseConfig) -> Self {
        Self { dimension, config }
    }
}

impl NarrowPhase for GjkEpa {
    fn intersects(&self, a: &[Vec3], b: &[Vec3]) -> Result<Option<Simplex>, CollisionError> {
        match self.dimension {
            Dimension::Planar => planar::intersect(a, b, &self.config),
            Dimension::Spatial => gjk::intersect(a, b, &self.config),
        }
    }

    fn penetration(&self, a: &[Vec3], b: &[Vec3], simplex: &Simplex) -> Result<Penetration, CollisionError> {
        match self.dimension {
            Dimension::Planar => planar::penetration(a, b, simplex, &self.config),
            Dimension::Spatial => epa::penetration(a, b, simplex, &self.config),
        }
    }

    fn contact_tolerance(&self) -> f32 {
        self.config.contact_tolerance
    }
}

/// Farthest point of `points` along `direction`
pub(crate) fn support(points: &[Vec3], direction: &Vec3) -> Vec3 {
    points
        .iter()
        .copied()
        .max_by(|p, q| p.dot(direction).total_cmp(&q.dot(direction)))
        .unwrap_or_else(Vec3::zeros)
}

/// Support point of the Minkowski difference `A - B`
pub(crate) fn minkowski_support(a: &[Vec3], b: &[Vec3], direction: &Vec3) -> Vec3 {
    support(a, direction) - support(b, &-direction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    pub(super) fn cube(min: Vec3, size: f32) -> Vec<Vec3> {
        let mut points = Vec::with_capacity(8);
        for x in [0.0, size] {
            for y in [0.0, size] {
                for z in [0.0, size] {
                    points.push(min + Vec3::new(x, y, z));
                }
            }
        }
        points
    }

    #[test]
    fn test_overlapping_cubes_separate_along_offset() {
        let tester = GjkEpa::default();
        let a = cube(Vec3::zeros(), 1.0);
        let b = cube(Vec3::new(0.6, 0.0, 0.0), 1.0);

        let penetration = tester.collide(&a, &b).unwrap().unwrap();
        assert_relative_eq!(penetration.depth, 0.4, epsilon = 1e-4);
        assert_relative_eq!(penetration.direction, Vec3::x(), epsilon = 1e-4);
        assert_relative_eq!(penetration.separation(), Vec3::new(0.4, 0.0, 0.0), epsilon = 1e-4);
    }

    #[test]
    fn test_direction_flips_with_argument_order() {
        let tester = GjkEpa::default();
        let a = cube(Vec3::zeros(), 1.0);
        let b = cube(Vec3::new(0.0, 0.0, 0.7), 1.0);

        let ab = tester.collide(&a, &b).unwrap().unwrap();
        let ba = tester.collide(&b, &a).unwrap().unwrap();
        assert_relative_eq!(ab.direction, Vec3::z(), epsilon = 1e-4);
        assert_relative_eq!(ba.direction, -Vec3::z(), epsilon = 1e-4);
        assert_relative_eq!(ab.depth, ba.depth, epsilon = 1e-4);
    }

    #[test]
    fn test_separated_cubes_miss() {
        let tester = GjkEpa::default();
        let a = cube(Vec3::zeros(), 1.0);
        let b = cube(Vec3::new(2.5, 0.3, -0.2), 1.0);
        assert_eq!(tester.collide(&a, &b).unwrap(), None);
    }

    #[test]
    fn test_touching_faces_miss() {
        let tester = GjkEpa::default();
        let a = cube(Vec3::zeros(), 1.0);
        let b = cube(Vec3::new(1.0, 0.0, 0.0), 1.0);
        assert_eq!(tester.collide(&a, &b).unwrap(), None);
    }

    #[test]
    fn test_planar_ignores_height() {
        let planar = GjkEpa::new(Dimension::Planar, NarrowPhaseConfig::default());
        let spatial = GjkEpa::default();
        let a = cube(Vec3::zeros(), 1.0);
        let b = cube(Vec3::new(0.5, 3.0, 0.0), 1.0);

        assert_eq!(spatial.collide(&a, &b).unwrap(), None);
        let penetration = planar.collide(&a, &b).unwrap().unwrap();
        assert_relative_eq!(penetration.depth, 0.5, epsilon = 1e-4);
        assert_relative_eq!(penetration.direction, Vec3::x(), epsilon = 1e-4);
    }

    #[test]
    fn test_config_validation() {
        assert!(NarrowPhaseConfig::default().validate().is_ok());
        let negative = NarrowPhaseConfig {
            contact_tolerance: -1.0,
            ..NarrowPhaseConfig::default()
        };
        assert!(negative.validate().is_err());
    }
}
