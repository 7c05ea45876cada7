//! Positional collision response
//!
//! No velocities and no mass: the separation is split evenly, half pushing A
//! back and half pushing B forward.

use crate::bodies::BodyRegistry;
use crate::foundation::math::Vec3;
use crate::physics::broad_phase::Collision;

/// Translation applied to each side of a resolved collision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Displacement {
    /// Applied to every point and the handle of body A
    pub a: Vec3,
    /// Applied to every point and the handle of body B
    pub b: Vec3,
}

impl Displacement {
    /// Distance the two bodies moved apart along the separation axis
    #[must_use]
    pub fn total(&self) -> f32 {
        (self.b - self.a).norm()
    }
}

/// Push the two bodies of `collision` apart by its separation vector
///
/// Both indices must belong to `registry`; pairs come from an index rebuilt
/// over the same registry.
pub fn resolve(registry: &mut BodyRegistry, collision: &Collision) -> Displacement {
    let half = collision.penetration.separation() * 0.5;
    let displacement = Displacement { a: -half, b: half };

    let moved_a = registry.translate(collision.pair.a, displacement.a);
    let moved_b = registry.translate(collision.pair.b, displacement.b);
    debug_assert!(
        moved_a && moved_b,
        "collision {} <-> {} names a body outside the registry",
        collision.pair.a,
        collision.pair.b
    );

    log::debug!(
        "Resolved {} <-> {}: depth {:.4} along {:?}",
        collision.pair.a,
        collision.pair.b,
        collision.penetration.depth,
        collision.penetration.direction
    );
    displacement
}
