//! GJK intersection test in 3D

use crate::foundation::math::{utils, Vec3};
use crate::physics::collision::{minkowski_support, CollisionError, NarrowPhaseConfig};

/// Squared lengths below this are treated as zero
pub(crate) const DEGENERATE: f32 = 1e-12;

/// Intermediate point set of the intersection test, newest point last
///
/// A successful 3D test leaves a tetrahedron enclosing the origin; a planar
/// test leaves a triangle lying in y = 0.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Simplex {
    points: Vec<Vec3>,
}

impl Simplex {
    /// Create an empty simplex
    #[must_use]
    pub fn new() -> Self {
        Self {
            points: Vec::with_capacity(4),
        }
    }

    /// Build a simplex from existing vertices
    #[must_use]
    pub fn from_points(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    /// Vertices, oldest first
    #[must_use]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Number of vertices
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the simplex has no vertices
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn push(&mut self, point: Vec3) {
        self.points.push(point);
    }

    /// Reduce to the feature nearest the origin and update the search
    /// direction; returns true once the origin is enclosed
    fn evolve(&mut self, direction: &mut Vec3) -> bool {
        match self.points.len() {
            2 => self.line(direction),
            3 => self.triangle(direction),
            4 => self.tetrahedron(direction),
            _ => false,
        }
    }

    fn line(&mut self, direction: &mut Vec3) -> bool {
        let a = self.points[1];
        let b = self.points[0];
        let ab = b - a;
        let ao = -a;

        if ab.dot(&ao) > 0.0 {
            let toward_origin = triple_cross(&ab, &ao, &ab);
            *direction = if toward_origin.norm_squared() > DEGENERATE {
                toward_origin
            } else {
                // Origin lies on the segment
                any_perpendicular(&ab)
            };
        } else {
            self.points = vec![a];
            *direction = ao;
        }
        false
    }

    fn triangle(&mut self, direction: &mut Vec3) -> bool {
        let a = self.points[2];
        let b = self.points[1];
        let c = self.points[0];
        let ab = b - a;
        let ac = c - a;
        let ao = -a;
        let abc = ab.cross(&ac);

        if abc.norm_squared() < DEGENERATE {
            self.points = vec![b, a];
            return self.line(direction);
        }

        if abc.cross(&ac).dot(&ao) > 0.0 {
            if ac.dot(&ao) > 0.0 {
                self.points = vec![c, a];
                *direction = triple_cross(&ac, &ao, &ac);
            } else {
                self.points = vec![b, a];
                return self.line(direction);
            }
        } else if ab.cross(&abc).dot(&ao) > 0.0 {
            self.points = vec![b, a];
            return self.line(direction);
        } else if abc.dot(&ao) >= 0.0 {
            *direction = abc;
        } else {
            self.points = vec![b, c, a];
            *direction = -abc;
        }
        false
    }

    fn tetrahedron(&mut self, direction: &mut Vec3) -> bool {
        let a = self.points[3];
        let b = self.points[2];
        let c = self.points[1];
        let d = self.points[0];
        let ao = -a;

        // The face opposite `a` was already tested when `a` was found
        for (p, q, opposite) in [(b, c, d), (c, d, b), (d, b, c)] {
            let mut normal = (p - a).cross(&(q - a));
            if normal.dot(&(opposite - a)) > 0.0 {
                normal = -normal;
            }
            if normal.dot(&ao) > 0.0 {
                self.points = vec![q, p, a];
                *direction = normal;
                return self.triangle(direction);
            }
        }
        true
    }
}

/// `(a x b) x c`
fn triple_cross(a: &Vec3, b: &Vec3, c: &Vec3) -> Vec3 {
    a.cross(b).cross(c)
}

/// Some vector perpendicular to `v`
fn any_perpendicular(v: &Vec3) -> Vec3 {
    let (x, y, z) = (v.x.abs(), v.y.abs(), v.z.abs());
    let axis = if x <= y && x <= z {
        Vec3::x()
    } else if y <= z {
        Vec3::y()
    } else {
        Vec3::z()
    };
    v.cross(&axis)
}

/// Whether the convex hulls of `a` and `b` overlap by more than the contact
/// tolerance
///
/// # Errors
///
/// Returns [`CollisionError::NonConvergence`] if the origin is neither
/// enclosed nor ruled out within `config.max_iterations` steps.
pub fn intersect(a: &[Vec3], b: &[Vec3], config: &NarrowPhaseConfig) -> Result<Option<Simplex>, CollisionError> {
    let initial = utils::centroid(b) - utils::centroid(a);
    let mut direction = if initial.norm_squared() > DEGENERATE { initial } else { Vec3::x() };

    let mut simplex = Simplex::new();
    let first = minkowski_support(a, b, &direction);
    simplex.push(first);
    direction = -first;

    for _ in 0..config.max_iterations {
        let length = direction.norm();
        if length * length < DEGENERATE {
            // Origin is a vertex of A - B, so the shapes only touch
            return Ok(None);
        }
        direction /= length;

        let point = minkowski_support(a, b, &direction);
        if point.dot(&direction) <= config.contact_tolerance {
            return Ok(None);
        }
        simplex.push(point);

        if simplex.evolve(&mut direction) {
            log::trace!("GJK enclosed the origin with {} points", simplex.len());
            return Ok(Some(simplex));
        }
    }

    Err(CollisionError::NonConvergence {
        iterations: config.max_iterations,
    })
}
