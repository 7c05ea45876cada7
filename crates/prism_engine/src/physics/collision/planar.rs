//! GJK and EPA restricted to the XZ plane
//!
//! Inputs are 3D points whose Y component is ignored. The simplex is lifted
//! back to y = 0 so it can travel through the same [`Simplex`] type, and the
//! penetration direction always has a zero Y component.

use crate::foundation::math::utils::{centroid, from_xz, xz};
use crate::foundation::math::{Vec2, Vec3};
use crate::physics::collision::epa::EPA_TOLERANCE;
use crate::physics::collision::gjk::DEGENERATE;
use crate::physics::collision::{minkowski_support, CollisionError, NarrowPhaseConfig, Penetration, Simplex};

fn support(a: &[Vec3], b: &[Vec3], direction: &Vec2) -> Vec2 {
    xz(&minkowski_support(a, b, &from_xz(direction)))
}

/// Counter-clockwise perpendicular
fn perpendicular(v: &Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// 2D cross product (signed parallelogram area)
fn cross(a: &Vec2, b: &Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Perpendicular to `edge` on the side away from `other`
fn outward(edge: &Vec2, other: &Vec2) -> Vec2 {
    let normal = perpendicular(edge);
    if normal.dot(other) > 0.0 {
        -normal
    } else {
        normal
    }
}

fn evolve(simplex: &mut Vec<Vec2>, direction: &mut Vec2) -> bool {
    match simplex.len() {
        2 => {
            let a = simplex[1];
            let b = simplex[0];
            let ab = b - a;
            let ao = -a;
            if ab.dot(&ao) > 0.0 {
                // Toward the origin; either side when the origin is on the segment
                *direction = -outward(&ab, &ao);
            } else {
                *simplex = vec![a];
                *direction = ao;
            }
            false
        }
        3 => {
            let a = simplex[2];
            let b = simplex[1];
            let c = simplex[0];
            let ab = b - a;
            let ac = c - a;
            let ao = -a;

            let ab_out = outward(&ab, &ac);
            if ab_out.dot(&ao) > 0.0 {
                *simplex = vec![b, a];
                *direction = ab_out;
                return false;
            }
            let ac_out = outward(&ac, &ab);
            if ac_out.dot(&ao) > 0.0 {
                *simplex = vec![c, a];
                *direction = ac_out;
                return false;
            }
            true
        }
        _ => false,
    }
}

/// Planar intersection test over the XZ footprints of `a` and `b`
///
/// # Errors
///
/// Returns [`CollisionError::NonConvergence`] if the search exceeds
/// `config.max_iterations` steps.
pub fn intersect(a: &[Vec3], b: &[Vec3], config: &NarrowPhaseConfig) -> Result<Option<Simplex>, CollisionError> {
    let initial = xz(&(centroid(b) - centroid(a)));
    let mut direction = if initial.norm_squared() > DEGENERATE { initial } else { Vec2::x() };

    let mut simplex = vec![support(a, b, &direction)];
    direction = -simplex[0];

    for _ in 0..config.max_iterations {
        let length = direction.norm();
        if length * length < DEGENERATE {
            return Ok(None);
        }
        direction /= length;

        let point = support(a, b, &direction);
        if point.dot(&direction) <= config.contact_tolerance {
            return Ok(None);
        }
        simplex.push(point);

        if evolve(&mut simplex, &mut direction) {
            return Ok(Some(Simplex::from_points(simplex.iter().map(from_xz).collect())));
        }
    }

    Err(CollisionError::NonConvergence {
        iterations: config.max_iterations,
    })
}

/// Nearest polygon edge to the origin: (insert position, outward normal, distance)
fn closest_edge(polygon: &[Vec2]) -> Result<(usize, Vec2, f32), CollisionError> {
    let mut best: Option<(usize, Vec2, f32)> = None;
    for i in 0..polygon.len() {
        let j = (i + 1) % polygon.len();
        let edge = polygon[j] - polygon[i];
        let normal = Vec2::new(edge.y, -edge.x);
        let length = normal.norm();
        if length * length < DEGENERATE {
            continue;
        }
        let normal = normal / length;
        let distance = normal.dot(&polygon[i]);
        if best.map_or(true, |(_, _, nearest)| distance < nearest) {
            best = Some((j, normal, distance));
        }
    }
    best.ok_or(CollisionError::DegenerateSimplex)
}

/// Planar penetration from a GJK triangle
///
/// # Errors
///
/// Returns [`CollisionError::DegenerateSimplex`] for anything but a proper
/// triangle and [`CollisionError::NonConvergence`] past the iteration cap.
pub fn penetration(
    a: &[Vec3],
    b: &[Vec3],
    simplex: &Simplex,
    config: &NarrowPhaseConfig,
) -> Result<Penetration, CollisionError> {
    let mut polygon: Vec<Vec2> = simplex.points().iter().map(xz).collect();
    if polygon.len() != 3 {
        return Err(CollisionError::DegenerateSimplex);
    }

    let area = cross(&(polygon[1] - polygon[0]), &(polygon[2] - polygon[0]));
    if area.abs() < DEGENERATE {
        return Err(CollisionError::DegenerateSimplex);
    }
    if area < 0.0 {
        polygon.reverse();
    }

    for _ in 0..config.max_iterations {
        let (insert_at, normal, distance) = closest_edge(&polygon)?;
        let point = support(a, b, &normal);
        if point.dot(&normal) - distance < EPA_TOLERANCE {
            return Ok(Penetration {
                depth: distance.max(0.0),
                direction: from_xz(&normal),
            });
        }
        polygon.insert(insert_at, point);
    }

    Err(CollisionError::NonConvergence {
        iterations: config.max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(min_x: f32, min_z: f32, size: f32, y: f32) -> Vec<Vec3> {
        vec![
            Vec3::new(min_x, y, min_z),
            Vec3::new(min_x + size, y, min_z),
            Vec3::new(min_x + size, y, min_z + size),
            Vec3::new(min_x, y, min_z + size),
        ]
    }

    #[test]
    fn test_overlapping_squares() {
        let config = NarrowPhaseConfig::default();
        let a = square(0.0, 0.0, 1.0, 0.0);
        let b = square(0.6, 0.0, 1.0, 0.0);

        let simplex = intersect(&a, &b, &config).unwrap().unwrap();
        assert_eq!(simplex.len(), 3);
        assert!(simplex.points().iter().all(|p| p.y == 0.0));

        let result = penetration(&a, &b, &simplex, &config).unwrap();
        assert_relative_eq!(result.depth, 0.4, epsilon = 1e-4);
        assert_relative_eq!(result.direction, Vec3::x(), epsilon = 1e-4);
    }

    #[test]
    fn test_heights_are_ignored() {
        let config = NarrowPhaseConfig::default();
        let a = square(0.0, 0.0, 1.0, -10.0);
        let b = square(0.0, 0.8, 1.0, 25.0);

        let simplex = intersect(&a, &b, &config).unwrap().unwrap();
        let result = penetration(&a, &b, &simplex, &config).unwrap();
        assert_relative_eq!(result.depth, 0.2, epsilon = 1e-4);
        assert_relative_eq!(result.direction, Vec3::z(), epsilon = 1e-4);
    }

    #[test]
    fn test_disjoint_footprints() {
        let config = NarrowPhaseConfig::default();
        let a = square(0.0, 0.0, 1.0, 0.0);
        let b = square(1.5, 1.5, 1.0, 0.0);
        assert!(intersect(&a, &b, &config).unwrap().is_none());
    }

    #[test]
    fn test_closest_edge_of_ccw_square() {
        let polygon = [
            Vec2::new(-1.0, -2.0),
            Vec2::new(3.0, -2.0),
            Vec2::new(3.0, 2.0),
            Vec2::new(-1.0, 2.0),
        ];
        let (insert_at, normal, distance) = closest_edge(&polygon).unwrap();
        assert_eq!(insert_at, 0);
        assert_relative_eq!(normal, Vec2::new(-1.0, 0.0));
        assert_relative_eq!(distance, 1.0);
    }
}
