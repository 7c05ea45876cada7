//! Expanding Polytope Algorithm in 3D

use crate::foundation::math::{utils, Vec3};
use crate::physics::collision::gjk::DEGENERATE;
use crate::physics::collision::{minkowski_support, CollisionError, NarrowPhaseConfig, Penetration, Simplex};

/// Expansion stops once a new support point is closer than this to the
/// nearest face
pub const EPA_TOLERANCE: f32 = 1e-4;

/// Triangle of the polytope with its outward unit normal
#[derive(Debug, Clone, Copy)]
struct Face {
    indices: [usize; 3],
    normal: Vec3,
    distance: f32,
}

impl Face {
    /// Orient the face away from `interior`; `None` for a sliver
    fn new(vertices: &[Vec3], indices: [usize; 3], interior: &Vec3) -> Option<Self> {
        let [i, j, k] = indices;
        let a = vertices[i];
        let normal = (vertices[j] - a).cross(&(vertices[k] - a));
        let length = normal.norm();
        if length * length < DEGENERATE {
            return None;
        }

        let mut normal = normal / length;
        if normal.dot(&(a - interior)) < 0.0 {
            normal = -normal;
        }
        Some(Self {
            indices,
            normal,
            distance: normal.dot(&a),
        })
    }

    fn edges(&self) -> [[usize; 2]; 3] {
        let [i, j, k] = self.indices;
        [[i, j], [j, k], [k, i]]
    }
}

/// Keep horizon edges: an edge shared by two removed faces cancels out
fn add_edge(edges: &mut Vec<[usize; 2]>, [i, j]: [usize; 2]) {
    if let Some(position) = edges
        .iter()
        .position(|&[p, q]| (p == i && q == j) || (p == j && q == i))
    {
        edges.swap_remove(position);
    } else {
        edges.push([i, j]);
    }
}

/// Penetration depth and direction from a GJK tetrahedron
///
/// # Errors
///
/// Returns [`CollisionError::DegenerateSimplex`] if the simplex is not a
/// proper tetrahedron or the polytope loses every face, and
/// [`CollisionError::NonConvergence`] if the depth has not settled within
/// `config.max_iterations` expansions.
pub fn penetration(
    a: &[Vec3],
    b: &[Vec3],
    simplex: &Simplex,
    config: &NarrowPhaseConfig,
) -> Result<Penetration, CollisionError> {
    if simplex.len() != 4 {
        return Err(CollisionError::DegenerateSimplex);
    }

    let mut vertices = simplex.points().to_vec();
    // Stays inside the polytope because expansion only ever adds volume
    let interior = utils::centroid(&vertices);

    let mut faces: Vec<Face> = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]]
        .into_iter()
        .filter_map(|indices| Face::new(&vertices, indices, &interior))
        .collect();
    if faces.len() < 4 {
        return Err(CollisionError::DegenerateSimplex);
    }

    for iteration in 0..config.max_iterations {
        let closest = faces
            .iter()
            .min_by(|p, q| p.distance.total_cmp(&q.distance))
            .copied()
            .ok_or(CollisionError::DegenerateSimplex)?;

        let point = minkowski_support(a, b, &closest.normal);
        if point.dot(&closest.normal) - closest.distance < EPA_TOLERANCE {
            log::trace!(
                "EPA converged after {iteration} expansions: depth {:.5}",
                closest.distance
            );
            return Ok(Penetration {
                depth: closest.distance.max(0.0),
                direction: closest.normal,
            });
        }

        let new_index = vertices.len();
        vertices.push(point);

        let mut horizon: Vec<[usize; 2]> = Vec::new();
        faces.retain(|face| {
            let visible = face.normal.dot(&(point - vertices[face.indices[0]])) > 0.0;
            if visible {
                for edge in face.edges() {
                    add_edge(&mut horizon, edge);
                }
            }
            !visible
        });

        faces.extend(
            horizon
                .into_iter()
                .filter_map(|[i, j]| Face::new(&vertices, [i, j, new_index], &interior)),
        );
        if faces.is_empty() {
            return Err(CollisionError::DegenerateSimplex);
        }
    }

    Err(CollisionError::NonConvergence {
        iterations: config.max_iterations,
    })
}
