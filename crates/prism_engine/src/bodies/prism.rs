//! Prism geometry and shape generation

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::foundation::math::{constants, utils, Vec3, UP};
use crate::physics::collision::CollisionError;

/// Which cross-section generator a prism was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrismKind {
    /// Vertices at equal angles around the circle
    Regular,
    /// Vertices at random sorted angles around the circle
    Irregular,
}

impl PrismKind {
    /// Model-space cross-section with `count` vertices on the unit circle in
    /// the XZ plane, counter-clockwise seen from +Y
    ///
    /// Irregular shapes draw from `rng`; regular ones leave it untouched.
    pub fn cross_section<R: Rng + ?Sized>(self, count: usize, rng: &mut R) -> Vec<Vec3> {
        let angles: Vec<f32> = match self {
            Self::Regular => (0..count)
                .map(|i| constants::TAU * i as f32 / count as f32)
                .collect(),
            Self::Irregular => irregular_angles(count, rng),
        };

        angles
            .into_iter()
            .map(|angle| Vec3::new(angle.cos(), 0.0, -angle.sin()))
            .collect()
    }
}

/// Sorted random angles around the full circle, no two closer than a
/// quarter of the regular spacing
fn irregular_angles<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<f32> {
    if count == 0 {
        return Vec::new();
    }

    let min_gap = constants::TAU / (4.0 * count as f32);
    let spare = constants::TAU - min_gap * count as f32;

    let start = rng.gen::<f32>() * constants::TAU;
    let weights: Vec<f32> = (0..count).map(|_| rng.gen::<f32>() + f32::EPSILON).collect();
    let total: f32 = weights.iter().sum();

    let mut angle = start;
    weights
        .iter()
        .map(|weight| {
            let current = angle;
            angle += spare.mul_add(weight / total, min_gap);
            current
        })
        .collect()
}

/// A convex prism: a world-space polygon cross-section extruded along +Y
#[derive(Debug, Clone, PartialEq)]
pub struct Prism {
    points: Vec<Vec3>,
    mid_y: f32,
    height: f32,
    kind: PrismKind,
}

impl Prism {
    /// Minimum number of cross-section vertices
    pub const MIN_POINTS: usize = 3;

    /// Build a prism from its world-space cross-section
    ///
    /// `mid_y` is the centre of the vertical extent relative to the plane of
    /// the cross-section.
    ///
    /// # Errors
    ///
    /// Returns [`CollisionError::MalformedBody`] for fewer than three points
    /// or any non-finite coordinate.
    pub fn new(points: Vec<Vec3>, mid_y: f32, height: f32, kind: PrismKind) -> Result<Self, CollisionError> {
        let finite = points.iter().all(|p| p.iter().all(|c| c.is_finite()));
        if points.len() < Self::MIN_POINTS || !finite || !mid_y.is_finite() || !height.is_finite() {
            return Err(CollisionError::MalformedBody { points: points.len() });
        }

        Ok(Self {
            points,
            mid_y,
            height: height.abs(),
            kind,
        })
    }

    /// Axis-aligned box prism spanning `min..max`, handy for hand-built layouts
    ///
    /// # Errors
    ///
    /// Returns [`CollisionError::MalformedBody`] for non-finite corners.
    pub fn cuboid(min: Vec3, max: Vec3) -> Result<Self, CollisionError> {
        let points = vec![
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, min.y, max.z),
        ];
        let height = max.y - min.y;
        Self::new(points, height * 0.5, height, PrismKind::Regular)
    }

    /// World-space cross-section vertices
    #[must_use]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Number of cross-section vertices
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Centre of the vertical extent, relative to the cross-section plane
    #[must_use]
    pub const fn mid_y(&self) -> f32 {
        self.mid_y
    }

    /// Vertical extent
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }

    /// Generator used for the cross-section
    #[must_use]
    pub const fn kind(&self) -> PrismKind {
        self.kind
    }

    /// Mean of the cross-section vertices (the indexing position)
    #[must_use]
    pub fn centroid(&self) -> Vec3 {
        utils::centroid(&self.points)
    }

    /// Every vertex of the solid: each cross-section point at the bottom and
    /// at the top of the vertical extent
    #[must_use]
    pub fn hull_points(&self) -> Vec<Vec3> {
        let bottom = UP * (self.mid_y - self.height * 0.5);
        let top = UP * (self.mid_y + self.height * 0.5);
        self.points
            .iter()
            .flat_map(|p| [p + bottom, p + top])
            .collect()
    }

    /// Cross-section flattened onto y = 0
    #[must_use]
    pub fn planar_points(&self) -> Vec<Vec3> {
        self.points.iter().map(|p| Vec3::new(p.x, 0.0, p.z)).collect()
    }

    /// Move every vertex by `delta`
    pub fn translate(&mut self, delta: Vec3) {
        for point in &mut self.points {
            *point += delta;
        }
    }
}
