//! Axis-aligned bounding boxes for spatial cells

use crate::foundation::math::Vec3;

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    #[must_use]
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest AABB enclosing every point, or `None` for an empty slice
    #[must_use]
    pub fn enclosing(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self::new(*first, *first);
        for point in rest {
            bounds.min = bounds.min.inf(point);
            bounds.max = bounds.max.sup(point);
        }
        Some(bounds)
    }

    /// Smallest AABB containing both boxes
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Grow the box by `margin` on every side
    #[must_use]
    pub fn expanded(&self, margin: f32) -> Self {
        let margin = Vec3::repeat(margin);
        Self {
            min: self.min - margin,
            max: self.max + margin,
        }
    }

    /// Get the center of the AABB
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    #[must_use]
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB contains a point (faces inclusive)
    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB overlaps or touches another AABB
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Like [`AABB::intersects`], but ignoring the Y axis
    #[must_use]
    pub fn intersects_xz(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enclosing_points() {
        let points = [
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-3.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, 6.0),
        ];
        let bounds = AABB::enclosing(&points).unwrap();
        assert_eq!(bounds.min, Vec3::new(-3.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 4.0, 6.0));
        assert!(AABB::enclosing(&[]).is_none());
    }

    #[test]
    fn test_touching_faces_intersect() {
        let a = AABB::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let b = AABB::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let c = AABB::new(Vec3::new(1.5, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_xz_ignores_height() {
        let a = AABB::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let b = AABB::new(Vec3::new(0.5, 10.0, 0.5), Vec3::new(2.0, 11.0, 2.0));
        assert!(!a.intersects(&b));
        assert!(a.intersects_xz(&b));
    }
}
