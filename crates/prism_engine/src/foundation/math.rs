//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the presentation [`Transform`] each prism
//! carries alongside its world-space points.

use nalgebra::{Quaternion, Unit, Vector2, Vector3};

/// 2D vector type (used for the planar XZ narrow phase)
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// World up axis; prisms extrude along it
pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors (may be negative on any axis, which mirrors the shape)
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a transform with only position
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform from a position, a yaw about +Y (degrees), and a scale
    #[must_use]
    pub fn from_position_yaw_scale(position: Vec3, yaw_degrees: f32, scale: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::from_axis_angle(&Vec3::y_axis(), utils::deg_to_rad(yaw_degrees)),
            scale,
        }
    }

    /// Apply this transform to a point
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * self.scale.component_mul(&point)
    }

    /// Shift the transform by a world-space delta
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Vec2, Vec3};

    /// Convert degrees to radians
    #[must_use]
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Arithmetic mean of a point set (zero for an empty set)
    #[must_use]
    pub fn centroid(points: &[Vec3]) -> Vec3 {
        if points.is_empty() {
            return Vec3::zeros();
        }
        points.iter().sum::<Vec3>() / points.len() as f32
    }

    /// Project onto the XZ plane
    #[must_use]
    pub fn xz(v: &Vec3) -> Vec2 {
        Vec2::new(v.x, v.z)
    }

    /// Lift an XZ-plane vector back into 3D with y = 0
    #[must_use]
    pub fn from_xz(v: &Vec2) -> Vec3 {
        Vec3::new(v.x, 0.0, v.y)
    }
}
