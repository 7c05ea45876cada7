//! # Bodies
//!
//! The simulated prisms and the registry that owns them.
//!
//! Each prism keeps its cross-section in world space and is paired with a
//! presentation [`Transform`](crate::foundation::math::Transform) that moves in
//! lockstep with it.

pub mod prism;
pub mod registry;

pub use prism::{Prism, PrismKind};
pub use registry::BodyRegistry;

/// Stable index of a body in the [`BodyRegistry`]
pub type BodyIndex = usize;
