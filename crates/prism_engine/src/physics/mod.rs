//! Physics module for collision detection and response
//!
//! Candidate pairs come from the spatial index, GJK/EPA confirms them, and
//! a positional correction pushes overlapping prisms apart.

pub mod broad_phase;
pub mod collision;
pub mod collision_system;
pub mod response;

pub use broad_phase::{CandidatePair, CandidatePairs, Collision};
pub use collision::{
    CollisionError,
    Dimension,
    GjkEpa,
    NarrowPhase,
    NarrowPhaseConfig,
    Penetration,
    Simplex,
};
pub use collision_system::{CollisionState, PassStats, PhysicsCollisionSystem};
pub use response::{resolve, Displacement};
