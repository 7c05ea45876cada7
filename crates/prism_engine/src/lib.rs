//! # Prism Engine
//!
//! Periodic overlap resolution for a population of convex prisms.
//!
//! ## Features
//!
//! - **Seeded Setup**: Regular and irregular prisms generated from one seed
//! - **Broad Phase**: Octree or quadtree partitioning, rebuilt every tick
//! - **Narrow Phase**: GJK intersection with EPA penetration depth, in 3D or on the XZ plane
//! - **Response**: Symmetric positional correction, no velocities or mass
//! - **Tick Loop**: Fixed-interval state machine with cooperative cancellation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prism_engine::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     let config = SimulationConfig::default().with_seed(7).with_body_count(50);
//!     let mut world = PrismWorld::new(config)?;
//!
//!     let cancel = CancellationToken::new();
//!     let mut tick_loop = TickLoop::from_config(world.config());
//!     tick_loop.run(&mut world, &cancel, Some(10));
//!
//!     for body in world.bodies().filter(|body| body.colliding) {
//!         println!("body {} still overlapping", body.index);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod bodies;
pub mod config;
pub mod core;
pub mod foundation;
pub mod physics;
pub mod simulation;
pub mod spatial;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        bodies::{BodyIndex, BodyRegistry, Prism, PrismKind},
        core::config::{Config, ConfigError, SimulationConfig},
        foundation::{
            math::{Transform, Vec2, Vec3},
            time::Stopwatch,
        },
        physics::{CollisionError, CollisionState, Dimension, GjkEpa, NarrowPhase, Penetration},
        simulation::{
            BodyView, CancellationToken, PrismWorld, SimulationError, TickLoop, TickPhase, TickReport,
        },
        spatial::{IndexBackend, PartitionConfig, SpatialIndex, AABB},
    };
}

#[cfg(test)]
mod tests;
