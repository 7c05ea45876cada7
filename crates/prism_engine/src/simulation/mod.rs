//! # Simulation
//!
//! [`PrismWorld`] owns the bodies and the collision pipeline. [`TickLoop`]
//! runs that pipeline once per interval until a [`CancellationToken`] fires.

pub mod tick_loop;
pub mod world;

pub use tick_loop::{CancellationToken, TickLoop, TickPhase};
pub use world::{BodyView, PrismWorld, TickReport};

use thiserror::Error;

use crate::config::ConfigError;
use crate::physics::CollisionError;

/// Errors raised while setting up a simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The configuration was rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A generated body was malformed
    #[error("Body error: {0}")]
    Collision(#[from] CollisionError),
}
