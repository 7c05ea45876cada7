//! # Core Module
//!
//! Shared configuration used by every subsystem of the pipeline.
//!
//! ## Organization
//!
//! - **Config**: [`SimulationConfig`] plus the file-backed [`Config`] trait

pub mod config;

pub use config::{Config, ConfigError, SimulationConfig};
