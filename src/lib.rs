//! Proxima: autonomous agents on a chunked procedural world
//!
//! Re-exports modules for use by binaries and tools.

pub mod ascii;
pub mod biomes;
pub mod config;
pub mod error;
pub mod noise_field;
pub mod seeds;
pub mod simulation;
pub mod tilemap;
pub mod world;

pub use config::SimConfig;
pub use error::{ConfigError, StorageError};
pub use simulation::Simulation;
pub use world::World;
