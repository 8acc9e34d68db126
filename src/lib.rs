//! SPH Pool Simulation Library
//!
//! A 2D smoothed-particle-hydrodynamics fluid confined to a box, stepped in two
//! data-parallel phases (density, then forces and integration) per frame.

pub mod error;
pub mod resources;
pub mod simulation;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, SimulationError};
    pub use crate::resources::{GridParams, NeighborSearch, Particle, SimParams};
    pub use crate::simulation::{
        FluidSimulation, InteractionInput, ParticleSnapshot, SimStats, SimulationPlugin,
        SimulationState, SpawnConfig, SpawnData, SpawnLayout,
    };
}
