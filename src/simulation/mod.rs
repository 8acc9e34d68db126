//! Simulation module - two-phase CPU-parallel SPH pipeline and its Bevy plugin.

pub mod collision;
pub mod density;
pub mod driver;
pub mod forces;
pub mod physics_config;
pub mod scenarios;
pub mod setup;
pub mod spatial;

mod input;
mod systems;

use bevy::prelude::*;

use crate::resources::SimParams;

pub use driver::{FluidSimulation, SimStats};
pub use input::{InteractionInput, DEFAULT_INTERACTION_RADIUS, DEFAULT_INTERACTION_STRENGTH};
pub use scenarios::{generate, SpawnConfig, SpawnData, SpawnLayout};
pub use setup::{ParticleStore, PARTICLE_STRIDE};
pub use systems::{advance_simulation, publish_snapshot, ParticleSnapshot, SimulationState};

/// Plugin that spawns the fluid and steps it every frame.
#[derive(Clone, Debug, Default)]
pub struct SimulationPlugin {
    pub spawn: SpawnConfig,
    /// Overrides any `SimParams` already in the world
    pub params: Option<SimParams>,
}

impl SimulationPlugin {
    pub fn new(spawn: SpawnConfig) -> Self {
        Self {
            spawn,
            params: None,
        }
    }

    pub fn with_params(mut self, params: SimParams) -> Self {
        self.params = Some(params);
        self
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        match self.params {
            Some(params) => {
                app.insert_resource(params);
            }
            None => {
                app.init_resource::<SimParams>();
            }
        }
        app.init_resource::<InteractionInput>()
            .init_resource::<SimulationState>()
            .init_resource::<ParticleSnapshot>();

        let params = *app.world().resource::<SimParams>();
        match FluidSimulation::spawn(&self.spawn, &params) {
            Ok(simulation) => {
                app.insert_resource(simulation);
            }
            Err(err) => error!("Fluid simulation disabled: {}", err),
        }

        app.add_systems(Update, (advance_simulation, publish_snapshot).chain());
    }
}
