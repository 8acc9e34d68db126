//! Bevy systems that run the simulation once per frame.
//!
//! Frame stages (chained in `Update`):
//! 1. `advance_simulation` merges pointer input into the parameters and runs
//!    `iterations_per_frame` sub-steps
//! 2. `publish_snapshot` copies positions and velocities out for consumers

use bevy::prelude::*;

use super::driver::FluidSimulation;
use super::input::InteractionInput;
use crate::resources::SimParams;

// ==================== Frame Resources ====================

/// Run control for the frame loop.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimulationState {
    pub paused: bool,
    /// Run exactly one frame while paused; cleared once taken.
    pub step_requested: bool,
}

impl SimulationState {
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn request_step(&mut self) {
        self.step_requested = true;
    }
}

/// Read-only copy of the store published after each frame.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct ParticleSnapshot {
    pub positions: Vec<Vec2>,
    pub velocities: Vec<Vec2>,
    /// Driver step count the copy was taken at
    pub frame: u64,
}

// ==================== Systems ====================

/// Step the simulation for one frame.
pub fn advance_simulation(
    simulation: Option<ResMut<FluidSimulation>>,
    params: Res<SimParams>,
    input: Res<InteractionInput>,
    mut state: ResMut<SimulationState>,
) {
    let Some(mut simulation) = simulation else {
        return;
    };
    if state.paused && !state.step_requested {
        return;
    }
    state.step_requested = false;

    let frame_params = input.apply(*params);
    let delta_time = frame_params.sub_step_delta();
    for _ in 0..frame_params.iterations_per_frame {
        if let Err(err) = simulation.step(delta_time, &frame_params) {
            error!("Simulation step rejected: {}", err);
            return;
        }
    }
}

/// Copy the latest state into [`ParticleSnapshot`].
pub fn publish_snapshot(
    simulation: Option<Res<FluidSimulation>>,
    mut snapshot: ResMut<ParticleSnapshot>,
) {
    let Some(simulation) = simulation else {
        return;
    };
    if snapshot.frame == simulation.frame() && snapshot.positions.len() == simulation.len() {
        return;
    }
    snapshot.positions = simulation.positions();
    snapshot.velocities = simulation.velocities();
    snapshot.frame = simulation.frame();
}
