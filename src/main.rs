//! SPH Pool Simulation - Main Entry
//!
//! Headless run of the 2D fluid pool: spawns a dam break and logs statistics.
//!
//! Environment:
//! - `SPH_PARTICLES` particle count (default 400)
//! - `SPH_FRAMES` frames to run before exiting (default: run forever)

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use sph_pool::resources::SimParams;
use sph_pool::simulation::scenarios::{config, dam_break};
use sph_pool::simulation::{FluidSimulation, SimulationPlugin};

fn main() {
    let particle_count = env_or("SPH_PARTICLES", config::DEFAULT_PARTICLE_COUNT);
    let frame_limit = std::env::var("SPH_FRAMES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok());

    let params = SimParams::default();
    let spawn = dam_break(particle_count, &params);

    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 60.0,
            ))),
        )
        .add_plugins(LogPlugin::default())
        .add_plugins(SimulationPlugin::new(spawn).with_params(params))
        .insert_resource(FrameCounter {
            frame: 0,
            limit: frame_limit,
        })
        .add_systems(Update, log_frame)
        .run();
}

/// Parse an environment variable, falling back to `default`.
fn env_or(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            // Logging is not installed yet
            eprintln!("Ignoring {key}={value:?}: not a particle count");
            default
        }),
        Err(_) => default,
    }
}

/// Frame counter for logging
#[derive(Resource)]
struct FrameCounter {
    frame: u32,
    limit: Option<u32>,
}

/// Log every N frames, exit once the frame limit is reached
fn log_frame(
    mut counter: ResMut<FrameCounter>,
    simulation: Option<Res<FluidSimulation>>,
    mut exit: EventWriter<AppExit>,
) {
    let Some(simulation) = simulation else {
        // Spawn was rejected; nothing to run
        exit.send(AppExit::error());
        return;
    };
    counter.frame += 1;
    if counter.frame % 60 == 0 {
        let stats = simulation.stats();
        info!(
            "Frame {}: {} particles, mean density {:.2}, max speed {:.2}, kinetic energy {:.2}",
            counter.frame,
            stats.particle_count,
            stats.mean_density,
            stats.max_speed,
            stats.kinetic_energy
        );
    }
    if counter.limit.is_some_and(|limit| counter.frame >= limit) {
        info!("Reached frame limit {}, exiting", counter.frame);
        exit.send(AppExit::Success);
    }
}
