//! Simulation driver.
//!
//! Owns the particle store and runs one step as two strictly ordered parallel
//! phases:
//! 1. Predict positions, rebuild the neighbor grid, compute densities
//! 2. Pressure, viscosity, external forces, integration, collisions
//!
//! Each phase collects its results before committing them, which is the barrier
//! between the phases. Callers only ever receive copies of the store.

use bevy::log::{debug, info, warn};
use bevy::math::Vec2;
use bevy::prelude::Resource;

use super::density::{commit_densities, compute_densities, predict_positions};
use super::forces::{commit_updates, compute_updates};
use super::physics_config::{validate, KernelFactors};
use super::scenarios::{spawn_particles, SpawnConfig};
use super::setup::ParticleStore;
use super::spatial::{Neighborhood, SpatialGrid};
use crate::error::{Result, SimulationError};
use crate::resources::{NeighborSearch, Particle, SimParams};

/// Aggregate numbers for logging and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimStats {
    pub particle_count: usize,
    pub mean_density: f32,
    pub max_speed: f32,
    /// `0.5 * Σ |v|²`, unit mass per particle
    pub kinetic_energy: f32,
}

/// The running simulation.
#[derive(Resource, Clone, Debug)]
pub struct FluidSimulation {
    store: ParticleStore,
    grid: SpatialGrid,
    frame: u64,
}

impl FluidSimulation {
    /// Start a run from explicit particles.
    pub fn new(particles: Vec<Particle>, params: &SimParams) -> Result<Self> {
        validate(params)?;
        let store = ParticleStore::new(particles)?;
        info!(
            "Fluid simulation created: {} particles, smoothing radius {}, bounds {}",
            store.len(),
            params.smoothing_radius,
            params.bounds_size
        );
        Ok(Self {
            store,
            grid: SpatialGrid::default(),
            frame: 0,
        })
    }

    /// Start a run from a spawner layout.
    pub fn spawn(spawn: &SpawnConfig, params: &SimParams) -> Result<Self> {
        let particles = spawn_particles(spawn, params)?;
        info!("Spawned {:?} layout centred at {}", spawn.layout, spawn.centre);
        Self::new(particles, params)
    }

    /// Replace the store's contents. The particle count is fixed for the run.
    pub fn set_particles(&mut self, particles: Vec<Particle>) -> Result<()> {
        self.store.upload(&particles)
    }

    /// Replace the store's contents from packed particle records.
    pub fn set_particle_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.store.upload_bytes(bytes)
    }

    /// Run one step of `delta_time` seconds.
    ///
    /// `delta_time` wins over `params.delta_time`. Parameters are checked before
    /// anything is touched, so a rejected step leaves the store unchanged.
    pub fn step(&mut self, delta_time: f32, params: &SimParams) -> Result<()> {
        validate(params)?;
        if !delta_time.is_finite() || delta_time < 0.0 {
            return Err(SimulationError::invalid(format!(
                "delta_time must be a non-negative number, got {delta_time}"
            )));
        }

        let count = self.store.len();
        let kernels = KernelFactors::new(params.smoothing_radius);
        let particles = self.store.as_mut_slice();

        predict_positions(particles, delta_time * params.prediction_factor);

        // Predicted positions stay fixed for the rest of the step, so one grid
        // serves both phases.
        let neighborhood = match params.neighbor_search {
            NeighborSearch::Grid => {
                let predicted: Vec<Vec2> =
                    particles.iter().map(Particle::predicted_position).collect();
                self.grid.rebuild(params.grid_params(count), &predicted);
                Neighborhood::Grid(&self.grid)
            }
            NeighborSearch::BruteForce => Neighborhood::All(count),
        };

        // Phase 1
        let densities = compute_densities(particles, &kernels, &neighborhood);
        commit_densities(particles, densities);

        // Phase 2
        let updates = compute_updates(particles, &kernels, &neighborhood, params, delta_time);
        commit_updates(particles, updates);

        self.frame += 1;
        debug!(
            "Step {}: {} particles, dt {:.5}",
            self.frame, count, delta_time
        );

        let non_finite = self.store.as_slice().iter().position(|p| !p.is_finite());
        if let Some(i) = non_finite {
            warn!("Particle {} became non-finite at step {}", i, self.frame);
        }
        debug_assert!(non_finite.is_none(), "step produced a non-finite particle");
        Ok(())
    }

    /// Run one step and return the post-step snapshot.
    pub fn advance(&mut self, delta_time: f32, params: &SimParams) -> Result<Vec<Particle>> {
        self.step(delta_time, params)?;
        Ok(self.snapshot())
    }

    pub fn particles(&self) -> &[Particle] {
        self.store.as_slice()
    }

    /// Copy of the store after the last completed step.
    pub fn snapshot(&self) -> Vec<Particle> {
        self.store.download()
    }

    /// The store as packed particle records.
    pub fn particle_bytes(&self) -> &[u8] {
        self.store.as_bytes()
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.store.positions()
    }

    pub fn velocities(&self) -> Vec<Vec2> {
        self.store.velocities()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Number of completed steps.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn stats(&self) -> SimStats {
        let particles = self.store.as_slice();
        let count = particles.len();
        let mut density_sum = 0.0;
        let mut max_speed: f32 = 0.0;
        let mut kinetic_energy = 0.0;
        for p in particles {
            let v = p.velocity();
            density_sum += p.density();
            max_speed = max_speed.max(v.length());
            kinetic_energy += 0.5 * v.length_squared();
        }
        SimStats {
            particle_count: count,
            mean_density: if count > 0 { density_sum / count as f32 } else { 0.0 },
            max_speed,
            kinetic_energy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still() -> SimParams {
        SimParams::default().with_gravity(0.0)
    }

    #[test]
    fn empty_run_is_rejected() {
        assert!(FluidSimulation::new(Vec::new(), &still()).is_err());
    }

    #[test]
    fn invalid_params_leave_store_untouched() {
        let mut sim = FluidSimulation::new(
            vec![Particle::new(Vec2::ZERO, Vec2::new(1.0, 0.0))],
            &still(),
        )
        .unwrap();
        let before = sim.snapshot();
        let bad = still().with_smoothing_radius(0.0);
        assert!(sim.advance(0.01, &bad).is_err());
        assert!(sim.advance(-0.01, &still()).is_err());
        assert!(sim.advance(f32::NAN, &still()).is_err());
        assert_eq!(sim.snapshot(), before);
        assert_eq!(sim.frame(), 0);
    }

    #[test]
    fn count_is_fixed_for_the_run() {
        let mut sim = FluidSimulation::new(
            vec![Particle::default(), Particle::new(Vec2::ONE, Vec2::ZERO)],
            &still(),
        )
        .unwrap();
        let err = sim.set_particles(vec![Particle::default()]).unwrap_err();
        assert_eq!(
            err,
            SimulationError::ParticleCountMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn zero_delta_is_a_no_op_on_motion() {
        let mut sim = FluidSimulation::new(
            vec![Particle::new(Vec2::new(0.5, 0.5), Vec2::new(2.0, -1.0))],
            &SimParams::default(),
        )
        .unwrap();
        let after = sim.advance(0.0, &SimParams::default()).unwrap();
        assert_eq!(after[0].position(), Vec2::new(0.5, 0.5));
        assert_eq!(after[0].velocity(), Vec2::new(2.0, -1.0));
        assert_eq!(sim.frame(), 1);
    }

    #[test]
    fn stats_report_motion() {
        let sim = FluidSimulation::new(
            vec![
                Particle::new(Vec2::ZERO, Vec2::new(3.0, 4.0)),
                Particle::new(Vec2::ONE, Vec2::ZERO),
            ],
            &still(),
        )
        .unwrap();
        let stats = sim.stats();
        assert_eq!(stats.particle_count, 2);
        assert_eq!(stats.max_speed, 5.0);
        assert_eq!(stats.kinetic_energy, 12.5);
        assert_eq!(stats.mean_density, 0.0);
    }

    #[test]
    fn step_fills_densities() {
        let params = SimParams::default();
        let mut sim = FluidSimulation::spawn(&SpawnConfig::default(), &params).unwrap();
        sim.step(params.sub_step_delta(), &params).unwrap();
        assert!(sim.particles().iter().all(|p| p.density() > 0.0));
        assert!(sim.stats().mean_density > 0.0);
    }
}
