//! Initial particle layouts for the SPH pool.
//!
//! `generate` is the Spawner: it turns a [`SpawnConfig`] into exactly `count`
//! positions and velocities, or rejects the layout before any store exists.
//! The named scenarios below only build configurations.

use std::f32::consts::TAU;

use bevy::log::debug;
use bevy::math::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::physics_config::validate;
use crate::error::{Result, SimulationError};
use crate::resources::{Particle, SimParams};

// ==================== SCENARIO CONFIGS ====================

pub mod config {
    // Spawner defaults
    pub const DEFAULT_PARTICLE_COUNT: usize = 400;
    pub const DEFAULT_SPAWN_WIDTH: f32 = 3.6;
    pub const DEFAULT_SPAWN_HEIGHT: f32 = 2.4;
    pub const DEFAULT_SEED: u64 = 0x5eed;

    /// Slack allowed when comparing spacing against the particle diameter
    pub const SPACING_TOLERANCE: f32 = 1e-6;

    /// Grid spacing that lands close to the default target density
    pub const REST_SPACING: f32 = 0.14;

    // Dam break: width / height of the block
    pub const DAM_ASPECT: f32 = 0.75;
}

// ==================== SPAWN TYPES ====================

/// Arrangement of the initial particles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpawnLayout {
    /// Row-major grid, cell-centred in the spawn region
    #[default]
    Grid,
    /// The grid with every particle offset by a seeded random vector
    Jittered,
}

/// Where and how to place the initial particles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnConfig {
    pub count: usize,
    pub layout: SpawnLayout,
    /// Centre of the spawn region
    pub centre: Vec2,
    /// Size of the spawn region
    pub size: Vec2,
    /// Distance between grid neighbors; derived from `size` when `None`
    pub spacing: Option<f32>,
    /// Velocity given to every particle
    pub initial_velocity: Vec2,
    /// Maximum offset for `SpawnLayout::Jittered`
    pub jitter: f32,
    pub seed: u64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            count: config::DEFAULT_PARTICLE_COUNT,
            layout: SpawnLayout::Grid,
            centre: Vec2::ZERO,
            size: Vec2::new(config::DEFAULT_SPAWN_WIDTH, config::DEFAULT_SPAWN_HEIGHT),
            spacing: None,
            initial_velocity: Vec2::ZERO,
            jitter: 0.0,
            seed: config::DEFAULT_SEED,
        }
    }
}

impl SpawnConfig {
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_region(mut self, centre: Vec2, size: Vec2) -> Self {
        self.centre = centre;
        self.size = size;
        self
    }

    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.spacing = Some(spacing);
        self
    }

    pub fn with_velocity(mut self, initial_velocity: Vec2) -> Self {
        self.initial_velocity = initial_velocity;
        self
    }

    /// Switch to the jittered layout.
    pub fn with_jitter(mut self, jitter: f32, seed: u64) -> Self {
        self.layout = SpawnLayout::Jittered;
        self.jitter = jitter;
        self.seed = seed;
        self
    }

    fn effective_jitter(&self) -> f32 {
        match self.layout {
            SpawnLayout::Grid => 0.0,
            SpawnLayout::Jittered => self.jitter,
        }
    }
}

/// Output of the spawner, one entry per particle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpawnData {
    pub positions: Vec<Vec2>,
    pub velocities: Vec<Vec2>,
}

impl SpawnData {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Build store records with zero density.
    pub fn into_particles(self) -> Vec<Particle> {
        self.positions
            .into_iter()
            .zip(self.velocities)
            .map(|(p, v)| Particle::new(p, v))
            .collect()
    }
}

// ==================== SPAWNER ====================

/// Columns and rows of a grid holding `count` particles in a region of `size`.
fn grid_shape(count: usize, size: Vec2) -> (usize, usize) {
    let aspect = size.x / size.y;
    let nx = ((count as f32 * aspect).sqrt().ceil() as usize).clamp(1, count);
    let ny = count.div_ceil(nx);
    (nx, ny)
}

/// Produce exactly `spawn.count` positions and velocities inside the pool.
pub fn generate(spawn: &SpawnConfig, params: &SimParams) -> Result<SpawnData> {
    validate(params)?;

    let count = spawn.count;
    if count == 0 {
        return Err(SimulationError::invalid("particle count must be at least 1"));
    }
    if !spawn.size.is_finite() || spawn.size.x <= 0.0 || spawn.size.y <= 0.0 {
        return Err(SimulationError::invalid(format!(
            "spawn size must be positive, got {}",
            spawn.size
        )));
    }
    if !spawn.centre.is_finite() || !spawn.initial_velocity.is_finite() {
        return Err(SimulationError::invalid("spawn centre and velocity must be finite"));
    }
    let jitter = spawn.effective_jitter();
    if !jitter.is_finite() || jitter < 0.0 {
        return Err(SimulationError::invalid(format!(
            "jitter must be a non-negative number, got {jitter}"
        )));
    }

    let (nx, ny) = grid_shape(count, spawn.size);
    let spacing = match spawn.spacing {
        Some(s) if s.is_finite() && s > 0.0 => s,
        Some(s) => {
            return Err(SimulationError::invalid(format!(
                "spacing must be positive, got {s}"
            )))
        }
        None => (spawn.size.x / nx as f32).min(spawn.size.y / ny as f32),
    };

    // Closest two particles can get after jitter
    let min_gap = spacing - 2.0 * jitter;
    let diameter = 2.0 * params.particle_radius;
    if min_gap + config::SPACING_TOLERANCE < diameter {
        return Err(SimulationError::invalid(format!(
            "{count} particles need spacing {diameter} but only {min_gap} fits"
        )));
    }

    let origin =
        spawn.centre - Vec2::new((nx - 1) as f32, (ny - 1) as f32) * spacing * 0.5;
    let mut positions: Vec<Vec2> = (0..count)
        .map(|k| origin + Vec2::new((k % nx) as f32, (k / nx) as f32) * spacing)
        .collect();

    if jitter > 0.0 {
        let mut rng = StdRng::seed_from_u64(spawn.seed);
        for p in &mut positions {
            let angle = rng.gen::<f32>() * TAU;
            let radius = rng.gen::<f32>() * jitter;
            *p += Vec2::from_angle(angle) * radius;
        }
    }

    let half = params.half_bounds();
    if let Some(outside) = positions
        .iter()
        .find(|p| p.x.abs() > half.x || p.y.abs() > half.y)
    {
        return Err(SimulationError::invalid(format!(
            "spawn layout does not fit the pool: {outside} lies outside ±{half}"
        )));
    }

    debug!(
        "Spawned {} particles in a {}x{} grid (spacing {:.3}, jitter {:.3})",
        count, nx, ny, spacing, jitter
    );

    Ok(SpawnData {
        positions,
        velocities: vec![spawn.initial_velocity; count],
    })
}

/// Main entry point: spawn store records for `spawn`.
pub fn spawn_particles(spawn: &SpawnConfig, params: &SimParams) -> Result<Vec<Particle>> {
    generate(spawn, params).map(SpawnData::into_particles)
}

// ==================== SCENARIOS ====================

/// Scenario: Dam Break
/// Block of fluid in the bottom-left corner of the pool, released at rest.
pub fn dam_break(count: usize, params: &SimParams) -> SpawnConfig {
    use config::*;
    // With a fixed spacing the region only sets the block's shape
    let size = Vec2::new(DAM_ASPECT, 1.0);
    let (nx, ny) = grid_shape(count.max(1), size);
    let extent = Vec2::new((nx - 1) as f32, (ny - 1) as f32) * REST_SPACING;
    let corner = -params.half_bounds() + Vec2::splat(REST_SPACING);
    SpawnConfig {
        count,
        centre: corner + extent * 0.5,
        size,
        spacing: Some(REST_SPACING),
        ..Default::default()
    }
}

/// Scenario: Centred Block
/// Square block in the middle of the pool, lightly jittered.
pub fn centred_block(count: usize, params: &SimParams) -> SpawnConfig {
    SpawnConfig {
        count,
        size: Vec2::ONE,
        spacing: Some(config::REST_SPACING),
        ..Default::default()
    }
    .with_jitter(params.particle_radius * 0.25, config::DEFAULT_SEED)
}

/// Scenario: Two Particles
/// One particle apart on the x axis, at rest.
pub fn two_particles() -> Vec<Particle> {
    vec![
        Particle::new(Vec2::ZERO, Vec2::ZERO),
        Particle::new(Vec2::new(1.0, 0.0), Vec2::ZERO),
    ]
}
