//! Core data structures for the particle simulation.
//!
//! `Particle` uses `#[repr(C)]` and implements `Pod`/`Zeroable` so the store can be
//! handed to a compute substrate as raw bytes. `SimParams` is the frame-scoped
//! parameter block that every kernel reads by reference.

use bevy::math::Vec2;
use bevy::prelude::Resource;
use bytemuck::{Pod, Zeroable};

/// The fundamental particle in the SPH simulation.
///
/// 32 bytes, no padding. `density` holds `(density, near_density)`.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, Default, PartialEq)]
pub struct Particle {
    /// Position (x, y) in world coordinates
    pub position: [f32; 2],
    /// Position advanced by the current velocity, used for neighbor evaluation
    pub predicted_position: [f32; 2],
    /// Velocity (vx, vy)
    pub velocity: [f32; 2],
    /// Density and near density from the last density pass
    pub density: [f32; 2],
}

impl Particle {
    /// Create a particle at rest density zero, predicted position on top of its position.
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self {
            position: position.to_array(),
            predicted_position: position.to_array(),
            velocity: velocity.to_array(),
            density: [0.0; 2],
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::from_array(self.position)
    }

    pub fn predicted_position(&self) -> Vec2 {
        Vec2::from_array(self.predicted_position)
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::from_array(self.velocity)
    }

    /// Density from the degree-2 kernel.
    pub fn density(&self) -> f32 {
        self.density[0]
    }

    /// Density from the steeper near kernel.
    pub fn near_density(&self) -> f32 {
        self.density[1]
    }

    /// True when every field is finite.
    pub fn is_finite(&self) -> bool {
        self.position
            .iter()
            .chain(&self.predicted_position)
            .chain(&self.velocity)
            .chain(&self.density)
            .all(|v| v.is_finite())
    }
}

/// How the kernels find neighbors within the smoothing radius.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NeighborSearch {
    /// Hashed cell grid with `cell_size == smoothing_radius` (3x3 cell scan)
    #[default]
    Grid,
    /// Scan every particle; O(n²), useful as a reference
    BruteForce,
}

/// Grid parameters for spatial indexing (neighbor search)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridParams {
    /// Size of each grid cell (equal to the smoothing radius)
    pub cell_size: f32,
    /// Number of hash buckets (one per particle, at least one)
    pub table_size: u32,
}

impl Default for GridParams {
    fn default() -> Self {
        GridParams::new(1.0, 1)
    }
}

impl GridParams {
    pub fn new(smoothing_radius: f32, particle_count: usize) -> Self {
        Self {
            cell_size: smoothing_radius,
            table_size: particle_count.max(1) as u32,
        }
    }
}

/// Global simulation parameters, re-read every step.
///
/// Changing a field between two steps takes effect on the next step; nothing is
/// cached across steps.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct SimParams {
    /// Time step of one frame
    pub delta_time: f32,
    /// Number of sub-steps per frame; each advances `delta_time / iterations_per_frame`
    pub iterations_per_frame: u32,
    /// Fraction of the step used to compute predicted positions
    pub prediction_factor: f32,
    /// Downward gravity (applied as `(0, -gravity)`)
    pub gravity: f32,
    /// Fraction of velocity kept (sign flipped) after a wall or obstacle bounce
    pub collision_damping: f32,
    /// SPH smoothing radius (h)
    pub smoothing_radius: f32,
    /// Density the pressure response drives towards
    pub target_density: f32,
    /// Stiffness of the pressure response
    pub pressure_multiplier: f32,
    /// Stiffness of the purely repulsive near pressure
    pub near_pressure_multiplier: f32,
    /// Velocity smoothing between neighbors
    pub viscosity_strength: f32,
    /// Particle radius, used as the wall inset and the minimum spawn half-spacing
    pub particle_radius: f32,
    /// Size of the simulation box, centred at the origin
    pub bounds_size: Vec2,
    /// Centre of the static interior obstacle
    pub obstacle_centre: Vec2,
    /// Size of the obstacle; a zero extent disables it
    pub obstacle_size: Vec2,
    /// Pointer position in world coordinates
    pub interaction_point: Vec2,
    /// Pointer influence radius
    pub interaction_radius: f32,
    /// Pointer strength; positive attracts, negative repels, zero is off
    pub interaction_strength: f32,
    /// Neighbor search strategy
    pub neighbor_search: NeighborSearch,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            delta_time: 1.0 / 60.0,
            iterations_per_frame: 3,
            prediction_factor: 1.0,
            gravity: 12.0,
            collision_damping: 0.95,
            smoothing_radius: 0.35,
            target_density: 55.0,
            pressure_multiplier: 500.0,
            near_pressure_multiplier: 18.0,
            viscosity_strength: 0.06,
            particle_radius: 0.05,
            bounds_size: Vec2::new(17.1, 9.0), // matches the drawn pool walls
            obstacle_centre: Vec2::ZERO,
            obstacle_size: Vec2::ZERO,
            interaction_point: Vec2::ZERO,
            interaction_radius: 2.0,
            interaction_strength: 0.0,
            neighbor_search: NeighborSearch::Grid,
        }
    }
}

impl SimParams {
    pub fn with_delta_time(mut self, delta_time: f32) -> Self {
        self.delta_time = delta_time;
        self
    }

    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_bounds(mut self, bounds_size: Vec2) -> Self {
        self.bounds_size = bounds_size;
        self
    }

    pub fn with_smoothing_radius(mut self, smoothing_radius: f32) -> Self {
        self.smoothing_radius = smoothing_radius;
        self
    }

    pub fn with_collision_damping(mut self, collision_damping: f32) -> Self {
        self.collision_damping = collision_damping;
        self
    }

    pub fn with_viscosity(mut self, viscosity_strength: f32) -> Self {
        self.viscosity_strength = viscosity_strength;
        self
    }

    /// Set both pressure stiffnesses.
    pub fn with_pressure(mut self, pressure_multiplier: f32, near_pressure_multiplier: f32) -> Self {
        self.pressure_multiplier = pressure_multiplier;
        self.near_pressure_multiplier = near_pressure_multiplier;
        self
    }

    pub fn with_obstacle(mut self, centre: Vec2, size: Vec2) -> Self {
        self.obstacle_centre = centre;
        self.obstacle_size = size;
        self
    }

    pub fn with_interaction(mut self, point: Vec2, radius: f32, strength: f32) -> Self {
        self.interaction_point = point;
        self.interaction_radius = radius;
        self.interaction_strength = strength;
        self
    }

    pub fn with_neighbor_search(mut self, neighbor_search: NeighborSearch) -> Self {
        self.neighbor_search = neighbor_search;
        self
    }

    /// Half of the box, inset by the particle radius.
    pub fn half_bounds(&self) -> Vec2 {
        self.bounds_size * 0.5 - Vec2::splat(self.particle_radius)
    }

    /// True when the obstacle has a positive extent on both axes.
    pub fn obstacle_active(&self) -> bool {
        self.obstacle_size.x > 0.0 && self.obstacle_size.y > 0.0
    }

    /// True when the pointer exerts a force this step.
    pub fn interaction_active(&self) -> bool {
        self.interaction_strength != 0.0 && self.interaction_radius > 0.0
    }

    /// Time step of a single sub-step.
    pub fn sub_step_delta(&self) -> f32 {
        self.delta_time / self.iterations_per_frame.max(1) as f32
    }

    pub fn grid_params(&self, particle_count: usize) -> GridParams {
        GridParams::new(self.smoothing_radius, particle_count)
    }
}
