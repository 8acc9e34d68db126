//! Phase 2: pressure, viscosity, external forces, integration and collisions.
//!
//! Runs only after every density of phase 1 has been committed. Each particle
//! reads its neighbors' predicted positions, densities and velocities, and the
//! new position/velocity of every particle is collected before any is written.

use bevy::math::Vec2;
use rayon::prelude::*;

use super::collision::{resolve_boundary, resolve_obstacle};
use super::physics_config::{
    guarded_density, near_pressure_from_density, pressure_from_density, KernelFactors,
    DEGENERATE_DISTANCE, INTERACTION_GRAVITY_CANCEL,
};
use super::spatial::Neighborhood;
use crate::resources::{Particle, SimParams};

/// New authoritative state of one particle after phase 2.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleUpdate {
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Unit direction from `i` towards `j`. Coincident particles get a fixed axis
/// whose sign depends on index order, so a pair is always pushed apart and the
/// same input always gives the same direction.
#[inline]
fn direction_to(offset: Vec2, dst: f32, i: usize, j: usize) -> Vec2 {
    if dst > DEGENERATE_DISTANCE {
        offset / dst
    } else if j > i {
        Vec2::X
    } else {
        Vec2::NEG_X
    }
}

/// Pressure acceleration on particle `i`.
pub fn pressure_acceleration(
    i: usize,
    particles: &[Particle],
    kernels: &KernelFactors,
    neighborhood: &Neighborhood,
    params: &SimParams,
) -> Vec2 {
    let origin = particles[i].predicted_position();
    let density = particles[i].density();
    let pressure = pressure_from_density(density, params);
    let near_pressure = near_pressure_from_density(particles[i].near_density(), params);

    let mut force = Vec2::ZERO;
    neighborhood.for_each_candidate(origin, |j| {
        if j == i {
            return;
        }
        let neighbor = &particles[j];
        let offset = neighbor.predicted_position() - origin;
        let sqr_dst = offset.dot(offset);
        if sqr_dst > kernels.sqr_radius {
            return;
        }
        let dst = sqr_dst.sqrt();
        let dir = direction_to(offset, dst, i, j);

        let shared_pressure = (pressure + pressure_from_density(neighbor.density(), params)) * 0.5;
        let shared_near_pressure = (near_pressure
            + near_pressure_from_density(neighbor.near_density(), params))
            * 0.5;

        force += dir * kernels.density_derivative(dst) * shared_pressure
            / guarded_density(neighbor.density());
        force += dir * kernels.near_density_derivative(dst) * shared_near_pressure
            / guarded_density(neighbor.near_density());
    });

    force / guarded_density(density)
}

/// Viscosity acceleration on particle `i`: neighbors pull its velocity towards theirs.
pub fn viscosity_acceleration(
    i: usize,
    particles: &[Particle],
    kernels: &KernelFactors,
    neighborhood: &Neighborhood,
    params: &SimParams,
) -> Vec2 {
    if params.viscosity_strength == 0.0 {
        return Vec2::ZERO;
    }
    let origin = particles[i].predicted_position();
    let velocity = particles[i].velocity();

    let mut force = Vec2::ZERO;
    neighborhood.for_each_candidate(origin, |j| {
        if j == i {
            return;
        }
        let offset = particles[j].predicted_position() - origin;
        let sqr_dst = offset.dot(offset);
        if sqr_dst > kernels.sqr_radius {
            return;
        }
        let dst = sqr_dst.sqrt();
        force += (particles[j].velocity() - velocity) * kernels.viscosity(dst);
    });

    force * params.viscosity_strength
}

/// Gravity plus the pointer's pull or push on a particle at `position`.
pub fn external_acceleration(position: Vec2, velocity: Vec2, params: &SimParams) -> Vec2 {
    let gravity = Vec2::new(0.0, -params.gravity);

    if !params.interaction_active() {
        return gravity;
    }
    let offset = params.interaction_point - position;
    let sqr_dst = offset.dot(offset);
    if sqr_dst >= params.interaction_radius * params.interaction_radius {
        return gravity;
    }

    let dst = sqr_dst.sqrt();
    let edge_t = dst / params.interaction_radius;
    let centre_t = 1.0 - edge_t;
    let dir_to_centre = if dst > DEGENERATE_DISTANCE {
        offset / dst
    } else {
        Vec2::ZERO
    };

    let strength = params.interaction_strength;
    let gravity_weight =
        1.0 - centre_t * (strength / INTERACTION_GRAVITY_CANCEL).clamp(0.0, 1.0);
    gravity * gravity_weight + dir_to_centre * centre_t * strength - velocity * centre_t
}

/// Integrate particle `i` over `delta_time` and resolve its collisions.
pub fn integrate(
    i: usize,
    particles: &[Particle],
    kernels: &KernelFactors,
    neighborhood: &Neighborhood,
    params: &SimParams,
    delta_time: f32,
) -> ParticleUpdate {
    let particle = &particles[i];
    let mut velocity = particle.velocity();

    let acceleration = pressure_acceleration(i, particles, kernels, neighborhood, params)
        + viscosity_acceleration(i, particles, kernels, neighborhood, params)
        + external_acceleration(particle.position(), velocity, params);

    velocity += acceleration * delta_time;
    let mut position = particle.position() + velocity * delta_time;

    resolve_boundary(&mut position, &mut velocity, params);
    resolve_obstacle(&mut position, &mut velocity, params);

    ParticleUpdate { position, velocity }
}

/// Compute every particle's phase 2 update without writing any of them back.
pub fn compute_updates(
    particles: &[Particle],
    kernels: &KernelFactors,
    neighborhood: &Neighborhood,
    params: &SimParams,
    delta_time: f32,
) -> Vec<ParticleUpdate> {
    (0..particles.len())
        .into_par_iter()
        .map(|i| integrate(i, particles, kernels, neighborhood, params, delta_time))
        .collect()
}

/// Write a completed phase 2 back into the store.
pub fn commit_updates(particles: &mut [Particle], updates: Vec<ParticleUpdate>) {
    particles
        .par_iter_mut()
        .zip(updates)
        .for_each(|(p, update)| {
            p.position = update.position.to_array();
            p.velocity = update.velocity.to_array();
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::density::{commit_densities, compute_densities};

    fn still_params() -> SimParams {
        SimParams {
            gravity: 0.0,
            viscosity_strength: 0.0,
            target_density: 0.0,
            bounds_size: Vec2::splat(100.0),
            ..Default::default()
        }
    }

    fn with_densities(mut particles: Vec<Particle>, kernels: &KernelFactors) -> Vec<Particle> {
        let n = particles.len();
        let d = compute_densities(&particles, kernels, &Neighborhood::All(n));
        commit_densities(&mut particles, d);
        particles
    }

    #[test]
    fn pair_pressure_is_equal_and_opposite() {
        let params = still_params().with_smoothing_radius(2.0);
        let kernels = KernelFactors::new(params.smoothing_radius);
        let particles = with_densities(
            vec![
                Particle::new(Vec2::ZERO, Vec2::ZERO),
                Particle::new(Vec2::new(1.0, 0.0), Vec2::ZERO),
            ],
            &kernels,
        );
        let all = Neighborhood::All(2);
        let a = pressure_acceleration(0, &particles, &kernels, &all, &params);
        let b = pressure_acceleration(1, &particles, &kernels, &all, &params);
        assert!(a.x < 0.0, "left particle pushed left, got {a}");
        assert!(b.x > 0.0, "right particle pushed right, got {b}");
        assert_eq!(a.x, -b.x);
        assert_eq!(a.y, 0.0);
    }

    #[test]
    fn coincident_pair_separates_deterministically() {
        let params = still_params();
        let kernels = KernelFactors::new(params.smoothing_radius);
        let particles = with_densities(
            vec![
                Particle::new(Vec2::ONE, Vec2::ZERO),
                Particle::new(Vec2::ONE, Vec2::ZERO),
            ],
            &kernels,
        );
        let all = Neighborhood::All(2);
        let a = pressure_acceleration(0, &particles, &kernels, &all, &params);
        let b = pressure_acceleration(1, &particles, &kernels, &all, &params);
        assert!(a.is_finite() && b.is_finite());
        assert!(a.x < 0.0 && b.x > 0.0);
        assert_eq!(a, pressure_acceleration(0, &particles, &kernels, &all, &params));
    }

    #[test]
    fn zero_density_neighbor_stays_finite() {
        let params = still_params();
        let kernels = KernelFactors::new(params.smoothing_radius);
        // Densities deliberately left at zero
        let particles = vec![
            Particle::new(Vec2::ZERO, Vec2::ZERO),
            Particle::new(Vec2::new(0.1, 0.0), Vec2::ZERO),
        ];
        let all = Neighborhood::All(2);
        let update = integrate(0, &particles, &kernels, &all, &params, 0.01);
        assert!(update.position.is_finite());
        assert!(update.velocity.is_finite());
    }

    #[test]
    fn viscosity_pulls_towards_neighbor_velocity() {
        let params = still_params().with_viscosity(1.0);
        let kernels = KernelFactors::new(params.smoothing_radius);
        let particles = vec![
            Particle::new(Vec2::ZERO, Vec2::ZERO),
            Particle::new(Vec2::new(0.1, 0.0), Vec2::new(0.0, 2.0)),
        ];
        let all = Neighborhood::All(2);
        let a = viscosity_acceleration(0, &particles, &kernels, &all, &params);
        let b = viscosity_acceleration(1, &particles, &kernels, &all, &params);
        assert!(a.y > 0.0);
        assert!(b.y < 0.0);
        assert!((a.y + b.y).abs() < 1e-4);
    }

    #[test]
    fn gravity_only_without_pointer() {
        let params = SimParams::default().with_gravity(9.0);
        let acc = external_acceleration(Vec2::ZERO, Vec2::new(1.0, 1.0), &params);
        assert_eq!(acc, Vec2::new(0.0, -9.0));
    }

    #[test]
    fn pointer_attracts_and_repels() {
        let base = SimParams::default().with_gravity(0.0);
        let pull = base.with_interaction(Vec2::new(1.0, 0.0), 2.0, 50.0);
        let push = base.with_interaction(Vec2::new(1.0, 0.0), 2.0, -50.0);
        assert!(external_acceleration(Vec2::ZERO, Vec2::ZERO, &pull).x > 0.0);
        assert!(external_acceleration(Vec2::ZERO, Vec2::ZERO, &push).x < 0.0);
    }

    #[test]
    fn pointer_out_of_reach_is_ignored() {
        let params = SimParams::default().with_interaction(Vec2::new(10.0, 0.0), 2.0, 50.0);
        let acc = external_acceleration(Vec2::ZERO, Vec2::ZERO, &params);
        assert_eq!(acc, Vec2::new(0.0, -params.gravity));
    }

    #[test]
    fn pointer_on_top_of_particle_stays_finite() {
        let params = SimParams::default().with_interaction(Vec2::ZERO, 2.0, 50.0);
        let acc = external_acceleration(Vec2::ZERO, Vec2::new(1.0, 0.0), &params);
        assert!(acc.is_finite());
        // Strong pull cancels gravity at the centre and damps motion
        assert_eq!(acc, Vec2::new(-1.0, 0.0));
    }
}
