//! Phase 1: predicted positions and density.
//!
//! Every particle's density and near density are rebuilt from scratch each step
//! from the predicted positions of all particles within the smoothing radius,
//! the particle itself included. Results are collected before any of them is
//! written back, so no particle observes a partially updated neighbor.

use bevy::math::Vec2;
use rayon::prelude::*;

use super::physics_config::KernelFactors;
use super::spatial::Neighborhood;
use crate::resources::Particle;

/// Advance each particle's predicted position by `lookahead` seconds of its velocity.
pub fn predict_positions(particles: &mut [Particle], lookahead: f32) {
    particles.par_iter_mut().for_each(|p| {
        let predicted = p.position() + p.velocity() * lookahead;
        p.predicted_position = predicted.to_array();
    });
}

/// Density and near density of the particle sampled at `origin`.
pub fn density_at(
    origin: Vec2,
    particles: &[Particle],
    kernels: &KernelFactors,
    neighborhood: &Neighborhood,
) -> [f32; 2] {
    let mut density = 0.0;
    let mut near_density = 0.0;

    neighborhood.for_each_candidate(origin, |j| {
        let offset = particles[j].predicted_position() - origin;
        let sqr_dst = offset.dot(offset);
        if sqr_dst > kernels.sqr_radius {
            return;
        }
        let dst = sqr_dst.sqrt();
        density += kernels.density(dst);
        near_density += kernels.near_density(dst);
    });

    [density, near_density]
}

/// Compute every particle's density pair without writing it back.
pub fn compute_densities(
    particles: &[Particle],
    kernels: &KernelFactors,
    neighborhood: &Neighborhood,
) -> Vec<[f32; 2]> {
    particles
        .par_iter()
        .map(|p| density_at(p.predicted_position(), particles, kernels, neighborhood))
        .collect()
}

/// Write a completed density pass back into the store.
pub fn commit_densities(particles: &mut [Particle], densities: Vec<[f32; 2]>) {
    particles
        .par_iter_mut()
        .zip(densities)
        .for_each(|(p, d)| p.density = d);
}
