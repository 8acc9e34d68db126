//! Particle storage for the simulation.
//!
//! The store owns the authoritative particle array. Its length is fixed when the
//! store is created; uploads must match it. Bytes in and out use the packed
//! `Particle` layout so the same buffer can be handed to another compute
//! substrate unchanged.

use std::mem::size_of;

use bevy::log::debug;
use bevy::math::Vec2;

use crate::error::{Result, SimulationError};
use crate::resources::Particle;

/// Bytes per particle record.
pub const PARTICLE_STRIDE: usize = size_of::<Particle>();

/// Fixed-size, contiguous particle array.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    /// Take ownership of `particles`. The count may not be zero.
    pub fn new(particles: Vec<Particle>) -> Result<Self> {
        if particles.is_empty() {
            return Err(SimulationError::invalid("particle count must be at least 1"));
        }
        if let Some(i) = particles.iter().position(|p| !p.is_finite()) {
            return Err(SimulationError::invalid(format!(
                "particle {i} has a non-finite field"
            )));
        }
        debug!("Particle store created with {} particles", particles.len());
        Ok(Self { particles })
    }

    /// Build a store from packed particle records.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::new(decode(bytes)?)
    }

    /// Replace every particle; the count must not change.
    pub fn upload(&mut self, particles: &[Particle]) -> Result<()> {
        if particles.len() != self.particles.len() {
            return Err(SimulationError::ParticleCountMismatch {
                expected: self.particles.len(),
                actual: particles.len(),
            });
        }
        if let Some(i) = particles.iter().position(|p| !p.is_finite()) {
            return Err(SimulationError::invalid(format!(
                "particle {i} has a non-finite field"
            )));
        }
        self.particles.copy_from_slice(particles);
        Ok(())
    }

    /// Replace every particle from packed records.
    pub fn upload_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let particles = decode(bytes)?;
        self.upload(&particles)
    }

    /// Copy of the current particles.
    pub fn download(&self) -> Vec<Particle> {
        self.particles.clone()
    }

    /// The store viewed as packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.particles)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.particles.iter().map(Particle::position).collect()
    }

    pub fn velocities(&self) -> Vec<Vec2> {
        self.particles.iter().map(Particle::velocity).collect()
    }
}

/// Decode packed records. The input may be arbitrarily aligned.
fn decode(bytes: &[u8]) -> Result<Vec<Particle>> {
    if bytes.len() % PARTICLE_STRIDE != 0 {
        return Err(SimulationError::BufferLayout {
            len: bytes.len(),
            stride: PARTICLE_STRIDE,
        });
    }
    bytes
        .chunks_exact(PARTICLE_STRIDE)
        .map(|chunk| {
            bytemuck::try_pod_read_unaligned::<Particle>(chunk).map_err(|_| {
                SimulationError::BufferLayout {
                    len: bytes.len(),
                    stride: PARTICLE_STRIDE,
                }
            })
        })
        .collect()
}
