//! Error types for the SPH simulation.

use thiserror::Error;

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimulationError>;

/// Errors surfaced to callers of the simulation.
///
/// Near-coincident neighbors and near-zero densities are recovered inside the
/// kernels and never show up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Rejected particle count, parameters or spawn layout.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Uploaded bytes do not form a whole, aligned number of particle records.
    #[error("Buffer of {len} bytes is not a valid particle buffer (stride {stride})")]
    BufferLayout { len: usize, stride: usize },

    /// The particle count is fixed for the lifetime of a run.
    #[error("Particle count mismatch: expected {expected}, got {actual}")]
    ParticleCountMismatch { expected: usize, actual: usize },
}

impl SimulationError {
    /// Create an invalid configuration error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
