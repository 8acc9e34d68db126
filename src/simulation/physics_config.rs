//! Smoothing kernels, numeric guards and parameter validation.
//!
//! All kernel normalisation factors depend only on the smoothing radius, so they
//! are computed once per step in [`KernelFactors`] and shared by both phases.

use std::f32::consts::PI;

use crate::error::{Result, SimulationError};
use crate::resources::SimParams;

/// Smallest density used as a divisor.
pub const DENSITY_EPSILON: f32 = 1e-6;

/// Below this separation two particles are treated as coincident.
pub const DEGENERATE_DISTANCE: f32 = 1e-9;

/// Interaction strength at which the pointer fully cancels gravity at its centre.
pub const INTERACTION_GRAVITY_CANCEL: f32 = 10.0;

/// Precomputed kernel normalisation factors for one smoothing radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KernelFactors {
    pub radius: f32,
    pub sqr_radius: f32,
    /// 6 / (π h⁴)
    pub spiky_pow2: f32,
    /// 10 / (π h⁵)
    pub spiky_pow3: f32,
    /// 12 / (π h⁴)
    pub spiky_pow2_derivative: f32,
    /// 20 / (π h⁵)
    pub spiky_pow3_derivative: f32,
    /// 4 / (π h⁸)
    pub poly6: f32,
}

impl KernelFactors {
    pub fn new(radius: f32) -> Self {
        let h4 = radius.powi(4);
        let h5 = radius.powi(5);
        let h8 = radius.powi(8);
        Self {
            radius,
            sqr_radius: radius * radius,
            spiky_pow2: 6.0 / (PI * h4),
            spiky_pow3: 10.0 / (PI * h5),
            spiky_pow2_derivative: 12.0 / (PI * h4),
            spiky_pow3_derivative: 20.0 / (PI * h5),
            poly6: 4.0 / (PI * h8),
        }
    }

    /// True when every factor and the peak viscosity term `h⁶` are finite and
    /// non-zero in `f32`.
    pub fn is_representable(&self) -> bool {
        [
            self.spiky_pow2,
            self.spiky_pow3,
            self.spiky_pow2_derivative,
            self.spiky_pow3_derivative,
            self.poly6,
            self.sqr_radius.powi(3),
        ]
        .iter()
        .all(|f| f.is_finite() && *f > 0.0)
    }

    /// Density kernel: `(h - d)² · 6/(πh⁴)`.
    #[inline]
    pub fn density(&self, dst: f32) -> f32 {
        if dst < self.radius {
            let v = self.radius - dst;
            v * v * self.spiky_pow2
        } else {
            0.0
        }
    }

    /// Near-density kernel: `(h - d)² · 10/(πh⁵)`.
    #[inline]
    pub fn near_density(&self, dst: f32) -> f32 {
        if dst < self.radius {
            let v = self.radius - dst;
            v * v * self.spiky_pow3
        } else {
            0.0
        }
    }

    /// Radial derivative of [`Self::density`]; never positive.
    #[inline]
    pub fn density_derivative(&self, dst: f32) -> f32 {
        if dst <= self.radius {
            -(self.radius - dst) * self.spiky_pow2_derivative
        } else {
            0.0
        }
    }

    /// Radial derivative of [`Self::near_density`]; never positive.
    #[inline]
    pub fn near_density_derivative(&self, dst: f32) -> f32 {
        if dst <= self.radius {
            -(self.radius - dst) * self.spiky_pow3_derivative
        } else {
            0.0
        }
    }

    /// Viscosity falloff: `(h² - d²)³ · 4/(πh⁸)`.
    #[inline]
    pub fn viscosity(&self, dst: f32) -> f32 {
        if dst < self.radius {
            let v = self.sqr_radius - dst * dst;
            v * v * v * self.poly6
        } else {
            0.0
        }
    }
}

/// Pressure from density: offset by the target, linear in the multiplier.
#[inline]
pub fn pressure_from_density(density: f32, params: &SimParams) -> f32 {
    (density - params.target_density) * params.pressure_multiplier
}

/// Near pressure has no target offset; it only ever pushes apart.
#[inline]
pub fn near_pressure_from_density(near_density: f32, params: &SimParams) -> f32 {
    near_density * params.near_pressure_multiplier
}

/// Density clamped away from zero before it is used as a divisor.
#[inline]
pub fn guarded_density(density: f32) -> f32 {
    density.max(DENSITY_EPSILON)
}

/// Check every parameter a step depends on.
pub fn validate(params: &SimParams) -> Result<()> {
    let scalars = [
        ("delta_time", params.delta_time),
        ("prediction_factor", params.prediction_factor),
        ("gravity", params.gravity),
        ("collision_damping", params.collision_damping),
        ("smoothing_radius", params.smoothing_radius),
        ("target_density", params.target_density),
        ("pressure_multiplier", params.pressure_multiplier),
        ("near_pressure_multiplier", params.near_pressure_multiplier),
        ("viscosity_strength", params.viscosity_strength),
        ("particle_radius", params.particle_radius),
        ("interaction_radius", params.interaction_radius),
        ("interaction_strength", params.interaction_strength),
    ];
    for (name, value) in scalars {
        if !value.is_finite() {
            return Err(SimulationError::invalid(format!("{name} must be finite, got {value}")));
        }
    }
    let vectors = [
        ("bounds_size", params.bounds_size),
        ("obstacle_centre", params.obstacle_centre),
        ("obstacle_size", params.obstacle_size),
        ("interaction_point", params.interaction_point),
    ];
    for (name, value) in vectors {
        if !value.is_finite() {
            return Err(SimulationError::invalid(format!("{name} must be finite, got {value}")));
        }
    }

    if params.smoothing_radius <= 0.0 {
        return Err(SimulationError::invalid(format!(
            "smoothing_radius must be positive, got {}",
            params.smoothing_radius
        )));
    }
    if !KernelFactors::new(params.smoothing_radius).is_representable() {
        return Err(SimulationError::invalid(format!(
            "smoothing_radius {} is outside the range the kernels can represent",
            params.smoothing_radius
        )));
    }
    if params.particle_radius < 0.0 {
        return Err(SimulationError::invalid("particle_radius must not be negative"));
    }
    if params.bounds_size.x <= 0.0 || params.bounds_size.y <= 0.0 {
        return Err(SimulationError::invalid(format!(
            "bounds_size must be positive, got {}",
            params.bounds_size
        )));
    }
    let half = params.half_bounds();
    if half.x < 0.0 || half.y < 0.0 {
        return Err(SimulationError::invalid(
            "bounds_size is smaller than one particle diameter",
        ));
    }
    if params.delta_time < 0.0 {
        return Err(SimulationError::invalid("delta_time must not be negative"));
    }
    if params.iterations_per_frame == 0 {
        return Err(SimulationError::invalid("iterations_per_frame must be at least 1"));
    }
    if params.interaction_radius < 0.0 {
        return Err(SimulationError::invalid("interaction_radius must not be negative"));
    }
    if params.obstacle_size.x < 0.0 || params.obstacle_size.y < 0.0 {
        return Err(SimulationError::invalid("obstacle_size must not be negative"));
    }
    Ok(())
}

// ==================== PRESETS ====================

/// Water-like pool, the defaults.
pub fn water() -> SimParams {
    SimParams::default()
}

/// Thick, slow fluid.
pub fn viscous() -> SimParams {
    SimParams {
        viscosity_strength: 0.5,
        pressure_multiplier: 300.0,
        collision_damping: 0.5,
        ..SimParams::default()
    }
}

/// Weightless fluid that only reacts to pressure and the pointer.
pub fn zero_g() -> SimParams {
    SimParams {
        gravity: 0.0,
        ..SimParams::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernels_vanish_at_radius() {
        let k = KernelFactors::new(1.0);
        assert_eq!(k.density(1.0), 0.0);
        assert_eq!(k.near_density(1.0), 0.0);
        assert_eq!(k.viscosity(1.0), 0.0);
        assert_eq!(k.density_derivative(1.0), 0.0);
        assert_eq!(k.density(2.5), 0.0);
    }

    #[test]
    fn kernels_peak_at_centre() {
        let k = KernelFactors::new(2.0);
        assert!(k.density(0.0) > k.density(0.5));
        assert!(k.near_density(0.0) > k.near_density(0.5));
        assert!(k.viscosity(0.0) > k.viscosity(0.5));
        assert!((k.density(0.0) - 4.0 * 6.0 / (PI * 16.0)).abs() < 1e-6);
    }

    #[test]
    fn derivatives_are_non_positive() {
        let k = KernelFactors::new(0.35);
        for i in 0..=35 {
            let d = i as f32 * 0.01;
            assert!(k.density_derivative(d) <= 0.0);
            assert!(k.near_density_derivative(d) <= 0.0);
        }
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let k = KernelFactors::new(1.0);
        let d = 0.4;
        let step = 1e-3;
        let numeric = (k.density(d + step) - k.density(d - step)) / (2.0 * step);
        assert!((numeric - k.density_derivative(d)).abs() < 1e-2);
    }

    #[test]
    fn near_pressure_is_repulsive_only() {
        let params = SimParams::default();
        assert!(near_pressure_from_density(0.0, &params) == 0.0);
        assert!(near_pressure_from_density(3.0, &params) > 0.0);
        assert!(pressure_from_density(0.0, &params) < 0.0);
    }

    #[test]
    fn guard_keeps_divisor_positive() {
        assert_eq!(guarded_density(0.0), DENSITY_EPSILON);
        assert_eq!(guarded_density(-1.0), DENSITY_EPSILON);
        assert_eq!(guarded_density(2.0), 2.0);
    }

    #[test]
    fn presets_are_valid() {
        for params in [water(), viscous(), zero_g()] {
            assert!(validate(&params).is_ok());
        }
    }

    #[test]
    fn validate_rejects_bad_radius() {
        let params = SimParams::default().with_smoothing_radius(0.0);
        assert!(matches!(validate(&params), Err(SimulationError::InvalidConfiguration(_))));
        let params = SimParams::default().with_smoothing_radius(-1.0);
        assert!(validate(&params).is_err());
    }

    #[test]
    fn validate_rejects_unrepresentable_radius() {
        for radius in [1e-6, 1e7] {
            assert!(!KernelFactors::new(radius).is_representable());
            let params = SimParams::default().with_smoothing_radius(radius);
            assert!(matches!(validate(&params), Err(SimulationError::InvalidConfiguration(_))));
        }
        for radius in [0.01, 0.35, 50.0] {
            assert!(KernelFactors::new(radius).is_representable());
        }
    }

    #[test]
    fn validate_rejects_non_finite() {
        let params = SimParams::default().with_gravity(f32::NAN);
        assert!(validate(&params).is_err());
        let params = SimParams::default().with_bounds(bevy::math::Vec2::new(f32::INFINITY, 1.0));
        assert!(validate(&params).is_err());
    }

    #[test]
    fn validate_rejects_tiny_bounds() {
        let params = SimParams::default().with_bounds(bevy::math::Vec2::new(0.05, 5.0));
        assert!(validate(&params).is_err());
    }
}
