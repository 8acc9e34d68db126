//! Pointer interaction input.
//!
//! The input collaborator (mouse, touch, scripted demo) writes
//! [`InteractionInput`]; the simulation merges it into its parameters once per
//! frame.

use bevy::math::Vec2;
use bevy::prelude::Resource;

use crate::resources::SimParams;

/// Default pointer reach in world units.
pub const DEFAULT_INTERACTION_RADIUS: f32 = 2.0;
/// Default pointer strength; attraction uses `+`, repulsion `-`.
pub const DEFAULT_INTERACTION_STRENGTH: f32 = 90.0;

/// Resource tracking the current pointer interaction.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct InteractionInput {
    /// Pointer position in world coordinates
    pub point: Vec2,
    pub radius: f32,
    /// Signed strength while active. Positive pulls particles in.
    pub strength: f32,
    pub active: bool,
}

impl Default for InteractionInput {
    fn default() -> Self {
        Self {
            point: Vec2::ZERO,
            radius: DEFAULT_INTERACTION_RADIUS,
            strength: DEFAULT_INTERACTION_STRENGTH,
            active: false,
        }
    }
}

impl InteractionInput {
    /// Pull particles towards `point`.
    pub fn attract(&mut self, point: Vec2) {
        self.point = point;
        self.strength = self.strength.abs();
        self.active = true;
    }

    /// Push particles away from `point`.
    pub fn repel(&mut self, point: Vec2) {
        self.point = point;
        self.strength = -self.strength.abs();
        self.active = true;
    }

    pub fn release(&mut self) {
        self.active = false;
    }

    /// Parameters for the next step with this input applied.
    pub fn apply(&self, mut params: SimParams) -> SimParams {
        params.interaction_point = self.point;
        params.interaction_radius = self.radius;
        params.interaction_strength = if self.active { self.strength } else { 0.0 };
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_input_has_no_strength() {
        let params = InteractionInput::default().apply(SimParams::default());
        assert_eq!(params.interaction_strength, 0.0);
        assert!(!params.interaction_active());
    }

    #[test]
    fn attract_then_repel_flips_sign() {
        let mut input = InteractionInput::default();
        input.attract(Vec2::new(1.0, 2.0));
        let pull = input.apply(SimParams::default());
        assert_eq!(pull.interaction_point, Vec2::new(1.0, 2.0));
        assert_eq!(pull.interaction_strength, DEFAULT_INTERACTION_STRENGTH);

        input.repel(Vec2::ZERO);
        let push = input.apply(SimParams::default());
        assert_eq!(push.interaction_strength, -DEFAULT_INTERACTION_STRENGTH);

        input.release();
        assert!(!input.apply(SimParams::default()).interaction_active());
    }
}
