//! Boundary and obstacle collision response.
//!
//! Both responses clamp the offending axis onto the surface and reflect that axis'
//! velocity as `v *= -collision_damping`. The clamped coordinate keeps the sign
//! of the position before clamping.

use bevy::math::Vec2;

use crate::resources::SimParams;

/// `1.0` for non-negative values (zero included), `-1.0` otherwise.
#[inline]
fn side_of(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Keep a particle inside the box of `bounds_size` centred at the origin, inset
/// by the particle radius. Each axis is handled independently.
pub fn resolve_boundary(position: &mut Vec2, velocity: &mut Vec2, params: &SimParams) {
    let half = params.half_bounds();

    if position.x.abs() > half.x {
        position.x = half.x * side_of(position.x);
        velocity.x *= -params.collision_damping;
    }
    if position.y.abs() > half.y {
        position.y = half.y * side_of(position.y);
        velocity.y *= -params.collision_damping;
    }
}

/// Push a particle out of the obstacle along the axis of least penetration.
pub fn resolve_obstacle(position: &mut Vec2, velocity: &mut Vec2, params: &SimParams) {
    if !params.obstacle_active() {
        return;
    }
    let half = params.obstacle_size * 0.5;
    let centre = params.obstacle_centre;
    let relative = *position - centre;
    let edge_dst = half - relative.abs();

    if edge_dst.x >= 0.0 && edge_dst.y >= 0.0 {
        if edge_dst.x < edge_dst.y {
            position.x = half.x * side_of(relative.x) + centre.x;
            velocity.x *= -params.collision_damping;
        } else {
            position.y = half.y * side_of(relative.y) + centre.y;
            velocity.y *= -params.collision_damping;
        }
    }
}
