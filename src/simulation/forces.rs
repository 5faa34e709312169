//! Pairwise short-range force rule
//!
//! The force is a bounded gravity-style attraction that is identically zero
//! at or beyond the cull radius, so only neighbors returned by a radius query
//! can contribute. It is symmetric under exchange of the two particles
//! (Newton's third law), and the total on a particle is a plain sum over its
//! neighbors, so summation order only matters to within float associativity.

use crate::simulation::states::{Particle, Vec2f};

/// Interaction strength shared by every pair.
const GRAVITY: f32 = 6.674e-2;

/// Separations below this floor are treated as the floor itself, keeping the
/// magnitude finite when two particles nearly coincide.
const MIN_SEPARATION: f32 = 1e-3;

/// Force exerted on `target` by `source`.
///
/// Zero when the two are the same particle, when they coincide exactly, or
/// when their separation is at least `cull_radius`.
pub fn compute_force(target: &Particle, source: &Particle, cull_radius: f32) -> Vec2f {
    let d = source.position - target.position;
    let dist2 = d.norm_squared();
    if dist2 == 0.0 {
        // same particle, or an exactly coincident pair
        return Vec2f::zeros();
    }

    let dist = dist2.sqrt();
    if dist >= cull_radius {
        return Vec2f::zeros();
    }

    // Attraction along +d with an inverse-square falloff, floored so close
    // encounters stay finite
    let clamped = dist.max(MIN_SEPARATION);
    let magnitude = GRAVITY * target.mass * source.mass / (clamped * clamped);

    d * (magnitude / dist)
}
