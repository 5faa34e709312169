//! Fixed-step time integration for particles
//!
//! One semi-implicit Euler step per call: the velocity is kicked by the
//! accumulated force first, then the position drifts on the updated velocity.
//! Identity and mass pass through unchanged.

use crate::simulation::states::{Particle, Vec2f};

/// Advance `p` by one step under `force`.
pub fn update_particle(p: &Particle, force: Vec2f, delta_time: f32) -> Particle {
    // Kick: v' = v + (f / m) dt
    let acceleration = force / p.mass;
    let velocity = p.velocity + acceleration * delta_time;

    // Drift: x' = x + v' dt
    let position = p.position + velocity * delta_time;

    Particle {
        id: p.id,
        mass: p.mass,
        position,
        velocity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_force_drifts_on_initial_velocity() {
        let p = Particle::new(3, 2.0, Vec2f::new(1.0, 1.0), Vec2f::new(0.5, -0.25));
        let next = update_particle(&p, Vec2f::zeros(), 2.0);

        assert_eq!(next.id, 3);
        assert_eq!(next.mass, 2.0);
        assert_eq!(next.velocity, p.velocity);
        assert_relative_eq!(next.position.x, 2.0);
        assert_relative_eq!(next.position.y, 0.5);
    }

    #[test]
    fn force_kicks_velocity_before_the_drift() {
        let p = Particle::new(0, 2.0, Vec2f::zeros(), Vec2f::zeros());
        let next = update_particle(&p, Vec2f::new(4.0, 0.0), 0.5);

        // a = f/m = 2, v' = 1, x' = v' * dt = 0.5
        assert_relative_eq!(next.velocity.x, 1.0);
        assert_relative_eq!(next.position.x, 0.5);
        assert_eq!(next.velocity.y, 0.0);
    }
}
