//! Core state types for the particle simulation.
//!
//! Defines the `Particle` record shared by every layer of the engine and the
//! `Vec2f` vector alias used throughout. A particle's `id` is assigned at load
//! time and never changes, even as the particle migrates between peers.

use nalgebra::Vector2;
pub type Vec2f = Vector2<f32>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub id: i32, // stable identity, unique within a run
    pub mass: f32, // mass
    pub position: Vec2f, // position
    pub velocity: Vec2f, // velocity
}

impl Particle {
    pub fn new(id: i32, mass: f32, position: Vec2f, velocity: Vec2f) -> Self {
        Self {
            id,
            mass,
            position,
            velocity,
        }
    }
}
