//! Numerical parameters and protocol constants for a run
//!
//! `StepParameters` holds the per-run physics settings:
//! - interaction cutoff radius (`cull_radius`),
//! - integrator step size (`delta_time`)

#[derive(Debug, Clone, Copy)]
pub struct StepParameters {
    pub cull_radius: f32, // pairwise force is zero at or beyond this distance
    pub delta_time: f32, // integrator step size
}

/// Benchmark presets derived from the extent of the simulated space.
pub fn benchmark_step_params(space_size: f32) -> StepParameters {
    StepParameters {
        cull_radius: space_size / 4.0,
        delta_time: 0.2,
    }
}

/// The peer that performs input load and output save.
pub const COORDINATOR: usize = 0;

/// How often ownership is recomputed from current positions.
pub const DEFAULT_REDISTRIBUTE_EVERY: u32 = 8;

/// Tag of iteration 0's halo messages; iteration i uses `HALO_TAG_BASE + i`.
pub const HALO_TAG_BASE: u32 = 0;
