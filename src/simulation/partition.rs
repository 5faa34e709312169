//! Spatial ownership of particles across peers
//!
//! The global bounding box is tiled by a D x D grid with D = floor(sqrt(P));
//! cell (cx, cy) belongs to peer `cy * D + cx`. Peers with rank >= D * D own
//! no cell and run as no-op workers. Cell indices are clamped into the grid,
//! so particles that drift outside the box between redistributions (and
//! non-finite positions) still map to a valid owner.

use crate::simulation::geometry::Box2;
use crate::simulation::states::{Particle, Vec2f};

#[derive(Debug, Clone, Copy)]
pub struct PartitionGrid {
    bounds: Box2,
    dim: usize,
    cell_w: f32,
    cell_h: f32,
}

impl PartitionGrid {
    /// Grid over `bounds` for a run with `peers` participants.
    pub fn new(bounds: Box2, peers: usize) -> Self {
        assert!(peers >= 1, "a run needs at least one peer");
        let dim = (peers as f64).sqrt().floor() as usize;
        Self {
            bounds,
            dim,
            cell_w: (bounds.max.x - bounds.min.x) / dim as f32,
            cell_h: (bounds.max.y - bounds.min.y) / dim as f32,
        }
    }

    /// Cells per axis.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of peers that own a cell; ranks at or above this are idle.
    pub fn cell_count(&self) -> usize {
        self.dim * self.dim
    }

    /// Rank owning the cell that contains `position`. Positions on a cell
    /// boundary belong to the lower-coordinate cell; positions on the upper
    /// boundary of the grid clamp into the last cell rather than off-grid.
    pub fn owner_of(&self, position: Vec2f) -> usize {
        let cx = clamped_cell(position.x - self.bounds.min.x, self.cell_w, self.dim);
        let cy = clamped_cell(position.y - self.bounds.min.y, self.cell_h, self.dim);
        cy * self.dim + cx
    }

    /// Filter `particles` down to the ones `rank` owns.
    pub fn owned_by(&self, rank: usize, particles: &[Particle]) -> Vec<Particle> {
        particles
            .iter()
            .filter(|p| self.owner_of(p.position) == rank)
            .copied()
            .collect()
    }
}

fn clamped_cell(offset: f32, width: f32, dim: usize) -> usize {
    let cell = offset / width;
    if !(cell >= 0.0) {
        // negative offsets (drift below the box), zero-width grids, and NaN
        return 0;
    }
    (cell as usize).min(dim - 1)
}
