//! # Quadtree spatial index
//!
//! A region quadtree over a particle set, answering "all particles within
//! `radius` of `position`" queries. The tree is rebuilt from scratch at the
//! start of every iteration from the local-plus-halo working set and discarded
//! at the end, so construction cost matters as much as query cost.
//!
//! ## Layout
//!
//! Nodes live in a flat arena (`Vec<Node>`) addressed by index; a node is
//! either a leaf holding up to [`LEAF_CAPACITY`] particles or an internal node
//! with exactly four children splitting its box at the midpoint of each axis:
//!
//! ```text
//!  x0, y0 --------------- x1, y0
//!    |           |           |
//!    |children[0]|children[1]|
//!    | ----------+---------- |
//!    |children[2]|children[3]|
//!    |           |           |
//!  x0, y1 --------------- x1, y1
//! ```
//!
//! where x0 < x1 and y0 < y1. Empty children are real (empty) leaves, so the
//! branching factor is always four and traversal stays uniform. Node boxes are
//! not stored; both build and query re-derive child boxes on the way down.

use crate::simulation::geometry::{box_point_distance, Box2};
use crate::simulation::states::{Particle, Vec2f};

/// Maximum number of particles a node may hold before it is subdivided.
pub const LEAF_CAPACITY: usize = 256;

/// Subdivision stops below this depth even over capacity, so degenerate
/// inputs (many particles sharing one position) terminate.
const MAX_DEPTH: u32 = 32;

enum Node {
    Leaf { particles: Vec<Particle> },
    Internal { children: [usize; 4] },
}

/// A quadtree built over a snapshot of particles.
pub struct QuadTree {
    nodes: Vec<Node>,
    root: usize,
    bounds: Box2,
    len: usize,
}

impl QuadTree {
    /// Build a tree over `particles`. The root box is the bounding box of the
    /// input. A call receiving no particles yields a single empty leaf whose
    /// box is ill-defined; such a tree must not be queried.
    pub fn build(particles: &[Particle]) -> Self {
        let bounds = Box2::of_particles(particles);
        let mut nodes = Vec::new();
        let root = build_node(&mut nodes, particles.to_vec(), bounds.min, bounds.max, 0);
        Self {
            nodes,
            root,
            bounds,
            len: particles.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bounding box of the build input.
    pub fn bounds(&self) -> Box2 {
        self.bounds
    }

    /// Collect into `out` every particle strictly closer than `radius` to
    /// `position`. `out` is cleared first. The query position's own particle
    /// is included when present; the force rule returns zero for it.
    pub fn get_particles(&self, out: &mut Vec<Particle>, position: Vec2f, radius: f32) {
        assert!(!self.is_empty(), "radius query on an empty quadtree");
        out.clear();
        self.query_node(self.root, self.bounds.min, self.bounds.max, position, radius, out);
    }

    fn query_node(
        &self,
        node: usize,
        bmin: Vec2f,
        bmax: Vec2f,
        position: Vec2f,
        radius: f32,
        out: &mut Vec<Particle>,
    ) {
        match &self.nodes[node] {
            Node::Leaf { particles } => {
                for p in particles {
                    if (position - p.position).norm() < radius {
                        out.push(*p);
                    }
                }
            }
            Node::Internal { children } => {
                let pivot = (bmin + bmax) * 0.5;
                let half = (bmax - bmin) * 0.5;
                for (i, &child) in children.iter().enumerate() {
                    let child_min = Vec2f::new(
                        if i & 1 == 1 { pivot.x } else { bmin.x },
                        if (i >> 1) & 1 == 1 { pivot.y } else { bmin.y },
                    );
                    let child_max = child_min + half;
                    if box_point_distance(child_min, child_max, position) <= radius {
                        self.query_node(child, child_min, child_max, position, radius, out);
                    }
                }
            }
        }
    }
}

fn build_node(
    nodes: &mut Vec<Node>,
    particles: Vec<Particle>,
    bmin: Vec2f,
    bmax: Vec2f,
    depth: u32,
) -> usize {
    if particles.len() <= LEAF_CAPACITY || depth >= MAX_DEPTH {
        nodes.push(Node::Leaf { particles });
        return nodes.len() - 1;
    }

    let pivot = (bmin + bmax) * 0.5;
    let half = (bmax - bmin) * 0.5;

    // Bucket by quadrant. A coordinate exactly on the split line goes to the
    // lower-index child on that axis.
    let mut buckets: [Vec<Particle>; 4] = [Vec::new(), Vec::new(), Vec::new(), Vec::new()];
    for p in particles {
        let xi = usize::from(p.position.x > pivot.x);
        let yi = usize::from(p.position.y > pivot.y);
        buckets[yi * 2 + xi].push(p);
    }

    let mut children = [0usize; 4];
    for (i, bucket) in buckets.into_iter().enumerate() {
        let child_min = Vec2f::new(
            if i & 1 == 1 { pivot.x } else { bmin.x },
            if (i >> 1) & 1 == 1 { pivot.y } else { bmin.y },
        );
        let child_max = child_min + half;
        children[i] = build_node(nodes, bucket, child_min, child_max, depth + 1);
    }

    nodes.push(Node::Internal { children });
    nodes.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    // deterministic positions, no rand needed
    fn scatter(n: usize) -> Vec<Particle> {
        (0..n)
            .map(|i| {
                let t = i as f32;
                Particle::new(
                    i as i32,
                    1.0,
                    Vec2f::new((t * 0.37).sin() * 50.0, (t * 0.13).cos() * 50.0),
                    Vec2f::zeros(),
                )
            })
            .collect()
    }

    fn brute_force(particles: &[Particle], position: Vec2f, radius: f32) -> Vec<i32> {
        let mut ids: Vec<i32> = particles
            .iter()
            .filter(|p| (position - p.position).norm() < radius)
            .map(|p| p.id)
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn small_input_is_a_single_leaf() {
        let particles = scatter(LEAF_CAPACITY);
        let tree = QuadTree::build(&particles);
        assert_eq!(tree.len(), LEAF_CAPACITY);
        assert_eq!(tree.nodes.len(), 1);
    }

    #[test]
    fn query_matches_brute_force() {
        let particles = scatter(2_000);
        let tree = QuadTree::build(&particles);

        let mut out = Vec::new();
        for &radius in &[0.5, 5.0, 30.0, 200.0] {
            for probe in particles.iter().step_by(97) {
                tree.get_particles(&mut out, probe.position, radius);
                let mut got: Vec<i32> = out.iter().map(|p| p.id).collect();
                got.sort();
                assert_eq!(got, brute_force(&particles, probe.position, radius));
            }
        }
    }

    #[test]
    fn leaves_respect_capacity_and_containment() {
        let particles = scatter(3_000);
        let tree = QuadTree::build(&particles);

        // Walk the arena re-deriving boxes the way build does; midpoint
        // arithmetic can wobble an edge by an ulp, hence the tolerance.
        fn walk(tree: &QuadTree, node: usize, bmin: Vec2f, bmax: Vec2f, total: &mut usize) {
            const TOL: f32 = 1e-3;
            match &tree.nodes[node] {
                Node::Leaf { particles } => {
                    assert!(particles.len() <= LEAF_CAPACITY);
                    for p in particles {
                        assert!(p.position.x >= bmin.x - TOL && p.position.x <= bmax.x + TOL);
                        assert!(p.position.y >= bmin.y - TOL && p.position.y <= bmax.y + TOL);
                    }
                    *total += particles.len();
                }
                Node::Internal { children } => {
                    let pivot = (bmin + bmax) * 0.5;
                    let half = (bmax - bmin) * 0.5;
                    for (i, &child) in children.iter().enumerate() {
                        let child_min = Vec2f::new(
                            if i & 1 == 1 { pivot.x } else { bmin.x },
                            if (i >> 1) & 1 == 1 { pivot.y } else { bmin.y },
                        );
                        walk(tree, child, child_min, child_min + half, total);
                    }
                }
            }
        }

        let bounds = tree.bounds();
        let mut total = 0;
        walk(&tree, tree.root, bounds.min, bounds.max, &mut total);
        assert_eq!(total, particles.len());
    }

    #[test]
    fn query_radius_is_strict() {
        let particles = vec![
            Particle::new(0, 1.0, Vec2f::new(0.0, 0.0), Vec2f::zeros()),
            Particle::new(1, 1.0, Vec2f::new(1.0, 0.0), Vec2f::zeros()),
        ];
        let tree = QuadTree::build(&particles);
        let mut out = Vec::new();
        tree.get_particles(&mut out, Vec2f::new(0.0, 0.0), 1.0);
        // exactly at distance 1.0 is excluded
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 0);
    }

    #[test]
    fn split_line_particles_go_to_the_lower_child() {
        // Root box is [0,2]x[0,2], pivot at (1,1). Over-fill so the root
        // subdivides, with a probe particle exactly on the pivot.
        let mut particles = vec![
            Particle::new(-1, 1.0, Vec2f::new(1.0, 1.0), Vec2f::zeros()),
            Particle::new(-2, 1.0, Vec2f::new(0.0, 0.0), Vec2f::zeros()),
            Particle::new(-3, 1.0, Vec2f::new(2.0, 2.0), Vec2f::zeros()),
        ];
        for i in 0..LEAF_CAPACITY {
            let t = i as f32 / LEAF_CAPACITY as f32;
            particles.push(Particle::new(
                i as i32,
                1.0,
                Vec2f::new(0.1 + 1.8 * t, 1.9 - 1.8 * t),
                Vec2f::zeros(),
            ));
        }
        let tree = QuadTree::build(&particles);
        assert!(tree.nodes.len() > 1, "expected the root to subdivide");

        // the pivot particle must still be found, exactly once
        let mut out = Vec::new();
        tree.get_particles(&mut out, Vec2f::new(1.0, 1.0), 0.05);
        let hits = out.iter().filter(|p| p.id == -1).count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn collinear_input_terminates_and_answers() {
        // all particles on the line y = 3, well over the leaf capacity
        let particles: Vec<Particle> = (0..2 * LEAF_CAPACITY)
            .map(|i| Particle::new(i as i32, 1.0, Vec2f::new(i as f32, 3.0), Vec2f::zeros()))
            .collect();
        let tree = QuadTree::build(&particles);

        let mut out = Vec::new();
        tree.get_particles(&mut out, Vec2f::new(5.0, 3.0), 1.5);
        let mut got: Vec<i32> = out.iter().map(|p| p.id).collect();
        got.sort();
        assert_eq!(got, vec![4, 5, 6]);
    }

    #[test]
    fn coincident_particles_terminate_via_depth_cap() {
        let particles: Vec<Particle> = (0..LEAF_CAPACITY + 10)
            .map(|i| Particle::new(i as i32, 1.0, Vec2f::new(7.0, -2.0), Vec2f::zeros()))
            .collect();
        let tree = QuadTree::build(&particles);
        let mut out = Vec::new();
        tree.get_particles(&mut out, Vec2f::new(7.0, -2.0), 0.1);
        assert_eq!(out.len(), LEAF_CAPACITY + 10);
    }

    #[test]
    #[should_panic(expected = "empty quadtree")]
    fn querying_an_empty_tree_panics() {
        let tree = QuadTree::build(&[]);
        let mut out = Vec::new();
        tree.get_particles(&mut out, Vec2f::zeros(), 1.0);
    }
}
