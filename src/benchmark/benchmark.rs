use std::time::Instant;

use crate::simulation::driver::{run_simulation, RunSettings};
use crate::simulation::params::StepParameters;
use crate::simulation::quadtree::QuadTree;
use crate::simulation::states::{Particle, Vec2f};
use crate::transport::local::LocalCluster;
use crate::transport::Transport;

/// Helper to build a particle cloud of size `n`
fn make_particles(n: usize) -> Vec<Particle> {
    let mut particles = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f32;
        // deterministic positions, no rand needed
        let position = Vec2f::new((t * 0.37).sin() * 500.0, (t * 0.13).cos() * 500.0);
        let velocity = Vec2f::new((t * 0.07).sin(), (t * 0.11).cos());
        particles.push(Particle::new(i as i32, 1.0, position, velocity));
    }
    particles
}

pub fn bench_quadtree() {
    // Different cloud sizes to test
    let ns = [1_000, 4_000, 16_000, 64_000, 256_000];
    let radius = 25.0;

    for n in ns {
        let particles = make_particles(n);

        // Warm up
        let _ = QuadTree::build(&particles);

        // Time the build
        let t0 = Instant::now();
        let tree = QuadTree::build(&particles);
        let dt_build = t0.elapsed().as_secs_f64();

        // Time one query per particle against the tree
        let mut out = Vec::new();
        let t1 = Instant::now();
        for p in &particles {
            tree.get_particles(&mut out, p.position, radius);
        }
        let dt_tree = t1.elapsed().as_secs_f64();

        // Time the same queries by direct scan, on a sample to keep n^2 sane
        let sample: Vec<&Particle> = particles.iter().step_by(100).collect();
        let t2 = Instant::now();
        for p in &sample {
            out.clear();
            for q in &particles {
                if (p.position - q.position).norm() < radius {
                    out.push(*q);
                }
            }
        }
        let dt_scan = t2.elapsed().as_secs_f64() * 100.0; // scaled back up

        println!(
            "N = {n:7}, build = {dt_build:8.6} s, tree queries = {dt_tree:8.6} s, scan (est) = {dt_scan:8.6} s"
        );
    }
}

pub fn bench_step() {
    // Test different peer counts over the same cloud
    let n = 50_000;
    let iterations = 10;
    let step = StepParameters {
        cull_radius: 30.0,
        delta_time: 0.2,
    };

    for peers in [1, 4, 9] {
        let particles = make_particles(n);
        let settings = RunSettings {
            iterations,
            redistribute_every: 8,
            step,
        };

        let t0 = Instant::now();
        let results = LocalCluster::run(peers, |mut endpoint| {
            let input = (endpoint.rank() == 0).then(|| particles.clone());
            run_simulation(&mut endpoint, &settings, input)
        });
        let per_step = t0.elapsed().as_secs_f64() / iterations as f64;

        let ok = results.iter().all(|r| r.is_ok());
        println!(
            "N = {n}, peers = {peers}, step = {per_step:8.6} s{}",
            if ok { "" } else { "  (FAILED)" }
        );
    }
}
