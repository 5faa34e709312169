//! The per-peer simulation loop
//!
//! Every peer runs [`run_simulation`] with the same settings; the coordinator
//! additionally supplies the input population and receives the gathered
//! result. A peer moves through the phases
//!
//! ```text
//! INIT -> LOADED -> RUNNING -> GATHERING -> DONE
//! ```
//!
//! - INIT -> LOADED: the coordinator broadcasts the particle count, then the
//!   encoded population; every peer now holds the full initial set.
//! - RUNNING: each iteration redistributes ownership when due, exchanges
//!   halos, builds the quadtree over the working set, advances the owned
//!   particles one step, and ends on a barrier.
//! - GATHERING -> DONE: owned sets are gathered back into a full population
//!   and the coordinator restores the input ordering by particle id.
//!
//! Any transport or codec failure aborts the run; there is no retry and no
//! tolerance for a lost peer.

use std::collections::HashMap;
use std::time::Instant;

use log::{debug, info};
use thiserror::Error;

use crate::simulation::forces::compute_force;
use crate::simulation::geometry::Box2;
use crate::simulation::halo;
use crate::simulation::integrator::update_particle;
use crate::simulation::params::{StepParameters, COORDINATOR, HALO_TAG_BASE};
use crate::simulation::partition::PartitionGrid;
use crate::simulation::quadtree::QuadTree;
use crate::simulation::states::{Particle, Vec2f};
use crate::transport::{wire, Transport, TransportError};

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Wire(#[from] wire::WireError),
}

/// Per-run settings shared by every peer.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub iterations: u32,
    pub redistribute_every: u32,
    pub step: StepParameters,
}

/// Run the full simulation on this peer. `input` must be `Some` exactly on
/// the coordinator; the gathered, input-ordered population comes back on the
/// coordinator and `None` everywhere else.
pub fn run_simulation<T: Transport>(
    transport: &mut T,
    settings: &RunSettings,
    input: Option<Vec<Particle>>,
) -> Result<Option<Vec<Particle>>, SimError> {
    let rank = transport.rank();
    let size = transport.size();

    // INIT -> LOADED: count, then population
    let mut count_buf = match &input {
        Some(particles) => wire::encode_count(particles.len()),
        None => Vec::new(),
    };
    transport.broadcast(COORDINATOR, &mut count_buf)?;
    let total = wire::decode_counts(&count_buf)?[0];

    let mut population_buf = match input {
        Some(particles) => wire::encode_particles(&particles),
        None => Vec::new(),
    };
    transport.broadcast(COORDINATOR, &mut population_buf)?;
    let mut full = wire::decode_particles(&population_buf)?;
    assert_eq!(full.len(), total, "population does not match advertised count");

    // canonical output order: id -> position in the input
    let canonical: HashMap<i32, usize> =
        full.iter().enumerate().map(|(at, p)| (p.id, at)).collect();
    debug!("peer {rank}: LOADED with {total} particles");

    // LOADED -> RUNNING
    transport.barrier();
    let timer = Instant::now();

    let mut owned: Vec<Particle> = Vec::new();
    let mut next_owned: Vec<Particle> = Vec::new();
    let mut working: Vec<Particle> = Vec::new();
    let mut neighbors: Vec<Particle> = Vec::new();
    let mut counts: Vec<usize> = vec![0; size];
    let mut local_bounds = Box2::empty();

    for iteration in 0..settings.iterations {
        if iteration % settings.redistribute_every == 0 {
            let global_bounds = if iteration == 0 {
                // the initial broadcast is the population; its box seeds the grid
                Box2::of_particles(&full)
            } else {
                let gathered = transport.all_gather(&wire::encode_box(&local_bounds))?;
                let mut global = Box2::empty();
                for peer_bounds in wire::decode_boxes(&gathered)? {
                    global.merge(&peer_bounds);
                }

                // pull every owned set back so each peer sees the population
                let bytes = transport
                    .all_gather_var(&wire::encode_particles(&owned), &byte_sizes(&counts))?;
                full = wire::decode_particles(&bytes)?;
                global
            };

            let grid = PartitionGrid::new(global_bounds, size);
            owned = grid.owned_by(rank, &full);

            let gathered = transport.all_gather(&wire::encode_count(owned.len()))?;
            counts = wire::decode_counts(&gathered)?;
            assert_eq!(
                counts.iter().sum::<usize>(),
                full.len(),
                "redistribution lost or duplicated particles"
            );

            local_bounds = Box2::of_particles(&owned);
            debug!(
                "peer {rank}: iteration {iteration}, redistributed, owning {}",
                owned.len()
            );
        }

        halo::exchange(
            transport,
            &owned,
            &local_bounds,
            &counts,
            settings.step.cull_radius,
            HALO_TAG_BASE + iteration,
            &mut working,
        )?;

        // one step for every owned particle, against the indexed working set
        next_owned.clear();
        let mut next_bounds = Box2::empty();
        if !owned.is_empty() {
            let tree = QuadTree::build(&working);
            for p in &owned {
                tree.get_particles(&mut neighbors, p.position, settings.step.cull_radius);
                let mut force = Vec2f::zeros();
                for q in &neighbors {
                    force += compute_force(p, q, settings.step.cull_radius);
                }
                let advanced = update_particle(p, force, settings.step.delta_time);
                next_bounds.expand(advanced.position);
                next_owned.push(advanced);
            }
        }
        std::mem::swap(&mut owned, &mut next_owned);
        local_bounds = next_bounds;

        transport.barrier();
    }
    let elapsed = timer.elapsed();

    // RUNNING -> GATHERING
    debug!("peer {rank}: GATHERING");
    let final_population = if settings.iterations == 0 {
        // ownership was never assigned; the population is untouched
        full
    } else {
        let bytes =
            transport.all_gather_var(&wire::encode_particles(&owned), &byte_sizes(&counts))?;
        wire::decode_particles(&bytes)?
    };

    if rank != COORDINATOR {
        return Ok(None);
    }
    info!("total simulation time: {:.6}s", elapsed.as_secs_f64());

    // GATHERING -> DONE: restore input order
    let mut ordered = final_population.clone();
    for p in final_population {
        let at = *canonical
            .get(&p.id)
            .expect("gathered a particle id that was never loaded");
        ordered[at] = p;
    }
    Ok(Some(ordered))
}

fn byte_sizes(counts: &[usize]) -> Vec<usize> {
    counts.iter().map(|c| c * wire::PARTICLE_RECORD).collect()
}
