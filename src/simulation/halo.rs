//! Per-iteration halo exchange
//!
//! Each peer publishes its owned-set bounding box, computes which peers'
//! regions fall within the cull radius of its own, and swaps full owned-set
//! buffers with exactly those peers. The neighbor predicate is symmetric and
//! every peer evaluates it over the same gathered boxes, so peer j posts a
//! send to peer k iff k posts one to j; receives are sized from the owned
//! counts gathered at the last redistribution.
//!
//! The working set produced here is the halo particles in neighbor-rank order
//! followed by the peer's own particles; the local set must be present so the
//! spatial index built over the working set can answer queries for it.

use log::debug;

use crate::simulation::driver::SimError;
use crate::simulation::geometry::{box_distance2, Box2};
use crate::simulation::states::Particle;
use crate::transport::{wire, Transport};

/// Exchange owned sets with every peer within `cull_radius` of
/// `local_bounds`, assembling the iteration's working set into `working`.
pub fn exchange<T: Transport>(
    transport: &mut T,
    owned: &[Particle],
    local_bounds: &Box2,
    owned_counts: &[usize],
    cull_radius: f32,
    tag: u32,
    working: &mut Vec<Particle>,
) -> Result<(), SimError> {
    let rank = transport.rank();

    // publish bounds, then pick the peers in range
    let gathered = transport.all_gather(&wire::encode_box(local_bounds))?;
    let all_bounds = wire::decode_boxes(&gathered)?;

    let radius2 = cull_radius * cull_radius;
    let neighbors: Vec<usize> = (0..transport.size())
        .filter(|&peer| peer != rank && box_distance2(&all_bounds[peer], local_bounds) <= radius2)
        .collect();
    debug!("peer {rank}: {} halo neighbors at tag {tag}", neighbors.len());

    // everything in flight before anything is waited on
    let payload = wire::encode_particles(owned);
    for &peer in &neighbors {
        transport.send_async(peer, tag, payload.clone())?;
    }
    let receives: Vec<_> = neighbors
        .iter()
        .map(|&peer| transport.recv_async(peer, tag, owned_counts[peer] * wire::PARTICLE_RECORD))
        .collect();

    working.clear();
    for handle in receives {
        let bytes = transport.wait_recv(handle)?;
        wire::decode_particles_into(&bytes, working)?;
    }
    transport.wait_sends()?;

    working.extend_from_slice(owned);
    Ok(())
}
