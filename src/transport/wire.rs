//! Little-endian record codecs for everything the transport carries
//!
//! The particle record is the one externally fixed layout: 24 bytes, field
//! order id, mass, position.x, position.y, velocity.x, velocity.y, all
//! little-endian 32-bit. This module is the single source of truth for that
//! layout; every collective and halo message moves opaque byte buffers
//! produced and consumed here.

use thiserror::Error;

use crate::simulation::geometry::Box2;
use crate::simulation::states::{Particle, Vec2f};

pub const PARTICLE_RECORD: usize = 24;
pub const BOX_RECORD: usize = 16;
pub const COUNT_RECORD: usize = 4;

// id + mass + position + velocity, four bytes per field
const _: () = assert!(PARTICLE_RECORD == 4 + 4 + 2 * 4 + 2 * 4);

#[derive(Debug, Error)]
pub enum WireError {
    #[error("buffer of {len} bytes is not a whole number of {record}-byte records")]
    RaggedBuffer { len: usize, record: usize },
}

pub type Result<T> = std::result::Result<T, WireError>;

fn put_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn get_f32(bytes: &[u8], at: usize) -> f32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    f32::from_le_bytes(word)
}

fn get_i32(bytes: &[u8], at: usize) -> i32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    i32::from_le_bytes(word)
}

/// Append one particle record to `out`.
pub fn write_particle(out: &mut Vec<u8>, p: &Particle) {
    out.extend_from_slice(&p.id.to_le_bytes());
    put_f32(out, p.mass);
    put_f32(out, p.position.x);
    put_f32(out, p.position.y);
    put_f32(out, p.velocity.x);
    put_f32(out, p.velocity.y);
}

pub fn encode_particles(particles: &[Particle]) -> Vec<u8> {
    let mut out = Vec::with_capacity(particles.len() * PARTICLE_RECORD);
    for p in particles {
        write_particle(&mut out, p);
    }
    out
}

/// Decode a buffer of particle records, appending to `out`.
pub fn decode_particles_into(bytes: &[u8], out: &mut Vec<Particle>) -> Result<()> {
    if bytes.len() % PARTICLE_RECORD != 0 {
        return Err(WireError::RaggedBuffer {
            len: bytes.len(),
            record: PARTICLE_RECORD,
        });
    }
    out.reserve(bytes.len() / PARTICLE_RECORD);
    for record in bytes.chunks_exact(PARTICLE_RECORD) {
        out.push(Particle {
            id: get_i32(record, 0),
            mass: get_f32(record, 4),
            position: Vec2f::new(get_f32(record, 8), get_f32(record, 12)),
            velocity: Vec2f::new(get_f32(record, 16), get_f32(record, 20)),
        });
    }
    Ok(())
}

pub fn decode_particles(bytes: &[u8]) -> Result<Vec<Particle>> {
    let mut out = Vec::new();
    decode_particles_into(bytes, &mut out)?;
    Ok(out)
}

/// Fixed 16-byte bounding-box record: min.x, min.y, max.x, max.y.
pub fn encode_box(b: &Box2) -> Vec<u8> {
    let mut out = Vec::with_capacity(BOX_RECORD);
    put_f32(&mut out, b.min.x);
    put_f32(&mut out, b.min.y);
    put_f32(&mut out, b.max.x);
    put_f32(&mut out, b.max.y);
    out
}

pub fn decode_boxes(bytes: &[u8]) -> Result<Vec<Box2>> {
    if bytes.len() % BOX_RECORD != 0 {
        return Err(WireError::RaggedBuffer {
            len: bytes.len(),
            record: BOX_RECORD,
        });
    }
    Ok(bytes
        .chunks_exact(BOX_RECORD)
        .map(|record| Box2 {
            min: Vec2f::new(get_f32(record, 0), get_f32(record, 4)),
            max: Vec2f::new(get_f32(record, 8), get_f32(record, 12)),
        })
        .collect())
}

/// Fixed 4-byte count record used for count all-gathers and the population
/// broadcast.
pub fn encode_count(count: usize) -> Vec<u8> {
    (count as u32).to_le_bytes().to_vec()
}

pub fn decode_counts(bytes: &[u8]) -> Result<Vec<usize>> {
    if bytes.len() % COUNT_RECORD != 0 {
        return Err(WireError::RaggedBuffer {
            len: bytes.len(),
            record: COUNT_RECORD,
        });
    }
    Ok(bytes
        .chunks_exact(COUNT_RECORD)
        .map(|record| {
            let mut word = [0u8; 4];
            word.copy_from_slice(record);
            u32::from_le_bytes(word) as usize
        })
        .collect())
}
