//! Particle file loader and saver.
//!
//! The on-disk format is plain text, one particle per line, five
//! whitespace-separated floats: `mass x y vx vy`. A particle's id is its line
//! index, which doubles as the canonical output order. Floats are written
//! with the shortest representation that parses back to the same value, so
//! saving a loaded file reproduces it byte for byte.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::simulation::states::{Particle, Vec2f};

pub fn load_particles(path: &Path) -> Result<Vec<Particle>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut particles = Vec::new();
    for (at, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: std::result::Result<Vec<f32>, _> =
            line.split_whitespace().map(str::parse).collect();
        let fields = fields
            .with_context(|| format!("{}: line {}: malformed float", path.display(), at + 1))?;
        if fields.len() != 5 {
            bail!(
                "{}: line {}: expected 5 fields (mass x y vx vy), got {}",
                path.display(),
                at + 1,
                fields.len()
            );
        }
        particles.push(Particle::new(
            particles.len() as i32,
            fields[0],
            Vec2f::new(fields[1], fields[2]),
            Vec2f::new(fields[3], fields[4]),
        ));
    }
    Ok(particles)
}

pub fn save_particles(path: &Path, particles: &[Particle]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for p in particles {
        writeln!(
            writer,
            "{} {} {} {} {}",
            p.mass, p.position.x, p.position.y, p.velocity.x, p.velocity.y
        )
        .with_context(|| format!("writing {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}
