use dpsim::configuration::config::{RunConfig, RunConfigFile};
use dpsim::io::files::{load_particles, save_particles};
use dpsim::simulation::driver::{run_simulation, RunSettings};
use dpsim::simulation::params::{benchmark_step_params, COORDINATOR};
use dpsim::transport::local::LocalCluster;
use dpsim::transport::Transport;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Distributed 2D particle simulator")]
struct Args {
    /// YAML run configuration; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Particle input file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file for the final population
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of simulation steps
    #[arg(short = 'n', long)]
    iterations: Option<u32>,

    /// Extent of the simulated space, used to derive step parameters
    #[arg(short, long)]
    space_size: Option<f32>,

    /// Number of cooperating peers
    #[arg(short, long)]
    peers: Option<usize>,

    /// Iterations between ownership rebuilds
    #[arg(long)]
    redistribute_every: Option<u32>,
}

fn resolve_config(args: Args) -> Result<RunConfig> {
    let file = match &args.config {
        Some(path) => RunConfigFile::load(path)?,
        None => RunConfigFile::default(),
    };
    let overrides = RunConfigFile {
        input: args.input,
        output: args.output,
        iterations: args.iterations,
        space_size: args.space_size,
        peers: args.peers,
        redistribute_every: args.redistribute_every,
    };
    RunConfig::resolve(file, overrides)
}

fn main() -> Result<()> {
    env_logger::init();

    let config = resolve_config(Args::parse())?;
    let particles = load_particles(&config.input)?;
    info!(
        "peers = {}, particles = {}, iterations = {}",
        config.peers,
        particles.len(),
        config.iterations
    );

    let settings = RunSettings {
        iterations: config.iterations,
        redistribute_every: config.redistribute_every,
        step: benchmark_step_params(config.space_size),
    };

    let results = LocalCluster::run(config.peers, |mut endpoint| {
        let input = (endpoint.rank() == COORDINATOR).then(|| particles.clone());
        run_simulation(&mut endpoint, &settings, input)
    });

    let mut gathered = None;
    for (rank, result) in results.into_iter().enumerate() {
        let outcome = result.with_context(|| format!("peer {rank} failed"))?;
        if rank == COORDINATOR {
            gathered = outcome;
        }
    }

    let finals = gathered.context("coordinator produced no output")?;
    save_particles(&config.output, &finals)?;
    Ok(())
}
