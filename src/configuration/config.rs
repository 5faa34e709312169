//! Run configuration, loadable from YAML and overridable from the CLI.
//!
//! A run is described by:
//!
//! - [`RunConfigFile`] – the partial, `serde`-deserializable form; every field
//!   is optional so a YAML file and command-line flags can each fill in part
//!   of it.
//! - [`RunConfig`]     – the fully resolved form the engine consumes.
//!
//! # YAML format
//! An example run file matching these types:
//!
//! ```yaml
//! input: particles-100k.txt
//! output: particles-100k.out
//! iterations: 100
//! space_size: 1000.0
//! peers: 4                  # optional, default 1
//! redistribute_every: 8     # optional, default 8
//! ```
//!
//! Flags given on the command line win over values from the file. Validation
//! happens during [`RunConfig::resolve`], before any peer is spawned, so a
//! bad configuration fails fast with a single diagnostic.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::simulation::params::DEFAULT_REDISTRIBUTE_EVERY;

/// Partial configuration; the YAML-facing and flag-facing form.
#[derive(Deserialize, Debug, Default)]
pub struct RunConfigFile {
    pub input: Option<PathBuf>, // particle input file
    pub output: Option<PathBuf>, // where the final population is written
    pub iterations: Option<u32>, // number of simulation steps
    pub space_size: Option<f32>, // extent used to derive step parameters
    pub peers: Option<usize>, // number of cooperating peers
    pub redistribute_every: Option<u32>, // iterations between ownership rebuilds
}

impl RunConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("opening config {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader)
            .with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Fully resolved run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub iterations: u32,
    pub space_size: f32,
    pub peers: usize,
    pub redistribute_every: u32,
}

impl RunConfig {
    /// Merge command-line overrides onto file values and validate the result.
    pub fn resolve(file: RunConfigFile, overrides: RunConfigFile) -> Result<Self> {
        let config = Self {
            input: overrides
                .input
                .or(file.input)
                .context("no input file given")?,
            output: overrides
                .output
                .or(file.output)
                .context("no output file given")?,
            iterations: overrides
                .iterations
                .or(file.iterations)
                .context("no iteration count given")?,
            space_size: overrides
                .space_size
                .or(file.space_size)
                .context("no space size given")?,
            peers: overrides.peers.or(file.peers).unwrap_or(1),
            redistribute_every: overrides
                .redistribute_every
                .or(file.redistribute_every)
                .unwrap_or(DEFAULT_REDISTRIBUTE_EVERY),
        };

        if config.peers == 0 {
            bail!("peers must be at least 1");
        }
        if config.redistribute_every == 0 {
            bail!("redistribute_every must be at least 1");
        }
        if !(config.space_size > 0.0) {
            bail!("space_size must be positive, got {}", config.space_size);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_file() -> RunConfigFile {
        RunConfigFile {
            input: Some(PathBuf::from("in.txt")),
            output: Some(PathBuf::from("out.txt")),
            iterations: Some(10),
            space_size: Some(100.0),
            peers: None,
            redistribute_every: None,
        }
    }

    #[test]
    fn defaults_fill_the_optional_fields() {
        let config = RunConfig::resolve(full_file(), RunConfigFile::default()).unwrap();
        assert_eq!(config.peers, 1);
        assert_eq!(config.redistribute_every, DEFAULT_REDISTRIBUTE_EVERY);
    }

    #[test]
    fn overrides_win_over_file_values() {
        let overrides = RunConfigFile {
            iterations: Some(99),
            peers: Some(4),
            ..RunConfigFile::default()
        };
        let config = RunConfig::resolve(full_file(), overrides).unwrap();
        assert_eq!(config.iterations, 99);
        assert_eq!(config.peers, 4);
        assert_eq!(config.space_size, 100.0);
    }

    #[test]
    fn missing_required_fields_fail() {
        let mut file = full_file();
        file.input = None;
        assert!(RunConfig::resolve(file, RunConfigFile::default()).is_err());
    }

    #[test]
    fn invalid_values_fail() {
        let overrides = RunConfigFile {
            peers: Some(0),
            ..RunConfigFile::default()
        };
        assert!(RunConfig::resolve(full_file(), overrides).is_err());

        let overrides = RunConfigFile {
            space_size: Some(-5.0),
            ..RunConfigFile::default()
        };
        assert!(RunConfig::resolve(full_file(), overrides).is_err());
    }
}
