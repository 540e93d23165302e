//! CLI argument parsing using clap

use clap::{Parser, ValueHint};
use std::path::PathBuf;

/// pquad - parallel midpoint-rule integration
///
/// Run one copy per participant (see `pquadrun`). Identity and group size come
/// from PQUAD_RANK / PQUAD_SIZE / PQUAD_COORDINATOR; without them the program
/// runs as a group of one. Further settings are read from the TOML file named by
/// PQUAD_CONFIG.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "pquad")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Total number of increments across the whole interval
    #[arg(value_name = "STEPS", value_parser = clap::value_parser!(u64).range(1..))]
    pub steps: Option<u64>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// pquadrun - start a group of pquad participants on this machine
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "pquadrun")]
#[command(version, about, long_about = None)]
pub struct LauncherCli {
    /// Number of participants (defaults to the number of CPUs)
    #[arg(short = 'n', long = "np", env = "PQUAD_NP", value_parser = clap::value_parser!(u64).range(1..))]
    pub np: Option<u64>,

    /// Coordinator port (0 = first free port from 9999)
    #[arg(long, env = "PQUAD_PORT", default_value = "0")]
    pub port: u16,

    /// Participant executable (defaults to the pquad binary next to pquadrun)
    #[arg(long, value_hint = ValueHint::ExecutablePath)]
    pub program: Option<PathBuf>,

    /// Print launcher diagnostics
    #[arg(long)]
    pub debug: bool,

    /// Arguments passed to every participant
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

impl LauncherCli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Number of participants to start
    pub fn group_size(&self) -> usize {
        self.np
            .map(|n| n as usize)
            .unwrap_or_else(num_cpus::get)
    }
}
