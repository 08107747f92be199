// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::trajectory::TrajectoryFormat;
use crate::types::QuantumServer;

/// Command-line arguments for `simjob`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "simjob",
    version,
    about = "Create, run and track external simulation jobs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). A missing file means defaults.
    #[arg(long, value_name = "PATH", default_value = "simjob.toml", global = true)]
    pub config: String,

    /// Job root; overrides `[jobs].root` and `SIMJOB_ROOT`.
    #[arg(long, value_name = "DIR", global = true)]
    pub root: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SIMJOB_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create a job; prints its id.
    New {
        #[command(subcommand)]
        kind: NewJob,
    },

    /// List all jobs.
    List,

    /// Print the status of a job.
    Status { id: u32 },

    /// Change the status of a job.
    SetStatus {
        id: u32,
        /// Queued, Running, Completed, Suspended or Failed.
        status: String,
        /// Skip the lifecycle check.
        #[arg(long)]
        force: bool,
    },

    /// Run a job with the given structure (XYZ file). Ctrl-C cancels.
    Run {
        id: u32,
        #[arg(long, value_name = "FILE")]
        structure: PathBuf,
    },

    /// Print the energy and final geometry of a completed job.
    Result {
        id: u32,
        #[arg(long, value_name = "FILE")]
        structure: PathBuf,
    },

    /// Delete a job that is not running.
    Delete { id: u32 },
}

#[derive(Debug, Clone, Subcommand)]
pub enum NewJob {
    /// Molecular-dynamics simulation.
    Md {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        frames: Option<u32>,
        /// Kelvin.
        #[arg(long)]
        temperature: Option<u32>,
        #[arg(long)]
        steps_per_frame: Option<u32>,
        /// dpb or xyz.
        #[arg(long)]
        format: Option<TrajectoryFormat>,
        /// Final trajectory path.
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Quantum-chemistry calculation.
    Quantum {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// gamess or pc-gamess.
        #[arg(long)]
        server: Option<QuantumServer>,
        /// Geometry optimization instead of a single-point energy.
        #[arg(long)]
        optimize: bool,
        #[arg(long, value_enum, default_value = "none")]
        method: Method,
        /// Basis set, e.g. AM1, STO-3G, 6-31G.
        #[arg(long)]
        basis: Option<String>,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        charge: i64,
        #[arg(long, default_value_t = 1)]
        multiplicity: i64,
        /// Raw parameter override, repeatable.
        #[arg(long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,
    },
}

/// Electron correlation method.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Method {
    #[value(name = "none")]
    Uncorrelated,
    Dft,
    Mp2,
}

impl Method {
    /// Index used by the parameter set.
    pub fn ecm_index(self) -> i64 {
        match self {
            Method::Uncorrelated => 0,
            Method::Dft => 1,
            Method::Mp2 => 2,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
