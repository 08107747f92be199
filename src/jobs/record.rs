// src/jobs/record.rs

use std::fmt;
use std::path::PathBuf;

use crate::jobs::JobId;
use crate::params::ParameterSet;
use crate::trajectory::TrajectoryFormat;
use crate::types::{Engine, QuantumServer, Status};

/// Sidecar text recorded for user cancellation.
pub const CANCELLED_REASON: &str = "cancelled by user";

/// Why a job ended up Failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Cancelled,
    Error(String),
}

impl FailureReason {
    /// Parse the first line of a `Failure-Reason` file.
    pub fn from_text(text: &str) -> Self {
        let line = text.lines().next().unwrap_or("").trim();
        if line == CANCELLED_REASON {
            FailureReason::Cancelled
        } else {
            FailureReason::Error(line.to_string())
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FailureReason::Cancelled)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Cancelled => f.write_str(CANCELLED_REASON),
            FailureReason::Error(reason) => f.write_str(reason),
        }
    }
}

/// One job as listed from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    pub engine: Engine,
    pub calculation: String,
    pub description: String,
    pub name: String,
    pub status: Status,
    pub server_id: String,
    pub elapsed_secs: f64,
    pub failure: Option<FailureReason>,
    pub metadata_path: PathBuf,
    pub output_path: Option<PathBuf>,
}

/// Settings for an MD simulator run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub frames: u32,
    /// Kelvin.
    pub temperature: u32,
    pub steps_per_frame: u32,
    pub format: TrajectoryFormat,
    /// Final trajectory path; defaults to `<base>.<ext>` in the job directory.
    pub output: Option<PathBuf>,
}

/// Settings for a quantum-chemistry run.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantumParams {
    pub server: QuantumServer,
    pub pset: ParameterSet,
}

/// Engine-specific part of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobSpec {
    Simulation(SimulationParams),
    Quantum(QuantumParams),
}

impl JobSpec {
    pub fn engine(&self) -> Engine {
        match self {
            JobSpec::Simulation(_) => Engine::MdSimulator,
            JobSpec::Quantum(_) => Engine::QuantumChem,
        }
    }

    pub fn calculation(&self) -> String {
        match self {
            JobSpec::Simulation(_) => "Simulate".to_string(),
            JobSpec::Quantum(q) => q.pset.calculation().to_string(),
        }
    }

    pub fn server_id(&self) -> String {
        match self {
            JobSpec::Simulation(_) => "simulator".to_string(),
            JobSpec::Quantum(q) => q.server.label().to_string(),
        }
    }

    /// File stem for a job with this spec.
    pub fn base_name(&self, id: JobId) -> String {
        match self {
            JobSpec::Simulation(_) => format!("sim-{id}"),
            JobSpec::Quantum(_) => format!("gms-{id}"),
        }
    }
}

/// What a caller submits.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub name: String,
    pub description: String,
    pub spec: JobSpec,
}
