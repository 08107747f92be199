#![allow(dead_code)]

use std::path::{Path, PathBuf};

use simjob::config::{ConfigFile, RawConfigFile};
use simjob::jobs::{JobRequest, JobSpec, QuantumParams, SimulationParams};
use simjob::params::ParameterSet;
use simjob::structure::{Atom, XyzStructure};
use simjob::trajectory::TrajectoryFormat;
use simjob::types::{IdPersistence, QuantumServer};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from a fast poll interval and a short kill grace so process tests
/// stay quick.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut config = RawConfigFile::default();
        config.jobs.root = Some(root.into());
        config.runner.poll_interval_ms = 20;
        config.runner.kill_grace_ms = 500;
        Self { config }
    }

    pub fn with_simulator(mut self, executable: impl Into<PathBuf>) -> Self {
        self.config.engines.simulator.executable = executable.into();
        self
    }

    pub fn with_quantum(mut self, executable: impl Into<PathBuf>, server: QuantumServer) -> Self {
        self.config.engines.quantum.executable = executable.into();
        self.config.engines.quantum.server = server;
        self
    }

    pub fn with_first_job_id(mut self, id: u32) -> Self {
        self.config.jobs.first_job_id = id;
        self
    }

    pub fn with_id_persistence(mut self, mode: IdPersistence) -> Self {
        self.config.jobs.id_persistence = mode;
        self
    }

    pub fn with_stderr_tail_lines(mut self, lines: usize) -> Self {
        self.config.runner.stderr_tail_lines = lines;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Builder for MD simulation requests.
pub struct MdRequestBuilder {
    name: String,
    description: String,
    params: SimulationParams,
}

impl MdRequestBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            params: SimulationParams {
                frames: 5,
                temperature: 300,
                steps_per_frame: 10,
                format: TrajectoryFormat::Dpb,
                output: None,
            },
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn frames(mut self, frames: u32) -> Self {
        self.params.frames = frames;
        self
    }

    pub fn format(mut self, format: TrajectoryFormat) -> Self {
        self.params.format = format;
        self
    }

    pub fn output(mut self, output: impl AsRef<Path>) -> Self {
        self.params.output = Some(output.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> JobRequest {
        JobRequest {
            name: self.name,
            description: self.description,
            spec: JobSpec::Simulation(self.params),
        }
    }
}

/// A quantum-chemistry request with default parameters.
pub fn quantum_request(name: &str, server: QuantumServer, pset: ParameterSet) -> JobRequest {
    JobRequest {
        name: name.to_string(),
        description: String::new(),
        spec: JobSpec::Quantum(QuantumParams { server, pset }),
    }
}

/// Three-atom water molecule.
pub fn water() -> XyzStructure {
    XyzStructure::from_atoms(vec![
        Atom {
            symbol: "O".to_string(),
            position: [0.0, 0.0, 0.117],
        },
        Atom {
            symbol: "H".to_string(),
            position: [0.0, 0.757, -0.467],
        },
        Atom {
            symbol: "H".to_string(),
            position: [0.0, -0.757, -0.467],
        },
    ])
}

/// `count` hydrogens one unit apart along x.
pub fn hydrogen_chain(count: usize) -> XyzStructure {
    XyzStructure::from_atoms(
        (0..count)
            .map(|i| Atom {
                symbol: "H".to_string(),
                position: [i as f64, 0.0, 0.0],
            })
            .collect(),
    )
}
