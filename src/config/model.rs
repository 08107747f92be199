// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::trajectory::TrajectoryFormat;
use crate::types::{IdPersistence, QuantumServer};

/// Configuration as read from TOML, before validation.
///
/// ```toml
/// [jobs]
/// root = "/home/me/.simjob"
/// first_job_id = 100
/// id_persistence = "base"
///
/// [runner]
/// poll_interval_ms = 250
/// kill_grace_ms = 2000
///
/// [engines.simulator]
/// executable = "/opt/nanosim/bin/simulator"
/// frames = 900
/// format = "dpb"
///
/// [engines.quantum]
/// executable = "rungms"
/// server = "gamess"
/// ```
///
/// All sections are optional and have defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub jobs: JobsSection,

    #[serde(default)]
    pub runner: RunnerSection,

    #[serde(default)]
    pub engines: EnginesSection,
}

/// Validated configuration. Only constructed through
/// `ConfigFile::try_from(RawConfigFile)` or [`ConfigFile::default`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub jobs: JobsSection,
    pub runner: RunnerSection,
    pub engines: EnginesSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        jobs: JobsSection,
        runner: RunnerSection,
        engines: EnginesSection,
    ) -> Self {
        Self {
            jobs,
            runner,
            engines,
        }
    }

    /// Directory holding `JobManager/`.
    ///
    /// Falls back to `$HOME/.simjob`, then `./.simjob`.
    pub fn root(&self) -> PathBuf {
        if let Some(root) = &self.jobs.root {
            return root.clone();
        }
        match std::env::var_os("HOME") {
            Some(home) => Path::new(&home).join(".simjob"),
            None => PathBuf::from(".simjob"),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.jobs.root = Some(root.into());
        self
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.jobs, raw.runner, raw.engines)
    }
}

/// `[jobs]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobsSection {
    /// Root directory; `JobManager/<id>/` lives below it.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Id used when the preferences file has none yet.
    #[serde(default = "default_first_job_id")]
    pub first_job_id: u32,

    /// `"base"` (default) or `"allocated"`.
    #[serde(default)]
    pub id_persistence: IdPersistence,
}

fn default_first_job_id() -> u32 {
    100
}

impl Default for JobsSection {
    fn default() -> Self {
        Self {
            root: None,
            first_job_id: default_first_job_id(),
            id_persistence: IdPersistence::default(),
        }
    }
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Time between the polite termination request and the force kill.
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,

    /// How many trailing stderr lines end up in a failure reason.
    #[serde(default = "default_stderr_tail_lines")]
    pub stderr_tail_lines: usize,
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_kill_grace_ms() -> u64 {
    2000
}

fn default_stderr_tail_lines() -> usize {
    5
}

impl RunnerSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            kill_grace_ms: default_kill_grace_ms(),
            stderr_tail_lines: default_stderr_tail_lines(),
        }
    }
}

/// `[engines]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EnginesSection {
    #[serde(default)]
    pub simulator: SimulatorSection,

    #[serde(default)]
    pub quantum: QuantumSection,
}

/// `[engines.simulator]`: executable plus defaults for new MD jobs.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorSection {
    #[serde(default = "default_simulator_executable")]
    pub executable: PathBuf,

    #[serde(default = "default_frames")]
    pub frames: u32,

    /// Kelvin.
    #[serde(default = "default_temperature")]
    pub temperature: u32,

    #[serde(default = "default_steps_per_frame")]
    pub steps_per_frame: u32,

    #[serde(default)]
    pub format: TrajectoryFormat,
}

fn default_simulator_executable() -> PathBuf {
    PathBuf::from("simulator")
}

fn default_frames() -> u32 {
    900
}

fn default_temperature() -> u32 {
    300
}

fn default_steps_per_frame() -> u32 {
    10
}

impl Default for SimulatorSection {
    fn default() -> Self {
        Self {
            executable: default_simulator_executable(),
            frames: default_frames(),
            temperature: default_temperature(),
            steps_per_frame: default_steps_per_frame(),
            format: TrajectoryFormat::default(),
        }
    }
}

/// `[engines.quantum]`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuantumSection {
    #[serde(default = "default_quantum_executable")]
    pub executable: PathBuf,

    #[serde(default)]
    pub server: QuantumServer,
}

fn default_quantum_executable() -> PathBuf {
    PathBuf::from("rungms")
}

impl Default for QuantumSection {
    fn default() -> Self {
        Self {
            executable: default_quantum_executable(),
            server: QuantumServer::default(),
        }
    }
}
