// src/jobs/mod.rs

//! On-disk job store.
//!
//! Every job lives in `<root>/JobManager/<id>/`:
//!
//! ```text
//! JobManager/
//!   preferences.toml        last-used job id
//!   100/
//!     Status-Queued         status marker (zero-length)
//!     Failure-Reason        only for Failed jobs
//!     sim-100.bat           metadata script
//!     sim-100.dpb           published output
//!     parameters.mmp        quantum jobs only
//!     scratch/              working directory of the engine
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod directory;
pub mod manager;
pub mod metadata;
pub mod prefs;
pub mod record;
pub mod status;

pub use directory::JobDirectory;
pub use manager::JobManager;
pub use record::{FailureReason, JobRecord, JobRequest, JobSpec, QuantumParams, SimulationParams};
pub use status::{StatusObserver, StatusStore};

/// Name of the directory below the root that holds all jobs.
pub const JOBS_DIR_NAME: &str = "JobManager";

/// Numeric job id, unique within a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u32);

impl JobId {
    pub fn get(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Option<JobId> {
        self.0.checked_add(1).map(JobId)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(JobId)
    }
}

impl From<u32> for JobId {
    fn from(id: u32) -> Self {
        JobId(id)
    }
}

/// Paths of the files belonging to one job.
///
/// `base` is the stem shared by the metadata script and the engine files
/// (`sim-100`, `gms-101`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    dir: PathBuf,
    base: String,
}

impl JobPaths {
    pub fn new(dir: impl Into<PathBuf>, base: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base: base.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn metadata(&self) -> PathBuf {
        self.file("bat")
    }

    pub fn scratch(&self) -> PathBuf {
        self.dir.join("scratch")
    }

    pub fn parameters(&self) -> PathBuf {
        self.dir.join("parameters.mmp")
    }

    /// `<dir>/<base>.<ext>`.
    pub fn file(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{ext}", self.base))
    }
}
