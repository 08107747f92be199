// src/jobs/status.rs

//! Durable job status, encoded as one `Status-<X>` marker file per job.
//!
//! A transition creates the new marker (synced) before deleting the old
//! ones, so a crash leaves two markers rather than none. Readers resolve
//! leftovers: the newest marker wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{JobError, Result};
use crate::fs::FileSystem;
use crate::jobs::record::FailureReason;
use crate::jobs::JobId;
use crate::types::Status;

pub const MARKER_PREFIX: &str = "Status-";
pub const FAILURE_REASON_FILE: &str = "Failure-Reason";

/// Notified after every successful status write.
pub trait StatusObserver: Send + Sync {
    fn status_changed(&self, job: JobId, status: Status);
}

/// Marker file name for `status`.
pub fn marker_name(status: Status) -> String {
    format!("{MARKER_PREFIX}{status}")
}

#[derive(Clone)]
pub struct StatusStore {
    fs: Arc<dyn FileSystem>,
    jobs_dir: PathBuf,
    observers: Vec<Arc<dyn StatusObserver>>,
}

impl std::fmt::Debug for StatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusStore")
            .field("jobs_dir", &self.jobs_dir)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl StatusStore {
    pub fn new(fs: Arc<dyn FileSystem>, jobs_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            jobs_dir: jobs_dir.into(),
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn StatusObserver>) {
        self.observers.push(observer);
    }

    pub fn job_dir(&self, id: JobId) -> PathBuf {
        self.jobs_dir.join(id.to_string())
    }

    fn existing_job_dir(&self, id: JobId) -> Result<PathBuf> {
        let dir = self.job_dir(id);
        if self.fs.is_dir(&dir) {
            Ok(dir)
        } else {
            Err(JobError::JobNotFound(id))
        }
    }

    /// Move `id` to `status`, checking the lifecycle state machine.
    pub fn set_status(&self, id: JobId, status: Status) -> Result<()> {
        let current = self.get_status(id)?;
        if !current.can_transition_to(status) {
            return Err(JobError::InvalidTransition {
                job: id,
                from: current,
                to: status,
            });
        }
        self.write_marker(id, status)
    }

    /// Write `status` without consulting the current state. Used for the
    /// initial marker and for explicit overrides.
    pub fn force_status(&self, id: JobId, status: Status) -> Result<()> {
        self.write_marker(id, status)
    }

    /// Textual form of [`Self::set_status`], e.g. `"Running"`.
    pub fn set_status_str(&self, id: JobId, status: &str) -> Result<()> {
        let status: Status = status.parse()?;
        self.set_status(id, status)
    }

    /// Mark `id` Failed and record why.
    pub fn fail(&self, id: JobId, reason: &FailureReason) -> Result<()> {
        let dir = self.existing_job_dir(id)?;
        // The reason goes first so a Failed marker always has one.
        let mut text = reason.to_string();
        text.push('\n');
        self.fs.write(&dir.join(FAILURE_REASON_FILE), text.as_bytes())?;

        let current = self.get_status(id)?;
        if !current.can_transition_to(Status::Failed) {
            warn!(job = %id, from = %current, "forcing Failed from a state that cannot reach it");
        }
        self.write_marker(id, Status::Failed)
    }

    fn write_marker(&self, id: JobId, status: Status) -> Result<()> {
        let dir = self.existing_job_dir(id)?;
        let new_marker = marker_name(status);
        self.fs.touch_synced(&dir.join(&new_marker))?;

        for (path, _) in self.markers(&dir)? {
            if path.file_name().and_then(|n| n.to_str()) != Some(new_marker.as_str()) {
                self.fs.remove_file(&path)?;
            }
        }

        let reason_path = dir.join(FAILURE_REASON_FILE);
        if status != Status::Failed && self.fs.exists(&reason_path) {
            self.fs.remove_file(&reason_path)?;
        }

        info!(job = %id, status = %status, "status changed");
        for observer in &self.observers {
            observer.status_changed(id, status);
        }
        Ok(())
    }

    /// Every `Status-*` file in `dir` whose suffix is a known status.
    fn markers(&self, dir: &Path) -> Result<Vec<(PathBuf, Status)>> {
        let mut found = Vec::new();
        for path in self.fs.read_dir(dir)? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(suffix) = name.strip_prefix(MARKER_PREFIX) else {
                continue;
            };
            match suffix.parse::<Status>() {
                Ok(status) if self.fs.is_file(&path) => found.push((path, status)),
                Ok(_) => {}
                Err(_) => debug!(path = ?path, "ignoring unknown status marker"),
            }
        }
        Ok(found)
    }

    /// Current status. Corrupt states are resolved, never reported as
    /// errors: several markers pick the newest, none means Queued.
    pub fn get_status(&self, id: JobId) -> Result<Status> {
        let dir = self.existing_job_dir(id)?;
        let markers = self.markers(&dir)?;
        match markers.len() {
            0 => {
                warn!(job = %id, "no status marker found; assuming Queued");
                Ok(Status::Queued)
            }
            1 => Ok(markers[0].1),
            n => {
                let newest = markers
                    .iter()
                    .filter_map(|(path, status)| {
                        self.fs.modified(path).ok().map(|mtime| (mtime, *status))
                    })
                    .max_by_key(|(mtime, _)| *mtime)
                    .map(|(_, status)| status)
                    .unwrap_or(markers[0].1);
                warn!(
                    job = %id,
                    markers = n,
                    chosen = %newest,
                    "several status markers found; using the newest"
                );
                Ok(newest)
            }
        }
    }

    /// Reason recorded for a Failed job, if any.
    pub fn failure_reason(&self, id: JobId) -> Result<Option<FailureReason>> {
        let dir = self.existing_job_dir(id)?;
        let path = dir.join(FAILURE_REASON_FILE);
        if !self.fs.is_file(&path) {
            return Ok(None);
        }
        let text = self.fs.read_to_string(&path)?;
        Ok(Some(FailureReason::from_text(&text)))
    }
}
