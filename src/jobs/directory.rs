// src/jobs/directory.rs

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{JobError, Result};
use crate::fs::FileSystem;
use crate::jobs::metadata::{self, Metadata};
use crate::jobs::prefs::{self, Preferences};
use crate::jobs::record::JobRecord;
use crate::jobs::status::StatusStore;
use crate::jobs::{JobId, JobPaths};
use crate::types::{Engine, IdPersistence, Status};

/// Allocates, scans and deletes job directories under one jobs dir.
#[derive(Debug, Clone)]
pub struct JobDirectory {
    fs: Arc<dyn FileSystem>,
    jobs_dir: PathBuf,
    first_job_id: u32,
    id_persistence: IdPersistence,
    store: StatusStore,
}

impl JobDirectory {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        jobs_dir: impl Into<PathBuf>,
        first_job_id: u32,
        id_persistence: IdPersistence,
    ) -> Self {
        let jobs_dir = jobs_dir.into();
        let store = StatusStore::new(fs.clone(), jobs_dir.clone());
        Self {
            fs,
            jobs_dir,
            first_job_id,
            id_persistence,
            store,
        }
    }

    pub fn jobs_dir(&self) -> &Path {
        &self.jobs_dir
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StatusStore {
        &mut self.store
    }

    pub fn job_dir(&self, id: JobId) -> PathBuf {
        self.jobs_dir.join(id.to_string())
    }

    /// Claim the next free job id and create its directory with a Queued
    /// marker.
    ///
    /// Creation itself is the existence test, so two allocators can never
    /// get the same id.
    pub fn allocate(&self) -> Result<(JobId, PathBuf)> {
        self.fs.create_dir_all(&self.jobs_dir)?;

        let stored = prefs::load(self.fs.as_ref(), &self.jobs_dir).job_id;
        let base = JobId(stored.unwrap_or(self.first_job_id));

        let mut id = base;
        let dir = loop {
            let dir = self.job_dir(id);
            match self.fs.create_dir(&dir) {
                Ok(()) => break dir,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(job = %id, "job id taken; trying next");
                    id = id.next().ok_or_else(|| JobError::Allocation {
                        path: dir.clone(),
                        source: io::Error::other("job id space exhausted"),
                    })?;
                }
                Err(source) => return Err(JobError::Allocation { path: dir, source }),
            }
        };

        let persisted = match self.id_persistence {
            IdPersistence::Base => base,
            IdPersistence::Allocated => id,
        };
        let claimed = prefs::save(
            self.fs.as_ref(),
            &self.jobs_dir,
            &Preferences {
                job_id: Some(persisted.get()),
            },
        )
        .and_then(|()| self.store.force_status(id, Status::Queued));
        if let Err(error) = claimed {
            warn!(job = %id, error = %error, "cannot finish allocation; removing job directory");
            if let Err(cleanup) = self.fs.remove_dir_all(&dir) {
                warn!(job = %id, error = %cleanup, "cannot remove job directory");
            }
            return Err(error);
        }

        info!(job = %id, dir = ?dir, "allocated job directory");
        Ok((id, dir))
    }

    /// All jobs with readable metadata, sorted by id.
    pub fn list(&self) -> Vec<JobRecord> {
        let entries = match self.fs.read_dir(&self.jobs_dir) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(dir = ?self.jobs_dir, error = %error, "cannot read jobs directory");
                return Vec::new();
            }
        };

        let mut records: Vec<JobRecord> = entries
            .iter()
            .filter(|path| self.fs.is_dir(path))
            .filter_map(|path| {
                let id = path.file_name()?.to_str()?.parse::<JobId>().ok()?;
                match self.load(id) {
                    Ok(record) => record,
                    Err(error) => {
                        warn!(job = %id, error = %error, "skipping unreadable job");
                        None
                    }
                }
            })
            .collect();
        records.sort_by_key(|r| r.id);
        records
    }

    /// Metadata script of the job in `dir`, if any.
    pub fn find_metadata(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let mut scripts: Vec<PathBuf> = self
            .fs
            .read_dir(dir)?
            .into_iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == "bat") && self.fs.is_file(p))
            .collect();
        scripts.sort();
        Ok(scripts.into_iter().next())
    }

    /// File layout of an existing job, from its metadata script name.
    pub fn paths(&self, id: JobId) -> Result<Option<JobPaths>> {
        let dir = self.job_dir(id);
        if !self.fs.is_dir(&dir) {
            return Ok(None);
        }
        let Some(script) = self.find_metadata(&dir)? else {
            return Ok(None);
        };
        let base = script
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Some(JobPaths::new(dir, base)))
    }

    /// Parse one job; `None` if it has no directory or no usable metadata.
    pub fn load(&self, id: JobId) -> Result<Option<JobRecord>> {
        let Some(paths) = self.paths(id)? else {
            debug!(job = %id, "no job directory or metadata script; skipping");
            return Ok(None);
        };
        let meta = metadata::read(self.fs.as_ref(), &paths.metadata())?;
        let Some(engine) = meta
            .get(metadata::KEY_ENGINE)
            .and_then(|e| e.parse::<Engine>().ok())
        else {
            debug!(job = %id, "metadata names no known engine; skipping");
            return Ok(None);
        };

        let status = self.store.get_status(id)?;
        let failure = if status == Status::Failed {
            self.store.failure_reason(id)?
        } else {
            None
        };

        Ok(Some(record_from_metadata(id, engine, status, failure, &paths, &meta)))
    }

    /// Remove a job directory. Running jobs are refused.
    pub fn delete(&self, id: JobId) -> Result<()> {
        let dir = self.job_dir(id);
        if !self.fs.is_dir(&dir) {
            return Err(JobError::JobNotFound(id));
        }
        if self.store.get_status(id)? == Status::Running {
            return Err(JobError::JobBusy(id.to_string()));
        }
        self.fs.remove_dir_all(&dir)?;
        info!(job = %id, "job deleted");
        Ok(())
    }
}

fn record_from_metadata(
    id: JobId,
    engine: Engine,
    status: Status,
    failure: Option<crate::jobs::FailureReason>,
    paths: &JobPaths,
    meta: &Metadata,
) -> JobRecord {
    let field = |key: &str| meta.get(key).unwrap_or_default().to_string();
    JobRecord {
        id,
        engine,
        calculation: field(metadata::KEY_CALCULATION),
        description: field(metadata::KEY_DESCRIPTION),
        name: field(metadata::KEY_NAME),
        status,
        server_id: field(metadata::KEY_SERVER_ID),
        elapsed_secs: meta
            .get(metadata::KEY_TIME)
            .and_then(|t| t.parse().ok())
            .unwrap_or(0.0),
        failure,
        metadata_path: paths.metadata(),
        output_path: meta.output_path(),
    }
}
