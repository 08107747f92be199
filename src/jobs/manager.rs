// src/jobs/manager.rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::errors::{JobError, Result};
use crate::exec::{driver_for, CancelFlag, EventSender, JobResult, ProcessRunner, RunOutcome};
use crate::fs::FileSystem;
use crate::jobs::directory::JobDirectory;
use crate::jobs::metadata::{self, Metadata};
use crate::jobs::record::{JobRecord, JobRequest, JobSpec, QuantumParams, SimulationParams};
use crate::jobs::status::{StatusObserver, StatusStore};
use crate::jobs::{JobId, JobPaths, JOBS_DIR_NAME};
use crate::params::{read_parameter_sets, write_parameter_sets, ParameterSet};
use crate::structure::StructureModel;
use crate::types::{Engine, Status};

/// Entry point for everything job related. Constructed explicitly and
/// passed around; nothing here is global.
pub struct JobManager {
    config: ConfigFile,
    fs: Arc<dyn FileSystem>,
    directory: JobDirectory,
    active: Mutex<Option<JobId>>,
}

/// Holds the in-process active-job slot until dropped.
struct ActiveSlot<'a>(&'a Mutex<Option<JobId>>);

impl Drop for ActiveSlot<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl JobManager {
    pub fn new(config: ConfigFile, fs: Arc<dyn FileSystem>) -> Self {
        let jobs_dir = config.root().join(JOBS_DIR_NAME);
        let directory = JobDirectory::new(
            fs.clone(),
            jobs_dir,
            config.jobs.first_job_id,
            config.jobs.id_persistence,
        );
        Self {
            config,
            fs,
            directory,
            active: Mutex::new(None),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StatusObserver>) -> Self {
        self.directory.store_mut().add_observer(observer);
        self
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn directory(&self) -> &JobDirectory {
        &self.directory
    }

    pub fn store(&self) -> &StatusStore {
        self.directory.store()
    }

    /// Simulation settings from `[engines.simulator]`.
    pub fn simulation_defaults(&self) -> SimulationParams {
        let sim = &self.config.engines.simulator;
        SimulationParams {
            frames: sim.frames,
            temperature: sim.temperature,
            steps_per_frame: sim.steps_per_frame,
            format: sim.format,
            output: None,
        }
    }

    /// Allocate a job, persist its metadata (and parameters) and return it
    /// as Queued.
    pub fn submit(&self, request: JobRequest) -> Result<JobRecord> {
        let (id, dir) = self.directory.allocate()?;
        if let Err(error) = self.persist(id, dir.clone(), &request) {
            warn!(job = %id, error = %error, "cannot persist job; removing its directory");
            if let Err(cleanup) = self.fs.remove_dir_all(&dir) {
                warn!(job = %id, error = %cleanup, "cannot remove job directory");
            }
            return Err(error);
        }
        info!(job = %id, engine = %request.spec.engine(), name = %request.name, "job submitted");
        self.load(id)
    }

    fn persist(&self, id: JobId, dir: PathBuf, request: &JobRequest) -> Result<()> {
        let spec = &request.spec;
        let paths = JobPaths::new(dir, spec.base_name(id));
        self.fs.create_dir_all(&paths.scratch())?;

        let description = if request.description.trim().is_empty() {
            default_description(spec)
        } else {
            request.description.clone()
        };

        let driver = driver_for(spec, &self.config.engines, paths.clone());
        let mut meta = Metadata::new()
            .with(metadata::KEY_NAME, &request.name)
            .with(metadata::KEY_ENGINE, spec.engine())
            .with(metadata::KEY_CALCULATION, spec.calculation())
            .with(metadata::KEY_DESCRIPTION, description)
            .with(metadata::KEY_SERVER_ID, spec.server_id())
            .with(metadata::KEY_JOB_ID, id)
            .with(metadata::KEY_TIME, "0.0");
        driver.describe(&mut meta);
        meta.set_command_line(driver.invocation().command_line());
        metadata::write(self.fs.as_ref(), &paths.metadata(), &meta)?;

        if let JobSpec::Quantum(q) = spec {
            let text = write_parameter_sets(std::slice::from_ref(&q.pset));
            self.fs.write(&paths.parameters(), text.as_bytes())?;
        }
        Ok(())
    }

    pub fn list(&self) -> Vec<JobRecord> {
        self.directory.list()
    }

    pub fn load(&self, id: JobId) -> Result<JobRecord> {
        self.directory.load(id)?.ok_or(JobError::JobNotFound(id))
    }

    pub fn status(&self, id: JobId) -> Result<Status> {
        self.store().get_status(id)
    }

    pub fn set_status(&self, id: JobId, status: Status) -> Result<()> {
        self.store().set_status(id, status)
    }

    pub fn delete(&self, id: JobId) -> Result<()> {
        if self.active_job() == Some(id) {
            return Err(JobError::JobBusy(id.to_string()));
        }
        self.directory.delete(id)
    }

    fn active_job(&self) -> Option<JobId> {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self, id: JobId) -> Result<ActiveSlot<'_>> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = *active {
            return Err(JobError::JobBusy(running.to_string()));
        }
        *active = Some(id);
        Ok(ActiveSlot(&self.active))
    }

    fn paths(&self, id: JobId) -> Result<JobPaths> {
        self.directory.paths(id)?.ok_or(JobError::JobNotFound(id))
    }

    /// Reconstruct the engine settings of a stored job.
    pub fn spec(&self, id: JobId) -> Result<JobSpec> {
        let record = self.load(id)?;
        let paths = self.paths(id)?;
        let meta = metadata::read(self.fs.as_ref(), &paths.metadata())?;

        match record.engine {
            Engine::MdSimulator => {
                let defaults = self.simulation_defaults();
                let parse_or = |key: &str, default: u32| {
                    meta.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
                };
                Ok(JobSpec::Simulation(SimulationParams {
                    frames: parse_or(metadata::KEY_FRAMES, defaults.frames),
                    temperature: parse_or(metadata::KEY_TEMPERATURE, defaults.temperature),
                    steps_per_frame: parse_or(metadata::KEY_STEPS_PER_FRAME, defaults.steps_per_frame),
                    format: meta
                        .get(metadata::KEY_FORMAT)
                        .and_then(|f| f.parse().ok())
                        .unwrap_or(defaults.format),
                    output: record.output_path.clone(),
                }))
            }
            Engine::QuantumChem => {
                let server = record
                    .server_id
                    .parse()
                    .unwrap_or(self.config.engines.quantum.server);
                let pset = if self.fs.is_file(&paths.parameters()) {
                    let text = self.fs.read_to_string(&paths.parameters())?;
                    read_parameter_sets(&text).into_iter().next().unwrap_or_default()
                } else {
                    warn!(job = %id, "no parameter file; using default parameters");
                    ParameterSet::default()
                };
                Ok(JobSpec::Quantum(QuantumParams { server, pset }))
            }
        }
    }

    /// Run job `id` to a terminal status.
    ///
    /// Only one job runs per root: a second concurrent `start` in this
    /// process, or any job already Running on disk, yields
    /// [`JobError::JobBusy`]. Completed and Failed jobs are re-queued first.
    pub async fn start(
        &self,
        id: JobId,
        model: &dyn StructureModel,
        events: EventSender,
        cancel: CancelFlag,
    ) -> Result<RunOutcome> {
        let _slot = self.claim(id)?;

        if let Some(running) = self.list().iter().find(|r| r.status == Status::Running) {
            return Err(JobError::JobBusy(running.id.to_string()));
        }

        let record = self.load(id)?;
        if record.status.is_terminal() {
            info!(job = %id, from = %record.status, "re-queueing job");
            self.store().set_status(id, Status::Queued)?;
        }

        let spec = self.spec(id)?;
        let driver = driver_for(&spec, &self.config.engines, self.paths(id)?);
        let runner = ProcessRunner::new(
            self.fs.clone(),
            self.store().clone(),
            self.config.runner.clone(),
            events,
            cancel,
        );
        runner.run(&record, driver.as_ref(), model).await
    }

    /// Energy and geometry of a Completed job.
    pub fn parse_result(&self, id: JobId, model: &dyn StructureModel) -> Result<JobResult> {
        let record = self.load(id)?;
        if record.status != Status::Completed {
            return Err(JobError::Parse {
                path: record.metadata_path,
                reason: format!("job {id} is {}; only completed jobs have results", record.status),
            });
        }
        let spec = self.spec(id)?;
        let driver = driver_for(&spec, &self.config.engines, self.paths(id)?);
        driver.parse_result(model).map_err(|e| JobError::Parse {
            path: driver.final_output(),
            reason: format!("{e:#}"),
        })
    }
}

fn default_description(spec: &JobSpec) -> String {
    match spec {
        JobSpec::Simulation(p) => format!("{} frames at {} K", p.frames, p.temperature),
        JobSpec::Quantum(q) => q.pset.summary("/", q.server),
    }
}
