// src/exec/runner.rs

//! Runs one job's engine process to completion or cancellation.

use std::collections::VecDeque;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::RunnerSection;
use crate::errors::{JobError, Result};
use crate::exec::engine::{EngineDriver, Invocation};
use crate::exec::progress::{BusyGuard, ProgressTracker};
use crate::exec::{CancelFlag, EventSender, JobEvent, RunOutcome};
use crate::fs::FileSystem;
use crate::jobs::metadata;
use crate::jobs::{FailureReason, JobId, JobRecord, StatusStore};
use crate::structure::StructureModel;
use crate::trajectory::publish;
use crate::types::Status;

/// How long to wait for the stderr reader after the process has exited.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Drives an engine process for one job.
///
/// Status goes through the [`StatusStore`]; progress, status and busy
/// changes are also sent as [`JobEvent`]s. Output files are inspected
/// through `fs`, which therefore has to be backed by the real disk.
pub struct ProcessRunner {
    fs: Arc<dyn FileSystem>,
    store: StatusStore,
    settings: RunnerSection,
    events: EventSender,
    cancel: CancelFlag,
}

impl ProcessRunner {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        store: StatusStore,
        settings: RunnerSection,
        events: EventSender,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            fs,
            store,
            settings,
            events,
            cancel,
        }
    }

    /// Run `record` with `driver`.
    ///
    /// Returns `Ok` with the outcome once the job reached a terminal status.
    /// `Err` means the job could not be run at all (spawn, filesystem or
    /// publish failure); the job is marked Failed in that case too, so a
    /// failed run never leaves a Running marker behind.
    pub async fn run(
        &self,
        record: &JobRecord,
        driver: &dyn EngineDriver,
        model: &dyn StructureModel,
    ) -> Result<RunOutcome> {
        let _busy = BusyGuard::new(self.events.clone());
        let started = Instant::now();
        let id = record.id;

        self.transition(id, Status::Running)?;
        let outcome = match self.run_engine(id, driver, model).await {
            Err(error) if self.store.get_status(id).ok() == Some(Status::Running) => {
                if let Err(mark) = self.fail(id, FailureReason::Error(error.to_string())) {
                    warn!(job = %id, error = %mark, "cannot mark job failed");
                }
                Err(error)
            }
            other => other,
        };

        let elapsed = started.elapsed().as_secs_f64();
        if let Err(error) =
            metadata::update_elapsed(self.fs.as_ref(), &record.metadata_path, elapsed)
        {
            warn!(job = %id, error = %error, "cannot record elapsed time");
        }

        match &outcome {
            Ok(result) => info!(job = %id, ?result, elapsed, "job finished"),
            Err(error) => warn!(job = %id, error = %error, elapsed, "job aborted"),
        }
        outcome
    }

    async fn run_engine(
        &self,
        id: JobId,
        driver: &dyn EngineDriver,
        model: &dyn StructureModel,
    ) -> Result<RunOutcome> {
        let invocation = driver.invocation();
        let work_output = driver.work_output();

        if let Err(error) = driver.prepare_input(model) {
            let reason = format!("cannot write engine input: {error:#}");
            self.fail(id, FailureReason::Error(reason.clone()))?;
            return Err(JobError::RuntimeFailure { job: id, reason });
        }

        if self.fs.exists(&work_output) {
            debug!(job = %id, path = ?work_output, "removing stale output");
            self.fs.remove_file(&work_output)?;
        }

        let mut tracker = ProgressTracker::new(driver.expected_output_size(model));
        let scratch = driver.paths().scratch();
        self.fs.create_dir_all(&scratch)?;

        let stdout = match &invocation.stdout {
            Some(path) => match std::fs::File::create(path) {
                Ok(file) => Some(file),
                Err(error) => {
                    let reason = format!("cannot create engine output {}: {error}", path.display());
                    self.fail(id, FailureReason::Error(reason.clone()))?;
                    return Err(JobError::RuntimeFailure { job: id, reason });
                }
            },
            None => None,
        };

        info!(
            job = %id,
            cmd = %invocation.command_line(),
            expected_bytes = ?tracker.expected(),
            "starting engine process"
        );

        let mut child = match spawn(&invocation, &scratch, stdout) {
            Ok(child) => child,
            Err(source) => {
                let reason = format!("cannot launch {}: {source}", invocation.program.display());
                self.fail(id, FailureReason::Error(reason))?;
                return Err(JobError::Spawn {
                    executable: invocation.program.clone(),
                    source,
                });
            }
        };

        let stderr_tail = child
            .stderr
            .take()
            .map(|stderr| read_stderr(id, stderr, self.settings.stderr_tail_lines));

        let mut ticker = tokio::time::interval(self.settings.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            ticker.tick().await;

            let fraction = tracker.update(self.fs.file_len(&work_output));
            self.emit(JobEvent::Progress { job: id, fraction });

            if self.cancel.is_cancelled() {
                info!(job = %id, "cancellation requested; terminating engine");
                terminate(&mut child, self.settings.kill_grace()).await;
                self.discard(id, &work_output);
                self.fail(id, FailureReason::Cancelled)?;
                return Ok(RunOutcome::Cancelled);
            }

            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(error) => {
                    let reason = format!("lost track of engine process: {error}");
                    self.fail(id, FailureReason::Error(reason.clone()))?;
                    return Err(JobError::RuntimeFailure { job: id, reason });
                }
            }
        };

        let tail = collect_tail(stderr_tail).await;
        info!(
            job = %id,
            exit_code = ?exit.code(),
            success = exit.success(),
            "engine process exited"
        );

        if !exit.success() {
            let mut reason = describe_exit(&invocation.program, exit);
            if !tail.is_empty() {
                reason.push_str(": ");
                reason.push_str(&tail.join(" | "));
            }
            self.fail(id, FailureReason::Error(reason.clone()))?;
            return Ok(RunOutcome::Failed(reason));
        }

        if !matches!(self.fs.file_len(&work_output), Some(len) if len > 0) {
            let reason = format!(
                "{} exited successfully but wrote no output to {}",
                invocation.program.display(),
                work_output.display()
            );
            self.fail(id, FailureReason::Error(reason.clone()))?;
            return Ok(RunOutcome::Failed(reason));
        }

        if driver.publishes() {
            if let Err(error) = publish(self.fs.as_ref(), &work_output, &driver.final_output()) {
                self.fail(id, FailureReason::Error(error.to_string()))?;
                return Err(error);
            }
        }

        self.emit(JobEvent::Progress {
            job: id,
            fraction: Some(1.0),
        });
        self.transition(id, Status::Completed)?;
        Ok(RunOutcome::Completed)
    }

    fn transition(&self, id: JobId, status: Status) -> Result<()> {
        self.store.set_status(id, status)?;
        self.emit(JobEvent::Status { job: id, status });
        Ok(())
    }

    fn fail(&self, id: JobId, reason: FailureReason) -> Result<()> {
        self.store.fail(id, &reason)?;
        self.emit(JobEvent::Status {
            job: id,
            status: Status::Failed,
        });
        Ok(())
    }

    fn emit(&self, event: JobEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.events.send(event);
    }

    /// Remove partial output after a cancelled run.
    fn discard(&self, id: JobId, partial: &Path) {
        if self.fs.exists(partial) {
            match self.fs.remove_file(partial) {
                Ok(()) => debug!(job = %id, path = ?partial, "partial output discarded"),
                Err(error) => warn!(job = %id, error = %error, "cannot discard partial output"),
            }
        }
    }
}

fn spawn(
    invocation: &Invocation,
    scratch: &Path,
    stdout: Option<std::fs::File>,
) -> std::io::Result<Child> {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .current_dir(scratch)
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match stdout {
        Some(file) => cmd.stdout(Stdio::from(file)),
        None => cmd.stdout(Stdio::null()),
    };

    cmd.spawn()
}

/// Consume stderr so the pipe never fills; keep the last `keep` lines.
fn read_stderr(job: JobId, stderr: ChildStderr, keep: usize) -> JoinHandle<VecDeque<String>> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail = VecDeque::with_capacity(keep);
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(job = %job, "stderr: {}", line);
            if keep == 0 || line.trim().is_empty() {
                continue;
            }
            if tail.len() == keep {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        tail
    })
}

async fn collect_tail(reader: Option<JoinHandle<VecDeque<String>>>) -> Vec<String> {
    let Some(reader) = reader else {
        return Vec::new();
    };
    match tokio::time::timeout(STDERR_DRAIN_TIMEOUT, reader).await {
        Ok(Ok(tail)) => tail.into_iter().collect(),
        _ => Vec::new(),
    }
}

fn describe_exit(program: &Path, status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("{} exited with code {code}", program.display());
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("{} terminated by signal {signal}", program.display());
        }
    }
    format!("{} exited abnormally", program.display())
}

/// Ask politely, then force.
#[cfg_attr(not(unix), allow(unused_variables))]
async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: signals our own, not yet reaped, child process.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc == 0 {
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(?status, "engine exited after SIGTERM");
                    return;
                }
                Ok(Err(error)) => warn!(error = %error, "waiting for engine after SIGTERM"),
                Err(_) => warn!(grace_ms = grace.as_millis() as u64, "engine ignored SIGTERM; killing"),
            }
        }
    }

    if let Err(error) = child.kill().await {
        warn!(error = %error, "failed to kill engine process");
    }
}
