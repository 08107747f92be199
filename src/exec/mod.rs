// src/exec/mod.rs

//! Engine process execution.
//!
//! - [`engine`] describes how each engine is invoked ([`EngineDriver`]).
//! - [`runner`] spawns the process, polls it and classifies the result.
//! - [`progress`] turns output sizes into progress fractions and owns the
//!   busy indicator.
//!
//! The runner reports through an unbounded channel of [`JobEvent`]s so a
//! slow consumer never stalls the poll loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::jobs::JobId;
use crate::types::Status;

pub mod engine;
pub mod progress;
pub mod runner;

pub use engine::{driver_for, EngineDriver, Invocation, JobResult};
pub use progress::{BusyGuard, ProgressTracker};
pub use runner::ProcessRunner;

/// How a run ended. Cancellation is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

/// Notifications emitted while a job runs.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Status { job: JobId, status: Status },
    /// `None` when the engine gives no size estimate.
    Progress { job: JobId, fraction: Option<f64> },
    Busy(bool),
}

pub type EventSender = mpsc::UnboundedSender<JobEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<JobEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Shared abort request, checked once per poll tick.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
