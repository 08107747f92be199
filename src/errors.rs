// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Cancellation is deliberately absent: a user abort is reported as
//! [`crate::exec::RunOutcome::Cancelled`], not as an error.

use std::path::PathBuf;

use thiserror::Error;

use crate::jobs::JobId;
use crate::types::Status;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Cannot allocate job directory {path:?}: {source}")]
    Allocation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot launch executable {executable:?}: {source}")]
    Spawn {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Job {job} failed: {reason}")]
    RuntimeFailure { job: JobId, reason: String },

    #[error("Cannot publish {from:?} as {to:?}: {reason}")]
    Publish {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    #[error("Invalid status: {0} (expected Queued, Running, Completed, Suspended or Failed)")]
    InvalidStatus(String),

    #[error("Job {job}: transition {from} -> {to} is not allowed")]
    InvalidTransition { job: JobId, from: Status, to: Status },

    #[error("Job {0} is busy")]
    JobBusy(String),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parameter error: {0}")]
    Parameter(String),

    #[error("Cannot parse {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML encoding error: {0}")]
    TomlWriteError(#[from] toml::ser::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobError>;
