// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{JobError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::JobError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.jobs, raw.runner, raw.engines))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_jobs(cfg)?;
    validate_runner(cfg)?;
    validate_engines(cfg)?;
    Ok(())
}

fn validate_jobs(cfg: &RawConfigFile) -> Result<()> {
    if let Some(root) = &cfg.jobs.root {
        if root.as_os_str().is_empty() {
            return Err(JobError::ConfigError(
                "[jobs].root must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_runner(cfg: &RawConfigFile) -> Result<()> {
    if cfg.runner.poll_interval_ms == 0 {
        return Err(JobError::ConfigError(
            "[runner].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_engines(cfg: &RawConfigFile) -> Result<()> {
    let sim = &cfg.engines.simulator;
    if sim.executable.as_os_str().is_empty() {
        return Err(JobError::ConfigError(
            "[engines.simulator].executable must not be empty".to_string(),
        ));
    }
    if sim.frames == 0 {
        return Err(JobError::ConfigError(
            "[engines.simulator].frames must be >= 1 (got 0)".to_string(),
        ));
    }
    if sim.steps_per_frame == 0 {
        return Err(JobError::ConfigError(
            "[engines.simulator].steps_per_frame must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.engines.quantum.executable.as_os_str().is_empty() {
        return Err(JobError::ConfigError(
            "[engines.quantum].executable must not be empty".to_string(),
        ));
    }
    Ok(())
}
