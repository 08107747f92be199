// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable that overrides `[jobs].root`.
pub const ROOT_ENV: &str = "SIMJOB_ROOT";

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// the checked `ConfigFile`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation, then apply
/// environment overrides.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(apply_env_overrides(config))
}

/// Like [`load_and_validate`], but a missing file yields the defaults.
///
/// A file that exists but does not parse or validate is still an error.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(config = ?path, "config file not found; using defaults");
        return Ok(apply_env_overrides(ConfigFile::default()));
    }
    load_and_validate(path)
}

fn apply_env_overrides(config: ConfigFile) -> ConfigFile {
    match std::env::var_os(ROOT_ENV) {
        Some(root) if !root.is_empty() => config.with_root(PathBuf::from(root)),
        _ => config,
    }
}

/// Default config path: `simjob.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("simjob.toml")
}
