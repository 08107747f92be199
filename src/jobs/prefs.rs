// src/jobs/prefs.rs

//! `JobManager/preferences.toml`: the last-used job id.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::Result;
use crate::fs::FileSystem;

pub const PREFERENCES_FILE: &str = "preferences.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<u32>,
}

pub fn preferences_path(jobs_dir: &Path) -> PathBuf {
    jobs_dir.join(PREFERENCES_FILE)
}

/// Read the preferences; a missing or unreadable file counts as empty.
pub fn load(fs: &dyn FileSystem, jobs_dir: &Path) -> Preferences {
    let path = preferences_path(jobs_dir);
    if !fs.exists(&path) {
        return Preferences::default();
    }
    let parsed = fs
        .read_to_string(&path)
        .map_err(|e| format!("{e:#}"))
        .and_then(|text| toml::from_str(&text).map_err(|e| e.to_string()));
    match parsed {
        Ok(prefs) => prefs,
        Err(error) => {
            warn!(path = ?path, %error, "ignoring unreadable preferences file");
            Preferences::default()
        }
    }
}

pub fn save(fs: &dyn FileSystem, jobs_dir: &Path, prefs: &Preferences) -> Result<()> {
    let text = toml::to_string(prefs)?;
    fs.write(&preferences_path(jobs_dir), text.as_bytes())?;
    Ok(())
}
