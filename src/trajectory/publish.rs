// src/trajectory/publish.rs

use std::path::Path;

use tracing::{debug, warn};

use crate::errors::{JobError, Result};
use crate::fs::FileSystem;

/// Make a finished output file visible under its final name.
///
/// Whatever already sits at `final_path` is removed first (last writer
/// wins). The move is a rename; across filesystems it degrades to copy then
/// remove.
pub fn publish(fs: &dyn FileSystem, temp_path: &Path, final_path: &Path) -> Result<()> {
    let publish_err = |reason: String| JobError::Publish {
        from: temp_path.to_path_buf(),
        to: final_path.to_path_buf(),
        reason,
    };

    if !fs.is_file(temp_path) {
        return Err(publish_err("temporary output does not exist".to_string()));
    }

    if fs.exists(final_path) {
        debug!(path = ?final_path, "removing previous output before publish");
        fs.remove_file(final_path)
            .map_err(|e| publish_err(format!("cannot remove existing file: {e:#}")))?;
    }

    if let Some(parent) = final_path.parent() {
        if !parent.as_os_str().is_empty() && !fs.is_dir(parent) {
            fs.create_dir_all(parent)
                .map_err(|e| publish_err(format!("{e:#}")))?;
        }
    }

    if let Err(rename_err) = fs.rename(temp_path, final_path) {
        warn!(
            from = ?temp_path,
            to = ?final_path,
            error = %rename_err,
            "rename failed; falling back to copy"
        );
        fs.copy(temp_path, final_path)
            .map_err(|e| publish_err(format!("{e:#}")))?;
        fs.remove_file(temp_path)
            .map_err(|e| publish_err(format!("{e:#}")))?;
    }

    debug!(path = ?final_path, "output published");
    Ok(())
}
