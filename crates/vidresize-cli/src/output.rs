//! Saving downloaded results.
//!
//! Bytes go to a temporary file in the destination directory first and are then
//! renamed into place, so an interrupted write never leaves a partial result
//! under the final name.

use std::io::Write;
use std::path::{Path, PathBuf};
use vidresize_core::{WorkflowError, WorkflowResult};

pub fn save_result(target: &Path, bytes: &[u8]) -> WorkflowResult<PathBuf> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let failed = |e: std::io::Error| {
        WorkflowError::Download(format!("Failed to save {}: {}", target.display(), e))
    };

    std::fs::create_dir_all(dir).map_err(failed)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(failed)?;
    tmp.write_all(bytes).map_err(failed)?;
    tmp.flush().map_err(failed)?;
    tmp.persist(target).map_err(|e| failed(e.error))?;

    tracing::debug!(path = %target.display(), size_bytes = bytes.len(), "Saved result");
    Ok(target.to_path_buf())
}
