use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::NotebookError;

/// Add a rewritten notebook to the git index with `git add -- <path>`.
///
/// Runs in the current working directory, so `path` must be inside the
/// repository git finds from there.
pub fn stage(path: &Path) -> Result<(), NotebookError> {
    let stage_error = |reason: String| NotebookError::Stage {
        path: path.to_path_buf(),
        reason,
    };

    let output = Command::new("git")
        .arg("add")
        .arg("--")
        .arg(path)
        .output()
        .map_err(|e| stage_error(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(stage_error(format!(
            "git add exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    debug!(path = %path.display(), "staged notebook");
    Ok(())
}
