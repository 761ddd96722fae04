pub mod error;
pub mod git;
pub mod normalizer;
pub mod notebook;

pub use error::NotebookError;
pub use normalizer::{
    NormalizeOptions, NormalizeReport, Normalized, current_time, format_timestamp, normalize,
};
pub use notebook::{Cell, CellType, CodeCell, Notebook, Source, TextCell};

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

/// Parse notebook bytes and normalize them.
pub fn normalize_bytes(
    data: &[u8],
    now: DateTime<Utc>,
    options: &NormalizeOptions,
) -> Result<Normalized, NotebookError> {
    let notebook = Notebook::from_slice(data)?;
    normalize(notebook, now, options)
}

/// Normalize the notebook at `path`, rewriting the file only when its
/// canonical form changed.
pub fn normalize_file(
    path: impl AsRef<Path>,
    now: DateTime<Utc>,
    options: &NormalizeOptions,
) -> Result<Normalized, NotebookError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;

    let result = normalize_bytes(&data, now, options)?;
    if result.changed {
        std::fs::write(path, result.notebook.to_canonical_string()?)?;
        debug!(path = %path.display(), "rewrote notebook");
    }

    Ok(result)
}

/// Whether `path` has an `.ipynb` extension (case-insensitive).
pub fn is_notebook_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ipynb"))
}
