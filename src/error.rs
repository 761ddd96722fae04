use std::path::PathBuf;

/// Errors that can occur while reading, normalizing, or writing a notebook.
#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    #[error("malformed notebook: {reason}")]
    MalformedNotebook { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize notebook")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid UTF-8 content")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    #[error("failed to stage {}: {reason}", path.display())]
    Stage { path: PathBuf, reason: String },
}

impl NotebookError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        NotebookError::MalformedNotebook {
            reason: reason.into(),
        }
    }
}
