//! Error types for playfit-av.

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while analyzing or remediating a media file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source could not be probed or its probe output was malformed.
    #[error("probe failed for {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    /// The transform tool exited non-zero.
    #[error("{mode} transform failed: {message}")]
    Transform { mode: String, message: String },

    /// An artifact was produced but is not trustworthy.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A rename, copy or ownership change failed while committing.
    #[error("filesystem error: {0}")]
    Filesystem(String),

    /// Subtitle OCR failed.
    #[error("OCR failed: {0}")]
    Ocr(String),

    /// Subtitle OCR exceeded its time budget.
    #[error("OCR timed out after {}s", timeout.as_secs())]
    OcrTimeout { timeout: Duration },

    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool was killed after exceeding its deadline.
    #[error("{tool} timed out after {}s", timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a probe error.
    pub fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a transform error.
    pub fn transform(mode: impl ToString, message: impl Into<String>) -> Self {
        Self::Transform {
            mode: mode.to_string(),
            message: message.into(),
        }
    }

    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }
}

/// Keep only the last `max` characters of tool diagnostics.
pub fn tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    text.chars().skip(count - max).collect()
}
