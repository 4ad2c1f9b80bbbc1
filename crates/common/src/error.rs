//! Error types shared across Subburn crates.

use std::path::PathBuf;

/// Top-level error type for Subburn operations.
///
/// Compositing and time parsing never produce one of these: they fall back
/// to safe defaults locally. Only the export path and file handling surface
/// errors to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SubburnError {
    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("An export is already in progress")]
    ExportBusy,

    #[error("Playback error: {message}")]
    Playback { message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Project error: {message}")]
    Project { message: String },

    #[error("Transcript error: {message}")]
    Transcript { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SubburnError.
pub type SubburnResult<T> = Result<T, SubburnError>;

impl SubburnError {
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn transcript(msg: impl Into<String>) -> Self {
        Self::Transcript {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error came from the decode engine or the capture
    /// pipeline during an export run.
    pub fn is_export_failure(&self) -> bool {
        matches!(
            self,
            Self::Export { .. } | Self::Playback { .. } | Self::Capture { .. }
        )
    }
}
