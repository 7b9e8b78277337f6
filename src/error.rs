//! Error taxonomy shared by every tool
//!
//! Batch operations never surface these as a top-level failure; they are
//! attached to the per-module entry instead. Single-module tools convert a
//! [`ToolError`] into a `{success: false, error, message}` response.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Machine-readable error code, serialized as its variant name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    ParseError,
    NotARepository,
    NetworkError,
    MergeConflict,
    MissingCommitMessage,
    SubprocessError,
    Cancelled,
    Conflict,
    InvalidArgument,
    IoError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::NotARepository => "NotARepository",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::MergeConflict => "MergeConflict",
            ErrorKind::MissingCommitMessage => "MissingCommitMessage",
            ErrorKind::SubprocessError => "SubprocessError",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::IoError => "IoError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by single-module tools
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Module '{name}' not found")]
    NotFound { name: String, suggestions: Vec<String> },

    #[error("Module '{0}' already exists")]
    Conflict(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ToolError {
    pub fn not_found(name: impl Into<String>) -> Self {
        ToolError::NotFound {
            name: name.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::NotFound { .. } => ErrorKind::NotFound,
            ToolError::Conflict(_) => ErrorKind::Conflict,
            ToolError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ToolError::Parse { .. } => ErrorKind::ParseError,
            ToolError::Io(_) => ErrorKind::IoError,
            ToolError::Other(_) => ErrorKind::IoError,
        }
    }
}
