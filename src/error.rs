// src/error.rs

//! Error types for the kitchen

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort a cooking run
///
/// Every variant is terminal for the run; nothing is retried.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O failure with a descriptive message
    #[error("I/O error: {0}")]
    IoError(String),

    /// Recipe, platform or metadata could not be parsed
    #[error("parse error: {0}")]
    ParseError(String),

    /// A declared dependency could not be resolved
    #[error("dependency resolution failed: {0}")]
    ResolutionError(String),

    /// Source archive could not be downloaded
    #[error("download failed: {0}")]
    DownloadError(String),

    /// Downloaded content did not match the recipe checksum
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// A patch directive's search text is absent from its target file
    #[error("patch mismatch in {file}: search text {search:?} not found")]
    PatchMismatch { file: String, search: String },

    /// A template referenced a variable the plan cannot supply
    #[error("missing template variable: {0}")]
    MissingVariable(String),

    /// An external build step exited unsuccessfully
    #[error("{step} failed with exit code {code:?}\n{stderr}")]
    BuildFailed {
        step: String,
        code: Option<i32>,
        stderr: String,
    },

    /// An external tool is not installed
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// System package installation failed
    #[error("system package installation failed: {0}")]
    SystemPackageError(String),

    /// Target already exists and would be clobbered
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Required file or directory is missing
    #[error("not found: {0}")]
    NotFound(String),

    /// Path escapes its containing directory
    #[error("path traversal rejected: {0}")]
    PathTraversal(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(format!("JSON: {err}"))
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Self::IoError(format!("directory walk failed: {err}"))
    }
}
