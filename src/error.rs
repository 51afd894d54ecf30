//! Error types for genabc.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for genabc.
#[derive(Error, Debug)]
pub enum GenAbcError {
    /// A required external dependency is missing before any worker is spawned.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("The length of path exceeds the maximum length: {max} ({len} characters): {path}")]
    PathLength { path: String, len: usize, max: usize },

    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    #[error("Unknown OS platform, cannot determine the maximum path length")]
    UnknownPlatform,

    #[error("Intermediate file is missing: {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("Artifact '{0}' is already registered")]
    DuplicateArtifact(String),

    #[error("{0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for genabc operations.
pub type Result<T> = std::result::Result<T, GenAbcError>;
