//! Registry of intermediate artifacts awaiting compilation.

use crate::error::{GenAbcError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// An intermediate build output tracked for dispatch and cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    path: PathBuf,
    size: u64,
}

impl Artifact {
    /// Create a new artifact record.
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }

    /// Path of the intermediate file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file in bytes when it was registered.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Append-only collection of artifacts in emission order.
///
/// Artifacts are only removed by the batch cleanup guard, which consumes the
/// registry after every worker has terminated.
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    artifacts: Vec<Artifact>,
    seen: HashSet<PathBuf>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an artifact. Rejects a path that was already registered.
    pub fn register(&mut self, path: impl Into<PathBuf>, size: u64) -> Result<()> {
        let path = path.into();
        if !self.seen.insert(path.clone()) {
            return Err(GenAbcError::DuplicateArtifact(
                path.to_string_lossy().into_owned(),
            ));
        }
        self.artifacts.push(Artifact::new(path, size));
        Ok(())
    }

    /// All artifacts in registration order.
    pub fn all(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Sum of all registered sizes.
    pub fn total_size(&self) -> u64 {
        self.artifacts.iter().map(Artifact::size).sum()
    }

    pub(crate) fn into_artifacts(self) -> Vec<Artifact> {
        self.artifacts
    }
}
