//! Per-invocation configuration shared by every batch operation.

use crate::dispatch::{CompilerCommand, DEFAULT_MAX_WORKERS, WorkerPoolConfig};
use crate::error::{GenAbcError, Result};
use crate::paths::validate_file_path_length;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Everything a batch needs to know, built once per invocation.
#[derive(Debug, Clone)]
pub struct BatchContext {
    /// Directory intermediate files are written to.
    pub output_dir: PathBuf,
    /// Compiler command prefix handed to every worker.
    pub command: CompilerCommand,
    /// Upper bound on groups and on concurrently running workers.
    pub max_workers: usize,
    /// Per-worker timeout; `None` waits forever.
    pub worker_timeout: Option<Duration>,
    shutdown: Arc<AtomicBool>,
}

impl BatchContext {
    pub fn new(output_dir: impl Into<PathBuf>, command: CompilerCommand) -> Self {
        Self {
            output_dir: output_dir.into(),
            command,
            max_workers: DEFAULT_MAX_WORKERS,
            worker_timeout: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.worker_timeout = timeout;
        self
    }

    /// Get a clone of the shutdown flag for signal handling.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Request that a running batch stop its workers and clean up.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn pool_config(&self) -> WorkerPoolConfig {
        WorkerPoolConfig {
            max_workers: self.max_workers,
            timeout: self.worker_timeout,
            shutdown: self.shutdown_flag(),
            ..Default::default()
        }
    }
}

/// Name of the dependency directory that must exist in the compiler build.
const NODE_MODULES: &str = "node_modules";

/// An installed bytecode compiler build directory (e.g. `ark/build`).
///
/// The directory is supplied by configuration; the platform-specific variants
/// (`build`, `build-win`, `build-mac`) are chosen by whoever configures it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInstall {
    build_dir: PathBuf,
}

impl CompilerInstall {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
        }
    }

    /// Path to the compiler entry script.
    pub fn entry(&self) -> PathBuf {
        self.build_dir.join("src").join("index.js")
    }

    /// Verify the compiler's runtime dependencies are installed.
    pub fn check(&self) -> Result<()> {
        let node_modules = self.build_dir.join(NODE_MODULES);
        validate_file_path_length(&node_modules)?;
        if !node_modules.is_dir() {
            return Err(GenAbcError::Precondition(format!(
                "node_modules for ark compiler not found. Please make sure to switch to a \
                 non-root user before running \"npm install\" and re-run \"npm install\" under {}",
                self.build_dir.display()
            )));
        }
        let entry = self.entry();
        validate_file_path_length(&entry)?;
        debug!(entry = %entry.display(), "Compiler installation found");
        Ok(())
    }
}
