//! Batch orchestration: partition, dispatch, await, clean up.

use super::partition::partition;
use super::pool::{WorkerHandle, WorkerPool};
use super::registry::{Artifact, ArtifactRegistry};
use super::spawn::Launcher;
use crate::context::BatchContext;
use crate::error::{GenAbcError, Result};
use crate::paths::remove_file_best_effort;
use std::path::PathBuf;
use tracing::{error, info, instrument, warn};

/// Artifacts produced for one batch, plus soft errors hit while producing them.
///
/// Dropping a batch deletes every registered artifact from disk, so cleanup
/// happens on every exit path, including early returns and panics.
#[derive(Debug, Default)]
pub struct Batch {
    registry: ArtifactRegistry,
    errors: Vec<GenAbcError>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an intermediate file that already exists on disk.
    pub fn register(&mut self, path: impl Into<PathBuf>, size: u64) -> Result<()> {
        self.registry.register(path, size)
    }

    /// Register an intermediate file, measuring its size on disk.
    ///
    /// A missing file is recorded as a soft error and not registered.
    pub fn register_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {
                if let Err(e) = self.registry.register(path, meta.len()) {
                    self.record_error(e);
                }
            }
            _ => self.record_error(GenAbcError::MissingOutput(path)),
        }
    }

    /// Record a failure that does not stop the batch but fails its outcome.
    pub fn record_error(&mut self, err: GenAbcError) {
        error!(error = %err, "Batch error");
        self.errors.push(err);
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    pub fn errors(&self) -> &[GenAbcError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        let artifacts = std::mem::take(&mut self.registry).into_artifacts();
        cleanup(&artifacts);
    }
}

/// Delete artifacts from disk. Files that are already gone are skipped.
fn cleanup(artifacts: &[Artifact]) {
    if artifacts.is_empty() {
        return;
    }
    let removed = artifacts
        .iter()
        .filter(|a| remove_file_best_effort(a.path()))
        .count();
    info!(
        removed,
        registered = artifacts.len(),
        "Removed intermediate files"
    );
}

/// Result of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: bool,
}

impl BatchOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded { 0 } else { 1 }
    }
}

/// Runs batches: partitions artifacts, supervises workers, cleans up.
pub struct BatchSupervisor<'a, L> {
    ctx: &'a BatchContext,
    pool: WorkerPool<L>,
}

impl<'a, L: Launcher> BatchSupervisor<'a, L> {
    pub fn new(ctx: &'a BatchContext, launcher: L) -> Self {
        Self {
            ctx,
            pool: WorkerPool::new(launcher, ctx.pool_config()),
        }
    }

    /// Compile every artifact in the batch and delete the intermediates.
    ///
    /// Succeeds only if every worker exited with code 0 and no soft error was
    /// recorded on the batch. Artifacts are deleted after the last worker has
    /// terminated, whatever the outcome.
    #[instrument(level = "debug", skip_all, fields(artifacts = batch.registry().len()))]
    pub fn execute_batch(&self, batch: Batch) -> BatchOutcome {
        let prior_errors = batch.errors().len();
        if batch.is_empty() {
            info!("No intermediate files to compile");
            return BatchOutcome {
                succeeded: prior_errors == 0,
            };
        }

        let groups = partition(batch.registry().all(), self.ctx.max_workers);
        info!(
            files = batch.registry().len(),
            total_size = batch.registry().total_size(),
            groups = groups.len(),
            command = %self.ctx.command.display(),
            "Compiling intermediate files"
        );

        let handles = self.pool.run(&groups, &self.ctx.command);
        let failed: Vec<&WorkerHandle> = handles.iter().filter(|h| !h.succeeded()).collect();

        // All workers have terminated; the artifacts can go.
        drop(batch);

        for handle in &failed {
            warn!(
                group_index = handle.group_index(),
                exit_code = handle.exit_code(),
                "Worker group failed"
            );
        }

        let succeeded = failed.is_empty() && prior_errors == 0;
        if succeeded {
            info!(workers = handles.len(), "All workers succeeded");
        } else {
            error!(
                workers = handles.len(),
                failed_workers = failed.len(),
                prior_errors,
                "Batch failed"
            );
        }
        BatchOutcome { succeeded }
    }
}
