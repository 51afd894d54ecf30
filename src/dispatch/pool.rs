//! Bounded pool of worker subprocesses.
//!
//! Runs one worker per non-empty group with at most `max_workers` alive at a
//! time. The pool is driven from a single thread: it polls worker exit status
//! serially, so outcome bookkeeping needs no locking. A failed worker never
//! stops its siblings and is never retried.
//!
//! When the shared shutdown flag is raised, the pool kills every running
//! worker, starts no more and returns; unstarted groups resolve as
//! [`TerminationReason::Interrupted`].

use super::partition::Group;
use super::proc::WorkerProcess;
use super::protocol::{CompilerCommand, WorkerParams};
use super::signals::TerminationReason;
use super::spawn::Launcher;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Default upper bound on concurrently running workers.
pub const DEFAULT_MAX_WORKERS: usize = 3;

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Maximum number of worker processes alive at once.
    pub max_workers: usize,
    /// Kill a worker that runs longer than this. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Delay between exit-status polls when no worker finished.
    pub poll_interval: Duration,
    /// Raised by the Ctrl+C handler to stop the batch.
    pub shutdown: Arc<AtomicBool>,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            timeout: None,
            poll_interval: Duration::from_millis(10),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Lifecycle record of one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    group_index: usize,
    pid: Option<u32>,
    termination: Option<TerminationReason>,
}

impl WorkerHandle {
    fn new(group_index: usize, pid: Option<u32>) -> Self {
        Self {
            group_index,
            pid,
            termination: None,
        }
    }

    /// Record how the worker ended. Only the first call has an effect.
    fn resolve(&mut self, reason: TerminationReason) {
        if self.termination.is_none() {
            self.termination = Some(reason);
        }
    }

    pub fn group_index(&self) -> usize {
        self.group_index
    }

    /// OS process id, `None` if the worker never started.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn termination(&self) -> Option<&TerminationReason> {
        self.termination.as_ref()
    }

    /// Exit code once the worker has terminated.
    pub fn exit_code(&self) -> Option<i32> {
        self.termination.as_ref().and_then(TerminationReason::exit_code)
    }

    pub fn succeeded(&self) -> bool {
        self.termination
            .as_ref()
            .is_some_and(TerminationReason::is_success)
    }
}

struct Running<P> {
    handle: WorkerHandle,
    process: P,
    started: Instant,
}

/// A pool of worker subprocesses, one per group.
pub struct WorkerPool<L> {
    launcher: L,
    config: WorkerPoolConfig,
}

impl<L: Launcher> WorkerPool<L> {
    pub fn new(launcher: L, config: WorkerPoolConfig) -> Self {
        Self { launcher, config }
    }

    /// Run one worker per non-empty group and wait for all of them.
    ///
    /// Returns one handle per non-empty group, ordered by group index, each
    /// resolved with its termination reason. Blocks until every spawned
    /// worker has terminated.
    #[instrument(level = "debug", skip_all, fields(groups = groups.len()))]
    pub fn run(&self, groups: &[Group], command: &CompilerCommand) -> Vec<WorkerHandle> {
        let max_workers = self.config.max_workers.max(1);
        let mut pending: VecDeque<(usize, &Group)> = groups
            .iter()
            .enumerate()
            .filter(|(_, group)| !group.is_empty())
            .collect();
        let mut running: Vec<Running<L::Process>> = Vec::with_capacity(max_workers);
        let mut finished: Vec<WorkerHandle> = Vec::with_capacity(pending.len());

        info!(
            workers = pending.len().min(max_workers),
            groups = pending.len(),
            "Dispatching groups to workers"
        );

        loop {
            if self.config.shutdown.load(Ordering::SeqCst) {
                self.interrupt(&mut pending, &mut running, &mut finished);
                break;
            }

            while running.len() < max_workers {
                let Some((group_index, group)) = pending.pop_front() else {
                    break;
                };
                match self.spawn(group_index, group, command) {
                    Ok(worker) => running.push(worker),
                    Err(handle) => finished.push(handle),
                }
            }

            if running.is_empty() {
                break;
            }

            if !self.reap(&mut running, &mut finished) {
                std::thread::sleep(self.config.poll_interval);
            }
        }

        finished.sort_by_key(WorkerHandle::group_index);
        finished
    }

    fn spawn(
        &self,
        group_index: usize,
        group: &Group,
        command: &CompilerCommand,
    ) -> std::result::Result<Running<L::Process>, WorkerHandle> {
        let params = WorkerParams {
            group_index,
            inputs: group
                .artifacts()
                .iter()
                .map(|a| a.path().to_path_buf())
                .collect(),
            command: command.clone(),
        };

        match self.launcher.launch(&params) {
            Ok(process) => {
                debug!(
                    group_index,
                    pid = process.id(),
                    files = group.len(),
                    total_size = group.total_size(),
                    "Worker started"
                );
                Ok(Running {
                    handle: WorkerHandle::new(group_index, Some(process.id())),
                    process,
                    started: Instant::now(),
                })
            }
            Err(e) => {
                warn!(group_index, error = %e, "Failed to start worker");
                let mut handle = WorkerHandle::new(group_index, None);
                handle.resolve(TerminationReason::SpawnFailed(e.to_string()));
                Err(handle)
            }
        }
    }

    /// Collect every worker that has terminated. Returns whether any did.
    fn reap(
        &self,
        running: &mut Vec<Running<L::Process>>,
        finished: &mut Vec<WorkerHandle>,
    ) -> bool {
        let mut progressed = false;
        let mut i = 0;
        while i < running.len() {
            let worker = &mut running[i];
            let reason = match worker.process.try_wait() {
                Ok(Some(reason)) => Some(reason),
                Ok(None) => self.check_timeout(worker),
                Err(e) => {
                    warn!(group_index = worker.handle.group_index, error = %e, "Lost track of worker");
                    Some(TerminationReason::Unknown)
                }
            };

            match reason {
                Some(reason) => {
                    let mut worker = running.swap_remove(i);
                    log_termination(&worker.handle, &reason, worker.started.elapsed());
                    worker.handle.resolve(reason);
                    finished.push(worker.handle);
                    progressed = true;
                }
                None => i += 1,
            }
        }
        progressed
    }

    /// Kill every running worker and resolve every pending group.
    fn interrupt(
        &self,
        pending: &mut VecDeque<(usize, &Group)>,
        running: &mut Vec<Running<L::Process>>,
        finished: &mut Vec<WorkerHandle>,
    ) {
        warn!(
            running = running.len(),
            pending = pending.len(),
            "Shutdown requested, stopping workers"
        );
        for mut worker in running.drain(..) {
            if let Err(e) = worker.process.kill() {
                warn!(group_index = worker.handle.group_index, error = %e, "Failed to kill worker");
            }
            worker.handle.resolve(TerminationReason::Interrupted);
            finished.push(worker.handle);
        }
        for (group_index, _) in pending.drain(..) {
            let mut handle = WorkerHandle::new(group_index, None);
            handle.resolve(TerminationReason::Interrupted);
            finished.push(handle);
        }
    }

    fn check_timeout(&self, worker: &mut Running<L::Process>) -> Option<TerminationReason> {
        let timeout = self.config.timeout?;
        if worker.started.elapsed() < timeout {
            return None;
        }
        warn!(
            group_index = worker.handle.group_index,
            pid = worker.process.id(),
            timeout_secs = timeout.as_secs_f64(),
            "Worker exceeded timeout, killing"
        );
        if let Err(e) = worker.process.kill() {
            warn!(group_index = worker.handle.group_index, error = %e, "Failed to kill worker");
        }
        Some(TerminationReason::TimedOut)
    }
}

fn log_termination(handle: &WorkerHandle, reason: &TerminationReason, elapsed: Duration) {
    if reason.is_success() {
        debug!(
            group_index = handle.group_index,
            pid = handle.pid,
            elapsed_ms = elapsed.as_millis(),
            "Worker finished"
        );
    } else {
        warn!(
            group_index = handle.group_index,
            pid = handle.pid,
            reason = %reason,
            elapsed_ms = elapsed.as_millis(),
            "Worker failed"
        );
    }
}
