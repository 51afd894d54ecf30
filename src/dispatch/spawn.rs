//! Worker subprocess spawning.
//!
//! Workers are started through `std::process::Command` and receive their
//! parameter bundle as one JSON line on stdin. Stdout and stderr are
//! inherited so compiler diagnostics reach the user directly. Each worker
//! leads its own process group.

use super::proc::{Proc, WorkerProcess};
use super::protocol::WorkerParams;
use crate::error::{GenAbcError, Result};
use crate::paths::validate_file_path_length;
use std::ffi::OsString;
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

/// Starts one worker process per group.
pub trait Launcher {
    type Process: WorkerProcess;

    /// Start a worker for the given parameter bundle.
    fn launch(&self, params: &WorkerParams) -> Result<Self::Process>;
}

/// Launches an executable and feeds it a [`WorkerParams`] line on stdin.
#[derive(Debug, Clone)]
pub struct WorkerLauncher {
    exe: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl WorkerLauncher {
    /// Launch `exe` with the given leading arguments.
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self {
            exe: exe.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Launch the running binary in hidden `worker` mode.
    pub fn current_exe() -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| {
            GenAbcError::Worker(format!("Failed to get current executable: {}", e))
        })?;
        Ok(Self::new(exe).arg("worker"))
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

impl Launcher for WorkerLauncher {
    type Process = Proc;

    fn launch(&self, params: &WorkerParams) -> Result<Proc> {
        validate_file_path_length(&self.exe)?;
        for input in &params.inputs {
            validate_file_path_length(input)?;
        }

        let mut cmd = Command::new(&self.exe);
        cmd.args(&self.args);
        cmd.envs(self.envs.iter().map(|(k, v)| (k, v)));
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        // Own process group: the pool kills the worker together with its
        // compiler, and a terminal Ctrl+C reaches only the supervisor.
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| GenAbcError::Worker(format!("Failed to spawn worker: {}", e)))?;
        let proc = Proc::from_child(&child);

        let line = params.to_line()?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| GenAbcError::Worker("Child stdin not captured".into()))?;
        // A worker that exits before reading surfaces through its exit status.
        if let Err(e) = stdin.write_all(line.as_bytes()) {
            debug!(
                group_index = params.group_index,
                error = %e,
                "Worker closed stdin before receiving parameters"
            );
        }
        drop(stdin);

        debug!(
            group_index = params.group_index,
            pid = proc.id(),
            inputs = params.inputs.len(),
            "Spawned worker"
        );
        Ok(proc)
    }
}
