//! Parameter bundle handed from the supervisor to a worker subprocess.
//!
//! The bundle is a single JSON line written to the worker's stdin. The worker
//! reports back only through its exit code.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// How the external compiler consumes a group's inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationMode {
    /// One compiler invocation per input file.
    #[default]
    PerFile,
    /// One compiler invocation with every input of the group appended.
    Batched,
}

/// The external compiler command prefix.
///
/// Renders as `<program> <args..> <input paths..>`, for example
/// `node --expose-gc /ark/build/src/index.js --debug /out/app.temp.js`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerCommand {
    /// Executable to run (usually the JavaScript runtime).
    pub program: PathBuf,
    /// Arguments placed before the input paths.
    pub args: Vec<String>,
    #[serde(default)]
    pub mode: InvocationMode,
}

impl CompilerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            mode: InvocationMode::PerFile,
        }
    }

    /// Build the command prefix for a compiler entry script.
    pub fn for_entry(
        runtime: impl Into<PathBuf>,
        runtime_args: &[String],
        entry: &Path,
        debug: bool,
    ) -> Self {
        let mut args = runtime_args.to_vec();
        args.push(entry.to_string_lossy().into_owned());
        if debug {
            args.push("--debug".to_string());
        }
        Self {
            program: runtime.into(),
            args,
            mode: InvocationMode::PerFile,
        }
    }

    pub fn with_mode(mut self, mode: InvocationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Build a `Command` for the given inputs.
    pub fn to_command<I, P>(&self, inputs: I) -> Command
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for input in inputs {
            cmd.arg(input.as_ref());
        }
        cmd
    }

    /// Human-readable rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything a worker needs to process its group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerParams {
    /// Index of the group in the partition (for logging).
    pub group_index: usize,
    /// Intermediate files assigned to this worker.
    pub inputs: Vec<PathBuf>,
    /// Compiler command prefix.
    pub command: CompilerCommand,
}

impl WorkerParams {
    /// Serialize to JSON line (with newline).
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Deserialize from JSON line.
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim())
    }
}
