//! Worker subprocess main entry point.
//!
//! This module runs when `genabc worker` is invoked by the pool. It reads a
//! single parameter bundle from stdin, compiles its group and exits with 0 on
//! success or 1 on the first failure.

use super::protocol::{InvocationMode, WorkerParams};
use crate::error::{GenAbcError, Result};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Exit code reported for any failure inside the group.
const FAIL: i32 = 1;

/// Path the compiler writes for an input: `x.temp.js` becomes `x.temp.abc`.
fn compiled_path(input: &Path) -> PathBuf {
    input.with_extension("abc")
}

/// Final name of a compiled file: `x.temp.abc` becomes `x.abc`.
fn final_path(compiled: &Path) -> PathBuf {
    let name = compiled.to_string_lossy();
    match name.strip_suffix(".temp.abc") {
        Some(stem) => PathBuf::from(format!("{}.abc", stem)),
        None => compiled.to_path_buf(),
    }
}

/// Run the compiler on `inputs` and wait for it.
fn compile(params: &WorkerParams, inputs: &[PathBuf]) -> Result<()> {
    let mut cmd = params.command.to_command(inputs);
    debug!(
        group_index = params.group_index,
        command = %params.command.display(),
        inputs = inputs.len(),
        "Running compiler"
    );
    let status = cmd.status().map_err(|e| {
        GenAbcError::Worker(format!(
            "Failed to run compiler {}: {}",
            params.command.program.display(),
            e
        ))
    })?;
    if !status.success() {
        let files = inputs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(GenAbcError::Worker(format!(
            "Failed to convert file {} to abc ({})",
            files, status
        )));
    }
    Ok(())
}

/// Move the compiler output for `input` to its final name.
fn finalize(input: &Path) -> Result<()> {
    let compiled = compiled_path(input);
    if !compiled.is_file() {
        return Err(GenAbcError::MissingOutput(compiled));
    }
    let target = final_path(&compiled);
    if target != compiled {
        std::fs::rename(&compiled, &target)?;
    }
    Ok(())
}

/// Compile every input of a group, stopping at the first failure.
pub fn run_group(params: &WorkerParams) -> Result<()> {
    match params.command.mode {
        InvocationMode::PerFile => {
            for input in &params.inputs {
                compile(params, std::slice::from_ref(input))?;
                finalize(input)?;
            }
        }
        InvocationMode::Batched => {
            if params.inputs.is_empty() {
                return Ok(());
            }
            compile(params, &params.inputs)?;
            for input in &params.inputs {
                finalize(input)?;
            }
        }
    }
    Ok(())
}

fn read_params(reader: &mut impl BufRead) -> Result<WorkerParams> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(GenAbcError::Worker(
            "No parameters received on stdin".into(),
        ));
    }
    Ok(WorkerParams::from_line(&line)?)
}

/// Run the worker subprocess main function.
///
/// Never returns; the exit code is the worker's result.
pub fn run_worker_main() -> ! {
    let stdin = io::stdin();
    let result = read_params(&mut stdin.lock()).and_then(|params| {
        debug!(
            group_index = params.group_index,
            inputs = params.inputs.len(),
            "Worker received group"
        );
        run_group(&params)
    });

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!(error = %e, "Worker failed");
            std::process::exit(FAIL);
        }
    }
}
