//! Process handle for worker subprocesses.

use super::signals::{TerminationReason, analyze_wait_status};
use crate::error::{GenAbcError, Result};
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{WaitPidFlag, waitpid};
use nix::unistd::Pid;

/// A running worker process as seen by the pool.
///
/// This is the seam between the pool's scheduling loop and the operating
/// system: the pool only polls for termination and, on timeout, kills.
pub trait WorkerProcess {
    /// OS process id.
    fn id(&self) -> u32;

    /// Non-blocking termination check.
    ///
    /// Returns `None` while the process is still running.
    fn try_wait(&mut self) -> Result<Option<TerminationReason>>;

    /// Forcefully stop the process and reap it.
    fn kill(&mut self) -> Result<()>;
}

/// Handle to a spawned worker subprocess.
pub struct Proc {
    /// Process ID
    pid: Pid,
    /// Whether the process has been reaped
    reaped: bool,
}

impl Proc {
    /// Create from a spawned `std::process::Child`.
    ///
    /// The child must not be waited on through `std` afterwards; the handle
    /// reaps it with `waitpid`.
    pub fn from_child(child: &std::process::Child) -> Self {
        Self {
            pid: Pid::from_raw(child.id() as i32),
            reaped: false,
        }
    }

    /// Wait for the process to exit (blocking).
    pub fn wait(&mut self) -> Result<TerminationReason> {
        if self.reaped {
            return Err(GenAbcError::Worker("Process already reaped".into()));
        }
        let status = waitpid(self.pid, None)
            .map_err(|e| GenAbcError::Worker(format!("waitpid failed: {}", e)))?;
        self.reaped = true;
        Ok(analyze_wait_status(status).unwrap_or(TerminationReason::Unknown))
    }

    /// Send SIGKILL to the process and to its process group.
    ///
    /// Workers are spawned as group leaders, so this also reaches the
    /// compiler they started. A process that leads no group only gets the
    /// direct signal.
    fn kill_group(&self) -> nix::Result<()> {
        let _ = signal::killpg(self.pid, Signal::SIGKILL);
        signal::kill(self.pid, Signal::SIGKILL)
    }
}

impl WorkerProcess for Proc {
    fn id(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    fn try_wait(&mut self) -> Result<Option<TerminationReason>> {
        if self.reaped {
            return Err(GenAbcError::Worker("Process already reaped".into()));
        }
        let status = waitpid(self.pid, Some(WaitPidFlag::WNOHANG))
            .map_err(|e| GenAbcError::Worker(format!("waitpid failed: {}", e)))?;
        let reason = analyze_wait_status(status);
        if reason.is_some() {
            self.reaped = true;
        }
        Ok(reason)
    }

    fn kill(&mut self) -> Result<()> {
        if self.reaped {
            return Ok(());
        }
        self.kill_group()
            .map_err(|e| GenAbcError::Worker(format!("Failed to send SIGKILL: {}", e)))?;
        self.wait()?;
        Ok(())
    }
}

impl Drop for Proc {
    fn drop(&mut self) {
        // Only reached unreaped when the pool unwinds mid-batch.
        if !self.reaped {
            let _ = self.kill_group();
            let _ = waitpid(self.pid, None);
            self.reaped = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};
    use std::time::Duration;

    fn spawn(program: &str, args: &[&str]) -> Proc {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .expect("Failed to spawn");
        Proc::from_child(&child)
    }

    #[test]
    fn test_wait_reports_exit_code() {
        let mut proc = spawn("sh", &["-c", "exit 3"]);
        assert_eq!(proc.wait().unwrap(), TerminationReason::Exited(3));
        // Second wait is an error, the process is gone
        assert!(proc.wait().is_err());
    }

    #[test]
    fn test_try_wait_running_then_done() {
        let mut proc = spawn("sleep", &["60"]);
        assert_eq!(proc.try_wait().unwrap(), None);

        signal::kill(proc.pid, Signal::SIGTERM).expect("Failed to send SIGTERM");
        let mut reason = None;
        for _ in 0..200 {
            reason = proc.try_wait().unwrap();
            if reason.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(reason, Some(TerminationReason::Signaled(Signal::SIGTERM)));
    }

    #[test]
    fn test_kill_reaps() {
        let mut proc = spawn("sleep", &["60"]);
        proc.kill().expect("Failed to kill");
        assert!(proc.try_wait().is_err());
        // Killing again is a no-op
        proc.kill().unwrap();
    }
}
