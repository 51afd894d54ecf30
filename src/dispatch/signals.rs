//! Termination analysis for worker subprocesses.

use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;

/// Reason why a worker process terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// Normal exit with status code.
    Exited(i32),
    /// Killed by signal.
    Signaled(Signal),
    /// Killed by the pool after exceeding the worker timeout.
    TimedOut,
    /// Stopped, or never started, because shutdown was requested.
    Interrupted,
    /// The worker process could not be started.
    SpawnFailed(String),
    /// Unknown termination reason.
    Unknown,
}

impl TerminationReason {
    /// Check if this is a successful exit.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Exit code in shell convention: signals map to `128 + signo`.
    ///
    /// Returns `None` when no process ever ran or the status is unknown.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            Self::Signaled(sig) => Some(128 + *sig as i32),
            Self::TimedOut => Some(128 + Signal::SIGKILL as i32),
            Self::Interrupted => Some(128 + Signal::SIGINT as i32),
            Self::SpawnFailed(_) | Self::Unknown => None,
        }
    }

    /// Get a human-readable description.
    pub fn description(&self) -> String {
        match self {
            Self::Exited(code) => format!("exited with code {}", code),
            Self::Signaled(sig) => format!("killed by signal {:?}", sig),
            Self::TimedOut => "killed after exceeding the worker timeout".to_string(),
            Self::Interrupted => "interrupted by shutdown request".to_string(),
            Self::SpawnFailed(msg) => format!("failed to start: {}", msg),
            Self::Unknown => "unknown reason".to_string(),
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Analyze a `WaitStatus` to determine the termination reason.
///
/// Returns `None` while the process is still running.
pub fn analyze_wait_status(status: WaitStatus) -> Option<TerminationReason> {
    match status {
        WaitStatus::StillAlive => None,
        WaitStatus::Exited(_, code) => Some(TerminationReason::Exited(code)),
        WaitStatus::Signaled(_, signal, _) => Some(TerminationReason::Signaled(signal)),
        _ => Some(TerminationReason::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::Pid;

    #[test]
    fn test_termination_reason_success() {
        assert!(TerminationReason::Exited(0).is_success());
        assert!(!TerminationReason::Exited(1).is_success());
        assert!(!TerminationReason::TimedOut.is_success());
        assert!(!TerminationReason::SpawnFailed("no such file".into()).is_success());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(TerminationReason::Exited(0).exit_code(), Some(0));
        assert_eq!(TerminationReason::Exited(1).exit_code(), Some(1));
        assert_eq!(
            TerminationReason::Signaled(Signal::SIGTERM).exit_code(),
            Some(143)
        );
        assert_eq!(TerminationReason::TimedOut.exit_code(), Some(137));
        assert_eq!(TerminationReason::Interrupted.exit_code(), Some(130));
        assert!(!TerminationReason::Interrupted.is_success());
        assert_eq!(TerminationReason::Unknown.exit_code(), None);
    }

    #[test]
    fn test_analyze_wait_status() {
        let status = WaitStatus::Exited(Pid::from_raw(1), 0);
        assert_eq!(
            analyze_wait_status(status),
            Some(TerminationReason::Exited(0))
        );

        let status = WaitStatus::Signaled(Pid::from_raw(1), Signal::SIGSEGV, false);
        assert_eq!(
            analyze_wait_status(status),
            Some(TerminationReason::Signaled(Signal::SIGSEGV))
        );

        assert_eq!(analyze_wait_status(WaitStatus::StillAlive), None);
    }

    #[test]
    fn test_description() {
        assert!(TerminationReason::Exited(3).to_string().contains("code 3"));
        assert!(TerminationReason::TimedOut.to_string().contains("timeout"));
    }
}
