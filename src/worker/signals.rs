//! Exit status analysis for worker and compiler processes.

use nix::sys::signal::Signal;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

/// Reason why a child process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Normal exit with status code.
    Exited(i32),
    /// Killed by signal.
    Signaled(Signal),
    /// Unknown termination reason.
    Unknown,
}

impl TerminationReason {
    /// Check if this is a successful exit.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    pub fn description(&self) -> String {
        match self {
            Self::Exited(code) => format!("exited with code {}", code),
            Self::Signaled(sig) => format!("killed by signal {}", sig.as_str()),
            Self::Unknown => "terminated for an unknown reason".to_string(),
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl From<ExitStatus> for TerminationReason {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }
        status
            .signal()
            .and_then(|raw| Signal::try_from(raw).ok())
            .map(Self::Signaled)
            .unwrap_or(Self::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_success_only_for_zero_exit() {
        assert!(TerminationReason::Exited(0).is_success());
        assert!(!TerminationReason::Exited(1).is_success());
        assert!(!TerminationReason::Signaled(Signal::SIGTERM).is_success());
        assert!(!TerminationReason::Unknown.is_success());
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(
            TerminationReason::Exited(2).to_string(),
            "exited with code 2"
        );
        assert_eq!(
            TerminationReason::Signaled(Signal::SIGKILL).to_string(),
            "killed by signal SIGKILL"
        );
    }

    #[test]
    fn test_from_exit_status_code() {
        let status = Command::new("sh").args(["-c", "exit 3"]).status().unwrap();
        assert_eq!(TerminationReason::from(status), TerminationReason::Exited(3));
    }

    #[test]
    fn test_from_exit_status_signal() {
        let status = Command::new("sh")
            .args(["-c", "kill -TERM $$"])
            .status()
            .unwrap();
        assert_eq!(
            TerminationReason::from(status),
            TerminationReason::Signaled(Signal::SIGTERM)
        );
    }
}
