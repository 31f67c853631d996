use std::fmt;

pub mod executor;
pub mod signal;
pub mod sys;
pub mod table;

pub use executor::{Executor, Launched};
pub use signal::{SignalEvent, SignalState};
pub use table::{CompletionEvent, ProcessTable, Reaper, SystemReaper};

pub type Pid = libc::pid_t;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Exited(i32),
    Signaled(i32),
}

impl Default for ProcessStatus {
    fn default() -> Self {
        ProcessStatus::Exited(0)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Exited(code) => write!(f, "exit value {}", code),
            ProcessStatus::Signaled(signum) => write!(f, "terminated by signal {}", signum),
        }
    }
}

#[derive(Debug)]
pub enum ProcessError {
    ForkFailed(std::io::Error),
    WaitFailed(Pid, std::io::Error),
    TableFull(usize),
    InvalidArgument(String),
    SignalError(String),
}

impl From<ctrlc::Error> for ProcessError {
    fn from(e: ctrlc::Error) -> Self {
        ProcessError::SignalError(e.to_string())
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::ForkFailed(e) => write!(f, "fork: {}", e),
            ProcessError::WaitFailed(pid, e) => write!(f, "waitpid {}: {}", pid, e),
            ProcessError::TableFull(max) => {
                write!(f, "too many background processes (max {})", max)
            }
            ProcessError::InvalidArgument(arg) => {
                write!(f, "argument contains a NUL byte: {:?}", arg)
            }
            ProcessError::SignalError(msg) => write!(f, "Signal error: {}", msg),
        }
    }
}

impl std::error::Error for ProcessError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lines() {
        assert_eq!(ProcessStatus::Exited(1).to_string(), "exit value 1");
        assert_eq!(
            ProcessStatus::Signaled(9).to_string(),
            "terminated by signal 9"
        );
        assert_eq!(ProcessStatus::default(), ProcessStatus::Exited(0));
    }

    #[test]
    fn test_error_lines() {
        assert_eq!(
            ProcessError::TableFull(1000).to_string(),
            "too many background processes (max 1000)"
        );
        assert_eq!(
            ProcessError::InvalidArgument("a\0b".to_string()).to_string(),
            "argument contains a NUL byte: \"a\\0b\""
        );
        let wait = ProcessError::WaitFailed(7, std::io::Error::from_raw_os_error(libc::ECHILD));
        assert!(wait.to_string().starts_with("waitpid 7: "));
    }
}
