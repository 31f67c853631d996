use std::env;
use std::path::PathBuf;

use tracing::debug;

use crate::error::ShellError;
use crate::process::{ProcessStatus, SignalState};

/// Process-wide shell state, owned by the shell loop and lent to builtins and
/// the executor.
#[derive(Debug)]
pub struct ShellState {
    current_dir: PathBuf,
    home: Option<PathBuf>,
    last_status: ProcessStatus,
    signals: SignalState,
}

impl ShellState {
    pub fn new() -> Result<Self, ShellError> {
        let current_dir = env::current_dir()?;
        let home = env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir);

        Ok(Self::with_dirs(current_dir, home))
    }

    pub fn with_dirs(current_dir: PathBuf, home: Option<PathBuf>) -> Self {
        Self {
            current_dir,
            home,
            last_status: ProcessStatus::default(),
            signals: SignalState::new(),
        }
    }

    pub fn current_dir(&self) -> &PathBuf {
        &self.current_dir
    }

    pub fn set_current_dir(&mut self, dir: PathBuf) {
        self.current_dir = dir;
    }

    pub fn home(&self) -> Option<&PathBuf> {
        self.home.as_ref()
    }

    pub fn last_status(&self) -> ProcessStatus {
        self.last_status
    }

    /// Records how the most recent child ended; replaces whatever was there.
    pub fn record(&mut self, status: ProcessStatus) {
        debug!(target: "jobs", %status, "recorded last status");
        self.last_status = status;
    }

    pub fn signals(&self) -> &SignalState {
        &self.signals
    }

    pub fn foreground_only(&self) -> bool {
        self.signals.foreground_only()
    }
}
