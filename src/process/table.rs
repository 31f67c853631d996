use std::fmt;
use std::io;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{sys, Pid, ProcessError, ProcessStatus};

const REAP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The wait/kill primitives the process table needs.
pub trait Reaper {
    /// Non-blocking wait. `Ok(None)` while the process is still running.
    fn try_reap(&mut self, pid: Pid) -> io::Result<Option<ProcessStatus>>;
    fn reap(&mut self, pid: Pid) -> io::Result<ProcessStatus>;
    fn signal(&mut self, pid: Pid, signum: i32) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemReaper;

impl Reaper for SystemReaper {
    fn try_reap(&mut self, pid: Pid) -> io::Result<Option<ProcessStatus>> {
        sys::try_wait(pid)
    }

    fn reap(&mut self, pid: Pid) -> io::Result<ProcessStatus> {
        sys::wait_blocking(pid)
    }

    fn signal(&mut self, pid: Pid, signum: i32) -> io::Result<()> {
        sys::kill(pid, signum)
    }
}

#[derive(Debug)]
pub enum CompletionEvent {
    Finished { pid: Pid, status: ProcessStatus },
    Lost { pid: Pid, error: io::Error },
}

impl CompletionEvent {
    pub fn pid(&self) -> Pid {
        match self {
            CompletionEvent::Finished { pid, .. } | CompletionEvent::Lost { pid, .. } => *pid,
        }
    }

    pub fn status(&self) -> Option<ProcessStatus> {
        match self {
            CompletionEvent::Finished { status, .. } => Some(*status),
            CompletionEvent::Lost { .. } => None,
        }
    }
}

impl fmt::Display for CompletionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionEvent::Finished { pid, status } => {
                write!(f, "background pid {} is done: {}", pid, status)
            }
            CompletionEvent::Lost { pid, error } => {
                write!(f, "background pid {} could not be reaped: {}", pid, error)
            }
        }
    }
}

/// Ordered set of background pids, oldest first.
#[derive(Debug)]
pub struct ProcessTable {
    pids: Vec<Pid>,
    capacity: usize,
}

impl ProcessTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            pids: Vec::new(),
            capacity,
        }
    }

    pub fn register(&mut self, pid: Pid) -> Result<(), ProcessError> {
        if self.is_full() {
            return Err(ProcessError::TableFull(self.capacity));
        }
        debug!(target: "jobs", pid, slot = self.pids.len(), "registered background process");
        self.pids.push(pid);
        Ok(())
    }

    pub fn pids(&self) -> &[Pid] {
        &self.pids
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pids.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Checks every tracked pid without blocking. Events come back in table
    /// order; finished entries are removed and the survivors keep their order.
    pub fn poll_all(&mut self, reaper: &mut dyn Reaper) -> Vec<CompletionEvent> {
        let mut events = Vec::new();
        let mut done = vec![false; self.pids.len()];

        for (slot, &pid) in self.pids.iter().enumerate() {
            match reaper.try_reap(pid) {
                Ok(None) => continue,
                Ok(Some(status)) => {
                    debug!(target: "jobs", pid, %status, "background process finished");
                    events.push(CompletionEvent::Finished { pid, status });
                }
                Err(error) => {
                    debug!(target: "jobs", pid, %error, "dropping unreapable background process");
                    events.push(CompletionEvent::Lost { pid, error });
                }
            }
            done[slot] = true;
        }

        if !events.is_empty() {
            let mut flags = done.into_iter();
            self.pids.retain(|_| !flags.next().unwrap_or(false));
        }
        events
    }

    /// Sends SIGTERM to every tracked pid, then waits for each in registration
    /// order. A process still alive after `grace` is sent SIGKILL.
    pub fn kill_all(&mut self, reaper: &mut dyn Reaper, grace: Duration) -> Vec<CompletionEvent> {
        debug!(target: "jobs", count = self.pids.len(), "terminating background processes");
        for &pid in &self.pids {
            if let Err(error) = reaper.signal(pid, libc::SIGTERM) {
                debug!(target: "jobs", pid, %error, "SIGTERM not delivered");
            }
        }

        let events = self
            .pids
            .iter()
            .map(|&pid| match reap_within(reaper, pid, grace) {
                Ok(status) => CompletionEvent::Finished { pid, status },
                Err(error) => CompletionEvent::Lost { pid, error },
            })
            .collect();
        self.pids.clear();
        events
    }
}

fn reap_within(reaper: &mut dyn Reaper, pid: Pid, grace: Duration) -> io::Result<ProcessStatus> {
    let deadline = Instant::now() + grace;
    loop {
        if let Some(status) = reaper.try_reap(pid)? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(REAP_POLL_INTERVAL);
    }

    warn!(target: "jobs", pid, "background process ignored SIGTERM, sending SIGKILL");
    if let Err(error) = reaper.signal(pid, libc::SIGKILL) {
        debug!(target: "jobs", pid, %error, "SIGKILL not delivered");
    }
    reaper.reap(pid)
}
