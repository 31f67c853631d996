use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

use libc::{SIGINT, SIGTSTP};
use tracing::debug;

use super::{Pid, ProcessError};

const NO_PID: Pid = 0;
const NO_SIGNAL: i32 = 0;

/// Shell state shared with the signal handlers. Handlers only touch atomics
/// and `kill(2)`; the shell loop drains whatever they leave behind.
#[derive(Debug, Clone, Default)]
pub struct SignalState {
    foreground_pid: Arc<AtomicI32>,
    foreground_only: Arc<AtomicBool>,
    pending_interrupt: Arc<AtomicI32>,
    pending_toggles: Arc<AtomicUsize>,
    /// Set when a foreground SIGINT death was already reported before the
    /// handler thread ran; the notice it leaves behind is then dropped.
    interrupt_absorbed: Arc<AtomicBool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Interrupted(i32),
    ForegroundOnly(bool),
}

impl fmt::Display for SignalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalEvent::Interrupted(signum) => write!(f, "terminated by signal {}", signum),
            SignalEvent::ForegroundOnly(true) => {
                write!(f, "Entering foreground-only mode (& is now ignored)")
            }
            SignalEvent::ForegroundOnly(false) => write!(f, "Exiting foreground-only mode"),
        }
    }
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn foreground_pid(&self) -> Option<Pid> {
        match self.foreground_pid.load(Ordering::SeqCst) {
            NO_PID => None,
            pid => Some(pid),
        }
    }

    pub fn set_foreground(&self, pid: Pid) {
        self.interrupt_absorbed.store(false, Ordering::SeqCst);
        self.foreground_pid.store(pid, Ordering::SeqCst);
    }

    pub fn clear_foreground(&self) {
        self.foreground_pid.store(NO_PID, Ordering::SeqCst);
    }

    pub fn foreground_only(&self) -> bool {
        self.foreground_only.load(Ordering::SeqCst)
    }

    /// Interrupt handler body: forwards SIGINT to the foreground child and
    /// leaves a pending notice for the shell loop.
    pub fn on_interrupt(&self, signum: i32) {
        self.pending_interrupt.store(signum, Ordering::SeqCst);
        let pid = self.foreground_pid.swap(NO_PID, Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, SIGINT);
            }
        }
    }

    /// Ctrl-C read at the prompt by the line editor; never absorbed.
    pub fn on_prompt_interrupt(&self) {
        self.interrupt_absorbed.store(false, Ordering::SeqCst);
        self.pending_interrupt.store(SIGINT, Ordering::SeqCst);
    }

    /// The foreground child died of SIGINT and has been reported. Consumes the
    /// handler's notice now, or drops it at a later drain if the handler thread
    /// has not caught up yet.
    pub fn absorb_interrupt(&self) {
        if self.take_interrupt().is_none() {
            self.interrupt_absorbed.store(true, Ordering::SeqCst);
        }
    }

    /// Stop handler body: flips foreground-only mode.
    pub fn on_stop(&self) {
        self.foreground_only.fetch_xor(true, Ordering::SeqCst);
        self.pending_toggles.fetch_add(1, Ordering::SeqCst);
    }

    /// Consumes a pending interrupt, returning its signal number.
    pub fn take_interrupt(&self) -> Option<i32> {
        match self.pending_interrupt.swap(NO_SIGNAL, Ordering::SeqCst) {
            NO_SIGNAL => None,
            signum => Some(signum),
        }
    }

    /// Drains everything the handlers recorded since the last call.
    pub fn drain(&self) -> Vec<SignalEvent> {
        let mut events = Vec::new();

        let toggles = self.pending_toggles.swap(0, Ordering::SeqCst);
        let current = self.foreground_only();
        for remaining in (0..toggles).rev() {
            // the mode after each toggle, oldest first
            events.push(SignalEvent::ForegroundOnly(current ^ (remaining % 2 == 1)));
        }

        if let Some(signum) = self.take_interrupt() {
            if self.interrupt_absorbed.swap(false, Ordering::SeqCst) {
                debug!(target: "signals", signum, "interrupt already reported by its child");
            } else {
                events.push(SignalEvent::Interrupted(signum));
            }
        }

        if !events.is_empty() {
            debug!(target: "signals", ?events, "drained signal events");
        }
        events
    }
}

/// Installs the SIGINT and SIGTSTP handlers. Call once per process.
pub fn install_handlers(state: &SignalState) -> Result<(), ProcessError> {
    let interrupt = state.clone();
    ctrlc::set_handler(move || interrupt.on_interrupt(SIGINT))?;

    let stop = state.clone();
    unsafe { signal_hook::low_level::register(SIGTSTP, move || stop.on_stop()) }
        .map_err(|e| ProcessError::SignalError(e.to_string()))?;

    debug!(target: "signals", "installed SIGINT and SIGTSTP handlers");
    Ok(())
}
