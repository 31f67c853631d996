use std::io::{self, Stdout, Write};

mod executor;
pub mod input;

use crate::{
    config::Config,
    core::{commands::Builtins, commands::Flow, state::ShellState},
    error::ShellError,
    highlight::Painter,
    process::{CompletionEvent, Executor, ProcessTable, SignalEvent, SystemReaper},
};

pub use input::{EditorSource, LineSource, ReadOutcome, ScriptSource};

use executor::CommandHandler;

pub const PROMPT: &str = ": ";

pub struct Shell<S: LineSource = EditorSource, W: Write = Stdout> {
    pub(crate) input: S,
    pub(crate) out: W,
    pub(crate) state: ShellState,
    pub(crate) table: ProcessTable,
    pub(crate) builtins: Builtins,
    pub(crate) executor: Executor,
    pub(crate) reaper: SystemReaper,
    pub(crate) painter: Painter,
    pub(crate) config: Config,
}

impl Shell {
    pub fn new(config: Config) -> Result<Self, ShellError> {
        let input = EditorSource::new()?;
        let state = ShellState::new()?;
        Ok(Shell::with_io(config, input, io::stdout(), state))
    }
}

impl<S: LineSource, W: Write> Shell<S, W> {
    pub fn with_io(config: Config, input: S, out: W, state: ShellState) -> Self {
        Shell {
            input,
            out,
            state,
            table: ProcessTable::new(config.max_background_jobs),
            builtins: Builtins::new(),
            executor: Executor::new(),
            reaper: SystemReaper,
            painter: Painter::new(),
            config,
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Poll, read, parse, dispatch, until `exit` or end of input.
    pub fn run(&mut self) -> Result<(), ShellError> {
        loop {
            self.report_signals()?;
            self.reap_background()?;

            let line = match self.input.read_line(PROMPT)? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted => {
                    self.state.signals().on_prompt_interrupt();
                    continue;
                }
                ReadOutcome::Eof => {
                    // end of input behaves like `exit`
                    self.handle_line("exit")?;
                    break;
                }
            };

            self.report_signals()?;
            if self.handle_line(&line)? == Flow::Exit {
                break;
            }
        }
        Ok(())
    }

    /// Applies whatever the signal handlers left pending.
    fn report_signals(&mut self) -> Result<(), ShellError> {
        for event in self.state.signals().drain() {
            if let SignalEvent::Interrupted(signum) = event {
                self.state.record(crate::process::ProcessStatus::Signaled(signum));
            }
            writeln!(self.out, "{}", event)?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Reports background jobs that finished since the last prompt.
    fn reap_background(&mut self) -> Result<(), ShellError> {
        if self.table.is_empty() {
            return Ok(());
        }

        for event in self.table.poll_all(&mut self.reaper) {
            match &event {
                CompletionEvent::Finished { status, .. } => {
                    self.state.record(*status);
                    writeln!(self.out, "{}", event)?;
                }
                CompletionEvent::Lost { .. } => {
                    eprintln!("{}", self.painter.warning(&format!("vein: {}", event)));
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }

    pub(crate) fn report_error(&self, error: &dyn std::fmt::Display) {
        eprintln!("{}", self.painter.error(&format!("vein: {}", error)));
    }
}
