use std::io::Write;

use tracing::debug;

use crate::core::commands::{BuiltinContext, Flow};
use crate::core::parser;
use crate::error::ShellError;
use crate::process::{Launched, ProcessStatus};

use super::{LineSource, Shell};

pub(crate) trait CommandHandler {
    fn handle_line(&mut self, line: &str) -> Result<Flow, ShellError>;
}

impl<S: LineSource, W: Write> CommandHandler for Shell<S, W> {
    fn handle_line(&mut self, line: &str) -> Result<Flow, ShellError> {
        let cmd = match parser::parse(line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => return Ok(Flow::Continue),
            Err(e) => {
                self.report_error(&e);
                return Ok(Flow::Continue);
            }
        };

        if cmd.is_comment() {
            return Ok(Flow::Continue);
        }

        let mut ctx = BuiltinContext {
            state: &mut self.state,
            table: &mut self.table,
            reaper: &mut self.reaper,
            out: &mut self.out,
            kill_grace: self.config.kill_grace,
        };
        if let Some(result) = self.builtins.execute(&cmd, &mut ctx) {
            return match result {
                Ok(flow) => Ok(flow),
                Err(e) => {
                    self.report_error(&e);
                    Ok(Flow::Continue)
                }
            };
        }

        match self.executor.execute(&cmd, &mut self.state, &mut self.table) {
            Ok(Launched::Background(pid)) => {
                writeln!(self.out, "background pid is {}", pid)?;
            }
            Ok(Launched::Foreground(ProcessStatus::Signaled(signum))) => {
                // this line stands in for the interrupt handler's notice
                if signum == libc::SIGINT {
                    self.state.signals().absorb_interrupt();
                } else {
                    self.state.signals().take_interrupt();
                }
                writeln!(self.out, "terminated by signal {}", signum)?;
            }
            Ok(Launched::Foreground(status)) => {
                self.state.signals().take_interrupt();
                debug!(target: "exec", name = %cmd.name, %status, "foreground command finished");
            }
            Err(e) => self.report_error(&e),
        }
        self.out.flush()?;
        Ok(Flow::Continue)
    }
}
