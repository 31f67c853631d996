use super::{Builtin, BuiltinContext, CommandError, Flow};
use crate::core::parser::Command;
use crate::process::CompletionEvent;

/// Terminates every background job before the shell leaves.
#[derive(Clone)]
pub struct ExitCommand;

impl Default for ExitCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl ExitCommand {
    pub fn new() -> Self {
        Self
    }
}

impl Builtin for ExitCommand {
    fn execute(&self, _cmd: &Command, ctx: &mut BuiltinContext<'_>) -> Result<Flow, CommandError> {
        if ctx.table.is_empty() {
            return Ok(Flow::Exit);
        }

        for event in ctx.table.kill_all(&mut *ctx.reaper, ctx.kill_grace) {
            if let CompletionEvent::Finished { status, .. } = &event {
                ctx.state.record(*status);
            }
            writeln!(ctx.out, "{}", event)?;
        }
        ctx.out.flush()?;
        Ok(Flow::Exit)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::run;
    use super::super::Flow;
    use crate::core::state::ShellState;
    use crate::process::{ProcessStatus, ProcessTable};
    use std::path::PathBuf;

    #[test]
    fn test_exit_without_jobs() {
        let mut state = ShellState::with_dirs(PathBuf::from("/"), None);
        let mut table = ProcessTable::new(4);
        let (result, out) = run("exit", &mut state, &mut table);
        assert!(matches!(result, Some(Ok(Flow::Exit))));
        assert!(out.is_empty());
    }

    #[test]
    fn test_exit_reaps_background_jobs() -> Result<(), crate::process::ProcessError> {
        let mut state = ShellState::with_dirs(PathBuf::from("/"), None);
        let mut table = ProcessTable::new(4);
        table.register(501)?;
        table.register(502)?;

        let (result, out) = run("exit", &mut state, &mut table);
        assert!(matches!(result, Some(Ok(Flow::Exit))));
        assert!(table.is_empty());
        assert_eq!(
            out,
            "background pid 501 is done: terminated by signal 15\n\
             background pid 502 is done: terminated by signal 15\n"
        );
        assert_eq!(state.last_status(), ProcessStatus::Signaled(15));
        Ok(())
    }
}
