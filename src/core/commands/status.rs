use super::{Builtin, BuiltinContext, CommandError, Flow};
use crate::core::parser::Command;

/// Prints how the most recent foreground or background child ended.
#[derive(Clone, Default)]
pub struct StatusCommand;

impl StatusCommand {
    pub fn new() -> Self {
        Self
    }
}

impl Builtin for StatusCommand {
    fn execute(&self, _cmd: &Command, ctx: &mut BuiltinContext<'_>) -> Result<Flow, CommandError> {
        writeln!(ctx.out, "{}", ctx.state.last_status())?;
        ctx.out.flush()?;
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::run;
    use crate::core::state::ShellState;
    use crate::process::{ProcessStatus, ProcessTable};
    use std::path::PathBuf;

    #[test]
    fn test_status_output() {
        let mut state = ShellState::with_dirs(PathBuf::from("/"), None);
        let mut table = ProcessTable::new(4);

        let (_, out) = run("status", &mut state, &mut table);
        assert_eq!(out, "exit value 0\n");

        state.record(ProcessStatus::Exited(1));
        let (_, out) = run("status", &mut state, &mut table);
        assert_eq!(out, "exit value 1\n");

        state.record(ProcessStatus::Signaled(9));
        let (_, out) = run("status &", &mut state, &mut table);
        assert_eq!(out, "terminated by signal 9\n");
    }
}
