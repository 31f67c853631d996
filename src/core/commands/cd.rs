use super::{Builtin, BuiltinContext, CommandError, Flow};
use crate::core::parser::Command;
use std::env;
use std::path::PathBuf;

use tracing::debug;

#[derive(Clone)]
pub struct CdCommand;

impl Default for CdCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl CdCommand {
    pub fn new() -> Self {
        Self
    }
}

impl Builtin for CdCommand {
    fn execute(&self, cmd: &Command, ctx: &mut BuiltinContext<'_>) -> Result<Flow, CommandError> {
        let target = match cmd.change_directory_target() {
            Some(target) => PathBuf::from(target),
            None => ctx.state.home().cloned().ok_or(CommandError::HomeNotSet)?,
        };

        env::set_current_dir(&target).map_err(|e| {
            CommandError::ChangeDirectory(target.to_string_lossy().into_owned(), e)
        })?;

        let current = env::current_dir().unwrap_or(target);
        debug!(target: "exec", dir = %current.display(), "changed directory");
        ctx.state.set_current_dir(current);
        Ok(Flow::Continue)
    }
}
