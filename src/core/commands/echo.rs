use super::{Builtin, BuiltinContext, CommandError, Flow};
use crate::core::parser::Command;

#[derive(Clone, Default)]
pub struct EchoCommand;

impl EchoCommand {
    pub fn new() -> Self {
        Self
    }
}

impl Builtin for EchoCommand {
    fn execute(&self, cmd: &Command, ctx: &mut BuiltinContext<'_>) -> Result<Flow, CommandError> {
        let text = cmd.arguments.get(1).map(String::as_str).unwrap_or("");
        writeln!(ctx.out, "{}", text)?;
        ctx.out.flush()?;
        Ok(Flow::Continue)
    }
}
