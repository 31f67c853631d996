use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

mod cd;
mod echo;
mod exit;
mod status;

pub use cd::CdCommand;
pub use echo::EchoCommand;
pub use exit::ExitCommand;
pub use status::StatusCommand;

use crate::core::parser::Command;
use crate::core::state::ShellState;
use crate::process::{ProcessTable, Reaper};

#[derive(Debug)]
pub enum CommandError {
    HomeNotSet,
    ChangeDirectory(String, std::io::Error),
    IoError(std::io::Error),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::HomeNotSet => write!(f, "cd: HOME not set"),
            CommandError::ChangeDirectory(target, err) => write!(f, "cd: {}: {}", target, err),
            CommandError::IoError(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::IoError(err)
    }
}

/// Whether the shell loop keeps going after a builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// What a builtin may touch while it runs.
pub struct BuiltinContext<'a> {
    pub state: &'a mut ShellState,
    pub table: &'a mut ProcessTable,
    pub reaper: &'a mut dyn Reaper,
    pub out: &'a mut dyn Write,
    pub kill_grace: Duration,
}

pub trait Builtin {
    fn execute(&self, cmd: &Command, ctx: &mut BuiltinContext<'_>) -> Result<Flow, CommandError>;
}

#[derive(Clone)]
enum BuiltinCommand {
    Cd(CdCommand),
    Exit(ExitCommand),
    Status(StatusCommand),
    Echo(EchoCommand),
}

impl Builtin for BuiltinCommand {
    fn execute(&self, cmd: &Command, ctx: &mut BuiltinContext<'_>) -> Result<Flow, CommandError> {
        match self {
            BuiltinCommand::Cd(builtin) => builtin.execute(cmd, ctx),
            BuiltinCommand::Exit(builtin) => builtin.execute(cmd, ctx),
            BuiltinCommand::Status(builtin) => builtin.execute(cmd, ctx),
            BuiltinCommand::Echo(builtin) => builtin.execute(cmd, ctx),
        }
    }
}

/// The commands the shell runs in-process, keyed by name.
#[derive(Clone)]
pub struct Builtins {
    commands: BTreeMap<&'static str, BuiltinCommand>,
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new()
    }
}

impl Builtins {
    pub fn new() -> Self {
        let mut commands = BTreeMap::new();
        commands.insert("cd", BuiltinCommand::Cd(CdCommand::new()));
        commands.insert("exit", BuiltinCommand::Exit(ExitCommand::new()));
        commands.insert("status", BuiltinCommand::Status(StatusCommand::new()));
        commands.insert("echo", BuiltinCommand::Echo(EchoCommand::new()));
        Self { commands }
    }

    /// Runs `cmd` if it is a builtin; `None` means it must be executed
    /// externally (or, for comments, not at all).
    pub fn execute(
        &self,
        cmd: &Command,
        ctx: &mut BuiltinContext<'_>,
    ) -> Option<Result<Flow, CommandError>> {
        if cmd.is_external() || cmd.is_comment() {
            return None;
        }
        self.commands
            .get(cmd.name.as_str())
            .map(|builtin| builtin.execute(cmd, ctx))
    }
}
