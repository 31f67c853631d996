//! Turns one input line into a [`Command`].
//!
//! Classification order: comment, `cd`, `exit`, `status`, `echo`, then the
//! generic form `name [args...] [< infile] [> outfile] [&]`. `$$` is replaced
//! with the shell's pid before any of that happens.

use std::fmt;

use tracing::debug;

const PID_TOKEN: &str = "$$";

fn is_delimiter(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn tokens(input: &str) -> impl Iterator<Item = &str> {
    input.split(is_delimiter).filter(|t| !t.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Comment,
    ChangeDirectory { target: Option<String> },
    Exit,
    Status,
    Echo,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    /// argv for exec; `arguments[0] == name`.
    pub arguments: Vec<String>,
    pub input_redirect: Option<String>,
    pub output_redirect: Option<String>,
    pub run_in_background: bool,
    pub kind: CommandKind,
}

impl Command {
    fn builtin(name: &str, kind: CommandKind) -> Self {
        Self {
            name: name.to_string(),
            arguments: vec![name.to_string()],
            input_redirect: None,
            output_redirect: None,
            run_in_background: false,
            kind,
        }
    }

    pub fn is_comment(&self) -> bool {
        self.kind == CommandKind::Comment
    }

    pub fn is_change_directory(&self) -> bool {
        matches!(self.kind, CommandKind::ChangeDirectory { .. })
    }

    pub fn is_builtin_exit(&self) -> bool {
        self.kind == CommandKind::Exit
    }

    pub fn is_builtin_status(&self) -> bool {
        self.kind == CommandKind::Status
    }

    pub fn is_echo(&self) -> bool {
        self.kind == CommandKind::Echo
    }

    pub fn is_external(&self) -> bool {
        self.kind == CommandKind::External
    }

    pub fn change_directory_target(&self) -> Option<&str> {
        match &self.kind {
            CommandKind::ChangeDirectory { target } => target.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    MissingRedirectTarget(char),
    DuplicateRedirect(char),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingRedirectTarget(op) => {
                write!(f, "syntax error: expected a file name after '{}'", op)
            }
            ParseError::DuplicateRedirect(op) => {
                write!(f, "syntax error: more than one '{}' redirection", op)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Replaces every `$$` with `pid`, left to right, non-overlapping.
pub fn expand_pid(line: &str, pid: u32) -> String {
    line.replace(PID_TOKEN, &pid.to_string())
}

/// Parses a line using this process's pid for `$$`.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    parse_with_pid(line, std::process::id())
}

/// Parses a line. Blank lines yield `Ok(None)`.
pub fn parse_with_pid(line: &str, pid: u32) -> Result<Option<Command>, ParseError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let line = expand_pid(line, pid);

    let Some(first) = tokens(&line).next() else {
        return Ok(None);
    };

    let command = if line.starts_with('#') {
        Command::builtin("#", CommandKind::Comment)
    } else if let Some(args) = change_directory_args(&line) {
        let target = tokens(args).next().map(str::to_string);
        Command::builtin("cd", CommandKind::ChangeDirectory { target })
    } else if first == "exit" {
        Command::builtin("exit", CommandKind::Exit)
    } else if first == "status" {
        Command::builtin("status", CommandKind::Status)
    } else if first == "echo" {
        parse_echo(&line)
    } else {
        parse_generic(&line)?
    };

    debug!(target: "parse", ?command, "parsed line");
    Ok(Some(command))
}

/// Returns the text after `cd` when the line is a `cd` command.
fn change_directory_args(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches(is_delimiter).strip_prefix("cd")?;
    (rest.is_empty() || rest.starts_with(is_delimiter)).then_some(rest)
}

fn parse_echo(line: &str) -> Command {
    let mut command = Command::builtin("echo", CommandKind::Echo);

    let start = line.len() - line.trim_start_matches(is_delimiter).len();
    let after_name = &line[start + "echo".len()..];
    let mut rest = after_name.chars();
    if rest.next().is_some() {
        command.arguments.push(rest.as_str().to_string());
    }
    command
}

fn parse_generic(line: &str) -> Result<Command, ParseError> {
    let all: Vec<&str> = tokens(line).collect();
    let name = all[0].to_string();

    let mut command = Command {
        name: name.clone(),
        arguments: vec![name],
        input_redirect: None,
        output_redirect: None,
        run_in_background: false,
        kind: CommandKind::External,
    };

    let mut rest = all[1..].iter().enumerate();
    while let Some((index, &token)) = rest.next() {
        match token {
            "<" | ">" => {
                let op = if token == "<" { '<' } else { '>' };
                let (_, &target) = rest.next().ok_or(ParseError::MissingRedirectTarget(op))?;
                let slot = if op == '<' {
                    &mut command.input_redirect
                } else {
                    &mut command.output_redirect
                };
                if slot.is_some() {
                    return Err(ParseError::DuplicateRedirect(op));
                }
                *slot = Some(target.to_string());
            }
            // only a trailing & means background
            "&" if index == all.len() - 2 => command.run_in_background = true,
            _ => command.arguments.push(token.to_string()),
        }
    }

    Ok(command)
}
