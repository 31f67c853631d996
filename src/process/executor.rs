use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::fmt;
use std::io::{self, Write};
use std::os::unix::io::RawFd;

use tracing::debug;

use super::{sys, Pid, ProcessError, ProcessStatus, ProcessTable};
use crate::core::parser::Command;
use crate::core::state::ShellState;
use crate::path::{first_executable, PathResolver, ResolveError};

const NULL_DEVICE: &CStr = c"/dev/null";
const CHILD_FAILURE: i32 = 1;

/// What happened in the parent after a successful fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launched {
    Foreground(ProcessStatus),
    Background(Pid),
}

/// Everything the child needs, prepared before forking. On the way to a
/// successful exec the child only makes async-signal-safe calls; the failure
/// paths allocate to report the error and then `_exit`.
#[derive(Debug)]
struct ExecPlan {
    name: String,
    argv: Vec<CString>,
    /// Null-terminated pointers into `argv`.
    argv_ptrs: Vec<*const libc::c_char>,
    candidates: Result<Vec<CString>, ResolveError>,
    input: Option<CString>,
    output: Option<CString>,
    background: bool,
}

#[derive(Debug)]
enum ChildSetupError {
    Resolve(ResolveError),
    Open(String, io::Error),
    Redirect(RawFd, io::Error),
    Exec(String, io::Error),
}

impl fmt::Display for ChildSetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildSetupError::Resolve(e) => write!(f, "{}", e),
            ChildSetupError::Open(path, e) => write!(f, "cannot open {}: {}", path, e),
            ChildSetupError::Redirect(fd, e) => write!(f, "cannot redirect fd {}: {}", fd, e),
            ChildSetupError::Exec(name, e) => write!(f, "{}: {}", name, e),
        }
    }
}

fn c_string(value: &str) -> Result<CString, ProcessError> {
    CString::new(value).map_err(|_| ProcessError::InvalidArgument(value.to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    /// Whether `cmd` will actually run in the background right now.
    pub fn runs_in_background(cmd: &Command, state: &ShellState) -> bool {
        cmd.run_in_background && !state.foreground_only()
    }

    /// Forks and runs an external command. Foreground commands are waited on;
    /// background ones are registered in `table`.
    pub fn execute(
        &self,
        cmd: &Command,
        state: &mut ShellState,
        table: &mut ProcessTable,
    ) -> Result<Launched, ProcessError> {
        let background = Self::runs_in_background(cmd, state);
        if cmd.run_in_background && !background {
            debug!(target: "exec", name = %cmd.name, "foreground-only mode, ignoring &");
        }
        if background && table.is_full() {
            return Err(ProcessError::TableFull(table.capacity()));
        }

        let plan = Self::plan(cmd, background)?;
        // keep buffered output from being duplicated into the child
        let _ = io::stdout().flush();

        match sys::fork().map_err(ProcessError::ForkFailed)? {
            sys::Fork::Child => {
                let error = match spawn_child(&plan) {
                    Ok(never) => match never {},
                    Err(e) => e,
                };
                eprintln!("{}", error);
                sys::exit_child(CHILD_FAILURE)
            }
            sys::Fork::Parent(pid) => {
                debug!(target: "exec", pid, name = %plan.name, background, "forked child");
                await_or_register(pid, background, state, table)
            }
        }
    }

    fn plan(cmd: &Command, background: bool) -> Result<ExecPlan, ProcessError> {
        let argv = cmd
            .arguments
            .iter()
            .map(|arg| c_string(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let candidates = PathResolver::from_env().exec_candidates(&cmd.name);

        let argv_ptrs = sys::argv_pointers(&argv);
        Ok(ExecPlan {
            name: cmd.name.clone(),
            argv,
            argv_ptrs,
            candidates,
            input: cmd.input_redirect.as_deref().map(c_string).transpose()?,
            output: cmd.output_redirect.as_deref().map(c_string).transpose()?,
            background,
        })
    }
}

fn redirect(path: &CStr, target: RawFd, write: bool) -> Result<(), ChildSetupError> {
    let opened = if write {
        sys::open_for_write(path)
    } else {
        sys::open_for_read(path)
    };
    let fd = opened
        .map_err(|e| ChildSetupError::Open(path.to_string_lossy().into_owned(), e))?;
    sys::replace_fd(fd, target).map_err(|e| ChildSetupError::Redirect(target, e))
}

/// Runs in the forked child: signal dispositions, path resolution,
/// descriptor plumbing, then exec. Only returns on failure.
fn spawn_child(plan: &ExecPlan) -> Result<Infallible, ChildSetupError> {
    sys::ignore_signal(libc::SIGTSTP);
    if plan.background {
        sys::ignore_signal(libc::SIGINT);
    } else {
        sys::default_signal(libc::SIGINT);
    }

    let candidates = plan.candidates.as_ref().map_err(|e| ChildSetupError::Resolve(e.clone()))?;
    let path = first_executable(candidates)
        .ok_or_else(|| ChildSetupError::Resolve(ResolveError::NotFound(plan.name.clone())))?;

    if let Some(input) = &plan.input {
        redirect(input, libc::STDIN_FILENO, false)?;
    }
    if let Some(output) = &plan.output {
        redirect(output, libc::STDOUT_FILENO, true)?;
    }

    if plan.background {
        if plan.input.is_none() {
            redirect(NULL_DEVICE, libc::STDIN_FILENO, false)?;
        }
        if plan.output.is_none() {
            redirect(NULL_DEVICE, libc::STDOUT_FILENO, true)?;
        }
    }

    Err(ChildSetupError::Exec(plan.name.clone(), sys::execv(path, &plan.argv_ptrs)))
}

/// Runs in the parent after fork.
fn await_or_register(
    pid: Pid,
    background: bool,
    state: &mut ShellState,
    table: &mut ProcessTable,
) -> Result<Launched, ProcessError> {
    if background {
        table.register(pid)?;
        return Ok(Launched::Background(pid));
    }

    state.signals().set_foreground(pid);
    let waited = sys::wait_blocking(pid);
    state.signals().clear_foreground();

    let status = waited.map_err(|e| {
        debug!(target: "exec", pid, error = %e, "waitpid failed for foreground child");
        ProcessError::WaitFailed(pid, e)
    })?;
    state.record(status);
    Ok(Launched::Foreground(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_with_pid;
    use crate::process::SystemReaper;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    fn command(line: &str) -> Command {
        parse_with_pid(line, std::process::id())
            .expect("line should parse")
            .expect("line should not be blank")
    }

    fn state() -> ShellState {
        ShellState::with_dirs(PathBuf::from("/"), None)
    }

    #[test]
    fn test_foreground_exit_codes() -> Result<(), ProcessError> {
        let executor = Executor::new();
        let mut state = state();
        let mut table = ProcessTable::new(4);

        let launched = executor.execute(&command("false"), &mut state, &mut table)?;
        assert_eq!(launched, Launched::Foreground(ProcessStatus::Exited(1)));
        assert_eq!(state.last_status().to_string(), "exit value 1");

        executor.execute(&command("true"), &mut state, &mut table)?;
        assert_eq!(state.last_status(), ProcessStatus::Exited(0));
        assert_eq!(state.signals().foreground_pid(), None);
        Ok(())
    }

    #[test]
    fn test_foreground_signal_death() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let script = dir.path().join("self-kill.sh");
        fs::write(&script, "#!/bin/sh\nkill -9 $$\n")?;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;

        let mut state = state();
        let mut table = ProcessTable::new(4);
        let cmd = command(&script.to_string_lossy());
        let launched = Executor::new().execute(&cmd, &mut state, &mut table)?;
        assert_eq!(launched, Launched::Foreground(ProcessStatus::Signaled(9)));
        assert_eq!(state.last_status().to_string(), "terminated by signal 9");
        Ok(())
    }

    #[test]
    fn test_unknown_command_fails_only_the_child() -> Result<(), ProcessError> {
        let mut state = state();
        let mut table = ProcessTable::new(4);
        let launched = Executor::new().execute(
            &command("vein-definitely-not-a-command"),
            &mut state,
            &mut table,
        )?;
        assert_eq!(launched, Launched::Foreground(ProcessStatus::Exited(1)));
        Ok(())
    }

    #[test]
    fn test_redirection_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("source.txt");
        let copy = dir.path().join("copy.txt");
        fs::write(&source, "alpha\nbeta\n  gamma\n")?;

        let mut state = state();
        let mut table = ProcessTable::new(4);
        let line = format!("cat < {} > {}", source.display(), copy.display());
        Executor::new().execute(&command(&line), &mut state, &mut table)?;

        assert_eq!(fs::read(&copy)?, fs::read(&source)?);
        let mode = fs::metadata(&copy)?.permissions().mode() & 0o777;
        assert_eq!(mode & 0o600, 0o600);
        Ok(())
    }

    #[test]
    fn test_arguments_reach_exec() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("args.txt");

        let mut state = state();
        let mut table = ProcessTable::new(4);
        let line = format!("printf %s-%s-%s one two three > {}", out.display());
        Executor::new().execute(&command(&line), &mut state, &mut table)?;
        assert_eq!(fs::read_to_string(&out)?, "one-two-three");
        Ok(())
    }

    #[test]
    fn test_output_redirect_truncates() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("out.txt");
        fs::write(&out, "a much longer line that should disappear\n")?;

        let mut state = state();
        let mut table = ProcessTable::new(4);
        let line = format!("printf hi > {}", out.display());
        Executor::new().execute(&command(&line), &mut state, &mut table)?;
        assert_eq!(fs::read_to_string(&out)?, "hi");
        Ok(())
    }

    #[test]
    fn test_missing_input_file_fails_child() -> Result<(), ProcessError> {
        let mut state = state();
        let mut table = ProcessTable::new(4);
        let launched = Executor::new().execute(
            &command("cat < /nonexistent/vein-input"),
            &mut state,
            &mut table,
        )?;
        assert_eq!(launched, Launched::Foreground(ProcessStatus::Exited(1)));
        Ok(())
    }

    #[test]
    fn test_background_registers_without_waiting() -> Result<(), ProcessError> {
        let mut state = state();
        let mut table = ProcessTable::new(4);

        let started = Instant::now();
        let launched = Executor::new().execute(&command("sleep 1 &"), &mut state, &mut table)?;
        assert!(started.elapsed() < Duration::from_millis(900));

        let Launched::Background(pid) = launched else {
            panic!("expected a background launch, got {:?}", launched);
        };
        assert_eq!(table.pids(), &[pid]);

        let events = table.kill_all(&mut SystemReaper, Duration::from_secs(2));
        assert_eq!(events.len(), 1);
        Ok(())
    }

    #[test]
    fn test_background_completion_is_polled() -> Result<(), ProcessError> {
        let mut state = state();
        let mut table = ProcessTable::new(4);
        Executor::new().execute(&command("false &"), &mut state, &mut table)?;

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while events.is_empty() && Instant::now() < deadline {
            events = table.poll_all(&mut SystemReaper);
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status(), Some(ProcessStatus::Exited(1)));
        assert!(table.is_empty());
        Ok(())
    }

    #[test]
    fn test_foreground_only_mode_ignores_ampersand() -> Result<(), ProcessError> {
        let mut state = state();
        let mut table = ProcessTable::new(4);
        let cmd = command("true &");

        state.signals().on_stop();
        assert!(!Executor::runs_in_background(&cmd, &state));
        let launched = Executor::new().execute(&cmd, &mut state, &mut table)?;
        assert_eq!(launched, Launched::Foreground(ProcessStatus::Exited(0)));
        assert!(table.is_empty());

        state.signals().on_stop();
        assert!(Executor::runs_in_background(&cmd, &state));
        Ok(())
    }

    #[test]
    fn test_full_table_rejects_before_fork() -> Result<(), ProcessError> {
        let mut state = state();
        let mut table = ProcessTable::new(0);
        let result = Executor::new().execute(&command("true &"), &mut state, &mut table);
        assert!(matches!(result, Err(ProcessError::TableFull(0))));
        Ok(())
    }
}
