//! Thin wrappers over the libc process primitives the shell relies on.
//!
//! The wrappers the forked child calls on its way to `exec` are thin shims
//! over async-signal-safe syscalls and do not allocate.

use std::ffi::{CStr, CString};
use std::io;
use std::os::unix::io::RawFd;

use super::{Pid, ProcessStatus};

pub enum Fork {
    Child,
    Parent(Pid),
}

pub fn fork() -> io::Result<Fork> {
    match unsafe { libc::fork() } {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(Fork::Child),
        pid => Ok(Fork::Parent(pid)),
    }
}

fn decode_status(status: libc::c_int) -> ProcessStatus {
    if libc::WIFSIGNALED(status) {
        ProcessStatus::Signaled(libc::WTERMSIG(status))
    } else {
        ProcessStatus::Exited(libc::WEXITSTATUS(status))
    }
}

/// Blocks until `pid` terminates. Interrupted waits are retried.
pub fn wait_blocking(pid: Pid) -> io::Result<ProcessStatus> {
    let mut status: libc::c_int = 0;
    loop {
        let result = unsafe { libc::waitpid(pid, &mut status, 0) };
        if result == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        return Ok(decode_status(status));
    }
}

/// Non-blocking wait; `Ok(None)` means the child is still running.
pub fn try_wait(pid: Pid) -> io::Result<Option<ProcessStatus>> {
    let mut status: libc::c_int = 0;
    match unsafe { libc::waitpid(pid, &mut status, libc::WNOHANG) } {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(None),
        _ => Ok(Some(decode_status(status))),
    }
}

pub fn kill(pid: Pid, signum: i32) -> io::Result<()> {
    if unsafe { libc::kill(pid, signum) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn is_executable(path: &CStr) -> bool {
    unsafe { libc::access(path.as_ptr(), libc::X_OK) == 0 }
}

pub fn open_for_read(path: &CStr) -> io::Result<RawFd> {
    match unsafe { libc::open(path.as_ptr(), libc::O_RDONLY) } {
        -1 => Err(io::Error::last_os_error()),
        fd => Ok(fd),
    }
}

/// Opens (creating or truncating) a file for writing, owner read-write.
pub fn open_for_write(path: &CStr) -> io::Result<RawFd> {
    let flags = libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC;
    let mode = (libc::S_IRUSR | libc::S_IWUSR) as libc::c_uint;
    match unsafe { libc::open(path.as_ptr(), flags, mode) } {
        -1 => Err(io::Error::last_os_error()),
        fd => Ok(fd),
    }
}

/// Moves `fd` onto `target`, closing the original descriptor.
pub fn replace_fd(fd: RawFd, target: RawFd) -> io::Result<()> {
    if fd == target {
        return Ok(());
    }
    if unsafe { libc::dup2(fd, target) } == -1 {
        return Err(io::Error::last_os_error());
    }
    if unsafe { libc::close(fd) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn ignore_signal(signum: i32) {
    unsafe {
        libc::signal(signum, libc::SIG_IGN);
    }
}

pub fn default_signal(signum: i32) {
    unsafe {
        libc::signal(signum, libc::SIG_DFL);
    }
}

/// Builds the null-terminated pointer array `execv` wants. The pointers
/// borrow from `argv`, which must outlive every use of the result.
pub fn argv_pointers(argv: &[CString]) -> Vec<*const libc::c_char> {
    argv.iter()
        .map(|arg| arg.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}

/// Replaces the process image. `argv` must come from [`argv_pointers`].
/// Only returns on failure.
pub fn execv(path: &CStr, argv: &[*const libc::c_char]) -> io::Error {
    unsafe {
        libc::execv(path.as_ptr(), argv.as_ptr());
    }
    io::Error::last_os_error()
}

/// Terminates a forked child without running the parent's exit handlers.
pub fn exit_child(code: i32) -> ! {
    unsafe { libc::_exit(code) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_pointers_are_null_terminated() -> Result<(), std::ffi::NulError> {
        let argv = vec![CString::new("printf")?, CString::new("%s")?];
        let ptrs = argv_pointers(&argv);
        assert_eq!(ptrs.len(), 3);
        assert_eq!(ptrs[0], argv[0].as_ptr());
        assert_eq!(ptrs[1], argv[1].as_ptr());
        assert!(ptrs[2].is_null());
        Ok(())
    }

    #[test]
    fn test_replace_fd_onto_itself_keeps_it_open() -> io::Result<()> {
        let fd = open_for_read(c"/dev/null")?;
        replace_fd(fd, fd)?;
        assert_ne!(unsafe { libc::fcntl(fd, libc::F_GETFD) }, -1);
        unsafe {
            libc::close(fd);
        }
        Ok(())
    }
}
