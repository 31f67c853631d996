use std::env;
use std::ffi::{CString, OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::process::sys;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    NoSearchPath,
    NotFound(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NoSearchPath => write!(f, "PATH variable not available"),
            ResolveError::NotFound(name) => write!(f, "{}: command not found", name),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Maps a command name to an executable through a colon-delimited search list.
#[derive(Debug, Clone)]
pub struct PathResolver {
    search_path: Option<OsString>,
}

impl PathResolver {
    pub fn from_env() -> Self {
        Self {
            search_path: env::var_os("PATH"),
        }
    }

    pub fn with_search_path(search_path: Option<&str>) -> Self {
        Self {
            search_path: search_path.map(OsString::from),
        }
    }

    /// Every path that would be probed for `name`, in search order.
    pub fn candidates(&self, name: &str) -> Result<Vec<PathBuf>, ResolveError> {
        if name.contains('/') {
            return Ok(vec![PathBuf::from(name)]);
        }

        let search_path = self.search_path.as_ref().ok_or(ResolveError::NoSearchPath)?;
        let candidates = search_path
            .as_bytes()
            .split(|&b| b == b':')
            .filter(|segment| !segment.is_empty())
            .map(|segment| Path::new(OsStr::from_bytes(segment)).join(name))
            .collect();
        Ok(candidates)
    }

    /// [`candidates`](Self::candidates) as C strings, ready to hand to a
    /// forked child. Paths with an interior NUL can never exist and are dropped.
    pub fn exec_candidates(&self, name: &str) -> Result<Vec<CString>, ResolveError> {
        Ok(self
            .candidates(name)?
            .iter()
            .filter_map(|p| CString::new(p.as_os_str().as_bytes()).ok())
            .collect())
    }

    /// Resolves `name` now, with the same probe the executor's child uses.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, ResolveError> {
        let candidates = self.exec_candidates(name)?;
        let found = first_executable(&candidates)
            .map(|c| PathBuf::from(OsStr::from_bytes(c.as_bytes())))
            .ok_or_else(|| ResolveError::NotFound(name.to_string()))?;

        debug!(target: "exec", name, path = %found.display(), "resolved command");
        Ok(found)
    }
}

/// Picks the first executable candidate. Safe to call between fork and exec.
pub(crate) fn first_executable(candidates: &[CString]) -> Option<&CString> {
    candidates.iter().find(|c| sys::is_executable(c))
}
