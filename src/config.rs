use std::time::Duration;

use crate::error::ShellError;
use crate::flags::Flags;

pub const DEFAULT_MAX_JOBS: usize = 1000;
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);

/// Runtime settings derived from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub max_background_jobs: usize,
    pub kill_grace: Duration,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_background_jobs: DEFAULT_MAX_JOBS,
            kill_grace: DEFAULT_KILL_GRACE,
            debug: false,
        }
    }
}

impl Config {
    pub fn from_flags(flags: &Flags) -> Result<Self, ShellError> {
        let mut config = Config {
            debug: flags.is_set("debug"),
            ..Config::default()
        };

        if let Some(value) = flags.get_value("max-jobs") {
            config.max_background_jobs = value
                .parse()
                .ok()
                .filter(|&n: &usize| n > 0)
                .ok_or_else(|| {
                    ShellError::FlagError(format!("invalid --max-jobs value: {}", value))
                })?;
        }

        Ok(config)
    }
}
