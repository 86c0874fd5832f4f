use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::trace;

use crate::error::{Error, Result};
use crate::util::{get_default_timeout, get_max_parallelism, get_shell, get_timeout};

pub const DEFAULT_SHELL: &str = "/bin/sh";

/// One layer of settings (environment, config file or command line)
///
/// Layers are merged with [`Settings::merge`]; unset fields fall through to
/// the layer below.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Per-invocation timeout in seconds
    pub timeout: Option<u64>,

    /// Shell used to run the command lines
    pub shell: Option<String>,

    /// Upper bound on concurrently running checks
    pub max_parallelism: Option<usize>,

    /// Service name for passive (NSCA) output
    pub passive: Option<String>,

    /// Host name for passive output
    pub hostname: Option<String>,
}

impl Settings {
    /// Settings from `CHECK_MULTIPLE_*` variables
    ///
    /// A variable that is set but malformed is an error, not a default.
    pub fn from_env() -> Result<Settings> {
        Ok(Settings {
            timeout: get_timeout()?,
            shell: get_shell(),
            max_parallelism: get_max_parallelism()?,
            passive: None,
            hostname: None,
        })
    }

    /// Layer `higher` on top of `self`
    pub fn merge(self, higher: Settings) -> Settings {
        Settings {
            timeout: higher.timeout.or(self.timeout),
            shell: higher.shell.or(self.shell),
            max_parallelism: higher.max_parallelism.or(self.max_parallelism),
            passive: higher.passive.or(self.passive),
            hostname: higher.hostname.or(self.hostname),
        }
    }

    /// Fill in defaults and validate
    pub fn resolve(self) -> Result<Config> {
        let timeout = self.timeout.unwrap_or_else(get_default_timeout);
        if timeout == 0 {
            return Err(Error::InvalidConfig("timeout must be at least 1 second".to_string()));
        }

        if self.max_parallelism == Some(0) {
            return Err(Error::InvalidConfig(
                "max parallelism must be at least 1".to_string(),
            ));
        }

        let passive = match (self.passive, self.hostname) {
            (Some(service), hostname) => Some(Passive { service, hostname }),
            (None, Some(_)) => {
                return Err(Error::InvalidConfig(
                    "a hostname is only used together with a passive service".to_string(),
                ));
            }
            (None, None) => None,
        };

        Ok(Config {
            timeout: Duration::from_secs(timeout),
            shell: PathBuf::from(self.shell.unwrap_or_else(|| DEFAULT_SHELL.to_string())),
            max_parallelism: self.max_parallelism,
            passive,
        })
    }
}

/// Fully resolved run configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub timeout: Duration,
    pub shell: PathBuf,
    pub max_parallelism: Option<usize>,
    pub passive: Option<Passive>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout: Duration::from_secs(get_default_timeout()),
            shell: PathBuf::from(DEFAULT_SHELL),
            max_parallelism: None,
            passive: None,
        }
    }
}

/// Passive submission target
#[derive(Debug, Clone, PartialEq)]
pub struct Passive {
    pub service: String,
    pub hostname: Option<String>,
}

pub fn read_config_file(path: &str) -> Result<Settings> {
    let file_content = std::fs::read_to_string(path).map_err(|e| Error::ConfigFile {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&file_content)
        .map_err(|e| Error::ConfigFile {
            path: path.to_string(),
            reason: e.to_string(),
        })
        .inspect(|settings| trace!("loaded config: {settings:?}"))
}

/// Make sure the base command names a program that exists
///
/// Leading `NAME=value` assignments are skipped. Programs containing a `/`
/// must exist as files; bare names are looked up on `PATH`.
pub fn validate_base_command(base: &str) -> Result<()> {
    let path_var = std::env::var_os("PATH");
    validate_base_command_in(base, path_var.as_deref())
}

fn validate_base_command_in(base: &str, path_var: Option<&OsStr>) -> Result<()> {
    let program = base
        .split_whitespace()
        .find(|token| !is_assignment(token))
        .ok_or(Error::EmptyCommand)?;

    let found = if program.contains('/') {
        Path::new(program).is_file()
    } else {
        find_program(program, path_var).is_some()
    };

    if found {
        trace!("base command program '{program}' found");
        Ok(())
    } else {
        Err(Error::CommandNotFound(program.to_string()))
    }
}

fn is_assignment(token: &str) -> bool {
    match token.split_once('=') {
        Some((name, _)) => {
            !name.is_empty()
                && !name.starts_with(|c: char| c.is_ascii_digit())
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

/// Look `program` up in a `PATH`-style list of directories
pub fn find_program(program: &str, path_var: Option<&OsStr>) -> Option<PathBuf> {
    std::env::split_paths(path_var?)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
