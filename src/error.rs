//! Error types for orchestration
//!
//! Only problems that stop the whole run live here. Anything that goes wrong
//! inside a single sub-check is a [`crate::check::Fault`] on its result.

use std::fmt;

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a run before (or instead of) aggregation
#[derive(Debug)]
pub enum Error {
    /// No parameter values were given, so nothing can be fanned out
    NoParameters,

    /// The base command is empty or only whitespace
    EmptyCommand,

    /// The program of the base command could not be found
    CommandNotFound(String),

    /// A configuration value is out of range
    InvalidConfig(String),

    /// The configuration file could not be read or parsed
    ConfigFile { path: String, reason: String },

    /// The orchestrator was asked to stop before all checks completed
    Interrupted,
}

impl Error {
    /// Whether this error was raised before any invocation started
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Error::Interrupted)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoParameters => {
                write!(f, "no checks executed: at least one parameter value is required")
            }
            Error::EmptyCommand => write!(f, "configuration error: base command is empty"),
            Error::CommandNotFound(program) => {
                write!(f, "configuration error: command '{program}' not found")
            }
            Error::InvalidConfig(msg) => write!(f, "configuration error: {msg}"),
            Error::ConfigFile { path, reason } => {
                write!(f, "configuration error: cannot load '{path}': {reason}")
            }
            Error::Interrupted => write!(f, "interrupted before all checks completed"),
        }
    }
}

impl std::error::Error for Error {}
