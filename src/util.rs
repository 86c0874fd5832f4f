use std::env::VarError;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{Error, Result};

const CHECK_TIMEOUT: &str = "CHECK_MULTIPLE_TIMEOUT";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub fn get_default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Per-invocation timeout in seconds, if set in the environment
pub fn get_timeout() -> Result<Option<u64>> {
    parse_var(CHECK_TIMEOUT)
}

const CHECK_SHELL: &str = "CHECK_MULTIPLE_SHELL";

pub fn get_shell() -> Option<String> {
    std::env::var(CHECK_SHELL).ok().filter(|shell| !shell.is_empty())
}

const CHECK_MAX_PARALLELISM: &str = "CHECK_MULTIPLE_MAX_PARALLELISM";

pub fn get_max_parallelism() -> Result<Option<usize>> {
    parse_var(CHECK_MAX_PARALLELISM)
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(value) => parse_value(name, &value),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(Error::InvalidConfig(format!(
            "{name} is not valid unicode"
        ))),
    }
}

/// Parse a set variable; blank counts as unset, garbage is an error
fn parse_value<T>(name: &str, value: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|e| Error::InvalidConfig(format!("{name}='{value}' is not valid: {e}")))
}
