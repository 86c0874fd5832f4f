//! Sub-check descriptions and outcomes

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::status::Severity;

/// One sub-check to run: the shared base command plus one parameter
///
/// The base command is shared between all specs of a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSpec {
    /// Position of the parameter on the command line
    pub index: usize,

    /// Base command (program and fixed arguments)
    pub base: Arc<str>,

    /// Variable parameter appended to the base command
    pub parameter: String,
}

impl CheckSpec {
    pub fn new(index: usize, base: Arc<str>, parameter: impl Into<String>) -> Self {
        Self {
            index,
            base,
            parameter: parameter.into(),
        }
    }

    /// Full command line handed to the shell
    pub fn command_line(&self) -> String {
        if self.parameter.is_empty() {
            self.base.to_string()
        } else {
            format!("{} {}", self.base, self.parameter)
        }
    }
}

/// Why a sub-check could not be run or interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The process could not be started
    Spawn(String),

    /// The process ran past its budget and was killed
    Timeout(Duration),

    /// The process exited with a code outside the plugin protocol
    UnexpectedExit { code: i32 },

    /// The process was terminated by a signal
    Signalled(String),

    /// The process exited with a valid code but printed nothing
    NoOutput { code: i32 },

    /// Waiting for the process or reading its output failed
    Io(String),

    /// The invocation task itself failed
    Aborted(String),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Spawn(reason) => write!(f, "UNKNOWN: failed to start check: {reason}"),
            Fault::Timeout(after) => {
                write!(f, "UNKNOWN: check timed out after {:.1}s and was killed", after.as_secs_f64())
            }
            Fault::UnexpectedExit { code } => {
                write!(f, "UNKNOWN: check exited with unexpected code {code}")
            }
            Fault::Signalled(status) => write!(f, "UNKNOWN: check was terminated ({status})"),
            Fault::NoOutput { code } => {
                write!(f, "UNKNOWN: check exited with code {code} but produced no output")
            }
            Fault::Io(reason) => write!(f, "UNKNOWN: failed to collect check output: {reason}"),
            Fault::Aborted(reason) => write!(f, "UNKNOWN: check task failed: {reason}"),
        }
    }
}

/// Outcome of one completed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Parameter of the originating spec
    pub parameter: String,

    /// Index of the originating spec
    pub index: usize,

    pub severity: Severity,

    /// Output of the sub-check, or the fault description
    pub message: String,

    /// Set when the sub-check could not be run or interpreted
    pub fault: Option<Fault>,

    /// Wall-clock time the invocation took
    pub elapsed: Duration,
}

impl CheckResult {
    /// Result of a sub-check that ran and reported its own status
    pub fn reported(spec: &CheckSpec, severity: Severity, message: String, elapsed: Duration) -> Self {
        Self {
            parameter: spec.parameter.clone(),
            index: spec.index,
            severity,
            message,
            fault: None,
            elapsed,
        }
    }

    /// Result of a sub-check that could not be evaluated
    pub fn faulted(spec: &CheckSpec, fault: Fault, elapsed: Duration) -> Self {
        Self {
            parameter: spec.parameter.clone(),
            index: spec.index,
            severity: Severity::Unknown,
            message: fault.to_string(),
            fault: Some(fault),
            elapsed,
        }
    }

    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }
}
