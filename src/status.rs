//! Plugin status model
//!
//! The four monitoring-plugin states and the single mapping between them and
//! process exit codes. Everything that compares or exits with a severity goes
//! through this module.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status of a check, ordered by its protocol exit code
///
/// The derived order is the numeric one (`OK < WARNING < CRITICAL < UNKNOWN`).
/// It is NOT an alert ranking; use [`Severity::urgency`] for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Ok,
        Severity::Warning,
        Severity::Critical,
        Severity::Unknown,
    ];

    /// Exit code this severity is reported with
    pub fn exit_code(self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
            Severity::Unknown => 3,
        }
    }

    /// Severity a plugin exit code stands for, `None` outside `0..=3`
    pub fn from_exit_code(code: i32) -> Option<Severity> {
        match code {
            0 => Some(Severity::Ok),
            1 => Some(Severity::Warning),
            2 => Some(Severity::Critical),
            3 => Some(Severity::Unknown),
            _ => None,
        }
    }

    /// Protocol level name
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
        }
    }

    /// Rank used when reducing many results to one
    ///
    /// UNKNOWN outranks WARNING but yields to CRITICAL, so a check that could
    /// not be evaluated is never reported as healthier than it is.
    pub fn urgency(self) -> u8 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Unknown => 2,
            Severity::Critical => 3,
        }
    }

    /// Compare by urgency instead of exit code
    pub fn cmp_urgency(self, other: Severity) -> Ordering {
        self.urgency().cmp(&other.urgency())
    }

    /// The more urgent of two severities
    pub fn most_urgent(self, other: Severity) -> Severity {
        match self.cmp_urgency(other) {
            Ordering::Less => other,
            _ => self,
        }
    }
}

impl TryFrom<i32> for Severity {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Severity::from_exit_code(code).ok_or(code)
    }
}

impl From<Severity> for i32 {
    fn from(severity: Severity) -> Self {
        severity.exit_code()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OK" => Ok(Severity::Ok),
            "WARNING" | "WARN" => Ok(Severity::Warning),
            "CRITICAL" | "CRIT" => Ok(Severity::Critical),
            "UNKNOWN" => Ok(Severity::Unknown),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}
