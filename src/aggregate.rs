//! Reduction of many check results into one plugin status

use crate::check::CheckResult;
use crate::status::Severity;

/// Message reported when every check is healthy
pub const HEALTHY_MESSAGE: &str = "Everything is fine";

/// Message reported when there was nothing to aggregate
pub const EMPTY_MESSAGE: &str = "no checks executed";

/// Number of results per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub ok: usize,
    pub warning: usize,
    pub critical: usize,
    pub unknown: usize,
    /// UNKNOWN results that are faults rather than reported states
    pub faults: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.ok + self.warning + self.critical + self.unknown
    }

    fn add(&mut self, result: &CheckResult) {
        match result.severity {
            Severity::Ok => self.ok += 1,
            Severity::Warning => self.warning += 1,
            Severity::Critical => self.critical += 1,
            Severity::Unknown => self.unknown += 1,
        }
        if result.is_fault() {
            self.faults += 1;
        }
    }
}

/// Overall outcome of a fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateResult {
    pub severity: Severity,
    pub message: String,
    pub counts: Counts,
}

/// Reduce `results` to one status and one composed message
///
/// The severity is the most urgent one present (see [`Severity::urgency`]).
/// Every non-OK result contributes a `<parameter>: <message>` line with the
/// sub-check text untouched. Lines are ordered by urgency, then parameter,
/// so the outcome does not depend on the order of `results`.
pub fn aggregate(results: &[CheckResult]) -> AggregateResult {
    let mut counts = Counts::default();
    results.iter().for_each(|result| counts.add(result));

    let Some(severity) = results
        .iter()
        .map(|result| result.severity)
        .reduce(Severity::most_urgent)
    else {
        return AggregateResult {
            severity: Severity::Unknown,
            message: EMPTY_MESSAGE.to_string(),
            counts,
        };
    };

    if severity == Severity::Ok {
        return AggregateResult {
            severity,
            message: HEALTHY_MESSAGE.to_string(),
            counts,
        };
    }

    let mut problems: Vec<&CheckResult> = results
        .iter()
        .filter(|result| result.severity != Severity::Ok)
        .collect();
    problems.sort_by(|a, b| {
        b.severity
            .cmp_urgency(a.severity)
            .then_with(|| a.parameter.cmp(&b.parameter))
            .then_with(|| a.message.cmp(&b.message))
    });

    let message = problems
        .iter()
        .map(|result| format!("{}: {}", result.parameter, result.message))
        .collect::<Vec<_>>()
        .join("\n");

    AggregateResult {
        severity,
        message,
        counts,
    }
}
