//! Rendering of the final plugin output
//!
//! [`Report::exit`] is the only place in the crate that terminates the
//! process; everything below it returns values.

use std::io::Write;

use sysinfo::System;
use tracing::debug;

use crate::aggregate::AggregateResult;
use crate::error::Error;
use crate::status::Severity;

/// Maximum payload size accepted by an NSCA server
pub const NSCA_MAX_OUTPUT: usize = 4096;

/// Rendered plugin output plus the severity to exit with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub severity: Severity,
    pub output: String,
}

impl Report {
    /// `<LEVEL>: <message>`, further composed lines as long output
    pub fn plugin(aggregate: &AggregateResult) -> Report {
        Report {
            severity: aggregate.severity,
            output: format!("{}: {}", aggregate.severity, aggregate.message),
        }
    }

    /// A run that never got to aggregation is UNKNOWN
    pub fn error(error: &Error) -> Report {
        Report {
            severity: Severity::Unknown,
            output: format!("{}: {error}", Severity::Unknown),
        }
    }

    /// Turn the report into an NSCA submission line
    ///
    /// Newlines are escaped since `send_nsca` reads one result per line, and
    /// the payload is clipped to what the server accepts.
    pub fn passive(self, hostname: &str, service: &str) -> Report {
        let escaped = self.output.replace('\\', "\\\\").replace('\n', "\\n");
        let payload = clip(&escaped, NSCA_MAX_OUTPUT);
        let output = format!(
            "{hostname}\t{service}\t{}\t{payload}",
            self.severity.exit_code()
        );

        Report {
            severity: self.severity,
            output,
        }
    }

    /// Print the report and exit with the matching code
    pub fn exit(self) -> ! {
        debug!("exiting with {} ({})", self.severity, self.severity.exit_code());

        let mut stdout = std::io::stdout().lock();
        // Nothing sensible is left to do if stdout is gone; the exit code still counts.
        let _ = writeln!(stdout, "{}", self.output);
        let _ = stdout.flush();

        std::process::exit(self.severity.exit_code())
    }
}

/// Host name to report passive results for
pub fn local_hostname() -> String {
    System::host_name().unwrap_or_else(|| String::from("localhost"))
}

fn clip(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
