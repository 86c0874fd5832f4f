//! Parallel check orchestration for Nagios/Icinga style monitoring plugins
//!
//! A base plugin command is run once per parameter value, concurrently, and
//! the individual outcomes are reduced to a single plugin status.
//!
//! ```text
//! parameters ─> FanOut ─> N x ProcessRunner ─> N x CheckResult ─> aggregate ─> Report
//! ```

pub mod aggregate;
pub mod check;
pub mod config;
pub mod error;
pub mod invoker;
pub mod report;
pub mod scheduler;
pub mod status;
pub mod util;

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::aggregate::{AggregateResult, aggregate};
use crate::config::{Config, validate_base_command};
use crate::error::{Error, Result};
use crate::invoker::ProcessRunner;
use crate::scheduler::FanOut;

/// Validate, fan out and aggregate in one go
///
/// Configuration problems are returned before any check is started.
#[instrument(skip_all, fields(base = %base))]
pub async fn run<S>(
    base: &str,
    parameters: &[String],
    config: &Config,
    shutdown: S,
) -> Result<AggregateResult>
where
    S: Future<Output = ()>,
{
    if parameters.is_empty() {
        return Err(Error::NoParameters);
    }
    validate_base_command(base)?;

    let runner = Arc::new(ProcessRunner::new(config.shell.clone()));
    let mut fan_out = FanOut::new(runner, config.timeout);
    if let Some(max_parallelism) = config.max_parallelism {
        fan_out = fan_out.with_max_parallelism(max_parallelism);
    }

    let results = fan_out.run_until(base, parameters, shutdown).await?;
    let aggregate = aggregate(&results);
    debug!("aggregate {} from {:?}", aggregate.severity, aggregate.counts);

    Ok(aggregate)
}
