//! Fan-out scheduler - runs one check per parameter concurrently
//!
//! Every parameter becomes a [`CheckSpec`] that is handed to the
//! [`CheckRunner`] on its own tokio task. The scheduler owns all tasks in a
//! [`JoinSet`] and only returns once each of them reached a terminal state,
//! so callers never see a partial result set.
//!
//! ```text
//! params ─┬─> task(spec 0) ──┐
//!         ├─> task(spec 1) ──┼─> collection barrier ─> Vec<CheckResult>
//!         └─> task(spec N) ──┘
//! ```
//!
//! A shutdown future can cut the run short; all in-flight tasks are then
//! aborted and awaited, which kills their child processes.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, instrument, warn};

use crate::check::{CheckResult, CheckSpec, Fault};
use crate::error::{Error, Result};
use crate::invoker::CheckRunner;

/// Runs a base command once per parameter
pub struct FanOut {
    runner: Arc<dyn CheckRunner>,
    timeout: Duration,
    max_parallelism: Option<usize>,
}

impl FanOut {
    pub fn new(runner: Arc<dyn CheckRunner>, timeout: Duration) -> Self {
        Self {
            runner,
            timeout,
            max_parallelism: None,
        }
    }

    /// Limit how many checks run at the same time
    ///
    /// With a limit the timeout of a check starts once it gets a slot, so the
    /// total run time grows with the number of parameters.
    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = Some(max_parallelism.max(1));
        self
    }

    /// Run all checks and wait for every one of them
    pub async fn run(&self, base: &str, parameters: &[String]) -> Result<Vec<CheckResult>> {
        self.run_until(base, parameters, std::future::pending()).await
    }

    /// Run all checks unless `shutdown` resolves first
    ///
    /// Results come back in parameter order. Faults of single checks are part
    /// of the results; the only errors are an empty parameter list and an
    /// interruption through `shutdown`.
    #[instrument(skip_all, fields(base = %base, checks = parameters.len()))]
    pub async fn run_until<S>(
        &self,
        base: &str,
        parameters: &[String],
        shutdown: S,
    ) -> Result<Vec<CheckResult>>
    where
        S: Future<Output = ()>,
    {
        let specs = build_specs(base, parameters)?;
        let semaphore = self.max_parallelism.map(|n| Arc::new(Semaphore::new(n)));

        let mut set = JoinSet::new();
        let mut pending: HashMap<task::Id, CheckSpec> = HashMap::with_capacity(specs.len());

        for spec in specs {
            let runner = Arc::clone(&self.runner);
            let semaphore = semaphore.clone();
            let timeout = self.timeout;
            let task_spec = spec.clone();

            let handle = set.spawn(async move {
                // Hold the permit until the check finished
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                runner.run(&task_spec, timeout).await
            });
            pending.insert(handle.id(), spec);
        }
        debug!("spawned {} checks with timeout {:?}", pending.len(), self.timeout);

        let mut results = Vec::with_capacity(pending.len());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                joined = set.join_next_with_id() => match joined {
                    Some(Ok((id, result))) => {
                        pending.remove(&id);
                        results.push(result);
                    }
                    Some(Err(e)) => match pending.remove(&e.id()) {
                        Some(spec) => {
                            error!("check task for '{}' failed: {e}", spec.parameter);
                            results.push(CheckResult::faulted(
                                &spec,
                                Fault::Aborted(e.to_string()),
                                Duration::ZERO,
                            ));
                        }
                        None => error!("untracked check task failed: {e}"),
                    },
                    None => break,
                },

                _ = &mut shutdown => {
                    warn!("shutdown requested, aborting {} running checks", set.len());
                    set.shutdown().await;
                    return Err(Error::Interrupted);
                }
            }
        }

        results.sort_by_key(|result| result.index);
        debug!("collected {} results", results.len());
        Ok(results)
    }
}

/// One spec per parameter, duplicates included
pub fn build_specs(base: &str, parameters: &[String]) -> Result<Vec<CheckSpec>> {
    if parameters.is_empty() {
        return Err(Error::NoParameters);
    }

    let base: Arc<str> = Arc::from(base.trim());
    Ok(parameters
        .iter()
        .enumerate()
        .map(|(index, parameter)| CheckSpec::new(index, Arc::clone(&base), parameter.as_str()))
        .collect())
}
