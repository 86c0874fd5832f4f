//! Check invoker - runs one sub-check as a child process
//!
//! Each invocation runs `<shell> -c "<base> <parameter>"` with stdin closed,
//! stderr discarded and stdout captured. The child's exit code is mapped to a
//! [`Severity`] through the status model; everything else (spawn failures,
//! timeouts, codes outside the protocol, missing output) becomes an
//! UNKNOWN result carrying a [`Fault`].
//!
//! ## Resource handling
//!
//! Every child leads its own process group. The group is killed when the
//! check times out or its task is aborted, so descendants of a runaway plugin
//! go with it. On timeout the child is also reaped explicitly before the
//! result is returned.
//!
//! Leaving the orchestrator's process group means a group kill aimed at the
//! orchestrator no longer reaches the checks. On Linux each child therefore
//! asks for `SIGKILL` once the orchestrator dies (`PR_SET_PDEATHSIG`). The
//! setting survives `exec`, so it covers the plugin when the shell execs it.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, instrument, trace, warn};

use crate::check::{CheckResult, CheckSpec, Fault};
use crate::status::Severity;

/// Runs a single sub-check to completion
///
/// Implementations never fail: every problem is folded into the returned
/// [`CheckResult`]. They must be `Send + Sync` as one runner is shared by all
/// tasks of a fan-out.
#[async_trait]
pub trait CheckRunner: Send + Sync {
    /// Run `spec`, giving up after `timeout`
    async fn run(&self, spec: &CheckSpec, timeout: Duration) -> CheckResult;
}

/// Runs sub-checks as shell command lines
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    shell: PathBuf,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SHELL)
    }
}

impl ProcessRunner {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    fn command(&self, spec: &CheckSpec) -> Command {
        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(spec.command_line())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .process_group(0)
            .kill_on_drop(true);

        #[cfg(target_os = "linux")]
        {
            let parent = std::process::id() as libc::pid_t;
            // SAFETY: the hook runs between fork and exec and only calls
            // async-signal-safe functions, without allocating.
            unsafe {
                command.pre_exec(move || die_with_parent(parent));
            }
        }

        command
    }
}

/// Have the kernel kill the child once the orchestrator is gone
///
/// The signal fires when the forking thread exits; tokio worker threads live
/// as long as the runtime.
#[cfg(target_os = "linux")]
fn die_with_parent(parent: libc::pid_t) -> std::io::Result<()> {
    // SAFETY: plain syscalls, no pointers involved.
    if unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    // The orchestrator may have died between fork and prctl.
    // SAFETY: as above.
    if unsafe { libc::getppid() } != parent {
        return Err(std::io::Error::from_raw_os_error(libc::ESRCH));
    }
    Ok(())
}

/// Kills the process group of a child when dropped
struct GroupGuard {
    pgid: Option<libc::pid_t>,
}

impl GroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|pid| libc::pid_t::try_from(pid).ok()),
        }
    }

    /// Forget the group once its leader has been reaped
    ///
    /// An empty group's id can be recycled, so it must not be signalled
    /// after a clean exit.
    fn disarm(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            // SAFETY: killpg only sends a signal and touches no memory.
            let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
            if rc != 0 {
                trace!(
                    "process group {pgid} already gone: {}",
                    std::io::Error::last_os_error()
                );
            }
        }
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[async_trait]
impl CheckRunner for ProcessRunner {
    #[instrument(skip_all, fields(parameter = %spec.parameter))]
    async fn run(&self, spec: &CheckSpec, timeout: Duration) -> CheckResult {
        let start = Instant::now();
        let command_line = spec.command_line();

        let mut child = match self.command(spec).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("failed to start `{command_line}`: {e}");
                return CheckResult::faulted(spec, Fault::Spawn(e.to_string()), start.elapsed());
            }
        };
        debug!("started `{command_line}` (pid {:?})", child.id());
        let mut group = GroupGuard::new(child.id());

        let Some(mut stdout) = child.stdout.take() else {
            if let Err(e) = child.kill().await {
                debug!("failed to kill child without stdout: {e}");
            }
            return CheckResult::faulted(
                spec,
                Fault::Io("stdout was not captured".to_string()),
                start.elapsed(),
            );
        };

        // Read and wait concurrently so a chatty child cannot block on a full pipe.
        let collect = async {
            let mut buffer = Vec::new();
            let (status, read) = tokio::join!(child.wait(), stdout.read_to_end(&mut buffer));
            read?;
            Ok::<_, std::io::Error>((status?, buffer))
        };

        let outcome = tokio::time::timeout(timeout, collect).await;
        let elapsed = start.elapsed();

        let result = match outcome {
            Ok(Ok((status, buffer))) => {
                group.disarm();
                evaluate(spec, status, &buffer, elapsed)
            }
            Ok(Err(e)) => {
                // Both futures finished, so the leader may already be reaped.
                group.disarm();
                if let Err(kill_err) = child.kill().await {
                    debug!("failed to kill child after i/o error: {kill_err}");
                }
                CheckResult::faulted(spec, Fault::Io(e.to_string()), elapsed)
            }
            Err(_) => {
                group.kill();
                if let Err(e) = child.kill().await {
                    // The shell may already be gone while a descendant still holds stdout.
                    debug!("failed to kill timed out child: {e}");
                }
                CheckResult::faulted(spec, Fault::Timeout(timeout), elapsed)
            }
        };

        match &result.fault {
            Some(fault) => warn!("`{command_line}` faulted: {fault}"),
            None => trace!("`{command_line}` reported {} in {elapsed:?}", result.severity),
        }

        result
    }
}

/// Interpret the terminal state of a finished sub-check
///
/// The exit code decides the severity; the output is only checked for
/// presence, never parsed.
pub fn evaluate(spec: &CheckSpec, status: ExitStatus, stdout: &[u8], elapsed: Duration) -> CheckResult {
    let Some(code) = status.code() else {
        return CheckResult::faulted(spec, Fault::Signalled(status.to_string()), elapsed);
    };

    let Some(severity) = Severity::from_exit_code(code) else {
        return CheckResult::faulted(spec, Fault::UnexpectedExit { code }, elapsed);
    };

    let message = String::from_utf8_lossy(stdout).trim_end().to_string();
    if message.is_empty() {
        return CheckResult::faulted(spec, Fault::NoOutput { code }, elapsed);
    }

    CheckResult::reported(spec, severity, message, elapsed)
}
