//! Blocking wait on a foreground job.
//!
//! Stages are waited on in pipeline order with `WUNTRACED`. The first stop
//! seen sends `SIGSTOP` to the whole group so no stage keeps running behind
//! the shell's back, and the job is only flagged stopped once every
//! remaining stage has reported.

use jobsh_types::{ExecResult, JobId};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use super::job::{Job, JobTable, Process, ProcessState};
use crate::signals::ForegroundGuard;
use crate::terminal::Terminal;

/// How a foreground wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Every stage terminated.
    Completed,
    /// The job stopped; all of its live stages are stopped.
    Stopped,
    /// Wait errors left some stage unaccounted for.
    Incomplete,
}

/// Block until `pid` exits, is killed or stops.
fn wait_stage(pid: Pid) -> Result<WaitStatus, Errno> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(status @ (WaitStatus::Exited(..) | WaitStatus::Signaled(..) | WaitStatus::Stopped(..))) => {
                return Ok(status)
            }
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Wait for every stage of `job` to terminate or stop.
pub fn wait_for_job(job: &mut Job) -> WaitOutcome {
    let _foreground = ForegroundGuard::enter();
    let mut stop_seen = false;

    for index in 0..job.processes().len() {
        let Process { pid, state } = job.processes()[index].clone();
        if state.is_terminated() || (stop_seen && state == ProcessState::Stopped) {
            continue;
        }

        match wait_stage(pid) {
            Ok(status) => {
                if job.record(&status) == Some(ProcessState::Stopped) && !stop_seen {
                    stop_seen = true;
                    tracing::debug!(job = %job.id(), stage = index, "stage stopped, stopping group");
                    if let Err(e) = killpg(job.pgid(), Signal::SIGSTOP) {
                        tracing::warn!(job = %job.id(), error = %e, "failed to stop process group");
                    }
                }
            }
            Err(Errno::ECHILD) => {
                tracing::debug!(job = %job.id(), pid = pid.as_raw(), "stage already reaped");
                job.mark_lost(index);
            }
            Err(e) => {
                tracing::warn!(job = %job.id(), pid = pid.as_raw(), error = %e, "waitpid failed");
            }
        }
    }

    if job.is_completed() {
        WaitOutcome::Completed
    } else if stop_seen {
        job.mark_stopped();
        WaitOutcome::Stopped
    } else {
        WaitOutcome::Incomplete
    }
}

/// Wait on a job that owns the terminal, then take the terminal back.
///
/// A completed job is removed from the table; a stopped one stays and is
/// reported. Used both for new foreground pipelines and for `fg`.
pub fn wait_in_foreground(jobs: &mut JobTable, terminal: &Terminal, id: JobId) -> ExecResult {
    let Some(job) = jobs.get_mut(id) else {
        return ExecResult::default();
    };
    let outcome = wait_for_job(job);
    let command = job.command();

    if let Err(e) = terminal.reclaim_terminal() {
        tracing::warn!(error = %e, "failed to reclaim terminal");
    }

    match outcome {
        WaitOutcome::Completed => {
            jobs.remove(id);
            ExecResult::default()
        }
        WaitOutcome::Stopped => {
            // The tty echoes ^Z without a newline.
            let lead = if terminal.is_interactive() { "\n" } else { "" };
            ExecResult::success(format!("{lead}Stopped: {command}\n"))
        }
        WaitOutcome::Incomplete => ExecResult::default(),
    }
}
