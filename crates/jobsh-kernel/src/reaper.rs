//! Status monitor: folds child state changes into the job table.
//!
//! Two modes, chosen once at startup:
//!
//! - [`ReapMode::Poll`]: every [`Reaper::reap`] polls `waitpid` without
//!   blocking. The shell calls it once per command, before parsing.
//! - [`ReapMode::Signal`]: a `SIGCHLD` handler sets a flag and nothing else.
//!   [`Reaper::reap`] only polls when the flag is set, and the shell calls it
//!   at points it controls (before the prompt and before parsing).
//!
//! Either way the job table is only ever touched from the main thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jobsh_types::JobId;
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::scheduler::{JobTable, Transition};

/// How child state changes reach the job table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReapMode {
    /// Poll once per main-loop iteration.
    #[default]
    Poll,
    /// Poll only after `SIGCHLD` has been seen.
    Signal,
}

/// A user-visible job status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub job: JobId,
    pub kind: NoticeKind,
    pub command: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Stopped,
    Finished,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            NoticeKind::Stopped => "Stopped",
            NoticeKind::Finished => "Finished",
        };
        write!(f, "{}: {}", label, self.command)
    }
}

#[derive(Debug)]
pub struct Reaper {
    mode: ReapMode,
    pending: Arc<AtomicBool>,
}

impl Reaper {
    pub fn new(mode: ReapMode) -> Self {
        Self {
            mode,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn mode(&self) -> ReapMode {
        self.mode
    }

    /// The flag a `SIGCHLD` handler should set.
    pub fn pending_flag(&self) -> &Arc<AtomicBool> {
        &self.pending
    }

    /// Record that a child changed state (what the signal handler does).
    pub fn notify(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Reconcile pending child state changes into `jobs`.
    ///
    /// Completed jobs are removed; the returned notices are for the caller
    /// to print.
    pub fn reap(&self, jobs: &mut JobTable) -> Vec<Notice> {
        if self.mode == ReapMode::Signal && !self.pending.swap(false, Ordering::SeqCst) {
            return Vec::new();
        }
        reconcile(jobs)
    }
}

impl Default for Reaper {
    fn default() -> Self {
        Self::new(ReapMode::default())
    }
}

/// Drain every pending state change without blocking.
pub fn reconcile(jobs: &mut JobTable) -> Vec<Notice> {
    let mut notices = Vec::new();
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED;

    loop {
        let status = match waitpid(Pid::from_raw(-1), Some(flags)) {
            Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
            Err(Errno::EINTR) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "waitpid failed while reaping");
                break;
            }
            Ok(status) => status,
        };

        match jobs.apply(&status) {
            Some((id, Transition::Stopped)) => {
                if let Some(job) = jobs.get(id) {
                    notices.push(Notice {
                        job: id,
                        kind: NoticeKind::Stopped,
                        command: job.command(),
                    });
                }
            }
            Some((id, Transition::Completed)) => {
                if let Some(job) = jobs.remove(id) {
                    if job.is_background() {
                        notices.push(Notice {
                            job: id,
                            kind: NoticeKind::Finished,
                            command: job.command(),
                        });
                    }
                }
            }
            Some((_, Transition::Progressed)) => {}
            None => tracing::debug!(?status, "state change for a process outside the job table"),
        }
    }

    notices
}
