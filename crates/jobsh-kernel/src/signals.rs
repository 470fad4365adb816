//! Process-wide signal dispositions for the shell.
//!
//! - `SIGTTOU`, `SIGTTIN`: ignored, so the shell is never stopped for
//!   touching the terminal while another group owns it.
//! - `SIGINT`, `SIGTSTP`: caught so they never kill or stop the shell. When
//!   no foreground wait is in progress the handler redraws the prompt.
//! - `SIGCHLD` (signal reaping only): sets the reaper's pending flag.
//!
//! Handlers only touch atomics and call `write(2)`. Everything else,
//! including every job table change, happens on the main thread.

use std::os::fd::BorrowedFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::sys::signal::{signal, SigHandler, Signal};
use signal_hook::consts::{SIGCHLD, SIGINT, SIGTSTP};
use signal_hook::SigId;
use thiserror::Error;

use crate::reaper::ReapMode;

/// Set while the shell is blocked waiting on a foreground job.
static FOREGROUND_ACTIVE: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("failed to register handler for signal {signal}: {source}")]
    Register {
        signal: i32,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to set disposition of {signal}: {source}")]
    Disposition {
        signal: Signal,
        #[source]
        source: nix::errno::Errno,
    },
}

/// Marks a foreground wait for as long as it is alive.
pub struct ForegroundGuard(());

impl ForegroundGuard {
    pub fn enter() -> Self {
        FOREGROUND_ACTIVE.store(true, Ordering::SeqCst);
        ForegroundGuard(())
    }
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        FOREGROUND_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Whether a foreground job currently has the shell's attention.
pub fn foreground_active() -> bool {
    FOREGROUND_ACTIVE.load(Ordering::SeqCst)
}

/// Registered handlers; they are removed again when this is dropped.
#[derive(Debug)]
pub struct SignalGuard {
    ids: Vec<SigId>,
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}

/// Install the shell's dispositions.
///
/// `prompt` is what the interrupt handler redraws; `None` keeps the handler
/// silent (non-interactive input). `pending` is set on `SIGCHLD` when
/// `mode` is [`ReapMode::Signal`].
pub fn install(
    mode: ReapMode,
    prompt: Option<&str>,
    pending: &Arc<AtomicBool>,
) -> Result<SignalGuard, SignalError> {
    for sig in [Signal::SIGTTOU, Signal::SIGTTIN] {
        // SAFETY: ignoring a signal installs no handler code.
        unsafe { signal(sig, SigHandler::SigIgn) }.map_err(|source| SignalError::Disposition {
            signal: sig,
            source,
        })?;
    }

    let mut guard = SignalGuard { ids: Vec::new() };
    let redraw: Arc<[u8]> = match prompt {
        Some(p) => format!("\n{p}").into_bytes().into(),
        None => Arc::from(Vec::new()),
    };

    for sig in [SIGINT, SIGTSTP] {
        let redraw = Arc::clone(&redraw);
        // SAFETY: the handler loads an atomic and calls write(2), both
        // async-signal-safe. It neither allocates nor locks.
        let id = unsafe {
            signal_hook::low_level::register(sig, move || {
                if !redraw.is_empty() && !FOREGROUND_ACTIVE.load(Ordering::SeqCst) {
                    let stdout = BorrowedFd::borrow_raw(nix::libc::STDOUT_FILENO);
                    let _ = nix::unistd::write(stdout, &redraw);
                }
            })
        }
        .map_err(|source| SignalError::Register { signal: sig, source })?;
        guard.ids.push(id);
    }

    if mode == ReapMode::Signal {
        let id = signal_hook::flag::register(SIGCHLD, Arc::clone(pending))
            .map_err(|source| SignalError::Register {
                signal: SIGCHLD,
                source,
            })?;
        guard.ids.push(id);
    }

    tracing::debug!(?mode, handlers = guard.ids.len(), "signal dispositions installed");
    Ok(guard)
}

/// Restore default dispositions for job-control signals in a freshly
/// forked child, before it execs.
pub(crate) fn reset_for_child() {
    for sig in [
        Signal::SIGINT,
        Signal::SIGTSTP,
        Signal::SIGTTOU,
        Signal::SIGTTIN,
        Signal::SIGCHLD,
    ] {
        // SAFETY: restoring SIG_DFL installs no handler code.
        let _ = unsafe { signal(sig, SigHandler::SigDfl) };
    }
}
