//! Controlling-terminal ownership.
//!
//! Which process group receives terminal input and keyboard-generated
//! signals is a single OS-level fact. The shell hands it to a job's group
//! when the job runs in the foreground and takes it back afterwards. None of
//! this is tracked locally beyond the shell's own group.
//!
//! When standard input is not a terminal every operation is a silent no-op,
//! so the shell behaves the same when driven through a pipe.

use std::io::IsTerminal;

use nix::unistd::{getpgrp, tcsetpgrp, Pid};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("failed to give terminal to process group {pgid}: {source}")]
    Transfer {
        pgid: i32,
        #[source]
        source: nix::errno::Errno,
    },
}

#[derive(Debug, Clone)]
pub struct Terminal {
    shell_pgid: Pid,
    interactive: bool,
}

impl Terminal {
    /// Inspect the current process: its group, and whether stdin is a tty.
    pub fn detect() -> Self {
        Self {
            shell_pgid: getpgrp(),
            interactive: std::io::stdin().is_terminal(),
        }
    }

    /// A terminal handle that never touches the tty.
    pub fn non_interactive() -> Self {
        Self {
            shell_pgid: getpgrp(),
            interactive: false,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Make `pgid` the terminal's foreground process group.
    pub fn give_terminal_to(&self, pgid: Pid) -> Result<(), TerminalError> {
        if !self.interactive {
            return Ok(());
        }
        tcsetpgrp(std::io::stdin(), pgid).map_err(|source| TerminalError::Transfer {
            pgid: pgid.as_raw(),
            source,
        })?;
        tracing::trace!(pgid = pgid.as_raw(), "terminal transferred");
        Ok(())
    }

    /// Take the terminal back for the shell's group.
    pub fn reclaim_terminal(&self) -> Result<(), TerminalError> {
        self.give_terminal_to(self.shell_pgid)
    }
}
