//! Execution context for builtins.

use std::io::Write;

use crate::scheduler::JobTable;
use crate::terminal::Terminal;

/// What a builtin may touch while it runs.
pub struct ExecContext<'a> {
    /// The shell's job table.
    pub jobs: &'a mut JobTable,
    /// Terminal ownership, for builtins that move jobs to the foreground.
    pub terminal: &'a Terminal,
    /// Immediate output, flushed before any blocking wait.
    pub out: &'a mut dyn Write,
}

impl<'a> ExecContext<'a> {
    pub fn new(jobs: &'a mut JobTable, terminal: &'a Terminal, out: &'a mut dyn Write) -> Self {
        Self { jobs, terminal, out }
    }

    /// Write `text` to the immediate output and flush it.
    pub fn announce(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write builtin output");
        }
    }
}
