//! fg: Bring a job to the foreground.

use jobsh_types::ExecResult;
use nix::sys::signal::{killpg, Signal};

use super::resolve_job;
use crate::scheduler::wait_in_foreground;
use crate::tools::{Builtin, ExecContext};

/// Fg builtin: give a job the terminal, continue it and wait for it.
pub struct Fg;

impl Builtin for Fg {
    fn name(&self) -> &str {
        "fg"
    }

    fn usage(&self) -> &str {
        "fg [job-id]"
    }

    fn execute(&self, args: &[String], ctx: &mut ExecContext<'_>) -> ExecResult {
        let id = match resolve_job(self, args, ctx.jobs) {
            Ok(id) => id,
            Err(result) => return result,
        };
        let Some(job) = ctx.jobs.get(id) else {
            return ExecResult::failure(1, format!("fg: no such job: {id}\n"));
        };
        let command = job.command();
        let pgid = job.pgid();

        let mut header = format!("{command}\n");
        if job.is_stopped() {
            header.push_str(&format!("Restarting: {command}\n"));
        }
        ctx.announce(&header);

        if let Err(e) = ctx.terminal.give_terminal_to(pgid) {
            tracing::warn!(job = %id, error = %e, "failed to hand terminal to job");
        }

        if let Err(e) = killpg(pgid, Signal::SIGCONT) {
            if let Err(reclaim) = ctx.terminal.reclaim_terminal() {
                tracing::warn!(error = %reclaim, "failed to reclaim terminal");
            }
            return ExecResult::failure(1, format!("fg: failed to continue job {id}: {e}\n"));
        }

        if let Some(job) = ctx.jobs.get_mut(id) {
            job.resume(false);
        }
        tracing::debug!(job = %id, "continued in foreground");

        wait_in_foreground(ctx.jobs, ctx.terminal, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::JobTable;
    use crate::terminal::Terminal;

    #[test]
    fn test_fg_without_jobs() {
        let mut jobs = JobTable::new();
        let terminal = Terminal::non_interactive();
        let mut sink = Vec::new();
        let mut ctx = ExecContext::new(&mut jobs, &terminal, &mut sink);

        let result = Fg.execute(&[], &mut ctx);
        assert_eq!(result.code, 1);
        assert_eq!(result.err, "fg: no current job\n");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_fg_invalid_id() {
        let mut jobs = JobTable::new();
        let terminal = Terminal::non_interactive();
        let mut sink = Vec::new();
        let mut ctx = ExecContext::new(&mut jobs, &terminal, &mut sink);

        let result = Fg.execute(&["%x".to_string()], &mut ctx);
        assert_eq!(result.err, "fg: invalid job id: %x\n");
    }
}
