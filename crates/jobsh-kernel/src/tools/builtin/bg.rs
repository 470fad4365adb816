//! bg: Resume a stopped job in the background.

use jobsh_types::ExecResult;
use nix::sys::signal::{killpg, Signal};

use super::resolve_job;
use crate::tools::{Builtin, ExecContext};

/// Bg builtin: continue a stopped job without waiting for it.
pub struct Bg;

impl Builtin for Bg {
    fn name(&self) -> &str {
        "bg"
    }

    fn usage(&self) -> &str {
        "bg [job-id]"
    }

    fn execute(&self, args: &[String], ctx: &mut ExecContext<'_>) -> ExecResult {
        let id = match resolve_job(self, args, ctx.jobs) {
            Ok(id) => id,
            Err(result) => return result,
        };
        let Some(job) = ctx.jobs.get_mut(id) else {
            return ExecResult::failure(1, format!("bg: no such job: {id}\n"));
        };

        if !job.is_stopped() {
            return ExecResult::failure(1, format!("bg: job {id} is already running\n"));
        }

        if let Err(e) = killpg(job.pgid(), Signal::SIGCONT) {
            return ExecResult::failure(1, format!("bg: failed to continue job {id}: {e}\n"));
        }
        job.resume(true);
        tracing::debug!(job = %id, "continued in background");

        ExecResult::success(format!("Running: {}\n", job.command()))
    }
}
