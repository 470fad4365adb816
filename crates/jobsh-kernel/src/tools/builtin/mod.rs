//! Built-in commands for jobsh.
//!
//! All of them work on the job table: `jobs` reads it, `fg` and `bg` send
//! `SIGCONT` to a job's process group and update its flags.

mod bg;
mod fg;
mod jobs;

use jobsh_types::{ExecResult, JobId};

use super::{Builtin, BuiltinRegistry};
use crate::scheduler::JobTable;

/// Register all built-in commands with the registry.
pub fn register_builtins(registry: &mut BuiltinRegistry) {
    registry.register(bg::Bg);
    registry.register(fg::Fg);
    registry.register(jobs::Jobs);
}

/// Reject any arguments at all, for builtins that take none.
pub fn no_arguments(builtin: &dyn Builtin, args: &[String]) -> Result<(), ExecResult> {
    match args {
        [] => Ok(()),
        _ => Err(usage_error(builtin)),
    }
}

fn usage_error(builtin: &dyn Builtin) -> ExecResult {
    ExecResult::failure(
        1,
        format!("{}: too many arguments\nusage: {}\n", builtin.name(), builtin.usage()),
    )
}

/// Pick the job a `fg`/`bg` invocation refers to.
///
/// With an argument (`2` or `%2`) that job must exist and be unfinished.
/// Without one, the current job is used. Failures come back as the
/// builtin's result, ready to return.
pub fn resolve_job(builtin: &dyn Builtin, args: &[String], jobs: &JobTable) -> Result<JobId, ExecResult> {
    let name = builtin.name();
    if args.len() > 1 {
        return Err(usage_error(builtin));
    }
    let Some(arg) = args.first() else {
        return jobs
            .current()
            .ok_or_else(|| ExecResult::failure(1, format!("{name}: no current job\n")));
    };

    let id: JobId = arg
        .parse()
        .map_err(|_| ExecResult::failure(1, format!("{name}: invalid job id: {arg}\n")))?;

    match jobs.get(id) {
        Some(job) if !job.is_completed() => Ok(id),
        _ => Err(ExecResult::failure(1, format!("{name}: no such job: {arg}\n"))),
    }
}
