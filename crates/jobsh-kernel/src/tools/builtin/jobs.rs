//! jobs: List unfinished jobs.

use jobsh_types::ExecResult;

use super::no_arguments;
use crate::tools::{Builtin, ExecContext};

/// Jobs builtin: one `[id] command (status)` line per unfinished job.
pub struct Jobs;

impl Builtin for Jobs {
    fn name(&self) -> &str {
        "jobs"
    }

    fn usage(&self) -> &str {
        "jobs"
    }

    fn execute(&self, args: &[String], ctx: &mut ExecContext<'_>) -> ExecResult {
        if let Err(result) = no_arguments(self, args) {
            return result;
        }
        let mut text = String::new();
        for info in ctx.jobs.list() {
            text.push_str(&format!("[{}] {} ({})\n", info.id, info.command, info.status));
        }
        ExecResult::success(text)
    }
}
