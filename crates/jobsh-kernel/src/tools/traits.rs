//! Core builtin trait.

use jobsh_types::ExecResult;

use super::context::ExecContext;

/// A command handled inside the shell process instead of being forked.
///
/// Builtins receive their arguments without the command name and report
/// through the returned [`ExecResult`]. Output that must appear before the
/// builtin blocks (for example `fg` announcing the job it resumes) is written
/// to [`ExecContext::out`] directly.
pub trait Builtin: Send + Sync {
    /// The command name this builtin answers to.
    fn name(&self) -> &str;

    /// One-line usage shown on misuse.
    fn usage(&self) -> &str {
        self.name()
    }

    /// Run the builtin.
    fn execute(&self, args: &[String], ctx: &mut ExecContext<'_>) -> ExecResult;
}
