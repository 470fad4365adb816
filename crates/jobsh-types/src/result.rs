//! ExecResult: the structured result of every command the shell runs.

/// The result of executing a builtin or launching a pipeline.
///
/// - `code`: exit code (0 = success)
/// - `out`: text for stdout
/// - `err`: text for stderr
///
/// Pipelines report whether the launch itself worked; the exit status of the
/// processes is not aggregated into `code`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecResult {
    /// Exit code. 0 means success.
    pub code: i64,
    /// Standard output text.
    pub out: String,
    /// Standard error text.
    pub err: String,
}

impl ExecResult {
    /// Create a successful result with output.
    pub fn success(out: impl Into<String>) -> Self {
        Self {
            code: 0,
            out: out.into(),
            err: String::new(),
        }
    }

    /// Create a failed result with an error message.
    pub fn failure(code: i64, err: impl Into<String>) -> Self {
        Self {
            code,
            out: String::new(),
            err: err.into(),
        }
    }

    /// True if the exit code is 0.
    pub fn ok(&self) -> bool {
        self.code == 0
    }
}
