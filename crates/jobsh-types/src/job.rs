//! Job identification and status types.

/// Unique identifier for a job.
///
/// Ids come from a counter owned by the job table and are never reused
/// while the shell runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    /// Accepts `3` as well as the `%3` job-spec form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('%').unwrap_or(s);
        digits.parse::<u64>().map(JobId)
    }
}

/// Status of a job as shown by `jobs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// At least one stage is still running.
    Running,
    /// Job was stopped by a signal (e.g., Ctrl-Z / SIGTSTP).
    Stopped,
    /// Every stage has terminated.
    Done,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Stopped => write!(f, "stopped"),
            JobStatus::Done => write!(f, "done"),
        }
    }
}

/// Snapshot of a job for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    /// Job ID.
    pub id: JobId,
    /// Reconstructed command line.
    pub command: String,
    /// Current status.
    pub status: JobStatus,
    /// Whether the job was started (or resumed) in the background.
    pub background: bool,
    /// Process group of the job.
    pub pgid: i32,
    /// Stage pids in pipeline order.
    pub pids: Vec<i32>,
}
