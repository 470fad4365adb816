//! Job records and the job table.
//!
//! A [`Job`] is one pipeline invocation: one OS process per stage, all in a
//! single process group led by the first stage. The [`JobTable`] owns every
//! job from launch until all of its processes have terminated.

use jobsh_types::{JobId, JobInfo, JobStatus, Pipeline};
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

/// OS-level state of one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Stopped,
    Exited(i32),
    Signaled(Signal),
    /// Reaped outside our bookkeeping (the wait reported no such child).
    Lost,
}

impl ProcessState {
    /// True once the process is gone for good.
    pub fn is_terminated(&self) -> bool {
        matches!(
            self,
            ProcessState::Exited(_) | ProcessState::Signaled(_) | ProcessState::Lost
        )
    }
}

/// One stage's process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub pid: Pid,
    pub state: ProcessState,
}

/// What a recorded state change did to its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A stage changed state but the job's status did not.
    Progressed,
    /// The job went from running to stopped.
    Stopped,
    /// The last running stage terminated.
    Completed,
}

/// A single pipeline invocation.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    pgid: Pid,
    processes: Vec<Process>,
    pipeline: Pipeline,
    background: bool,
    stopped: bool,
    completed: bool,
}

impl Job {
    fn new(id: JobId, pipeline: Pipeline, pgid: Pid, pids: Vec<Pid>) -> Self {
        let processes = pids
            .into_iter()
            .map(|pid| Process {
                pid,
                state: ProcessState::Running,
            })
            .collect();
        Self {
            id,
            pgid,
            processes,
            background: pipeline.background,
            pipeline,
            stopped: false,
            completed: false,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Process group shared by every stage; equals the first stage's pid.
    pub fn pgid(&self) -> Pid {
        self.pgid
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Command text for notices: stage argvs joined by ` | `.
    pub fn command(&self) -> String {
        self.pipeline.command_line()
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn status(&self) -> JobStatus {
        if self.completed {
            JobStatus::Done
        } else if self.stopped {
            JobStatus::Stopped
        } else {
            JobStatus::Running
        }
    }

    pub fn info(&self) -> JobInfo {
        JobInfo {
            id: self.id,
            command: self.command(),
            status: self.status(),
            background: self.background,
            pgid: self.pgid.as_raw(),
            pids: self.processes.iter().map(|p| p.pid.as_raw()).collect(),
        }
    }

    /// Index of the stage running as `pid`.
    pub fn stage_index(&self, pid: Pid) -> Option<usize> {
        self.processes.iter().position(|p| p.pid == pid)
    }

    /// Record a wait status against the stage it names.
    ///
    /// Only updates the stage; the job-level `stopped` flag is left to the
    /// caller. Marks the job completed once every stage has terminated.
    /// Returns the stage's new state, or `None` if the status is not about
    /// one of our stages or carries no state change we track.
    pub(crate) fn record(&mut self, status: &WaitStatus) -> Option<ProcessState> {
        if self.completed {
            return None;
        }
        let index = self.stage_index(status.pid()?)?;
        let state = match *status {
            WaitStatus::Exited(_, code) => ProcessState::Exited(code),
            WaitStatus::Signaled(_, signal, _) => ProcessState::Signaled(signal),
            WaitStatus::Stopped(_, _) => ProcessState::Stopped,
            WaitStatus::Continued(_) => ProcessState::Running,
            _ => return None,
        };
        self.set_stage_state(index, state);
        Some(state)
    }

    /// Mark a stage whose exit status can no longer be collected.
    pub(crate) fn mark_lost(&mut self, index: usize) {
        self.set_stage_state(index, ProcessState::Lost);
    }

    fn set_stage_state(&mut self, index: usize, state: ProcessState) {
        if let Some(process) = self.processes.get_mut(index) {
            process.state = state;
        }
        if self.processes.iter().all(|p| p.state.is_terminated()) {
            self.completed = true;
            self.stopped = false;
        }
    }

    /// Apply a wait status observed by the reaper.
    pub fn apply(&mut self, status: &WaitStatus) -> Option<Transition> {
        let state = self.record(status)?;
        if self.completed {
            return Some(Transition::Completed);
        }
        if state == ProcessState::Stopped && !self.stopped {
            self.stopped = true;
            return Some(Transition::Stopped);
        }
        Some(Transition::Progressed)
    }

    /// Flag the job stopped once its stages have all reported.
    pub(crate) fn mark_stopped(&mut self) {
        if !self.completed {
            self.stopped = true;
        }
    }

    /// Bookkeeping for a continuation that has just been sent.
    pub(crate) fn resume(&mut self, background: bool) {
        self.stopped = false;
        self.background = background;
        for process in &mut self.processes {
            if process.state == ProcessState::Stopped {
                process.state = ProcessState::Running;
            }
        }
    }
}

/// Registry of in-flight jobs, in launch order.
///
/// Lookups are linear scans; the order is what "most recent" refers to.
#[derive(Debug)]
pub struct JobTable {
    jobs: Vec<Job>,
    /// Never reset and never derived from `jobs.len()`, so ids stay unique
    /// when jobs finish out of order.
    next_id: u64,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 1,
        }
    }

    /// Create a job for freshly forked processes and return it.
    ///
    /// `pgid` must be the first stage's pid.
    pub fn register(&mut self, pipeline: Pipeline, pgid: Pid, pids: Vec<Pid>) -> &mut Job {
        let id = JobId(self.next_id);
        self.next_id += 1;
        tracing::debug!(job = %id, pgid = pgid.as_raw(), stages = pids.len(), "job registered");
        self.jobs.push(Job::new(id, pipeline, pgid, pids));
        let index = self.jobs.len() - 1;
        &mut self.jobs[index]
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    /// The job `fg`/`bg` act on without an argument: the most recently
    /// launched stopped job, otherwise the most recent unfinished one.
    pub fn current(&self) -> Option<JobId> {
        self.jobs
            .iter()
            .rev()
            .find(|j| j.stopped)
            .or_else(|| self.jobs.iter().rev().find(|j| !j.completed))
            .map(|j| j.id)
    }

    /// Jobs that have not completed, in launch order.
    pub fn active(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|j| !j.completed)
    }

    pub fn list(&self) -> Vec<JobInfo> {
        self.active().map(Job::info).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    /// Find the job owning a process.
    pub fn find_by_pid_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        self.jobs
            .iter_mut()
            .find(|j| j.processes.iter().any(|p| p.pid == pid))
    }

    /// Apply a wait status to whichever job owns the reported pid.
    pub fn apply(&mut self, status: &WaitStatus) -> Option<(JobId, Transition)> {
        let job = self.find_by_pid_mut(status.pid()?)?;
        let transition = job.apply(status)?;
        Some((job.id, transition))
    }

    /// Remove a job, handing it back to the caller. Dropping it releases
    /// everything it owns.
    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        let index = self.jobs.iter().position(|j| j.id == id)?;
        let job = self.jobs.remove(index);
        tracing::debug!(job = %id, status = %job.status(), "job removed");
        Some(job)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}
