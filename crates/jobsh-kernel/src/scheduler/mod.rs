//! Scheduler module for jobsh: pipelines and the jobs they become.
//!
//! This module provides:
//! - **Pipeline execution**: fork one process per stage, connect them with
//!   pipes and put them in one process group.
//! - **Job tracking**: every launched pipeline is a [`Job`] in the
//!   [`JobTable`] until all of its processes have terminated.
//! - **Foreground waits**: block on a job that owns the terminal until it
//!   completes or stops.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PipelineRunner                          │
//! │  ┌─────────┐    pipe     ┌─────────┐    pipe     ┌────────┐│
//! │  │ stage 0 │────────────▶│ stage 1 │────────────▶│ stage 2││
//! │  │ (fork)  │   stdout    │ (fork)  │   stdout    │ (fork) ││
//! │  └─────────┘             └─────────┘             └────────┘│
//! │        process group = pid of stage 0                       │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       JobTable                              │
//! │  jobs: Vec<Job>   (launch order)                            │
//! │  - register(pipeline, pgid, pids) → &mut Job                │
//! │  - apply(WaitStatus) → (JobId, Transition)                  │
//! │  - current() → JobId                                        │
//! │  - list() → Vec<JobInfo>                                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod job;
mod pipeline;
mod wait;

pub use job::{Job, JobTable, Process, ProcessState, Transition};
pub use pipeline::{ExecError, PipelineRunner};
pub use wait::{wait_for_job, wait_in_foreground, WaitOutcome};
