//! jobsh-kernel: the job-control core of jobsh.
//!
//! This crate provides:
//!
//! - **Lexer**: Tokenizes command lines using logos
//! - **Parser**: Builds a [`Pipeline`](jobsh_types::Pipeline) from tokens
//! - **Scheduler**: Forks pipelines into process groups and tracks them as jobs
//! - **Reaper**: Folds child state changes into the job table, by polling or
//!   on `SIGCHLD`
//! - **Signals / Terminal**: Shell signal dispositions and tty ownership
//! - **Tools**: The `jobs`, `fg` and `bg` builtins
//!
//! Unix only: everything below the parser talks to the OS through `nix`.

pub mod kernel;
pub mod lexer;
pub mod parser;
pub mod reaper;
pub mod scheduler;
pub mod signals;
pub mod terminal;
pub mod tools;

pub use kernel::{Kernel, KernelConfig, KernelError, DEFAULT_PROMPT};
pub use parser::{parse, ParseError};
pub use reaper::{Notice, NoticeKind, ReapMode, Reaper};
pub use scheduler::{ExecError, Job, JobTable, PipelineRunner, ProcessState, WaitOutcome};
pub use terminal::{Terminal, TerminalError};
