//! Pipeline execution.
//!
//! Forks one child per stage, connects neighbouring stages with pipes and
//! puts every stage in a process group led by the first one. Foreground
//! pipelines get the terminal and are waited on; background pipelines are
//! registered and left running.

use std::ffi::{c_char, CStr, CString};
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::Path;
use std::ptr;

use jobsh_types::{ExecResult, Pipeline};
use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::libc::{self, STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2, fork, getpid, pipe2, setpgid, tcsetpgrp, ForkResult, Pid};
use thiserror::Error;

use super::job::JobTable;
use super::wait::wait_in_foreground;
use crate::signals;
use crate::terminal::Terminal;

/// Failures that abort a launch before any job exists.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("pipe: {0}")]
    Pipe(#[source] Errno),
    #[error("fork: {0}")]
    Fork(#[source] Errno),
    #[error("invalid argument: {0:?}")]
    InvalidArgument(String),
}

/// Everything a child needs, converted before forking so the child does
/// not have to allocate.
///
/// `argv_ptrs[i]` is the null-terminated pointer array `execvp(3)` takes for
/// stage `i`; it borrows from `argv`, which must outlive it.
struct Prepared {
    argv: Vec<Vec<CString>>,
    argv_ptrs: Vec<Vec<*const c_char>>,
    input: Option<CString>,
    output: Option<(CString, bool)>,
}

impl Prepared {
    fn new(pipeline: &Pipeline) -> Result<Self, ExecError> {
        let argv = pipeline
            .stages
            .iter()
            .map(|stage| stage.argv.iter().map(|arg| c_string(arg)).collect())
            .collect::<Result<Vec<Vec<CString>>, _>>()?;
        if argv.is_empty() || argv.iter().any(Vec::is_empty) {
            return Err(ExecError::InvalidArgument("empty command".to_string()));
        }
        let input = pipeline.input.as_deref().map(path_c_string).transpose()?;
        let output = pipeline
            .output
            .as_ref()
            .map(|redirect| path_c_string(&redirect.path).map(|path| (path, redirect.append)))
            .transpose()?;
        let argv_ptrs = argv
            .iter()
            .map(|args| {
                args.iter()
                    .map(|arg| arg.as_ptr())
                    .chain(std::iter::once(ptr::null()))
                    .collect()
            })
            .collect();
        Ok(Self {
            argv,
            argv_ptrs,
            input,
            output,
        })
    }
}

fn c_string(s: &str) -> Result<CString, ExecError> {
    CString::new(s).map_err(|_| ExecError::InvalidArgument(s.to_string()))
}

fn path_c_string(path: &Path) -> Result<CString, ExecError> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| ExecError::InvalidArgument(path.display().to_string()))
}

/// Launches pipelines into the job table.
pub struct PipelineRunner<'a> {
    jobs: &'a mut JobTable,
    terminal: &'a Terminal,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(jobs: &'a mut JobTable, terminal: &'a Terminal) -> Self {
        Self { jobs, terminal }
    }

    /// Launch `pipeline`.
    ///
    /// Returns an error only when nothing was started. A foreground job is
    /// waited on before this returns.
    pub fn run(&mut self, pipeline: Pipeline) -> Result<ExecResult, ExecError> {
        let prepared = Prepared::new(&pipeline)?;
        let stage_count = prepared.argv.len();
        let foreground = !pipeline.background;
        let take_tty = foreground && self.terminal.is_interactive();

        let mut pipes = Vec::with_capacity(stage_count.saturating_sub(1));
        for _ in 1..stage_count {
            pipes.push(pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Pipe)?);
        }

        let mut pids: Vec<Pid> = Vec::with_capacity(stage_count);
        let mut err = String::new();

        for index in 0..stage_count {
            let leader = pids.first().copied();
            // SAFETY: the child makes raw system calls on data prepared
            // before the fork, then execs or `_exit`s without allocating.
            match unsafe { fork() } {
                Ok(ForkResult::Child) => {
                    let stage = ChildStage {
                        index,
                        last: stage_count - 1,
                        leader,
                        take_tty,
                        argv: &prepared.argv_ptrs[index],
                        input: prepared.input.as_deref(),
                        output: prepared.output.as_ref().map(|(p, a)| (p.as_c_str(), *a)),
                    };
                    stage.exec(&pipes);
                }
                Ok(ForkResult::Parent { child }) => {
                    let group = leader.unwrap_or(child);
                    match setpgid(child, group) {
                        // EACCES: the child already exec'd, after joining.
                        Ok(()) | Err(Errno::EACCES) => {}
                        Err(e) => {
                            tracing::warn!(pid = child.as_raw(), error = %e, "setpgid failed")
                        }
                    }
                    pids.push(child);
                }
                Err(e) if index == 0 => return Err(ExecError::Fork(e)),
                Err(e) => {
                    tracing::warn!(stage = index, error = %e, "fork failed, job keeps the started stages");
                    err.push_str(&format!("jobsh: fork: {e}\n"));
                    break;
                }
            }
        }

        let pgid = pids[0];
        let id = self.jobs.register(pipeline, pgid, pids).id();

        if take_tty {
            if let Err(e) = self.terminal.give_terminal_to(pgid) {
                tracing::warn!(job = %id, error = %e, "failed to hand terminal to job");
            }
        }

        // Close the parent's ends so readers see EOF when writers exit.
        drop(pipes);

        let mut result = if foreground {
            wait_in_foreground(self.jobs, self.terminal, id)
        } else {
            let command = self.jobs.get(id).map(|job| job.command()).unwrap_or_default();
            ExecResult::success(format!("Running: {command}\n"))
        };
        result.err.insert_str(0, &err);
        Ok(result)
    }
}

/// One stage, as seen from inside its freshly forked child.
struct ChildStage<'p> {
    index: usize,
    last: usize,
    leader: Option<Pid>,
    take_tty: bool,
    argv: &'p [*const c_char],
    input: Option<&'p CStr>,
    output: Option<(&'p CStr, bool)>,
}

impl ChildStage<'_> {
    fn exec(self, pipes: &[(OwnedFd, OwnedFd)]) -> ! {
        let pid = getpid();
        let group = self.leader.unwrap_or(pid);
        let _ = setpgid(pid, group);
        if self.take_tty {
            // Still ignoring SIGTTOU here, so this cannot stop us.
            // SAFETY: fd 0 is the controlling terminal in an interactive shell.
            let stdin = unsafe { BorrowedFd::borrow_raw(STDIN_FILENO) };
            let _ = tcsetpgrp(stdin, group);
        }
        signals::reset_for_child();

        if self.index > 0 {
            redirect(pipes[self.index - 1].0.as_raw_fd(), STDIN_FILENO, b"dup2");
        } else if let Some(path) = self.input {
            let fd = open_or_exit(path, OFlag::O_RDONLY, Mode::empty());
            redirect(fd, STDIN_FILENO, path.to_bytes());
            let _ = close(fd);
        }

        if self.index < self.last {
            redirect(pipes[self.index].1.as_raw_fd(), STDOUT_FILENO, b"dup2");
        } else if let Some((path, append)) = self.output {
            let mode = if append { OFlag::O_APPEND } else { OFlag::O_TRUNC };
            let flags = OFlag::O_WRONLY | OFlag::O_CREAT | mode;
            let perms = Mode::from_bits_truncate(0o644);
            let fd = open_or_exit(path, flags, perms);
            redirect(fd, STDOUT_FILENO, path.to_bytes());
            let _ = close(fd);
        }

        // Pipe ends are O_CLOEXEC; exec closes every one not dup'd above.
        // SAFETY: `argv` is null-terminated and its strings outlive the
        // call; execvp only returns on failure.
        unsafe { libc::execvp(self.argv[0], self.argv.as_ptr()) };
        let err = Errno::last();
        // SAFETY: argv[0] is a valid C string owned by `Prepared`.
        let program = unsafe { CStr::from_ptr(self.argv[0]) };
        child_fail(program.to_bytes(), err)
    }
}

fn redirect(from: RawFd, to: RawFd, what: &[u8]) {
    if let Err(e) = dup2(from, to) {
        child_fail(what, e);
    }
}

fn open_or_exit(path: &CStr, flags: OFlag, mode: Mode) -> RawFd {
    match open(path, flags, mode) {
        Ok(fd) => fd,
        Err(e) => child_fail(path.to_bytes(), e),
    }
}

/// Report `jobsh: <what>: <error>` and exit the child with status 1.
fn child_fail(what: &[u8], err: Errno) -> ! {
    // SAFETY: fd 2 stays open for the lifetime of the child.
    let stderr = unsafe { BorrowedFd::borrow_raw(STDERR_FILENO) };
    for part in [
        b"jobsh: ".as_slice(),
        what,
        b": ".as_slice(),
        err.desc().as_bytes(),
        b"\n".as_slice(),
    ] {
        let _ = nix::unistd::write(stderr, part);
    }
    // SAFETY: skips atexit handlers and stdio buffers inherited from the
    // parent, which is what a failed child must do.
    unsafe { libc::_exit(1) }
}
