//! The Kernel: the job-control core of jobsh.
//!
//! The Kernel owns and coordinates all core components:
//! - Job table (every unfinished pipeline)
//! - Terminal handle (which process group owns the tty)
//! - Reaper (how child state changes reach the table)
//! - Builtin registry (`jobs`, `fg`, `bg`)
//! - Signal dispositions, for as long as the kernel lives
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                          Kernel                            │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │   JobTable   │  │   Builtins   │  │    Terminal      │  │
//! │  │  (Vec<Job>)  │  │ (jobs/fg/bg) │  │  (tcsetpgrp)     │  │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘  │
//! │  ┌──────────────────────────────┐  ┌──────────────────┐    │
//! │  │  Reaper (poll | SIGCHLD)     │  │  SignalGuard     │    │
//! │  └──────────────────────────────┘  └──────────────────┘    │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here runs on one thread. Signal handlers installed by the
//! kernel only flip atomics; the table is reconciled in [`Kernel::report`].

use std::io::Write;

use jobsh_types::ExecResult;
use thiserror::Error;

use crate::parser::parse;
use crate::reaper::{Notice, ReapMode, Reaper};
use crate::scheduler::{JobTable, PipelineRunner};
use crate::signals::{self, SignalError, SignalGuard};
use crate::terminal::Terminal;
use crate::tools::{BuiltinRegistry, ExecContext};

/// Prompt shown by the interactive shell.
pub const DEFAULT_PROMPT: &str = "jobsh# ";

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("failed to install signal handlers: {0}")]
    Signals(#[from] SignalError),
}

/// Configuration for kernel initialization.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Name of this kernel (for log lines).
    pub name: String,

    /// How child state changes are collected.
    pub reap_mode: ReapMode,

    /// Prompt redrawn by the interrupt handler.
    pub prompt: String,

    /// Whether to install process-wide signal dispositions and manage the
    /// controlling terminal.
    ///
    /// Embedders and tests leave this off so the host process keeps its own
    /// handlers and never has its terminal taken away.
    pub install_signals: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::embedded()
    }
}

impl KernelConfig {
    /// Config for the interactive shell: signals installed, poll reaping.
    pub fn repl() -> Self {
        Self {
            name: "repl".to_string(),
            reap_mode: ReapMode::Poll,
            prompt: DEFAULT_PROMPT.to_string(),
            install_signals: true,
        }
    }

    /// Config for embedding: no process-wide signal changes, no tty.
    pub fn embedded() -> Self {
        Self {
            name: "embedded".to_string(),
            reap_mode: ReapMode::Poll,
            prompt: DEFAULT_PROMPT.to_string(),
            install_signals: false,
        }
    }

    /// Set the reaping mode.
    pub fn with_reap_mode(mut self, mode: ReapMode) -> Self {
        self.reap_mode = mode;
        self
    }

    /// Set the prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Install (or skip) signal dispositions.
    pub fn with_signals(mut self, install: bool) -> Self {
        self.install_signals = install;
        self
    }
}

/// The Kernel: runs command lines and owns every job they start.
pub struct Kernel {
    config: KernelConfig,
    jobs: JobTable,
    terminal: Terminal,
    reaper: Reaper,
    builtins: BuiltinRegistry,
    /// Where notices and immediate builtin output go.
    out: Box<dyn Write>,
    /// Handlers stay registered while this is held.
    _signals: Option<SignalGuard>,
}

impl Kernel {
    /// Create a kernel writing notices to stdout.
    pub fn new(config: KernelConfig) -> Result<Self, KernelError> {
        Self::with_output(config, Box::new(std::io::stdout()))
    }

    /// Create a kernel writing notices to `out`.
    pub fn with_output(config: KernelConfig, out: Box<dyn Write>) -> Result<Self, KernelError> {
        let terminal = if config.install_signals {
            Terminal::detect()
        } else {
            Terminal::non_interactive()
        };
        let reaper = Reaper::new(config.reap_mode);

        let signals = if config.install_signals {
            let prompt = terminal.is_interactive().then_some(config.prompt.as_str());
            Some(signals::install(config.reap_mode, prompt, reaper.pending_flag())?)
        } else {
            None
        };

        tracing::debug!(
            name = %config.name,
            mode = ?config.reap_mode,
            interactive = terminal.is_interactive(),
            "kernel created"
        );

        Ok(Self {
            config,
            jobs: JobTable::new(),
            terminal,
            reaper,
            builtins: BuiltinRegistry::with_builtins(),
            out,
            _signals: signals,
        })
    }

    /// Execute one command line.
    ///
    /// Pending child state changes are reconciled first. Parse errors and
    /// launch errors are reported in the result; nothing here is fatal.
    pub fn execute(&mut self, line: &str) -> ExecResult {
        self.report();

        let pipeline = match parse(line) {
            Ok(Some(pipeline)) => pipeline,
            Ok(None) => return ExecResult::default(),
            Err(e) => {
                return ExecResult::failure(1, format!("jobsh: parse error {}: {}\n", e.code(), e))
            }
        };

        let program = pipeline.stages[0].program().to_string();
        if let Some(builtin) = self.builtins.get(&program) {
            if pipeline.stage_count() > 1
                || pipeline.input.is_some()
                || pipeline.output.is_some()
                || pipeline.background
            {
                return ExecResult::failure(
                    1,
                    format!("jobsh: {program}: builtins cannot be piped, redirected or backgrounded\n"),
                );
            }
            let args = &pipeline.stages[0].argv[1..];
            let mut ctx = ExecContext::new(&mut self.jobs, &self.terminal, self.out.as_mut());
            return builtin.execute(args, &mut ctx);
        }

        let mut runner = PipelineRunner::new(&mut self.jobs, &self.terminal);
        match runner.run(pipeline) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "launch failed");
                ExecResult::failure(1, format!("jobsh: {e}\n"))
            }
        }
    }

    /// Reconcile child state changes, returning the notices.
    pub fn reap(&mut self) -> Vec<Notice> {
        self.reaper.reap(&mut self.jobs)
    }

    /// Reconcile child state changes and print the notices.
    pub fn report(&mut self) {
        let notices = self.reap();
        if notices.is_empty() {
            return;
        }
        let mut text = String::new();
        for notice in &notices {
            text.push_str(&notice.to_string());
            text.push('\n');
        }
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write job notices");
        }
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn reaper(&self) -> &Reaper {
        &self.reaper
    }

    /// The prompt to show, or `None` when input is not a terminal.
    pub fn prompt(&self) -> Option<&str> {
        self.terminal
            .is_interactive()
            .then_some(self.config.prompt.as_str())
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("config", &self.config)
            .field("jobs", &self.jobs.len())
            .field("terminal", &self.terminal)
            .field("reaper", &self.reaper)
            .finish()
    }
}
