//! jobsh REPL: the interactive front end of the job-control shell.
//!
//! This REPL drives a jobsh kernel one line at a time. It handles:
//! - Shell-level commands: `exit`, `quit`, `help`
//! - Command execution via the Kernel
//! - Reaping at the points the main loop controls
//! - Line editing via rustyline when stdin is a terminal

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::{Cmd, DefaultEditor, KeyEvent};

use jobsh_kernel::{Kernel, KernelConfig, ReapMode};
use jobsh_types::ExecResult;

/// What the loop should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Show the result and read the next line.
    Continue(ExecResult),
    /// Leave the loop.
    Exit,
}

const HELP_TEXT: &str = r#"jobsh: a job-control shell

Commands:
  cmd args... [< in] [| cmd ...] [> out | >> out] [&]
                     Run a pipeline; a trailing & runs it in the background
  jobs               List unfinished jobs
  fg [id]            Continue a job in the foreground and wait for it
  bg [id]            Continue a stopped job in the background
  help               Show this help
  exit, quit         Leave the shell

Job ids may be written as 2 or %2. Without an id, fg and bg act on the most
recently stopped job, else the most recently started one.
"#;

/// REPL state: the kernel and nothing else.
pub struct Repl {
    kernel: Kernel,
}

impl Repl {
    /// Create a REPL with the interactive kernel configuration.
    pub fn new(mode: ReapMode) -> Result<Self> {
        Self::with_config(KernelConfig::repl().with_reap_mode(mode))
    }

    /// Create a REPL with a custom kernel configuration.
    pub fn with_config(config: KernelConfig) -> Result<Self> {
        let kernel = Kernel::new(config).context("Failed to create kernel")?;
        Ok(Self::with_kernel(kernel))
    }

    /// Wrap an existing kernel.
    pub fn with_kernel(kernel: Kernel) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Process a single line of input.
    ///
    /// The kernel reconciles pending child state changes before it parses
    /// the line.
    pub fn process_line(&mut self, line: &str) -> Control {
        let trimmed = line.trim();
        match trimmed.split_whitespace().next() {
            Some("exit" | "quit") => Control::Exit,
            Some("help") => Control::Continue(ExecResult::success(HELP_TEXT)),
            _ => Control::Continue(self.kernel.execute(trimmed)),
        }
    }

    /// Drain pending notifications before a prompt is shown.
    ///
    /// Only signal reaping drains here; polling happens once per command.
    pub fn before_prompt(&mut self) {
        if self.kernel.reaper().mode() == ReapMode::Signal {
            self.kernel.report();
        }
    }
}

/// Where lines come from: rustyline on a terminal, plain stdin otherwise.
enum LineSource {
    Editor(Box<DefaultEditor>),
    Stdin(std::io::StdinLock<'static>),
}

impl LineSource {
    fn open(interactive: bool) -> Result<Self> {
        if !interactive {
            return Ok(LineSource::Stdin(std::io::stdin().lock()));
        }
        let mut editor = DefaultEditor::new().context("Failed to create editor")?;
        // Job control owns ^Z; the editor must not suspend the shell itself.
        editor.bind_sequence(KeyEvent::ctrl('Z'), Cmd::Noop);
        Ok(LineSource::Editor(Box::new(editor)))
    }

    /// Read one line. `Ok(None)` is end of input; an interrupted read
    /// yields an empty line so the caller simply prompts again.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self {
            LineSource::Editor(editor) => match editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        if let Err(e) = editor.add_history_entry(line.as_str()) {
                            tracing::warn!("Failed to add history entry: {}", e);
                        }
                    }
                    Ok(Some(line))
                }
                Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
                Err(ReadlineError::Eof) => Ok(None),
                Err(e) => Err(e).context("Failed to read line"),
            },
            LineSource::Stdin(stdin) => {
                let mut line = String::new();
                match stdin.read_line(&mut line) {
                    Ok(0) => Ok(None),
                    Ok(_) => Ok(Some(line)),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(Some(String::new())),
                    Err(e) => Err(e).context("Failed to read stdin"),
                }
            }
        }
    }
}

/// Print a result: `out` to stdout, `err` to stderr.
pub fn print_result(result: &ExecResult) {
    if !result.out.is_empty() {
        print!("{}", result.out);
        let _ = std::io::stdout().flush();
    }
    if !result.err.is_empty() {
        eprint!("{}", result.err);
    }
}

/// Run the REPL until end of input or `exit`.
pub fn run(config: KernelConfig) -> Result<()> {
    let mut repl = Repl::with_config(config)?;
    let interactive = repl.kernel().terminal().is_interactive();
    let mut source = LineSource::open(interactive)?;
    tracing::debug!(interactive, mode = ?repl.kernel().reaper().mode(), "repl started");

    loop {
        repl.before_prompt();
        let prompt = repl.kernel().prompt().unwrap_or("").to_string();

        let Some(line) = source.read_line(&prompt)? else {
            break;
        };

        match repl.process_line(&line) {
            Control::Continue(result) => print_result(&result),
            Control::Exit => break,
        }
    }

    Ok(())
}
