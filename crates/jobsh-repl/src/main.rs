//! jobsh CLI entry point.
//!
//! Usage:
//!   jobsh                      # Interactive shell (or read lines from stdin)
//!   jobsh --async              # Same, reaping on SIGCHLD instead of polling
//!   jobsh -c <command>         # Execute one command line and exit

use std::env;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use jobsh_kernel::{KernelConfig, ReapMode};
use jobsh_repl::{Control, Repl};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    // Logs go to stderr so they never mix with job output (RUST_LOG filters)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("jobsh: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Parsed command line.
#[derive(Debug, Default)]
struct Options {
    mode: ReapMode,
    command: Option<String>,
}

fn run() -> Result<ExitCode> {
    let mut options = Options::default();
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--async" => options.mode = ReapMode::Signal,
            "-c" => {
                let command = args.next().context("-c requires a command argument")?;
                options.command = Some(command);
            }
            "--help" | "-h" => {
                print_help();
                return Ok(ExitCode::SUCCESS);
            }
            "--version" | "-V" => {
                println!(
                    "jobsh {} ({} {})",
                    env!("CARGO_PKG_VERSION"),
                    env!("JOBSH_GIT_HASH"),
                    env!("JOBSH_BUILD_DATE")
                );
                return Ok(ExitCode::SUCCESS);
            }
            unknown => bail!("unknown option: {unknown} (see 'jobsh --help')"),
        }
    }

    let config = KernelConfig::repl().with_reap_mode(options.mode);
    match options.command {
        Some(command) => run_command(config, &command),
        None => {
            jobsh_repl::run(config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Execute a single command line and exit with its status.
fn run_command(config: KernelConfig, command: &str) -> Result<ExitCode> {
    let mut repl = Repl::with_config(config)?;
    match repl.process_line(command) {
        Control::Continue(result) => {
            jobsh_repl::print_result(&result);
            if result.ok() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(result.code.clamp(1, 255) as u8))
            }
        }
        Control::Exit => Ok(ExitCode::SUCCESS),
    }
}

fn print_help() {
    println!(
        r#"jobsh v{}: a job-control shell

Usage:
  jobsh                        Interactive shell; reads stdin when it is not a tty
  jobsh -c <command>           Execute one command line and exit

Options:
  --async                      Reap children on SIGCHLD instead of polling
  -c <command>                 Execute command line and exit
  -h, --help                   Show this help
  -V, --version                Show version

Examples:
  jobsh                        # Start interactive shell
  jobsh --async                # Signal-driven reaping
  jobsh -c 'sort < in | uniq'  # Run a pipeline
  echo 'jobs' | jobsh          # Read commands from a pipe
"#,
        env!("CARGO_PKG_VERSION")
    );
}
