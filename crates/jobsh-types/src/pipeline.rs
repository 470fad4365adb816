//! Parsed pipeline description.
//!
//! The parser produces a [`Pipeline`]; the executor consumes it and the job
//! table keeps it for display for as long as the job lives.

use std::fmt;
use std::path::PathBuf;

/// One command in a `|`-separated chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Program name followed by its arguments. Never empty.
    pub argv: Vec<String>,
}

impl Stage {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// The program name (`argv[0]`).
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}

/// Output redirection target of the last stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRedirect {
    pub path: PathBuf,
    /// `>>` appends, `>` truncates.
    pub append: bool,
}

/// A full command line: stages plus redirections and the background flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    /// `< file`, wired to the first stage's stdin.
    pub input: Option<PathBuf>,
    /// `> file` / `>> file`, wired to the last stage's stdout.
    pub output: Option<OutputRedirect>,
    /// Trailing `&`.
    pub background: bool,
}

impl Pipeline {
    /// A foreground pipeline with no redirections.
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            stages,
            input: None,
            output: None,
            background: false,
        }
    }

    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>, append: bool) -> Self {
        self.output = Some(OutputRedirect {
            path: path.into(),
            append,
        });
        self
    }

    pub fn in_background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Command text used in notices and `jobs`: stage argvs joined by ` | `.
    pub fn command_line(&self) -> String {
        self.stages
            .iter()
            .map(Stage::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl fmt::Display for Pipeline {
    /// Full form including redirections and `&`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_line())?;
        if let Some(input) = &self.input {
            write!(f, " < {}", input.display())?;
        }
        if let Some(output) = &self.output {
            let op = if output.append { ">>" } else { ">" };
            write!(f, " {} {}", op, output.path.display())?;
        }
        if self.background {
            write!(f, " &")?;
        }
        Ok(())
    }
}
