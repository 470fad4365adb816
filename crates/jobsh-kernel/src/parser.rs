//! Parser for jobsh command lines.
//!
//! Grammar:
//!
//! ```text
//! line     := stage ('|' stage)* '&'?
//! stage    := (word | redirect)+
//! redirect := '<' word | '>' word | '>>' word
//! ```
//!
//! Input redirection is only allowed in the first stage, output redirection
//! only in the last, each at most once. Errors carry a stable numeric code
//! that the shell prints alongside the message.

use jobsh_types::{OutputRedirect, Pipeline, Stage};
use std::path::PathBuf;
use thiserror::Error;

use crate::lexer::{tokenize, Spanned, Token};

/// Why a command line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("input redirection is only allowed in the first command")]
    UnexpectedInput,
    #[error("multiple input redirections")]
    MultipleInput,
    #[error("output redirection is only allowed in the last command")]
    UnexpectedOutput,
    #[error("multiple output redirections")]
    MultipleOutput,
    #[error("expected a file name after '{0}'")]
    MissingFileName(&'static str),
    #[error("'&' may only appear at the end of the line")]
    MisplacedAmpersand,
    #[error("empty command in pipeline")]
    EmptyStage,
    #[error("{message} at position {position}")]
    InvalidToken { position: usize, message: String },
}

impl ParseError {
    /// Stable numeric code for the error kind.
    pub fn code(&self) -> u8 {
        match self {
            ParseError::UnexpectedInput => 1,
            ParseError::MultipleInput => 2,
            ParseError::UnexpectedOutput => 3,
            ParseError::MultipleOutput => 4,
            ParseError::MissingFileName(_) => 5,
            ParseError::MisplacedAmpersand => 6,
            ParseError::EmptyStage => 7,
            ParseError::InvalidToken { .. } => 8,
        }
    }
}

/// Token stream after adjacent word pieces have been glued together.
#[derive(Debug, PartialEq)]
enum Item {
    Word(String),
    Pipe,
    Amp,
    Input,
    Output { append: bool },
}

fn glue(tokens: Vec<Spanned<Token>>) -> Vec<Item> {
    let mut items = Vec::with_capacity(tokens.len());
    let mut last_word_end: Option<usize> = None;

    for Spanned { token, span } in tokens {
        if let Some(text) = token.word() {
            if last_word_end == Some(span.start) {
                if let Some(Item::Word(prev)) = items.last_mut() {
                    prev.push_str(text);
                    last_word_end = Some(span.end);
                    continue;
                }
            }
            items.push(Item::Word(text.to_string()));
            last_word_end = Some(span.end);
            continue;
        }

        last_word_end = None;
        items.push(match token {
            Token::Pipe => Item::Pipe,
            Token::Amp => Item::Amp,
            Token::Lt => Item::Input,
            Token::Gt => Item::Output { append: false },
            Token::GtGt => Item::Output { append: true },
            // Word-like tokens and comments never reach this point
            _ => continue,
        });
    }

    items
}

/// Parse one line.
///
/// Returns `Ok(None)` for blank lines and comment-only lines.
pub fn parse(line: &str) -> Result<Option<Pipeline>, ParseError> {
    let tokens = tokenize(line).map_err(|errors| {
        let first = &errors[0];
        ParseError::InvalidToken {
            position: first.span.start,
            message: first.token.to_string(),
        }
    })?;

    let items = glue(tokens);
    if items.is_empty() {
        return Ok(None);
    }

    let mut stages: Vec<Stage> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut input: Option<PathBuf> = None;
    let mut output: Option<OutputRedirect> = None;
    let mut background = false;

    let mut iter = items.into_iter().peekable();
    while let Some(item) = iter.next() {
        if background {
            return Err(ParseError::MisplacedAmpersand);
        }
        match item {
            Item::Word(word) => current.push(word),
            Item::Pipe => {
                if current.is_empty() {
                    return Err(ParseError::EmptyStage);
                }
                if output.is_some() {
                    return Err(ParseError::UnexpectedOutput);
                }
                stages.push(Stage {
                    argv: std::mem::take(&mut current),
                });
            }
            Item::Input => {
                if !stages.is_empty() {
                    return Err(ParseError::UnexpectedInput);
                }
                if input.is_some() {
                    return Err(ParseError::MultipleInput);
                }
                match iter.next() {
                    Some(Item::Word(path)) => input = Some(PathBuf::from(path)),
                    _ => return Err(ParseError::MissingFileName("<")),
                }
            }
            Item::Output { append } => {
                if output.is_some() {
                    return Err(ParseError::MultipleOutput);
                }
                match iter.next() {
                    Some(Item::Word(path)) => {
                        output = Some(OutputRedirect {
                            path: PathBuf::from(path),
                            append,
                        })
                    }
                    _ => return Err(ParseError::MissingFileName(if append { ">>" } else { ">" })),
                }
            }
            Item::Amp => background = true,
        }
    }

    if current.is_empty() {
        return Err(ParseError::EmptyStage);
    }
    stages.push(Stage { argv: current });

    Ok(Some(Pipeline {
        stages,
        input,
        output,
        background,
    }))
}
