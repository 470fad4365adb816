//! Lexer for jobsh command lines.
//!
//! Converts a line into a stream of tokens using the logos lexer generator.
//!
//! # Token Categories
//!
//! - **Operators**: `|`, `&`, `<`, `>`, `>>`
//! - **Words**: bare words, `"double quoted"` (escapes processed) and
//!   `'single quoted'` (literal) strings
//! - **Comments**: `# ...` to end of line, dropped by [`tokenize`]
//!
//! Words that touch each other without whitespace (`foo"bar"`) are reported
//! as separate tokens with adjacent spans; the parser glues them together.

use logos::{Logos, Span};
use std::fmt;

/// A token with its span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Span) -> Self {
        Self { token, span }
    }
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexerError {
    #[default]
    UnexpectedCharacter,
    UnterminatedString,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerError::UnexpectedCharacter => write!(f, "unexpected character"),
            LexerError::UnterminatedString => write!(f, "unterminated string"),
        }
    }
}

/// Tokens produced by the jobsh lexer.
///
/// Multi-character operators come before their single-character prefixes.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexerError)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[token(">>")]
    GtGt,

    #[token(">")]
    Gt,

    #[token("<")]
    Lt,

    #[token("|")]
    Pipe,

    #[token("&")]
    Amp,

    /// Double-quoted string: value has the quotes removed and escapes processed.
    #[regex(r#""([^"\\]|\\.)*""#, lex_double_quoted)]
    DoubleQuoted(String),

    /// Single-quoted string: value is the literal content between the quotes.
    #[regex(r"'[^']*'", lex_single_quoted)]
    SingleQuoted(String),

    /// Bare word: anything up to whitespace, a quote or an operator.
    #[regex(r#"[^\s|&<>"'#][^\s|&<>"']*"#, lex_word, allow_greedy = true)]
    Word(String),

    /// Comment: `# ...` to end of line
    #[regex(r"#[^\n\r]*", allow_greedy = true)]
    Comment,
}

impl Token {
    /// The textual value of word-like tokens.
    pub fn word(&self) -> Option<&str> {
        match self {
            Token::Word(s) | Token::DoubleQuoted(s) | Token::SingleQuoted(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::GtGt => write!(f, ">>"),
            Token::Gt => write!(f, ">"),
            Token::Lt => write!(f, "<"),
            Token::Pipe => write!(f, "|"),
            Token::Amp => write!(f, "&"),
            Token::DoubleQuoted(s) => write!(f, "\"{}\"", s),
            Token::SingleQuoted(s) => write!(f, "'{}'", s),
            Token::Word(s) => write!(f, "{}", s),
            Token::Comment => write!(f, "COMMENT"),
        }
    }
}

fn lex_double_quoted(lex: &mut logos::Lexer<Token>) -> Result<String, LexerError> {
    parse_string_literal(lex.slice())
}

fn lex_single_quoted(lex: &mut logos::Lexer<Token>) -> String {
    let s = lex.slice();
    s[1..s.len() - 1].to_string()
}

fn lex_word(lex: &mut logos::Lexer<Token>) -> String {
    lex.slice().to_string()
}

/// Strip the quotes from a double-quoted literal and process escapes.
///
/// `\n`, `\t`, `\\` and `\"` are recognised; any other escaped character is
/// kept with its backslash.
pub fn parse_string_literal(source: &str) -> Result<String, LexerError> {
    if source.len() < 2 || !source.starts_with('"') || !source.ends_with('"') {
        return Err(LexerError::UnterminatedString);
    }

    let inner = &source[1..source.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some(next) => {
                result.push('\\');
                result.push(next);
            }
            None => result.push('\\'),
        }
    }

    Ok(result)
}

/// Tokenize a command line, dropping comments.
///
/// All lexer errors are collected; an unmatched opening quote is reported as
/// [`LexerError::UnterminatedString`].
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, Vec<Spanned<LexerError>>> {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, span) in lexer.spanned() {
        match result {
            Ok(Token::Comment) => {}
            Ok(token) => tokens.push(Spanned::new(token, span)),
            Err(err) => {
                let err = match source[span.clone()].chars().next() {
                    Some('"') | Some('\'') => LexerError::UnterminatedString,
                    _ => err,
                };
                errors.push(Spanned::new(err, span));
            }
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("lexing should succeed")
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn operators() {
        assert_eq!(
            lex("a | b > c >> d < e &"),
            vec![
                word("a"),
                Token::Pipe,
                word("b"),
                Token::Gt,
                word("c"),
                Token::GtGt,
                word("d"),
                Token::Lt,
                word("e"),
                Token::Amp,
            ]
        );
    }

    #[test]
    fn operators_need_no_whitespace() {
        assert_eq!(
            lex("sleep 5|cat>out&"),
            vec![
                word("sleep"),
                word("5"),
                Token::Pipe,
                word("cat"),
                Token::Gt,
                word("out"),
                Token::Amp,
            ]
        );
    }

    #[test]
    fn words_keep_punctuation() {
        assert_eq!(
            lex("ls -la /tmp/x.txt $HOME a=b"),
            vec![
                word("ls"),
                word("-la"),
                word("/tmp/x.txt"),
                word("$HOME"),
                word("a=b"),
            ]
        );
    }

    #[test]
    fn quoted_strings() {
        assert_eq!(
            lex(r#"echo "a | b" 'c > d'"#),
            vec![
                word("echo"),
                Token::DoubleQuoted("a | b".to_string()),
                Token::SingleQuoted("c > d".to_string()),
            ]
        );
    }

    #[test]
    fn double_quote_escapes() {
        assert_eq!(parse_string_literal(r#""say \"hi\"""#), Ok("say \"hi\"".to_string()));
        assert_eq!(parse_string_literal(r#""a\\b""#), Ok("a\\b".to_string()));
        assert_eq!(parse_string_literal(r#""\d""#), Ok("\\d".to_string()));
    }

    #[test]
    fn single_quotes_are_literal() {
        assert_eq!(lex(r"'a\nb'"), vec![Token::SingleQuoted(r"a\nb".to_string())]);
    }

    #[test]
    fn comments_skipped() {
        assert_eq!(lex("# comment"), vec![]);
        assert_eq!(lex("sleep 1 # comment"), vec![word("sleep"), word("1")]);
        // '#' inside a word is not a comment
        assert_eq!(lex("echo a#b"), vec![word("echo"), word("a#b")]);
    }

    #[test]
    fn adjacent_spans_are_reported() {
        let tokens = tokenize(r#"foo"bar""#).expect("ok");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].span.end, tokens[1].span.start);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let errors = tokenize(r#"echo "oops"#).expect_err("should fail");
        assert_eq!(errors[0].token, LexerError::UnterminatedString);

        let errors = tokenize("echo 'oops").expect_err("should fail");
        assert_eq!(errors[0].token, LexerError::UnterminatedString);
    }
}
