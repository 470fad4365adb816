//! Parser tests using rstest for parameterization.
//!
//! Successful parses are compared through the pipeline's display form, which
//! spells out stages, redirections and the background flag.

use jobsh_kernel::parser::{parse, ParseError};
use rstest::rstest;

/// Parse and render, panicking with the error on failure.
fn render(input: &str) -> String {
    match parse(input) {
        Ok(Some(pipeline)) => pipeline.to_string(),
        Ok(None) => panic!("expected a pipeline for {:?}", input),
        Err(e) => panic!("parse error for {:?}: {}", input, e),
    }
}

// =============================================================================
// COMMANDS AND PIPELINES
// =============================================================================

#[rstest]
#[case::single("sleep 5", "sleep 5")]
#[case::extra_whitespace("  sleep\t 5  ", "sleep 5")]
#[case::two_stages("sleep 5 | cat", "sleep 5 | cat")]
#[case::no_spaces("ls -l|wc -l", "ls -l | wc -l")]
#[case::three_stages("cat f | sort | uniq -c", "cat f | sort | uniq -c")]
#[case::background("sleep 10 &", "sleep 10 &")]
#[case::background_pipeline("sleep 1 | cat&", "sleep 1 | cat &")]
#[case::trailing_comment("sleep 1 # nap", "sleep 1")]
fn parser_pipelines(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(render(input), expected);
}

// =============================================================================
// REDIRECTS
// =============================================================================

#[rstest]
#[case::stdout("echo hello > /tmp/out", "echo hello > /tmp/out")]
#[case::append("echo more >> /tmp/out", "echo more >> /tmp/out")]
#[case::stdin("wc < /tmp/input", "wc < /tmp/input")]
#[case::both("sort < in > out", "sort < in > out")]
#[case::in_pipeline("cat < in | sort | uniq > out", "cat | sort | uniq < in > out")]
#[case::before_command("> out echo hi", "echo hi > out")]
#[case::with_background("cat < in > out &", "cat < in > out &")]
fn parser_redirects(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(render(input), expected);
}

// =============================================================================
// QUOTING
// =============================================================================

#[rstest]
#[case::double(r#"echo "a | b""#, vec!["echo", "a | b"])]
#[case::single("echo 'x > y &'", vec!["echo", "x > y &"])]
#[case::escapes(r#"echo "say \"hi\"""#, vec!["echo", "say \"hi\""])]
#[case::glued(r#"echo pre"mid"'post'"#, vec!["echo", "premidpost"])]
#[case::empty_string(r#"printf """#, vec!["printf", ""])]
fn parser_quoting(#[case] input: &str, #[case] argv: Vec<&str>) {
    let pipeline = parse(input).expect("parses").expect("not empty");
    assert_eq!(pipeline.stages[0].argv, argv);
}

// =============================================================================
// EMPTY INPUT
// =============================================================================

#[rstest]
#[case::empty("")]
#[case::spaces("     ")]
#[case::comment("# nothing to see")]
fn parser_empty(#[case] input: &str) {
    assert_eq!(parse(input), Ok(None));
}

// =============================================================================
// ERRORS
// =============================================================================

#[rstest]
#[case::input_not_first("a | b < in", 1)]
#[case::input_twice("a < x < y", 2)]
#[case::output_not_last("a > out | b", 3)]
#[case::output_twice("a > x >> y", 4)]
#[case::missing_output_file("a >", 5)]
#[case::missing_input_file("a < | b", 5)]
#[case::amp_in_middle("a & | b", 6)]
#[case::double_amp("a & &", 6)]
#[case::leading_pipe("| a", 7)]
#[case::trailing_pipe("a |", 7)]
#[case::lone_amp("&", 7)]
#[case::unterminated_double(r#"echo "open"#, 8)]
#[case::unterminated_single("echo 'open", 8)]
fn parser_errors(#[case] input: &str, #[case] code: u8) {
    let err = parse(input).expect_err("should be rejected");
    assert_eq!(err.code(), code, "wrong code for {:?}: {}", input, err);
}

#[test]
fn parser_error_messages() {
    assert_eq!(
        parse("a >").unwrap_err(),
        ParseError::MissingFileName(">")
    );
    assert_eq!(
        parse("a | b < in").unwrap_err().to_string(),
        "input redirection is only allowed in the first command"
    );
}
