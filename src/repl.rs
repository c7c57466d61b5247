use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::Result;
use rustyline::{Completer, Helper, Highlighter, Hinter};

use sunda::lang::lexer::{tokenize, TokenKind};

/// Helper that extends editor
///
/// Currently only implements `Validator` trait to trigger multiline editing when a `\` is seen at
/// the end of a line or a `{` or `(` is still open.
#[derive(Completer, Helper, Highlighter, Hinter)]
pub struct ReplHelper {}

impl ReplHelper {
    pub fn new() -> Self {
        ReplHelper {}
    }
}

/// Net count of unclosed `{` and `(`. Counted on tokens so brackets inside strings and
/// comments don't matter
fn open_depth(input: &str) -> i64 {
    tokenize(input)
        .iter()
        .map(|t| match t.kind {
            TokenKind::LBrace | TokenKind::LParen => 1,
            TokenKind::RBrace | TokenKind::RParen => -1,
            _ => 0,
        })
        .sum()
}

impl Validator for ReplHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> Result<ValidationResult> {
        let input = ctx.input();
        if input.ends_with('\\') || open_depth(input) > 0 {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

/// Remove the multiline escape created by `ReplHelper`
pub fn fixup_input(input: &str) -> String {
    input.replace("\\\n", " ")
}

#[test]
fn test_fixup_input() {
    assert_eq!(fixup_input("asdf \\\nme"), "asdf  me");
    assert_eq!(fixup_input("asdf \\ \nme"), "asdf \\ \nme");
    assert_eq!(fixup_input("function f() {\n}"), "function f() {\n}");
}

#[test]
fn test_open_depth() {
    let tests = vec![
        ("function f() {", 1),
        ("function f() {\n return 1; }", 0),
        ("println((", 2),
        (r#"println("{")"#, 0),
        ("// {", 0),
        ("}", -1),
    ];

    for (input, depth) in tests {
        assert_eq!(open_depth(input), depth, "input: {}", input);
    }
}
