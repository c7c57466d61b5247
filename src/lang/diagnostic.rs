use std::fmt;

/// A recoverable problem found while parsing or running a program
///
/// None of these stop execution. The parser hands them back next to the statements it
/// managed to build and the interpreter hands them back from `Interpreter::execute`.
#[derive(Debug, PartialEq, Clone)]
pub enum Diagnostic {
    /// Unexpected token. The enclosing top-level statement was dropped
    Parse { line: usize, message: String },
    /// Lhs of `=` or `+=` is not a bare variable
    InvalidAssignTarget { line: usize },
    /// Closing tag of a markup element names a different tag
    TagMismatch {
        line: usize,
        expected: String,
        found: String,
    },
    /// `const [..] = value` where `value` is not a list or is too short
    ///
    /// `found` is `None` when the value is not a list at all
    DestructureMismatch {
        expected: usize,
        found: Option<usize>,
    },
    ModuleNotFound { module: String, reason: String },
    /// Module imported while it is still being imported
    CircularImport { module: String },
    /// Callee is neither a native nor bound to a callable value
    NotCallable { name: String },
    /// Call refused because `depth` closure invocations were already active
    RecursionLimit { depth: usize },
}

impl Diagnostic {
    pub fn parse(line: usize, message: &str) -> Self {
        Diagnostic::Parse {
            line,
            message: message.to_string(),
        }
    }

    /// True for diagnostics that caused source to be dropped by the parser
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Diagnostic::Parse { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Parse { line, message } => {
                write!(f, "Parse error at line {}: {}", line, message)
            }
            Diagnostic::InvalidAssignTarget { line } => {
                write!(f, "Invalid assignment target at line {}", line)
            }
            Diagnostic::TagMismatch {
                line,
                expected,
                found,
            } => write!(
                f,
                "Mismatched closing tag at line {}: expected </{}>, got </{}>",
                line, expected, found
            ),
            Diagnostic::DestructureMismatch { expected, found } => match found {
                Some(len) => write!(
                    f,
                    "Cannot destructure {} names from a list of length {}",
                    expected, len
                ),
                None => write!(f, "Cannot destructure a value that is not a list"),
            },
            Diagnostic::ModuleNotFound { module, reason } => {
                write!(f, "Could not find module '{}': {}", module, reason)
            }
            Diagnostic::CircularImport { module } => {
                write!(f, "Module '{}' imports itself", module)
            }
            Diagnostic::NotCallable { name } => write!(f, "'{}' is not a function", name),
            Diagnostic::RecursionLimit { depth } => {
                write!(f, "Maximum call depth of {} exceeded", depth)
            }
        }
    }
}

#[test]
fn test_display() {
    let tests = vec![
        (
            Diagnostic::parse(3, "Expect ')' after condition"),
            "Parse error at line 3: Expect ')' after condition",
        ),
        (
            Diagnostic::DestructureMismatch {
                expected: 2,
                found: Some(1),
            },
            "Cannot destructure 2 names from a list of length 1",
        ),
        (
            Diagnostic::DestructureMismatch {
                expected: 2,
                found: None,
            },
            "Cannot destructure a value that is not a list",
        ),
        (
            Diagnostic::TagMismatch {
                line: 1,
                expected: "Row".to_string(),
                found: "Column".to_string(),
            },
            "Mismatched closing tag at line 1: expected </Row>, got </Column>",
        ),
        (
            Diagnostic::RecursionLimit { depth: 200 },
            "Maximum call depth of 200 exceeded",
        ),
    ];

    for (diag, expected) in tests {
        assert_eq!(diag.to_string(), expected);
    }

    assert!(Diagnostic::parse(1, "x").is_parse_error());
    assert!(!Diagnostic::InvalidAssignTarget { line: 1 }.is_parse_error());
}
