use std::fmt;

use log::info;

use crate::lang::diagnostic::Diagnostic;
use crate::lang::eval::Interpreter;
use crate::lang::functions::Sink;
use crate::lang::lexer::tokenize;
use crate::lang::modules::ModuleLoader;
use crate::lang::parse::parse;

pub enum EvalResult {
    Ok,
    Quit,
    /// Every diagnostic from the input, one per line. Statements that parsed still ran
    Err(String),
}

impl fmt::Display for EvalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalResult::Ok => Ok(()),
            EvalResult::Quit => write!(f, "Quit"),
            EvalResult::Err(msg) => write!(f, "{}", msg),
        }
    }
}

/// Source text front end to an `Interpreter`
pub struct Runtime {
    interp: Interpreter,
}

impl Runtime {
    /// Create a new `Runtime` instance
    ///
    /// `sink` is where output should be written. eg. result of `println` calls
    ///
    /// `interactive` sets whether or not expression statements should print the result (useful
    /// when human is at a REPL)
    pub fn new(sink: Sink, interactive: bool) -> Self {
        Runtime::from_interpreter(Interpreter::new(sink), interactive)
    }

    pub fn with_loader(sink: Sink, loader: Box<dyn ModuleLoader>, interactive: bool) -> Self {
        Runtime::from_interpreter(Interpreter::with_loader(sink, loader), interactive)
    }

    fn from_interpreter(mut interp: Interpreter, interactive: bool) -> Self {
        interp.set_interactive(interactive);
        Self { interp }
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interp
    }

    pub fn eval(&mut self, src: &str) -> EvalResult {
        match src.trim() {
            "exit" | "quit" => return EvalResult::Quit,
            "" => return EvalResult::Ok,
            _ => (),
        }

        let tokens = tokenize(src);
        let parsed = parse(&tokens);
        info!("parsed {} statement(s)", parsed.stmts.len());

        let mut diagnostics = parsed.diagnostics;
        diagnostics.extend(self.interp.execute(&parsed.stmts));

        if diagnostics.is_empty() {
            EvalResult::Ok
        } else {
            EvalResult::Err(join(&diagnostics))
        }
    }
}

fn join(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::rc::Rc;

#[cfg(test)]
fn test_runtime(interactive: bool) -> (Rc<RefCell<Vec<u8>>>, Runtime) {
    let buf = Rc::new(RefCell::new(Vec::new()));
    let sink: Sink = buf.clone();
    (buf, Runtime::new(sink, interactive))
}

#[test]
fn test_eval() {
    let (buf, mut rt) = test_runtime(false);
    let tests = vec![
        ("var x = 1;", true),
        ("x += 41;", true),
        ("println(x);", true),
        ("var = 3; println(\"rest\");", false),
        ("nope();", false),
        ("", true),
    ];

    for (input, ok) in tests {
        match rt.eval(input) {
            EvalResult::Ok => assert!(ok, "input: {}", input),
            EvalResult::Err(e) => assert!(!ok, "input: {} error: {}", input, e),
            EvalResult::Quit => panic!("unexpected quit: {}", input),
        }
    }

    assert_eq!(
        String::from_utf8(buf.borrow().clone()).expect("Output not utf-8"),
        "42\nrest\n"
    );
}

#[test]
fn test_errors_joined() {
    let (_buf, mut rt) = test_runtime(false);
    match rt.eval("a(); b();") {
        EvalResult::Err(e) => assert_eq!(e, "'a' is not a function\n'b' is not a function"),
        _ => panic!("expected errors"),
    }
}

#[test]
fn test_quit() {
    let (_buf, mut rt) = test_runtime(true);
    assert!(matches!(rt.eval("quit"), EvalResult::Quit));
    assert!(matches!(rt.eval("  exit "), EvalResult::Quit));
    assert!(matches!(rt.eval("var quit = 1;"), EvalResult::Ok));
}

#[test]
fn test_interactive_echo() {
    let (buf, mut rt) = test_runtime(true);
    rt.eval("var s = \"a\";");
    rt.eval("s + 1");
    rt.eval("s");
    rt.interpreter().set_interactive(false);
    rt.eval("s");
    assert_eq!(
        String::from_utf8(buf.borrow().clone()).expect("Output not utf-8"),
        "=> a1\n=> a\n"
    );
}

#[test]
fn test_with_loader() {
    use crate::lang::modules::MemoryLoader;

    let buf = Rc::new(RefCell::new(Vec::new()));
    let sink: Sink = buf.clone();
    let loader = MemoryLoader::new().with_module("greet", r#"var hello = "hi";"#);
    let mut rt = Runtime::with_loader(sink, Box::new(loader), false);

    assert!(matches!(rt.eval(r#"import "greet"; println(hello);"#), EvalResult::Ok));
    match rt.eval(r#"import "nowhere";"#) {
        EvalResult::Err(e) => assert!(e.contains("nowhere"), "error: {}", e),
        _ => panic!("expected missing module error"),
    }
    assert_eq!(
        String::from_utf8(buf.borrow().clone()).expect("Output not utf-8"),
        "hi\n"
    );
}
