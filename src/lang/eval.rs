use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use log::{debug, error, warn};

use crate::lang::ast::*;
use crate::lang::diagnostic::Diagnostic;
use crate::lang::environment::{Env, Environment};
use crate::lang::functions::{output_natives, NativeFunction, Natives, Sink};
use crate::lang::hooks::Hooks;
use crate::lang::lexer::tokenize;
use crate::lang::modules::{is_builtin, with_extension, FsLoader, ModuleLoader};
use crate::lang::parse::parse;
use crate::lang::value::{Closure, Value};

/// Native that markup hands `on*` closures to, as `(id, closure)`
pub const CLICK_BINDER: &str = "bind_native_click";

/// Deepest closure nesting allowed before a call is refused. Keeps runaway recursion from
/// overflowing the native stack, including on small embedder threads
pub const MAX_CALL_DEPTH: usize = 200;

/// Evaluation state threaded through every statement and expression
///
/// `returning` doubles as the "is returning" flag: it is set by `return` and taken by whoever
/// invoked the closure. Every statement loop stops as soon as it is set.
pub struct Context {
    env: Env,
    returning: Option<Value>,
}

impl Context {
    pub fn new(env: Env) -> Self {
        Context {
            env,
            returning: None,
        }
    }

    pub fn is_returning(&self) -> bool {
        self.returning.is_some()
    }
}

pub struct Interpreter {
    globals: Env,
    natives: Natives,
    sink: Sink,
    loader: Box<dyn ModuleLoader>,
    /// Echo the value of top-level expression statements to `sink`
    interactive: bool,
    diagnostics: Vec<Diagnostic>,
    /// Modules currently being imported, innermost last
    importing: Vec<String>,
    hooks: Rc<RefCell<Hooks>>,
    next_callback: usize,
    /// Closure invocations currently on the stack
    depth: usize,
}

impl Interpreter {
    /// Create a new `Interpreter` with `print` and `println` registered
    ///
    /// `sink` is where output should be written. Imports are resolved against the current
    /// directory.
    pub fn new(sink: Sink) -> Self {
        Interpreter::with_loader(sink, Box::new(FsLoader::default()))
    }

    pub fn with_loader(sink: Sink, loader: Box<dyn ModuleLoader>) -> Self {
        let mut natives = Natives::default();
        for native in output_natives(&sink) {
            natives.register(native);
        }

        Interpreter {
            globals: Environment::new_global(),
            natives,
            sink,
            loader,
            interactive: false,
            diagnostics: Vec::new(),
            importing: Vec::new(),
            hooks: Rc::new(RefCell::new(Hooks::default())),
            next_callback: 0,
            depth: 0,
        }
    }

    /// Sets whether or not top-level expression statements print their result (useful when
    /// human is at a REPL)
    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    /// Register `func` as a native under `name`, replacing any earlier native of that name
    pub fn register_native<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        self.natives.register(NativeFunction::new(name, func));
    }

    pub fn has_native(&self, name: &str) -> bool {
        self.natives.contains(name)
    }

    pub fn globals(&self) -> Env {
        Rc::clone(&self.globals)
    }

    /// Read `name` from the global scope. `Void` if unbound
    pub fn get_global(&self, name: &str) -> Value {
        self.globals.borrow().get(name).unwrap_or(Value::Void)
    }

    pub fn hooks(&self) -> Rc<RefCell<Hooks>> {
        Rc::clone(&self.hooks)
    }

    /// Rewind the hook slot index. Call before each render of a component tree
    pub fn reset_hooks(&mut self) {
        self.hooks.borrow_mut().reset();
    }

    /// Run `stmts` against the global scope
    ///
    /// Returns every diagnostic reported during this run. A top-level `return` stops the run.
    pub fn execute(&mut self, stmts: &[Statement]) -> Vec<Diagnostic> {
        let mut ctx = Context::new(self.globals());
        for stmt in stmts {
            let res = match (self.interactive, stmt) {
                (true, Statement::Expression(expr)) => {
                    let val = self.eval_expr(&ctx, expr);
                    self.echo(&val);
                    Ok(())
                }
                _ => self.exec_stmt(&mut ctx, stmt),
            };
            if let Err(d) = res {
                self.report(d);
            }

            if ctx.is_returning() {
                break;
            }
        }

        std::mem::take(&mut self.diagnostics)
    }

    /// Invoke a callable value with `args`. Anything else yields `Void`
    pub fn call_closure(&mut self, callee: &Value, args: Vec<Value>) -> Value {
        match callee {
            Value::Closure(closure) => self.invoke(closure, args),
            Value::Native(native) => native.call(&args),
            v => {
                debug!("Called a non-function value of type {}", v.type_str());
                Value::Void
            }
        }
    }

    fn echo(&mut self, val: &Value) {
        if val.is_void() {
            return;
        }

        if let Err(e) = writeln!(self.sink.borrow_mut(), "=> {}", val) {
            error!("Failed to write output: {}", e);
        }
    }

    fn report(&mut self, diag: Diagnostic) {
        warn!("{}", diag);
        self.diagnostics.push(diag);
    }

    /// Lookup misses read as `Void`
    fn lookup(&self, ctx: &Context, name: &Identifier) -> Value {
        match ctx.env.borrow().get(name.as_str()) {
            Some(v) => v,
            None => {
                debug!("Unknown variable: {}", name);
                Value::Void
            }
        }
    }

    fn invoke(&mut self, closure: &Closure, args: Vec<Value>) -> Value {
        if self.depth >= MAX_CALL_DEPTH {
            self.report(Diagnostic::RecursionLimit {
                depth: MAX_CALL_DEPTH,
            });
            return Value::Void;
        }

        let frame = Environment::child(&closure.env);
        {
            let mut frame = frame.borrow_mut();
            // Extra arguments are dropped, missing ones leave the parameter unbound
            for (param, arg) in closure.params.iter().zip(args) {
                frame.define(param.as_str(), arg);
            }
        }

        let mut ctx = Context::new(frame);
        self.depth += 1;
        self.exec_stmts(&mut ctx, &closure.body.stmts);
        self.depth -= 1;

        ctx.returning.take().unwrap_or(Value::Void)
    }

    fn exec_stmts(&mut self, ctx: &mut Context, stmts: &[Statement]) {
        for stmt in stmts {
            if let Err(d) = self.exec_stmt(ctx, stmt) {
                self.report(d);
            }

            if ctx.is_returning() {
                break;
            }
        }
    }

    fn exec_block(&mut self, ctx: &mut Context, block: &Block) {
        let inner = Environment::child(&ctx.env);
        let outer = std::mem::replace(&mut ctx.env, inner);
        self.exec_stmts(ctx, &block.stmts);
        ctx.env = outer;
    }

    fn exec_switch(&mut self, ctx: &mut Context, subject: &Expression, cases: &[Case]) {
        let subject = self.eval_expr(ctx, subject);

        for case in cases {
            if let Some(value) = &case.value {
                if self.eval_expr(ctx, value) == subject {
                    self.exec_block(ctx, &case.body);
                    return;
                }
            }
        }

        if let Some(default) = cases.iter().find(|c| c.value.is_none()) {
            self.exec_block(ctx, &default.body);
        }
    }

    fn exec_destructure(
        &mut self,
        ctx: &mut Context,
        names: &[Identifier],
        init: &Expression,
    ) -> Result<(), Diagnostic> {
        let list = match self.eval_expr(ctx, init) {
            Value::List(list) => list,
            _ => {
                return Err(Diagnostic::DestructureMismatch {
                    expected: names.len(),
                    found: None,
                })
            }
        };

        let vals = list.borrow();
        if vals.len() < names.len() {
            return Err(Diagnostic::DestructureMismatch {
                expected: names.len(),
                found: Some(vals.len()),
            });
        }

        let mut env = ctx.env.borrow_mut();
        for (name, val) in names.iter().zip(vals.iter()) {
            env.define(name.as_str(), val.clone());
        }

        Ok(())
    }

    /// Run `module` as if its statements were written at the import site
    fn exec_import(&mut self, ctx: &mut Context, module: &str) -> Result<(), Diagnostic> {
        if is_builtin(module) {
            debug!("Import of builtin module '{}'", module);
            return Ok(());
        }
        // `a` and `a.s` name the same module
        let key = with_extension(module);
        if self.importing.contains(&key) {
            return Err(Diagnostic::CircularImport {
                module: module.to_string(),
            });
        }

        let source = self
            .loader
            .load(module)
            .map_err(|e| Diagnostic::ModuleNotFound {
                module: module.to_string(),
                reason: e.to_string(),
            })?;
        debug!("Loaded module '{}'", module);

        let parsed = parse(&tokenize(&source));
        for diag in parsed.diagnostics {
            self.report(diag);
        }

        self.importing.push(key);
        self.exec_stmts(ctx, &parsed.stmts);
        self.importing.pop();

        Ok(())
    }

    fn exec_stmt(&mut self, ctx: &mut Context, stmt: &Statement) -> Result<(), Diagnostic> {
        match stmt {
            Statement::VarDecl(name, init) => {
                let val = match init {
                    Some(e) => self.eval_expr(ctx, e),
                    None => Value::Void,
                };
                ctx.env.borrow_mut().define(name.as_str(), val);
            }
            Statement::Destructure(names, init) => self.exec_destructure(ctx, names, init)?,
            Statement::Return(value) => {
                let val = match value {
                    Some(e) => self.eval_expr(ctx, e),
                    None => Value::Void,
                };
                ctx.returning = Some(val);
            }
            Statement::FuncDecl(name, params, body) => {
                let closure = Closure::new(params.clone(), Rc::clone(body), ctx.env.clone());
                ctx.env
                    .borrow_mut()
                    .define(name.as_str(), Value::Closure(closure));
            }
            Statement::Block(block) => self.exec_block(ctx, block),
            Statement::If(cond, then_branch, else_branch) => {
                if self.eval_expr(ctx, cond).is_truthy() {
                    self.exec_stmt(ctx, then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(ctx, else_branch)?;
                }
            }
            Statement::Switch(subject, cases) => self.exec_switch(ctx, subject, cases),
            Statement::Expression(expr) => {
                self.eval_expr(ctx, expr);
            }
            Statement::Import(module, _) => self.exec_import(ctx, module)?,
        }

        Ok(())
    }

    fn eval_call(&mut self, ctx: &Context, callee: &Identifier, args: &[Expression]) -> Value {
        let args: Vec<Value> = args.iter().map(|a| self.eval_expr(ctx, a)).collect();

        // Natives shadow variables of the same name
        if let Some(native) = self.natives.get(callee.as_str()).cloned() {
            return native.call(&args);
        }

        match self.lookup(ctx, callee) {
            Value::Closure(closure) => self.invoke(&closure, args),
            Value::Native(native) => native.call(&args),
            _ => {
                self.report(Diagnostic::NotCallable {
                    name: callee.to_string(),
                });
                Value::Void
            }
        }
    }

    fn eval_binary(
        &mut self,
        ctx: &Context,
        lhs: &Expression,
        op: BinaryOp,
        rhs: &Expression,
    ) -> Value {
        match op {
            BinaryOp::Assign => {
                let name = match lhs {
                    Expression::Var(name) => name,
                    _ => return Value::Void,
                };
                let val = self.eval_expr(ctx, rhs);
                if !ctx.env.borrow_mut().assign(name.as_str(), val.clone()) {
                    debug!("Assignment to undeclared variable {} ignored", name);
                }

                val
            }
            BinaryOp::AddAssign => {
                let name = match lhs {
                    Expression::Var(name) => name,
                    _ => return Value::Void,
                };
                let rhs_val = self.eval_expr(ctx, rhs);
                match (self.lookup(ctx, name), rhs_val) {
                    (Value::Integer(l), Value::Integer(r)) => {
                        let sum = Value::Integer(l.wrapping_add(r));
                        ctx.env.borrow_mut().assign(name.as_str(), sum.clone());
                        sum
                    }
                    // Only integers take part in `+=`. Anything else leaves the binding as is
                    _ => Value::Void,
                }
            }
            BinaryOp::Equals => {
                let lhs_val = self.eval_expr(ctx, lhs);
                let rhs_val = self.eval_expr(ctx, rhs);
                Value::Integer((lhs_val == rhs_val) as i64)
            }
            BinaryOp::Plus => {
                let lhs_val = self.eval_expr(ctx, lhs);
                let rhs_val = self.eval_expr(ctx, rhs);
                lhs_val.add(&rhs_val)
            }
            BinaryOp::Minus => {
                let lhs_val = self.eval_expr(ctx, lhs);
                let rhs_val = self.eval_expr(ctx, rhs);
                lhs_val.sub(&rhs_val)
            }
        }
    }

    fn next_callback_id(&mut self) -> String {
        let id = format!("cb_{}", self.next_callback);
        self.next_callback += 1;
        id
    }

    fn eval_element(&mut self, ctx: &Context, element: &Element) -> Value {
        // A tag bound to a closure is a component: expand it instead of emitting markup
        let component = ctx.env.borrow().get(element.tag.as_str());
        if let Some(Value::Closure(closure)) = component {
            debug!("Expanding component <{}>", element.tag);
            return self.invoke(&closure, Vec::new());
        }

        let mut markup = format!("<{}", element.tag);
        for (key, expr) in &element.attributes {
            let val = self.eval_expr(ctx, expr);
            let rendered = match val {
                Value::Closure(_) if key.as_str().starts_with("on") => {
                    let id = self.next_callback_id();
                    if let Some(binder) = self.natives.get(CLICK_BINDER).cloned() {
                        binder.call(&[Value::String(id.clone()), val]);
                    }
                    id
                }
                v => v.to_string(),
            };
            let _ = write!(markup, " {}=\"{}\"", key, rendered);
        }

        if element.children.is_empty() {
            markup += " />";
            return Value::String(markup);
        }

        markup += ">";
        for child in &element.children {
            let val = self.eval_expr(ctx, child);
            let _ = write!(markup, "{}", val);
        }
        let _ = write!(markup, "</{}>", element.tag);

        Value::String(markup)
    }

    fn eval_expr(&mut self, ctx: &Context, expr: &Expression) -> Value {
        match expr {
            Expression::Literal(Literal::Integer(i)) => Value::Integer(*i),
            Expression::Literal(Literal::Str(s)) => Value::String(s.clone()),
            Expression::Var(name) => self.lookup(ctx, name),
            Expression::Call(callee, args) => self.eval_call(ctx, callee, args),
            Expression::Binary(lhs, op, rhs) => self.eval_binary(ctx, lhs, *op, rhs),
            Expression::Function(params, body) => Value::Closure(Closure::new(
                params.clone(),
                Rc::clone(body),
                ctx.env.clone(),
            )),
            Expression::Element(element) => self.eval_element(ctx, element),
        }
    }
}

impl Drop for Interpreter {
    /// Named functions live in the frame they capture. Clearing the global frame breaks those
    /// cycles so the frames can be freed.
    fn drop(&mut self) {
        self.globals.borrow_mut().clear();
    }
}

#[cfg(test)]
use crate::lang::modules::MemoryLoader;

#[cfg(test)]
fn run_with(interp: &mut Interpreter, src: &str) -> Vec<Diagnostic> {
    let parsed = parse(&tokenize(src));
    assert!(!parsed.has_errors(), "parse failed: {:?}", parsed.diagnostics);
    interp.execute(&parsed.stmts)
}

#[cfg(test)]
fn sink() -> (Rc<RefCell<Vec<u8>>>, Sink) {
    let buf = Rc::new(RefCell::new(Vec::new()));
    let sink: Sink = buf.clone();
    (buf, sink)
}

#[cfg(test)]
fn output(buf: &Rc<RefCell<Vec<u8>>>) -> String {
    String::from_utf8(buf.borrow().clone()).expect("Output not utf-8")
}

/// Run each `(input, expected output)` case in a fresh interpreter with a `list(...)` native
#[cfg(test)]
fn check_outputs(tests: Vec<(&str, &str)>) {
    for (input, expected) in tests {
        let (buf, sink) = sink();
        let mut interp = Interpreter::new(sink);
        interp.register_native("list", |args| Value::list(args.to_vec()));
        run_with(&mut interp, input);
        assert_eq!(output(&buf), expected, "input: {}", input);
    }
}

#[test]
fn test_expression() {
    let tests = vec![
        ("println(42);", "42\n"),
        ("println(0);", "0\n"),
        ("println(9223372036854775807);", "9223372036854775807\n"),
        ("println(1 + 2);", "3\n"),
        ("println(10 - 3 - 2);", "5\n"),
        (r#"println("a" + 1 + 2);"#, "a12\n"),
        (r#"println(1 + 2 + "a");"#, "3a\n"),
        (r#"println(`back` + "tick");"#, "backtick\n"),
        ("println(1 == 1, 1 == 2);", "10\n"),
        (r#"println(1 == "1");"#, "0\n"),
        (r#"println("x" - 1);"#, "\n"),
        ("println(list(1, list(2, 3)));", "[1, [2, 3]]\n"),
        (r#"print("a"); print("b"); println();"#, "ab\n"),
        ("println(() => { });", "[Function]\n"),
        ("println(println);", "\n"),
    ];

    check_outputs(tests);
}

#[test]
fn test_if() {
    let tests = vec![
        ("var x = 5; if (x == 5) { x += 1; } println(x);", "6\n"),
        (r#"if ("") println("yes") else println("no")"#, "no\n"),
        (r#"if ("a") println("yes") else println("no")"#, "yes\n"),
        (r#"if (0) println("yes") else if (1) println("nested")"#, "nested\n"),
        (r#"if (missing) println("yes") else println("no")"#, "no\n"),
        (r#"if (list()) println("yes")"#, "yes\n"),
        ("var x = 1; if (1) { var x = 2; } println(x);", "1\n"),
        ("var x = 1; if (1) x = 2; println(x);", "2\n"),
    ];

    check_outputs(tests);
}

#[test]
fn test_scoping() {
    let tests = vec![
        ("var x = 1; { var x = 2; } println(x);", "1\n"),
        ("var x = 1; { x = 2; } println(x);", "2\n"),
        ("{ var inner = 1; } println(inner);", "\n"),
        ("y = 1; println(y); var y2 = y; println(y2);", "\n\n"),
        (
            "var x = 1; function show() { println(x); } function f() { var x = 2; show(); } f();",
            "1\n",
        ),
        ("println(undeclaredName); println(\"after\");", "\nafter\n"),
    ];

    check_outputs(tests);
}

#[test]
fn test_assign_never_creates_binding() {
    let (_buf, sink) = sink();
    let mut interp = Interpreter::new(sink);
    run_with(&mut interp, "function f() { y = 1; } f(); y = 2;");
    assert!(!interp.globals().borrow().contains("y"));
    assert_eq!(interp.get_global("y"), Value::Void);
}

#[test]
fn test_add_assign() {
    let tests = vec![
        ("var n = 1; n += 2; println(n);", "3\n"),
        (r#"var s = "a"; s += 1; println(s);"#, "a\n"),
        (r#"var n = 1; n += "b"; println(n);"#, "1\n"),
        ("var n = 1; println(n += 4);", "5\n"),
        (r#"var s = "a"; println(s += 1);"#, "\n"),
        ("missing += 1; println(missing);", "\n"),
    ];

    check_outputs(tests);
}

#[test]
fn test_functions() {
    let tests = vec![
        ("function add(a, b) { return a + b; } println(add(2, 3));", "5\n"),
        ("function f() { return; println(1); } println(f());", "\n"),
        ("function f() { println(1); } println(f());", "1\n\n"),
        (
            "function f(n) { if (n == 0) { return 0; } return n + f(n - 1); } println(f(4));",
            "10\n",
        ),
        ("var inc = (x) => { return x + 1; }; println(inc(1));", "2\n"),
        ("var add = (a, b) => { return a + b; }; println(add(1, 2));", "3\n"),
        ("var k = () { return 7; }; println(k());", "7\n"),
        // Return unwinds out of nested blocks and switches
        (
            "function f() { { switch (1) { case 1: return 9; } } return 0; } println(f());",
            "9\n",
        ),
        // Natives win over variables of the same name
        ("function println(x) { } println(3);", "3\n"),
    ];

    check_outputs(tests);
}

#[test]
fn test_arity() {
    let tests = vec![
        // Extra arguments are ignored
        ("function f(a) { return a; } println(f(1, 2, 3));", "1\n"),
        // Missing arguments are unbound, so they read as Void
        (r#"function f(a, b) { return a + "/" + b; } println(f(1));"#, "1/\n"),
        // ... and lookups continue in the captured scope
        (
            "var b = 5; function f(a, b) { return b; } println(f(1));",
            "5\n",
        ),
    ];

    check_outputs(tests);
}

#[test]
fn test_closures() {
    let tests = vec![
        (
            r#"
            var count = 0;
            function make() {
                return () => { count += 1; return count; };
            }
            var a = make();
            var b = make();
            println(a());
            println(b());
            println(a());
            println(count);
            "#,
            "1\n2\n3\n3\n",
        ),
        (
            r#"
            function counter() {
                var n = 0;
                return () => { n += 1; return n; };
            }
            var c1 = counter();
            var c2 = counter();
            c1(); c1();
            println(c1());
            println(c2());
            "#,
            "3\n1\n",
        ),
        (
            r#"
            var get = 0;
            {
                var hidden = "kept";
                get = () => { return hidden; };
            }
            println(get());
            "#,
            "kept\n",
        ),
    ];

    check_outputs(tests);
}

#[test]
fn test_switch() {
    let cases = "case 1: println(\"A\"); case 2: println(\"B\"); default: println(\"C\");";
    let with_default = |subject: &str| format!("switch ({}) {{ {} }}", subject, cases);
    let tests = vec![
        (with_default("2"), "B\n"),
        (with_default("1"), "A\n"),
        (with_default("9"), "C\n"),
        (with_default("\"2\""), "C\n"),
        (
            "switch (9) { case 1: println(\"A\"); case 2: println(\"B\"); }".to_string(),
            "",
        ),
        (
            "switch (2) { default: println(\"C\"); case 2: println(\"B\"); }".to_string(),
            "B\n",
        ),
        (
            "var x = 1; switch (1) { case 1: var x = 2; } println(x);".to_string(),
            "1\n",
        ),
    ];

    let tests: Vec<(&str, &str)> = tests.iter().map(|(i, e)| (i.as_str(), *e)).collect();
    check_outputs(tests);
}

#[test]
fn test_switch_subject_evaluated_once() {
    let (buf, sink) = sink();
    let mut interp = Interpreter::new(sink);
    run_with(
        &mut interp,
        r#"
        var n = 0;
        function next() { n += 1; return n; }
        switch (next()) { case 5: println("no"); case 1: println("one"); }
        println(n);
        "#,
    );
    assert_eq!(output(&buf), "one\n1\n");
}

#[test]
fn test_destructure() {
    let (buf, sink) = sink();
    let mut interp = Interpreter::new(sink);
    interp.register_native("list", |args| Value::list(args.to_vec()));

    let diags = run_with(&mut interp, "const [a, b] = list(1, 2); println(a, b);");
    assert!(diags.is_empty());
    assert_eq!(output(&buf), "12\n");

    let diags = run_with(&mut interp, "const [c, d] = list(1); println(\"after\");");
    assert_eq!(
        diags,
        vec![Diagnostic::DestructureMismatch {
            expected: 2,
            found: Some(1)
        }]
    );
    assert!(!interp.globals().borrow().contains("c"));
    assert!(!interp.globals().borrow().contains("d"));
    assert_eq!(output(&buf), "12\nafter\n");

    let diags = run_with(&mut interp, "const [e] = 5;");
    assert_eq!(
        diags,
        vec![Diagnostic::DestructureMismatch {
            expected: 1,
            found: None
        }]
    );

    // Longer lists are fine
    let diags = run_with(&mut interp, "const [f] = list(7, 8); println(f);");
    assert!(diags.is_empty());
    assert_eq!(output(&buf), "12\nafter\n7\n");
}

#[test]
fn test_lists_are_shared() {
    let (buf, sink) = sink();
    let mut interp = Interpreter::new(sink);
    interp.register_native("list", |args| Value::list(args.to_vec()));
    interp.register_native("push", |args| {
        if let (Some(Value::List(list)), Some(v)) = (args.get(0), args.get(1)) {
            list.borrow_mut().push(v.clone());
        }
        Value::Void
    });

    run_with(
        &mut interp,
        "var a = list(1); var b = a; push(b, 2); println(a); println(a == b);",
    );
    assert_eq!(output(&buf), "[1, 2]\n1\n");
}

#[test]
fn test_not_callable() {
    let (buf, sink) = sink();
    let mut interp = Interpreter::new(sink);
    let diags = run_with(&mut interp, "var x = 1; x(); nothing(); println(\"still here\");");
    assert_eq!(
        diags,
        vec![
            Diagnostic::NotCallable {
                name: "x".to_string()
            },
            Diagnostic::NotCallable {
                name: "nothing".to_string()
            },
        ]
    );
    assert_eq!(output(&buf), "still here\n");
}

#[test]
fn test_element() {
    let tests = vec![
        (r#"println(<View width="10" />);"#, "<View width=\"10\" />\n"),
        (
            r#"var n = 3; println(<Text size={n + 1} bold>Count {n}</Text>);"#,
            "<Text size=\"4\" bold=\"true\">Count 3</Text>\n",
        ),
        (
            "println(<Row><View /><Text>hi there</Text></Row>);",
            "<Row><View /><Text>hi there</Text></Row>\n",
        ),
        (
            r#"function Header() { return <Text>Title</Text>; } println(<Page><Header /></Page>);"#,
            "<Page><Text>Title</Text></Page>\n",
        ),
        (
            r#"var Card = () => { return "card"; }; println(<Card title="ignored" />);"#,
            "card\n",
        ),
        (r#"println(<View missing={nope} />);"#, "<View missing=\"\" />\n"),
    ];

    check_outputs(tests);
}

#[test]
fn test_element_click_binding() {
    let (buf, sink) = sink();
    let mut interp = Interpreter::new(sink);

    let bound = Rc::new(RefCell::new(Vec::new()));
    let bound_clone = Rc::clone(&bound);
    interp.register_native(CLICK_BINDER, move |args| {
        bound_clone.borrow_mut().push(args.to_vec());
        Value::Void
    });

    run_with(
        &mut interp,
        r#"
        var clicks = 0;
        var handler = () => { clicks += 1; };
        println(<Button onClick={handler} other={handler}>Go</Button>);
        println(<Button onPress={handler} />);
        "#,
    );

    assert_eq!(
        output(&buf),
        "<Button onClick=\"cb_0\" other=\"[Function]\">Go</Button>\n<Button onPress=\"cb_1\" />\n"
    );

    let bound = bound.borrow();
    assert_eq!(bound.len(), 2);
    assert_eq!(bound[0][0], Value::from("cb_0"));
    assert_eq!(bound[1][0], Value::from("cb_1"));

    // The embedder can run the bound closure later
    let handler = bound[0][1].clone();
    interp.call_closure(&handler, vec![]);
    interp.call_closure(&handler, vec![]);
    assert_eq!(interp.get_global("clicks"), Value::Integer(2));
}

#[test]
fn test_element_without_binder() {
    let (buf, sink) = sink();
    let mut interp = Interpreter::new(sink);
    run_with(&mut interp, "println(<Button onClick={() => { }} />);");
    assert_eq!(output(&buf), "<Button onClick=\"cb_0\" />\n");
}

#[test]
fn test_import() {
    let loader = MemoryLoader::new()
        .with_module("util", "var shared = 1; function double(x) { return x + x; }")
        .with_module("broken", "var ok = 1; var = ; var after = 2;")
        .with_module("loop", "import \"loop\"");

    let (buf, sink) = sink();
    let mut interp = Interpreter::with_loader(sink, Box::new(loader));

    let diags = run_with(
        &mut interp,
        r#"import "gui"; import { double } from "util"; println(double(shared));"#,
    );
    assert!(diags.is_empty());
    assert_eq!(output(&buf), "2\n");

    // Imports land in whatever scope is active
    let diags = run_with(
        &mut interp,
        r#"function f() { import "util.s"; return shared; } var shared = 5; println(f()); println(shared);"#,
    );
    assert!(diags.is_empty());
    assert_eq!(output(&buf), "2\n1\n5\n");

    let diags = run_with(&mut interp, r#"import "missing"; println("continued");"#);
    assert_eq!(diags.len(), 1);
    assert!(matches!(&diags[0], Diagnostic::ModuleNotFound { module, .. } if module == "missing"));
    assert_eq!(output(&buf), "2\n1\n5\ncontinued\n");

    let diags = run_with(&mut interp, r#"import "broken";"#);
    assert!(diags.iter().any(Diagnostic::is_parse_error));
    assert_eq!(interp.get_global("ok"), Value::Integer(1));
    assert_eq!(interp.get_global("after"), Value::Integer(2));

    let diags = run_with(&mut interp, r#"import "loop";"#);
    assert_eq!(
        diags,
        vec![Diagnostic::CircularImport {
            module: "loop".to_string()
        }]
    );
}

#[test]
fn test_top_level_return_stops_run() {
    let (buf, sink) = sink();
    let mut interp = Interpreter::new(sink);
    run_with(&mut interp, "println(1); return; println(2);");
    run_with(&mut interp, "println(3);");
    assert_eq!(output(&buf), "1\n3\n");
}

#[test]
fn test_embedding() {
    let (buf, sink) = sink();
    let mut interp = Interpreter::new(sink);
    run_with(
        &mut interp,
        r#"var greeting = "hi"; function greet(name) { return greeting + " " + name; }"#,
    );

    let greet = interp.get_global("greet");
    let res = interp.call_closure(&greet, vec![Value::from("bob")]);
    assert_eq!(res, Value::from("hi bob"));
    assert_eq!(interp.call_closure(&Value::Integer(1), vec![]), Value::Void);

    let native = Value::Native(NativeFunction::new("seven", |_| Value::Integer(7)));
    interp.globals().borrow_mut().define("seven_fn", native);
    run_with(&mut interp, "println(seven_fn());");
    assert_eq!(output(&buf), "7\n");
}

#[test]
fn test_interactive() {
    let (buf, sink) = sink();
    let mut interp = Interpreter::new(sink);
    interp.set_interactive(true);
    run_with(&mut interp, "2 + 3; var x = 1; println(x); x;");
    assert_eq!(output(&buf), "=> 5\n1\n=> 1\n");
}

#[test]
fn test_recursion_limit() {
    let (buf, sink) = sink();
    let mut interp = Interpreter::new(sink);

    let diags = run_with(
        &mut interp,
        r#"
        function down(n) { if (n == 0) { return 0; } return 1 + down(n - 1); }
        println(down(150));
        println(down(5000));
        function forever() { return forever(); }
        forever();
        println("still running");
        "#,
    );
    assert_eq!(
        diags,
        vec![
            Diagnostic::RecursionLimit {
                depth: MAX_CALL_DEPTH
            },
            Diagnostic::RecursionLimit {
                depth: MAX_CALL_DEPTH
            },
        ]
    );

    // The refused call reads as Void, so the sum falls back to string concatenation
    let out = output(&buf);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "150");
    assert_eq!(lines[1], "1".repeat(MAX_CALL_DEPTH));
    assert_eq!(lines[2], "still running");

    // Depth unwinds fully, so later calls are unaffected
    let diags = run_with(&mut interp, "println(down(3));");
    assert!(diags.is_empty());
    assert_eq!(output(&buf).lines().last(), Some("3"));
}

#[test]
fn test_self_import_with_extension() {
    let loader = MemoryLoader::new().with_module("again", r#"println("run"); import "again.s";"#);
    let (buf, sink) = sink();
    let mut interp = Interpreter::with_loader(sink, Box::new(loader));

    let diags = run_with(&mut interp, r#"import "again";"#);
    assert_eq!(
        diags,
        vec![Diagnostic::CircularImport {
            module: "again.s".to_string()
        }]
    );
    assert_eq!(output(&buf), "run\n");
    assert!(interp.has_native("println"));
}
