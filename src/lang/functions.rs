use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use log::error;

use crate::lang::value::Value;

/// Where output producing natives write to
pub type Sink = Rc<RefCell<dyn Write>>;

type NativeFn = dyn Fn(&[Value]) -> Value;

/// A capability supplied from outside the language
///
/// Natives see only their arguments. They cannot reach the caller's scope.
#[derive(Clone)]
pub struct NativeFunction {
    name: Rc<str>,
    func: Rc<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        NativeFunction {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.func)(args)
    }

    pub fn ptr_eq(&self, other: &NativeFunction) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}()", self.name)
    }
}

/// Name to native mapping consulted before variables on every call
#[derive(Default)]
pub struct Natives {
    inner: HashMap<String, NativeFunction>,
}

impl Natives {
    /// Register `native` under its name. Replaces any earlier native of the same name
    pub fn register(&mut self, native: NativeFunction) {
        self.inner.insert(native.name().to_string(), native);
    }

    pub fn get(&self, name: &str) -> Option<&NativeFunction> {
        self.inner.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }
}

fn write_args(sink: &Sink, args: &[Value], newline: bool) -> Value {
    let mut out = sink.borrow_mut();
    let res = args
        .iter()
        .try_for_each(|a| write!(out, "{}", a))
        .and_then(|_| if newline { writeln!(out) } else { Ok(()) })
        .and_then(|_| out.flush());

    if let Err(e) = res {
        error!("Failed to write output: {}", e);
    }

    Value::Void
}

/// `print(...)` and `println(...)`: display form of every argument, no separator
pub fn output_natives(sink: &Sink) -> Vec<NativeFunction> {
    let print_sink = Rc::clone(sink);
    let println_sink = Rc::clone(sink);

    vec![
        NativeFunction::new("print", move |args| write_args(&print_sink, args, false)),
        NativeFunction::new("println", move |args| write_args(&println_sink, args, true)),
    ]
}

#[test]
fn test_registry() {
    let mut natives = Natives::default();
    natives.register(NativeFunction::new("answer", |_| Value::Integer(1)));
    assert!(natives.contains("answer"));
    assert!(!natives.contains("question"));

    // Later registrations replace earlier ones
    natives.register(NativeFunction::new("answer", |_| Value::Integer(42)));
    let answer = natives.get("answer").map(|n| n.call(&[]));
    assert_eq!(answer, Some(Value::Integer(42)));
}

#[test]
fn test_output_natives() {
    let buf = Rc::new(RefCell::new(Vec::new()));
    let sink: Sink = buf.clone();
    let natives = output_natives(&sink);

    natives[0].call(&[Value::from("a"), Value::Integer(1)]);
    natives[1].call(&[Value::list(vec![Value::Integer(2)]), Value::Void]);
    natives[1].call(&[]);

    assert_eq!(
        String::from_utf8(buf.borrow().clone()).expect("Output not utf-8"),
        "a1[2]\n\n"
    );
}
