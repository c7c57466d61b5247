//! State that survives across repeated renders of the same component tree.
//!
//! Every `setState(init)` call claims the next slot in call order, so a component must call
//! `setState` the same number of times, in the same order, on every render. The embedder calls
//! `Interpreter::reset_hooks` before each render to rewind the slot index.

use std::convert::TryFrom;
use std::rc::Rc;

use log::{debug, warn};

use crate::lang::ast::*;
use crate::lang::eval::Interpreter;
use crate::lang::value::{Closure, Value};

pub const SET_STATE: &str = "setState";
pub const UPDATE_HOOK: &str = "updateHook";

#[derive(Default)]
pub struct Hooks {
    slots: Vec<Value>,
    index: usize,
    /// Set when a slot is written through `updateHook`. The embedder should re-render
    dirty: bool,
}

impl Hooks {
    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn slots(&self) -> &[Value] {
        &self.slots
    }

    /// Whether a re-render was requested since the last call
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Claim the next slot, filling it with `init` the first time around
    fn claim(&mut self, init: Value) -> (usize, Value) {
        let idx = self.index;
        self.index += 1;
        if idx >= self.slots.len() {
            self.slots.push(init);
        }

        (idx, self.slots[idx].clone())
    }

    fn update(&mut self, idx: i64, val: Value) {
        match usize::try_from(idx) {
            Ok(i) if i < self.slots.len() => {
                self.slots[i] = val;
                self.dirty = true;
            }
            _ => warn!("updateHook: no hook slot {}", idx),
        }
    }
}

/// `(val) => { updateHook(idx, val); }`
fn setter_body(idx: usize) -> Rc<Block> {
    let call = Expression::Call(
        Identifier::new(UPDATE_HOOK),
        vec![
            Expression::Literal(Literal::Integer(idx as i64)),
            Expression::Var(Identifier::new("val")),
        ],
    );

    Rc::new(Block::new(vec![Statement::Expression(call)]))
}

/// Install `setState` and `updateHook` into `interp`
pub fn register(interp: &mut Interpreter) {
    let hooks = interp.hooks();
    interp.register_native(UPDATE_HOOK, move |args| {
        match (args.get(0).and_then(Value::as_integer), args.get(1)) {
            (Some(idx), Some(val)) => hooks.borrow_mut().update(idx, val.clone()),
            _ => debug!("updateHook called without (index, value)"),
        }
        Value::Void
    });

    let hooks = interp.hooks();
    let globals = interp.globals();
    interp.register_native(SET_STATE, move |args| {
        let init = args.first().cloned().unwrap_or(Value::Void);
        let (idx, current) = hooks.borrow_mut().claim(init);

        let setter = Closure::new(
            vec![Identifier::new("val")],
            setter_body(idx),
            Rc::clone(&globals),
        );

        Value::list(vec![current, Value::Closure(setter)])
    });
}

#[cfg(test)]
use crate::lang::functions::Sink;
#[cfg(test)]
use crate::lang::lexer::tokenize;
#[cfg(test)]
use crate::lang::parse::parse;
#[cfg(test)]
use std::cell::RefCell;

#[cfg(test)]
fn render(interp: &mut Interpreter, src: &str) {
    interp.reset_hooks();
    let parsed = parse(&tokenize(src));
    assert!(!parsed.has_errors());
    let diags = interp.execute(&parsed.stmts);
    assert!(diags.is_empty(), "{:?}", diags);
}

#[test]
fn test_state_persists_across_renders() {
    let buf = Rc::new(RefCell::new(Vec::new()));
    let sink: Sink = buf.clone();
    let mut interp = Interpreter::new(sink);
    register(&mut interp);
    assert!(interp.has_native(SET_STATE));
    assert!(interp.has_native(UPDATE_HOOK));

    let app = r#"
        const [count, setCount] = setState(0);
        const [name, setName] = setState("x");
        println(count, name);
        var bump = () => { setCount(count + 1); };
    "#;

    render(&mut interp, app);
    let hooks = interp.hooks();
    assert!(!hooks.borrow_mut().take_dirty());

    let bump = interp.get_global("bump");
    interp.call_closure(&bump, vec![]);
    assert!(hooks.borrow_mut().take_dirty());
    assert!(!hooks.borrow_mut().take_dirty());

    render(&mut interp, app);
    assert_eq!(hooks.borrow().slots().len(), 2);
    assert_eq!(
        String::from_utf8(buf.borrow().clone()).expect("Output not utf-8"),
        "0x\n1x\n"
    );
}

#[test]
fn test_update_out_of_range() {
    let mut hooks = Hooks::default();
    hooks.update(0, Value::Integer(1));
    hooks.update(-1, Value::Integer(1));
    assert!(hooks.slots().is_empty());
    assert!(!hooks.take_dirty());

    let (idx, val) = hooks.claim(Value::Integer(7));
    assert_eq!((idx, val), (0, Value::Integer(7)));
    hooks.reset();
    let (idx, val) = hooks.claim(Value::Integer(99));
    assert_eq!((idx, val), (0, Value::Integer(7)));
}
