use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::lang::value::Value;

/// Shared handle to a scope frame
///
/// Frames are shared because closures keep their defining frame alive after the block or call
/// that created it has finished. A child owns its parent, so a frame lives as long as any
/// frame or closure below it. A closure stored into the frame it captured forms a cycle that
/// is only broken by `Environment::clear`.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    vars: BTreeMap<String, Value>,
    parent: Option<Env>,
}

impl Environment {
    /// Root frame with no parent
    pub fn new_global() -> Env {
        Rc::new(RefCell::new(Environment::default()))
    }

    pub fn child(parent: &Env) -> Env {
        Rc::new(RefCell::new(Environment {
            vars: BTreeMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// Insert or overwrite `name` in this frame only. Shadows any outer binding
    pub fn define(&mut self, name: &str, val: Value) {
        self.vars.insert(name.to_string(), val);
    }

    /// Look `name` up in this frame, then each parent in order
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(val) = self.vars.get(name) {
            return Some(val.clone());
        }

        match &self.parent {
            Some(parent) => parent.borrow().get(name),
            None => None,
        }
    }

    /// Overwrite the nearest existing binding of `name`
    ///
    /// Returns false, and binds nothing, if no frame in the chain defines `name`.
    pub fn assign(&mut self, name: &str, val: Value) -> bool {
        if let Some(slot) = self.vars.get_mut(name) {
            *slot = val;
            return true;
        }

        match &self.parent {
            Some(parent) => parent.borrow_mut().assign(name, val),
            None => false,
        }
    }

    /// True if this frame itself binds `name`
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Drop every binding in this frame
    pub fn clear(&mut self) {
        self.vars.clear();
    }
}

#[test]
fn test_define_and_get() {
    let global = Environment::new_global();
    global.borrow_mut().define("x", Value::Integer(1));

    let inner = Environment::child(&global);
    assert_eq!(inner.borrow().get("x"), Some(Value::Integer(1)));
    assert_eq!(inner.borrow().get("y"), None);

    // Shadowing leaves the outer binding alone
    inner.borrow_mut().define("x", Value::Integer(2));
    assert_eq!(inner.borrow().get("x"), Some(Value::Integer(2)));
    assert_eq!(global.borrow().get("x"), Some(Value::Integer(1)));
    assert!(inner.borrow().contains("x"));
}

#[test]
fn test_assign() {
    let global = Environment::new_global();
    global.borrow_mut().define("x", Value::Integer(1));
    let middle = Environment::child(&global);
    let inner = Environment::child(&middle);

    // Mutates the frame where the binding lives
    assert!(inner.borrow_mut().assign("x", Value::Integer(5)));
    assert_eq!(global.borrow().get("x"), Some(Value::Integer(5)));
    assert!(!middle.borrow().contains("x"));
    assert!(!inner.borrow().contains("x"));

    // Never creates bindings
    assert!(!inner.borrow_mut().assign("y", Value::Integer(1)));
    assert_eq!(inner.borrow().get("y"), None);
    assert_eq!(global.borrow().get("y"), None);
}

#[test]
fn test_child_outlives_parent_handle() {
    let inner = {
        let global = Environment::new_global();
        global.borrow_mut().define("kept", Value::from("yes"));
        Environment::child(&global)
    };

    assert_eq!(inner.borrow().get("kept"), Some(Value::from("yes")));
}
