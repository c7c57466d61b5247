use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::lang::ast::{Block, Identifier};
use crate::lang::environment::Env;
use crate::lang::functions::NativeFunction;

/// Shared list storage. Copies of a `Value::List` alias the same vector
pub type List = Rc<RefCell<Vec<Value>>>;

/// Shared map storage. Kept sorted so display output is stable
pub type Map = Rc<RefCell<BTreeMap<String, Value>>>;

#[derive(Clone)]
pub struct Closure {
    pub params: Vec<Identifier>,
    pub body: Rc<Block>,
    /// Frame the closure was created in
    pub env: Env,
}

impl Closure {
    pub fn new(params: Vec<Identifier>, body: Rc<Block>, env: Env) -> Self {
        Closure { params, body, env }
    }

    /// Same closure value: same body captured over the same frame
    pub fn ptr_eq(&self, other: &Closure) -> bool {
        Rc::ptr_eq(&self.body, &other.body) && Rc::ptr_eq(&self.env, &other.env)
    }
}

#[derive(Clone)]
pub enum Value {
    /// Integers wrap on overflow
    Integer(i64),
    String(String),
    List(List),
    Map(Map),
    Closure(Closure),
    Native(NativeFunction),
    Void,
}

impl Value {
    pub fn list(vals: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(vals)))
    }

    pub fn map(vals: BTreeMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(vals)))
    }

    pub fn type_str(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Closure(_) => "function",
            Value::Native(_) => "native function",
            Value::Void => "void",
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(i) => *i != 0,
            Value::String(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Closure(_) | Value::Native(_) => true,
            Value::Void => false,
        }
    }

    /// `+`: integer addition, otherwise concatenation of both display forms
    pub fn add(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Integer(l), Value::Integer(r)) => Value::Integer(l.wrapping_add(*r)),
            (l, r) => Value::String(format!("{}{}", l, r)),
        }
    }

    /// `-`: only defined on two integers, `Void` otherwise
    pub fn sub(&self, rhs: &Value) -> Value {
        match (self, rhs) {
            (Value::Integer(l), Value::Integer(r)) => Value::Integer(l.wrapping_sub(*r)),
            _ => Value::Void,
        }
    }

    /// Copy with fresh list and map storage all the way down
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::List(list) => {
                Value::list(list.borrow().iter().map(Value::deep_clone).collect())
            }
            Value::Map(map) => Value::map(
                map.borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_clone()))
                    .collect(),
            ),
            v => v.clone(),
        }
    }
}

/// `==` semantics: same kind and same contents. Values of different kinds are never equal
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(l), Value::Integer(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (Value::List(l), Value::List(r)) => Rc::ptr_eq(l, r) || *l.borrow() == *r.borrow(),
            (Value::Map(l), Value::Map(r)) => Rc::ptr_eq(l, r) || *l.borrow() == *r.borrow(),
            (Value::Closure(l), Value::Closure(r)) => l.ptr_eq(r),
            (Value::Native(l), Value::Native(r)) => l.ptr_eq(r),
            (Value::Void, Value::Void) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::String(s) => write!(f, "{}", s),
            Value::List(list) => {
                write!(f, "[")?;
                for (i, val) in list.borrow().iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, val)) in map.borrow().iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, val)?;
                }
                write!(f, "}}")
            }
            Value::Closure(_) => write!(f, "[Function]"),
            Value::Native(_) => write!(f, "[Native Function]"),
            Value::Void => Ok(()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Native(native) => write!(f, "native {}", native.name()),
            Value::Void => write!(f, "void"),
            v => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(vals: Vec<Value>) -> Self {
        Value::list(vals)
    }
}

#[cfg(test)]
use crate::lang::environment::Environment;

#[test]
fn test_display() {
    let mut map = BTreeMap::new();
    map.insert("b".to_string(), Value::Integer(2));
    map.insert("a".to_string(), Value::from("x"));

    let closure = Value::Closure(Closure::new(
        vec![],
        Rc::new(Block::default()),
        Environment::new_global(),
    ));

    let tests = vec![
        (Value::Integer(-42), "-42"),
        (Value::from("hello"), "hello"),
        (Value::from(vec![Value::Integer(1), Value::from("two")]), "[1, two]"),
        (Value::list(vec![]), "[]"),
        (Value::map(map), "{a: x, b: 2}"),
        (Value::map(BTreeMap::new()), "{}"),
        (closure, "[Function]"),
        (
            Value::Native(NativeFunction::new("f", |_| Value::Void)),
            "[Native Function]",
        ),
        (Value::Void, ""),
    ];

    for (val, expected) in tests {
        assert_eq!(val.to_string(), expected);
    }
}

#[test]
fn test_truthiness() {
    assert!(Value::Integer(1).is_truthy());
    assert!(Value::Integer(-1).is_truthy());
    assert!(!Value::Integer(0).is_truthy());
    assert!(Value::from("a").is_truthy());
    assert!(!Value::from("").is_truthy());
    assert!(Value::list(vec![]).is_truthy());
    assert!(Value::map(BTreeMap::new()).is_truthy());
    assert!(!Value::Void.is_truthy());
}

#[test]
fn test_equality() {
    assert_eq!(Value::Integer(3), Value::Integer(3));
    assert_ne!(Value::Integer(3), Value::Integer(4));
    assert_eq!(Value::from("a"), Value::from("a"));
    // Never coerced across kinds
    assert_ne!(Value::Integer(1), Value::from("1"));
    assert_ne!(Value::Integer(0), Value::Void);
    assert_ne!(Value::from(""), Value::Void);
    assert_eq!(Value::Void, Value::Void);
    assert_eq!(
        Value::from(vec![Value::Integer(1)]),
        Value::from(vec![Value::Integer(1)])
    );

    let env = Environment::new_global();
    let body = Rc::new(Block::default());
    let f = Value::Closure(Closure::new(vec![], Rc::clone(&body), Rc::clone(&env)));
    let g = Value::Closure(Closure::new(vec![], body, env));
    let h = Value::Closure(Closure::new(
        vec![],
        Rc::new(Block::default()),
        Environment::new_global(),
    ));
    assert_eq!(f, g);
    assert_ne!(f, h);
}

#[test]
fn test_add() {
    let tests = vec![
        (Value::Integer(1), Value::Integer(2), Value::Integer(3)),
        (Value::from("a"), Value::Integer(1), Value::from("a1")),
        (Value::Integer(1), Value::from("a"), Value::from("1a")),
        (Value::from("a"), Value::Void, Value::from("a")),
        (
            Value::from(vec![Value::Integer(1)]),
            Value::from("!"),
            Value::from("[1]!"),
        ),
        (Value::Integer(i64::MAX), Value::Integer(1), Value::Integer(i64::MIN)),
    ];

    for (lhs, rhs, expected) in tests {
        assert_eq!(lhs.add(&rhs), expected);
    }

    assert_eq!(Value::Integer(5).sub(&Value::Integer(7)), Value::Integer(-2));
    assert_eq!(Value::from("5").sub(&Value::Integer(7)), Value::Void);
}

#[test]
fn test_aliasing_and_deep_clone() {
    let list = Value::from(vec![Value::Integer(1)]);
    let alias = list.clone();
    let copy = list.deep_clone();

    if let Value::List(inner) = &alias {
        inner.borrow_mut().push(Value::Integer(2));
    }

    assert_eq!(list.to_string(), "[1, 2]");
    assert_eq!(copy.to_string(), "[1]");
}
