use std::fmt;
use std::rc::Rc;

#[derive(Debug, PartialEq, Hash, PartialOrd, Ord, Eq, Clone)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(name: &str) -> Self {
        Identifier(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Integer(i64),
    Str(String),
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOp {
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `==`
    Equals,
    /// `+`
    Plus,
    /// `-`
    Minus,
}

/// `<tag attr="x" other={expr}>children</tag>`
#[derive(Debug, PartialEq, Clone)]
pub struct Element {
    pub tag: Identifier,
    /// In source order. A repeated attribute name replaces the earlier value in place
    pub attributes: Vec<(Identifier, Expression)>,
    pub children: Vec<Expression>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Literal(Literal),
    Var(Identifier),
    /// (callee, arguments)
    Call(Identifier, Vec<Expression>),
    /// (lhs, op, rhs)
    Binary(Box<Expression>, BinaryOp, Box<Expression>),
    /// Anonymous closure: (params, body)
    Function(Vec<Identifier>, Rc<Block>),
    Element(Element),
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Block {
    pub stmts: Vec<Statement>,
}

impl Block {
    pub fn new(stmts: Vec<Statement>) -> Self {
        Block { stmts }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Case {
    /// `None` for `default:`
    pub value: Option<Expression>,
    pub body: Block,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    /// `var x = init` or `const x = init`
    VarDecl(Identifier, Option<Expression>),
    /// `const [a, b] = init`
    Destructure(Vec<Identifier>, Expression),
    Return(Option<Expression>),
    /// (name, params, body)
    FuncDecl(Identifier, Vec<Identifier>, Rc<Block>),
    Block(Block),
    /// (condition, then_branch, else_branch)
    If(Expression, Box<Statement>, Option<Box<Statement>>),
    /// (subject, cases). At most one case has no value
    Switch(Expression, Vec<Case>),
    Expression(Expression),
    /// (module, symbols). The symbol list is informational only
    Import(String, Vec<Identifier>),
}
