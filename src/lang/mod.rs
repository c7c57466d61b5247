pub mod ast;
pub mod diagnostic;
pub mod environment;
pub mod eval;
pub mod functions;
pub mod hooks;
pub mod lexer;
pub mod modules;
pub mod parse;
pub mod runtime;
pub mod value;
