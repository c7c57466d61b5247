//! Sunda's lexer.
//!
//! Lexing is done with `pom` combinators over the source characters. Every rule produces an
//! `Option<Token>`: whitespace, comments and characters no rule knows about produce `None` and
//! are dropped. Lexing never fails, which keeps the parser as the only place that reports
//! problems.
//!
//! Developer notes:
//!
//! * Like any PEG, rule order matters. Multi character operators (`==`, `=>`, `+=`) must be
//!   tried before their single character prefixes, and `//` before `/`.
//!
//! * The catch-all `any()` rule must stay last, otherwise it would swallow real tokens.

use std::collections::HashMap;
use std::fmt;
use std::iter::FromIterator;

use lazy_static::lazy_static;
use pom::parser::{any, empty, end, is_a, none_of, one_of, sym, tag, Parser};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum TokenKind {
    Eof,
    // Keywords
    Var,
    If,
    For,
    Function,
    Return,
    Switch,
    Case,
    Default,
    Const,
    Import,
    From,
    // Atoms
    Identifier,
    Str,
    Number,
    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Colon,
    Comma,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Lt,
    Gt,
    Eq,
    EqEq,
    PlusEq,
    Arrow,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Eof => "eof",
            TokenKind::Var => "var",
            TokenKind::If => "if",
            TokenKind::For => "for",
            TokenKind::Function => "function",
            TokenKind::Return => "return",
            TokenKind::Switch => "switch",
            TokenKind::Case => "case",
            TokenKind::Default => "default",
            TokenKind::Const => "const",
            TokenKind::Import => "import",
            TokenKind::From => "from",
            TokenKind::Identifier => "identifier",
            TokenKind::Str => "string",
            TokenKind::Number => "number",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Eq => "=",
            TokenKind::EqEq => "==",
            TokenKind::PlusEq => "+=",
            TokenKind::Arrow => "=>",
        };

        write!(f, "{}", name)
    }
}

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, TokenKind> = {
        let mut m = HashMap::new();
        m.insert("var", TokenKind::Var);
        m.insert("if", TokenKind::If);
        m.insert("for", TokenKind::For);
        m.insert("function", TokenKind::Function);
        m.insert("return", TokenKind::Return);
        m.insert("switch", TokenKind::Switch);
        m.insert("case", TokenKind::Case);
        m.insert("default", TokenKind::Default);
        m.insert("const", TokenKind::Const);
        m.insert("import", TokenKind::Import);
        m.insert("from", TokenKind::From);
        m
    };
}

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact matched text. For strings this excludes the quotes
    pub text: String,
    /// 1-based source line the token starts on
    pub line: usize,
    /// Whitespace directly precedes the token. Lets markup text keep its word breaks
    pub space_before: bool,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str, line: usize) -> Self {
        Token {
            kind,
            text: text.to_string(),
            line,
            space_before: false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.line, self.kind, self.text)
    }
}

/// A lexed token before line numbers are resolved
type RawToken = (TokenKind, String);

fn whitespace<'a>() -> Parser<'a, char, Option<RawToken>> {
    one_of(" \t\r\n").repeat(1..).map(|_| None)
}

fn comment<'a>() -> Parser<'a, char, Option<RawToken>> {
    (tag("//") * none_of("\n").repeat(0..)).map(|_| None)
}

fn ident_or_keyword<'a>() -> Parser<'a, char, Option<RawToken>> {
    let ident = is_a(|c: char| c.is_ascii_alphabetic() || c == '_')
        + is_a(|c: char| c.is_ascii_alphanumeric() || c == '_').repeat(0..);

    ident.collect().map(String::from_iter).map(|s| {
        let kind = KEYWORDS
            .get(s.as_str())
            .copied()
            .unwrap_or(TokenKind::Identifier);
        Some((kind, s))
    })
}

fn number<'a>() -> Parser<'a, char, Option<RawToken>> {
    is_a(|c: char| c.is_ascii_digit())
        .repeat(1..)
        .map(String::from_iter)
        .map(|s| Some((TokenKind::Number, s)))
}

/// Double quoted and backtick quoted strings. No escape processing is done, and a string left
/// open at the end of input runs to the end of input.
fn string<'a>() -> Parser<'a, char, Option<RawToken>> {
    let double = sym('"') * none_of("\"").repeat(0..) - sym('"').opt();
    let backtick = sym('`') * none_of("`").repeat(0..) - sym('`').opt();

    (double | backtick).map(|chars| Some((TokenKind::Str, String::from_iter(chars))))
}

fn punct<'a>() -> Parser<'a, char, Option<RawToken>> {
    // NB: longer symbols first
    let ops = tag("==").map(|_| TokenKind::EqEq)
        | tag("=>").map(|_| TokenKind::Arrow)
        | tag("+=").map(|_| TokenKind::PlusEq)
        | sym('=').map(|_| TokenKind::Eq)
        | sym('+').map(|_| TokenKind::Plus)
        | sym('-').map(|_| TokenKind::Minus)
        | sym('*').map(|_| TokenKind::Star)
        | sym('/').map(|_| TokenKind::Slash)
        | sym('<').map(|_| TokenKind::Lt)
        | sym('>').map(|_| TokenKind::Gt)
        | sym('(').map(|_| TokenKind::LParen)
        | sym(')').map(|_| TokenKind::RParen)
        | sym('{').map(|_| TokenKind::LBrace)
        | sym('}').map(|_| TokenKind::RBrace)
        | sym('[').map(|_| TokenKind::LBracket)
        | sym(']').map(|_| TokenKind::RBracket)
        | sym(';').map(|_| TokenKind::Semicolon)
        | sym(':').map(|_| TokenKind::Colon)
        | sym(',').map(|_| TokenKind::Comma)
        | sym('.').map(|_| TokenKind::Dot);

    ops.map(|kind| Some((kind, kind.to_string())))
}

/// Anything else is silently dropped
fn unknown<'a>() -> Parser<'a, char, Option<RawToken>> {
    any().map(|_| None)
}

fn token<'a>() -> Parser<'a, char, (usize, Option<RawToken>)> {
    let rule = whitespace() | comment() | string() | number() | ident_or_keyword() | punct();

    empty().pos() + (rule | unknown())
}

/// Convert `src` into tokens. The returned vector always ends with an `Eof` token.
pub fn tokenize(src: &str) -> Vec<Token> {
    let input: Vec<char> = src.chars().collect();
    let lexer = token().repeat(0..) - end();

    // Every character is matched by some rule, so this only yields an empty stream if pom
    // itself misbehaves
    let raw = lexer.parse(&input).unwrap_or_default();

    let mut tokens = Vec::with_capacity(raw.len() + 1);
    let mut line = 1;
    let mut scanned = 0;
    for (pos, tok) in raw {
        line += input[scanned..pos].iter().filter(|c| **c == '\n').count();
        scanned = pos;

        if let Some((kind, text)) = tok {
            let space_before = pos > 0 && input[pos - 1].is_whitespace();
            tokens.push(Token {
                kind,
                text,
                line,
                space_before,
            });
        }
    }

    line += input[scanned..].iter().filter(|c| **c == '\n').count();
    tokens.push(Token::new(TokenKind::Eof, "", line));

    tokens
}

#[cfg(test)]
fn kinds(src: &str) -> Vec<TokenKind> {
    tokenize(src).into_iter().map(|t| t.kind).collect()
}

#[test]
fn test_keywords_and_idents() {
    use TokenKind::*;

    let tests = vec![
        ("var x", vec![Var, Identifier, Eof]),
        ("const _a1", vec![Const, Identifier, Eof]),
        (
            "if for function return switch case default import from",
            vec![
                If, For, Function, Return, Switch, Case, Default, Import, From, Eof,
            ],
        ),
        ("variable iffy", vec![Identifier, Identifier, Eof]),
        ("else", vec![Identifier, Eof]),
    ];

    for (input, expected) in tests {
        assert_eq!(kinds(input), expected, "input: {}", input);
    }
}

#[test]
fn test_operators() {
    use TokenKind::*;

    let tests = vec![
        ("= == => +=", vec![Eq, EqEq, Arrow, PlusEq, Eof]),
        ("===", vec![EqEq, Eq, Eof]),
        ("a+=1", vec![Identifier, PlusEq, Number, Eof]),
        (
            "( ) { } [ ] ; : , . + - * / < >",
            vec![
                LParen, RParen, LBrace, RBrace, LBracket, RBracket, Semicolon, Colon, Comma, Dot,
                Plus, Minus, Star, Slash, Lt, Gt, Eof,
            ],
        ),
        ("</Tag>", vec![Lt, Slash, Identifier, Gt, Eof]),
    ];

    for (input, expected) in tests {
        assert_eq!(kinds(input), expected, "input: {}", input);
    }
}

#[test]
fn test_literals() {
    let toks = tokenize(r#"123 "a b" `c"d` -4"#);
    assert_eq!(toks[0], Token::new(TokenKind::Number, "123", 1));
    let expected = vec![
        (TokenKind::Str, "a b"),
        (TokenKind::Str, "c\"d"),
        (TokenKind::Minus, "-"),
        (TokenKind::Number, "4"),
    ];
    for (tok, (kind, text)) in toks[1..5].iter().zip(expected) {
        assert_eq!((tok.kind, tok.text.as_str()), (kind, text));
    }

    // No escape processing
    let toks = tokenize(r#""a\nb""#);
    assert_eq!(toks[0].text, "a\\nb");

    // Unterminated string runs to the end
    let toks = tokenize("\"abc");
    assert_eq!(toks[0], Token::new(TokenKind::Str, "abc", 1));
    assert_eq!(toks[1].kind, TokenKind::Eof);
}

#[test]
fn test_comments_and_unknown_chars() {
    use TokenKind::*;

    assert_eq!(kinds("x // comment ; here\ny"), vec![Identifier, Identifier, Eof]);
    assert_eq!(kinds("a @ # $ b"), vec![Identifier, Identifier, Eof]);
    assert_eq!(kinds("1 / 2"), vec![Number, Slash, Number, Eof]);
    assert_eq!(kinds(""), vec![Eof]);
}

#[test]
fn test_lines() {
    let toks = tokenize("var a\n\n// c\nvar b\n");
    let lines: Vec<usize> = toks.iter().map(|t| t.line).collect();
    assert_eq!(lines, vec![1, 1, 4, 4, 5]);
}

#[test]
fn test_space_before() {
    let toks = tokenize("a b,c\n(d");
    let spaced: Vec<bool> = toks.iter().map(|t| t.space_before).collect();
    assert_eq!(spaced, vec![false, true, false, false, true, false, false]);
}
