//! Recursive descent parser for Sunda.
//!
//! Developer notes:
//!
//! * Operator precedence uses a precedence ladder: lower precedence rules sit higher up in the
//!   call chain and bind later. From low to high:
//!
//!     assignment (`=`, `+=`, right assoc) -> equality (`==`) -> term (`+`, `-`) -> primary
//!
//! * Errors are `Err(Diagnostic)` values that unwind to `Parser::parse`, which drops the
//!   top-level statement being built, skips a single token, and carries on. Problems that do
//!   not invalidate the tree (bad assignment targets, mismatched closing tags) are pushed to
//!   `Parser::diagnostics` instead and parsing continues normally.
//!
//! * `(` is ambiguous between a grouping and a lambda parameter list. A parenthesized
//!   expression is parsed first and reinterpreted as a parameter list only if `=>` follows it.
//!   That can only ever yield zero or one parameters, so lists with commas are recognized by a
//!   separate lookahead rule before falling back to the expression route.

use crate::lang::ast::*;
use crate::lang::diagnostic::Diagnostic;
use crate::lang::lexer::{Token, TokenKind};

type ParseResult<T> = Result<T, Diagnostic>;

/// Output of a parse: every statement that parsed cleanly plus everything that went wrong
#[derive(Debug, Default)]
pub struct Parsed {
    pub stmts: Vec<Statement>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Parsed {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_parse_error)
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> &Token {
        // `tokenize` always terminates the stream with `Eof`, but tolerate streams that don't
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.current.min(last)]
    }

    /// Token after the current one
    fn peek_next(&self) -> &Token {
        if self.is_at_end() {
            return self.peek();
        }
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.current + 1).min(last)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.tokens.is_empty() || self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn check_word(&self, word: &str) -> bool {
        self.check(TokenKind::Identifier) && self.peek().text == word
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, msg: &str) -> ParseResult<&Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }

        Err(self.error(msg))
    }

    fn consume_ident(&mut self, msg: &str) -> ParseResult<Identifier> {
        let tok = self.consume(TokenKind::Identifier, msg)?;
        Ok(Identifier(tok.text.clone()))
    }

    fn error(&self, msg: &str) -> Diagnostic {
        let tok = self.peek();
        let found = if tok.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", tok.text)
        };

        Diagnostic::parse(tok.line, &format!("{}, found {}", msg, found))
    }

    fn parse(mut self) -> Parsed {
        let mut stmts = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(s) => stmts.push(s),
                Err(e) => {
                    self.diagnostics.push(e);
                    self.advance();
                }
            }
        }

        Parsed {
            stmts,
            diagnostics: self.diagnostics,
        }
    }

    fn declaration(&mut self) -> ParseResult<Statement> {
        if self.matches(TokenKind::Var) {
            return self.var_decl();
        }
        if self.matches(TokenKind::Const) {
            if self.matches(TokenKind::LBracket) {
                return self.destructure();
            }
            return self.var_decl();
        }
        if self.matches(TokenKind::Function) {
            return self.func_decl();
        }
        if self.matches(TokenKind::Import) {
            return self.import();
        }

        self.statement()
    }

    fn var_decl(&mut self) -> ParseResult<Statement> {
        let name = self.consume_ident("Expect variable name")?;
        let init = if self.matches(TokenKind::Eq) {
            Some(self.expression()?)
        } else {
            None
        };
        self.matches(TokenKind::Semicolon);

        Ok(Statement::VarDecl(name, init))
    }

    /// `const [a, b] = expr`. Leading `const [` already consumed
    fn destructure(&mut self) -> ParseResult<Statement> {
        let mut names = Vec::new();
        if !self.check(TokenKind::RBracket) {
            loop {
                names.push(self.consume_ident("Expect variable name in destructuring")?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RBracket, "Expect ']' after destructuring list")?;
        self.consume(TokenKind::Eq, "Expect '=' after destructuring list")?;
        let init = self.expression()?;
        self.matches(TokenKind::Semicolon);

        Ok(Statement::Destructure(names, init))
    }

    fn func_decl(&mut self) -> ParseResult<Statement> {
        let name = self.consume_ident("Expect function name")?;
        self.consume(TokenKind::LParen, "Expect '(' after function name")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.consume_ident("Expect parameter name")?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "Expect ')' after parameters")?;
        self.consume(TokenKind::LBrace, "Expect '{' before function body")?;
        let body = self.block_body()?;

        Ok(Statement::FuncDecl(name, params, body.into()))
    }

    /// `import "mod"` or `import { a, b } from "mod"`
    fn import(&mut self) -> ParseResult<Statement> {
        if self.matches(TokenKind::Str) {
            let module = self.previous().text.clone();
            self.matches(TokenKind::Semicolon);
            return Ok(Statement::Import(module, Vec::new()));
        }

        self.consume(TokenKind::LBrace, "Expect module string or '{' after import")?;
        let mut symbols = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                symbols.push(self.consume_ident("Expect symbol name in import list")?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RBrace, "Expect '}' after import list")?;
        self.consume(TokenKind::From, "Expect 'from' after import list")?;
        let module = self
            .consume(TokenKind::Str, "Expect module string after 'from'")?
            .text
            .clone();
        self.matches(TokenKind::Semicolon);

        Ok(Statement::Import(module, symbols))
    }

    fn statement(&mut self) -> ParseResult<Statement> {
        if self.matches(TokenKind::Return) {
            let value = if self.check(TokenKind::Semicolon)
                || self.check(TokenKind::RBrace)
                || self.is_at_end()
            {
                None
            } else {
                Some(self.expression()?)
            };
            self.matches(TokenKind::Semicolon);
            return Ok(Statement::Return(value));
        }
        if self.matches(TokenKind::If) {
            return self.if_stmt();
        }
        if self.matches(TokenKind::Switch) {
            return self.switch_stmt();
        }
        if self.matches(TokenKind::LBrace) {
            return Ok(Statement::Block(self.block_body()?));
        }

        let expr = self.expression()?;
        self.matches(TokenKind::Semicolon);

        Ok(Statement::Expression(expr))
    }

    fn if_stmt(&mut self) -> ParseResult<Statement> {
        self.consume(TokenKind::LParen, "Expect '(' after 'if'")?;
        let cond = self.expression()?;
        self.consume(TokenKind::RParen, "Expect ')' after condition")?;
        let then_branch = self.statement()?;

        // `else` is not a keyword, it is only special right after an if body
        let else_branch = if self.check_word("else") {
            self.advance();
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Statement::If(cond, Box::new(then_branch), else_branch))
    }

    fn switch_stmt(&mut self) -> ParseResult<Statement> {
        self.consume(TokenKind::LParen, "Expect '(' after 'switch'")?;
        let subject = self.expression()?;
        self.consume(TokenKind::RParen, "Expect ')' after switch subject")?;
        self.consume(TokenKind::LBrace, "Expect '{' before switch cases")?;

        let mut cases = Vec::new();
        let mut has_default = false;
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            let value = if self.matches(TokenKind::Case) {
                let value = self.expression()?;
                self.consume(TokenKind::Colon, "Expect ':' after case value")?;
                Some(value)
            } else if self.check(TokenKind::Default) {
                if has_default {
                    return Err(self.error("Switch has more than one default case"));
                }
                self.advance();
                self.consume(TokenKind::Colon, "Expect ':' after 'default'")?;
                has_default = true;
                None
            } else {
                // Stray token between cases
                self.advance();
                continue;
            };

            let mut stmts = Vec::new();
            while !self.check(TokenKind::Case)
                && !self.check(TokenKind::Default)
                && !self.check(TokenKind::RBrace)
                && !self.is_at_end()
            {
                stmts.push(self.declaration()?);
            }
            cases.push(Case {
                value,
                body: Block::new(stmts),
            });
        }
        self.consume(TokenKind::RBrace, "Expect '}' after switch cases")?;

        Ok(Statement::Switch(subject, cases))
    }

    /// Statements up to and including the closing `}`. Opening `{` already consumed
    fn block_body(&mut self) -> ParseResult<Block> {
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.declaration()?);
        }
        self.consume(TokenKind::RBrace, "Expect '}' after block")?;

        Ok(Block::new(stmts))
    }

    fn expression(&mut self) -> ParseResult<Expression> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expression> {
        let expr = self.equality()?;

        let op = if self.matches(TokenKind::Eq) {
            BinaryOp::Assign
        } else if self.matches(TokenKind::PlusEq) {
            BinaryOp::AddAssign
        } else {
            return Ok(expr);
        };

        let line = self.previous().line;
        let value = self.assignment()?;
        match expr {
            Expression::Var(_) => Ok(Expression::Binary(Box::new(expr), op, Box::new(value))),
            _ => {
                self.diagnostics
                    .push(Diagnostic::InvalidAssignTarget { line });
                Ok(expr)
            }
        }
    }

    fn equality(&mut self) -> ParseResult<Expression> {
        let mut expr = self.term()?;
        while self.matches(TokenKind::EqEq) {
            let rhs = self.term()?;
            expr = Expression::Binary(Box::new(expr), BinaryOp::Equals, Box::new(rhs));
        }

        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expression> {
        let mut expr = self.primary()?;
        loop {
            let op = if self.matches(TokenKind::Plus) {
                BinaryOp::Plus
            } else if self.matches(TokenKind::Minus) {
                BinaryOp::Minus
            } else {
                break;
            };
            let rhs = self.primary()?;
            expr = Expression::Binary(Box::new(expr), op, Box::new(rhs));
        }

        Ok(expr)
    }

    fn primary(&mut self) -> ParseResult<Expression> {
        if self.matches(TokenKind::Number) {
            let text = self.previous().text.clone();
            return match text.parse::<i64>() {
                Ok(i) => Ok(Expression::Literal(Literal::Integer(i))),
                Err(_) => Err(Diagnostic::parse(
                    self.previous().line,
                    &format!("Integer literal {} out of range", text),
                )),
            };
        }
        if self.matches(TokenKind::Str) {
            let text = self.previous().text.clone();
            return Ok(Expression::Literal(Literal::Str(text)));
        }
        if self.matches(TokenKind::Identifier) {
            let name = Identifier(self.previous().text.clone());
            if self.matches(TokenKind::LParen) {
                return self.finish_call(name);
            }
            return Ok(Expression::Var(name));
        }
        if self.matches(TokenKind::LParen) {
            return self.paren_or_lambda();
        }
        if self.matches(TokenKind::Lt) {
            return self.element();
        }

        Err(self.error("Unexpected token"))
    }

    fn finish_call(&mut self, callee: Identifier) -> ParseResult<Expression> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "Expect ')' after arguments")?;

        Ok(Expression::Call(callee, args))
    }

    /// Opening `(` already consumed
    fn paren_or_lambda(&mut self) -> ParseResult<Expression> {
        if self.check(TokenKind::RParen) {
            match self.peek_next().kind {
                // `() => { ... }` and the legacy `() { ... }`
                TokenKind::Arrow | TokenKind::LBrace => {
                    self.advance();
                    self.matches(TokenKind::Arrow);
                    return self.lambda_body(Vec::new());
                }
                _ => (),
            }
        }

        if let Some(params) = self.multi_param_list() {
            return self.lambda_body(params);
        }

        let expr = self.expression()?;
        self.consume(TokenKind::RParen, "Expect ')' after expression")?;

        if self.check(TokenKind::Arrow) {
            let params = match expr {
                Expression::Var(name) => vec![name],
                _ => return Err(self.error("Invalid parameter list for arrow function")),
            };
            self.advance();
            return self.lambda_body(params);
        }

        Ok(expr)
    }

    /// Recognize `a, b, ...) =>` without consuming anything unless it matches
    ///
    /// On a match, consumes through the `=>` and returns the parameter names.
    fn multi_param_list(&mut self) -> Option<Vec<Identifier>> {
        let mut params = Vec::new();
        let mut i = self.current;
        loop {
            let tok = self.tokens.get(i)?;
            if tok.kind != TokenKind::Identifier {
                return None;
            }
            params.push(Identifier(tok.text.clone()));
            i += 1;

            match self.tokens.get(i)?.kind {
                TokenKind::Comma => i += 1,
                TokenKind::RParen => break,
                _ => return None,
            }
        }

        if params.len() < 2 || self.tokens.get(i + 1)?.kind != TokenKind::Arrow {
            return None;
        }

        // Skip past `)` and `=>`
        self.current = i + 2;
        Some(params)
    }

    fn lambda_body(&mut self, params: Vec<Identifier>) -> ParseResult<Expression> {
        self.consume(TokenKind::LBrace, "Expect '{' before function body")?;
        let body = self.block_body()?;

        Ok(Expression::Function(params, body.into()))
    }

    /// Markup element. Opening `<` already consumed
    fn element(&mut self) -> ParseResult<Expression> {
        let tag = self.consume_ident("Expect tag name")?;

        let mut attributes: Vec<(Identifier, Expression)> = Vec::new();
        while !self.check(TokenKind::Gt) && !self.check(TokenKind::Slash) && !self.is_at_end() {
            if !self.matches(TokenKind::Identifier) {
                // Not an attribute name, skip it
                self.advance();
                continue;
            }

            let key = Identifier(self.previous().text.clone());
            let value = if self.matches(TokenKind::Eq) {
                if self.matches(TokenKind::Str) {
                    Expression::Literal(Literal::Str(self.previous().text.clone()))
                } else if self.matches(TokenKind::LBrace) {
                    let e = self.expression()?;
                    self.consume(TokenKind::RBrace, "Expect '}' after attribute expression")?;
                    e
                } else {
                    return Err(self.error("Expect string or {expression} for attribute value"));
                }
            } else {
                // Bare attribute
                Expression::Literal(Literal::Str("true".to_string()))
            };

            match attributes.iter_mut().find(|(k, _)| *k == key) {
                Some(existing) => existing.1 = value,
                None => attributes.push((key, value)),
            }
        }

        if self.matches(TokenKind::Slash) {
            self.consume(TokenKind::Gt, "Expect '>' after '/' in self-closing tag")?;
            return Ok(Expression::Element(Element {
                tag,
                attributes,
                children: Vec::new(),
            }));
        }
        self.consume(TokenKind::Gt, "Expect '>' after attributes")?;

        let mut children = Vec::new();
        while !self.is_at_end() {
            if self.check(TokenKind::Lt) {
                if self.peek_next().kind == TokenKind::Slash {
                    break;
                }
                self.advance();
                children.push(self.element()?);
            } else if self.matches(TokenKind::LBrace) {
                children.push(self.expression()?);
                self.consume(TokenKind::RBrace, "Expect '}' after child expression")?;
            } else {
                children.push(self.text_span());
            }
        }

        self.consume(TokenKind::Lt, "Expect closing tag")?;
        self.consume(TokenKind::Slash, "Expect '/' in closing tag")?;
        if self.matches(TokenKind::Identifier) && self.previous().text != tag.0 {
            let found = self.previous();
            let diag = Diagnostic::TagMismatch {
                line: found.line,
                expected: tag.0.clone(),
                found: found.text.clone(),
            };
            self.diagnostics.push(diag);
        }
        self.consume(TokenKind::Gt, "Expect '>' after closing tag")?;

        Ok(Expression::Element(Element {
            tag,
            attributes,
            children,
        }))
    }

    /// Raw text between tags
    ///
    /// The lexer has already split it into tokens, so they are glued back together with a
    /// single space wherever the source had whitespace. At the edges whitespace is only kept
    /// next to a `{expr}` child, never next to a tag.
    fn text_span(&mut self) -> Expression {
        let after_expr = self.previous().kind == TokenKind::RBrace;
        let mut text = String::new();
        while !self.check(TokenKind::Lt) && !self.check(TokenKind::LBrace) && !self.is_at_end() {
            let tok = self.advance();
            if tok.space_before && (after_expr || !text.is_empty()) {
                text.push(' ');
            }
            text.push_str(&tok.text);
        }
        if self.check(TokenKind::LBrace) && self.peek().space_before {
            text.push(' ');
        }

        Expression::Literal(Literal::Str(text))
    }
}

/// Parse a token stream produced by `lexer::tokenize`
pub fn parse(tokens: &[Token]) -> Parsed {
    Parser::new(tokens).parse()
}

#[cfg(test)]
fn parse_str(src: &str) -> Parsed {
    parse(&crate::lang::lexer::tokenize(src))
}

#[cfg(test)]
fn int(i: i64) -> Box<Expression> {
    Box::new(Expression::Literal(Literal::Integer(i)))
}

#[cfg(test)]
fn var(name: &str) -> Box<Expression> {
    Box::new(Expression::Var(Identifier::new(name)))
}

#[test]
fn test_precedence() {
    let tests = vec![
        (
            "1 + 2 - 3",
            Expression::Binary(
                Box::new(Expression::Binary(int(1), BinaryOp::Plus, int(2))),
                BinaryOp::Minus,
                int(3),
            ),
        ),
        (
            "1 + 2 == 3",
            Expression::Binary(
                Box::new(Expression::Binary(int(1), BinaryOp::Plus, int(2))),
                BinaryOp::Equals,
                int(3),
            ),
        ),
        (
            "a = b = 1",
            Expression::Binary(
                var("a"),
                BinaryOp::Assign,
                Box::new(Expression::Binary(var("b"), BinaryOp::Assign, int(1))),
            ),
        ),
        (
            "a += 1 + 2",
            Expression::Binary(
                var("a"),
                BinaryOp::AddAssign,
                Box::new(Expression::Binary(int(1), BinaryOp::Plus, int(2))),
            ),
        ),
        (
            "(1 + 2) == 3",
            Expression::Binary(
                Box::new(Expression::Binary(int(1), BinaryOp::Plus, int(2))),
                BinaryOp::Equals,
                int(3),
            ),
        ),
        (
            "f(1, x)",
            Expression::Call(Identifier::new("f"), vec![*int(1), *var("x")]),
        ),
    ];

    for (input, expected) in tests {
        let parsed = parse_str(input);
        assert!(parsed.diagnostics.is_empty(), "input: {}", input);
        assert_eq!(
            parsed.stmts,
            vec![Statement::Expression(expected)],
            "input: {}",
            input
        );
    }
}

#[test]
fn test_declarations() {
    let parsed = parse_str("var x = 1; const y; const [a, b] = pair(); function f(p, q) { return p; }");
    assert!(parsed.diagnostics.is_empty());
    assert_eq!(
        parsed.stmts,
        vec![
            Statement::VarDecl(Identifier::new("x"), Some(*int(1))),
            Statement::VarDecl(Identifier::new("y"), None),
            Statement::Destructure(
                vec![Identifier::new("a"), Identifier::new("b")],
                Expression::Call(Identifier::new("pair"), vec![]),
            ),
            Statement::FuncDecl(
                Identifier::new("f"),
                vec![Identifier::new("p"), Identifier::new("q")],
                Block::new(vec![Statement::Return(Some(*var("p")))]).into(),
            ),
        ]
    );
}

#[test]
fn test_control_flow() {
    let parsed = parse_str("if (x == 1) y = 2 else { y = 3 }");
    assert!(parsed.diagnostics.is_empty());
    match &parsed.stmts[..] {
        [Statement::If(_, then_branch, Some(else_branch))] => {
            assert!(matches!(**then_branch, Statement::Expression(_)));
            assert!(matches!(**else_branch, Statement::Block(_)));
        }
        s => panic!("unexpected parse: {:?}", s),
    }

    let parsed = parse_str("switch (x) { case 1: a(); b(); case 2: c(); default: d(); }");
    assert!(parsed.diagnostics.is_empty());
    match &parsed.stmts[..] {
        [Statement::Switch(_, cases)] => {
            assert_eq!(cases.len(), 3);
            assert_eq!(cases[0].body.stmts.len(), 2);
            assert_eq!(cases[1].value, Some(*int(2)));
            assert_eq!(cases[2].value, None);
        }
        s => panic!("unexpected parse: {:?}", s),
    }

    let parsed = parse_str("switch (x) { default: a(); default: b(); }");
    assert!(parsed.has_errors());

    let parsed = parse_str("return; return 1");
    assert_eq!(
        parsed.stmts,
        vec![Statement::Return(None), Statement::Return(Some(*int(1)))]
    );
}

#[test]
fn test_imports() {
    let parsed = parse_str(r#"import "gui"; import { a, b } from "lib/util""#);
    assert!(parsed.diagnostics.is_empty());
    assert_eq!(
        parsed.stmts,
        vec![
            Statement::Import("gui".to_string(), vec![]),
            Statement::Import(
                "lib/util".to_string(),
                vec![Identifier::new("a"), Identifier::new("b")]
            ),
        ]
    );
}

#[test]
fn test_lambdas() {
    let tests = vec![
        ("() => { }", vec![]),
        ("() { }", vec![]),
        ("(a) => { }", vec!["a"]),
        ("(a, b, c) => { }", vec!["a", "b", "c"]),
    ];

    for (input, params) in tests {
        let parsed = parse_str(input);
        assert!(parsed.diagnostics.is_empty(), "input: {}", input);
        let expected: Vec<Identifier> = params.into_iter().map(Identifier::new).collect();
        assert_eq!(
            parsed.stmts,
            vec![Statement::Expression(Expression::Function(
                expected,
                Block::default().into()
            ))],
            "input: {}",
            input
        );
    }

    // Only bare identifiers can be reinterpreted as parameters
    let parsed = parse_str("(1 + 2) => { }");
    assert!(parsed.has_errors());

    // A parenthesized list without an arrow is not a lambda
    let parsed = parse_str("(a, b)");
    assert!(parsed.has_errors());
}

#[test]
fn test_element() {
    let parsed = parse_str(r#"<Button width="80%" disabled onClick={handler}>Click me {label}</Button>"#);
    assert!(parsed.diagnostics.is_empty());
    let expected = Expression::Element(Element {
        tag: Identifier::new("Button"),
        attributes: vec![
            (
                Identifier::new("width"),
                Expression::Literal(Literal::Str("80%".to_string())),
            ),
            (
                Identifier::new("disabled"),
                Expression::Literal(Literal::Str("true".to_string())),
            ),
            (Identifier::new("onClick"), *var("handler")),
        ],
        children: vec![
            Expression::Literal(Literal::Str("Click me ".to_string())),
            *var("label"),
        ],
    });
    assert_eq!(parsed.stmts, vec![Statement::Expression(expected)]);

    let parsed = parse_str("<Row><View /><Text>hi</Text></Row>");
    assert!(parsed.diagnostics.is_empty());
    match &parsed.stmts[..] {
        [Statement::Expression(Expression::Element(row))] => {
            assert_eq!(row.children.len(), 2);
        }
        s => panic!("unexpected parse: {:?}", s),
    }
}

#[test]
fn test_non_fatal_diagnostics() {
    let parsed = parse_str("<Row>x</Column>; 1 = 2; y = 3;");
    assert!(!parsed.has_errors());
    assert_eq!(parsed.stmts.len(), 3);
    assert_eq!(
        parsed.diagnostics,
        vec![
            Diagnostic::TagMismatch {
                line: 1,
                expected: "Row".to_string(),
                found: "Column".to_string(),
            },
            Diagnostic::InvalidAssignTarget { line: 1 },
        ]
    );
    // Invalid target leaves just the lhs
    assert_eq!(parsed.stmts[1], Statement::Expression(*int(1)));
}

#[test]
fn test_error_recovery() {
    let parsed = parse_str("var = 5;\nprintln(1);");
    assert!(parsed.has_errors());
    assert_eq!(
        parsed.stmts.last(),
        Some(&Statement::Expression(Expression::Call(
            Identifier::new("println"),
            vec![*int(1)]
        )))
    );

    // An error deep inside a function body drops the whole declaration
    let parsed = parse_str("function f() { var x = ; }\nvar ok = 1;");
    assert!(parsed.has_errors());
    assert_eq!(
        parsed.stmts.last(),
        Some(&Statement::VarDecl(Identifier::new("ok"), Some(*int(1))))
    );

    match &parsed.diagnostics[0] {
        Diagnostic::Parse { line, .. } => assert_eq!(*line, 1),
        d => panic!("unexpected diagnostic: {}", d),
    }

    let parsed = parse_str("99999999999999999999999");
    assert!(parsed.has_errors());
    assert!(parsed.stmts.is_empty());
}

#[test]
fn test_text_span() {
    let tests = vec![
        ("<T>Hello, world</T>", vec!["Hello, world"]),
        ("<T>Hello ,world.</T>", vec!["Hello ,world."]),
        ("<T>\n  spread\n  over lines\n</T>", vec!["spread over lines"]),
        ("<T>Count {n}</T>", vec!["Count "]),
        ("<T>Count{n}</T>", vec!["Count"]),
        ("<T>{n} items left</T>", vec![" items left"]),
        ("<T>{n}/{m}</T>", vec!["/"]),
        ("<T>a <B>b</B> c</T>", vec!["a", "c"]),
    ];

    for (input, expected) in tests {
        let parsed = parse_str(input);
        assert!(parsed.diagnostics.is_empty(), "input: {}", input);
        let element = match &parsed.stmts[..] {
            [Statement::Expression(Expression::Element(e))] => e,
            s => panic!("unexpected parse: {:?}", s),
        };
        let texts: Vec<&str> = element
            .children
            .iter()
            .filter_map(|c| match c {
                Expression::Literal(Literal::Str(s)) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, expected, "input: {}", input);
    }
}
