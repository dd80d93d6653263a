//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing
//! infrastructure: the error type, token-stream helpers, and the program
//! entry point.
//!
//! # Parser Architecture
//!
//! Recursive descent with precedence climbing, split across files using
//! `impl Parser` blocks:
//! - This module: Parser struct, helper methods, `parse_program`
//! - `statements`: statement parsing (if, while, try, function, ...)
//! - `expressions`: expression parsing with precedence climbing
//!
//! Automatic semicolon insertion is deliberately not implemented; the
//! supported subset requires explicit semicolons and reports a parse error
//! otherwise.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token};

/// Parser error type
#[derive(Debug, Clone, thiserror::Error)]
#[error("SyntaxError at line {}, column {}: {message}", .location.line, .location.column)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for the JavaScript subset
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse the entire program (a statement list)
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        while !self.is_at_end() {
            program.body.push(self.parse_statement()?);
        }

        Ok(program)
    }

    // ===== Helper methods =====

    pub(crate) fn peek_token(&self) -> &Token {
        self.tokens
            .get(self.position)
            .unwrap_or_else(|| self.tokens.last().expect("token stream has Eof"))
    }

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if std::mem::discriminant(self.peek_token()) == std::mem::discriminant(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek_token()) == std::mem::discriminant(token)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek_token(), Token::Eof(_))
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            location: self.peek_token().location(),
        }
    }

    /// Consume a token of the given kind or report what was found instead.
    pub(crate) fn expect(&mut self, token: &Token, what: &str) -> Result<Token, ParseError> {
        if self.check(token) {
            Ok(self.advance().clone())
        } else {
            Err(self.error(format!("Expected {}, found {}", what, self.peek_token())))
        }
    }

    pub(crate) fn expect_semicolon(&mut self) -> Result<(), ParseError> {
        if self.match_token(&Token::Semicolon(dummy_pos())) {
            Ok(())
        } else {
            Err(self.error(format!(
                "Expected ';', found {} (automatic semicolon insertion is not supported)",
                self.peek_token()
            )))
        }
    }

    pub(crate) fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek_token() {
            Token::Ident(name, _) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            Token::Reserved(word, _) => Err(self.error(format!(
                "'{}' is a reserved word and is not supported",
                word
            ))),
            other => Err(self.error(format!("Expected {}, found {}", what, other))),
        }
    }
}

/// Placeholder position for discriminant-only token comparisons.
pub(crate) fn dummy_pos() -> crate::parser::lexer::Pos {
    crate::parser::lexer::Pos {
        line: 0,
        column: 0,
        offset: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::new(source)
            .expect("lexing failed")
            .parse_program()
            .expect("parsing failed")
    }

    fn parse_err(source: &str) -> ParseError {
        match Parser::new(source).and_then(|mut p| p.parse_program()) {
            Ok(_) => panic!("expected parse error for {:?}", source),
            Err(e) => e,
        }
    }

    #[test]
    fn parses_var_declarations() {
        let program = parse("var x = 1, y;");
        assert_eq!(program.body.len(), 1);
        match &program.body[0] {
            Stmt::VarDecl { decls, .. } => {
                assert_eq!(decls.len(), 2);
                assert_eq!(decls[0].0, "x");
                assert!(decls[0].1.is_some());
                assert_eq!(decls[1].0, "y");
                assert!(decls[1].1.is_none());
            }
            other => panic!("expected VarDecl, got {:?}", other),
        }
    }

    #[test]
    fn parses_function_declaration_with_span() {
        let source = "function add(a, b) { return a + b; }";
        let program = parse(source);
        match &program.body[0] {
            Stmt::FunctionDecl { func, .. } => {
                assert_eq!(func.name.as_deref(), Some("add"));
                assert_eq!(func.params, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(&source[func.span.start..func.span.end], source);
            }
            other => panic!("expected FunctionDecl, got {:?}", other),
        }
    }

    #[test]
    fn parses_new_expression() {
        let program = parse("var o = new C(1);");
        match &program.body[0] {
            Stmt::VarDecl { decls, .. } => match decls[0].1.as_ref().unwrap() {
                Expr::New { args, .. } => assert_eq!(args.len(), 1),
                other => panic!("expected New, got {:?}", other),
            },
            other => panic!("expected VarDecl, got {:?}", other),
        }
    }

    #[test]
    fn parses_member_chains() {
        let program = parse("a.b[0].c = 1;");
        match &program.body[0] {
            Stmt::ExprStmt { expr, .. } => {
                assert!(matches!(expr, Expr::Assign { .. }));
            }
            other => panic!("expected ExprStmt, got {:?}", other),
        }
    }

    #[test]
    fn parses_try_catch_finally() {
        let program = parse("try { f(); } catch (e) { g(e); } finally { h(); }");
        match &program.body[0] {
            Stmt::Try { catch, finally, .. } => {
                assert_eq!(catch.as_ref().unwrap().param, "e");
                assert!(finally.is_some());
            }
            other => panic!("expected Try, got {:?}", other),
        }
    }

    #[test]
    fn rejects_reserved_words() {
        let err = parse_err("let x = 1;");
        assert!(err.message.contains("reserved word"), "{}", err.message);
    }

    #[test]
    fn rejects_missing_semicolon() {
        let err = parse_err("var x = 1");
        assert!(err.message.contains("';'"), "{}", err.message);
    }

    #[test]
    fn reports_error_position() {
        let err = parse_err("var x = (;");
        assert_eq!(err.location.line, 1);
        assert_eq!(err.location.column, 10);
    }

    #[test]
    fn parses_anonymous_function_expression() {
        let program = parse("var f = function (x) { return x; };");
        match &program.body[0] {
            Stmt::VarDecl { decls, .. } => match decls[0].1.as_ref().unwrap() {
                Expr::Function(func, _) => assert!(func.name.is_none()),
                other => panic!("expected Function, got {:?}", other),
            },
            other => panic!("expected VarDecl, got {:?}", other),
        }
    }
}
