//! Statement parsing
//!
//! Extends [`Parser`] with statement-level productions. Bodies of control
//! structures are normalized to statement lists: a braced block
//! contributes its statements, a single statement contributes itself.
//! (The subset is `var`-scoped, so blocks carry no binding structure of
//! their own; standalone blocks are kept as [`Stmt::Block`] only for
//! faithful stepping positions.)

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{dummy_pos, ParseError, Parser};
use std::rc::Rc;

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.peek_token().location();

        match self.peek_token() {
            Token::Var(_) => self.parse_var_statement(),
            Token::Function(_) => {
                let func = self.parse_function(true)?;
                Ok(Stmt::FunctionDecl { func, location })
            }
            Token::If(_) => self.parse_if(location),
            Token::While(_) => self.parse_while(location),
            Token::Do(_) => self.parse_do_while(location),
            Token::For(_) => self.parse_for(location),
            Token::Return(_) => {
                self.advance();
                let expr = if self.check(&Token::Semicolon(dummy_pos())) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect_semicolon()?;
                Ok(Stmt::Return { expr, location })
            }
            Token::Break(_) => {
                self.advance();
                self.expect_semicolon()?;
                Ok(Stmt::Break { location })
            }
            Token::Continue(_) => {
                self.advance();
                self.expect_semicolon()?;
                Ok(Stmt::Continue { location })
            }
            Token::Throw(_) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_semicolon()?;
                Ok(Stmt::Throw { expr, location })
            }
            Token::Try(_) => self.parse_try(location),
            Token::With(_) => {
                self.advance();
                self.expect(&Token::LParen(dummy_pos()), "'(' after 'with'")?;
                let object = self.parse_expression()?;
                self.expect(&Token::RParen(dummy_pos()), "')' after with object")?;
                let body = self.parse_body()?;
                Ok(Stmt::With {
                    object,
                    body,
                    location,
                })
            }
            Token::LBrace(_) => {
                let body = self.parse_block()?;
                Ok(Stmt::Block { body, location })
            }
            Token::Debugger(_) => {
                self.advance();
                self.expect_semicolon()?;
                Ok(Stmt::Debugger { location })
            }
            Token::Semicolon(_) => {
                self.advance();
                Ok(Stmt::Empty { location })
            }
            Token::Reserved(word, _) => {
                let word = word.clone();
                Err(self.error(format!(
                    "'{}' is a reserved word and is not supported",
                    word
                )))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect_semicolon()?;
                Ok(Stmt::ExprStmt { expr, location })
            }
        }
    }

    fn parse_var_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.peek_token().location();
        let decls = self.parse_var_declarations()?;
        self.expect_semicolon()?;
        Ok(Stmt::VarDecl { decls, location })
    }

    /// `var a = 1, b` without the trailing semicolon (shared with `for` init).
    fn parse_var_declarations(&mut self) -> Result<Vec<(String, Option<Expr>)>, ParseError> {
        self.expect(&Token::Var(dummy_pos()), "'var'")?;
        let mut decls = Vec::new();
        loop {
            let name = self.expect_ident("variable name")?;
            let init = if self.match_token(&Token::Eq(dummy_pos())) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            decls.push((name, init));
            if !self.match_token(&Token::Comma(dummy_pos())) {
                break;
            }
        }
        Ok(decls)
    }

    fn parse_if(&mut self, location: SourceLocation) -> Result<Stmt, ParseError> {
        self.advance();
        self.expect(&Token::LParen(dummy_pos()), "'(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect(&Token::RParen(dummy_pos()), "')' after if condition")?;
        let then_branch = self.parse_body()?;
        let else_branch = if self.match_token(&Token::Else(dummy_pos())) {
            Some(self.parse_body()?)
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            location,
        })
    }

    fn parse_while(&mut self, location: SourceLocation) -> Result<Stmt, ParseError> {
        self.advance();
        self.expect(&Token::LParen(dummy_pos()), "'(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect(&Token::RParen(dummy_pos()), "')' after while condition")?;
        let body = self.parse_body()?;
        Ok(Stmt::While {
            condition,
            body,
            location,
        })
    }

    fn parse_do_while(&mut self, location: SourceLocation) -> Result<Stmt, ParseError> {
        self.advance();
        let body = self.parse_body()?;
        self.expect(&Token::While(dummy_pos()), "'while' after do body")?;
        self.expect(&Token::LParen(dummy_pos()), "'(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect(&Token::RParen(dummy_pos()), "')' after do-while condition")?;
        self.expect_semicolon()?;
        Ok(Stmt::DoWhile {
            body,
            condition,
            location,
        })
    }

    fn parse_for(&mut self, location: SourceLocation) -> Result<Stmt, ParseError> {
        self.advance();
        self.expect(&Token::LParen(dummy_pos()), "'(' after 'for'")?;

        let init = if self.check(&Token::Semicolon(dummy_pos())) {
            None
        } else if self.check(&Token::Var(dummy_pos())) {
            let init_loc = self.peek_token().location();
            let decls = self.parse_var_declarations()?;
            Some(Box::new(Stmt::VarDecl {
                decls,
                location: init_loc,
            }))
        } else {
            let init_loc = self.peek_token().location();
            let expr = self.parse_expression()?;
            Some(Box::new(Stmt::ExprStmt {
                expr,
                location: init_loc,
            }))
        };
        self.expect(&Token::Semicolon(dummy_pos()), "';' after for initializer")?;

        let condition = if self.check(&Token::Semicolon(dummy_pos())) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&Token::Semicolon(dummy_pos()), "';' after for condition")?;

        let update = if self.check(&Token::RParen(dummy_pos())) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&Token::RParen(dummy_pos()), "')' after for clauses")?;

        let body = self.parse_body()?;
        Ok(Stmt::For {
            init,
            condition,
            update,
            body,
            location,
        })
    }

    fn parse_try(&mut self, location: SourceLocation) -> Result<Stmt, ParseError> {
        self.advance();
        let block = self.parse_block()?;

        let catch = if self.check(&Token::Catch(dummy_pos())) {
            let catch_loc = self.peek_token().location();
            self.advance();
            self.expect(&Token::LParen(dummy_pos()), "'(' after 'catch'")?;
            let param = self.expect_ident("catch parameter")?;
            self.expect(&Token::RParen(dummy_pos()), "')' after catch parameter")?;
            let body = self.parse_block()?;
            Some(CatchClause {
                param,
                body,
                location: catch_loc,
            })
        } else {
            None
        };

        let finally = if self.match_token(&Token::Finally(dummy_pos())) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if catch.is_none() && finally.is_none() {
            return Err(self.error("Missing catch or finally after try block"));
        }

        Ok(Stmt::Try {
            block,
            catch,
            finally,
            location,
        })
    }

    /// A braced statement list; the braces are consumed.
    pub(crate) fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&Token::LBrace(dummy_pos()), "'{'")?;
        let mut body = Vec::new();
        while !self.check(&Token::RBrace(dummy_pos())) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(&Token::RBrace(dummy_pos()), "'}'")?;
        Ok(body)
    }

    /// A control-structure body: a block's statements, or a single statement.
    fn parse_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.check(&Token::LBrace(dummy_pos())) {
            self.parse_block()
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    /// Parse a function declaration or expression starting at the
    /// `function` keyword. Records the full source span and the closing
    /// brace position.
    pub(crate) fn parse_function(
        &mut self,
        require_name: bool,
    ) -> Result<Rc<FunctionDef>, ParseError> {
        let start_tok = self.expect(&Token::Function(dummy_pos()), "'function'")?;
        let location = start_tok.location();
        let span_start = start_tok.pos().offset;

        let name = if let Token::Ident(_, _) = self.peek_token() {
            Some(self.expect_ident("function name")?)
        } else if require_name {
            return Err(self.error("Function declarations require a name"));
        } else {
            None
        };

        self.expect(&Token::LParen(dummy_pos()), "'(' after function name")?;
        let mut params = Vec::new();
        if !self.check(&Token::RParen(dummy_pos())) {
            loop {
                params.push(self.expect_ident("parameter name")?);
                if !self.match_token(&Token::Comma(dummy_pos())) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen(dummy_pos()), "')' after parameters")?;

        self.expect(&Token::LBrace(dummy_pos()), "'{' before function body")?;
        let mut body = Vec::new();
        while !self.check(&Token::RBrace(dummy_pos())) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        let close = self.expect(&Token::RBrace(dummy_pos()), "'}' after function body")?;
        let end_location = close.location();
        let span_end = close.pos().offset + 1;

        Ok(Rc::new(FunctionDef {
            name,
            params,
            body,
            span: Span {
                start: span_start,
                end: span_end,
            },
            location,
            end_location,
        }))
    }
}
