//! Expression parsing with precedence climbing
//!
//! Precedence, low to high: assignment, conditional (`?:`), `||`, `&&`,
//! equality, relational, additive, multiplicative, unary, postfix
//! update, call/member/new.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::{dummy_pos, ParseError, Parser};

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    pub(crate) fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_conditional()?;

        let op = match self.peek_token() {
            Token::Eq(_) => Some(AssignOp::Assign),
            Token::PlusEq(_) => Some(AssignOp::AddAssign),
            Token::MinusEq(_) => Some(AssignOp::SubAssign),
            Token::StarEq(_) => Some(AssignOp::MulAssign),
            Token::SlashEq(_) => Some(AssignOp::DivAssign),
            Token::PercentEq(_) => Some(AssignOp::ModAssign),
            _ => None,
        };

        if let Some(op) = op {
            let location = self.peek_token().location();
            if !matches!(expr, Expr::Ident(_, _) | Expr::Member { .. }) {
                return Err(ParseError {
                    message: "Invalid assignment target".to_string(),
                    location: expr.location(),
                });
            }
            self.advance();
            let value = self.parse_assignment()?; // right-associative
            return Ok(Expr::Assign {
                target: Box::new(expr),
                op,
                value: Box::new(value),
                location,
            });
        }

        Ok(expr)
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let condition = self.parse_logical_or()?;
        if self.check(&Token::Question(dummy_pos())) {
            let location = self.peek_token().location();
            self.advance();
            let consequent = self.parse_assignment()?;
            self.expect(&Token::Colon(dummy_pos()), "':' in conditional expression")?;
            let alternate = self.parse_assignment()?;
            return Ok(Expr::Conditional {
                condition: Box::new(condition),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
                location,
            });
        }
        Ok(condition)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.check(&Token::OrOr(dummy_pos())) {
            let location = self.peek_token().location();
            self.advance();
            let right = self.parse_logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.check(&Token::AndAnd(dummy_pos())) {
            let location = self.peek_token().location();
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek_token() {
                Token::EqEq(_) => BinOp::EqLoose,
                Token::NotEq(_) => BinOp::NeLoose,
                Token::EqEqEq(_) => BinOp::EqStrict,
                Token::NotEqEq(_) => BinOp::NeStrict,
                _ => break,
            };
            let location = self.peek_token().location();
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_token() {
                Token::Lt(_) => BinOp::Lt,
                Token::Le(_) => BinOp::Le,
                Token::Gt(_) => BinOp::Gt,
                Token::Ge(_) => BinOp::Ge,
                _ => break,
            };
            let location = self.peek_token().location();
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_token() {
                Token::Plus(_) => BinOp::Add,
                Token::Minus(_) => BinOp::Sub,
                _ => break,
            };
            let location = self.peek_token().location();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_token() {
                Token::Star(_) => BinOp::Mul,
                Token::Slash(_) => BinOp::Div,
                Token::Percent(_) => BinOp::Mod,
                _ => break,
            };
            let location = self.peek_token().location();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let location = self.peek_token().location();
        let op = match self.peek_token() {
            Token::Minus(_) => Some(UnOp::Neg),
            Token::Plus(_) => Some(UnOp::Plus),
            Token::Bang(_) => Some(UnOp::Not),
            Token::TypeOf(_) => Some(UnOp::TypeOf),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                location,
            });
        }

        if self.check(&Token::PlusPlus(dummy_pos())) || self.check(&Token::MinusMinus(dummy_pos()))
        {
            let increment = matches!(self.peek_token(), Token::PlusPlus(_));
            self.advance();
            let target = self.parse_unary()?;
            self.check_update_target(&target)?;
            return Ok(Expr::Update {
                increment,
                prefix: true,
                target: Box::new(target),
                location,
            });
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_call_member()?;
        if self.check(&Token::PlusPlus(dummy_pos())) || self.check(&Token::MinusMinus(dummy_pos()))
        {
            let location = self.peek_token().location();
            let increment = matches!(self.peek_token(), Token::PlusPlus(_));
            self.advance();
            self.check_update_target(&expr)?;
            return Ok(Expr::Update {
                increment,
                prefix: false,
                target: Box::new(expr),
                location,
            });
        }
        Ok(expr)
    }

    fn check_update_target(&self, target: &Expr) -> Result<(), ParseError> {
        if matches!(target, Expr::Ident(_, _) | Expr::Member { .. }) {
            Ok(())
        } else {
            Err(ParseError {
                message: "Invalid increment/decrement target".to_string(),
                location: target.location(),
            })
        }
    }

    /// Calls, member access, and `new`, all left-associative over a
    /// primary expression.
    fn parse_call_member(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::New(dummy_pos())) {
            let location = self.peek_token().location();
            self.advance();
            // `new` binds to the member chain of its callee; the argument
            // list belongs to the `new` expression itself.
            let mut callee = self.parse_primary()?;
            loop {
                match self.peek_token() {
                    Token::Dot(_) => {
                        let loc = self.peek_token().location();
                        self.advance();
                        let name = self.expect_ident("property name after '.'")?;
                        callee = Expr::Member {
                            object: Box::new(callee),
                            key: MemberKey::Static(name),
                            location: loc,
                        };
                    }
                    Token::LBracket(_) => {
                        let loc = self.peek_token().location();
                        self.advance();
                        let index = self.parse_expression()?;
                        self.expect(&Token::RBracket(dummy_pos()), "']' after index")?;
                        callee = Expr::Member {
                            object: Box::new(callee),
                            key: MemberKey::Computed(Box::new(index)),
                            location: loc,
                        };
                    }
                    _ => break,
                }
            }
            let args = if self.check(&Token::LParen(dummy_pos())) {
                self.parse_arguments()?
            } else {
                Vec::new()
            };
            let new_expr = Expr::New {
                callee: Box::new(callee),
                args,
                location,
            };
            return self.parse_call_member_tail(new_expr);
        }

        let primary = self.parse_primary()?;
        self.parse_call_member_tail(primary)
    }

    fn parse_call_member_tail(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        loop {
            match self.peek_token() {
                Token::LParen(_) => {
                    let location = self.peek_token().location();
                    let args = self.parse_arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        location,
                    };
                }
                Token::Dot(_) => {
                    let location = self.peek_token().location();
                    self.advance();
                    let name = self.expect_ident("property name after '.'")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        key: MemberKey::Static(name),
                        location,
                    };
                }
                Token::LBracket(_) => {
                    let location = self.peek_token().location();
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(&Token::RBracket(dummy_pos()), "']' after index")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        key: MemberKey::Computed(Box::new(index)),
                        location,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(&Token::LParen(dummy_pos()), "'('")?;
        let mut args = Vec::new();
        if !self.check(&Token::RParen(dummy_pos())) {
            loop {
                args.push(self.parse_assignment()?);
                if !self.match_token(&Token::Comma(dummy_pos())) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen(dummy_pos()), "')' after arguments")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let location = self.peek_token().location();

        match self.peek_token().clone() {
            Token::Number(n, _) => {
                self.advance();
                Ok(Expr::Number(n, location))
            }
            Token::Str(s, _) => {
                self.advance();
                Ok(Expr::Str(s, location))
            }
            Token::True(_) => {
                self.advance();
                Ok(Expr::Bool(true, location))
            }
            Token::False(_) => {
                self.advance();
                Ok(Expr::Bool(false, location))
            }
            Token::Null(_) => {
                self.advance();
                Ok(Expr::Null(location))
            }
            Token::This(_) => {
                self.advance();
                Ok(Expr::This(location))
            }
            Token::Ident(name, _) => {
                self.advance();
                Ok(Expr::Ident(name, location))
            }
            Token::Function(_) => {
                let func = self.parse_function(false)?;
                Ok(Expr::Function(func, location))
            }
            Token::LParen(_) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&Token::RParen(dummy_pos()), "')' after expression")?;
                Ok(expr)
            }
            Token::LBracket(_) => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&Token::RBracket(dummy_pos())) {
                    loop {
                        elements.push(self.parse_assignment()?);
                        if !self.match_token(&Token::Comma(dummy_pos())) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RBracket(dummy_pos()), "']' after array elements")?;
                Ok(Expr::Array(elements, location))
            }
            Token::LBrace(_) => {
                self.advance();
                let mut props = Vec::new();
                if !self.check(&Token::RBrace(dummy_pos())) {
                    loop {
                        let key = self.parse_property_key()?;
                        self.expect(&Token::Colon(dummy_pos()), "':' after property key")?;
                        let value = self.parse_assignment()?;
                        props.push((key, value));
                        if !self.match_token(&Token::Comma(dummy_pos())) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RBrace(dummy_pos()), "'}' after object literal")?;
                Ok(Expr::ObjectLit(props, location))
            }
            Token::Reserved(word, _) => Err(self.error(format!(
                "'{}' is a reserved word and is not supported",
                word
            ))),
            other => Err(self.error(format!("Unexpected {}", other))),
        }
    }

    fn parse_property_key(&mut self) -> Result<String, ParseError> {
        match self.peek_token().clone() {
            Token::Ident(name, _) => {
                self.advance();
                Ok(name)
            }
            Token::Str(s, _) => {
                self.advance();
                Ok(s)
            }
            Token::Number(n, _) => {
                self.advance();
                Ok(crate::memory::value::number_to_string(n))
            }
            other => Err(self.error(format!("Invalid property key: {}", other))),
        }
    }
}
