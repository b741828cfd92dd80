// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The main parser implementation.

use std::sync::Arc;

use crate::Error;
use crate::ast::*;
use crate::lexer::{Scanner, Span, Token, TokenKind};

/// Deepest statement and expression nesting the parser accepts.
///
/// Binary operator and member chains count one level per link, since they
/// build trees as deep as they are long.
pub const MAX_NESTING_DEPTH: usize = 128;

/// A recursive descent parser for module bodies.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token,
    previous: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            scanner,
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0), false),
            depth: 0,
        }
    }

    /// Parses the source code into a Program AST node.
    pub fn parse_program(&mut self) -> Result<Program, Error> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(Program { body })
    }

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement, Error> {
        self.nested(Self::parse_statement_kind)
    }

    fn parse_statement_kind(&mut self) -> Result<Statement, Error> {
        match &self.current.kind {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => self.parse_variable_declaration(),
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::LeftBrace => self.parse_block_statement(),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty)
            }
            TokenKind::Reserved(word) => Err(self.error(format!("Unsupported syntax '{}'", word))),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_variable_declaration(&mut self) -> Result<Statement, Error> {
        let kind = match &self.current.kind {
            TokenKind::Var => VariableKind::Var,
            TokenKind::Let => VariableKind::Let,
            _ => VariableKind::Const,
        };
        self.advance();

        let mut declarations = Vec::new();

        loop {
            let id = self.expect_identifier()?;
            let init = if self.check(&TokenKind::Equal) {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };

            if init.is_none() && kind == VariableKind::Const {
                return Err(self.error(format!("Missing initializer in const '{}'", id.name)));
            }

            declarations.push(VariableDeclarator { id, init });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        self.consume_semicolon()?;

        Ok(Statement::VariableDeclaration(VariableDeclaration {
            kind,
            declarations,
        }))
    }

    fn parse_function_declaration(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'function'
        let id = self.expect_identifier()?;
        let definition = self.parse_function_rest(Some(id))?;
        Ok(Statement::FunctionDeclaration(definition))
    }

    /// Parses `(params) { body }` after the function keyword and optional name.
    fn parse_function_rest(&mut self, id: Option<Identifier>) -> Result<Arc<FunctionDefinition>, Error> {
        self.expect(&TokenKind::LeftParen)?;
        let params = self.parse_parameters()?;
        self.expect(&TokenKind::RightParen)?;

        self.expect(&TokenKind::LeftBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RightBrace)?;

        Ok(Arc::new(FunctionDefinition { id, params, body }))
    }

    fn parse_parameters(&mut self) -> Result<Vec<Identifier>, Error> {
        let mut params = Vec::new();

        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        Ok(params)
    }

    fn parse_if_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'if'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement { test, body }))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'return'
        let argument = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
            || self.is_at_end()
            || self.current.newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;

        Ok(Statement::Return(argument))
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'throw'
        if self.current.newline_before {
            return Err(self.error("Illegal newline after throw".to_string()));
        }
        let argument = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::Throw(argument))
    }

    fn parse_block_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume '{'
        let mut body = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        self.expect(&TokenKind::RightBrace)?;

        Ok(Statement::Block(body))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, Error> {
        let expression = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::Expression(expression))
    }

    /// Parses an expression.
    pub fn parse_expression(&mut self) -> Result<Expression, Error> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression, Error> {
        self.nested(Self::parse_assignment_rest)
    }

    fn parse_assignment_rest(&mut self) -> Result<Expression, Error> {
        let start = self.current.span.start;
        let expr = self.parse_conditional()?;

        let operator = match &self.current.kind {
            TokenKind::Equal => AssignmentOperator::Assign,
            TokenKind::PlusEqual => AssignmentOperator::AddAssign,
            TokenKind::MinusEqual => AssignmentOperator::SubtractAssign,
            TokenKind::StarEqual => AssignmentOperator::MultiplyAssign,
            _ => return Ok(expr),
        };

        let target = match expr {
            Expression::Identifier(id) => AssignmentTarget::Identifier(id),
            Expression::Member(member) => AssignmentTarget::Member(member),
            _ => {
                return Err(Error::syntax("Invalid left-hand side in assignment", start));
            }
        };

        self.advance();
        let value = self.parse_assignment()?;

        Ok(Expression::Assignment(AssignmentExpression {
            operator,
            target,
            value: Box::new(value),
        }))
    }

    /// Parse conditional (ternary) expression: test ? consequent : alternate
    fn parse_conditional(&mut self) -> Result<Expression, Error> {
        let test = self.parse_logical_or()?;

        if self.check(&TokenKind::Question) {
            self.advance(); // consume '?'
            let consequent = self.parse_assignment()?;
            self.expect(&TokenKind::Colon)?;
            let alternate = self.parse_assignment()?;

            return Ok(Expression::Conditional(ConditionalExpression {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            }));
        }

        Ok(test)
    }

    fn parse_logical_or(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_logical_and()?;
        let outer = self.depth;

        while self.check(&TokenKind::PipePipe) {
            self.advance();
            self.deepen()?;
            let right = self.parse_logical_and()?;
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        self.depth = outer;
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_equality()?;
        let outer = self.depth;

        while self.check(&TokenKind::AmpersandAmpersand) {
            self.advance();
            self.deepen()?;
            let right = self.parse_equality()?;
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::And,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        self.depth = outer;
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_comparison()?;
        let outer = self.depth;

        loop {
            let operator = match &self.current.kind {
                TokenKind::EqualEqual => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                TokenKind::StrictEqual => BinaryOperator::StrictEqual,
                TokenKind::StrictNotEqual => BinaryOperator::StrictNotEqual,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_comparison()?;
            left = binary(operator, left, right);
        }

        self.depth = outer;
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_additive()?;
        let outer = self.depth;

        loop {
            let operator = match &self.current.kind {
                TokenKind::LessThan => BinaryOperator::LessThan,
                TokenKind::LessThanEqual => BinaryOperator::LessThanEqual,
                TokenKind::GreaterThan => BinaryOperator::GreaterThan,
                TokenKind::GreaterThanEqual => BinaryOperator::GreaterThanEqual,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_additive()?;
            left = binary(operator, left, right);
        }

        self.depth = outer;
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_multiplicative()?;
        let outer = self.depth;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_multiplicative()?;
            left = binary(operator, left, right);
        }

        self.depth = outer;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_unary()?;
        let outer = self.depth;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_unary()?;
            left = binary(operator, left, right);
        }

        self.depth = outer;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        let operator = match &self.current.kind {
            TokenKind::Bang => UnaryOperator::LogicalNot,
            TokenKind::Minus => UnaryOperator::Minus,
            TokenKind::Plus => UnaryOperator::Plus,
            TokenKind::Typeof => UnaryOperator::Typeof,
            _ => return self.parse_call(),
        };

        self.advance();
        let argument = self.nested(Self::parse_unary)?;
        Ok(Expression::Unary(UnaryExpression {
            operator,
            argument: Box::new(argument),
        }))
    }

    fn parse_call(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_primary()?;
        let outer = self.depth;

        loop {
            if self.check(&TokenKind::LeftParen) {
                self.advance();
                self.deepen()?;
                let arguments = self.parse_arguments()?;
                self.expect(&TokenKind::RightParen)?;
                expr = Expression::Call(CallExpression {
                    callee: Box::new(expr),
                    arguments,
                });
            } else if self.check(&TokenKind::Dot) {
                self.advance();
                self.deepen()?;
                let name = self.expect_property_name()?;
                expr = Expression::Member(MemberExpression {
                    object: Box::new(expr),
                    property: MemberProperty::Identifier(Identifier { name }),
                });
            } else if self.check(&TokenKind::LeftBracket) {
                self.advance();
                self.deepen()?;
                let property = self.parse_expression()?;
                self.expect(&TokenKind::RightBracket)?;
                expr = Expression::Member(MemberExpression {
                    object: Box::new(expr),
                    property: MemberProperty::Expression(Box::new(property)),
                });
            } else {
                break;
            }
        }

        self.depth = outer;
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, Error> {
        let mut args = Vec::new();

        while !self.check(&TokenKind::RightParen) && !self.is_at_end() {
            args.push(self.parse_expression()?);
            if !self.check(&TokenKind::RightParen) {
                self.expect(&TokenKind::Comma)?;
            }
        }

        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        match &self.current.kind {
            TokenKind::Number(n) => {
                let value = *n;
                self.advance();
                Ok(Expression::Literal(Literal::Number(value)))
            }
            TokenKind::String(s) => {
                let value = s.clone();
                self.advance();
                Ok(Expression::Literal(Literal::String(value)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Literal(Literal::Null))
            }
            TokenKind::Identifier(name) => {
                let id = Identifier { name: name.clone() };
                self.advance();
                Ok(Expression::Identifier(id))
            }
            TokenKind::Function => {
                self.advance();
                let id = match &self.current.kind {
                    TokenKind::Identifier(_) => Some(self.expect_identifier()?),
                    _ => None,
                };
                Ok(Expression::Function(self.parse_function_rest(id)?))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::LeftBrace => self.parse_object_literal(),
            TokenKind::Reserved(word) => Err(self.error(format!("Unsupported syntax '{}'", word))),
            other => Err(self.error(format!("Unexpected token: {}", other.describe()))),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume '['
        let mut elements = Vec::new();

        while !self.check(&TokenKind::RightBracket) && !self.is_at_end() {
            elements.push(self.parse_expression()?);
            if !self.check(&TokenKind::RightBracket) {
                self.expect(&TokenKind::Comma)?;
            }
        }

        self.expect(&TokenKind::RightBracket)?;

        Ok(Expression::Array(elements))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume '{'
        let mut properties = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            let shorthand = matches!(self.current.kind, TokenKind::Identifier(_));
            let key = self.expect_property_name()?;

            let value = if shorthand
                && (self.check(&TokenKind::Comma) || self.check(&TokenKind::RightBrace))
            {
                Expression::Identifier(Identifier { name: key.clone() })
            } else {
                self.expect(&TokenKind::Colon)?;
                self.parse_expression()?
            };

            properties.push(Property { key, value });

            if !self.check(&TokenKind::RightBrace) {
                self.expect(&TokenKind::Comma)?;
            }
        }

        self.expect(&TokenKind::RightBrace)?;

        Ok(Expression::Object(properties))
    }

    // Helper methods

    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.scanner.next_token());
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), Error> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "Expected {:?}, found {}",
                kind,
                self.current.kind.describe()
            )))
        }
    }

    fn expect_identifier(&mut self) -> Result<Identifier, Error> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let id = Identifier { name: name.clone() };
            self.advance();
            Ok(id)
        } else {
            Err(self.error(format!(
                "Expected identifier, found {}",
                self.current.kind.describe()
            )))
        }
    }

    /// Property names may be any identifier-like word, including keywords,
    /// as well as string and number literals in object keys.
    fn expect_property_name(&mut self) -> Result<String, Error> {
        let name = match &self.current.kind {
            TokenKind::Identifier(name) | TokenKind::Reserved(name) | TokenKind::String(name) => {
                name.clone()
            }
            TokenKind::Number(n) => crate::runtime::value::number_to_string(*n),
            other => match keyword_text(other) {
                Some(text) => text.to_string(),
                None => {
                    return Err(self.error(format!(
                        "Expected property name, found {}",
                        other.describe()
                    )));
                }
            },
        };
        self.advance();
        Ok(name)
    }

    /// Automatic semicolon insertion: a statement may end at `;`, before `}`,
    /// at end of input, or where the next token starts on a new line.
    fn consume_semicolon(&mut self) -> Result<(), Error> {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            return Ok(());
        }
        if self.check(&TokenKind::RightBrace) || self.is_at_end() || self.current.newline_before {
            return Ok(());
        }
        Err(self.error(format!(
            "Expected Semicolon, found {}",
            self.current.kind.describe()
        )))
    }

    /// Enters one more nesting level, failing past [`MAX_NESTING_DEPTH`].
    fn deepen(&mut self) -> Result<(), Error> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error("Nesting is too deep".to_string()));
        }
        Ok(())
    }

    /// Runs `parse` one nesting level down.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        self.deepen()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn error(&self, message: String) -> Error {
        Error::syntax(message, self.current.span.start)
    }
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn keyword_text(kind: &TokenKind) -> Option<&'static str> {
    Some(match kind {
        TokenKind::Var => "var",
        TokenKind::Let => "let",
        TokenKind::Const => "const",
        TokenKind::Function => "function",
        TokenKind::Return => "return",
        TokenKind::If => "if",
        TokenKind::Else => "else",
        TokenKind::While => "while",
        TokenKind::Throw => "throw",
        TokenKind::Typeof => "typeof",
        TokenKind::True => "true",
        TokenKind::False => "false",
        TokenKind::Null => "null",
        _ => return None,
    })
}
