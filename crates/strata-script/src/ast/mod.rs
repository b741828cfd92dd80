// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) definitions for module bodies.
//!
//! Node names follow ESTree where the shapes line up.

use std::sync::Arc;

/// A complete module body.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The statements in the program
    pub body: Vec<Statement>,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration (var, let, const)
    VariableDeclaration(VariableDeclaration),
    /// Function declaration
    FunctionDeclaration(Arc<FunctionDefinition>),
    /// Expression statement
    Expression(Expression),
    /// Block statement { ... }
    Block(Vec<Statement>),
    /// If statement
    If(IfStatement),
    /// While statement
    While(WhileStatement),
    /// Return statement
    Return(Option<Expression>),
    /// Throw statement
    Throw(Expression),
    /// Empty statement (;)
    Empty,
}

/// Variable declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// var declaration
    Var,
    /// let declaration
    Let,
    /// const declaration
    Const,
}

/// A variable declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    /// The kind of declaration
    pub kind: VariableKind,
    /// The declarators
    pub declarations: Vec<VariableDeclarator>,
}

/// A single variable declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// The identifier being declared
    pub id: Identifier,
    /// Optional initializer expression
    pub init: Option<Expression>,
}

/// A function declaration or expression.
///
/// Shared behind an `Arc` so closures created at runtime can hold on to
/// their definition without cloning the body.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    /// The function name, if any
    pub id: Option<Identifier>,
    /// The parameters
    pub params: Vec<Identifier>,
    /// The function body
    pub body: Vec<Statement>,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition
    pub test: Expression,
    /// The consequent
    pub consequent: Box<Statement>,
    /// The alternate (else branch)
    pub alternate: Option<Box<Statement>>,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// The condition
    pub test: Expression,
    /// The loop body
    pub body: Box<Statement>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Identifier reference
    Identifier(Identifier),
    /// Array literal
    Array(Vec<Expression>),
    /// Object literal
    Object(Vec<Property>),
    /// Function expression
    Function(Arc<FunctionDefinition>),
    /// Unary operation
    Unary(UnaryExpression),
    /// Binary operation
    Binary(BinaryExpression),
    /// Short-circuiting logical operation
    Logical(LogicalExpression),
    /// Assignment
    Assignment(AssignmentExpression),
    /// Conditional (ternary) expression
    Conditional(ConditionalExpression),
    /// Function call
    Call(CallExpression),
    /// Member access
    Member(MemberExpression),
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// null
    Null,
    /// Boolean
    Boolean(bool),
    /// Number
    Number(f64),
    /// String
    String(String),
}

/// An object literal property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// The property key
    pub key: String,
    /// The property value
    pub value: Expression,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    LogicalNot,
    /// typeof
    Typeof,
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// +
    Add,
    /// -
    Subtract,
    /// *
    Multiply,
    /// /
    Divide,
    /// %
    Modulo,
    /// ==
    Equal,
    /// !=
    NotEqual,
    /// ===
    StrictEqual,
    /// !==
    StrictNotEqual,
    /// <
    LessThan,
    /// <=
    LessThanEqual,
    /// >
    GreaterThan,
    /// >=
    GreaterThanEqual,
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand
    pub right: Box<Expression>,
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// &&
    And,
    /// ||
    Or,
}

/// A logical expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    /// The operator
    pub operator: LogicalOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand
    pub right: Box<Expression>,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    /// =
    Assign,
    /// +=
    AddAssign,
    /// -=
    SubtractAssign,
    /// *=
    MultiplyAssign,
}

impl AssignmentOperator {
    /// The binary operator a compound assignment applies, if any.
    pub fn binary_operator(self) -> Option<BinaryOperator> {
        match self {
            AssignmentOperator::Assign => None,
            AssignmentOperator::AddAssign => Some(BinaryOperator::Add),
            AssignmentOperator::SubtractAssign => Some(BinaryOperator::Subtract),
            AssignmentOperator::MultiplyAssign => Some(BinaryOperator::Multiply),
        }
    }
}

/// Assignment targets.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentTarget {
    /// A variable binding
    Identifier(Identifier),
    /// An object property
    Member(MemberExpression),
}

/// An assignment expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    /// The operator
    pub operator: AssignmentOperator,
    /// The target
    pub target: AssignmentTarget,
    /// The assigned value
    pub value: Box<Expression>,
}

/// A conditional expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    /// The test
    pub test: Box<Expression>,
    /// Value when the test is truthy
    pub consequent: Box<Expression>,
    /// Value when the test is falsy
    pub alternate: Box<Expression>,
}

/// A call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The callee
    pub callee: Box<Expression>,
    /// The arguments
    pub arguments: Vec<Expression>,
}

/// A member expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    /// The object
    pub object: Box<Expression>,
    /// The property
    pub property: MemberProperty,
}

/// Member property (static name or computed expression).
#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    /// Static: obj.prop
    Identifier(Identifier),
    /// Computed: obj[expr]
    Expression(Box<Expression>),
}
