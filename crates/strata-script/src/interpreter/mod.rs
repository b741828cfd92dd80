// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tree-walking evaluation of parsed module bodies.
//!
//! Scoping follows the usual rules: `var` and function declarations are
//! hoisted to the enclosing function (or module body), `let` and `const`
//! bind in the enclosing block, and closures capture their defining
//! environment by reference.

pub mod operators;

use std::cell::Cell;
use std::sync::Arc;

use crate::Error;
use crate::ast::*;
use crate::runtime::{Callable, Environment, ScriptFunction, Value};

/// Nested frames allowed on one thread before evaluation gives up.
///
/// Script function calls and program runs share this budget, so module
/// bodies that run each other through host functions are counted too.
pub const MAX_CALL_DEPTH: usize = 48;

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// One slot of the per-thread frame budget, released on drop.
struct Frame;

impl Frame {
    fn enter() -> Result<Self, Error> {
        CALL_DEPTH.with(|depth| {
            if depth.get() >= MAX_CALL_DEPTH {
                return Err(Error::Range(
                    "Maximum call stack size exceeded".to_string(),
                ));
            }
            depth.set(depth.get() + 1);
            Ok(Frame)
        })
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Frames currently held on this thread.
pub fn call_depth() -> usize {
    CALL_DEPTH.with(Cell::get)
}

/// How a statement finished.
enum Completion {
    Normal,
    Return(Value),
}

/// Evaluation state for one module body or host-initiated call.
#[derive(Debug, Default)]
pub struct Interpreter;

impl Interpreter {
    /// Creates a new interpreter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a program in `env`, which acts as its function scope.
    ///
    /// A top-level `return` ends the program early and yields its value.
    pub fn run_program(&mut self, program: &Program, env: &Environment) -> Result<Value, Error> {
        let _frame = Frame::enter()?;
        hoist_vars(&program.body, env);
        match self.execute_block(&program.body, env)? {
            Completion::Return(value) => Ok(value),
            Completion::Normal => Ok(Value::Undefined),
        }
    }

    /// Calls a function value with an explicit receiver.
    pub fn call(&mut self, callee: &Value, this: &Value, args: &[Value]) -> Result<Value, Error> {
        let Value::Function(callable) = callee else {
            return Err(Error::Type(format!(
                "{} is not a function",
                callee.to_js_string()
            )));
        };

        match callable.as_ref() {
            Callable::Native { func, .. } => func(this, args),
            Callable::Script(function) => {
                let _frame = Frame::enter()?;
                let env = function.closure.child();
                for (index, param) in function.definition.params.iter().enumerate() {
                    let arg = args.get(index).cloned().unwrap_or_default();
                    env.declare(&param.name, arg, true);
                }
                hoist_vars(&function.definition.body, &env);

                match self.execute_block(&function.definition.body, &env)? {
                    Completion::Return(value) => Ok(value),
                    Completion::Normal => Ok(Value::Undefined),
                }
            }
        }
    }

    /// Executes a statement list, hoisting its function declarations first.
    fn execute_block(&mut self, body: &[Statement], env: &Environment) -> Result<Completion, Error> {
        for statement in body {
            if let Statement::FunctionDeclaration(definition) = statement {
                let function = make_function(definition, env);
                if let Some(id) = &definition.id {
                    env.declare(&id.name, function, true);
                }
            }
        }

        for statement in body {
            if let Completion::Return(value) = self.execute_statement(statement, env)? {
                return Ok(Completion::Return(value));
            }
        }

        Ok(Completion::Normal)
    }

    fn execute_statement(&mut self, statement: &Statement, env: &Environment) -> Result<Completion, Error> {
        match statement {
            Statement::VariableDeclaration(declaration) => {
                for declarator in &declaration.declarations {
                    let value = match &declarator.init {
                        Some(init) => self.evaluate(init, env)?,
                        None => Value::Undefined,
                    };
                    match declaration.kind {
                        VariableKind::Var => {
                            if declarator.init.is_some() {
                                env.assign(&declarator.id.name, value)?;
                            }
                        }
                        VariableKind::Let => env.declare(&declarator.id.name, value, true),
                        VariableKind::Const => env.declare(&declarator.id.name, value, false),
                    }
                }
                Ok(Completion::Normal)
            }
            // Bound when the enclosing block was entered
            Statement::FunctionDeclaration(_) => Ok(Completion::Normal),
            Statement::Expression(expression) => {
                self.evaluate(expression, env)?;
                Ok(Completion::Normal)
            }
            Statement::Block(body) => self.execute_block(body, &env.child()),
            Statement::If(statement) => {
                if self.evaluate(&statement.test, env)?.to_boolean() {
                    self.execute_statement(&statement.consequent, env)
                } else if let Some(alternate) = &statement.alternate {
                    self.execute_statement(alternate, env)
                } else {
                    Ok(Completion::Normal)
                }
            }
            Statement::While(statement) => {
                while self.evaluate(&statement.test, env)?.to_boolean() {
                    if let Completion::Return(value) = self.execute_statement(&statement.body, env)? {
                        return Ok(Completion::Return(value));
                    }
                }
                Ok(Completion::Normal)
            }
            Statement::Return(argument) => {
                let value = match argument {
                    Some(expression) => self.evaluate(expression, env)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Statement::Throw(argument) => Err(Error::Thrown(self.evaluate(argument, env)?)),
            Statement::Empty => Ok(Completion::Normal),
        }
    }

    /// Evaluates an expression to a value.
    pub fn evaluate(&mut self, expression: &Expression, env: &Environment) -> Result<Value, Error> {
        match expression {
            Expression::Literal(literal) => Ok(match literal {
                Literal::Null => Value::Null,
                Literal::Boolean(b) => Value::Boolean(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
            }),
            Expression::Identifier(id) => lookup(&id.name, env),
            Expression::Array(elements) => {
                let values = elements
                    .iter()
                    .map(|element| self.evaluate(element, env))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::new_array(values))
            }
            Expression::Object(properties) => {
                let object = Value::new_object();
                for property in properties {
                    let value = self.evaluate(&property.value, env)?;
                    object.set_property(&property.key, value)?;
                }
                Ok(object)
            }
            Expression::Function(definition) => Ok(match &definition.id {
                // A named function expression can refer to itself by name
                Some(id) => {
                    let scope = env.child();
                    let function = make_function(definition, &scope);
                    scope.declare(&id.name, function.clone(), false);
                    function
                }
                None => make_function(definition, env),
            }),
            Expression::Unary(unary) => {
                // typeof tolerates undeclared names
                if unary.operator == UnaryOperator::Typeof
                    && let Expression::Identifier(id) = unary.argument.as_ref()
                    && let Err(Error::Reference(_)) = lookup(&id.name, env)
                {
                    return Ok(Value::String("undefined".to_string()));
                }
                let argument = self.evaluate(&unary.argument, env)?;
                Ok(operators::unary(unary.operator, &argument))
            }
            Expression::Binary(binary) => {
                let left = self.evaluate(&binary.left, env)?;
                let right = self.evaluate(&binary.right, env)?;
                Ok(operators::binary(binary.operator, &left, &right))
            }
            Expression::Logical(logical) => {
                let left = self.evaluate(&logical.left, env)?;
                let short_circuit = match logical.operator {
                    LogicalOperator::And => !left.to_boolean(),
                    LogicalOperator::Or => left.to_boolean(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(&logical.right, env)
                }
            }
            Expression::Conditional(conditional) => {
                if self.evaluate(&conditional.test, env)?.to_boolean() {
                    self.evaluate(&conditional.consequent, env)
                } else {
                    self.evaluate(&conditional.alternate, env)
                }
            }
            Expression::Assignment(assignment) => self.evaluate_assignment(assignment, env),
            Expression::Call(call) => self.evaluate_call(call, env),
            Expression::Member(member) => {
                let object = self.evaluate(&member.object, env)?;
                let key = self.property_key(&member.property, env)?;
                object.get_property(&key)
            }
        }
    }

    fn evaluate_assignment(
        &mut self,
        assignment: &AssignmentExpression,
        env: &Environment,
    ) -> Result<Value, Error> {
        match &assignment.target {
            AssignmentTarget::Identifier(id) => {
                let value = match assignment.operator.binary_operator() {
                    Some(operator) => {
                        let current = lookup(&id.name, env)?;
                        let right = self.evaluate(&assignment.value, env)?;
                        operators::binary(operator, &current, &right)
                    }
                    None => self.evaluate(&assignment.value, env)?,
                };
                env.assign(&id.name, value.clone())?;
                Ok(value)
            }
            AssignmentTarget::Member(member) => {
                let object = self.evaluate(&member.object, env)?;
                let key = self.property_key(&member.property, env)?;
                let value = match assignment.operator.binary_operator() {
                    Some(operator) => {
                        let current = object.get_property(&key)?;
                        let right = self.evaluate(&assignment.value, env)?;
                        operators::binary(operator, &current, &right)
                    }
                    None => self.evaluate(&assignment.value, env)?,
                };
                object.set_property(&key, value.clone())?;
                Ok(value)
            }
        }
    }

    fn evaluate_call(&mut self, call: &CallExpression, env: &Environment) -> Result<Value, Error> {
        let (callee, this) = match call.callee.as_ref() {
            Expression::Member(member) => {
                let object = self.evaluate(&member.object, env)?;
                let key = self.property_key(&member.property, env)?;
                (object.get_property(&key)?, object)
            }
            other => (self.evaluate(other, env)?, Value::Undefined),
        };

        let args = call
            .arguments
            .iter()
            .map(|argument| self.evaluate(argument, env))
            .collect::<Result<Vec<_>, _>>()?;

        if !callee.is_function() {
            return Err(Error::Type(format!(
                "{} is not a function",
                describe_callee(&call.callee)
            )));
        }

        self.call(&callee, &this, &args)
    }

    fn property_key(&mut self, property: &MemberProperty, env: &Environment) -> Result<String, Error> {
        match property {
            MemberProperty::Identifier(id) => Ok(id.name.clone()),
            MemberProperty::Expression(expression) => {
                Ok(self.evaluate(expression, env)?.to_js_string())
            }
        }
    }
}

fn lookup(name: &str, env: &Environment) -> Result<Value, Error> {
    if let Some(value) = env.get(name) {
        return Ok(value);
    }
    match name {
        "undefined" => Ok(Value::Undefined),
        "NaN" => Ok(Value::Number(f64::NAN)),
        "Infinity" => Ok(Value::Number(f64::INFINITY)),
        _ => Err(Error::Reference(format!("{} is not defined", name))),
    }
}

fn make_function(definition: &Arc<FunctionDefinition>, env: &Environment) -> Value {
    Value::Function(Arc::new(Callable::Script(ScriptFunction {
        definition: Arc::clone(definition),
        closure: env.clone(),
    })))
}

/// Declares every `var` in `body` (outside nested functions) in `env`.
fn hoist_vars(body: &[Statement], env: &Environment) {
    for statement in body {
        match statement {
            Statement::VariableDeclaration(declaration) if declaration.kind == VariableKind::Var => {
                for declarator in &declaration.declarations {
                    env.declare_var(&declarator.id.name);
                }
            }
            Statement::Block(inner) => hoist_vars(inner, env),
            Statement::If(statement) => {
                hoist_vars(std::slice::from_ref(statement.consequent.as_ref()), env);
                if let Some(alternate) = &statement.alternate {
                    hoist_vars(std::slice::from_ref(alternate.as_ref()), env);
                }
            }
            Statement::While(statement) => {
                hoist_vars(std::slice::from_ref(statement.body.as_ref()), env)
            }
            _ => {}
        }
    }
}

/// Source-like rendering of a callee for "is not a function" messages.
fn describe_callee(expression: &Expression) -> String {
    match expression {
        Expression::Identifier(id) => id.name.clone(),
        Expression::Member(member) => {
            let object = describe_callee(&member.object);
            match &member.property {
                MemberProperty::Identifier(id) => format!("{}.{}", object, id.name),
                MemberProperty::Expression(_) => format!("{}[...]", object),
            }
        }
        Expression::Call(call) => format!("{}(...)", describe_callee(&call.callee)),
        _ => "expression".to_string(),
    }
}
