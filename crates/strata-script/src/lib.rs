// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # strata-script
//!
//! A small, sandboxed evaluator for CommonJS module bodies.
//!
//! ## Overview
//!
//! This crate provides just enough of the language to run module code:
//! - Lexer and parser with automatic semicolon insertion
//! - Tree-walking interpreter with closures and hoisting
//! - Shared objects and arrays with insertion-ordered properties
//! - Native functions so a host can inject bindings such as `require`
//!
//! A module body sees nothing but the bindings its host passes in; there is
//! no global object and no standard library.
//!
//! ## Quick Start
//!
//! ```rust
//! use strata_script::{Value, evaluate_module, parse};
//!
//! let program = parse("module.exports = 1 + 2;").unwrap();
//! let module = Value::new_object();
//! evaluate_module(&program, &[("module", module.clone())]).unwrap();
//! assert_eq!(module.get_property("exports").unwrap(), Value::Number(3.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod runtime;

pub use ast::Program;
pub use interpreter::Interpreter;
pub use runtime::{Environment, NativeFunction, ObjectRef, Value};

/// Errors that can occur while parsing or evaluating module code.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Syntax error during parsing
    #[error("SyntaxError: {message} (at offset {offset})")]
    Syntax {
        /// What went wrong
        message: String,
        /// Byte offset of the offending token
        offset: usize,
    },

    /// Type error during execution
    #[error("TypeError: {0}")]
    Type(String),

    /// Reference error (undefined variable)
    #[error("ReferenceError: {0}")]
    Reference(String),

    /// Range error (runaway recursion)
    #[error("RangeError: {0}")]
    Range(String),

    /// A value raised by a `throw` statement
    #[error("Uncaught {0}")]
    Thrown(Value),

    /// An error raised by a host-provided native function
    #[error(transparent)]
    Host(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Creates a syntax error at the given byte offset.
    pub fn syntax(message: impl Into<String>, offset: usize) -> Self {
        Error::Syntax {
            message: message.into(),
            offset,
        }
    }

    /// Wraps a host error so it can travel through script frames.
    pub fn host<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Host(Box::new(error))
    }
}

/// Parses module source into a program.
pub fn parse(source: &str) -> Result<Program, Error> {
    parser::Parser::new(source).parse_program()
}

/// Evaluates a parsed module body.
///
/// The body runs in a fresh scope whose only names are `bindings`; a
/// top-level `return` ends evaluation and its value is returned.
pub fn evaluate_module(program: &Program, bindings: &[(&str, Value)]) -> Result<Value, Error> {
    let env = Environment::new();
    for (name, value) in bindings {
        env.declare(name, value.clone(), true);
    }
    Interpreter::new().run_program(program, &env)
}

/// Calls a function value from host code.
pub fn call_function(function: &Value, this: &Value, args: &[Value]) -> Result<Value, Error> {
    Interpreter::new().call(function, this, args)
}
