// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Function representation.

use std::sync::Arc;

use super::environment::Environment;
use super::value::Value;
use crate::Error;
use crate::ast::FunctionDefinition;

/// A native (Rust) function.
///
/// Receives the call receiver (`this`, undefined for plain calls) and the
/// evaluated arguments.
pub type NativeFunction = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, Error> + Send + Sync>;

/// A function defined in script code, closed over its defining scope.
#[derive(Clone)]
pub struct ScriptFunction {
    /// The parsed definition
    pub definition: Arc<FunctionDefinition>,
    /// The environment the function was created in
    pub closure: Environment,
}

/// A callable value - either a script function or a native function.
#[derive(Clone)]
pub enum Callable {
    /// A script function
    Script(ScriptFunction),
    /// A native Rust function
    Native {
        /// The function name
        name: String,
        /// The native function
        func: NativeFunction,
    },
}

impl Callable {
    /// The function name, empty for anonymous functions.
    pub fn name(&self) -> &str {
        match self {
            Callable::Script(function) => function
                .definition
                .id
                .as_ref()
                .map(|id| id.name.as_str())
                .unwrap_or(""),
            Callable::Native { name, .. } => name,
        }
    }

    /// Returns the arity (number of declared parameters).
    pub fn arity(&self) -> usize {
        match self {
            Callable::Script(function) => function.definition.params.len(),
            Callable::Native { .. } => 0,
        }
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callable::Script(_) => write!(f, "Function({:?})", self.name()),
            Callable::Native { name, .. } => write!(f, "NativeFunction({})", name),
        }
    }
}
