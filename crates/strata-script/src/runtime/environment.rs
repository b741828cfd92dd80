// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lexical environments for variable binding.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::value::Value;
use crate::Error;

/// A lexical environment for variable bindings.
///
/// Environments are shared handles: closures keep the scope they were
/// created in alive and observe later writes to it.
#[derive(Clone, Default)]
pub struct Environment(Arc<Mutex<Scope>>);

#[derive(Default)]
struct Scope {
    bindings: FxHashMap<String, Binding>,
    outer: Option<Environment>,
}

/// A variable binding.
struct Binding {
    value: Value,
    mutable: bool,
}

impl Environment {
    /// Creates a new top-level environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new environment nested inside this one.
    pub fn child(&self) -> Self {
        Self(Arc::new(Mutex::new(Scope {
            bindings: FxHashMap::default(),
            outer: Some(self.clone()),
        })))
    }

    /// Declares a binding in this scope, replacing any previous one.
    pub fn declare(&self, name: &str, value: Value, mutable: bool) {
        self.0
            .lock()
            .bindings
            .insert(name.to_string(), Binding { value, mutable });
    }

    /// Declares a `var` binding unless one already exists in this scope.
    pub fn declare_var(&self, name: &str) {
        self.0
            .lock()
            .bindings
            .entry(name.to_string())
            .or_insert(Binding {
                value: Value::Undefined,
                mutable: true,
            });
    }

    /// Returns true if `name` is bound directly in this scope.
    pub fn has_own(&self, name: &str) -> bool {
        self.0.lock().bindings.contains_key(name)
    }

    /// Looks a name up through the scope chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut current = self.clone();
        loop {
            let next = {
                let scope = current.0.lock();
                if let Some(binding) = scope.bindings.get(name) {
                    return Some(binding.value.clone());
                }
                scope.outer.clone()
            };
            current = next?;
        }
    }

    /// Assigns to the nearest existing binding named `name`.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), Error> {
        let mut current = self.clone();
        loop {
            let next = {
                let mut scope = current.0.lock();
                if let Some(binding) = scope.bindings.get_mut(name) {
                    if !binding.mutable {
                        return Err(Error::Type("Assignment to constant variable.".to_string()));
                    }
                    binding.value = value;
                    return Ok(());
                }
                scope.outer.clone()
            };
            match next {
                Some(outer) => current = outer,
                None => return Err(Error::Reference(format!("{} is not defined", name))),
            }
        }
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scope = self.0.lock();
        let mut names: Vec<_> = scope.bindings.keys().collect();
        names.sort();
        f.debug_struct("Environment").field("bindings", &names).finish()
    }
}
