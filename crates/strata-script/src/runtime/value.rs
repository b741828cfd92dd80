// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Script value representation.

use std::fmt;
use std::sync::Arc;

use super::function::{Callable, NativeFunction};
use super::object::{Object, ObjectRef};
use crate::Error;

/// A script value.
///
/// Values are thread-safe and can be moved between tasks; objects and
/// functions are shared by reference.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// undefined
    #[default]
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Object or array reference
    Object(ObjectRef),
    /// Function reference
    Function(Arc<Callable>),
}

impl PartialEq for Value {
    /// Strict equality: primitives by value, objects and functions by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            // NaN != NaN falls out of f64 comparison
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Wraps a fresh plain object.
    pub fn new_object() -> Self {
        Value::Object(ObjectRef::new(Object::new()))
    }

    /// Wraps a fresh array holding `elements`.
    pub fn new_array(elements: Vec<Value>) -> Self {
        Value::Object(ObjectRef::new(Object::array(elements)))
    }

    /// Creates a native function value.
    pub fn native<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        let func: NativeFunction = Arc::new(func);
        Value::Function(Arc::new(Callable::Native {
            name: name.into(),
            func,
        }))
    }

    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this value is nullish (null or undefined).
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns true if this value is a function.
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Returns the object reference, if this value is an object.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Returns the number, if this value is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string slice, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts the value to a boolean (ToBoolean).
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Converts the value to a number (ToNumber).
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Object(_) => string_to_number(&self.to_js_string()),
            Value::Function(_) => f64::NAN,
        }
    }

    /// Converts the value to a string the way `String(value)` would.
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Object(object) => object.to_js_string(),
            Value::Function(callable) => format!("function {}() {{ [code] }}", callable.name()),
        }
    }

    /// Returns the type of this value as a string.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object", // Historical quirk
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Reads a property, yielding undefined for missing keys.
    pub fn get_property(&self, key: &str) -> Result<Value, Error> {
        match self {
            Value::Undefined | Value::Null => Err(Error::Type(format!(
                "Cannot read properties of {} (reading '{}')",
                self.to_js_string(),
                key
            ))),
            Value::Object(object) => Ok(object.get(key)),
            Value::String(s) => Ok(match key {
                "length" => Value::Number(s.encode_utf16().count() as f64),
                _ => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| s.chars().nth(index))
                    .map(|ch| Value::String(ch.to_string()))
                    .unwrap_or(Value::Undefined),
            }),
            Value::Function(callable) => Ok(match key {
                "name" => Value::String(callable.name().to_string()),
                "length" => Value::Number(callable.arity() as f64),
                _ => Value::Undefined,
            }),
            Value::Boolean(_) | Value::Number(_) => Ok(Value::Undefined),
        }
    }

    /// Writes a property. Only objects accept new properties.
    pub fn set_property(&self, key: &str, value: Value) -> Result<(), Error> {
        match self {
            Value::Object(object) => {
                object.set(key, value);
                Ok(())
            }
            Value::Undefined | Value::Null => Err(Error::Type(format!(
                "Cannot set properties of {} (setting '{}')",
                self.to_js_string(),
                key
            ))),
            other => Err(Error::Type(format!(
                "Cannot create property '{}' on {}",
                key,
                other.type_of()
            ))),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl fmt::Display for Value {
    /// Console-style rendering: strings print bare at the top level and
    /// quoted inside containers.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", inspect(other, 0, &mut Vec::new())),
        }
    }
}

const MAX_INSPECT_DEPTH: usize = 2;

/// Renders a value the way a console prints it, guarding against cycles.
fn inspect(value: &Value, depth: usize, seen: &mut Vec<ObjectRef>) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "\\'")),
        Value::Function(callable) => match callable.name() {
            "" => "[Function (anonymous)]".to_string(),
            name => format!("[Function: {}]", name),
        },
        Value::Object(object) => {
            if seen.iter().any(|outer| outer.ptr_eq(object)) {
                return "[Circular]".to_string();
            }
            let is_array = object.is_array();
            if depth > MAX_INSPECT_DEPTH {
                return if is_array { "[Array]" } else { "[Object]" }.to_string();
            }

            seen.push(object.clone());
            let entries: Vec<String> = object
                .entries()
                .into_iter()
                .map(|(key, value)| {
                    let rendered = inspect(&value, depth + 1, seen);
                    if is_array {
                        rendered
                    } else {
                        format!("{}: {}", display_key(&key), rendered)
                    }
                })
                .collect();
            seen.pop();

            match (is_array, entries.is_empty()) {
                (true, true) => "[]".to_string(),
                (false, true) => "{}".to_string(),
                (true, false) => format!("[ {} ]", entries.join(", ")),
                (false, false) => format!("{{ {} }}", entries.join(", ")),
            }
        }
        other => other.to_js_string(),
    }
}

fn display_key(key: &str) -> String {
    let plain = key
        .chars()
        .next()
        .is_some_and(|ch| ch == '_' || ch == '$' || ch.is_alphabetic())
        && key.chars().all(|ch| ch == '_' || ch == '$' || ch.is_alphanumeric());
    if plain {
        key.to_string()
    } else {
        format!("'{}'", key)
    }
}

/// Formats a number the way script code observes it.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf"/"nan" spellings that scripts do not
        _ if trimmed.chars().any(|ch| ch.is_ascii_alphabetic() && ch != 'e' && ch != 'E') => {
            f64::NAN
        }
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_boolean() {
        assert!(!Value::Undefined.to_boolean());
        assert!(!Value::Number(f64::NAN).to_boolean());
        assert!(!Value::from("").to_boolean());
        assert!(Value::from("0").to_boolean());
        assert!(Value::new_object().to_boolean());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::from(" 42 ").to_number(), 42.0);
        assert_eq!(Value::from("").to_number(), 0.0);
        assert_eq!(Value::from("0x10").to_number(), 16.0);
        assert!(Value::from("inf").to_number().is_nan());
        assert_eq!(Value::Boolean(true).to_number(), 1.0);
        assert!(Value::Undefined.to_number().is_nan());
        assert_eq!(Value::Null.to_number(), 0.0);
    }

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(7.0), "7");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_equality_is_by_identity_for_objects() {
        let a = Value::new_object();
        let b = Value::new_object();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn test_display() {
        let object = Value::new_object();
        object.set_property("a", Value::Number(1.0)).unwrap();
        object.set_property("b c", Value::from("x")).unwrap();
        object
            .set_property("list", Value::new_array(vec![Value::Number(1.0), Value::Null]))
            .unwrap();
        assert_eq!(object.to_string(), "{ a: 1, 'b c': 'x', list: [ 1, null ] }");
        assert_eq!(Value::from("bare").to_string(), "bare");
        assert_eq!(Value::new_array(vec![]).to_string(), "[]");
    }

    #[test]
    fn test_display_handles_cycles() {
        let object = Value::new_object();
        object.set_property("self", object.clone()).unwrap();
        assert_eq!(object.to_string(), "{ self: [Circular] }");
    }

    #[test]
    fn test_display_depth_limit() {
        let inner = Value::new_object();
        inner.set_property("x", Value::Number(1.0)).unwrap();
        let mut value = inner;
        for _ in 0..3 {
            let outer = Value::new_object();
            outer.set_property("next", value).unwrap();
            value = outer;
        }
        assert_eq!(
            value.to_string(),
            "{ next: { next: { next: [Object] } } }"
        );
    }

    #[test]
    fn test_property_access_on_primitives() {
        assert_eq!(
            Value::from("abc").get_property("length").unwrap(),
            Value::Number(3.0)
        );
        assert_eq!(
            Value::from("abc").get_property("1").unwrap(),
            Value::from("b")
        );
        assert!(matches!(
            Value::Undefined.get_property("x"),
            Err(Error::Type(_))
        ));
        assert!(matches!(
            Value::Number(1.0).set_property("x", Value::Null),
            Err(Error::Type(_))
        ));
    }
}
