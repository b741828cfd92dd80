// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Object representation.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::value::Value;

/// A plain object or array.
///
/// Properties keep insertion order so printed exports read the way they
/// were assigned.
#[derive(Debug, Clone, Default)]
pub struct Object {
    properties: FxHashMap<String, Value>,
    order: Vec<String>,
    array: bool,
    length: usize,
}

impl Object {
    /// Creates a new empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an array object from its elements.
    pub fn array(elements: Vec<Value>) -> Self {
        let mut object = Self {
            array: true,
            ..Self::default()
        };
        for (index, element) in elements.into_iter().enumerate() {
            object.set(index.to_string(), element);
        }
        object
    }

    /// Gets a property value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Sets a property value.
    pub fn set(&mut self, key: String, value: Value) {
        if self.array
            && let Ok(index) = key.parse::<usize>()
        {
            self.length = self.length.max(index + 1);
        }
        if !self.properties.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.properties.insert(key, value);
    }

    /// Checks if a property exists.
    pub fn has(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Property keys in insertion order.
    pub fn keys(&self) -> &[String] {
        &self.order
    }

    /// Number of own properties.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the object has no properties.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A shared, mutable handle to an [`Object`].
///
/// Cloning the handle aliases the same object; identity comparison uses
/// [`ObjectRef::ptr_eq`].
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Object>>);

impl ObjectRef {
    /// Wraps an object in a new shared handle.
    pub fn new(object: Object) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    /// Reads a property, yielding undefined when absent.
    pub fn get(&self, key: &str) -> Value {
        let object = self.0.read();
        if object.array && key == "length" {
            return Value::Number(object.length as f64);
        }
        object.get(key).cloned().unwrap_or_default()
    }

    /// Writes a property.
    pub fn set(&self, key: &str, value: Value) {
        self.0.write().set(key.to_string(), value);
    }

    /// Checks if a property exists.
    pub fn has(&self, key: &str) -> bool {
        self.0.read().has(key)
    }

    /// Snapshot of the property keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().to_vec()
    }

    /// Snapshot of key/value pairs in insertion order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        let object = self.0.read();
        object
            .order
            .iter()
            .map(|key| (key.clone(), object.properties[key].clone()))
            .collect()
    }

    /// Returns true if this handle refers to an array.
    pub fn is_array(&self) -> bool {
        self.0.read().array
    }

    /// Returns true if both handles refer to the same object.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// `String(object)`: arrays join their elements, objects are opaque.
    pub fn to_js_string(&self) -> String {
        if !self.is_array() {
            return "[object Object]".to_string();
        }
        let length = self.0.read().length;
        (0..length)
            .map(|index| match self.get(&index.to_string()) {
                Value::Undefined | Value::Null => String::new(),
                // Nested arrays pointing back at us would recurse forever
                Value::Object(inner) if inner.ptr_eq(self) => String::new(),
                element => element.to_js_string(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Debug for ObjectRef {
    // Objects can form cycles, so only the shape is printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let object = self.0.read();
        f.debug_struct(if object.array { "Array" } else { "Object" })
            .field("keys", &object.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_survives_overwrite() {
        let object = ObjectRef::new(Object::new());
        object.set("b", Value::Number(1.0));
        object.set("a", Value::Number(2.0));
        object.set("b", Value::Number(3.0));
        assert_eq!(object.keys(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(object.get("b"), Value::Number(3.0));
        assert_eq!(object.get("missing"), Value::Undefined);
    }

    #[test]
    fn test_array_length_tracks_indices() {
        let array = ObjectRef::new(Object::array(vec![Value::Number(1.0)]));
        assert_eq!(array.get("length"), Value::Number(1.0));
        array.set("4", Value::Null);
        assert_eq!(array.get("length"), Value::Number(5.0));
        assert_eq!(array.to_js_string(), "1,,,,");
    }

    #[test]
    fn test_aliasing() {
        let a = ObjectRef::new(Object::new());
        let b = a.clone();
        b.set("x", Value::Boolean(true));
        assert!(a.has("x"));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&ObjectRef::new(Object::new())));
    }
}
