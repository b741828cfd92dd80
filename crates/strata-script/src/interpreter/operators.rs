// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Binary and unary operator semantics.

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::runtime::Value;

/// Applies a binary operator to two evaluated operands.
pub fn binary(operator: BinaryOperator, left: &Value, right: &Value) -> Value {
    match operator {
        BinaryOperator::Add => add(left, right),
        BinaryOperator::Subtract => Value::Number(left.to_number() - right.to_number()),
        BinaryOperator::Multiply => Value::Number(left.to_number() * right.to_number()),
        BinaryOperator::Divide => Value::Number(left.to_number() / right.to_number()),
        // Rust's % on f64 truncates like the script remainder operator
        BinaryOperator::Modulo => Value::Number(left.to_number() % right.to_number()),
        BinaryOperator::Equal => Value::Boolean(abstract_equals(left, right)),
        BinaryOperator::NotEqual => Value::Boolean(!abstract_equals(left, right)),
        BinaryOperator::StrictEqual => Value::Boolean(left == right),
        BinaryOperator::StrictNotEqual => Value::Boolean(left != right),
        BinaryOperator::LessThan => Value::Boolean(less_than(left, right).unwrap_or(false)),
        BinaryOperator::GreaterThan => Value::Boolean(less_than(right, left).unwrap_or(false)),
        // a <= b is !(b < a), except that NaN makes both false
        BinaryOperator::LessThanEqual => {
            Value::Boolean(less_than(right, left).is_some_and(|lt| !lt))
        }
        BinaryOperator::GreaterThanEqual => {
            Value::Boolean(less_than(left, right).is_some_and(|lt| !lt))
        }
    }
}

/// Applies a unary operator to an evaluated operand.
pub fn unary(operator: UnaryOperator, argument: &Value) -> Value {
    match operator {
        UnaryOperator::Minus => Value::Number(-argument.to_number()),
        UnaryOperator::Plus => Value::Number(argument.to_number()),
        UnaryOperator::LogicalNot => Value::Boolean(!argument.to_boolean()),
        UnaryOperator::Typeof => Value::String(argument.type_of().to_string()),
    }
}

fn add(left: &Value, right: &Value) -> Value {
    let left = to_primitive(left);
    let right = to_primitive(right);
    match (&left, &right) {
        (Value::String(_), _) | (_, Value::String(_)) => {
            Value::String(format!("{}{}", left.to_js_string(), right.to_js_string()))
        }
        _ => Value::Number(left.to_number() + right.to_number()),
    }
}

/// Objects and functions convert to their string form; primitives pass through.
fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Object(_) | Value::Function(_) => Value::String(value.to_js_string()),
        other => other.clone(),
    }
}

/// Abstract relational comparison. `None` means undefined (a NaN was involved).
fn less_than(left: &Value, right: &Value) -> Option<bool> {
    let left = to_primitive(left);
    let right = to_primitive(right);
    if let (Value::String(a), Value::String(b)) = (&left, &right) {
        return Some(a < b);
    }
    let (a, b) = (left.to_number(), right.to_number());
    if a.is_nan() || b.is_nan() {
        None
    } else {
        Some(a < b)
    }
}

/// Abstract equality comparison (`==`) with type coercion.
pub fn abstract_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        // Same type comparisons reduce to strict equality
        (Value::Undefined, Value::Undefined)
        | (Value::Null, Value::Null)
        | (Value::Boolean(_), Value::Boolean(_))
        | (Value::Number(_), Value::Number(_))
        | (Value::String(_), Value::String(_))
        | (Value::Object(_), Value::Object(_))
        | (Value::Function(_), Value::Function(_)) => a == b,

        // null == undefined is true
        (Value::Null, Value::Undefined) | (Value::Undefined, Value::Null) => true,

        // Number vs string compares numerically
        (Value::Number(n), Value::String(_)) | (Value::String(_), Value::Number(n)) => {
            let other = if a.as_number().is_some() { b } else { a };
            *n == other.to_number()
        }

        // Booleans convert to numbers first
        (Value::Boolean(flag), other) | (other, Value::Boolean(flag)) => {
            abstract_equals(&Value::Number(f64::from(u8::from(*flag))), other)
        }

        // Objects against primitives compare through their string form
        (Value::Number(_) | Value::String(_), Value::Object(_) | Value::Function(_)) => {
            abstract_equals(a, &to_primitive(b))
        }
        (Value::Object(_) | Value::Function(_), Value::Number(_) | Value::String(_)) => {
            abstract_equals(&to_primitive(a), b)
        }

        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_abstract_equals_same_type() {
        assert!(abstract_equals(&Value::Undefined, &Value::Undefined));
        assert!(abstract_equals(&Value::Boolean(true), &Value::Boolean(true)));
        assert!(!abstract_equals(&num(f64::NAN), &num(f64::NAN)));
        assert!(abstract_equals(&Value::from("foo"), &Value::from("foo")));
    }

    #[test]
    fn test_abstract_equals_coercion() {
        assert!(abstract_equals(&Value::Null, &Value::Undefined));
        assert!(abstract_equals(&num(1.0), &Value::from("1")));
        assert!(abstract_equals(&Value::Boolean(true), &num(1.0)));
        assert!(abstract_equals(&Value::from("0"), &Value::Boolean(false)));
        assert!(!abstract_equals(&Value::Null, &num(0.0)));
        let array = Value::new_array(vec![num(1.0), num(2.0)]);
        assert!(abstract_equals(&array, &Value::from("1,2")));
    }

    #[test]
    fn test_add() {
        assert_eq!(binary(BinaryOperator::Add, &num(3.0), &num(4.0)), num(7.0));
        assert_eq!(
            binary(BinaryOperator::Add, &Value::from("a"), &num(1.0)),
            Value::from("a1")
        );
        assert_eq!(
            binary(BinaryOperator::Add, &Value::Boolean(true), &num(1.0)),
            num(2.0)
        );
        assert_eq!(
            binary(BinaryOperator::Add, &Value::new_object(), &Value::from("!")),
            Value::from("[object Object]!")
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(binary(BinaryOperator::Modulo, &num(-7.0), &num(3.0)), num(-1.0));
        assert_eq!(
            binary(BinaryOperator::Divide, &num(1.0), &num(0.0)),
            num(f64::INFINITY)
        );
        assert_eq!(
            binary(BinaryOperator::Subtract, &Value::from("5"), &num(2.0)),
            num(3.0)
        );
    }

    #[test]
    fn test_relational() {
        assert_eq!(
            binary(BinaryOperator::LessThan, &num(1.0), &num(2.0)),
            Value::Boolean(true)
        );
        assert_eq!(
            binary(BinaryOperator::LessThan, &Value::from("b"), &Value::from("a")),
            Value::Boolean(false)
        );
        assert_eq!(
            binary(BinaryOperator::LessThanEqual, &num(2.0), &num(2.0)),
            Value::Boolean(true)
        );
        assert_eq!(
            binary(BinaryOperator::GreaterThanEqual, &num(f64::NAN), &num(1.0)),
            Value::Boolean(false)
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(UnaryOperator::Minus, &Value::from("3")), num(-3.0));
        assert_eq!(unary(UnaryOperator::LogicalNot, &Value::Null), Value::Boolean(true));
        assert_eq!(
            unary(UnaryOperator::Typeof, &Value::Null),
            Value::from("object")
        );
    }
}
