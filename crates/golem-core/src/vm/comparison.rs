// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Equality and ordering of values.
//!
//! `==` is structural for strings and collections, numeric across Int and
//! Float, and by identity for structs, functions, iterators and errors.
//! Ordering is only defined for Comparable values: Int, Float and Str.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::ErrorKind;
use crate::runtime::Value;

/// Golem `==`.
pub fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            if Arc::ptr_eq(a, b) {
                return true;
            }
            // Locks are released before elements are compared.
            let a = a.read().clone();
            let b = b.read().clone();
            a == b
        }
        (Value::Tuple(a), Value::Tuple(b)) => a[..] == b[..],
        (Value::Dict(a), Value::Dict(b)) => {
            if Arc::ptr_eq(a, b) {
                return true;
            }
            let a = a.read().clone();
            let b = b.read().clone();
            a.len() == b.len()
                && a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| equals(value, other)))
        }
        (Value::Set(a), Value::Set(b)) => {
            if Arc::ptr_eq(a, b) {
                return true;
            }
            let a = a.read().clone();
            let b = b.read();
            a.len() == b.len() && a.keys().all(|key| b.contains(key))
        }
        (Value::Range(a), Value::Range(b)) => a == b,
        (Value::Struct(a), Value::Struct(b)) => Arc::ptr_eq(a, b),
        (Value::Func(a), Value::Func(b)) => a.ptr_eq(b),
        (Value::Iter(a), Value::Iter(b)) => Arc::ptr_eq(a, b),
        (Value::Error(a), Value::Error(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// Orders two Comparable values.
pub fn compare(a: &Value, b: &Value) -> Result<Ordering, ErrorKind> {
    let ordering = match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => return Err(ErrorKind::type_mismatch("Comparable")),
    };
    ordering.ok_or_else(|| ErrorKind::invalid_argument("NaN is not comparable"))
}

/// Golem `<=>`: -1, 0 or 1.
pub fn cmp(a: &Value, b: &Value) -> Result<Value, ErrorKind> {
    Ok(Value::Int(match compare(a, b)? {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }))
}
