// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Iterators behind `for .. in` and `iter()`.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::collections::RangeValue;
use super::value::{HashKey, Value};
use crate::error::ErrorKind;

#[derive(Debug)]
enum Source {
    /// Lists are read live, so appends during iteration are seen.
    List(Arc<RwLock<Vec<Value>>>),
    /// A snapshot of the iterable's elements
    Items(Vec<Value>),
    Range(RangeValue),
}

/// An iterator: advance with [`Iter::advance`], then read [`Iter::current`].
#[derive(Debug)]
pub struct Iter {
    source: Source,
    next: usize,
    current: Value,
}

impl Iter {
    /// Creates an iterator over an iterable value.
    ///
    /// Dicts yield `(key, value)` tuples; strings yield one-character strings.
    pub fn new(value: &Value) -> Result<Self, ErrorKind> {
        let source = match value {
            Value::List(list) => Source::List(list.clone()),
            Value::Tuple(items) => Source::Items(items.to_vec()),
            Value::Str(s) => Source::Items(s.chars().map(|c| Value::str(c.to_string())).collect()),
            Value::Dict(dict) => Source::Items(
                dict.read()
                    .iter()
                    .map(|(k, v)| Value::tuple(vec![k.to_value(), v.clone()]))
                    .collect(),
            ),
            Value::Set(set) => Source::Items(set.read().keys().map(HashKey::to_value).collect()),
            Value::Range(range) => Source::Range(*range),
            _ => return Err(ErrorKind::type_mismatch("Iterable")),
        };
        Ok(Self {
            source,
            next: 0,
            current: Value::Null,
        })
    }

    /// Moves to the next element. Returns false once exhausted.
    pub fn advance(&mut self) -> bool {
        let item = match &self.source {
            Source::List(list) => list.read().get(self.next).cloned(),
            Source::Items(items) => items.get(self.next).cloned(),
            Source::Range(range) => range.get(self.next).map(Value::Int),
        };
        match item {
            Some(item) => {
                self.current = item;
                self.next += 1;
                true
            }
            None => false,
        }
    }

    /// The element produced by the last successful advance.
    pub fn current(&self) -> Value {
        self.current.clone()
    }
}

/// Returns the iterator for `value`, reusing it if it already is one.
pub fn iterate(value: &Value) -> Result<Value, ErrorKind> {
    match value {
        Value::Iter(_) => Ok(value.clone()),
        other => Ok(Value::Iter(Arc::new(Mutex::new(Iter::new(other)?)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(value: &Value) -> Vec<Value> {
        let mut iter = Iter::new(value).unwrap();
        let mut out = Vec::new();
        while iter.advance() {
            out.push(iter.current());
        }
        out
    }

    #[test]
    fn test_range_iteration() {
        let range = Value::Range(RangeValue::new(0, 6, 2).unwrap());
        assert_eq!(collect(&range), [Value::Int(0), Value::Int(2), Value::Int(4)]);
    }

    #[test]
    fn test_string_iteration() {
        assert_eq!(collect(&Value::str("hé")), [Value::str("h"), Value::str("é")]);
    }

    #[test]
    fn test_list_iteration_sees_appends() {
        let list = Value::list(vec![Value::Int(1)]);
        let mut iter = Iter::new(&list).unwrap();
        assert!(iter.advance());
        if let Value::List(items) = &list {
            items.write().push(Value::Int(2));
        }
        assert!(iter.advance());
        assert_eq!(iter.current(), Value::Int(2));
        assert!(!iter.advance());
    }

    #[test]
    fn test_not_iterable() {
        assert!(Iter::new(&Value::Int(3)).is_err());
    }
}
