// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Golem value representation.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::collections::{Dict, RangeValue, Set};
use super::function::Func;
use super::iterator::Iter;
use super::structure::Struct;
use crate::error::{ErrorKind, RuntimeError};

/// A shared, mutable storage cell for one variable.
///
/// Every local slot of a frame is a `Ref`, so a closure that captures a
/// variable holds the very same cell as the frame that declared it.
pub type Ref = Arc<RwLock<Value>>;

/// Creates a new cell holding `value`.
pub fn new_ref(value: Value) -> Ref {
    Arc::new(RwLock::new(value))
}

/// A Golem value.
///
/// Values are designed to be thread-safe and can be shared with tasks
/// started by `go`. Collections are shared by reference; cloning a `Value`
/// never copies a list, dict, set or struct.
#[derive(Clone)]
pub enum Value {
    /// null
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// IEEE 754 double
    Float(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Mutable list
    List(Arc<RwLock<Vec<Value>>>),
    /// Immutable tuple
    Tuple(Arc<[Value]>),
    /// Mutable dictionary, in insertion order
    Dict(Arc<RwLock<Dict>>),
    /// Mutable set, in insertion order
    Set(Arc<RwLock<Set>>),
    /// Struct instance or module contents
    Struct(Arc<Struct>),
    /// Closure or native function
    Func(Func),
    /// Integer range produced by `range`
    Range(RangeValue),
    /// Iterator over an iterable value
    Iter(Arc<Mutex<Iter>>),
    /// A runtime error caught by a `catch` clause
    Error(Arc<RuntimeError>),
}

impl Value {
    /// Creates a string value.
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    /// Creates a list value.
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(RwLock::new(items)))
    }

    /// Creates a tuple value.
    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items.into())
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the Golem type name, as reported by `type()`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::List(_) => "List",
            Value::Tuple(_) => "Tuple",
            Value::Dict(_) => "Dict",
            Value::Set(_) => "Set",
            Value::Struct(_) => "Struct",
            Value::Func(_) => "Func",
            Value::Range(_) => "Range",
            Value::Iter(_) => "Iter",
            Value::Error(_) => "Error",
        }
    }

    /// Returns the Bool a condition requires.
    pub fn as_bool(&self) -> Result<bool, ErrorKind> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(ErrorKind::type_mismatch("Bool")),
        }
    }

    /// Returns the Int an index or count requires.
    pub fn as_int(&self) -> Result<i64, ErrorKind> {
        match self {
            Value::Int(n) => Ok(*n),
            _ => Err(ErrorKind::type_mismatch("Int")),
        }
    }

    /// Returns the string contents of a Str.
    pub fn as_str(&self) -> Result<&str, ErrorKind> {
        match self {
            Value::Str(s) => Ok(s),
            _ => Err(ErrorKind::type_mismatch("Str")),
        }
    }

    /// Returns the function of a Func.
    pub fn as_func(&self) -> Result<&Func, ErrorKind> {
        match self {
            Value::Func(f) => Ok(f),
            _ => Err(ErrorKind::type_mismatch("Func")),
        }
    }

    /// Converts a hashable value into a dict or set key.
    pub fn to_key(&self) -> Result<HashKey, ErrorKind> {
        Ok(match self {
            Value::Null => HashKey::Null,
            Value::Bool(b) => HashKey::Bool(*b),
            Value::Int(n) => HashKey::Int(*n),
            Value::Float(n) => HashKey::Float(n.to_bits()),
            Value::Str(s) => HashKey::Str(s.clone()),
            Value::Tuple(items) => HashKey::Tuple(
                items
                    .iter()
                    .map(Value::to_key)
                    .collect::<Result<_, _>>()?,
            ),
            _ => return Err(ErrorKind::type_mismatch("Hashable")),
        })
    }

    /// Formats the value the way it appears inside a collection, with
    /// strings quoted.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{s:?}"),
            other => other.to_string(),
        }
    }
}

/// A hashable projection of a value, used as dict and set keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    /// `null`
    Null,
    /// A Bool
    Bool(bool),
    /// An Int
    Int(i64),
    /// A Float, by bit pattern
    Float(u64),
    /// A Str
    Str(Arc<str>),
    /// A Tuple of hashable values
    Tuple(Vec<HashKey>),
}

impl HashKey {
    /// Converts the key back into the value it was made from.
    pub fn to_value(&self) -> Value {
        match self {
            HashKey::Null => Value::Null,
            HashKey::Bool(b) => Value::Bool(*b),
            HashKey::Int(n) => Value::Int(*n),
            HashKey::Float(bits) => Value::Float(f64::from_bits(*bits)),
            HashKey::Str(s) => Value::Str(s.clone()),
            HashKey::Tuple(items) => Value::tuple(items.iter().map(HashKey::to_value).collect()),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        crate::vm::comparison::equals(self, other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

fn join(f: &mut fmt::Formatter<'_>, items: impl IntoIterator<Item = String>) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&item)?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n:?}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                // Elements are formatted after the lock is released.
                let items = items.read().clone();
                f.write_str("[")?;
                join(f, items.iter().map(Value::repr))?;
                f.write_str("]")
            }
            Value::Tuple(items) => {
                f.write_str("(")?;
                join(f, items.iter().map(Value::repr))?;
                f.write_str(")")
            }
            Value::Dict(dict) => {
                let entries: Vec<_> = dict
                    .read()
                    .iter()
                    .map(|(k, v)| (k.to_value(), v.clone()))
                    .collect();
                f.write_str("dict {")?;
                join(f, entries.iter().map(|(k, v)| format!("{}: {}", k.repr(), v.repr())))?;
                f.write_str("}")
            }
            Value::Set(set) => {
                let items: Vec<_> = set.read().keys().map(HashKey::to_value).collect();
                f.write_str("set {")?;
                join(f, items.iter().map(Value::repr))?;
                f.write_str("}")
            }
            Value::Struct(s) => write!(f, "{s}"),
            Value::Func(func) => write!(f, "{func}"),
            Value::Range(range) => write!(f, "{range}"),
            Value::Iter(_) => write!(f, "iterator"),
            Value::Error(err) => write!(f, "{}", err.message()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Error(err) => write!(f, "Error({:?})", err.kind),
            other => write!(f, "{}({})", other.type_name(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "Null");
        assert_eq!(Value::list(Vec::new()).type_name(), "List");
        assert_eq!(Value::str("x").type_name(), "Str");
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(
            Value::list(vec![Value::Int(1), Value::str("a")]).to_string(),
            "[1, \"a\"]"
        );
        assert_eq!(
            Value::tuple(vec![Value::Bool(true), Value::Null]).to_string(),
            "(true, null)"
        );
    }

    #[test]
    fn test_keys_round_trip_through_values() {
        let value = Value::tuple(vec![Value::Int(1), Value::str("k")]);
        let key = value.to_key().unwrap();
        assert_eq!(key.to_value(), value);
    }

    #[test]
    fn test_lists_are_not_hashable() {
        let err = Value::list(Vec::new()).to_key().unwrap_err();
        assert_eq!(err.name(), "TypeMismatch");
    }

    #[test]
    fn test_refs_are_shared() {
        let cell = new_ref(Value::Int(1));
        let alias = cell.clone();
        *alias.write() = Value::Int(2);
        assert_eq!(*cell.read(), Value::Int(2));
    }
}
