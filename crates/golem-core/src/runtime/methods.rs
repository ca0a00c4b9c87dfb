// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Intrinsic methods of the built-in types.
//!
//! Reading a field of a list, string, dict, set or iterator produces a
//! native function bound to that value. `Error` values expose the fields
//! `kind`, `msg` and `stackTrace` instead.
//!
//! | Type | Methods |
//! |------|---------|
//! | List | `add addAll contains indexOf isEmpty join map filter reduce remove` |
//! | Str  | `contains index startsWith endsWith split trim toUpper toLower` |
//! | Dict | `get containsKey remove isEmpty keys values` |
//! | Set  | `add contains remove isEmpty` |
//! | Iter | `next get` |

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::collections::{Dict, Set};
use super::function::{NativeFn, NativeFunc};
use super::iterator::Iter;
use super::value::{HashKey, Value};
use crate::compiler::Arity;
use crate::error::{ErrorKind, Fault, RuntimeError};
use crate::vm::Interpreter;

type MethodTable = &'static [(&'static str, Arity, NativeFn)];

const LIST_METHODS: MethodTable = &[
    ("add", Arity::Fixed(1), list_add),
    ("addAll", Arity::Fixed(1), list_add_all),
    ("contains", Arity::Fixed(1), list_contains),
    ("indexOf", Arity::Fixed(1), list_index_of),
    ("isEmpty", Arity::Fixed(0), list_is_empty),
    ("join", Arity::Fixed(1), list_join),
    ("map", Arity::Fixed(1), list_map),
    ("filter", Arity::Fixed(1), list_filter),
    ("reduce", Arity::Fixed(2), list_reduce),
    ("remove", Arity::Fixed(1), list_remove),
];

const STR_METHODS: MethodTable = &[
    ("contains", Arity::Fixed(1), str_contains),
    ("index", Arity::Fixed(1), str_index),
    ("startsWith", Arity::Fixed(1), str_starts_with),
    ("endsWith", Arity::Fixed(1), str_ends_with),
    ("split", Arity::Fixed(1), str_split),
    ("trim", Arity::Fixed(0), str_trim),
    ("toUpper", Arity::Fixed(0), str_to_upper),
    ("toLower", Arity::Fixed(0), str_to_lower),
];

const DICT_METHODS: MethodTable = &[
    (
        "get",
        Arity::Multiple {
            required: 1,
            optional: 1,
        },
        dict_get,
    ),
    ("containsKey", Arity::Fixed(1), dict_contains_key),
    ("remove", Arity::Fixed(1), dict_remove),
    ("isEmpty", Arity::Fixed(0), dict_is_empty),
    ("keys", Arity::Fixed(0), dict_keys),
    ("values", Arity::Fixed(0), dict_values),
];

const SET_METHODS: MethodTable = &[
    ("add", Arity::Fixed(1), set_add),
    ("contains", Arity::Fixed(1), set_contains),
    ("remove", Arity::Fixed(1), set_remove),
    ("isEmpty", Arity::Fixed(0), set_is_empty),
];

const ITER_METHODS: MethodTable = &[
    ("next", Arity::Fixed(0), iter_next),
    ("get", Arity::Fixed(0), iter_get),
];

/// Reads field `name` of a value that is not a struct.
pub fn get_field(receiver: &Value, name: &str) -> Result<Value, ErrorKind> {
    let table = match receiver {
        Value::Null => return Err(ErrorKind::NullValue),
        Value::Error(err) => return error_field(err, name),
        Value::List(_) => LIST_METHODS,
        Value::Str(_) => STR_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::Set(_) => SET_METHODS,
        Value::Iter(_) => ITER_METHODS,
        _ => &[],
    };
    table
        .iter()
        .find(|(method, _, _)| *method == name)
        .map(|&(method, arity, func)| {
            NativeFunc::method(method, arity, func, receiver.clone()).into()
        })
        .ok_or_else(|| ErrorKind::NoSuchField(name.to_string()))
}

fn error_field(err: &RuntimeError, name: &str) -> Result<Value, ErrorKind> {
    match name {
        "kind" => Ok(Value::str(err.kind.name())),
        "msg" => Ok(Value::str(err.message())),
        "stackTrace" => Ok(Value::list(
            err.stack_trace
                .iter()
                .map(|entry| Value::str(format!("{}:{}", entry.module, entry.line)))
                .collect(),
        )),
        _ => Err(ErrorKind::NoSuchField(name.to_string())),
    }
}

// ============================================================================
// Receivers
// ============================================================================

fn list(args: &[Value]) -> Result<&Arc<RwLock<Vec<Value>>>, ErrorKind> {
    match args.first() {
        Some(Value::List(list)) => Ok(list),
        _ => Err(ErrorKind::type_mismatch("List")),
    }
}

fn string(args: &[Value]) -> Result<&str, ErrorKind> {
    match args.first() {
        Some(Value::Str(s)) => Ok(s),
        _ => Err(ErrorKind::type_mismatch("Str")),
    }
}

fn dict(args: &[Value]) -> Result<&Arc<RwLock<Dict>>, ErrorKind> {
    match args.first() {
        Some(Value::Dict(dict)) => Ok(dict),
        _ => Err(ErrorKind::type_mismatch("Dict")),
    }
}

fn set(args: &[Value]) -> Result<&Arc<RwLock<Set>>, ErrorKind> {
    match args.first() {
        Some(Value::Set(set)) => Ok(set),
        _ => Err(ErrorKind::type_mismatch("Set")),
    }
}

fn iter(args: &[Value]) -> Result<&Arc<Mutex<Iter>>, ErrorKind> {
    match args.first() {
        Some(Value::Iter(iter)) => Ok(iter),
        _ => Err(ErrorKind::type_mismatch("Iter")),
    }
}

fn str_arg(args: &[Value], index: usize) -> Result<&str, ErrorKind> {
    args[index].as_str()
}

// ============================================================================
// List
// ============================================================================

fn list_add(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    list(args)?.write().push(args[1].clone());
    Ok(Value::Null)
}

fn list_add_all(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let target = list(args)?;
    // Collected first, so adding a list to itself terminates.
    let mut source = Iter::new(&args[1])?;
    let mut items = Vec::new();
    while source.advance() {
        items.push(source.current());
    }
    target.write().extend(items);
    Ok(Value::Null)
}

fn list_contains(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let items = list(args)?.read().clone();
    Ok(Value::Bool(items.contains(&args[1])))
}

fn list_index_of(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let items = list(args)?.read().clone();
    let index = items.iter().position(|item| *item == args[1]);
    Ok(Value::Int(index.map_or(-1, |i| i as i64)))
}

fn list_is_empty(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Bool(list(args)?.read().is_empty()))
}

fn list_join(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let items = list(args)?.read().clone();
    let sep = str_arg(args, 1)?;
    let joined = items
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(sep);
    Ok(Value::from(joined))
}

fn list_map(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let items = list(args)?.read().clone();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(interp.call_value(&args[1], vec![item])?);
    }
    Ok(Value::list(out))
}

fn list_filter(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let items = list(args)?.read().clone();
    let mut out = Vec::new();
    for item in items {
        if interp.call_value(&args[1], vec![item.clone()])?.as_bool()? {
            out.push(item);
        }
    }
    Ok(Value::list(out))
}

fn list_reduce(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let items = list(args)?.read().clone();
    let mut acc = args[1].clone();
    for item in items {
        acc = interp.call_value(&args[2], vec![acc, item])?;
    }
    Ok(acc)
}

fn list_remove(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let index = args[1].as_int()?;
    let mut items = list(args)?.write();
    let len = items.len();
    match usize::try_from(index) {
        Ok(i) if i < len => Ok(items.remove(i)),
        _ => Err(ErrorKind::IndexOutOfBounds { index, len }.into()),
    }
}

// ============================================================================
// Str
// ============================================================================

fn str_contains(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Bool(string(args)?.contains(str_arg(args, 1)?)))
}

/// Position of the first occurrence, in characters, or -1.
fn str_index(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let s = string(args)?;
    let index = s
        .find(str_arg(args, 1)?)
        .map_or(-1, |byte| s[..byte].chars().count() as i64);
    Ok(Value::Int(index))
}

fn str_starts_with(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Bool(string(args)?.starts_with(str_arg(args, 1)?)))
}

fn str_ends_with(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Bool(string(args)?.ends_with(str_arg(args, 1)?)))
}

fn str_split(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let s = string(args)?;
    let sep = str_arg(args, 1)?;
    if sep.is_empty() {
        return Err(ErrorKind::invalid_argument("separator must not be empty").into());
    }
    Ok(Value::list(s.split(sep).map(Value::str).collect()))
}

fn str_trim(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::str(string(args)?.trim()))
}

fn str_to_upper(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::from(string(args)?.to_uppercase()))
}

fn str_to_lower(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::from(string(args)?.to_lowercase()))
}

// ============================================================================
// Dict
// ============================================================================

fn dict_get(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let key = args[1].to_key()?;
    let value = dict(args)?.read().get(&key).cloned();
    Ok(value.unwrap_or_else(|| args.get(2).cloned().unwrap_or_default()))
}

fn dict_contains_key(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let key = args[1].to_key()?;
    Ok(Value::Bool(dict(args)?.read().contains(&key)))
}

fn dict_remove(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let key = args[1].to_key()?;
    Ok(dict(args)?.write().remove(&key).unwrap_or_default())
}

fn dict_is_empty(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Bool(dict(args)?.read().is_empty()))
}

fn dict_keys(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let keys = dict(args)?.read().keys().map(HashKey::to_value).collect();
    Ok(Value::list(keys))
}

fn dict_values(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let values = dict(args)?.read().iter().map(|(_, v)| v.clone()).collect();
    Ok(Value::list(values))
}

// ============================================================================
// Set
// ============================================================================

fn set_add(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let key = args[1].to_key()?;
    set(args)?.write().insert(key, ());
    Ok(Value::Null)
}

fn set_contains(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let key = args[1].to_key()?;
    Ok(Value::Bool(set(args)?.read().contains(&key)))
}

fn set_remove(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let key = args[1].to_key()?;
    Ok(Value::Bool(set(args)?.write().remove(&key).is_some()))
}

fn set_is_empty(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Bool(set(args)?.read().is_empty()))
}

// ============================================================================
// Iter
// ============================================================================

fn iter_next(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::Bool(iter(args)?.lock().advance()))
}

fn iter_get(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(iter(args)?.lock().current())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TraceEntry;

    #[test]
    fn test_methods_are_bound_to_their_receiver() {
        let list = Value::list(Vec::new());
        let method = get_field(&list, "add").unwrap();
        match method {
            Value::Func(func) => assert_eq!(func.name(), "add"),
            other => panic!("expected a method, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_method() {
        let err = get_field(&Value::str("s"), "frobnicate").unwrap_err();
        assert_eq!(err.name(), "NoSuchField");
        let err = get_field(&Value::Null, "x").unwrap_err();
        assert_eq!(err.name(), "NullValue");
        assert!(get_field(&Value::Int(1), "add").is_err());
    }

    #[test]
    fn test_error_fields() {
        let err = Arc::new(RuntimeError::new(
            ErrorKind::DivideByZero,
            vec![TraceEntry {
                module: "main.glm".into(),
                line: 3,
            }],
        ));
        let value = Value::Error(err);
        assert_eq!(get_field(&value, "kind").unwrap(), Value::str("DivideByZero"));
        assert_eq!(get_field(&value, "msg").unwrap(), Value::str("DivideByZero"));
        assert_eq!(
            get_field(&value, "stackTrace").unwrap(),
            Value::list(vec![Value::str("main.glm:3")])
        );
    }
}
