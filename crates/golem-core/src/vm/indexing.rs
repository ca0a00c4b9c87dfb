// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Indexing and slicing.
//!
//! Lists, tuples, strings and ranges are indexed by an Int in `0..len`;
//! strings are indexed by character. Dicts are indexed by key, and a
//! missing key reads as `null`.

use crate::error::ErrorKind;
use crate::runtime::Value;

fn position(index: &Value, len: usize) -> Result<usize, ErrorKind> {
    let index = index.as_int()?;
    match usize::try_from(index) {
        Ok(i) if i < len => Ok(i),
        _ => Err(ErrorKind::IndexOutOfBounds { index, len }),
    }
}

/// `object[index]`
pub fn get_index(object: &Value, index: &Value) -> Result<Value, ErrorKind> {
    match object {
        Value::List(items) => {
            let items = items.read();
            Ok(items[position(index, items.len())?].clone())
        }
        Value::Tuple(items) => Ok(items[position(index, items.len())?].clone()),
        Value::Str(s) => {
            let len = s.chars().count();
            let i = position(index, len)?;
            Ok(s.chars().nth(i).map(|c| Value::str(c.to_string())).unwrap_or_default())
        }
        Value::Range(range) => {
            let i = position(index, range.len())?;
            Ok(range.get(i).map(Value::Int).unwrap_or_default())
        }
        Value::Dict(dict) => {
            let key = index.to_key()?;
            Ok(dict.read().get(&key).cloned().unwrap_or_default())
        }
        Value::Null => Err(ErrorKind::NullValue),
        _ => Err(ErrorKind::type_mismatch("Indexable")),
    }
}

/// `object[index] = value`
pub fn set_index(object: &Value, index: &Value, value: Value) -> Result<(), ErrorKind> {
    match object {
        Value::List(items) => {
            let mut items = items.write();
            let i = position(index, items.len())?;
            items[i] = value;
            Ok(())
        }
        Value::Dict(dict) => {
            let key = index.to_key()?;
            dict.write().insert(key, value);
            Ok(())
        }
        Value::Null => Err(ErrorKind::NullValue),
        _ => Err(ErrorKind::type_mismatch("List or Dict")),
    }
}

fn bounds(from: Option<&Value>, to: Option<&Value>, len: usize) -> Result<(usize, usize), ErrorKind> {
    let bound = |value: Option<&Value>, default: usize| -> Result<(i64, usize), ErrorKind> {
        match value {
            Some(value) => {
                let n = value.as_int()?;
                match usize::try_from(n) {
                    Ok(i) if i <= len => Ok((n, i)),
                    _ => Err(ErrorKind::IndexOutOfBounds { index: n, len }),
                }
            }
            None => Ok((default as i64, default)),
        }
    };
    let (_, from) = bound(from, 0)?;
    let (to_index, to) = bound(to, len)?;
    if from > to {
        return Err(ErrorKind::IndexOutOfBounds {
            index: to_index,
            len,
        });
    }
    Ok((from, to))
}

/// `object[from:to]`, with either bound optional.
pub fn slice(object: &Value, from: Option<&Value>, to: Option<&Value>) -> Result<Value, ErrorKind> {
    match object {
        Value::List(items) => {
            let items = items.read();
            let (from, to) = bounds(from, to, items.len())?;
            Ok(Value::list(items[from..to].to_vec()))
        }
        Value::Tuple(items) => {
            let (from, to) = bounds(from, to, items.len())?;
            Ok(Value::tuple(items[from..to].to_vec()))
        }
        Value::Str(s) => {
            let (from, to) = bounds(from, to, s.chars().count())?;
            let sliced: String = s.chars().skip(from).take(to - from).collect();
            Ok(Value::from(sliced))
        }
        Value::Null => Err(ErrorKind::NullValue),
        _ => Err(ErrorKind::type_mismatch("Sliceable")),
    }
}
