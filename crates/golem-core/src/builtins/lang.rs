// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Conversion, inspection and iteration builtins.

use crate::error::{ErrorKind, Fault};
use crate::runtime::iterator::iterate;
use crate::runtime::{RangeValue, Value};
use crate::vm::Interpreter;

/// `str(v)`: the display form of `v`.
pub fn str(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(match &args[0] {
        Value::Str(_) => args[0].clone(),
        other => Value::from(other.to_string()),
    })
}

/// `len(v)`: element count of a sized value; strings count characters.
pub fn len(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let n = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.read().len(),
        Value::Tuple(items) => items.len(),
        Value::Dict(dict) => dict.read().len(),
        Value::Set(set) => set.read().len(),
        Value::Range(range) => range.len(),
        Value::Null => return Err(ErrorKind::NullValue.into()),
        _ => return Err(ErrorKind::type_mismatch("Sized").into()),
    };
    Ok(Value::Int(n as i64))
}

/// `range(end)` or `range(start, end[, step])`.
pub fn range(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    let ints = args
        .iter()
        .map(Value::as_int)
        .collect::<Result<Vec<_>, _>>()?;
    let range = match ints[..] {
        [end] => RangeValue::new(0, end, 1)?,
        [start, end] => RangeValue::new(start, end, 1)?,
        [start, end, step] => RangeValue::new(start, end, step)?,
        _ => unreachable!("range arity is checked before the call"),
    };
    Ok(Value::Range(range))
}

/// `assert(cond)`: raises `AssertionFailed` unless `cond` is true.
pub fn assert(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    if args[0].as_bool()? {
        Ok(Value::Null)
    } else {
        Err(ErrorKind::AssertionFailed.into())
    }
}

/// `type(v)`: the name of the value's type.
pub fn type_of(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(Value::str(args[0].type_name()))
}

/// `iter(v)`: an iterator over `v`.
pub fn iter(_: &mut Interpreter, args: &[Value]) -> Result<Value, Fault> {
    Ok(iterate(&args[0])?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::builtins::Builtins;
    use crate::config::Config;
    use crate::vm::Runtime;

    fn interp() -> Interpreter {
        Interpreter::new(Arc::new(Runtime::new(Config::new(), Builtins::standard())))
    }

    fn kind(result: Result<Value, Fault>) -> &'static str {
        match result {
            Err(Fault::Kind(kind)) => kind.name(),
            other => panic!("expected an error, got {other:?}"),
        }
    }

    #[test]
    fn test_str() {
        let mut interp = interp();
        assert_eq!(str(&mut interp, &[Value::Int(12)]).unwrap(), Value::str("12"));
        assert_eq!(str(&mut interp, &[Value::str("x")]).unwrap(), Value::str("x"));
    }

    #[test]
    fn test_len() {
        let mut interp = interp();
        assert_eq!(len(&mut interp, &[Value::str("héllo")]).unwrap(), Value::Int(5));
        let list = Value::list(vec![Value::Null, Value::Null]);
        assert_eq!(len(&mut interp, &[list]).unwrap(), Value::Int(2));
        assert_eq!(kind(len(&mut interp, &[Value::Int(1)])), "TypeMismatch");
        assert_eq!(kind(len(&mut interp, &[Value::Null])), "NullValue");
    }

    #[test]
    fn test_range() {
        let mut interp = interp();
        let r = range(&mut interp, &[Value::Int(2), Value::Int(10), Value::Int(3)]).unwrap();
        assert_eq!(r.to_string(), RangeValue::new(2, 10, 3).unwrap().to_string());
        let r = range(&mut interp, &[Value::Int(4)]).unwrap();
        assert_eq!(len(&mut interp, &[r]).unwrap(), Value::Int(4));
        assert_eq!(kind(range(&mut interp, &[Value::Float(1.0)])), "TypeMismatch");
    }

    #[test]
    fn test_assert() {
        let mut interp = interp();
        assert!(assert(&mut interp, &[Value::Bool(true)]).is_ok());
        assert_eq!(kind(assert(&mut interp, &[Value::Bool(false)])), "AssertionFailed");
    }

    #[test]
    fn test_type_and_iter() {
        let mut interp = interp();
        assert_eq!(type_of(&mut interp, &[Value::Int(1)]).unwrap(), Value::str("Int"));
        let it = iter(&mut interp, &[Value::list(vec![])]).unwrap();
        assert_eq!(type_of(&mut interp, &[it]).unwrap(), Value::str("Iter"));
    }
}
