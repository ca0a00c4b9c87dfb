// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Operator semantics.
//!
//! Int arithmetic wraps on overflow. Mixing Int and Float promotes to
//! Float. `+` concatenates when either operand is a Str, and joins two
//! lists into a new one.

use std::cmp::Ordering;

use super::comparison::{cmp, compare, equals};
use crate::compiler::Opcode;
use crate::error::ErrorKind;
use crate::runtime::Value;

enum Operands {
    Int(i64, i64),
    Float(f64, f64),
}

fn numbers(a: &Value, b: &Value) -> Result<Operands, ErrorKind> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Ok(Operands::Int(*a, *b)),
        (Value::Int(a), Value::Float(b)) => Ok(Operands::Float(*a as f64, *b)),
        (Value::Float(a), Value::Int(b)) => Ok(Operands::Float(*a, *b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Operands::Float(*a, *b)),
        _ => Err(ErrorKind::type_mismatch("Number")),
    }
}

fn ints(a: &Value, b: &Value) -> Result<(i64, i64), ErrorKind> {
    Ok((a.as_int()?, b.as_int()?))
}

/// Applies the binary operator `op` to `a` and `b`.
pub fn binary(op: Opcode, a: &Value, b: &Value) -> Result<Value, ErrorKind> {
    match op {
        Opcode::Eq => Ok(Value::Bool(equals(a, b))),
        Opcode::Ne => Ok(Value::Bool(!equals(a, b))),
        Opcode::Lt => Ok(Value::Bool(compare(a, b)? == Ordering::Less)),
        Opcode::Lte => Ok(Value::Bool(compare(a, b)? != Ordering::Greater)),
        Opcode::Gt => Ok(Value::Bool(compare(a, b)? == Ordering::Greater)),
        Opcode::Gte => Ok(Value::Bool(compare(a, b)? != Ordering::Less)),
        Opcode::Cmp => cmp(a, b),
        Opcode::Add => add(a, b),
        Opcode::Sub => match numbers(a, b)? {
            Operands::Int(a, b) => Ok(Value::Int(a.wrapping_sub(b))),
            Operands::Float(a, b) => Ok(Value::Float(a - b)),
        },
        Opcode::Mul => match numbers(a, b)? {
            Operands::Int(a, b) => Ok(Value::Int(a.wrapping_mul(b))),
            Operands::Float(a, b) => Ok(Value::Float(a * b)),
        },
        Opcode::Div => match numbers(a, b)? {
            Operands::Int(_, 0) => Err(ErrorKind::DivideByZero),
            Operands::Int(a, b) => Ok(Value::Int(a.wrapping_div(b))),
            Operands::Float(a, b) => Ok(Value::Float(a / b)),
        },
        Opcode::Rem => match numbers(a, b)? {
            Operands::Int(_, 0) => Err(ErrorKind::DivideByZero),
            Operands::Int(a, b) => Ok(Value::Int(a.wrapping_rem(b))),
            Operands::Float(a, b) => Ok(Value::Float(a % b)),
        },
        Opcode::BitAnd => ints(a, b).map(|(a, b)| Value::Int(a & b)),
        Opcode::BitOr => ints(a, b).map(|(a, b)| Value::Int(a | b)),
        Opcode::BitXor => ints(a, b).map(|(a, b)| Value::Int(a ^ b)),
        Opcode::LeftShift => {
            let (a, b) = ints(a, b)?;
            shift_amount(b).map(|b| Value::Int(a.wrapping_shl(b)))
        }
        Opcode::RightShift => {
            let (a, b) = ints(a, b)?;
            shift_amount(b).map(|b| Value::Int(a.wrapping_shr(b)))
        }
        other => unreachable!("{other:?} is not a binary operator"),
    }
}

fn shift_amount(n: i64) -> Result<u32, ErrorKind> {
    match u32::try_from(n) {
        Ok(n) if n < i64::BITS => Ok(n),
        _ => Err(ErrorKind::invalid_argument(format!("shift amount {n} out of range"))),
    }
}

fn add(a: &Value, b: &Value) -> Result<Value, ErrorKind> {
    match (a, b) {
        (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::from(format!("{a}{b}"))),
        (Value::List(x), Value::List(y)) => {
            let mut items = x.read().clone();
            items.extend(y.read().iter().cloned());
            Ok(Value::list(items))
        }
        _ => match numbers(a, b)? {
            Operands::Int(a, b) => Ok(Value::Int(a.wrapping_add(b))),
            Operands::Float(a, b) => Ok(Value::Float(a + b)),
        },
    }
}

/// Unary `-`.
pub fn negate(value: &Value) -> Result<Value, ErrorKind> {
    match value {
        Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
        Value::Float(n) => Ok(Value::Float(-n)),
        _ => Err(ErrorKind::type_mismatch("Number")),
    }
}

/// Unary `~`.
pub fn complement(value: &Value) -> Result<Value, ErrorKind> {
    Ok(Value::Int(!value.as_int()?))
}

/// Unary `!`.
pub fn not(value: &Value) -> Result<Value, ErrorKind> {
    Ok(Value::Bool(!value.as_bool()?))
}
