// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Golem function representation.

use std::fmt;
use std::sync::Arc;

use super::value::{Ref, Value};
use crate::compiler::{Arity, FuncTemplate, Module};
use crate::error::Fault;
use crate::vm::Interpreter;

/// A native (Rust) function.
///
/// Methods receive their receiver as the first argument.
pub type NativeFn = fn(&mut Interpreter, &[Value]) -> Result<Value, Fault>;

/// A callable value: a closure or a native function.
#[derive(Clone)]
pub enum Func {
    /// A closure over a compiled template
    Bytecode(Arc<BytecodeFunc>),
    /// A native Rust function
    Native(Arc<NativeFunc>),
}

impl Func {
    /// The function's name.
    pub fn name(&self) -> &str {
        match self {
            Func::Bytecode(f) => &f.template().name,
            Func::Native(f) => &f.name,
        }
    }

    /// The function's accepted argument counts.
    pub fn arity(&self) -> Arity {
        match self {
            Func::Bytecode(f) => f.template().arity,
            Func::Native(f) => f.arity,
        }
    }

    /// Returns true if both values are the same function instance.
    pub fn ptr_eq(&self, other: &Func) -> bool {
        match (self, other) {
            (Func::Bytecode(a), Func::Bytecode(b)) => Arc::ptr_eq(a, b),
            (Func::Native(a), Func::Native(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Func::Bytecode(func) => write!(f, "fn {}", func.template().name),
            Func::Native(func) => write!(f, "fn {} (native)", func.name),
        }
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Func::Bytecode(func) => write!(f, "BytecodeFunc({})", func.template().name),
            Func::Native(func) => write!(f, "NativeFunc({})", func.name),
        }
    }
}

/// A closure: a template of a module plus the cells it captured.
pub struct BytecodeFunc {
    /// The module whose pool holds the template
    pub module: Arc<Module>,
    /// Index of the template in the pool
    pub template: usize,
    /// Captured variable cells, in capture slot order
    pub captures: Vec<Ref>,
}

impl BytecodeFunc {
    /// The compiled function body.
    pub fn template(&self) -> &FuncTemplate {
        self.module.template(self.template)
    }
}

/// A native function, optionally bound to a receiver.
pub struct NativeFunc {
    /// Function name
    pub name: Arc<str>,
    /// Accepted argument counts, not counting the receiver
    pub arity: Arity,
    /// The implementation
    pub func: NativeFn,
    /// The value a method was read from
    pub receiver: Option<Value>,
}

impl NativeFunc {
    /// Creates an unbound native function.
    pub fn new(name: &str, arity: Arity, func: NativeFn) -> Self {
        Self {
            name: name.into(),
            arity,
            func,
            receiver: None,
        }
    }

    /// Creates a method bound to `receiver`.
    pub fn method(name: &str, arity: Arity, func: NativeFn, receiver: Value) -> Self {
        Self {
            name: name.into(),
            arity,
            func,
            receiver: Some(receiver),
        }
    }
}

impl From<NativeFunc> for Value {
    fn from(func: NativeFunc) -> Self {
        Value::Func(Func::Native(Arc::new(func)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(_: &mut Interpreter, _: &[Value]) -> Result<Value, Fault> {
        Ok(Value::Int(42))
    }

    #[test]
    fn test_native_identity() {
        let a = Func::Native(Arc::new(NativeFunc::new("answer", Arity::Fixed(0), answer)));
        let b = Func::Native(Arc::new(NativeFunc::new("answer", Arity::Fixed(0), answer)));
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.name(), "answer");
        assert_eq!(a.to_string(), "fn answer (native)");
    }

    #[test]
    fn test_method_keeps_receiver() {
        let method = NativeFunc::method("len", Arity::Fixed(0), answer, Value::str("abc"));
        assert_eq!(method.receiver, Some(Value::str("abc")));
        assert_eq!(method.arity, Arity::Fixed(0));
    }
}
