// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Builtin functions.
//!
//! The builtin table is deliberately narrow. It is fixed before any code is
//! compiled against it: the compiler resolves a bare identifier that names
//! no variable to the builtin's index, and `LoadBuiltin` reads the value at
//! that index.
//!
//! | Name      | Arity  | Module    |
//! |-----------|--------|-----------|
//! | `print`   | any    | `console` |
//! | `println` | any    | `console` |
//! | `str`     | 1      | `lang`    |
//! | `len`     | 1      | `lang`    |
//! | `range`   | 1 to 3 | `lang`    |
//! | `assert`  | 1      | `lang`    |
//! | `type`    | 1      | `lang`    |
//! | `iter`    | 1      | `lang`    |

pub mod console;
pub mod lang;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::analyzer::BuiltinLookup;
use crate::compiler::Arity;
use crate::runtime::{NativeFn, NativeFunc, Value};

/// The table of builtin values, indexed by the position compiled code uses.
#[derive(Debug, Clone, Default)]
pub struct Builtins {
    names: Vec<Arc<str>>,
    values: Vec<Value>,
    index: FxHashMap<String, u16>,
}

impl Builtins {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the table every engine starts with.
    pub fn standard() -> Self {
        let mut builtins = Self::new();
        builtins.define_fn("print", Arity::Variadic { required: 0 }, console::print);
        builtins.define_fn("println", Arity::Variadic { required: 0 }, console::println);
        builtins.define_fn("str", Arity::Fixed(1), lang::str);
        builtins.define_fn("len", Arity::Fixed(1), lang::len);
        builtins.define_fn(
            "range",
            Arity::Multiple {
                required: 1,
                optional: 2,
            },
            lang::range,
        );
        builtins.define_fn("assert", Arity::Fixed(1), lang::assert);
        builtins.define_fn("type", Arity::Fixed(1), lang::type_of);
        builtins.define_fn("iter", Arity::Fixed(1), lang::iter);
        builtins
    }

    /// Binds `name` to `value`, replacing an earlier definition in place.
    ///
    /// # Panics
    ///
    /// Panics if the table would exceed `u16::MAX` entries.
    pub fn define(&mut self, name: &str, value: Value) -> u16 {
        if let Some(&idx) = self.index.get(name) {
            self.values[idx as usize] = value;
            return idx;
        }
        let idx = u16::try_from(self.values.len()).unwrap_or_else(|_| {
            panic!("builtin table is full; cannot define '{name}'");
        });
        self.names.push(Arc::from(name));
        self.values.push(value);
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Binds `name` to a native function.
    pub fn define_fn(&mut self, name: &str, arity: Arity, func: NativeFn) -> u16 {
        self.define(name, NativeFunc::new(name, arity, func).into())
    }

    /// Returns the value at `index`.
    ///
    /// Compiled code only references indices this table handed out.
    pub fn value(&self, index: u16) -> &Value {
        &self.values[index as usize]
    }

    /// Returns the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&idx| self.value(idx))
    }

    /// The builtin names, in index order.
    pub fn names(&self) -> &[Arc<str>] {
        &self.names
    }

    /// Number of builtins.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl BuiltinLookup for Builtins {
    fn lookup(&self, name: &str) -> Option<u16> {
        self.index.lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table() {
        let builtins = Builtins::standard();
        assert_eq!(builtins.lookup("print"), Some(0));
        assert_eq!(builtins.lookup("iter"), Some(7));
        assert_eq!(builtins.lookup("nope"), None);
        assert_eq!(builtins.len(), 8);
        assert_eq!(builtins.names()[3].as_ref(), "len");
    }

    #[test]
    fn test_redefinition_keeps_index() {
        let mut builtins = Builtins::standard();
        let idx = builtins.define("len", Value::Int(0));
        assert_eq!(idx, 3);
        assert_eq!(builtins.get("len"), Some(&Value::Int(0)));
        assert_eq!(builtins.len(), 8);
    }

    #[test]
    fn test_host_definitions_are_appended() {
        let mut builtins = Builtins::new();
        assert!(builtins.is_empty());
        assert_eq!(builtins.define("answer", Value::Int(42)), 0);
        assert_eq!(builtins.value(0), &Value::Int(42));
    }
}
