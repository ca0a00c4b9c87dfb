// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compiled modules and their pools.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::template::FuncTemplate;
use crate::error::CompileError;

/// A literal value stored in a module's constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// `null`
    Null,
    /// A boolean
    Bool(bool),
    /// An integer
    Int(i64),
    /// A float
    Float(f64),
    /// A string, also used for field and module names
    Str(Arc<str>),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => write!(f, "null"),
            Constant::Bool(b) => write!(f, "{b}"),
            Constant::Int(n) => write!(f, "{n}"),
            Constant::Float(n) => write!(f, "{n:?}"),
            Constant::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Deduplication key: floats compare by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(Arc<str>),
}

impl From<&Constant> for ConstKey {
    fn from(constant: &Constant) -> Self {
        match constant {
            Constant::Null => ConstKey::Null,
            Constant::Bool(b) => ConstKey::Bool(*b),
            Constant::Int(n) => ConstKey::Int(*n),
            Constant::Float(n) => ConstKey::Float(n.to_bits()),
            Constant::Str(s) => ConstKey::Str(s.clone()),
        }
    }
}

/// Builds a deduplicated constant pool during compilation.
#[derive(Debug, Default)]
pub struct ConstantPool {
    indices: FxHashMap<ConstKey, u16>,
}

impl ConstantPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `constant`, adding it if it is new.
    pub fn add(&mut self, constant: Constant) -> Result<u16, CompileError> {
        let key = ConstKey::from(&constant);
        if let Some(&index) = self.indices.get(&key) {
            return Ok(index);
        }
        let index = u16::try_from(self.indices.len()).map_err(|_| CompileError::TooManyConstants)?;
        self.indices.insert(key, index);
        Ok(index)
    }

    /// Number of distinct constants.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns true if no constant was added.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Flattens the pool into a list ordered by index.
    pub fn into_vec(self) -> Vec<Constant> {
        let mut entries: Vec<_> = self.indices.into_iter().collect();
        entries.sort_by_key(|(_, index)| *index);
        entries
            .into_iter()
            .map(|(key, _)| match key {
                ConstKey::Null => Constant::Null,
                ConstKey::Bool(b) => Constant::Bool(b),
                ConstKey::Int(n) => Constant::Int(n),
                ConstKey::Float(bits) => Constant::Float(f64::from_bits(bits)),
                ConstKey::Str(s) => Constant::Str(s),
            })
            .collect()
    }
}

/// How a struct literal defines one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A plain read-write field; consumes one value
    Field,
    /// A `const` field; consumes one value
    Readonly,
    /// A `prop` field; consumes a getter and a setter (or `null`)
    Property {
        /// Whether a setter was given
        has_setter: bool,
    },
}

/// The field layout of one struct literal.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    /// Field names and kinds, in source order
    pub fields: Vec<(Arc<str>, FieldKind)>,
}

impl StructDef {
    /// Number of stack values `NewStruct` consumes for this definition.
    pub fn arity(&self) -> usize {
        self.fields
            .iter()
            .map(|(_, kind)| match kind {
                FieldKind::Property { .. } => 2,
                _ => 1,
            })
            .sum()
    }
}

/// A module's constants, function templates and struct definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pool {
    /// Literal values, in insertion order
    pub constants: Vec<Constant>,
    /// Function templates; index 0 is the module's init function
    pub templates: Vec<FuncTemplate>,
    /// Struct literal layouts
    pub struct_defs: Vec<StructDef>,
}

/// How a top-level declaration is exposed on the module value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `let`: readable and writable
    Let,
    /// `const`: readonly
    Const,
    /// Named `fn`: readonly
    Fn,
}

impl ContentKind {
    /// Returns true if the field may not be assigned from outside.
    pub fn is_readonly(self) -> bool {
        !matches!(self, ContentKind::Let)
    }
}

/// One top-level declaration exposed by a module.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentEntry {
    /// The declared name
    pub name: Arc<str>,
    /// What kind of declaration it was
    pub kind: ContentKind,
    /// Index of the init function's local slot holding it
    pub slot: u16,
}

/// A compiled module.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Module name
    pub name: Arc<str>,
    /// Source path, shown in stack traces
    pub path: Arc<str>,
    /// Constants, templates and struct definitions
    pub pool: Pool,
    /// Top-level declarations exposed to importers
    pub contents: Vec<ContentEntry>,
    /// Imported module names, in source order
    pub imports: Vec<Arc<str>>,
}

impl Module {
    /// Returns the template at `index`.
    pub fn template(&self, index: usize) -> &FuncTemplate {
        &self.pool.templates[index]
    }

    /// Returns the string constant at `index`.
    ///
    /// Compiled code only references string constants where a name is
    /// expected, so anything else is an invariant violation.
    pub fn name_at(&self, index: u16) -> &Arc<str> {
        match &self.pool.constants[index as usize] {
            Constant::Str(s) => s,
            other => unreachable!("constant {index} is not a name: {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_are_deduplicated() {
        let mut pool = ConstantPool::new();
        let a = pool.add(Constant::Int(42)).unwrap();
        let b = pool.add(Constant::Str("x".into())).unwrap();
        let c = pool.add(Constant::Int(42)).unwrap();
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_int_and_float_are_distinct() {
        let mut pool = ConstantPool::new();
        let a = pool.add(Constant::Int(2)).unwrap();
        let b = pool.add(Constant::Float(2.0)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_flatten_keeps_insertion_order() {
        let mut pool = ConstantPool::new();
        pool.add(Constant::Str("b".into())).unwrap();
        pool.add(Constant::Float(1.5)).unwrap();
        pool.add(Constant::Int(9)).unwrap();
        pool.add(Constant::Str("b".into())).unwrap();
        assert_eq!(
            pool.into_vec(),
            vec![
                Constant::Str("b".into()),
                Constant::Float(1.5),
                Constant::Int(9)
            ]
        );
    }

    #[test]
    fn test_struct_def_arity() {
        let def = StructDef {
            fields: vec![
                ("a".into(), FieldKind::Field),
                ("b".into(), FieldKind::Readonly),
                ("c".into(), FieldKind::Property { has_setter: false }),
            ],
        };
        assert_eq!(def.arity(), 4);
    }

    #[test]
    fn test_constant_display() {
        assert_eq!(Constant::Float(1.0).to_string(), "1.0");
        assert_eq!(Constant::Str("hi".into()).to_string(), "\"hi\"");
    }
}
