// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Struct instances.
//!
//! Structs are created by struct literals and also represent the contents
//! of an imported module, whose fields alias the module's top-level
//! variables.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::value::{Ref, Value};
use crate::error::ErrorKind;

/// How one struct field stores its value.
#[derive(Debug)]
pub enum Field {
    /// A value owned by the struct
    Plain {
        /// Current value
        value: RwLock<Value>,
        /// Whether the field was declared `const`
        readonly: bool,
    },
    /// A `prop` field backed by functions
    Property {
        /// Called with no arguments on read
        getter: Value,
        /// Called with the new value on write; readonly without one
        setter: Option<Value>,
    },
    /// A field aliasing a variable cell, used for module contents
    Cell {
        /// The aliased variable
        cell: Ref,
        /// Whether writes are rejected
        readonly: bool,
    },
}

impl Field {
    /// Creates a plain field.
    pub fn plain(value: Value, readonly: bool) -> Self {
        Field::Plain {
            value: RwLock::new(value),
            readonly,
        }
    }
}

/// The result of reading a field.
#[derive(Debug)]
pub enum FieldRead {
    /// The field's value
    Value(Value),
    /// A property: the getter must be called to produce the value
    Getter(Value),
}

/// The result of writing a field.
#[derive(Debug)]
pub enum FieldWrite {
    /// The value was stored
    Stored,
    /// A property: the setter must be called with the value
    Setter(Value),
}

/// A struct instance.
#[derive(Debug, Default)]
pub struct Struct {
    name: Option<Arc<str>>,
    fields: Vec<(Arc<str>, Field)>,
}

impl Struct {
    /// Creates an anonymous struct.
    pub fn new(fields: Vec<(Arc<str>, Field)>) -> Self {
        Self { name: None, fields }
    }

    /// Creates the contents value of module `name`.
    pub fn module(name: Arc<str>, fields: Vec<(Arc<str>, Field)>) -> Self {
        Self {
            name: Some(name),
            fields,
        }
    }

    /// The module name, for module contents.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns true if the struct has a field named `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Iterates over the field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.fields.iter().map(|(name, _)| name)
    }

    fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, f)| f)
    }

    /// Reads field `name`.
    pub fn get(&self, name: &str) -> Result<FieldRead, ErrorKind> {
        match self.field(name) {
            Some(Field::Plain { value, .. }) => Ok(FieldRead::Value(value.read().clone())),
            Some(Field::Cell { cell, .. }) => Ok(FieldRead::Value(cell.read().clone())),
            Some(Field::Property { getter, .. }) => Ok(FieldRead::Getter(getter.clone())),
            None => Err(ErrorKind::NoSuchField(name.to_string())),
        }
    }

    /// Writes field `name`.
    pub fn set(&self, name: &str, new: Value) -> Result<FieldWrite, ErrorKind> {
        match self.field(name) {
            Some(Field::Plain {
                value,
                readonly: false,
            }) => {
                *value.write() = new;
                Ok(FieldWrite::Stored)
            }
            Some(Field::Cell {
                cell,
                readonly: false,
            }) => {
                *cell.write() = new;
                Ok(FieldWrite::Stored)
            }
            Some(Field::Property {
                setter: Some(setter),
                ..
            }) => Ok(FieldWrite::Setter(setter.clone())),
            Some(_) => Err(ErrorKind::ReadonlyField(name.to_string())),
            None => Err(ErrorKind::NoSuchField(name.to_string())),
        }
    }
}

impl fmt::Display for Struct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            return write!(f, "module {name}");
        }
        f.write_str("struct {")?;
        for (i, (name, field)) in self.fields.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            match field {
                Field::Plain { value, .. } => {
                    let value = value.read().clone();
                    write!(f, "{sep}{name}: {}", value.repr())?
                }
                Field::Cell { cell, .. } => {
                    let value = cell.read().clone();
                    write!(f, "{sep}{name}: {}", value.repr())?
                }
                Field::Property { .. } => write!(f, "{sep}{name}: prop")?,
            }
        }
        if self.fields.is_empty() {
            f.write_str("}")
        } else {
            f.write_str(" }")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::new_ref;

    fn point() -> Struct {
        Struct::new(vec![
            ("x".into(), Field::plain(Value::Int(1), false)),
            ("y".into(), Field::plain(Value::Int(2), true)),
        ])
    }

    #[test]
    fn test_plain_fields() {
        let s = point();
        assert!(matches!(s.get("x"), Ok(FieldRead::Value(Value::Int(1)))));
        assert!(matches!(s.set("x", Value::Int(5)), Ok(FieldWrite::Stored)));
        assert!(matches!(s.get("x"), Ok(FieldRead::Value(Value::Int(5)))));
    }

    #[test]
    fn test_readonly_and_missing_fields() {
        let s = point();
        let err = s.set("y", Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "ReadonlyField: field 'y' is readonly");
        let err = s.get("z").unwrap_err();
        assert_eq!(err.to_string(), "NoSuchField: field 'z' not found");
    }

    #[test]
    fn test_cell_fields_alias_variables() {
        let cell = new_ref(Value::Int(1));
        let module = Struct::module(
            "m".into(),
            vec![("a".into(), Field::Cell { cell: cell.clone(), readonly: false })],
        );
        *cell.write() = Value::Int(9);
        assert!(matches!(module.get("a"), Ok(FieldRead::Value(Value::Int(9)))));
        module.set("a", Value::Int(3)).unwrap();
        assert_eq!(*cell.read(), Value::Int(3));
        assert_eq!(module.to_string(), "module m");
    }

    #[test]
    fn test_display() {
        assert_eq!(point().to_string(), "struct { x: 1, y: 2 }");
    }
}
