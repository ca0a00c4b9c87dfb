// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Function templates: the compiled, shareable form of a function literal.

use std::sync::Arc;

use super::module::Constant;
use crate::error::ErrorKind;

/// The argument counts a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments
    Fixed(u16),
    /// At least `required`; the rest are collected into a list
    Variadic {
        /// Number of leading arguments that must be present
        required: u16,
    },
    /// Between `required` and `required + optional`; missing optional
    /// arguments take their default values
    Multiple {
        /// Number of leading arguments that must be present
        required: u16,
        /// Number of trailing arguments that may be omitted
        optional: u16,
    },
}

impl Arity {
    /// Checks an argument count against this arity.
    pub fn check(&self, argc: usize) -> Result<(), ErrorKind> {
        let ok = match *self {
            Arity::Fixed(n) => argc == n as usize,
            Arity::Variadic { required } => argc >= required as usize,
            Arity::Multiple { required, optional } => {
                argc >= required as usize && argc <= required as usize + optional as usize
            }
        };
        if ok {
            Ok(())
        } else {
            Err(ErrorKind::ArityMismatch {
                expected: self.to_string(),
                actual: argc,
            })
        }
    }

    /// Number of arguments that must always be supplied.
    pub fn required(&self) -> usize {
        match *self {
            Arity::Fixed(n) => n as usize,
            Arity::Variadic { required } | Arity::Multiple { required, .. } => {
                required as usize
            }
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Arity::Fixed(n) => write!(f, "{n}"),
            Arity::Variadic { required } => write!(f, "at least {required}"),
            Arity::Multiple { required, optional } => {
                write!(f, "{required} to {}", required as usize + optional as usize)
            }
        }
    }
}

/// A half-open range of bytecode offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// First offset of the region
    pub begin: u16,
    /// First offset after the region
    pub end: u16,
}

/// The reach of one try construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorHandler {
    /// First offset after the whole construct
    pub end: u16,
    /// The catch clause, which starts by storing the caught value
    pub catch: Option<Region>,
    /// The finally clause
    pub finally: Option<Region>,
}

/// A line-number table entry: from `offset` on, code belongs to `line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    /// First bytecode offset of the run
    pub offset: u16,
    /// Source line
    pub line: u32,
}

/// A compiled function body, shared by every closure created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncTemplate {
    /// Function name, or `<anonymous>`
    pub name: Arc<str>,
    /// Accepted argument counts
    pub arity: Arity,
    /// Default values of optional parameters, in order
    pub defaults: Vec<Constant>,
    /// Number of capture slots
    pub num_captures: u16,
    /// Number of local slots, parameters included
    pub num_locals: u16,
    /// Encoded instructions
    pub bytecode: Vec<u8>,
    /// Sparse line table, ordered by offset
    pub line_numbers: Vec<LineEntry>,
    /// Error handlers, indexed by `PushTry`
    pub handlers: Vec<ErrorHandler>,
}

impl FuncTemplate {
    /// Returns the source line of the instruction at `offset`.
    pub fn line_at(&self, offset: usize) -> u32 {
        let idx = self
            .line_numbers
            .partition_point(|entry| entry.offset as usize <= offset);
        match idx {
            0 => 0,
            i => self.line_numbers[i - 1].line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_arity() {
        assert!(Arity::Fixed(2).check(2).is_ok());
        let err = Arity::Fixed(1).check(2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ArityMismatch: expected 1 argument(s), got 2"
        );
    }

    #[test]
    fn test_variadic_arity() {
        let arity = Arity::Variadic { required: 1 };
        assert!(arity.check(1).is_ok());
        assert!(arity.check(5).is_ok());
        assert_eq!(
            arity.check(0).unwrap_err().to_string(),
            "ArityMismatch: expected at least 1 argument(s), got 0"
        );
    }

    #[test]
    fn test_multiple_arity() {
        let arity = Arity::Multiple {
            required: 1,
            optional: 2,
        };
        assert!(arity.check(1).is_ok());
        assert!(arity.check(3).is_ok());
        assert!(arity.check(4).is_err());
        assert_eq!(arity.to_string(), "1 to 3");
        assert_eq!(arity.required(), 1);
    }

    #[test]
    fn test_line_lookup() {
        let template = FuncTemplate {
            name: "f".into(),
            arity: Arity::Fixed(0),
            defaults: Vec::new(),
            num_captures: 0,
            num_locals: 0,
            bytecode: Vec::new(),
            line_numbers: vec![
                LineEntry { offset: 0, line: 1 },
                LineEntry { offset: 4, line: 3 },
                LineEntry { offset: 9, line: 7 },
            ],
            handlers: Vec::new(),
        };
        assert_eq!(template.line_at(0), 1);
        assert_eq!(template.line_at(3), 1);
        assert_eq!(template.line_at(4), 3);
        assert_eq!(template.line_at(100), 7);
    }
}
