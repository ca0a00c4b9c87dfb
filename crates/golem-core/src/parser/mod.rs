// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Parser for Golem source code.
//!
//! Transforms a stream of tokens into an Abstract Syntax Tree (AST).
//! Parsing stops at the first syntax error.
//!
//! ## Structure
//!
//! - `parser` - Main recursive descent parser implementation
//!
//! ## Documentation Submodules
//!
//! The following submodules provide documentation and additional tests
//! for specific parsing areas:
//!
//! - `statements` - Statement parsing (if, for, switch, try, etc.)
//! - `expressions` - Expression parsing (operators, literals, calls)
//!
//! ## Usage
//!
//! ```rust
//! use golem_core::parser::Parser;
//!
//! let mut parser = Parser::new("let x = 1 + 2");
//! let module = parser.parse_module("main").expect("Should parse");
//! assert_eq!(module.init.body.stmts.len(), 1);
//! ```

mod parser;

// Documentation and test submodules
pub mod expressions;
pub mod statements;

pub use parser::Parser;
