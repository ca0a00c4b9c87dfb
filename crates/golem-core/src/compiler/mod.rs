// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode compiler for Golem.
//!
//! Transforms an analyzed AST into a [`Module`] that can be executed by the
//! VM.
//!
//! # Module Structure
//!
//! - `bytecode`: Opcodes and instruction encoding
//! - `template`: Function templates, arities, error handlers, line tables
//! - `module`: Compiled modules and their constant pools
//! - `codegen`: Code generation from AST
//! - `disasm`: Human-readable listings of compiled modules

pub mod bytecode;
pub mod codegen;
pub mod disasm;
pub mod module;
pub mod template;

pub use bytecode::{Instruction, Opcode};
pub use codegen::{CompileOptions, Compiler};
pub use disasm::Disassembler;
pub use module::{Constant, ContentEntry, ContentKind, FieldKind, Module, StructDef};
pub use template::{Arity, ErrorHandler, FuncTemplate};

use crate::analyzer::{self, BuiltinLookup};
use crate::parser::Parser;

/// Runs the full front end on `source`: parse, analyze, generate code.
///
/// `name` is the module name and `path` the location reported in stack
/// traces.
pub fn compile<B>(
    source: &str,
    name: &str,
    path: &str,
    builtins: &B,
    options: CompileOptions,
) -> crate::Result<Module>
where
    B: BuiltinLookup + ?Sized,
{
    let mut ast = Parser::new(source).parse_module(name)?;
    analyzer::analyze(&mut ast, builtins)?;
    let module = Compiler::new(builtins, options).compile(&ast, path)?;

    tracing::debug!(
        module = name,
        templates = module.pool.templates.len(),
        constants = module.pool.constants.len(),
        "compiled module"
    );
    Ok(module)
}
