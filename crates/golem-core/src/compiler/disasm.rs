// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Human-readable listings of compiled modules.
//!
//! ```text
//! == module main (main.glm) ==
//! constants:
//!   [0] "x"
//! -- template 0: init (arity 0, locals 1, captures 0) --
//!     1  0000  LoadOne
//!        0001  StoreLocal       0
//! ```

use std::fmt::{self, Write as _};

use super::bytecode::{instructions, Instruction, Opcode};
use super::module::Module;
use super::template::FuncTemplate;

/// Formats a module's pools and instructions.
pub struct Disassembler<'m> {
    module: &'m Module,
    builtins: Vec<String>,
}

impl<'m> Disassembler<'m> {
    /// Creates a disassembler for `module`.
    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            builtins: Vec::new(),
        }
    }

    /// Shows builtin names next to `LoadBuiltin` indices.
    pub fn with_builtins(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.builtins = names.into_iter().map(Into::into).collect();
        self
    }

    fn template(&self, f: &mut fmt::Formatter<'_>, index: usize, t: &FuncTemplate) -> fmt::Result {
        writeln!(
            f,
            "-- template {index}: {} (arity {}, locals {}, captures {}) --",
            t.name, t.arity, t.num_locals, t.num_captures
        )?;
        if !t.defaults.is_empty() {
            let defaults: Vec<_> = t.defaults.iter().map(ToString::to_string).collect();
            writeln!(f, "defaults: {}", defaults.join(", "))?;
        }

        let mut last_line = None;
        for instr in instructions(&t.bytecode) {
            let line = t.line_at(instr.offset);
            if last_line != Some(line) {
                write!(f, "{line:>5}  ")?;
                last_line = Some(line);
            } else {
                f.write_str("       ")?;
            }
            writeln!(f, "{:04}  {}", instr.offset, self.instruction(&instr))?;
        }

        for (i, handler) in t.handlers.iter().enumerate() {
            write!(f, "  handler {i}: end {:04}", handler.end)?;
            if let Some(catch) = handler.catch {
                write!(f, ", catch {:04}..{:04}", catch.begin, catch.end)?;
            }
            if let Some(finally) = handler.finally {
                write!(f, ", finally {:04}..{:04}", finally.begin, finally.end)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }

    fn instruction(&self, instr: &Instruction) -> String {
        let mut out = format!("{:<16}", instr.opcode.name());
        match instr.opcode.width() {
            1 => {}
            3 => {
                let _ = write!(out, " {}", instr.a);
            }
            _ => {
                let _ = write!(out, " {} {}", instr.a, instr.b);
            }
        }

        let note = match instr.opcode {
            Opcode::LoadConst => self
                .module
                .pool
                .constants
                .get(instr.a as usize)
                .map(ToString::to_string),
            Opcode::GetField | Opcode::SetField | Opcode::IncField | Opcode::ImportModule => {
                self.module.pool.constants.get(instr.a as usize).map(ToString::to_string)
            }
            Opcode::LoadBuiltin => self.builtins.get(instr.a as usize).cloned(),
            Opcode::NewFunc => self
                .module
                .pool
                .templates
                .get(instr.a as usize)
                .map(|t| t.name.to_string()),
            _ => None,
        };
        if let Some(note) = note {
            let _ = write!(out, " ({note})");
        }
        out.trim_end().to_string()
    }
}

impl fmt::Display for Disassembler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== module {} ({}) ==", self.module.name, self.module.path)?;

        if !self.module.pool.constants.is_empty() {
            writeln!(f, "constants:")?;
            for (i, constant) in self.module.pool.constants.iter().enumerate() {
                writeln!(f, "  [{i}] {constant}")?;
            }
        }

        for (i, def) in self.module.pool.struct_defs.iter().enumerate() {
            let fields: Vec<_> = def.fields.iter().map(|(name, _)| name.as_ref()).collect();
            writeln!(f, "struct {i}: {{ {} }}", fields.join(", "))?;
        }

        for (i, template) in self.module.pool.templates.iter().enumerate() {
            self.template(f, i, template)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile, CompileOptions};

    const NO_BUILTINS: [&str; 0] = [];

    #[test]
    fn test_listing_shows_names_and_constants() {
        let builtins = ["print"];
        let module = compile(
            "let s = \"hi\"\nprint(s.len())",
            "main",
            "main.glm",
            &builtins[..],
            CompileOptions::default(),
        )
        .unwrap();
        let listing = Disassembler::new(&module)
            .with_builtins(builtins)
            .to_string();

        assert!(listing.starts_with("== module main (main.glm) =="));
        assert!(listing.contains("LoadBuiltin      0 (print)"));
        assert!(listing.contains("GetField"));
        assert!(listing.contains("\"len\""));
        assert!(listing.contains("-- template 0: init"));
    }

    #[test]
    fn test_listing_shows_handlers() {
        let module = compile(
            "try { throw 1 } finally { }",
            "m",
            "m.glm",
            &NO_BUILTINS[..],
            CompileOptions::default(),
        )
        .unwrap();
        let listing = Disassembler::new(&module).to_string();
        assert!(listing.contains("handler 0: end"));
        assert!(listing.contains("finally"));
    }
}
