// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression compilation documentation.
//!
//! This module documents the expression compilation logic in `mod.rs`.
//! Every expression leaves exactly one value on the stack.
//!
//! ## Literals
//!
//! `null`, `true`, `false`, `0`, `1` and `-1` have dedicated opcodes; every
//! other literal is a `LoadConst`. A `-` applied directly to a numeric
//! literal is folded into the constant.
//!
//! ## Short-Circuit Operators
//!
//! `&&` and `||` always produce a Bool:
//!
//! ```text
//! a && b
//!
//!   [a]
//!   JumpFalse false
//!   [b]
//!   JumpFalse false
//!   LoadTrue
//!   Jump end
//! false:
//!   LoadFalse
//! end:
//! ```
//!
//! ## Assignment
//!
//! | Target | Plain | Compound (`op=`) |
//! |--------|-------|------------------|
//! | `x` | `[v] Dup Store x` | `Load x [v] op Dup Store x` |
//! | `o.f` | `[o] [v] SetField f` | `[o] Dup GetField f [v] op SetField f` |
//! | `o[i]` | `[o] [i] [v] SetIndex` | `[o] [i] Dup2 GetIndex [v] op SetIndex` |
//!
//! `x++` on a variable loads, duplicates, adds and stores; on a field or
//! element it uses `IncField`/`IncIndex` with a delta of `1` or `-1`.
//!
//! ## Closures
//!
//! ```text
//!   NewFunc template count
//!   FuncLocal slot      ; one per capture, in capture slot order
//!   FuncCapture slot
//! ```
//!
//! ## Struct Literals
//!
//! Field values are pushed in source order, a `prop` pushing its getter and
//! its setter (or `null`). `NewStruct` pops them according to its struct
//! definition. If the literal uses `this`, the new struct is also stored
//! into the hidden local that `this` resolves to.

#[cfg(test)]
mod tests {
    use crate::compiler::codegen::tests::{compile_ok, ops};
    use crate::compiler::{Constant, Opcode};

    #[test]
    fn test_negative_literal_is_folded() {
        let module = compile_ok("let x = -5");
        assert_eq!(
            ops(&module, 0)[..2],
            [Opcode::LoadConst, Opcode::StoreLocal]
        );
        assert!(module.pool.constants.contains(&Constant::Int(-5)));
    }

    #[test]
    fn test_compound_field_assignment() {
        let module = compile_ok("let s = struct { a: 1 }\ns.a += 2");
        let ops = ops(&module, 0);
        let at = ops.iter().position(|op| *op == Opcode::GetField).unwrap();
        assert_eq!(ops[at - 1], Opcode::Dup);
        assert_eq!(ops[at + 2], Opcode::Add);
        assert_eq!(ops[at + 3], Opcode::SetField);
    }

    #[test]
    fn test_postfix_on_element_uses_inc_index() {
        let module = compile_ok("let l = [1]\nl[0]--");
        let ops = ops(&module, 0);
        let at = ops.iter().position(|op| *op == Opcode::IncIndex).unwrap();
        assert_eq!(ops[at - 1], Opcode::LoadNegOne);
    }

    #[test]
    fn test_struct_with_this_stores_itself() {
        let module = compile_ok("let s = struct { a: 1, f: || => this.a }");
        let ops = ops(&module, 0);
        let at = ops.iter().position(|op| *op == Opcode::NewStruct).unwrap();
        assert_eq!(ops[at + 1], Opcode::Dup);
        assert_eq!(module.pool.struct_defs[0].fields.len(), 2);
    }
}
