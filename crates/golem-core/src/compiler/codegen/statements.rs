// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Statement compilation documentation.
//!
//! This module documents the statement compilation logic in `mod.rs`.
//!
//! ## Statement Compilation Overview
//!
//! | Statement | Key Operations | Notes |
//! |-----------|----------------|-------|
//! | `let/const` | `StoreLocal`, `StoreCapture` | Missing initializer stores `null` |
//! | `fn name` | `NewFunc`, `StoreLocal` | Hoisted to the start of the block |
//! | `if/else` | `JumpFalse`, `Jump` | `else if` chains nest |
//! | `while` | `JumpFalse`, `Jump` (back) | |
//! | `for .. in` | `NewIter`, `IterNext`, `IterGet` | Iterator kept in a hidden local |
//! | `switch` | `Eq`, `JumpTrue` | No fall-through between cases |
//! | `try` | `PushTry`, `PopTry` | Handler table per template |
//! | `break/continue` | `Break`/`Continue`, then `Jump` | Sentinels rewritten per loop |
//! | `go` | `Go` | Pushes nothing |
//!
//! ## Hoisting
//!
//! Named functions can be called before their declaration within the same
//! block, so their closures are created and stored before any other
//! statement of the block runs:
//!
//! ```text
//! // Input:
//! f()
//! fn f() { }
//!
//! // Bytecode:
//!   NewFunc 1 0
//!   StoreLocal 0
//!   LoadLocal 0
//!   Invoke 0
//!   Pop
//! ```
//!
//! ## Loops
//!
//! ```text
//! for x in xs { body }
//!
//!   [xs]
//!   NewIter
//!   StoreLocal it
//! loop:
//!   LoadLocal it
//!   IterNext
//!   JumpFalse end
//!   LoadLocal it
//!   IterGet
//!   StoreLocal x
//!   [body]
//!   Jump loop
//! end:
//! ```
//!
//! `break` and `continue` are emitted as `Break`/`Continue` with a zero
//! target. Once the loop is complete, the body is scanned instruction by
//! instruction and each sentinel becomes a `Jump` to the loop's end or
//! start. Nested loops rewrite their own sentinels first, so an outer scan
//! only sees the ones that belong to it.
//!
//! Leaving a loop from inside a try construct first emits one `PopTry` for
//! each try construct entered since the loop began, which runs their
//! `finally` blocks.
//!
//! ## Try Statements
//!
//! ```text
//! try { body } catch e { handler } finally { cleanup }
//!
//!   PushTry h
//!   [body]
//!   PopTry
//!   Jump end
//! catch:
//!   StoreLocal e
//!   [handler]
//! finally:
//!   [cleanup]
//! end:
//! ```
//!
//! The handler record `h` holds the `catch` and `finally` regions and the
//! end offset. Normal completion runs `finally` as part of `PopTry`, then
//! the `Jump` skips both clauses. Every `Return` inside the construct is
//! rewritten to `TryReturn`.

#[cfg(test)]
mod tests {
    use crate::compiler::codegen::tests::{compile_ok, ops};
    use crate::compiler::Opcode;

    #[test]
    fn test_switch_without_subject_tests_each_match() {
        let module = compile_ok("let x = 2\nswitch { case x > 1: x = 0; default: x = 1 }");
        let ops = ops(&module, 0);
        assert!(ops.contains(&Opcode::JumpTrue));
        assert!(!ops.contains(&Opcode::Eq));
    }

    #[test]
    fn test_switch_with_subject_compares_equality() {
        let module = compile_ok("switch 3 { case 1, 2: print(1); case 3: print(3) }");
        let ops = ops(&module, 0);
        assert_eq!(ops.iter().filter(|op| **op == Opcode::Eq).count(), 3);
    }

    #[test]
    fn test_tuple_for_checks_shape() {
        let module = compile_ok("for (a, b) in [(1, 2)] { print(a + b) }");
        assert!(ops(&module, 0).contains(&Opcode::CheckTuple));
    }
}
