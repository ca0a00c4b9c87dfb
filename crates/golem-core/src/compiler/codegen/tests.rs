// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tests for the bytecode compiler.

use super::*;
use crate::compiler::bytecode::{instructions, Instruction};
use crate::compiler::compile;

const BUILTINS: [&str; 3] = ["print", "len", "str"];

fn compile_source(src: &str, options: CompileOptions) -> crate::Result<Module> {
    compile(src, "test", "test.glm", &BUILTINS[..], options)
}

pub(crate) fn compile_ok(src: &str) -> Module {
    compile_source(src, CompileOptions::default()).expect("Compilation should succeed")
}

pub(crate) fn ops(module: &Module, template: usize) -> Vec<Opcode> {
    instructions(&module.template(template).bytecode)
        .map(|i| i.opcode)
        .collect()
}

fn listing(module: &Module, template: usize) -> Vec<Instruction> {
    instructions(&module.template(template).bytecode).collect()
}

#[test]
fn test_compile_empty_module() {
    let module = compile_ok("");
    assert_eq!(ops(&module, 0), [Opcode::LoadNull, Opcode::Return]);
    assert_eq!(module.template(0).name.as_ref(), INIT_NAME);
}

#[test]
fn test_small_integers_use_dedicated_opcodes() {
    let module = compile_ok("let a = 0\nlet b = 1\nlet c = -1\nlet d = 2");
    let ops = ops(&module, 0);
    assert_eq!(ops[0], Opcode::LoadZero);
    assert_eq!(ops[2], Opcode::LoadOne);
    assert_eq!(ops[4], Opcode::LoadNegOne);
    assert_eq!(ops[6], Opcode::LoadConst);
    assert_eq!(module.pool.constants, [Constant::Int(2)]);
}

#[test]
fn test_logical_and_is_a_jump_diamond() {
    let module = compile_ok("let a = true\nlet b = false\nlet c = a && b");
    let code = listing(&module, 0);
    let ops: Vec<_> = code.iter().map(|i| i.opcode).collect();
    assert_eq!(
        ops,
        [
            Opcode::LoadTrue,
            Opcode::StoreLocal,
            Opcode::LoadFalse,
            Opcode::StoreLocal,
            Opcode::LoadLocal,
            Opcode::JumpFalse,
            Opcode::LoadLocal,
            Opcode::JumpFalse,
            Opcode::LoadTrue,
            Opcode::Jump,
            Opcode::LoadFalse,
            Opcode::StoreLocal,
            Opcode::LoadNull,
            Opcode::Return,
        ]
    );

    // Both short-circuit jumps land on LoadFalse; the Jump skips it.
    let load_false = code[10].offset as u16;
    assert_eq!(code[5].a, load_false);
    assert_eq!(code[7].a, load_false);
    assert_eq!(code[9].a, code[11].offset as u16);
}

#[test]
fn test_logical_or_mirrors_and() {
    let module = compile_ok("let a = true\nlet c = a || false");
    let ops = ops(&module, 0);
    assert!(ops.contains(&Opcode::JumpTrue));
    assert!(!ops.contains(&Opcode::JumpFalse));
}

#[test]
fn test_break_and_continue_become_jumps() {
    let module = compile_ok("let i = 0\nwhile i < 10 { i++\nif i == 2 { continue }\nbreak }");
    let code = listing(&module, 0);
    assert!(code
        .iter()
        .all(|i| i.opcode != Opcode::Break && i.opcode != Opcode::Continue));

    let start = code
        .iter()
        .find(|i| i.opcode == Opcode::LoadLocal)
        .map(|i| i.offset as u16)
        .unwrap();
    let exit = code
        .iter()
        .find(|i| i.opcode == Opcode::JumpFalse)
        .map(|i| i.a)
        .unwrap();
    let jumps: Vec<u16> = code
        .iter()
        .filter(|i| i.opcode == Opcode::Jump)
        .map(|i| i.a)
        .collect();
    assert!(jumps.contains(&start));
    assert!(jumps.contains(&exit));
}

#[test]
fn test_nested_loop_sentinels_stay_local() {
    let module = compile_ok("while true { while true { break }\nbreak }");
    let code = listing(&module, 0);
    let exits: Vec<u16> = code
        .iter()
        .filter(|i| i.opcode == Opcode::JumpFalse)
        .map(|i| i.a)
        .collect();
    let jumps: Vec<u16> = code
        .iter()
        .filter(|i| i.opcode == Opcode::Jump)
        .map(|i| i.a)
        .collect();
    assert!(jumps.contains(&exits[0]));
    assert!(jumps.contains(&exits[1]));
}

#[test]
fn test_break_inside_try_pops_handler() {
    let module = compile_ok("while true { try { break } finally { print(1) } }");
    let ops = ops(&module, 0);
    let push = ops.iter().position(|op| *op == Opcode::PushTry).unwrap();
    assert_eq!(ops[push + 1], Opcode::PopTry);
    assert_eq!(ops[push + 2], Opcode::Jump);
}

#[test]
fn test_return_inside_try_becomes_try_return() {
    let module = compile_ok("fn f() { try { return 1 } finally { print(2) }\nreturn 3 }");
    let ops = ops(&module, 1);
    assert_eq!(ops.iter().filter(|op| **op == Opcode::TryReturn).count(), 1);
    assert_eq!(ops.iter().filter(|op| **op == Opcode::Return).count(), 2);
}

#[test]
fn test_handler_regions() {
    let module = compile_ok("try { print(1) } catch e { print(e) } finally { print(3) }");
    let template = module.template(0);
    assert_eq!(template.handlers.len(), 1);

    let handler = template.handlers[0];
    let catch = handler.catch.unwrap();
    let finally = handler.finally.unwrap();
    assert_eq!(catch.end, finally.begin);
    assert_eq!(finally.end, handler.end);

    let first = decode(&template.bytecode, catch.begin as usize).unwrap();
    assert_eq!(first.opcode, Opcode::StoreLocal);
}

#[test]
fn test_constants_are_shared_across_templates() {
    let module = compile_ok("let a = \"x\"\nlet f = || => \"x\"");
    assert_eq!(module.pool.constants, [Constant::Str("x".into())]);
}

#[test]
fn test_top_level_contents() {
    let module = compile_ok("let a = 1\nconst b = 2\nfn c() { }\nif true { let d = 4 }");
    let contents: Vec<_> = module
        .contents
        .iter()
        .map(|c| (c.name.as_ref(), c.kind))
        .collect();
    assert_eq!(
        contents,
        [
            ("a", ContentKind::Let),
            ("b", ContentKind::Const),
            ("c", ContentKind::Fn)
        ]
    );
}

#[test]
fn test_eval_returns_trailing_expression() {
    let module = compile_source("let a = 2\na * 3", CompileOptions { eval: true }).unwrap();
    let ops = ops(&module, 0);
    assert_eq!(
        ops[ops.len() - 4..],
        [Opcode::LoadLocal, Opcode::LoadConst, Opcode::Mul, Opcode::Return]
    );
}

#[test]
fn test_arity_from_parameters() {
    let module = compile_ok("fn f(a, b = 2) { }\nfn g(a, rest...) { }\nfn h(a, b) { }");
    assert_eq!(
        module.template(1).arity,
        Arity::Multiple {
            required: 1,
            optional: 1
        }
    );
    assert_eq!(module.template(1).defaults, [Constant::Int(2)]);
    assert_eq!(module.template(2).arity, Arity::Variadic { required: 1 });
    assert_eq!(module.template(3).arity, Arity::Fixed(2));
}

#[test]
fn test_closure_capture_operands() {
    let module = compile_ok("let x = 1\nlet f = || => || => x");
    assert_eq!(
        ops(&module, 0)[2..4],
        [Opcode::NewFunc, Opcode::FuncLocal]
    );
    assert_eq!(
        ops(&module, 1)[..2],
        [Opcode::NewFunc, Opcode::FuncCapture]
    );
    assert_eq!(module.template(2).num_captures, 1);
}

#[test]
fn test_named_functions_are_hoisted() {
    let module = compile_ok("f()\nfn f() { }");
    assert_eq!(
        ops(&module, 0)[..4],
        [
            Opcode::NewFunc,
            Opcode::StoreLocal,
            Opcode::LoadLocal,
            Opcode::Invoke
        ]
    );
}

#[test]
fn test_builtins_and_imports() {
    let module = compile_ok("import os\nprint(os.name)");
    assert_eq!(module.imports, [Arc::from("os")]);
    let ops = ops(&module, 0);
    assert_eq!(ops[0], Opcode::ImportModule);
    assert_eq!(ops[1], Opcode::StoreLocal);
    assert_eq!(ops[2], Opcode::LoadBuiltin);
}

#[test]
fn test_go_pushes_no_value() {
    let module = compile_ok("fn f(n) { }\ngo f(1)");
    let ops = ops(&module, 0);
    let go = ops.iter().position(|op| *op == Opcode::Go).unwrap();
    assert_eq!(ops[go + 1], Opcode::LoadNull);
}

#[test]
fn test_line_table_is_sparse() {
    let module = compile_ok("let a = 1\nlet b = a\n\nlet c = b");
    let lines: Vec<_> = module
        .template(0)
        .line_numbers
        .iter()
        .map(|e| e.line)
        .collect();
    assert_eq!(lines, [1, 2, 4]);
}

#[test]
fn test_function_too_large() {
    let mut src = String::from("let x = 0\n");
    for _ in 0..6000 {
        src.push_str("x = x + 7\n");
    }
    let err = compile_source(&src, CompileOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        crate::Error::Compile(CompileError::FunctionTooLarge { ref name, .. }) if name == INIT_NAME
    ));
}
