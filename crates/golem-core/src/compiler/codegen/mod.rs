// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Code generation from AST to bytecode.
//!
//! This module contains the `Compiler` which transforms an analyzed Golem
//! AST into a [`Module`] of function templates.
//!
//! Function literals are compiled through a worklist: each one is assigned
//! the next template index when it is first met and compiled after the
//! template that contains it. The module's init function is template 0.

pub mod expressions;
pub mod statements;

#[cfg(test)]
mod tests;

use std::collections::VecDeque;
use std::ops::Range;
use std::sync::Arc;

use crate::analyzer::{BuiltinLookup, Variable};
use crate::ast::{self, *};
use crate::compiler::bytecode::{decode, write_u16, Opcode};
use crate::compiler::module::{
    Constant, ConstantPool, ContentEntry, ContentKind, FieldKind, Module, Pool, StructDef,
};
use crate::compiler::template::{Arity, ErrorHandler, FuncTemplate, LineEntry, Region};
use crate::error::CompileError;
use crate::lexer::Pos;

type Result<T> = std::result::Result<T, CompileError>;

/// Name given to function literals without one.
pub const ANONYMOUS: &str = "<anonymous>";

/// Options that change what the compiler emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Make the init function return the value of a trailing expression
    /// statement instead of `null`.
    pub eval: bool,
}

/// Per-template emission state.
#[derive(Debug)]
struct FuncState {
    name: Arc<str>,
    code: Vec<u8>,
    lines: Vec<LineEntry>,
    handlers: Vec<ErrorHandler>,
    /// Number of try constructs enclosing the current position
    try_depth: usize,
    /// `try_depth` at the start of each enclosing loop
    loops: Vec<usize>,
}

impl FuncState {
    fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            code: Vec::new(),
            lines: Vec::new(),
            handlers: Vec::new(),
            try_depth: 0,
            loops: Vec::new(),
        }
    }
}

impl Default for FuncState {
    fn default() -> Self {
        Self::new(ANONYMOUS)
    }
}

/// Compiles an analyzed AST to bytecode.
pub struct Compiler<'a, 'b, B: ?Sized> {
    builtins: &'b B,
    options: CompileOptions,
    constants: ConstantPool,
    struct_defs: Vec<StructDef>,
    templates: Vec<Option<FuncTemplate>>,
    pending: VecDeque<(usize, &'a FnExpr)>,
    contents: Vec<ContentEntry>,
    func: FuncState,
}

impl<'a, 'b, B: BuiltinLookup + ?Sized> Compiler<'a, 'b, B> {
    /// Creates a new compiler.
    pub fn new(builtins: &'b B, options: CompileOptions) -> Self {
        Self {
            builtins,
            options,
            constants: ConstantPool::new(),
            struct_defs: Vec::new(),
            templates: Vec::new(),
            pending: VecDeque::new(),
            contents: Vec::new(),
            func: FuncState::default(),
        }
    }

    /// Compiles a module that has been through scope analysis.
    pub fn compile(mut self, module: &'a ast::Module, path: &str) -> Result<Module> {
        self.templates.push(None);
        let init = self.compile_init(module)?;
        self.templates[0] = Some(init);

        while let Some((index, func)) = self.pending.pop_front() {
            let template = self.compile_function(func)?;
            self.templates[index] = Some(template);
        }

        let templates = self
            .templates
            .into_iter()
            .map(|t| match t {
                Some(t) => t,
                None => unreachable!("template left uncompiled"),
            })
            .collect();

        Ok(Module {
            name: module.name.as_str().into(),
            path: path.into(),
            pool: Pool {
                constants: self.constants.into_vec(),
                templates,
                struct_defs: self.struct_defs,
            },
            contents: self.contents,
            imports: module.imports.iter().map(|i| i.name.as_str().into()).collect(),
        })
    }

    fn compile_init(&mut self, module: &'a ast::Module) -> Result<FuncTemplate> {
        self.func = FuncState::new(INIT_NAME);

        for import in &module.imports {
            self.mark_line(import.pos);
            let name = self.constant(Constant::Str(import.name.as_str().into()))?;
            self.emit_u16(Opcode::ImportModule, name);
            self.store(var_of(&import.var))?;
        }

        let stmts = &module.init.body.stmts;
        self.collect_contents(stmts)?;

        let (body, tail) = match stmts.split_last() {
            Some((
                Stmt {
                    kind: StmtKind::Expr(expr),
                    pos,
                },
                rest,
            )) if self.options.eval => (rest, Some((expr, *pos))),
            _ => (&stmts[..], None),
        };

        self.hoist(stmts)?;
        for stmt in body {
            self.stmt(stmt)?;
        }

        match tail {
            Some((expr, pos)) => {
                self.mark_line(pos);
                self.expr(expr)?;
            }
            None => self.emit(Opcode::LoadNull),
        }
        self.emit(Opcode::Return);

        self.finish_template(&module.init)
    }

    fn compile_function(&mut self, func: &'a FnExpr) -> Result<FuncTemplate> {
        self.func = FuncState::new(func.name.as_deref().unwrap_or(ANONYMOUS));
        self.mark_line(func.begin);

        self.stmts(&func.body.stmts)?;
        self.emit(Opcode::LoadNull);
        self.emit(Opcode::Return);

        self.finish_template(func)
    }

    fn finish_template(&mut self, func: &FnExpr) -> Result<FuncTemplate> {
        let state = std::mem::take(&mut self.func);
        if state.code.len() > u16::MAX as usize {
            return Err(CompileError::FunctionTooLarge {
                name: state.name.to_string(),
                size: state.code.len(),
            });
        }

        let required = count(func.required_params(), CompileError::TooManyLocals)?;
        let optional = count(func.optional_params(), CompileError::TooManyLocals)?;
        let arity = if func.variadic {
            Arity::Variadic { required }
        } else if optional > 0 {
            Arity::Multiple { required, optional }
        } else {
            Arity::Fixed(required)
        };

        let defaults = func
            .params
            .iter()
            .filter_map(|p| p.default.as_ref())
            .map(literal_constant)
            .collect();

        Ok(FuncTemplate {
            name: state.name,
            arity,
            defaults,
            num_captures: count(func.scope.captures.len(), CompileError::TooManyLocals)?,
            num_locals: u16::try_from(func.scope.num_locals)
                .map_err(|_| CompileError::TooManyLocals)?,
            bytecode: state.code,
            line_numbers: state.lines,
            handlers: state.handlers,
        })
    }

    /// Records the init function's top-level declarations as module contents.
    fn collect_contents(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::Decl(decl) => {
                    let kind = if decl.is_const {
                        ContentKind::Const
                    } else {
                        ContentKind::Let
                    };
                    for var in &decl.vars {
                        self.add_content(&var.ident, kind)?;
                    }
                }
                StmtKind::NamedFn(named) => self.add_content(&named.ident, ContentKind::Fn)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn add_content(&mut self, ident: &DeclIdent, kind: ContentKind) -> Result<()> {
        // A duplicate declaration was already rejected by the analyzer.
        let Some(var) = ident.var else { return Ok(()) };
        self.contents.push(ContentEntry {
            name: ident.name.as_str().into(),
            kind,
            slot: slot(var)?,
        });
        Ok(())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Creates the closures of a block's named functions before anything
    /// else in the block runs.
    fn hoist(&mut self, stmts: &'a [Stmt]) -> Result<()> {
        for stmt in stmts {
            if let StmtKind::NamedFn(named) = &stmt.kind {
                self.mark_line(stmt.pos);
                self.closure(&named.func)?;
                self.store(var_of(&named.ident.var))?;
            }
        }
        Ok(())
    }

    fn stmts(&mut self, stmts: &'a [Stmt]) -> Result<()> {
        self.hoist(stmts)?;
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn block(&mut self, block: &'a Block) -> Result<()> {
        self.stmts(&block.stmts)
    }

    fn stmt(&mut self, stmt: &'a Stmt) -> Result<()> {
        self.mark_line(stmt.pos);
        match &stmt.kind {
            StmtKind::Decl(decl) => {
                for var in &decl.vars {
                    match &var.init {
                        Some(init) => self.expr(init)?,
                        None => self.emit(Opcode::LoadNull),
                    }
                    self.store(var_of(&var.ident.var))?;
                }
            }
            StmtKind::NamedFn(_) => {}
            StmtKind::If(stmt) => self.if_stmt(stmt)?,
            StmtKind::While(stmt) => self.while_stmt(stmt)?,
            StmtKind::For(stmt) => self.for_stmt(stmt)?,
            StmtKind::Switch(stmt) => self.switch_stmt(stmt)?,
            StmtKind::Break | StmtKind::Continue => {
                let loop_depth = match self.func.loops.last() {
                    Some(&depth) => depth,
                    None => unreachable!("break or continue outside of a loop"),
                };
                for _ in loop_depth..self.func.try_depth {
                    self.emit(Opcode::PopTry);
                }
                let sentinel = if matches!(stmt.kind, StmtKind::Break) {
                    Opcode::Break
                } else {
                    Opcode::Continue
                };
                self.emit_u16(sentinel, 0);
            }
            StmtKind::Return(value) => {
                match value {
                    Some(value) => self.expr(value)?,
                    None => self.emit(Opcode::LoadNull),
                }
                self.emit(Opcode::Return);
            }
            StmtKind::Throw(value) => {
                self.expr(value)?;
                self.emit(Opcode::Throw);
            }
            StmtKind::Try(stmt) => self.try_stmt(stmt)?,
            StmtKind::Go(call) => match &call.kind {
                ExprKind::Call { callee, args } => {
                    self.expr(callee)?;
                    self.exprs(args)?;
                    let argc = count(args.len(), CompileError::TooManyElements)?;
                    self.emit_u16(Opcode::Go, argc);
                }
                _ => unreachable!("go without a call"),
            },
            StmtKind::Block(block) => self.block(block)?,
            StmtKind::Expr(expr) => {
                self.expr(expr)?;
                self.emit(Opcode::Pop);
            }
        }
        Ok(())
    }

    fn if_stmt(&mut self, stmt: &'a If) -> Result<()> {
        self.expr(&stmt.cond)?;
        let to_else = self.emit_jump(Opcode::JumpFalse);
        self.block(&stmt.then)?;

        match &stmt.otherwise {
            Some(otherwise) => {
                let to_end = self.emit_jump(Opcode::Jump);
                self.patch_jump(to_else)?;
                self.stmt(otherwise)?;
                self.patch_jump(to_end)
            }
            None => self.patch_jump(to_else),
        }
    }

    fn while_stmt(&mut self, stmt: &'a While) -> Result<()> {
        let start = self.offset()?;
        self.expr(&stmt.cond)?;
        let exit = self.emit_jump(Opcode::JumpFalse);

        let body = self.loop_body(&stmt.body)?;
        self.emit_u16(Opcode::Jump, start);

        self.patch_jump(exit)?;
        let end = self.offset()?;
        self.patch_loop_exits(body, end, start);
        Ok(())
    }

    fn for_stmt(&mut self, stmt: &'a For) -> Result<()> {
        let iter = var_of(&stmt.iter_var);
        self.expr(&stmt.iterable)?;
        self.emit(Opcode::NewIter);
        self.store(iter)?;

        let start = self.offset()?;
        self.load(iter)?;
        self.emit(Opcode::IterNext);
        let exit = self.emit_jump(Opcode::JumpFalse);

        self.load(iter)?;
        self.emit(Opcode::IterGet);
        if stmt.tuple {
            let len = count(stmt.vars.len(), CompileError::TooManyElements)?;
            self.emit_u16(Opcode::CheckTuple, len);
            for (i, var) in stmt.vars.iter().enumerate() {
                self.emit(Opcode::Dup);
                self.literal(&Literal::Int(i as i64))?;
                self.emit(Opcode::GetIndex);
                self.store(var_of(&var.var))?;
            }
            self.emit(Opcode::Pop);
        } else {
            self.store(var_of(&stmt.vars[0].var))?;
        }

        let body = self.loop_body(&stmt.body)?;
        self.emit_u16(Opcode::Jump, start);

        self.patch_jump(exit)?;
        let end = self.offset()?;
        self.patch_loop_exits(body, end, start);
        Ok(())
    }

    fn loop_body(&mut self, body: &'a Block) -> Result<Range<usize>> {
        self.func.loops.push(self.func.try_depth);
        let begin = self.func.code.len();
        self.block(body)?;
        self.func.loops.pop();
        Ok(begin..self.func.code.len())
    }

    fn switch_stmt(&mut self, stmt: &'a Switch) -> Result<()> {
        let subject = match &stmt.subject {
            Some(subject) => {
                self.expr(subject)?;
                let var = var_of(&stmt.subject_var);
                self.store(var)?;
                Some(var)
            }
            None => None,
        };

        let mut case_jumps = Vec::with_capacity(stmt.cases.len());
        for case in &stmt.cases {
            self.mark_line(case.pos);
            let mut jumps = Vec::with_capacity(case.matches.len());
            for m in &case.matches {
                match subject {
                    Some(var) => {
                        self.load(var)?;
                        self.expr(m)?;
                        self.emit(Opcode::Eq);
                    }
                    None => self.expr(m)?,
                }
                jumps.push(self.emit_jump(Opcode::JumpTrue));
            }
            case_jumps.push(jumps);
        }
        let to_default = self.emit_jump(Opcode::Jump);

        let mut to_end = Vec::with_capacity(stmt.cases.len());
        for (case, jumps) in stmt.cases.iter().zip(case_jumps) {
            for jump in jumps {
                self.patch_jump(jump)?;
            }
            self.stmts(&case.body)?;
            to_end.push(self.emit_jump(Opcode::Jump));
        }

        self.patch_jump(to_default)?;
        if let Some(default) = &stmt.default {
            self.stmts(default)?;
        }
        for jump in to_end {
            self.patch_jump(jump)?;
        }
        Ok(())
    }

    /// Emits `PushTry; body; PopTry; Jump end; [catch] [finally] end`.
    ///
    /// Any `return` inside the construct becomes `TryReturn` so pending
    /// `finally` blocks run before the frame unwinds.
    fn try_stmt(&mut self, stmt: &'a Try) -> Result<()> {
        let index = count(self.func.handlers.len(), CompileError::TooManyElements)?;
        self.func.handlers.push(ErrorHandler {
            end: 0,
            catch: None,
            finally: None,
        });

        let begin = self.func.code.len();
        self.emit_u16(Opcode::PushTry, index);
        self.func.try_depth += 1;

        self.block(&stmt.body)?;
        self.emit(Opcode::PopTry);
        let skip = self.emit_jump(Opcode::Jump);

        let catch = match &stmt.catch {
            Some(catch) => {
                let begin = self.offset()?;
                self.store(var_of(&catch.ident.var))?;
                self.block(&catch.body)?;
                Some(Region {
                    begin,
                    end: self.offset()?,
                })
            }
            None => None,
        };

        let finally = match &stmt.finally {
            Some(finally) => {
                let begin = self.offset()?;
                self.block(finally)?;
                Some(Region {
                    begin,
                    end: self.offset()?,
                })
            }
            None => None,
        };

        self.func.try_depth -= 1;
        self.patch_jump(skip)?;
        let end = self.offset()?;
        self.func.handlers[index as usize] = ErrorHandler {
            end,
            catch,
            finally,
        };

        self.rewrite(begin..end as usize, |op| match op {
            Opcode::Return => Some((Opcode::TryReturn, None)),
            _ => None,
        });
        Ok(())
    }

    /// Rewrites the `break`/`continue` sentinels left in a loop body into
    /// jumps. Sentinels of nested loops were already rewritten.
    fn patch_loop_exits(&mut self, body: Range<usize>, break_to: u16, continue_to: u16) {
        self.rewrite(body, |op| match op {
            Opcode::Break => Some((Opcode::Jump, Some(break_to))),
            Opcode::Continue => Some((Opcode::Jump, Some(continue_to))),
            _ => None,
        });
    }

    /// Walks the instructions in `range`, replacing opcodes (and optionally
    /// their first parameter) of the same width.
    fn rewrite(
        &mut self,
        range: Range<usize>,
        replace: impl Fn(Opcode) -> Option<(Opcode, Option<u16>)>,
    ) {
        let code = &mut self.func.code;
        let mut offset = range.start;
        while offset < range.end {
            let Some(instr) = decode(code, offset) else {
                unreachable!("malformed bytecode at offset {offset}");
            };
            if let Some((op, param)) = replace(instr.opcode) {
                debug_assert_eq!(op.width(), instr.opcode.width());
                code[offset] = op as u8;
                if let Some(param) = param {
                    write_u16(code, offset + 1, param);
                }
            }
            offset += instr.opcode.width();
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn exprs(&mut self, exprs: &'a [Expr]) -> Result<()> {
        for expr in exprs {
            self.expr(expr)?;
        }
        Ok(())
    }

    fn expr(&mut self, expr: &'a Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Literal(lit) => self.literal(lit),
            ExprKind::Ident(ident) => match ident.var {
                Some(var) => self.load(var),
                None => {
                    let index = self.builtin(&ident.name);
                    self.emit_u16(Opcode::LoadBuiltin, index);
                    Ok(())
                }
            },
            ExprKind::This(var) => self.load(var_of(var)),
            ExprKind::Unary { op, operand } => self.unary(*op, operand),
            ExprKind::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            } => self.logical(lhs, rhs, true),
            ExprKind::Binary {
                op: BinaryOp::Or,
                lhs,
                rhs,
            } => self.logical(lhs, rhs, false),
            ExprKind::Binary { op, lhs, rhs } => {
                self.expr(lhs)?;
                self.expr(rhs)?;
                self.emit(binary_opcode(*op));
                Ok(())
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.expr(cond)?;
                let to_else = self.emit_jump(Opcode::JumpFalse);
                self.expr(then)?;
                let to_end = self.emit_jump(Opcode::Jump);
                self.patch_jump(to_else)?;
                self.expr(otherwise)?;
                self.patch_jump(to_end)
            }
            ExprKind::Assign { target, op, value } => self.assign(target, *op, value),
            ExprKind::Postfix { target, op } => self.postfix(target, *op),
            ExprKind::Call { callee, args } => {
                self.expr(callee)?;
                self.exprs(args)?;
                let argc = count(args.len(), CompileError::TooManyElements)?;
                self.mark_line(expr.begin);
                self.emit_u16(Opcode::Invoke, argc);
                Ok(())
            }
            ExprKind::Field { object, name } => {
                self.expr(object)?;
                let name = self.name(name)?;
                self.emit_u16(Opcode::GetField, name);
                Ok(())
            }
            ExprKind::Index { object, index } => {
                self.expr(object)?;
                self.expr(index)?;
                self.emit(Opcode::GetIndex);
                Ok(())
            }
            ExprKind::Slice { object, from, to } => {
                self.expr(object)?;
                match (from, to) {
                    (Some(from), Some(to)) => {
                        self.expr(from)?;
                        self.expr(to)?;
                        self.emit(Opcode::Slice);
                    }
                    (Some(from), None) => {
                        self.expr(from)?;
                        self.emit(Opcode::SliceFrom);
                    }
                    (None, Some(to)) => {
                        self.expr(to)?;
                        self.emit(Opcode::SliceTo);
                    }
                    (None, None) => {
                        self.emit(Opcode::LoadZero);
                        self.emit(Opcode::SliceFrom);
                    }
                }
                Ok(())
            }
            ExprKind::Fn(func) => self.closure(func),
            ExprKind::List(items) => self.collection(items, Opcode::NewList),
            ExprKind::Tuple(items) => self.collection(items, Opcode::NewTuple),
            ExprKind::Set(items) => self.collection(items, Opcode::NewSet),
            ExprKind::Dict(entries) => {
                for (key, value) in entries {
                    self.expr(key)?;
                    self.expr(value)?;
                }
                let len = count(entries.len(), CompileError::TooManyElements)?;
                self.emit_u16(Opcode::NewDict, len);
                Ok(())
            }
            ExprKind::Struct(lit) => self.struct_lit(lit),
        }
    }

    fn literal(&mut self, lit: &Literal) -> Result<()> {
        match lit {
            Literal::Null => self.emit(Opcode::LoadNull),
            Literal::Bool(true) => self.emit(Opcode::LoadTrue),
            Literal::Bool(false) => self.emit(Opcode::LoadFalse),
            Literal::Int(0) => self.emit(Opcode::LoadZero),
            Literal::Int(1) => self.emit(Opcode::LoadOne),
            Literal::Int(-1) => self.emit(Opcode::LoadNegOne),
            _ => {
                let index = self.constant(literal_constant(lit))?;
                self.emit_u16(Opcode::LoadConst, index);
            }
        }
        Ok(())
    }

    fn unary(&mut self, op: UnaryOp, operand: &'a Expr) -> Result<()> {
        // Negated literals fold into a single constant.
        if op == UnaryOp::Neg {
            match &operand.kind {
                ExprKind::Literal(Literal::Int(n)) => {
                    return self.literal(&Literal::Int(n.wrapping_neg()));
                }
                ExprKind::Literal(Literal::Float(n)) => {
                    return self.literal(&Literal::Float(-n));
                }
                _ => {}
            }
        }

        self.expr(operand)?;
        self.emit(match op {
            UnaryOp::Neg => Opcode::Negate,
            UnaryOp::Not => Opcode::Not,
            UnaryOp::Complement => Opcode::Complement,
        });
        Ok(())
    }

    /// Short-circuit `&&` and `||` as a diamond of conditional jumps.
    fn logical(&mut self, lhs: &'a Expr, rhs: &'a Expr, is_and: bool) -> Result<()> {
        let (jump, fallthrough, jumped) = if is_and {
            (Opcode::JumpFalse, Opcode::LoadTrue, Opcode::LoadFalse)
        } else {
            (Opcode::JumpTrue, Opcode::LoadFalse, Opcode::LoadTrue)
        };

        self.expr(lhs)?;
        let short_lhs = self.emit_jump(jump);
        self.expr(rhs)?;
        let short_rhs = self.emit_jump(jump);

        self.emit(fallthrough);
        let to_end = self.emit_jump(Opcode::Jump);

        self.patch_jump(short_lhs)?;
        self.patch_jump(short_rhs)?;
        self.emit(jumped);
        self.patch_jump(to_end)
    }

    fn assign(&mut self, target: &'a Expr, op: Option<BinaryOp>, value: &'a Expr) -> Result<()> {
        match &target.kind {
            ExprKind::Ident(ident) => {
                let var = var_of(&ident.var);
                if let Some(op) = op {
                    self.load(var)?;
                    self.expr(value)?;
                    self.emit(binary_opcode(op));
                } else {
                    self.expr(value)?;
                }
                self.emit(Opcode::Dup);
                self.store(var)
            }
            ExprKind::Field { object, name } => {
                self.expr(object)?;
                let name = self.name(name)?;
                if let Some(op) = op {
                    self.emit(Opcode::Dup);
                    self.emit_u16(Opcode::GetField, name);
                    self.expr(value)?;
                    self.emit(binary_opcode(op));
                } else {
                    self.expr(value)?;
                }
                self.emit_u16(Opcode::SetField, name);
                Ok(())
            }
            ExprKind::Index { object, index } => {
                self.expr(object)?;
                self.expr(index)?;
                if let Some(op) = op {
                    self.emit(Opcode::Dup2);
                    self.emit(Opcode::GetIndex);
                    self.expr(value)?;
                    self.emit(binary_opcode(op));
                } else {
                    self.expr(value)?;
                }
                self.emit(Opcode::SetIndex);
                Ok(())
            }
            _ => unreachable!("assignment to a non-assignable expression"),
        }
    }

    /// `x++` leaves the old value on the stack.
    fn postfix(&mut self, target: &'a Expr, op: PostfixOp) -> Result<()> {
        let delta = match op {
            PostfixOp::Inc => Opcode::LoadOne,
            PostfixOp::Dec => Opcode::LoadNegOne,
        };
        match &target.kind {
            ExprKind::Ident(ident) => {
                let var = var_of(&ident.var);
                self.load(var)?;
                self.emit(Opcode::Dup);
                self.emit(delta);
                self.emit(Opcode::Add);
                self.store(var)
            }
            ExprKind::Field { object, name } => {
                self.expr(object)?;
                self.emit(delta);
                let name = self.name(name)?;
                self.emit_u16(Opcode::IncField, name);
                Ok(())
            }
            ExprKind::Index { object, index } => {
                self.expr(object)?;
                self.expr(index)?;
                self.emit(delta);
                self.emit(Opcode::IncIndex);
                Ok(())
            }
            _ => unreachable!("postfix on a non-assignable expression"),
        }
    }

    fn collection(&mut self, items: &'a [Expr], op: Opcode) -> Result<()> {
        self.exprs(items)?;
        let len = count(items.len(), CompileError::TooManyElements)?;
        self.emit_u16(op, len);
        Ok(())
    }

    fn struct_lit(&mut self, lit: &'a StructLit) -> Result<()> {
        let mut fields = Vec::with_capacity(lit.entries.len());
        for entry in &lit.entries {
            let kind = match &entry.kind {
                EntryKind::Field(value) => {
                    self.expr(value)?;
                    FieldKind::Field
                }
                EntryKind::Const(value) => {
                    self.expr(value)?;
                    FieldKind::Readonly
                }
                EntryKind::Prop { getter, setter } => {
                    self.expr(getter)?;
                    match setter {
                        Some(setter) => self.expr(setter)?,
                        None => self.emit(Opcode::LoadNull),
                    }
                    FieldKind::Property {
                        has_setter: setter.is_some(),
                    }
                }
            };
            fields.push((Arc::from(entry.name.as_str()), kind));
        }

        let index = count(self.struct_defs.len(), CompileError::TooManyElements)?;
        self.struct_defs.push(StructDef { fields });
        self.emit_u16(Opcode::NewStruct, index);

        if let Some(this) = lit.this_var {
            self.emit(Opcode::Dup);
            self.store(this)?;
        }
        Ok(())
    }

    /// Emits `NewFunc` followed by one capture instruction per capture, in
    /// the order of the new closure's capture slots.
    fn closure(&mut self, func: &'a FnExpr) -> Result<()> {
        let index = count(self.templates.len(), CompileError::TooManyTemplates)?;
        self.templates.push(None);
        self.pending.push_back((index as usize, func));

        let captures = count(func.scope.captures.len(), CompileError::TooManyLocals)?;
        self.emit_u16x2(Opcode::NewFunc, index, captures);
        for capture in &func.scope.captures {
            let op = if capture.parent.is_capture {
                Opcode::FuncCapture
            } else {
                Opcode::FuncLocal
            };
            self.emit_u16(op, slot(capture.parent)?);
        }
        Ok(())
    }

    // ========================================================================
    // Variables and pools
    // ========================================================================

    fn load(&mut self, var: Variable) -> Result<()> {
        let op = if var.is_capture {
            Opcode::LoadCapture
        } else {
            Opcode::LoadLocal
        };
        self.emit_u16(op, slot(var)?);
        Ok(())
    }

    fn store(&mut self, var: Variable) -> Result<()> {
        let op = if var.is_capture {
            Opcode::StoreCapture
        } else {
            Opcode::StoreLocal
        };
        self.emit_u16(op, slot(var)?);
        Ok(())
    }

    fn builtin(&self, name: &str) -> u16 {
        match self.builtins.lookup(name) {
            Some(index) => index,
            None => unreachable!("unresolved builtin '{name}'"),
        }
    }

    fn constant(&mut self, constant: Constant) -> Result<u16> {
        self.constants.add(constant)
    }

    fn name(&mut self, name: &str) -> Result<u16> {
        self.constant(Constant::Str(name.into()))
    }

    // ========================================================================
    // Emission
    // ========================================================================

    fn emit(&mut self, op: Opcode) {
        debug_assert_eq!(op.width(), 1, "{op:?} takes parameters");
        self.func.code.push(op as u8);
    }

    fn emit_u16(&mut self, op: Opcode, a: u16) {
        debug_assert_eq!(op.width(), 3, "{op:?} takes one parameter");
        self.func.code.push(op as u8);
        self.func.code.extend_from_slice(&a.to_be_bytes());
    }

    fn emit_u16x2(&mut self, op: Opcode, a: u16, b: u16) {
        debug_assert_eq!(op.width(), 5, "{op:?} takes two parameters");
        self.func.code.push(op as u8);
        self.func.code.extend_from_slice(&a.to_be_bytes());
        self.func.code.extend_from_slice(&b.to_be_bytes());
    }

    /// Emits a jump with a placeholder target and returns its offset.
    fn emit_jump(&mut self, op: Opcode) -> usize {
        let at = self.func.code.len();
        self.emit_u16(op, 0);
        at
    }

    /// Points the jump at `at` to the current offset.
    fn patch_jump(&mut self, at: usize) -> Result<()> {
        let target = self.offset()?;
        write_u16(&mut self.func.code, at + 1, target);
        Ok(())
    }

    /// The current offset, which must be addressable by a jump.
    fn offset(&self) -> Result<u16> {
        u16::try_from(self.func.code.len()).map_err(|_| CompileError::FunctionTooLarge {
            name: self.func.name.to_string(),
            size: self.func.code.len(),
        })
    }

    fn mark_line(&mut self, pos: Pos) {
        let Ok(offset) = u16::try_from(self.func.code.len()) else {
            return;
        };
        match self.func.lines.last_mut() {
            Some(last) if last.line == pos.line => {}
            Some(last) if last.offset == offset => last.line = pos.line,
            _ => self.func.lines.push(LineEntry {
                offset,
                line: pos.line,
            }),
        }
    }
}

fn var_of(var: &Option<Variable>) -> Variable {
    match var {
        Some(var) => *var,
        None => unreachable!("variable left unresolved by analysis"),
    }
}

fn slot(var: Variable) -> Result<u16> {
    u16::try_from(var.index).map_err(|_| CompileError::TooManyLocals)
}

fn count(n: usize, err: CompileError) -> Result<u16> {
    u16::try_from(n).map_err(|_| err)
}

fn literal_constant(lit: &Literal) -> Constant {
    match lit {
        Literal::Null => Constant::Null,
        Literal::Bool(b) => Constant::Bool(*b),
        Literal::Int(n) => Constant::Int(*n),
        Literal::Float(n) => Constant::Float(*n),
        Literal::Str(s) => Constant::Str(s.as_str().into()),
    }
}

fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::Ne => Opcode::Ne,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Lte => Opcode::Lte,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::Gte => Opcode::Gte,
        BinaryOp::Cmp => Opcode::Cmp,
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Rem => Opcode::Rem,
        BinaryOp::BitOr => Opcode::BitOr,
        BinaryOp::BitXor => Opcode::BitXor,
        BinaryOp::BitAnd => Opcode::BitAnd,
        BinaryOp::Shl => Opcode::LeftShift,
        BinaryOp::Shr => Opcode::RightShift,
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators have no opcode"),
    }
}
