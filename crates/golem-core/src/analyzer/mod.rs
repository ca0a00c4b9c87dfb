// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scope analysis for Golem modules.
//!
//! The analyzer walks a parsed [`Module`](crate::ast::Module), resolves every
//! identifier to a [`Variable`] and fills in each function's [`FuncScope`].
//!
//! ## Captures
//!
//! A function only ever reads captures from its immediately enclosing
//! function. When a name is declared two or more functions up, every
//! function in between receives a capture of its own, so the chain is
//! walked one level at a time when closures are created.
//!
//! ## Errors
//!
//! Analysis does not stop at the first problem. Every error found in a
//! module is reported together in [`AnalysisErrors`].
//!
//! ## Usage
//!
//! ```rust
//! use golem_core::analyzer::analyze;
//! use golem_core::parser::Parser;
//!
//! let mut module = Parser::new("let x = 1\nlet f = || => x").parse_module("m").unwrap();
//! let builtins: &[&str] = &["println"];
//! analyze(&mut module, builtins).expect("Should analyze");
//! assert_eq!(module.init.scope.num_locals, 2);
//! ```

mod scope;

pub use scope::{BuiltinLookup, Capture, FuncScope, Variable};

use scope::FuncContext;

use crate::ast::*;
use crate::error::{AnalysisError, AnalysisErrorKind, AnalysisErrors};
use crate::lexer::Pos;

/// The name under which a struct literal's hidden `this` local is declared.
/// It is not a valid identifier, so user code cannot shadow it.
const THIS_NAME: &str = "this";

/// Resolves every name in `module`.
pub fn analyze<B>(module: &mut Module, builtins: &B) -> Result<(), AnalysisErrors>
where
    B: BuiltinLookup + ?Sized,
{
    let mut analyzer = Analyzer::new(builtins);
    analyzer.analyze_module(module);
    analyzer.finish()
}

/// The scope analyzer.
pub struct Analyzer<'b, B: ?Sized> {
    funcs: Vec<FuncContext>,
    builtins: &'b B,
    errors: Vec<AnalysisError>,
}

impl<'b, B: BuiltinLookup + ?Sized> Analyzer<'b, B> {
    /// Creates an analyzer resolving free names against `builtins`.
    pub fn new(builtins: &'b B) -> Self {
        Self {
            funcs: Vec::new(),
            builtins,
            errors: Vec::new(),
        }
    }

    /// Analyzes a module. Imports become const locals of its init function.
    pub fn analyze_module(&mut self, module: &mut Module) {
        self.funcs.push(FuncContext::new());
        for import in &mut module.imports {
            self.declare(import, true);
        }
        self.stmts(&mut module.init.body.stmts);
        module.init.scope = self.pop_func();
    }

    /// Returns the collected errors, in source order.
    pub fn finish(mut self) -> Result<(), AnalysisErrors> {
        if self.errors.is_empty() {
            return Ok(());
        }
        self.errors.sort_by_key(|e| e.pos);
        Err(AnalysisErrors(self.errors))
    }

    fn ctx(&mut self) -> &mut FuncContext {
        match self.funcs.last_mut() {
            Some(ctx) => ctx,
            None => unreachable!("analysis outside of a function"),
        }
    }

    fn pop_func(&mut self) -> FuncScope {
        match self.funcs.pop() {
            Some(ctx) => ctx.finish(),
            None => unreachable!("unbalanced function contexts"),
        }
    }

    fn error(&mut self, kind: AnalysisErrorKind, pos: Pos) {
        self.errors.push(AnalysisError { kind, pos });
    }

    // ========================================================================
    // Declarations and lookup
    // ========================================================================

    fn declare(&mut self, ident: &mut DeclIdent, is_const: bool) {
        match self.ctx().declare(&ident.name, is_const) {
            Some(var) => ident.var = Some(var),
            None => self.error(
                AnalysisErrorKind::DuplicateDeclaration(ident.name.clone()),
                ident.pos,
            ),
        }
    }

    fn resolve(&mut self, name: &str) -> Option<Variable> {
        let depth = self.funcs.len().checked_sub(1)?;
        self.resolve_at(depth, name)
    }

    /// Looks `name` up in function `depth`, creating captures in every
    /// function between the declaring one and `depth`.
    fn resolve_at(&mut self, depth: usize, name: &str) -> Option<Variable> {
        if let Some(var) = self.funcs[depth].find(name) {
            return Some(var);
        }
        if depth == 0 {
            return None;
        }
        let parent = self.resolve_at(depth - 1, name)?;
        Some(self.funcs[depth].add_capture(name, parent))
    }

    // ========================================================================
    // Functions and statements
    // ========================================================================

    fn function(&mut self, func: &mut FnExpr) {
        self.funcs.push(FuncContext::new());
        for param in &mut func.params {
            self.declare(&mut param.ident, false);
        }
        // The body shares the parameters' block.
        self.stmts(&mut func.body.stmts);
        func.scope = self.pop_func();
    }

    fn block(&mut self, block: &mut Block) {
        self.ctx().push_block();
        self.stmts(&mut block.stmts);
        self.ctx().pop_block();
    }

    /// Analyzes a statement list in the current block, hoisting named
    /// functions first so they may call each other.
    fn stmts(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts.iter_mut() {
            if let StmtKind::NamedFn(named) = &mut stmt.kind {
                self.declare(&mut named.ident, true);
            }
        }
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Decl(decl) => {
                for var in &mut decl.vars {
                    if let Some(init) = &mut var.init {
                        self.expr(init);
                    }
                    self.declare(&mut var.ident, decl.is_const);
                }
            }
            StmtKind::NamedFn(named) => self.function(&mut named.func),
            StmtKind::If(stmt) => {
                self.expr(&mut stmt.cond);
                self.block(&mut stmt.then);
                if let Some(otherwise) = &mut stmt.otherwise {
                    self.stmt(otherwise);
                }
            }
            StmtKind::While(stmt) => {
                self.expr(&mut stmt.cond);
                self.loop_body(&mut stmt.body);
            }
            StmtKind::For(stmt) => {
                self.expr(&mut stmt.iterable);
                self.ctx().push_block();
                stmt.iter_var = Some(self.ctx().hidden_local());
                for var in &mut stmt.vars {
                    self.declare(var, false);
                }
                self.loop_body(&mut stmt.body);
                self.ctx().pop_block();
            }
            StmtKind::Switch(stmt) => {
                if let Some(subject) = &mut stmt.subject {
                    self.expr(subject);
                    stmt.subject_var = Some(self.ctx().hidden_local());
                }
                for case in &mut stmt.cases {
                    for m in &mut case.matches {
                        self.expr(m);
                    }
                    self.ctx().push_block();
                    self.stmts(&mut case.body);
                    self.ctx().pop_block();
                }
                if let Some(default) = &mut stmt.default {
                    self.ctx().push_block();
                    self.stmts(default);
                    self.ctx().pop_block();
                }
            }
            StmtKind::Break => {
                if self.ctx().loop_depth == 0 {
                    self.error(AnalysisErrorKind::InvalidBreak, stmt.pos);
                }
            }
            StmtKind::Continue => {
                if self.ctx().loop_depth == 0 {
                    self.error(AnalysisErrorKind::InvalidContinue, stmt.pos);
                }
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            StmtKind::Throw(value) | StmtKind::Go(value) | StmtKind::Expr(value) => {
                self.expr(value)
            }
            StmtKind::Try(stmt) => {
                self.block(&mut stmt.body);
                if let Some(catch) = &mut stmt.catch {
                    self.ctx().push_block();
                    self.declare(&mut catch.ident, false);
                    self.block(&mut catch.body);
                    self.ctx().pop_block();
                }
                if let Some(finally) = &mut stmt.finally {
                    self.block(finally);
                }
            }
            StmtKind::Block(block) => self.block(block),
        }
    }

    fn loop_body(&mut self, body: &mut Block) {
        self.ctx().loop_depth += 1;
        self.block(body);
        self.ctx().loop_depth -= 1;
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&mut self, expr: &mut Expr) {
        let pos = expr.begin;
        match &mut expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Ident(ident) => {
                ident.var = self.resolve(&ident.name);
                if ident.var.is_none() && self.builtins.lookup(&ident.name).is_none() {
                    self.error(AnalysisErrorKind::UndefinedSymbol(ident.name.clone()), pos);
                }
            }
            ExprKind::This(slot) => {
                *slot = self.resolve(THIS_NAME);
                if slot.is_none() {
                    self.error(AnalysisErrorKind::ThisOutsideStruct, pos);
                }
            }
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.expr(cond);
                self.expr(then);
                self.expr(otherwise);
            }
            ExprKind::Assign { target, value, .. } => {
                self.assign_target(target);
                self.expr(value);
            }
            ExprKind::Postfix { target, .. } => self.assign_target(target),
            ExprKind::Call { callee, args } => {
                self.expr(callee);
                self.exprs(args);
            }
            ExprKind::Field { object, .. } => self.expr(object),
            ExprKind::Index { object, index } => {
                self.expr(object);
                self.expr(index);
            }
            ExprKind::Slice { object, from, to } => {
                self.expr(object);
                if let Some(from) = from {
                    self.expr(from);
                }
                if let Some(to) = to {
                    self.expr(to);
                }
            }
            ExprKind::Fn(func) => self.function(func),
            ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => {
                self.exprs(items)
            }
            ExprKind::Dict(entries) => {
                for (key, value) in entries {
                    self.expr(key);
                    self.expr(value);
                }
            }
            ExprKind::Struct(lit) => self.struct_lit(lit),
        }
    }

    fn exprs(&mut self, exprs: &mut [Expr]) {
        for expr in exprs {
            self.expr(expr);
        }
    }

    /// Checks that `target` may be assigned to, then resolves it.
    fn assign_target(&mut self, target: &mut Expr) {
        let pos = target.begin;
        match &mut target.kind {
            ExprKind::Ident(ident) => {
                ident.var = self.resolve(&ident.name);
                match ident.var {
                    Some(var) if var.is_const => self.error(
                        AnalysisErrorKind::InvalidAssignment(ident.name.clone()),
                        pos,
                    ),
                    Some(_) => {}
                    None if self.builtins.lookup(&ident.name).is_some() => self.error(
                        AnalysisErrorKind::InvalidAssignment(ident.name.clone()),
                        pos,
                    ),
                    None => self.error(
                        AnalysisErrorKind::UndefinedSymbol(ident.name.clone()),
                        pos,
                    ),
                }
            }
            ExprKind::Field { .. } | ExprKind::Index { .. } => self.expr(target),
            _ => {
                self.error(
                    AnalysisErrorKind::InvalidAssignment("expression".to_string()),
                    pos,
                );
                self.expr(target);
            }
        }
    }

    fn struct_lit(&mut self, lit: &mut StructLit) {
        self.ctx().push_block();
        lit.this_var = self.ctx().declare(THIS_NAME, true);

        for entry in &mut lit.entries {
            match &mut entry.kind {
                EntryKind::Field(value) | EntryKind::Const(value) => self.expr(value),
                EntryKind::Prop { getter, setter } => {
                    self.expr(getter);
                    if let Some(setter) = setter {
                        self.expr(setter);
                    }
                }
            }
        }

        self.ctx().pop_block();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    const BUILTINS: &[&str] = &["println", "len"];

    fn analyze_src(src: &str) -> Result<Module, AnalysisErrors> {
        let mut module = Parser::new(src)
            .parse_module("test")
            .expect("Should parse");
        analyze(&mut module, BUILTINS)?;
        Ok(module)
    }

    fn analyze_ok(src: &str) -> Module {
        analyze_src(src).expect("Should analyze")
    }

    fn error_kinds(src: &str) -> Vec<AnalysisErrorKind> {
        analyze_src(src)
            .expect_err("Should fail")
            .0
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    fn named_fn(stmt: &Stmt) -> &FnExpr {
        match &stmt.kind {
            StmtKind::NamedFn(named) => &named.func,
            other => panic!("expected fn, got {other:?}"),
        }
    }

    fn returned_fn(func: &FnExpr) -> &FnExpr {
        match func.body.stmts.last().map(|s| &s.kind) {
            Some(StmtKind::Return(Some(Expr {
                kind: ExprKind::Fn(inner),
                ..
            }))) => inner,
            other => panic!("expected returned fn, got {other:?}"),
        }
    }

    #[test]
    fn test_locals_get_consecutive_slots() {
        let module = analyze_ok("let a = 1\nconst b = 2\nfn f() {}");
        assert_eq!(module.init.scope.num_locals, 3);
        assert!(module.init.scope.captures.is_empty());
    }

    #[test]
    fn test_params_come_first() {
        let module = analyze_ok("fn f(a, b) { let c = a\nreturn c }");
        let func = named_fn(&module.init.body.stmts[0]);
        assert_eq!(func.params[0].ident.var, Some(Variable::local(0, false)));
        assert_eq!(func.params[1].ident.var, Some(Variable::local(1, false)));
        assert_eq!(func.scope.num_locals, 3);
    }

    #[test]
    fn test_capture_chain_through_intermediate_function() {
        let module = analyze_ok(
            "fn outer() {\n let x = 1\n return fn() {\n return fn() { return x }\n }\n}",
        );
        let outer = named_fn(&module.init.body.stmts[0]);
        let middle = returned_fn(outer);
        let inner = returned_fn(middle);

        assert_eq!(
            middle.scope.captures,
            vec![Capture {
                child: Variable::capture(0, false),
                parent: Variable::local(0, false),
            }]
        );
        assert_eq!(
            inner.scope.captures,
            vec![Capture {
                child: Variable::capture(0, false),
                parent: Variable::capture(0, false),
            }]
        );
    }

    #[test]
    fn test_capture_is_shared_between_references() {
        let module = analyze_ok("let n = 0\nlet f = || => { n = n + 1\nreturn n }");
        match &module.init.body.stmts[1].kind {
            StmtKind::Decl(decl) => match decl.vars[0].init.as_ref().map(|e| &e.kind) {
                Some(ExprKind::Fn(func)) => assert_eq!(func.scope.captures.len(), 1),
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_hoisting_allows_mutual_recursion() {
        analyze_ok(
            "fn even(n) { return n == 0 ? true : odd(n - 1) }\n\
             fn odd(n) { return n == 0 ? false : even(n - 1) }",
        );
    }

    #[test]
    fn test_let_is_declared_after_initializer() {
        assert_eq!(
            error_kinds("let a = a"),
            vec![AnalysisErrorKind::UndefinedSymbol("a".into())]
        );
    }

    #[test]
    fn test_duplicate_declaration() {
        assert_eq!(
            error_kinds("let a = 1\nlet a = 2"),
            vec![AnalysisErrorKind::DuplicateDeclaration("a".into())]
        );
        assert_eq!(
            error_kinds("fn f(a, a) {}"),
            vec![AnalysisErrorKind::DuplicateDeclaration("a".into())]
        );
    }

    #[test]
    fn test_shadowing_in_nested_block_is_allowed() {
        analyze_ok("let a = 1\n{ let a = 2 }\nif true { let a = 3 }");
    }

    #[test]
    fn test_builtins_resolve_without_slot() {
        let module = analyze_ok("println(len([1]))");
        match &module.init.body.stmts[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Call { callee, .. },
                ..
            }) => assert!(matches!(&callee.kind, ExprKind::Ident(Ident { var: None, .. }))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_user_declaration_shadows_builtin() {
        let module = analyze_ok("let len = 3\nlen = 4");
        assert_eq!(module.init.scope.num_locals, 1);
    }

    #[test]
    fn test_invalid_assignments() {
        assert_eq!(
            error_kinds("const a = 1\na = 2"),
            vec![AnalysisErrorKind::InvalidAssignment("a".into())]
        );
        assert_eq!(
            error_kinds("fn f() {}\nf = 1"),
            vec![AnalysisErrorKind::InvalidAssignment("f".into())]
        );
        assert_eq!(
            error_kinds("println = 1"),
            vec![AnalysisErrorKind::InvalidAssignment("println".into())]
        );
        assert_eq!(
            error_kinds("1 = 2"),
            vec![AnalysisErrorKind::InvalidAssignment("expression".into())]
        );
    }

    #[test]
    fn test_captured_const_stays_const() {
        assert_eq!(
            error_kinds("const a = 1\nlet f = || => { a = 2 }"),
            vec![AnalysisErrorKind::InvalidAssignment("a".into())]
        );
    }

    #[test]
    fn test_break_and_continue_outside_loop() {
        assert_eq!(error_kinds("break"), vec![AnalysisErrorKind::InvalidBreak]);
        assert_eq!(
            error_kinds("while true { let f = || => { continue } }"),
            vec![AnalysisErrorKind::InvalidContinue]
        );
        analyze_ok("for x in [1] { if x == 1 { continue }\nbreak }");
    }

    #[test]
    fn test_this_inside_struct() {
        let module = analyze_ok("let s = struct { n: 1, get: || => this.n }");
        assert_eq!(module.init.scope.num_locals, 2);
        assert_eq!(error_kinds("let x = this"), vec![AnalysisErrorKind::ThisOutsideStruct]);
    }

    #[test]
    fn test_hidden_locals_for_loops_and_switches() {
        let module = analyze_ok("for (k, v) in dict {} {}\nswitch 1 { case 1: 2 }");
        // iterator + k + v + switch subject
        assert_eq!(module.init.scope.num_locals, 4);
    }

    #[test]
    fn test_imports_are_const_locals() {
        let module = analyze_ok("import math\nlet x = math");
        assert_eq!(module.imports[0].var, Some(Variable::local(0, true)));
        assert_eq!(
            error_kinds("import math\nmath = 1"),
            vec![AnalysisErrorKind::InvalidAssignment("math".into())]
        );
    }

    #[test]
    fn test_errors_are_collected() {
        let errors = analyze_src("a\nlet b = 1\nlet b = 2\nbreak").expect_err("Should fail");
        assert_eq!(errors.errors().len(), 3);
        assert!(errors.errors().windows(2).all(|w| w[0].pos <= w[1].pos));
    }

    #[test]
    fn test_catch_variable_is_scoped() {
        assert_eq!(
            error_kinds("try { } catch e { }\nprintln(e)"),
            vec![AnalysisErrorKind::UndefinedSymbol("e".into())]
        );
    }
}
