// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Statement parsing utilities and documentation.
//!
//! This module documents the statement parsing logic found in `parser.rs`.
//!
//! ## Statement Types
//!
//! | Statement | Method |
//! |-----------|--------|
//! | Declaration | `parse_declaration` |
//! | Named function | `parse_named_fn` |
//! | If | `parse_if` |
//! | While | `parse_while` |
//! | For-In | `parse_for` |
//! | Switch | `parse_switch` |
//! | Return | `parse_return` |
//! | Break / Continue | inline in `parse_statement` |
//! | Throw | inline in `parse_statement` |
//! | Try | `parse_try` |
//! | Go | `parse_go` |
//! | Block | `parse_block` |
//! | Expression | inline in `parse_statement` |
//!
//! ## Termination
//!
//! A simple statement ends at a `;`, at a linefeed, before a `}` or at the
//! end of input. Stray semicolons between statements are ignored.
//!
//! ## Grammar Overview
//!
//! ```text
//! Statement :
//!     Block
//!     Declaration             (let | const) Name [= Expr] {, Name [= Expr]}
//!     NamedFunction           fn Name ( Params ) Block
//!     IfStatement             if Expr Block [else (IfStatement | Block)]
//!     WhileStatement          while Expr Block
//!     ForStatement            for (Name | ( Name , Name {, Name} )) in Expr Block
//!     SwitchStatement         switch [Expr] { {case Expr {, Expr} : Stmts} [default : Stmts] }
//!     TryStatement            try Block [catch Name Block] [finally Block]
//!     GoStatement             go CallExpr
//!     BreakStatement          break
//!     ContinueStatement       continue
//!     ReturnStatement         return [Expr]
//!     ThrowStatement          throw Expr
//!     ExpressionStatement     Expr
//! ```
//!
//! ## Example
//!
//! ```text
//! let total = 0
//! for (k, v) in dict { 'a': 1, 'b': 2 } {
//!     total += v
//! }
//!
//! switch total {
//!     case 3: println('three')
//!     default: println('other')
//! }
//!
//! try {
//!     throw 'oops'
//! } catch e {
//!     println(e)
//! } finally {
//!     println('done')
//! }
//! ```

// This module serves as documentation. The actual implementation is in parser.rs.

#[cfg(test)]
mod tests {
    use crate::ast::{Stmt, StmtKind};
    use crate::parser::Parser;

    fn parse_stmt(src: &str) -> Stmt {
        let mut parser = Parser::new(src);
        parser.parse_statement().expect("Should parse")
    }

    #[test]
    fn test_parse_let() {
        let stmt = parse_stmt("let x = 5");
        assert!(matches!(stmt.kind, StmtKind::Decl(d) if !d.is_const));
    }

    #[test]
    fn test_parse_const() {
        let stmt = parse_stmt("const PI = 3.14;");
        assert!(matches!(stmt.kind, StmtKind::Decl(d) if d.is_const));
    }

    #[test]
    fn test_parse_named_fn() {
        let stmt = parse_stmt("fn square(n) { return n * n }");
        assert!(matches!(stmt.kind, StmtKind::NamedFn(_)));
    }

    #[test]
    fn test_parse_anonymous_fn_is_expression() {
        let stmt = parse_stmt("fn(n) { return n }(3)");
        assert!(matches!(stmt.kind, StmtKind::Expr(_)));
    }

    #[test]
    fn test_parse_if() {
        let stmt = parse_stmt("if x > 0 { y = 1 }");
        assert!(matches!(stmt.kind, StmtKind::If(_)));
    }

    #[test]
    fn test_parse_while() {
        let stmt = parse_stmt("while x < 10 { x++ }");
        assert!(matches!(stmt.kind, StmtKind::While(_)));
    }

    #[test]
    fn test_parse_for_in() {
        let stmt = parse_stmt("for i in range(10) { }");
        assert!(matches!(stmt.kind, StmtKind::For(_)));
    }

    #[test]
    fn test_parse_break_continue() {
        assert_eq!(parse_stmt("break").kind, StmtKind::Break);
        assert_eq!(parse_stmt("continue;").kind, StmtKind::Continue);
    }

    #[test]
    fn test_parse_return() {
        assert!(matches!(parse_stmt("return 42").kind, StmtKind::Return(Some(_))));
        assert!(matches!(parse_stmt("return;").kind, StmtKind::Return(None)));
    }

    #[test]
    fn test_parse_throw() {
        let stmt = parse_stmt("throw 'oops'");
        assert!(matches!(stmt.kind, StmtKind::Throw(_)));
    }

    #[test]
    fn test_parse_try() {
        let stmt = parse_stmt("try { x = 1 } catch e { }");
        assert!(matches!(stmt.kind, StmtKind::Try(_)));
    }

    #[test]
    fn test_parse_go() {
        let stmt = parse_stmt("go worker(1, 2)");
        assert!(matches!(stmt.kind, StmtKind::Go(_)));
    }

    #[test]
    fn test_parse_block() {
        let stmt = parse_stmt("{ let x = 1; let y = 2 }");
        assert!(matches!(stmt.kind, StmtKind::Block(b) if b.stmts.len() == 2));
    }

    #[test]
    fn test_statement_position() {
        let stmt = parse_stmt("  let x = 1");
        assert_eq!(stmt.pos.col, 3);
    }
}
