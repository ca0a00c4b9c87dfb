// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression parsing utilities and documentation.
//!
//! This module documents the expression parsing logic found in `parser.rs`.
//!
//! ## Operator Precedence (lowest to highest)
//!
//! | Level | Operators | Associativity | Method |
//! |-------|-----------|---------------|--------|
//! | 1 | `=` `+=` `-=` `*=` `/=` `%=` `<<=` `>>=` `&=` `\|=` `^=` | right | `parse_expression` |
//! | 2 | `? :` | right | `parse_ternary` |
//! | 3 | `\|\|` | left | `parse_or` |
//! | 4 | `&&` | left | `parse_and` |
//! | 5 | `==` `!=` `<` `<=` `>` `>=` `<=>` | left | `parse_comparison` |
//! | 6 | `+` `-` `\|` `^` | left | `parse_additive` |
//! | 7 | `*` `/` `%` `<<` `>>` `&` | left | `parse_multiplicative` |
//! | 8 | `-` `!` `~` (prefix) | right | `parse_unary` |
//! | 9 | `.` `()` `[]` `++` `--` | left | `parse_postfix` |
//!
//! ## Primary Expressions
//!
//! - Literals: `null`, `true`, `false`, integers, floats, strings
//! - Identifiers and `this`
//! - Grouping `(e)` and tuples `(a, b)`
//! - Lists `[a, b]`, `dict { k: v }`, `set { a, b }`
//! - `struct { a: 1, const b: 2, prop c: getter }`
//! - Functions `fn(a, b = 1, rest...) { .. }` and lambdas `|a| => a + 1`

// This module serves as documentation. The actual implementation is in parser.rs.

#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOp, Expr, ExprKind, Literal, StmtKind, UnaryOp};
    use crate::parser::Parser;

    fn parse_expr(src: &str) -> Expr {
        let mut parser = Parser::new(src);
        parser.parse_expression().expect("Should parse")
    }

    fn parse_fails(src: &str) -> bool {
        Parser::new(src).parse_module("test").is_err()
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_expr("42").kind, ExprKind::Literal(Literal::Int(42)));
        assert_eq!(parse_expr("2.5").kind, ExprKind::Literal(Literal::Float(2.5)));
        assert_eq!(
            parse_expr("'hi'").kind,
            ExprKind::Literal(Literal::Str("hi".into()))
        );
        assert_eq!(parse_expr("null").kind, ExprKind::Literal(Literal::Null));
    }

    #[test]
    fn test_parse_unary() {
        assert!(matches!(
            parse_expr("-x").kind,
            ExprKind::Unary { op: UnaryOp::Neg, .. }
        ));
        assert!(matches!(
            parse_expr("!!x").kind,
            ExprKind::Unary { op: UnaryOp::Not, .. }
        ));
        assert!(matches!(
            parse_expr("~x").kind,
            ExprKind::Unary { op: UnaryOp::Complement, .. }
        ));
    }

    #[test]
    fn test_parse_shift_binds_like_multiplication() {
        match parse_expr("1 + 2 << 3").kind {
            ExprKind::Binary { op, rhs, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Shl, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_comparison_is_left_associative() {
        match parse_expr("a < b == c").kind {
            ExprKind::Binary { op, lhs, .. } => {
                assert_eq!(op, BinaryOp::Eq);
                assert!(matches!(lhs.kind, ExprKind::Binary { op: BinaryOp::Lt, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_ternary() {
        assert!(matches!(parse_expr("a ? b : c ? d : e").kind, ExprKind::Ternary { .. }));
    }

    #[test]
    fn test_parse_method_call() {
        match parse_expr("list.add(1)").kind {
            ExprKind::Call { callee, args } => {
                assert_eq!(args.len(), 1);
                assert!(matches!(callee.kind, ExprKind::Field { name, .. } if name == "add"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_chained_postfix() {
        assert!(matches!(parse_expr("a.b[0](1).c").kind, ExprKind::Field { .. }));
    }

    #[test]
    fn test_parse_struct_with_this() {
        match parse_expr("struct { n: 1, get: || => this.n }").kind {
            ExprKind::Struct(lit) => assert_eq!(lit.entries.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_fn_literal() {
        match parse_expr("fn(a, b = 1) { return a + b }").kind {
            ExprKind::Fn(func) => {
                assert_eq!(func.params.len(), 2);
                assert!(matches!(func.body.stmts[0].kind, StmtKind::Return(Some(_))));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_single_element_parens_are_grouping() {
        assert!(matches!(parse_expr("(1 + 2)").kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn test_invalid_assignment_targets_parse() {
        // Rejected later by the analyzer.
        assert!(matches!(parse_expr("1 = 2").kind, ExprKind::Assign { .. }));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_fails("1 +"));
        assert!(parse_fails("[1, 2"));
        assert!(parse_fails("dict { 1 }"));
        assert!(parse_fails("f(,)"));
    }
}
