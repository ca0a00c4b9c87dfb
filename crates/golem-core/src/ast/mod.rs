// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) definitions for Golem.
//!
//! The parser produces a [`Module`] whose top-level statements live in a
//! synthetic `init` function. The scope analyzer then fills in the
//! `Option<Variable>` slots and every [`FnExpr`]'s [`FuncScope`]; the
//! compiler reads them back. The tree is discarded after compilation.

use crate::analyzer::{FuncScope, Variable};
use crate::lexer::Pos;

/// Name of the synthetic function holding a module's top-level statements.
pub const INIT_NAME: &str = "init";

/// A parsed module.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// The module name
    pub name: String,
    /// Imported module names, in source order
    pub imports: Vec<DeclIdent>,
    /// The synthetic top-level function
    pub init: FnExpr,
}

/// A name introduced by a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclIdent {
    /// The declared name
    pub name: String,
    /// Where the name appears
    pub pos: Pos,
    /// Storage assigned by the analyzer
    pub var: Option<Variable>,
}

impl DeclIdent {
    /// Creates an unresolved declaration.
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        Self {
            name: name.into(),
            pos,
            var: None,
        }
    }
}

/// A function literal.
#[derive(Debug, Clone, PartialEq)]
pub struct FnExpr {
    /// The name, for named declarations and `init`
    pub name: Option<String>,
    /// Parameters, in order
    pub params: Vec<Param>,
    /// Whether the last parameter collects extra arguments into a list
    pub variadic: bool,
    /// The function body
    pub body: Block,
    /// Start of the literal
    pub begin: Pos,
    /// End of the literal
    pub end: Pos,
    /// Local and capture layout, filled in by the analyzer
    pub scope: FuncScope,
}

impl FnExpr {
    /// Number of parameters without a default value.
    pub fn required_params(&self) -> usize {
        let fixed = self.params.iter().filter(|p| p.default.is_none()).count();
        if self.variadic { fixed - 1 } else { fixed }
    }

    /// Number of parameters with a default value.
    pub fn optional_params(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_some()).count()
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// The parameter name
    pub ident: DeclIdent,
    /// Default value for an optional parameter
    pub default: Option<Literal>,
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `null`
    Null,
    /// `true` or `false`
    Bool(bool),
    /// An integer literal
    Int(i64),
    /// A floating point literal
    Float(f64),
    /// A string literal
    Str(String),
}

/// A braced sequence of statements with its own block scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The statements
    pub stmts: Vec<Stmt>,
    /// Position of `{`
    pub begin: Pos,
    /// Position of `}`
    pub end: Pos,
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// What kind of statement
    pub kind: StmtKind,
    /// Where the statement starts
    pub pos: Pos,
}

/// The different kinds of statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `let` or `const` declaration
    Decl(Decl),
    /// `fn name(..) { .. }`
    NamedFn(NamedFn),
    /// `if` / `else if` / `else`
    If(If),
    /// `while cond { .. }`
    While(While),
    /// `for x in expr { .. }`
    For(For),
    /// `switch [expr] { case ..: .. default: .. }`
    Switch(Switch),
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `return [expr]`
    Return(Option<Expr>),
    /// `throw expr`
    Throw(Expr),
    /// `try { .. } catch e { .. } finally { .. }`
    Try(Try),
    /// `go f(args)`
    Go(Expr),
    /// A nested block
    Block(Block),
    /// An expression evaluated for its effect
    Expr(Expr),
}

/// A `let` or `const` declaration of one or more names.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    /// Whether this is `const`
    pub is_const: bool,
    /// The declared names and their initializers
    pub vars: Vec<Declarator>,
}

/// One name in a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    /// The declared name
    pub ident: DeclIdent,
    /// The initializer; a missing one means `null`
    pub init: Option<Expr>,
}

/// A named function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedFn {
    /// The declared name
    pub ident: DeclIdent,
    /// The function
    pub func: FnExpr,
}

/// An `if` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct If {
    /// The condition
    pub cond: Expr,
    /// Executed when the condition is true
    pub then: Block,
    /// An `else` block or `else if` statement
    pub otherwise: Option<Box<Stmt>>,
}

/// A `while` loop.
#[derive(Debug, Clone, PartialEq)]
pub struct While {
    /// The loop condition
    pub cond: Expr,
    /// The loop body
    pub body: Block,
}

/// A `for .. in` loop.
#[derive(Debug, Clone, PartialEq)]
pub struct For {
    /// The loop variables; more than one means tuple destructuring
    pub vars: Vec<DeclIdent>,
    /// Whether the variables were written as a tuple `(a, b)`
    pub tuple: bool,
    /// The value iterated over
    pub iterable: Expr,
    /// The loop body
    pub body: Block,
    /// Hidden local holding the iterator
    pub iter_var: Option<Variable>,
}

/// A `switch` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    /// The value compared against each case, if any
    pub subject: Option<Expr>,
    /// The cases, in source order
    pub cases: Vec<Case>,
    /// The `default` clause
    pub default: Option<Vec<Stmt>>,
    /// Hidden local holding the evaluated subject
    pub subject_var: Option<Variable>,
}

/// One `case` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    /// Comma-separated match expressions
    pub matches: Vec<Expr>,
    /// The statements run on a match
    pub body: Vec<Stmt>,
    /// Position of `case`
    pub pos: Pos,
}

/// A `try` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Try {
    /// The protected block
    pub body: Block,
    /// The `catch` clause
    pub catch: Option<Catch>,
    /// The `finally` block
    pub finally: Option<Block>,
}

/// A `catch` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    /// The name bound to the caught value
    pub ident: DeclIdent,
    /// The handler body
    pub body: Block,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// What kind of expression
    pub kind: ExprKind,
    /// Where the expression starts
    pub begin: Pos,
    /// Where the expression ends
    pub end: Pos,
}

/// The different kinds of expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal
    Literal(Literal),
    /// A reference to a name
    Ident(Ident),
    /// `this` inside a struct literal, resolved to the struct's hidden local
    This(Option<Variable>),
    /// A prefix operator
    Unary {
        /// The operator
        op: UnaryOp,
        /// The operand
        operand: Box<Expr>,
    },
    /// An infix operator
    Binary {
        /// The operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// `cond ? then : otherwise`
    Ternary {
        /// The condition
        cond: Box<Expr>,
        /// Value when true
        then: Box<Expr>,
        /// Value when false
        otherwise: Box<Expr>,
    },
    /// `target = value` or a compound assignment like `target += value`
    Assign {
        /// The assigned expression
        target: Box<Expr>,
        /// The operator of a compound assignment
        op: Option<BinaryOp>,
        /// The new value
        value: Box<Expr>,
    },
    /// `target++` or `target--`
    Postfix {
        /// The incremented expression
        target: Box<Expr>,
        /// The operator
        op: PostfixOp,
    },
    /// `callee(args)`
    Call {
        /// The invoked value
        callee: Box<Expr>,
        /// The arguments
        args: Vec<Expr>,
    },
    /// `object.name`
    Field {
        /// The value whose field is read
        object: Box<Expr>,
        /// The field name
        name: String,
    },
    /// `object[index]`
    Index {
        /// The indexed value
        object: Box<Expr>,
        /// The index
        index: Box<Expr>,
    },
    /// `object[from:to]`, `object[from:]` or `object[:to]`
    Slice {
        /// The sliced value
        object: Box<Expr>,
        /// Inclusive start
        from: Option<Box<Expr>>,
        /// Exclusive end
        to: Option<Box<Expr>>,
    },
    /// A function literal
    Fn(Box<FnExpr>),
    /// `[a, b]`
    List(Vec<Expr>),
    /// `(a, b)`
    Tuple(Vec<Expr>),
    /// `dict { k: v }`
    Dict(Vec<(Expr, Expr)>),
    /// `set { a, b }`
    Set(Vec<Expr>),
    /// `struct { .. }`
    Struct(StructLit),
}

impl ExprKind {
    /// Returns true if this expression can be assigned to.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            ExprKind::Ident(_) | ExprKind::Field { .. } | ExprKind::Index { .. }
        )
    }
}

/// A reference to a name.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    /// The referenced name
    pub name: String,
    /// Storage resolved by the analyzer; `None` for builtins
    pub var: Option<Variable>,
}

/// A struct literal.
#[derive(Debug, Clone, PartialEq)]
pub struct StructLit {
    /// The fields, in source order
    pub entries: Vec<StructEntry>,
    /// Hidden local that `this` resolves to
    pub this_var: Option<Variable>,
}

/// One field of a struct literal.
#[derive(Debug, Clone, PartialEq)]
pub struct StructEntry {
    /// The field name
    pub name: String,
    /// Where the field name appears
    pub pos: Pos,
    /// How the field is defined
    pub kind: EntryKind,
}

/// How a struct field is defined.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    /// `name: value`
    Field(Expr),
    /// `const name: value`
    Const(Expr),
    /// `prop name: getter` or `prop name: (getter, setter)`
    Prop {
        /// Called with no arguments on read
        getter: Expr,
        /// Called with the new value on write
        setter: Option<Expr>,
    },
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-`
    Neg,
    /// `!`
    Not,
    /// `~`
    Complement,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<=>`
    Cmp,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&`
    BitAnd,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
}

/// Postfix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    /// `++`
    Inc,
    /// `--`
    Dec,
}
