// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The main parser implementation.

use std::collections::HashSet;

use crate::analyzer::FuncScope;
use crate::ast::*;
use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::lexer::{Pos, Scanner, Token, TokenKind};

type Result<T> = std::result::Result<T, SyntaxError>;

/// A recursive descent parser for Golem.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token,
    previous: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            scanner,
            current,
            previous: Token::new(TokenKind::Eof, "", Pos::new(1, 1)),
        }
    }

    /// Parses the whole source as a module named `name`.
    ///
    /// Imports must come first. Every other top-level statement becomes
    /// part of the module's synthetic `init` function.
    pub fn parse_module(&mut self, name: &str) -> Result<Module> {
        self.check_invalid()?;
        let begin = self.current.pos;

        let mut imports = Vec::new();
        while self.check(&TokenKind::Import) {
            self.parse_import(&mut imports)?;
        }

        let mut stmts = Vec::new();
        loop {
            self.skip_semicolons()?;
            if self.is_at_end() {
                break;
            }
            if self.check(&TokenKind::Import) {
                return Err(self.error(SyntaxErrorKind::MisplacedImport));
            }
            stmts.push(self.parse_statement()?);
        }

        let end = self.current.pos;
        Ok(Module {
            name: name.to_string(),
            imports,
            init: FnExpr {
                name: Some(INIT_NAME.to_string()),
                params: Vec::new(),
                variadic: false,
                body: Block { stmts, begin, end },
                begin,
                end,
                scope: FuncScope::default(),
            },
        })
    }

    fn parse_import(&mut self, imports: &mut Vec<DeclIdent>) -> Result<()> {
        self.advance()?; // 'import'
        loop {
            imports.push(self.expect_decl_ident()?);
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect_terminator()
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<Stmt> {
        let pos = self.current.pos;
        let kind = match &self.current.kind {
            TokenKind::Let | TokenKind::Const => self.parse_declaration()?,
            TokenKind::Fn if matches!(self.peek_kind(), Some(TokenKind::Identifier(_))) => {
                self.parse_named_fn()?
            }
            TokenKind::If => self.parse_if()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::Switch => self.parse_switch()?,
            TokenKind::Break => {
                self.advance()?;
                self.expect_terminator()?;
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance()?;
                self.expect_terminator()?;
                StmtKind::Continue
            }
            TokenKind::Return => self.parse_return()?,
            TokenKind::Throw => {
                self.advance()?;
                let value = self.parse_expression()?;
                self.expect_terminator()?;
                StmtKind::Throw(value)
            }
            TokenKind::Try => self.parse_try()?,
            TokenKind::Go => self.parse_go()?,
            TokenKind::LeftBrace => StmtKind::Block(self.parse_block()?),
            _ => {
                let expr = self.parse_expression()?;
                self.expect_terminator()?;
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt { kind, pos })
    }

    fn parse_declaration(&mut self) -> Result<StmtKind> {
        let is_const = self.check(&TokenKind::Const);
        self.advance()?;

        let mut vars = Vec::new();
        loop {
            let ident = self.expect_decl_ident()?;
            let init = if self.eat(&TokenKind::Eq)? {
                Some(self.parse_expression()?)
            } else if is_const {
                return Err(self.unexpected("'='"));
            } else {
                None
            };
            vars.push(Declarator { ident, init });

            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }

        self.expect_terminator()?;
        Ok(StmtKind::Decl(Decl { is_const, vars }))
    }

    fn parse_named_fn(&mut self) -> Result<StmtKind> {
        let begin = self.current.pos;
        self.advance()?; // 'fn'
        let ident = self.expect_decl_ident()?;
        let mut func = self.parse_fn_rest(begin)?;
        func.name = Some(ident.name.clone());
        Ok(StmtKind::NamedFn(NamedFn { ident, func }))
    }

    fn parse_if(&mut self) -> Result<StmtKind> {
        self.advance()?; // 'if'
        let cond = self.parse_expression()?;
        let then = self.parse_block()?;

        let otherwise = if self.eat(&TokenKind::Else)? {
            let pos = self.current.pos;
            if self.check(&TokenKind::If) {
                let kind = self.parse_if()?;
                Some(Box::new(Stmt { kind, pos }))
            } else {
                let block = self.parse_block()?;
                Some(Box::new(Stmt {
                    kind: StmtKind::Block(block),
                    pos,
                }))
            }
        } else {
            None
        };

        Ok(StmtKind::If(If {
            cond,
            then,
            otherwise,
        }))
    }

    fn parse_while(&mut self) -> Result<StmtKind> {
        self.advance()?; // 'while'
        let cond = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(StmtKind::While(While { cond, body }))
    }

    fn parse_for(&mut self) -> Result<StmtKind> {
        self.advance()?; // 'for'

        let (vars, tuple) = if self.eat(&TokenKind::LeftParen)? {
            let mut vars = Vec::new();
            loop {
                vars.push(self.expect_decl_ident()?);
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
            self.expect(&TokenKind::RightParen, "')'")?;
            if vars.len() < 2 {
                return Err(self.error(SyntaxErrorKind::InvalidFor));
            }
            (vars, true)
        } else {
            match &self.current.kind {
                TokenKind::Identifier(_) => (vec![self.expect_decl_ident()?], false),
                _ => return Err(self.error(SyntaxErrorKind::InvalidFor)),
            }
        };

        if !self.check(&TokenKind::In) {
            return Err(self.error(SyntaxErrorKind::InvalidFor));
        }
        self.advance()?;

        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;

        Ok(StmtKind::For(For {
            vars,
            tuple,
            iterable,
            body,
            iter_var: None,
        }))
    }

    fn parse_switch(&mut self) -> Result<StmtKind> {
        self.advance()?; // 'switch'

        let subject = if self.check(&TokenKind::LeftBrace) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::LeftBrace, "'{'")?;

        let mut cases = Vec::new();
        let mut default = None;

        loop {
            self.skip_semicolons()?;
            match &self.current.kind {
                TokenKind::Case => {
                    let pos = self.current.pos;
                    self.advance()?;
                    let mut matches = vec![self.parse_expression()?];
                    while self.eat(&TokenKind::Comma)? {
                        matches.push(self.parse_expression()?);
                    }
                    self.expect(&TokenKind::Colon, "':'")?;
                    let body = self.parse_case_body()?;
                    cases.push(Case { matches, body, pos });
                }
                TokenKind::Default => {
                    if default.is_some() {
                        return Err(self.error(SyntaxErrorKind::InvalidSwitch(
                            "more than one default clause",
                        )));
                    }
                    self.advance()?;
                    self.expect(&TokenKind::Colon, "':'")?;
                    default = Some(self.parse_case_body()?);
                }
                TokenKind::RightBrace => break,
                TokenKind::Eof => return Err(self.error(SyntaxErrorKind::UnexpectedEof)),
                _ => return Err(self.unexpected("'case', 'default' or '}'")),
            }
        }
        self.advance()?; // '}'

        if cases.is_empty() {
            return Err(self.error(SyntaxErrorKind::InvalidSwitch("expected at least one case")));
        }

        Ok(StmtKind::Switch(Switch {
            subject,
            cases,
            default,
            subject_var: None,
        }))
    }

    fn parse_case_body(&mut self) -> Result<Vec<Stmt>> {
        let mut body = Vec::new();
        loop {
            self.skip_semicolons()?;
            if matches!(
                self.current.kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof
            ) {
                break;
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_return(&mut self) -> Result<StmtKind> {
        self.advance()?; // 'return'
        let value = if self.at_terminator() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_terminator()?;
        Ok(StmtKind::Return(value))
    }

    fn parse_try(&mut self) -> Result<StmtKind> {
        self.advance()?; // 'try'
        let body = self.parse_block()?;

        let catch = if self.eat(&TokenKind::Catch)? {
            let ident = self.expect_decl_ident()?;
            let body = self.parse_block()?;
            Some(Catch { ident, body })
        } else {
            None
        };

        let finally = if self.eat(&TokenKind::Finally)? {
            Some(self.parse_block()?)
        } else {
            None
        };

        if catch.is_none() && finally.is_none() {
            return Err(self.error(SyntaxErrorKind::InvalidTry));
        }

        Ok(StmtKind::Try(Try {
            body,
            catch,
            finally,
        }))
    }

    fn parse_go(&mut self) -> Result<StmtKind> {
        let pos = self.current.pos;
        self.advance()?; // 'go'
        let expr = self.parse_expression()?;
        if !matches!(expr.kind, ExprKind::Call { .. }) {
            return Err(SyntaxError::new(SyntaxErrorKind::InvalidGo, pos, "go"));
        }
        self.expect_terminator()?;
        Ok(StmtKind::Go(expr))
    }

    fn parse_block(&mut self) -> Result<Block> {
        let begin = self.current.pos;
        self.expect(&TokenKind::LeftBrace, "'{'")?;

        let mut stmts = Vec::new();
        loop {
            self.skip_semicolons()?;
            if self.check(&TokenKind::RightBrace) {
                break;
            }
            if self.is_at_end() {
                return Err(self.error(SyntaxErrorKind::UnexpectedEof));
            }
            stmts.push(self.parse_statement()?);
        }

        let end = self.current.pos;
        self.advance()?; // '}'
        Ok(Block { stmts, begin, end })
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Parses `(params) { body }` after `fn` or `fn name`.
    fn parse_fn_rest(&mut self, begin: Pos) -> Result<FnExpr> {
        self.expect(&TokenKind::LeftParen, "'('")?;
        let (params, variadic) = self.parse_params()?;
        self.expect(&TokenKind::RightParen, "')'")?;
        let body = self.parse_block()?;
        let end = self.previous.pos;

        Ok(FnExpr {
            name: None,
            params,
            variadic,
            body,
            begin,
            end,
            scope: FuncScope::default(),
        })
    }

    fn parse_params(&mut self) -> Result<(Vec<Param>, bool)> {
        let mut params = Vec::new();
        let mut variadic = false;
        let mut seen_default = false;

        if self.check(&TokenKind::RightParen) {
            return Ok((params, variadic));
        }

        loop {
            let ident = self.expect_decl_ident()?;

            if self.eat(&TokenKind::Ellipsis)? {
                if seen_default {
                    return Err(SyntaxError::new(
                        SyntaxErrorKind::VariadicAfterOptional(ident.name.clone()),
                        ident.pos,
                        ident.name.clone(),
                    ));
                }
                params.push(Param {
                    ident,
                    default: None,
                });
                variadic = true;
                break;
            }

            let default = if self.eat(&TokenKind::Eq)? {
                seen_default = true;
                Some(self.parse_default(&ident.name)?)
            } else if seen_default {
                return Err(SyntaxError::new(
                    SyntaxErrorKind::RequiredAfterOptional(ident.name.clone()),
                    ident.pos,
                    ident.name.clone(),
                ));
            } else {
                None
            };
            params.push(Param { ident, default });

            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }

        Ok((params, variadic))
    }

    /// Parses the literal default value of an optional parameter.
    fn parse_default(&mut self, name: &str) -> Result<Literal> {
        let negate = self.eat(&TokenKind::Minus)?;
        let literal = match &self.current.kind {
            TokenKind::Int(n) if negate => Literal::Int(n.wrapping_neg()),
            TokenKind::Float(n) if negate => Literal::Float(-n),
            TokenKind::Int(n) => Literal::Int(*n),
            TokenKind::Float(n) => Literal::Float(*n),
            TokenKind::Str(s) if !negate => Literal::Str(s.clone()),
            TokenKind::Null if !negate => Literal::Null,
            TokenKind::True if !negate => Literal::Bool(true),
            TokenKind::False if !negate => Literal::Bool(false),
            _ => return Err(self.error(SyntaxErrorKind::InvalidDefault(name.to_string()))),
        };
        self.advance()?;
        Ok(literal)
    }

    /// Parses `|a, b| => expr`, `|a| => { block }` or `|| => expr`.
    fn parse_lambda(&mut self) -> Result<Expr> {
        let begin = self.current.pos;
        let mut params = Vec::new();

        if !self.eat(&TokenKind::PipePipe)? {
            self.expect(&TokenKind::Pipe, "'|'")?;
            if !self.check(&TokenKind::Pipe) {
                loop {
                    params.push(Param {
                        ident: self.expect_decl_ident()?,
                        default: None,
                    });
                    if !self.eat(&TokenKind::Comma)? {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::Pipe, "'|'")?;
        }
        self.expect(&TokenKind::Arrow, "'=>'")?;

        let body = if self.check(&TokenKind::LeftBrace) {
            self.parse_block()?
        } else {
            let value = self.parse_expression()?;
            let pos = value.begin;
            Block {
                begin: value.begin,
                end: value.end,
                stmts: vec![Stmt {
                    kind: StmtKind::Return(Some(value)),
                    pos,
                }],
            }
        };
        let end = self.previous.end();

        Ok(Expr {
            kind: ExprKind::Fn(Box::new(FnExpr {
                name: None,
                params,
                variadic: false,
                body,
                begin,
                end,
                scope: FuncScope::default(),
            })),
            begin,
            end,
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Parses an expression, including assignment.
    pub fn parse_expression(&mut self) -> Result<Expr> {
        let target = self.parse_ternary()?;

        let op = match &self.current.kind {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinaryOp::Add),
            TokenKind::MinusEq => Some(BinaryOp::Sub),
            TokenKind::StarEq => Some(BinaryOp::Mul),
            TokenKind::SlashEq => Some(BinaryOp::Div),
            TokenKind::PercentEq => Some(BinaryOp::Rem),
            TokenKind::ShlEq => Some(BinaryOp::Shl),
            TokenKind::ShrEq => Some(BinaryOp::Shr),
            TokenKind::AmpEq => Some(BinaryOp::BitAnd),
            TokenKind::PipeEq => Some(BinaryOp::BitOr),
            TokenKind::CaretEq => Some(BinaryOp::BitXor),
            _ => return Ok(target),
        };
        self.advance()?;

        let value = self.parse_expression()?;
        let (begin, end) = (target.begin, value.end);
        Ok(Expr {
            kind: ExprKind::Assign {
                target: Box::new(target),
                op,
                value: Box::new(value),
            },
            begin,
            end,
        })
    }

    fn parse_ternary(&mut self) -> Result<Expr> {
        let cond = self.parse_or()?;
        if !self.eat(&TokenKind::Question)? {
            return Ok(cond);
        }
        let then = self.parse_ternary()?;
        self.expect(&TokenKind::Colon, "':'")?;
        let otherwise = self.parse_ternary()?;
        let (begin, end) = (cond.begin, otherwise.end);
        Ok(Expr {
            kind: ExprKind::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            begin,
            end,
        })
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::PipePipe)? {
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_comparison()?;
        while self.eat(&TokenKind::AmpAmp)? {
            let rhs = self.parse_comparison()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.current.kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::Lte,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::Gte,
                TokenKind::Cmp => BinaryOp::Cmp,
                _ => return Ok(lhs),
            };
            self.advance()?;
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Pipe => BinaryOp::BitOr,
                TokenKind::Caret => BinaryOp::BitXor,
                _ => return Ok(lhs),
            };
            self.advance()?;
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                TokenKind::Shl => BinaryOp::Shl,
                TokenKind::Shr => BinaryOp::Shr,
                TokenKind::Amp => BinaryOp::BitAnd,
                _ => return Ok(lhs),
            };
            self.advance()?;
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.current.kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::Complement,
            _ => return self.parse_postfix(),
        };
        let begin = self.current.pos;
        self.advance()?;
        let operand = self.parse_unary()?;
        let end = operand.end;
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            begin,
            end,
        })
    }

    /// Parses calls, field access, indexing and `++`/`--`.
    ///
    /// `(`, `[`, `++` and `--` only continue an expression when they are on
    /// the same line, so a statement may start with them.
    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            let same_line = !self.current.newline_before;
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance()?;
                    let name = self.expect_field_name()?;
                    let end = self.previous.end();
                    let begin = expr.begin;
                    expr = Expr {
                        kind: ExprKind::Field {
                            object: Box::new(expr),
                            name,
                        },
                        begin,
                        end,
                    };
                }
                TokenKind::LeftParen if same_line => {
                    self.advance()?;
                    let args = self.parse_list_items(&TokenKind::RightParen)?;
                    let end = self.previous.end();
                    let begin = expr.begin;
                    expr = Expr {
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        begin,
                        end,
                    };
                }
                TokenKind::LeftBracket if same_line => {
                    self.advance()?;
                    expr = self.parse_index_or_slice(expr)?;
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus if same_line => {
                    let op = if self.check(&TokenKind::PlusPlus) {
                        PostfixOp::Inc
                    } else {
                        PostfixOp::Dec
                    };
                    if !expr.kind.is_assignable() {
                        return Err(self.error(SyntaxErrorKind::InvalidPostfix));
                    }
                    self.advance()?;
                    let end = self.previous.end();
                    let begin = expr.begin;
                    expr = Expr {
                        kind: ExprKind::Postfix {
                            target: Box::new(expr),
                            op,
                        },
                        begin,
                        end,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Parses the rest of `object[...]` after the `[`.
    fn parse_index_or_slice(&mut self, object: Expr) -> Result<Expr> {
        let begin = object.begin;

        let kind = if self.eat(&TokenKind::Colon)? {
            let to = self.parse_expression()?;
            ExprKind::Slice {
                object: Box::new(object),
                from: None,
                to: Some(Box::new(to)),
            }
        } else {
            let index = self.parse_expression()?;
            if self.eat(&TokenKind::Colon)? {
                let to = if self.check(&TokenKind::RightBracket) {
                    None
                } else {
                    Some(Box::new(self.parse_expression()?))
                };
                ExprKind::Slice {
                    object: Box::new(object),
                    from: Some(Box::new(index)),
                    to,
                }
            } else {
                ExprKind::Index {
                    object: Box::new(object),
                    index: Box::new(index),
                }
            }
        };

        self.expect(&TokenKind::RightBracket, "']'")?;
        Ok(Expr {
            kind,
            begin,
            end: self.previous.end(),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let begin = self.current.pos;

        let kind = match &self.current.kind {
            TokenKind::Null => ExprKind::Literal(Literal::Null),
            TokenKind::True => ExprKind::Literal(Literal::Bool(true)),
            TokenKind::False => ExprKind::Literal(Literal::Bool(false)),
            TokenKind::Int(n) => ExprKind::Literal(Literal::Int(*n)),
            TokenKind::Float(n) => ExprKind::Literal(Literal::Float(*n)),
            TokenKind::Str(s) => ExprKind::Literal(Literal::Str(s.clone())),
            TokenKind::Identifier(name) => ExprKind::Ident(Ident {
                name: name.clone(),
                var: None,
            }),
            TokenKind::This => ExprKind::This(None),
            TokenKind::LeftParen => return self.parse_paren(),
            TokenKind::LeftBracket => {
                self.advance()?;
                let items = self.parse_list_items(&TokenKind::RightBracket)?;
                return Ok(self.finish(ExprKind::List(items), begin));
            }
            TokenKind::Dict => return self.parse_dict(),
            TokenKind::Set => {
                self.advance()?;
                self.expect(&TokenKind::LeftBrace, "'{'")?;
                let items = self.parse_list_items(&TokenKind::RightBrace)?;
                return Ok(self.finish(ExprKind::Set(items), begin));
            }
            TokenKind::Struct => return self.parse_struct(),
            TokenKind::Fn => {
                self.advance()?;
                let func = self.parse_fn_rest(begin)?;
                return Ok(self.finish(ExprKind::Fn(Box::new(func)), begin));
            }
            TokenKind::Pipe | TokenKind::PipePipe => return self.parse_lambda(),
            _ => return Err(self.unexpected("expression")),
        };

        self.advance()?;
        Ok(self.finish(kind, begin))
    }

    /// Parses a parenthesized expression or a tuple.
    fn parse_paren(&mut self) -> Result<Expr> {
        let begin = self.current.pos;
        self.advance()?; // '('

        let first = self.parse_expression()?;
        if !self.check(&TokenKind::Comma) {
            self.expect(&TokenKind::RightParen, "')'")?;
            return Ok(first);
        }

        let mut items = vec![first];
        while self.eat(&TokenKind::Comma)? {
            if self.check(&TokenKind::RightParen) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect(&TokenKind::RightParen, "')'")?;
        Ok(self.finish(ExprKind::Tuple(items), begin))
    }

    fn parse_dict(&mut self) -> Result<Expr> {
        let begin = self.current.pos;
        self.advance()?; // 'dict'
        self.expect(&TokenKind::LeftBrace, "'{'")?;

        let mut entries = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let key = self.parse_expression()?;
            self.expect(&TokenKind::Colon, "':'")?;
            let value = self.parse_expression()?;
            entries.push((key, value));
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(&TokenKind::RightBrace, "'}'")?;
        Ok(self.finish(ExprKind::Dict(entries), begin))
    }

    fn parse_struct(&mut self) -> Result<Expr> {
        let begin = self.current.pos;
        self.advance()?; // 'struct'
        self.expect(&TokenKind::LeftBrace, "'{'")?;

        let mut names = HashSet::new();
        let mut entries = Vec::new();

        while !self.check(&TokenKind::RightBrace) {
            let modifier = match self.current.kind {
                TokenKind::Const | TokenKind::Prop => {
                    let modifier = self.current.kind.clone();
                    self.advance()?;
                    Some(modifier)
                }
                _ => None,
            };

            let pos = self.current.pos;
            let name = self.expect_field_name()?;
            if !names.insert(name.clone()) {
                return Err(SyntaxError::new(
                    SyntaxErrorKind::DuplicateKey(name.clone()),
                    pos,
                    name,
                ));
            }
            self.expect(&TokenKind::Colon, "':'")?;

            let kind = match modifier {
                Some(TokenKind::Const) => EntryKind::Const(self.parse_expression()?),
                Some(_) => self.parse_prop()?,
                None => EntryKind::Field(self.parse_expression()?),
            };
            entries.push(StructEntry { name, pos, kind });

            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(&TokenKind::RightBrace, "'}'")?;

        Ok(self.finish(
            ExprKind::Struct(StructLit {
                entries,
                this_var: None,
            }),
            begin,
        ))
    }

    /// Parses the accessor part of `prop name: getter` or
    /// `prop name: (getter, setter)`.
    fn parse_prop(&mut self) -> Result<EntryKind> {
        if !self.eat(&TokenKind::LeftParen)? {
            let getter = self.parse_expression()?;
            return Ok(EntryKind::Prop {
                getter,
                setter: None,
            });
        }

        let getter = self.parse_expression()?;
        let setter = if self.eat(&TokenKind::Comma)? {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(&TokenKind::RightParen, "')'")?;
        Ok(EntryKind::Prop { getter, setter })
    }

    /// Parses comma-separated expressions up to and including `close`.
    /// A trailing comma is allowed.
    fn parse_list_items(&mut self, close: &TokenKind) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        let expected = match close {
            TokenKind::RightParen => "')'",
            TokenKind::RightBracket => "']'",
            _ => "'}'",
        };
        self.expect(close, expected)?;
        Ok(items)
    }

    fn finish(&self, kind: ExprKind, begin: Pos) -> Expr {
        Expr {
            kind,
            begin,
            end: self.previous.end(),
        }
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current.kind == kind
    }

    /// Returns the kind of the token after the current one.
    fn peek_kind(&self) -> Option<TokenKind> {
        let mut lookahead = self.scanner.clone();
        Some(lookahead.next_token().kind)
    }

    fn advance(&mut self) -> Result<()> {
        let next = self.scanner.next_token();
        self.previous = std::mem::replace(&mut self.current, next);
        self.check_invalid()
    }

    fn check_invalid(&self) -> Result<()> {
        match &self.current.kind {
            TokenKind::Invalid(kind) => Err(self.error(kind.clone())),
            _ => Ok(()),
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> Result<bool> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<()> {
        if self.check(kind) {
            self.advance()
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn skip_semicolons(&mut self) -> Result<()> {
        while self.eat(&TokenKind::Semicolon)? {}
        Ok(())
    }

    fn at_terminator(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
        ) || self.current.newline_before
    }

    /// Ends a simple statement: `;`, a linefeed, `}` or end of input.
    fn expect_terminator(&mut self) -> Result<()> {
        if self.eat(&TokenKind::Semicolon)? || self.at_terminator() {
            Ok(())
        } else {
            Err(self.unexpected("';' or newline"))
        }
    }

    fn expect_decl_ident(&mut self) -> Result<DeclIdent> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let ident = DeclIdent::new(name.clone(), self.current.pos);
                self.advance()?;
                Ok(ident)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Field names may be reserved words, as in `s.set` or `d.default`.
    fn expect_field_name(&mut self) -> Result<String> {
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            kind if kind.is_keyword() => self.current.text.clone(),
            _ => return Err(self.unexpected("field name")),
        };
        self.advance()?;
        Ok(name)
    }

    fn error(&self, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError::new(kind, self.current.pos, self.current.text.clone())
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let kind = match &self.current.kind {
            TokenKind::Eof => SyntaxErrorKind::UnexpectedEof,
            TokenKind::Invalid(kind) => kind.clone(),
            kind if kind.is_keyword() && expected == "identifier" => {
                SyntaxErrorKind::UnexpectedReservedWord(self.current.text.clone())
            }
            _ => SyntaxErrorKind::UnexpectedToken {
                found: self.current.text.clone(),
                expected: expected.to_string(),
            },
        };
        self.error(kind)
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    let (begin, end) = (lhs.begin, rhs.end);
    Expr {
        kind: ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        begin,
        end,
    }
}
