// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Token definitions for the Golem lexer.

use std::fmt;

use crate::error::SyntaxErrorKind;

/// A position in the source text. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pos {
    /// Line number
    pub line: u32,
    /// Column number
    pub col: u32,
}

impl Pos {
    /// Creates a new position.
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Returns the position immediately after this one on the same line.
    pub fn advance(self, cols: u32) -> Self {
        Self {
            line: self.line,
            col: self.col + cols,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The literal source text of the token
    pub text: String,
    /// Where the token starts
    pub pos: Pos,
    /// Whether at least one linefeed was skipped before this token
    pub newline_before: bool,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, text: impl Into<String>, pos: Pos) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
            newline_before: false,
        }
    }

    /// Returns the position one past the last character of this token,
    /// assuming the token does not span lines.
    pub fn end(&self) -> Pos {
        self.pos.advance(self.text.chars().count() as u32)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            _ => write!(f, "'{}'", self.text),
        }
    }
}

/// The different kinds of tokens in Golem.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer literal (always non-negative)
    Int(i64),
    /// Floating point literal
    Float(f64),
    /// String literal (escapes already processed)
    Str(String),
    /// Identifier
    Identifier(String),

    // Keywords
    Null,
    True,
    False,
    Let,
    Const,
    Fn,
    Return,
    If,
    Else,
    While,
    For,
    In,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Try,
    Catch,
    Finally,
    Throw,
    Go,
    Import,
    Struct,
    Dict,
    Set,
    This,
    Prop,

    // Punctuation
    /// {
    LeftBrace,
    /// }
    RightBrace,
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,
    /// .
    Dot,
    /// ...
    Ellipsis,
    /// ;
    Semicolon,
    /// ,
    Comma,
    /// :
    Colon,
    /// ?
    Question,
    /// =>
    Arrow,

    // Operators
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    LtEq,
    /// >=
    GtEq,
    /// <=>
    Cmp,
    /// ==
    EqEq,
    /// !=
    NotEq,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// ++
    PlusPlus,
    /// --
    MinusMinus,
    /// <<
    Shl,
    /// >>
    Shr,
    /// &
    Amp,
    /// |
    Pipe,
    /// ^
    Caret,
    /// !
    Bang,
    /// ~
    Tilde,
    /// &&
    AmpAmp,
    /// ||
    PipePipe,
    /// =
    Eq,
    /// +=
    PlusEq,
    /// -=
    MinusEq,
    /// *=
    StarEq,
    /// /=
    SlashEq,
    /// %=
    PercentEq,
    /// <<=
    ShlEq,
    /// >>=
    ShrEq,
    /// &=
    AmpEq,
    /// |=
    PipeEq,
    /// ^=
    CaretEq,

    // Special
    /// End of file
    Eof,
    /// Text that could not be scanned into a token
    Invalid(SyntaxErrorKind),
}

impl TokenKind {
    /// Looks up the keyword for an identifier, if it is reserved.
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        let kind = match ident {
            "null" => TokenKind::Null,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "fn" => TokenKind::Fn,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "throw" => TokenKind::Throw,
            "go" => TokenKind::Go,
            "import" => TokenKind::Import,
            "struct" => TokenKind::Struct,
            "dict" => TokenKind::Dict,
            "set" => TokenKind::Set,
            "this" => TokenKind::This,
            "prop" => TokenKind::Prop,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns true if this token is a reserved word.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Null
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::Fn
                | TokenKind::Return
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::While
                | TokenKind::For
                | TokenKind::In
                | TokenKind::Switch
                | TokenKind::Case
                | TokenKind::Default
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Try
                | TokenKind::Catch
                | TokenKind::Finally
                | TokenKind::Throw
                | TokenKind::Go
                | TokenKind::Import
                | TokenKind::Struct
                | TokenKind::Dict
                | TokenKind::Set
                | TokenKind::This
                | TokenKind::Prop
        )
    }

    /// Returns true if this token is an assignment operator.
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
                | TokenKind::ShlEq
                | TokenKind::ShrEq
                | TokenKind::AmpEq
                | TokenKind::PipeEq
                | TokenKind::CaretEq
        )
    }
}
