// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Literal scanning documentation.
//!
//! This module documents the literal scanning logic in `scanner.rs`.
//!
//! ## Numeric Literals
//!
//! Method: `scan_number`
//!
//! ```text
//! 42        -> Int
//! 0x2A      -> Int (hexadecimal)
//! 3.25      -> Float
//! 1e10      -> Float
//! 1.5e-3    -> Float
//! ```
//!
//! Integer literals are never negative. In `-2` the minus sign is a
//! separate token, and the compiler folds it into the constant.
//! A literal that does not fit a signed 64-bit integer is a syntax error.
//!
//! ## String Literals
//!
//! Method: `scan_string`
//!
//! ```text
//! 'single'  -> Str
//! "double"  -> Str
//! `raw
//! text`     -> Str, no escapes, may span lines
//! ```
//!
//! | Escape | Meaning |
//! |--------|---------|
//! | `\n` | Newline |
//! | `\r` | Carriage return |
//! | `\t` | Tab |
//! | `\0` | Null |
//! | `\\` | Backslash |
//! | `\'` | Single quote |
//! | `\"` | Double quote |
//! | `\u{XXXX}` | Unicode scalar value, 1 to 6 hex digits |
//!
//! ## Identifiers and Keywords
//!
//! Method: `scan_identifier`
//!
//! Identifiers start with `_` or a Unicode `XID_Start` character and
//! continue with `XID_Continue` characters. Reserved words are looked up
//! with [`TokenKind::keyword`](super::TokenKind::keyword).

#[cfg(test)]
mod tests {
    use crate::lexer::{Scanner, TokenKind};

    fn scan_single(src: &str) -> TokenKind {
        let mut scanner = Scanner::new(src);
        scanner.next_token().kind
    }

    #[test]
    fn test_uppercase_hex() {
        assert_eq!(scan_single("0X1F"), TokenKind::Int(31));
    }

    #[test]
    fn test_dot_after_int_is_not_fraction() {
        let kinds: Vec<TokenKind> = Scanner::new("1.len").map(|t| t.kind).collect();
        assert_eq!(kinds[0], TokenKind::Int(1));
        assert_eq!(kinds[1], TokenKind::Dot);
    }

    #[test]
    fn test_exponent_needs_digits() {
        let kinds: Vec<TokenKind> = Scanner::new("2e").map(|t| t.kind).collect();
        assert_eq!(kinds[0], TokenKind::Int(2));
        assert_eq!(kinds[1], TokenKind::Identifier("e".into()));
    }

    #[test]
    fn test_reserved_words_are_not_identifiers() {
        assert_eq!(scan_single("struct"), TokenKind::Struct);
        assert_eq!(scan_single("structs"), TokenKind::Identifier("structs".into()));
    }

    #[test]
    fn test_empty_strings() {
        assert_eq!(scan_single("''"), TokenKind::Str(String::new()));
        assert_eq!(scan_single("``"), TokenKind::Str(String::new()));
    }
}
