// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The scanner that produces tokens from source text.

use unicode_xid::UnicodeXID;

use super::{Pos, Token, TokenKind};
use crate::error::SyntaxErrorKind;

/// A scanner that tokenizes Golem source code.
///
/// Every token records whether a linefeed was skipped before it, which is
/// how the parser terminates statements without semicolons.
#[derive(Clone)]
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    offset: usize,
    line: u32,
    col: u32,
    done: bool,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            offset: 0,
            line: 1,
            col: 1,
            done: false,
        }
    }

    /// Returns the next token from the source.
    ///
    /// Once the end of input is reached, every further call returns `Eof`.
    pub fn next_token(&mut self) -> Token {
        let newline_before = self.skip_whitespace_and_comments();

        let start = self.offset;
        let pos = self.pos();

        let Some(ch) = self.advance() else {
            let mut token = Token::new(TokenKind::Eof, "", pos);
            token.newline_before = newline_before;
            return token;
        };

        let kind = match ch {
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            '~' => TokenKind::Tilde,

            '.' => self.scan_dot(),
            '+' => self.scan_plus(),
            '-' => self.scan_minus(),
            '*' => self.scan_with_eq(TokenKind::Star, TokenKind::StarEq),
            '/' => self.scan_with_eq(TokenKind::Slash, TokenKind::SlashEq),
            '%' => self.scan_with_eq(TokenKind::Percent, TokenKind::PercentEq),
            '^' => self.scan_with_eq(TokenKind::Caret, TokenKind::CaretEq),
            '!' => self.scan_with_eq(TokenKind::Bang, TokenKind::NotEq),
            '<' => self.scan_less_than(),
            '>' => self.scan_greater_than(),
            '=' => self.scan_equal(),
            '&' => self.scan_ampersand(),
            '|' => self.scan_pipe(),

            '"' | '\'' => self.scan_string(ch),
            '`' => self.scan_raw_string(),

            '0'..='9' => self.scan_number(ch),

            _ if ch == '_' || UnicodeXID::is_xid_start(ch) => self.scan_identifier(start),

            _ => TokenKind::Invalid(SyntaxErrorKind::UnexpectedChar(ch)),
        };

        let mut token = Token::new(kind, &self.source[start..self.offset], pos);
        token.newline_before = newline_before;
        token
    }

    /// Returns the current position.
    pub fn pos(&self) -> Pos {
        Pos::new(self.line, self.col)
    }

    fn advance(&mut self) -> Option<char> {
        let (index, ch) = self.chars.next()?;
        self.offset = index + ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skips whitespace and comments, returning whether a linefeed was seen.
    fn skip_whitespace_and_comments(&mut self) -> bool {
        let mut newline = false;
        loop {
            match self.peek() {
                Some('\n') => {
                    newline = true;
                    self.advance();
                }
                Some(' ' | '\t' | '\r') => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        while let Some(ch) = self.peek() {
                            if ch == '\n' {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        while let Some(ch) = self.advance() {
                            if ch == '\n' {
                                newline = true;
                            }
                            if prev == '*' && ch == '/' {
                                break;
                            }
                            prev = ch;
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        newline
    }

    fn scan_with_eq(&mut self, single: TokenKind, with_eq: TokenKind) -> TokenKind {
        if self.eat('=') { with_eq } else { single }
    }

    fn scan_dot(&mut self) -> TokenKind {
        if self.peek() == Some('.') && self.peek_next() == Some('.') {
            self.advance();
            self.advance();
            TokenKind::Ellipsis
        } else {
            TokenKind::Dot
        }
    }

    fn scan_plus(&mut self) -> TokenKind {
        match self.peek() {
            Some('+') => {
                self.advance();
                TokenKind::PlusPlus
            }
            Some('=') => {
                self.advance();
                TokenKind::PlusEq
            }
            _ => TokenKind::Plus,
        }
    }

    fn scan_minus(&mut self) -> TokenKind {
        match self.peek() {
            Some('-') => {
                self.advance();
                TokenKind::MinusMinus
            }
            Some('=') => {
                self.advance();
                TokenKind::MinusEq
            }
            _ => TokenKind::Minus,
        }
    }

    fn scan_less_than(&mut self) -> TokenKind {
        match self.peek() {
            Some('<') => {
                self.advance();
                self.scan_with_eq(TokenKind::Shl, TokenKind::ShlEq)
            }
            Some('=') => {
                self.advance();
                if self.eat('>') {
                    TokenKind::Cmp
                } else {
                    TokenKind::LtEq
                }
            }
            _ => TokenKind::Lt,
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        match self.peek() {
            Some('>') => {
                self.advance();
                self.scan_with_eq(TokenKind::Shr, TokenKind::ShrEq)
            }
            Some('=') => {
                self.advance();
                TokenKind::GtEq
            }
            _ => TokenKind::Gt,
        }
    }

    fn scan_equal(&mut self) -> TokenKind {
        match self.peek() {
            Some('=') => {
                self.advance();
                TokenKind::EqEq
            }
            Some('>') => {
                self.advance();
                TokenKind::Arrow
            }
            _ => TokenKind::Eq,
        }
    }

    fn scan_ampersand(&mut self) -> TokenKind {
        match self.peek() {
            Some('&') => {
                self.advance();
                TokenKind::AmpAmp
            }
            Some('=') => {
                self.advance();
                TokenKind::AmpEq
            }
            _ => TokenKind::Amp,
        }
    }

    fn scan_pipe(&mut self) -> TokenKind {
        match self.peek() {
            Some('|') => {
                self.advance();
                TokenKind::PipePipe
            }
            Some('=') => {
                self.advance();
                TokenKind::PipeEq
            }
            _ => TokenKind::Pipe,
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                None | Some('\n') => {
                    return TokenKind::Invalid(SyntaxErrorKind::UnterminatedString);
                }
                Some(ch) if ch == quote => break,
                Some('\\') => match self.scan_escape() {
                    Ok(ch) => value.push(ch),
                    Err(kind) => return TokenKind::Invalid(kind),
                },
                Some(ch) => value.push(ch),
            }
        }

        TokenKind::Str(value)
    }

    fn scan_escape(&mut self) -> Result<char, SyntaxErrorKind> {
        let Some(escaped) = self.advance() else {
            return Err(SyntaxErrorKind::UnterminatedString);
        };
        match escaped {
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            '0' => Ok('\0'),
            '\\' => Ok('\\'),
            '\'' => Ok('\''),
            '"' => Ok('"'),
            'u' => self.scan_unicode_escape(),
            other => Err(SyntaxErrorKind::InvalidEscape(format!("\\{other}"))),
        }
    }

    /// Scans the `{XXXX}` part of a `\u{XXXX}` escape.
    fn scan_unicode_escape(&mut self) -> Result<char, SyntaxErrorKind> {
        let invalid = |digits: &str| SyntaxErrorKind::InvalidEscape(format!("\\u{{{digits}}}"));

        if !self.eat('{') {
            return Err(invalid(""));
        }
        let mut digits = String::new();
        loop {
            match self.advance() {
                Some('}') => break,
                Some(ch) if ch.is_ascii_hexdigit() && digits.len() < 6 => digits.push(ch),
                _ => return Err(invalid(&digits)),
            }
        }
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| invalid(&digits))
    }

    /// Scans a back-quoted string. No escapes are processed and the string
    /// may span lines.
    fn scan_raw_string(&mut self) -> TokenKind {
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return TokenKind::Invalid(SyntaxErrorKind::UnterminatedString),
                Some('`') => break,
                Some(ch) => value.push(ch),
            }
        }
        TokenKind::Str(value)
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            return self.scan_hex_number();
        }

        let mut text = String::from(first);
        let mut is_float = false;

        self.scan_digits(&mut text);

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.advance();
            self.scan_digits(&mut text);
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_next(), Some('+' | '-'));
            let digit = self.peek_next().is_some_and(|c| c.is_ascii_digit());
            if digit || signed {
                is_float = true;
                text.push('e');
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    text.push(sign);
                    self.advance();
                }
                self.scan_digits(&mut text);
            }
        }

        if is_float {
            match text.parse::<f64>() {
                Ok(n) => TokenKind::Float(n),
                Err(_) => TokenKind::Invalid(SyntaxErrorKind::InvalidNumber(text)),
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => TokenKind::Int(n),
                Err(_) => TokenKind::Invalid(SyntaxErrorKind::InvalidNumber(text)),
            }
        }
    }

    fn scan_digits(&mut self, text: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_hex_number(&mut self) -> TokenKind {
        self.advance(); // 'x'
        let mut digits = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_hexdigit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        match i64::from_str_radix(&digits, 16) {
            Ok(n) => TokenKind::Int(n),
            Err(_) => TokenKind::Invalid(SyntaxErrorKind::InvalidNumber(format!("0x{digits}"))),
        }
    }

    fn scan_identifier(&mut self, start: usize) -> TokenKind {
        while let Some(ch) = self.peek() {
            if UnicodeXID::is_xid_continue(ch) {
                self.advance();
            } else {
                break;
            }
        }

        let ident = &self.source[start..self.offset];
        TokenKind::keyword(ident).unwrap_or_else(|| TokenKind::Identifier(ident.to_string()))
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    /// Yields tokens up to and including a single `Eof`.
    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.done = true;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source).map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   \t  "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("{ } ( ) [ ] ; , : ? ..."),
            vec![
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBracket,
                TokenKind::RightBracket,
                TokenKind::Semicolon,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Question,
                TokenKind::Ellipsis,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("let x_1 = fn"),
            vec![
                TokenKind::Let,
                TokenKind::Identifier("x_1".into()),
                TokenKind::Eq,
                TokenKind::Fn,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unicode_identifier() {
        assert_eq!(
            kinds("größe"),
            vec![TokenKind::Identifier("größe".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_integer_literals() {
        assert_eq!(kinds("42")[0], TokenKind::Int(42));
        assert_eq!(kinds("0xff")[0], TokenKind::Int(255));
        assert_eq!(kinds("0")[0], TokenKind::Int(0));
    }

    #[test]
    fn test_integer_overflow_is_invalid() {
        assert!(matches!(
            kinds("9223372036854775808")[0],
            TokenKind::Invalid(SyntaxErrorKind::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_float_literals() {
        assert_eq!(kinds("3.25")[0], TokenKind::Float(3.25));
        assert_eq!(kinds("1e3")[0], TokenKind::Float(1000.0));
        assert_eq!(kinds("2.5e-1")[0], TokenKind::Float(0.25));
    }

    #[test]
    fn test_minus_is_separate_from_literal() {
        assert_eq!(
            kinds("-2"),
            vec![TokenKind::Minus, TokenKind::Int(2), TokenKind::Eof]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(kinds(r#""a\tb\n""#)[0], TokenKind::Str("a\tb\n".into()));
        assert_eq!(kinds(r"'it\'s'")[0], TokenKind::Str("it's".into()));
        assert_eq!(kinds(r#""\u{48}i""#)[0], TokenKind::Str("Hi".into()));
    }

    #[test]
    fn test_invalid_escape() {
        assert_eq!(
            kinds(r#""\q""#)[0],
            TokenKind::Invalid(SyntaxErrorKind::InvalidEscape("\\q".into()))
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            kinds("\"abc")[0],
            TokenKind::Invalid(SyntaxErrorKind::UnterminatedString)
        );
    }

    #[test]
    fn test_raw_string_spans_lines() {
        let mut scanner = Scanner::new("`a\\n\nb` x");
        let token = scanner.next_token();
        assert_eq!(token.kind, TokenKind::Str("a\\n\nb".into()));
        let next = scanner.next_token();
        assert_eq!(next.pos, Pos::new(2, 4));
        assert!(!next.newline_before);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("<=> <= << <<= >> >>= == => != && || &= |= ^="),
            vec![
                TokenKind::Cmp,
                TokenKind::LtEq,
                TokenKind::Shl,
                TokenKind::ShlEq,
                TokenKind::Shr,
                TokenKind::ShrEq,
                TokenKind::EqEq,
                TokenKind::Arrow,
                TokenKind::NotEq,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::AmpEq,
                TokenKind::PipeEq,
                TokenKind::CaretEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("a // comment\n/* block\n */ b"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Identifier("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_newline_before_flag() {
        let tokens: Vec<Token> = Scanner::new("a\nb c /* x\n */ d").collect();
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
        assert!(!tokens[2].newline_before);
        assert!(tokens[3].newline_before);
    }

    #[test]
    fn test_positions() {
        let tokens: Vec<Token> = Scanner::new("let x\n  = 1").collect();
        assert_eq!(tokens[0].pos, Pos::new(1, 1));
        assert_eq!(tokens[1].pos, Pos::new(1, 5));
        assert_eq!(tokens[2].pos, Pos::new(2, 3));
        assert_eq!(tokens[3].pos, Pos::new(2, 5));
    }

    #[test]
    fn test_unexpected_char() {
        assert_eq!(
            kinds("#")[0],
            TokenKind::Invalid(SyntaxErrorKind::UnexpectedChar('#'))
        );
    }

    #[test]
    fn test_token_text() {
        let token = Scanner::new("  \"hi\"").next_token();
        assert_eq!(token.text, "\"hi\"");
    }
}
