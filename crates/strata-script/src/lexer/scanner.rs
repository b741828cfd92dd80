// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The scanner that produces tokens from module source text.

use super::{Span, Token, TokenKind};

/// Reserved words that are recognized but not supported by the evaluator.
const UNSUPPORTED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "continue", "debugger", "default", "delete", "do",
    "enum", "export", "extends", "finally", "for", "import", "in", "instanceof", "new", "super",
    "switch", "this", "try", "void", "with", "yield",
];

/// A scanner that tokenizes module source code.
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Returns the source text being scanned.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        let newline_before = self.skip_whitespace_and_comments();

        let start = self.current_pos;

        let Some((_pos, ch)) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::new(start, start), newline_before);
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
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,

            '.' => match self.peek() {
                Some(digit) if digit.is_ascii_digit() => self.scan_number('.'),
                _ => TokenKind::Dot,
            },
            '+' => self.scan_with_equal(TokenKind::Plus, TokenKind::PlusEqual),
            '-' => self.scan_with_equal(TokenKind::Minus, TokenKind::MinusEqual),
            '*' => self.scan_with_equal(TokenKind::Star, TokenKind::StarEqual),
            '<' => self.scan_with_equal(TokenKind::LessThan, TokenKind::LessThanEqual),
            '>' => self.scan_with_equal(TokenKind::GreaterThan, TokenKind::GreaterThanEqual),
            '=' => self.scan_equal(),
            '!' => self.scan_bang(),
            '&' => self.scan_doubled('&', TokenKind::AmpersandAmpersand),
            '|' => self.scan_doubled('|', TokenKind::PipePipe),

            '"' | '\'' => self.scan_string(ch),

            '0'..='9' => self.scan_number(ch),

            _ if is_id_start(ch) => self.scan_identifier(ch),

            _ => TokenKind::Invalid,
        };

        Token::new(kind, Span::new(start, self.current_pos), newline_before)
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    /// Skips whitespace and comments, reporting whether a line break was crossed.
    fn skip_whitespace_and_comments(&mut self) -> bool {
        let mut newline = false;
        loop {
            match self.peek() {
                Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                    newline = true;
                    self.advance();
                }
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        self.advance();
                        self.advance();
                        while let Some(ch) = self.peek() {
                            if ch == '\n' || ch == '\r' {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        while let Some((_, ch)) = self.advance() {
                            if ch == '\n' || ch == '\r' {
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

    fn scan_with_equal(&mut self, plain: TokenKind, with_equal: TokenKind) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            with_equal
        } else {
            plain
        }
    }

    fn scan_doubled(&mut self, ch: char, doubled: TokenKind) -> TokenKind {
        if self.peek() == Some(ch) {
            self.advance();
            doubled
        } else {
            // Bitwise operators are outside the supported subset
            TokenKind::Invalid
        }
    }

    fn scan_equal(&mut self) -> TokenKind {
        if self.peek() != Some('=') {
            return TokenKind::Equal;
        }
        self.advance();
        if self.peek() == Some('=') {
            self.advance();
            TokenKind::StrictEqual
        } else {
            TokenKind::EqualEqual
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        if self.peek() != Some('=') {
            return TokenKind::Bang;
        }
        self.advance();
        if self.peek() == Some('=') {
            self.advance();
            TokenKind::StrictNotEqual
        } else {
            TokenKind::NotEqual
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                None | Some((_, '\n')) => return TokenKind::Invalid,
                Some((_, ch)) if ch == quote => break,
                Some((_, '\\')) => match self.advance() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, '0')) => value.push('\0'),
                    Some((_, 'x')) => match self.scan_hex_escape(2) {
                        Some(ch) => value.push(ch),
                        None => return TokenKind::Invalid,
                    },
                    Some((_, 'u')) => match self.scan_hex_escape(4) {
                        Some(ch) => value.push(ch),
                        None => return TokenKind::Invalid,
                    },
                    // Line continuation
                    Some((_, '\n')) => {}
                    Some((_, escaped)) => value.push(escaped),
                    None => return TokenKind::Invalid,
                },
                Some((_, ch)) => value.push(ch),
            }
        }

        TokenKind::String(value)
    }

    fn scan_hex_escape(&mut self, digits: usize) -> Option<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            let (_, ch) = self.advance()?;
            code = code * 16 + ch.to_digit(16)?;
        }
        char::from_u32(code)
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            return self.scan_hex_number();
        }

        let mut value = String::from(first);
        let mut seen_dot = first == '.';

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                value.push(ch);
            } else if ch == '.' && !seen_dot {
                seen_dot = true;
                value.push(ch);
            } else if ch != '_' {
                break;
            }
            self.advance();
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            value.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                value.push(sign);
                self.advance();
            }
            while let Some(ch) = self.peek() {
                if !ch.is_ascii_digit() {
                    break;
                }
                value.push(ch);
                self.advance();
            }
        }

        match value.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Invalid,
        }
    }

    fn scan_hex_number(&mut self) -> TokenKind {
        self.advance(); // consume 'x'
        let mut value = String::new();

        while let Some(ch) = self.peek() {
            if ch.is_ascii_hexdigit() {
                value.push(ch);
            } else if ch != '_' {
                break;
            }
            self.advance();
        }

        match u64::from_str_radix(&value, 16) {
            Ok(n) => TokenKind::Number(n as f64),
            Err(_) => TokenKind::Invalid,
        }
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::from(first);

        while let Some(ch) = self.peek() {
            if !is_id_continue(ch) {
                break;
            }
            name.push(ch);
            self.advance();
        }

        match name.as_str() {
            "var" => TokenKind::Var,
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "throw" => TokenKind::Throw,
            "typeof" => TokenKind::Typeof,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            word if UNSUPPORTED_WORDS.contains(&word) => TokenKind::Reserved(name),
            _ => TokenKind::Identifier(name),
        }
    }
}

/// Checks if a character can start an identifier.
fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

/// Checks if a character can continue an identifier.
fn is_id_continue(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Scanner::new(src).map(|token| token.kind).collect()
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("{ } ( ) [ ] . ; , : ?"),
            vec![
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBracket,
                TokenKind::RightBracket,
                TokenKind::Dot,
                TokenKind::Semicolon,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Question,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("= == === != !== ! && || += -= *= <= >="),
            vec![
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::StrictEqual,
                TokenKind::NotEqual,
                TokenKind::StrictNotEqual,
                TokenKind::Bang,
                TokenKind::AmpersandAmpersand,
                TokenKind::PipePipe,
                TokenKind::PlusEqual,
                TokenKind::MinusEqual,
                TokenKind::StarEqual,
                TokenKind::LessThanEqual,
                TokenKind::GreaterThanEqual,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let mut scanner = Scanner::new("42 3.5 .25 0xff 1e3 1_000");
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 42.0));
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 3.5));
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 0.25));
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 255.0));
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 1000.0));
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 1000.0));
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds(r#""hello" 'world' 'a\nb' "\x41B" 'it\'s'"#),
            vec![
                TokenKind::String("hello".into()),
                TokenKind::String("world".into()),
                TokenKind::String("a\nb".into()),
                TokenKind::String("AB".into()),
                TokenKind::String("it's".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_invalid() {
        assert_eq!(kinds("'abc"), vec![TokenKind::Invalid]);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("var exports require for $x _y"),
            vec![
                TokenKind::Var,
                TokenKind::Identifier("exports".into()),
                TokenKind::Identifier("require".into()),
                TokenKind::Reserved("for".into()),
                TokenKind::Identifier("$x".into()),
                TokenKind::Identifier("_y".into()),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("1 // line\n2 /* block */ 3"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Number(2.0),
                TokenKind::Number(3.0),
            ]
        );
    }

    #[test]
    fn test_newline_tracking() {
        let mut scanner = Scanner::new("a\nb /* x\n */ c d");
        assert!(!scanner.next_token().newline_before);
        assert!(scanner.next_token().newline_before);
        assert!(scanner.next_token().newline_before);
        assert!(!scanner.next_token().newline_before);
    }

    #[test]
    fn test_division_vs_comment() {
        assert_eq!(
            kinds("6 / 2"),
            vec![TokenKind::Number(6.0), TokenKind::Slash, TokenKind::Number(2.0)]
        );
    }

    #[test]
    fn test_spans() {
        let mut scanner = Scanner::new("  foo");
        let token = scanner.next_token();
        assert_eq!(token.span, Span::new(2, 5));
        assert_eq!(&scanner.source()[token.span.start..token.span.end], "foo");
    }
}
