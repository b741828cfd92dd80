// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Token definitions for the module body lexer.

/// A span in the source code, representing a range of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length of this span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if this span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The span in the source code
    pub span: Span,
    /// Whether a line terminator appeared between the previous token and this one
    pub newline_before: bool,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, span: Span, newline_before: bool) -> Self {
        Self {
            kind,
            span,
            newline_before,
        }
    }
}

/// The different kinds of tokens a module body can contain.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Numeric literal
    Number(f64),
    /// String literal (escapes already processed)
    String(String),
    /// Boolean true
    True,
    /// Boolean false
    False,
    /// null
    Null,

    /// Identifier
    Identifier(String),
    /// A reserved word the evaluator does not implement (`for`, `class`, ...)
    Reserved(String),

    // Keywords
    Var,
    Let,
    Const,
    Function,
    Return,
    If,
    Else,
    While,
    Throw,
    Typeof,

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
    /// ;
    Semicolon,
    /// ,
    Comma,
    /// :
    Colon,
    /// ?
    Question,

    // Operators
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
    /// <
    LessThan,
    /// >
    GreaterThan,
    /// <=
    LessThanEqual,
    /// >=
    GreaterThanEqual,
    /// ==
    EqualEqual,
    /// !=
    NotEqual,
    /// ===
    StrictEqual,
    /// !==
    StrictNotEqual,
    /// !
    Bang,
    /// &&
    AmpersandAmpersand,
    /// ||
    PipePipe,
    /// =
    Equal,
    /// +=
    PlusEqual,
    /// -=
    MinusEqual,
    /// *=
    StarEqual,

    /// Unrecognized input
    Invalid,
    /// End of input
    Eof,
}

impl TokenKind {
    /// Human-readable rendering used in syntax error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::String(s) => format!("string {:?}", s),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::Reserved(word) => format!("reserved word '{}'", word),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("{:?}", other),
        }
    }
}
