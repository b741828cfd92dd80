// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lexical analysis (tokenization) for module source code.
//!
//! ## Structure
//!
//! - `scanner.rs` - Main `Scanner` struct that produces tokens
//! - `token.rs` - `Token` and `TokenKind` definitions
//!
//! ## Usage
//!
//! ```rust
//! use strata_script::lexer::{Scanner, TokenKind};
//!
//! let mut scanner = Scanner::new("module.exports = 42;");
//!
//! loop {
//!     let token = scanner.next_token();
//!     if matches!(token.kind, TokenKind::Eof) {
//!         break;
//!     }
//!     println!("{:?}", token.kind);
//! }
//! ```

mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{Span, Token, TokenKind};
