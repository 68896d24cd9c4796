// Adder64 - A small-C cross-compiler creating C64 binaries
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Adder64 compiler core: expression parsing and 6510 code emission.
//!
//! This library is the expression parser and code emitter of the Adder64
//! small-C compiler. Given a token stream and a typed symbol environment
//! it recognises the full C expression grammar, performs the type checks
//! and usual arithmetic conversions, folds constants bit-exactly for the
//! target widths, and emits 6510 assembly into a patchable code buffer.
//!
//! # Modules
//!
//! - [`error`] - Error types and the diagnostics sink
//! - [`config`] - Compilation switches
//! - [`token`] - Tokens and the lookahead stream
//! - [`types`] - The C type graph and conversion rules
//! - [`sym`] - The symbol environment
//! - [`literals`] - The string literal pool
//! - [`codegen`] - Code buffer, emitter operations, peephole patching
//! - [`expr`] - The precedence cascade and its entry points
//!
//! # Example
//!
//! ```
//! use adder64::expr::{expression0, Context, ExprDesc};
//! use adder64::config::Config;
//! use adder64::sym::SymTable;
//! use adder64::token::{Token, TokenKind, TokenStream};
//!
//! // 3 + 4 * 5 folds to a constant; no code is emitted.
//! let toks = TokenStream::new(vec![
//!     Token::int(3),
//!     Token::new(TokenKind::Plus),
//!     Token::int(4),
//!     Token::new(TokenKind::Star),
//!     Token::int(5),
//! ]);
//! let mut ctx = Context::new(toks, SymTable::new(), Config::default());
//! let mut expr = ExprDesc::new();
//! expression0(&mut ctx, &mut expr);
//! assert!(!ctx.diags.has_errors());
//! ```

pub mod codegen;
pub mod config;
pub mod error;
pub mod expr;
pub mod literals;
pub mod sym;
pub mod token;
pub mod types;

// Re-export commonly used types.
pub use config::{Config, Standard};
pub use error::{CompileError, Diagnostics, ErrorCode, Span};
pub use expr::{Context, ExprDesc};
pub use token::{Token, TokenKind, TokenStream};
pub use types::Type;

/// The version of the Adder64 compiler core.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the compiler.
pub const NAME: &str = "Adder64";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "Adder64");
    }
}
