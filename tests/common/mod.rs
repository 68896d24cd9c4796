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

//! Shared scaffolding for the expression core integration tests: a typed
//! symbol environment, token builders and parse drivers.

#![allow(dead_code)]

use adder64::config::Config;
use adder64::expr::{self, Context, ExprDesc};
use adder64::sym::{SymEntry, SymTable};
use adder64::token::{Token, TokenKind, TokenStream};
use adder64::types::{FuncType, Param, Type};

/// The symbol environment most tests run in, roughly:
///
/// ```c
/// int a, b;
/// int *p;
/// char c;
/// unsigned char u;
/// long l;
/// unsigned long ul;
/// int arr[10];
/// char buf[16];
/// int f(void);
/// int add2(int x, char y);
/// int vsum(int n, ...);
/// ```
pub fn default_syms() -> SymTable {
    let mut syms = SymTable::new();
    syms.add_global(SymEntry::global("a", Type::int()));
    syms.add_global(SymEntry::global("b", Type::int()));
    syms.add_global(SymEntry::global("p", Type::int().ptr_to()));
    syms.add_global(SymEntry::global("c", Type::char_()));
    syms.add_global(SymEntry::global("u", Type::uchar()));
    syms.add_global(SymEntry::global("l", Type::long()));
    syms.add_global(SymEntry::global("ul", Type::ulong()));
    syms.add_global(SymEntry::global("arr", Type::int().array_of(Some(10))));
    syms.add_global(SymEntry::global("buf", Type::char_().array_of(Some(16))));
    syms.add_global(SymEntry::func(
        "f",
        Type::func(FuncType {
            ret: Type::int(),
            params: Vec::new(),
            variadic: false,
            empty: false,
        }),
    ));
    syms.add_global(SymEntry::func(
        "add2",
        Type::func(FuncType {
            ret: Type::int(),
            params: vec![
                Param {
                    name: "x".into(),
                    ty: Type::int(),
                },
                Param {
                    name: "y".into(),
                    ty: Type::char_(),
                },
            ],
            variadic: false,
            empty: false,
        }),
    ));
    syms.add_global(SymEntry::func(
        "vsum",
        Type::func(FuncType {
            ret: Type::int(),
            params: vec![Param {
                name: "n".into(),
                ty: Type::int(),
            }],
            variadic: true,
            empty: false,
        }),
    ));
    syms.add_global(SymEntry::func(
        "strlen",
        Type::func(FuncType {
            ret: Type::size_t(),
            params: vec![Param {
                name: "s".into(),
                ty: Type::char_().ptr_to(),
            }],
            variadic: false,
            empty: false,
        }),
    ));
    syms
}

/// Build a context over the given tokens and the default symbols.
pub fn ctx_for(toks: Vec<Token>) -> Context {
    Context::new(TokenStream::new(toks), default_syms(), Config::default())
}

/// Build a context with a custom configuration.
pub fn ctx_with_config(toks: Vec<Token>, config: Config) -> Context {
    Context::new(TokenStream::new(toks), default_syms(), config)
}

/// Parse a full comma expression with the stack-pointer check, without
/// materialising the result.
pub fn parse(toks: Vec<Token>) -> (Context, ExprDesc) {
    let mut ctx = ctx_for(toks);
    let mut e = ExprDesc::new();
    expr::expr_with_check(&mut ctx, expr::hie0, &mut e);
    (ctx, e)
}

/// Evaluate a full expression statement: parse, load the result and settle
/// all deferred operations.
pub fn evaluate(toks: Vec<Token>) -> (Context, ExprDesc) {
    let mut ctx = ctx_for(toks);
    let mut e = ExprDesc::new();
    expr::expression0(&mut ctx, &mut e);
    (ctx, e)
}

/// Shorthand for a plain token.
pub fn t(kind: TokenKind) -> Token {
    Token::new(kind)
}

/// Shorthand for an int constant token.
pub fn int(v: i64) -> Token {
    Token::int(v)
}

/// Shorthand for an identifier token.
pub fn ident(name: &str) -> Token {
    Token::ident(name)
}

/// Count how often a line occurs in the emitted code.
pub fn count_lines(ctx: &Context, line: &str) -> usize {
    ctx.cg.lines().iter().filter(|l| l.as_str() == line).count()
}

/// Check whether a line occurs in the emitted code.
pub fn has_line(ctx: &Context, line: &str) -> bool {
    count_lines(ctx, line) > 0
}

/// Index of the first occurrence of a line in the emitted code.
pub fn line_index(ctx: &Context, line: &str) -> Option<usize> {
    ctx.cg.lines().iter().position(|l| l.as_str() == line)
}
