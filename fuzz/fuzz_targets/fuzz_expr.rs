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

//! Fuzz target: decode arbitrary bytes into a token stream and run the
//! expression parser over it. The parser must report diagnostics and
//! recover instead of panicking, and the deferred-operation queue must be
//! empty at the statement boundary.

#![no_main]

use libfuzzer_sys::fuzz_target;

use adder64::config::Config;
use adder64::expr::{self, Context, ExprDesc};
use adder64::sym::{SymEntry, SymTable};
use adder64::token::{Token, TokenKind, TokenStream};
use adder64::types::Type;

fn fuzz_syms() -> SymTable {
    let mut syms = SymTable::new();
    syms.add_global(SymEntry::global("a", Type::int()));
    syms.add_global(SymEntry::global("p", Type::int().ptr_to()));
    syms.add_global(SymEntry::global("c", Type::char_()));
    syms.add_global(SymEntry::global("arr", Type::int().array_of(Some(8))));
    syms
}

fn token_from_byte(b: u8) -> Token {
    match b % 44 {
        0 => Token::int((b as i64) * 13),
        1 => Token::int_typed(b as i64 * 1000, Type::long()),
        2 => Token::ident("a"),
        3 => Token::ident("p"),
        4 => Token::ident("c"),
        5 => Token::ident("arr"),
        6 => Token::ident("nosuch"),
        7 => Token::string("fuzz"),
        8 => Token::char_const(b),
        9 => Token::new(TokenKind::Plus),
        10 => Token::new(TokenKind::Minus),
        11 => Token::new(TokenKind::Star),
        12 => Token::new(TokenKind::Div),
        13 => Token::new(TokenKind::Mod),
        14 => Token::new(TokenKind::Amp),
        15 => Token::new(TokenKind::Pipe),
        16 => Token::new(TokenKind::Xor),
        17 => Token::new(TokenKind::Shl),
        18 => Token::new(TokenKind::Shr),
        19 => Token::new(TokenKind::Lt),
        20 => Token::new(TokenKind::Le),
        21 => Token::new(TokenKind::Gt),
        22 => Token::new(TokenKind::Ge),
        23 => Token::new(TokenKind::Eq),
        24 => Token::new(TokenKind::Ne),
        25 => Token::new(TokenKind::BoolAnd),
        26 => Token::new(TokenKind::BoolOr),
        27 => Token::new(TokenKind::BoolNot),
        28 => Token::new(TokenKind::Comp),
        29 => Token::new(TokenKind::LParen),
        30 => Token::new(TokenKind::RParen),
        31 => Token::new(TokenKind::LBracket),
        32 => Token::new(TokenKind::RBracket),
        33 => Token::new(TokenKind::Quest),
        34 => Token::new(TokenKind::Colon),
        35 => Token::new(TokenKind::Comma),
        36 => Token::new(TokenKind::Assign),
        37 => Token::new(TokenKind::PlusAssign),
        38 => Token::new(TokenKind::Inc),
        39 => Token::new(TokenKind::Dec),
        40 => Token::new(TokenKind::Sizeof),
        41 => Token::new(TokenKind::KwInt),
        42 => Token::new(TokenKind::KwUnsigned),
        _ => Token::new(TokenKind::KwChar),
    }
}

fuzz_target!(|data: &[u8]| {
    let toks: Vec<Token> = data.iter().take(256).map(|b| token_from_byte(*b)).collect();
    let mut ctx = Context::new(TokenStream::new(toks), fuzz_syms(), Config::default());
    let mut e = ExprDesc::new();
    expr::expression0(&mut ctx, &mut e);

    assert_eq!(expr::deferred::get_deferred_op_count(&ctx), 0);
    if e.is_loc_none() {
        assert!(e.is_rval());
    }
});
