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

//! Function calls: fastcall argument passing, frame pre-allocation,
//! variadic promotion, function pointers, wrapped calls and the inlined
//! standard functions.

mod common;

use adder64::config::Config;
use adder64::error::ErrorCode;
use adder64::expr::{self, ExprDesc, Loc};
use adder64::sym::{SymEntry, SymTable};
use adder64::token::{Token, TokenKind::*, TokenStream};
use adder64::types::{FuncType, Param, Qualifiers, Type};
use common::*;

#[test]
fn test_simple_call_returns_rvalue_in_primary() {
    let (ctx, e) = parse(vec![ident("f"), t(LParen), t(RParen)]);
    assert!(!ctx.diags.has_errors());
    assert!(has_line(&ctx, "jsr _f"));
    assert!(e.is_rval());
    assert_eq!(e.loc, Loc::Primary);
    assert_eq!(e.ty, Type::int());
}

#[test]
fn test_fastcall_keeps_last_argument_in_primary() {
    // add2(a, c): the first argument is pushed, the last one is passed in
    // the primary register.
    let (ctx, _) = parse(vec![
        ident("add2"),
        t(LParen),
        ident("a"),
        t(Comma),
        ident("c"),
        t(RParen),
    ]);
    assert!(!ctx.diags.has_errors());
    assert!(has_line(&ctx, "jsr pushax"));
    // The char argument is loaded last and not pushed.
    let load_c = line_index(&ctx, "lda _c").expect("load of c");
    let call = line_index(&ctx, "jsr _add2").expect("the call");
    assert!(load_c < call);
    assert!(!has_line(&ctx, "jsr pusha"));
}

#[test]
fn test_cdecl_function_pushes_all_arguments() {
    // With a cdecl-qualified function both arguments go onto the stack.
    let mut syms = default_syms();
    syms.add_global(SymEntry::func(
        "cd",
        Type::func(FuncType {
            ret: Type::int(),
            params: vec![
                Param {
                    name: "x".into(),
                    ty: Type::int(),
                },
                Param {
                    name: "y".into(),
                    ty: Type::int(),
                },
            ],
            variadic: false,
            empty: false,
        })
        .with_quals(Qualifiers::CDECL),
    ));
    let mut ctx = adder64::expr::Context::new(
        TokenStream::new(vec![
            ident("cd"),
            t(LParen),
            int(1),
            t(Comma),
            int(2),
            t(RParen),
        ]),
        syms,
        Config::default(),
    );
    let mut e = ExprDesc::new();
    expr::expr_with_check(&mut ctx, expr::hie0, &mut e);
    assert!(!ctx.diags.has_errors());
    assert_eq!(count_lines(&ctx, "jsr pushax"), 2);
}

#[test]
fn test_variadic_tail_gets_default_promotion() {
    // vsum(2, c): the char in the tail is promoted to int when pushed.
    let (ctx, _) = parse(vec![
        ident("vsum"),
        t(LParen),
        int(2),
        t(Comma),
        ident("c"),
        t(RParen),
    ]);
    assert!(!ctx.diags.has_errors());
    // Variadic functions are never fastcall; both arguments are pushed as
    // full words.
    assert_eq!(count_lines(&ctx, "jsr pushax"), 2);
    assert!(!has_line(&ctx, "jsr pusha"));
}

#[test]
fn test_too_many_and_too_few_arguments() {
    let (ctx, _) = parse(vec![
        ident("add2"),
        t(LParen),
        int(1),
        t(Comma),
        int(2),
        t(Comma),
        int(3),
        t(RParen),
    ]);
    assert!(ctx
        .diags
        .errors()
        .any(|e| e.code == ErrorCode::TooManyArguments));

    let (ctx, _) = parse(vec![ident("add2"), t(LParen), int(1), t(RParen)]);
    assert!(ctx
        .diags
        .errors()
        .any(|e| e.code == ErrorCode::TooFewArguments));
}

#[test]
fn test_frame_preallocation_with_large_code_size_factor() {
    // With a cdecl function, two frame parameters and size-over-speed not
    // selected, the frame is allocated at once and the arguments are
    // stored, not pushed.
    let mut syms = default_syms();
    syms.add_global(SymEntry::func(
        "cd",
        Type::func(FuncType {
            ret: Type::int(),
            params: vec![
                Param {
                    name: "x".into(),
                    ty: Type::int(),
                },
                Param {
                    name: "y".into(),
                    ty: Type::int(),
                },
                Param {
                    name: "z".into(),
                    ty: Type::int(),
                },
            ],
            variadic: false,
            empty: false,
        })
        .with_quals(Qualifiers::CDECL),
    ));
    let mut config = Config::default();
    config.code_size_factor = 200;
    let mut ctx = adder64::expr::Context::new(
        TokenStream::new(vec![
            ident("cd"),
            t(LParen),
            int(1),
            t(Comma),
            int(2),
            t(Comma),
            int(3),
            t(RParen),
        ]),
        syms,
        config,
    );
    let mut e = ExprDesc::new();
    expr::expr_with_check(&mut ctx, expr::hie0, &mut e);
    assert!(!ctx.diags.has_errors());
    // One stack adjustment for the whole frame, stores instead of pushes.
    assert!(has_line(&ctx, "jsr decsp6"));
    assert!(!has_line(&ctx, "jsr pushax"));
    assert_eq!(count_lines(&ctx, "jsr staxysp"), 3);
}

#[test]
fn test_call_through_function_pointer_variable() {
    let mut syms = default_syms();
    syms.add_global(SymEntry::global(
        "fp",
        Type::func(FuncType {
            ret: Type::int(),
            params: Vec::new(),
            variadic: false,
            empty: false,
        })
        .with_quals(Qualifiers::CDECL)
        .ptr_to(),
    ));
    let mut ctx = adder64::expr::Context::new(
        TokenStream::new(vec![ident("fp"), t(LParen), t(RParen)]),
        syms,
        Config::default(),
    );
    let mut e = ExprDesc::new();
    expr::expr_with_check(&mut ctx, expr::hie0, &mut e);
    assert!(!ctx.diags.has_errors());
    // The pointer value is loaded and called; with no arguments the
    // stack copy is elided again.
    assert!(has_line(&ctx, "lda _fp"));
    assert!(has_line(&ctx, "jsr callax"));
    assert!(!has_line(&ctx, "jsr pushax"));
    assert_eq!(e.ty, Type::int());
}

#[test]
fn test_call_on_non_function_is_diagnosed() {
    let (ctx, _) = parse(vec![ident("a"), t(LParen), t(RParen)]);
    assert!(ctx
        .diags
        .errors()
        .any(|e| e.code == ErrorCode::IllegalFunctionCall));
}

#[test]
fn test_implicit_function_declaration_warns_in_c89() {
    // Calling an unknown identifier declares an int function implicitly;
    // before C99 that is a warning only.
    let mut config = Config::default();
    config.standard = adder64::config::Standard::C89;
    let mut ctx = ctx_with_config(vec![ident("mystery"), t(LParen), t(RParen)], config);
    let mut e = ExprDesc::new();
    expr::expr_with_check(&mut ctx, expr::hie0, &mut e);
    assert!(!ctx.diags.has_errors());
    assert!(ctx
        .diags
        .warnings()
        .any(|w| w.contains("undeclared function")));
    assert!(has_line(&ctx, "jsr _mystery"));
    assert_eq!(e.ty, Type::int());
}

#[test]
fn test_implicit_function_declaration_errors_in_c99() {
    let mut config = Config::default();
    config.standard = adder64::config::Standard::C99;
    let mut ctx = ctx_with_config(vec![ident("mystery"), t(LParen), t(RParen)], config);
    let mut e = ExprDesc::new();
    expr::expr_with_check(&mut ctx, expr::hie0, &mut e);
    assert!(ctx
        .diags
        .errors()
        .any(|e| e.code == ErrorCode::UndeclaredFunction));
}

#[test]
fn test_wrapped_call_emits_thunk() {
    let mut syms = SymTable::new();
    syms.add_global(
        SymEntry::func(
            "driver",
            Type::func(FuncType {
                ret: Type::int(),
                params: Vec::new(),
                variadic: false,
                empty: false,
            }),
        )
        .with_wrapped_call("callwrapper", 7),
    );
    let mut ctx = adder64::expr::Context::new(
        TokenStream::new(vec![ident("driver"), t(LParen), t(RParen)]),
        syms,
        Config::default(),
    );
    let mut e = ExprDesc::new();
    expr::expr_with_check(&mut ctx, expr::hie0, &mut e);
    assert!(!ctx.diags.has_errors());
    assert!(has_line(&ctx, "ldy #$07"));
    assert!(has_line(&ctx, "sty tmp4"));
    assert!(has_line(&ctx, "ldy #<(_driver)"));
    assert!(has_line(&ctx, "sty ptr4"));
    assert!(has_line(&ctx, "jsr _callwrapper"));
    assert!(!has_line(&ctx, "jsr _driver"));
}

#[test]
fn test_strlen_of_literal_folds_to_length() {
    let (ctx, e) = parse(vec![
        ident("strlen"),
        t(LParen),
        Token::string("hello"),
        t(RParen),
    ]);
    // strlen is implicitly declared here but inlined before the normal
    // call path runs.
    assert!(e.is_const_abs());
    assert_eq!(e.ival, 5);
    assert_eq!(e.ty, Type::size_t());
    assert!(!has_line(&ctx, "jsr _strlen"));
}

#[test]
fn test_strlen_of_static_array_scans_inline() {
    let (ctx, e) = parse(vec![
        ident("strlen"),
        t(LParen),
        ident("buf"),
        t(RParen),
    ]);
    assert_eq!(e.ty, Type::size_t());
    assert!(has_line(&ctx, "lda _buf,y"));
    assert!(!has_line(&ctx, "jsr _strlen"));
}
