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

//! Array subscripts, member access, indirection and address-of.

mod common;

use adder64::config::Config;
use adder64::error::ErrorCode;
use adder64::expr::{self, ExprDesc, Loc};
use adder64::sym::SymEntry;
use adder64::token::{TokenKind::*, TokenStream};
use adder64::types::{BitField, Field, RecordType, Type};
use common::*;

#[test]
fn test_array_with_constant_subscript_folds_to_offset() {
    // arr[2] is the lvalue at _arr+4; no code is emitted for the access.
    let (ctx, e) = parse(vec![ident("arr"), t(LBracket), int(2), t(RBracket)]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_lval());
    assert_eq!(e.loc, Loc::Global);
    assert_eq!(e.ival, 4);
    assert_eq!(e.ty, Type::int());
    assert_eq!(ctx.cg.line_count(), 0);
}

#[test]
fn test_array_with_variable_subscript_scales_and_adds() {
    // arr[a] scales the subscript by sizeof(int) and adds the base
    // address.
    let (ctx, e) = parse(vec![ident("arr"), t(LBracket), ident("a"), t(RBracket)]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_lval());
    assert_eq!(e.loc, Loc::Expr);
    assert!(has_line(&ctx, "jsr aslax1"));
    assert!(has_line(&ctx, "adc #<(_arr)"));
}

#[test]
fn test_byte_array_with_quasi_constant_subscript_reverses_order() {
    // buf[c]: element size one and a statically addressable subscript
    // allow adding the variable directly to the array address.
    let (ctx, e) = parse(vec![ident("buf"), t(LBracket), ident("c"), t(RBracket)]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ty, Type::char_());
    assert!(has_line(&ctx, "adc _c"));
    assert!(!has_line(&ctx, "jsr tosaddax"));
}

#[test]
fn test_pointer_subscript_loads_pointer() {
    // p[1] must load the pointer value, the offset rides on the access.
    let (ctx, e) = parse(vec![ident("p"), t(LBracket), int(1), t(RBracket)]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_lval());
    assert_eq!(e.loc, Loc::Expr);
    assert_eq!(e.ival, 2);
    assert!(has_line(&ctx, "lda _p"));
}

#[test]
fn test_int_subscripted_by_array_swaps_sides() {
    // 2[arr] is the same element as arr[2].
    let (ctx, e) = parse(vec![int(2), t(LBracket), ident("arr"), t(RBracket)]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ty, Type::int());
    let _ = ctx;
}

#[test]
fn test_subscript_type_errors() {
    let (ctx, _) = parse(vec![ident("arr"), t(LBracket), ident("p"), t(RBracket)]);
    assert!(ctx
        .diags
        .errors()
        .any(|e| e.code == ErrorCode::SubscriptNotAnInteger));

    let (ctx, _) = parse(vec![ident("a"), t(LBracket), int(1), t(RBracket)]);
    assert!(ctx
        .diags
        .errors()
        .any(|e| e.code == ErrorCode::SubscriptNotAPointer));
}

/// A test record: struct point { int x; int y; } and a packed variant
/// with a bit-field.
fn point_type() -> Type {
    Type::record(RecordType {
        name: "point".into(),
        is_union: false,
        complete: true,
        size: 4,
        fields: vec![
            Field {
                name: "x".into(),
                ty: Type::int(),
                offs: 0,
                bit: None,
            },
            Field {
                name: "y".into(),
                ty: Type::int(),
                offs: 2,
                bit: None,
            },
        ],
    })
}

fn flags_type() -> Type {
    Type::record(RecordType {
        name: "flags".into(),
        is_union: false,
        complete: true,
        size: 2,
        fields: vec![Field {
            name: "mode".into(),
            ty: Type::uint(),
            offs: 0,
            bit: Some(BitField { offs: 2, width: 3 }),
        }],
    })
}

fn record_ctx(toks: Vec<adder64::token::Token>) -> adder64::expr::Context {
    let mut syms = default_syms();
    syms.add_global(SymEntry::global("pt", point_type()));
    syms.add_global(SymEntry::global("ptp", point_type().ptr_to()));
    syms.add_global(SymEntry::global("fl", flags_type()));
    adder64::expr::Context::new(TokenStream::new(toks), syms, Config::default())
}

#[test]
fn test_member_access_folds_to_offset() {
    // pt.y references _pt+2 without emitting code.
    let mut ctx = record_ctx(vec![ident("pt"), t(Dot), ident("y")]);
    let mut e = ExprDesc::new();
    expr::expr_with_check(&mut ctx, expr::hie0, &mut e);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_lval());
    assert_eq!(e.loc, Loc::Global);
    assert_eq!(e.ival, 2);
    assert_eq!(e.ty, Type::int());
    assert_eq!(ctx.cg.line_count(), 0);
}

#[test]
fn test_arrow_access_loads_pointer_and_offsets() {
    let mut ctx = record_ctx(vec![ident("ptp"), t(Arrow), ident("y")]);
    let mut e = ExprDesc::new();
    expr::expr_with_check(&mut ctx, expr::hie0, &mut e);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_lval());
    assert_eq!(e.loc, Loc::Expr);
    assert_eq!(e.ival, 2);
    assert!(has_line(&ctx, "lda _ptp"));
}

#[test]
fn test_bit_field_member_load_shifts_and_masks() {
    // a + fl.mode forces a load of the bit-field.
    let mut ctx = record_ctx(vec![ident("a"), t(Plus), ident("fl"), t(Dot), ident("mode")]);
    let mut e = ExprDesc::new();
    expr::expr_with_check(&mut ctx, expr::hie0, &mut e);
    assert!(!ctx.diags.has_errors());
    assert!(has_line(&ctx, "jsr shrax2"));
    assert!(has_line(&ctx, "jsr tosandax") || has_line(&ctx, "and #$07"));
    let _ = e;
}

#[test]
fn test_no_such_field_is_diagnosed() {
    let mut ctx = record_ctx(vec![ident("pt"), t(Dot), ident("z")]);
    let mut e = ExprDesc::new();
    expr::expr_with_check(&mut ctx, expr::hie0, &mut e);
    assert!(ctx
        .diags
        .errors()
        .any(|e| e.code == ErrorCode::NoSuchField));
}

#[test]
fn test_address_of_bit_field_is_rejected() {
    let mut ctx = record_ctx(vec![t(Amp), ident("fl"), t(Dot), ident("mode")]);
    let mut e = ExprDesc::new();
    expr::expr_with_check(&mut ctx, expr::hie0, &mut e);
    assert!(ctx
        .diags
        .errors()
        .any(|e| e.code == ErrorCode::AddressOfBitField));
}

#[test]
fn test_deref_of_pointer_variable() {
    // *p loads the pointer and references the int behind it.
    let (ctx, e) = parse(vec![t(Star), ident("p")]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_lval());
    assert_eq!(e.loc, Loc::Expr);
    assert_eq!(e.ty, Type::int());
    assert!(has_line(&ctx, "lda _p"));
}

#[test]
fn test_deref_of_array_name_is_free() {
    // *arr is the first element; the address is statically known.
    let (ctx, e) = parse(vec![t(Star), ident("arr")]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_lval());
    assert_eq!(e.loc, Loc::Global);
    assert_eq!(e.ty, Type::int());
    assert_eq!(ctx.cg.line_count(), 0);
}

#[test]
fn test_address_of_yields_pointer_rvalue() {
    let (ctx, e) = parse(vec![t(Amp), ident("a")]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_rval());
    assert!(e.is_addr_expr());
    assert_eq!(e.ty, Type::int().ptr_to());
    assert_eq!(ctx.cg.line_count(), 0);
}

#[test]
fn test_address_of_rvalue_is_rejected() {
    let (ctx, _) = parse(vec![t(Amp), int(5)]);
    assert!(ctx
        .diags
        .errors()
        .any(|e| e.code == ErrorCode::IllegalAddress));
}

#[test]
fn test_deref_of_integer_is_diagnosed() {
    let (ctx, _) = parse(vec![t(Star), ident("a")]);
    assert!(ctx
        .diags
        .errors()
        .any(|e| e.code == ErrorCode::IllegalIndirection));
}

#[test]
fn test_string_literal_is_pooled_char_array_address() {
    let (ctx, e) = parse(vec![adder64::token::Token::string("hi")]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_rval());
    assert!(e.is_addr_expr());
    assert_eq!(e.loc, Loc::Literal);
    assert_eq!(e.ty, Type::char_array(3));
    assert_eq!(ctx.lits.len(), 1);
}
