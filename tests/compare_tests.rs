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

//! Comparison semantics: constant folds with correct signedness, the
//! null-pointer decisions for object addresses, char specialisation, the
//! unsigned peepholes, and the function-pointer restrictions.

mod common;

use adder64::error::ErrorCode;
use adder64::token::TokenKind::*;
use adder64::types::Type;
use common::*;
use test_case::test_case;

#[test_case(3, Lt, 5 => 1)]
#[test_case(5, Lt, 3 => 0)]
#[test_case(5, Le, 5 => 1)]
#[test_case(5, Eq, 5 => 1)]
#[test_case(5, Ne, 5 => 0)]
#[test_case(-1, Lt, 0 => 1; "signed compare when both signed")]
#[test_case(7, Ge, 7 => 1)]
fn test_fold_compare(lhs: i64, op: adder64::token::TokenKind, rhs: i64) -> i64 {
    let (ctx, e) = parse(vec![int(lhs), t(op), int(rhs)]);
    assert!(e.is_const_abs());
    assert_eq!(e.ty, Type::bool_());
    assert_eq!(ctx.cg.line_count(), 0);
    e.ival
}

#[test]
fn test_mixed_sign_constant_compare_is_unsigned() {
    // -1 converts to 0xFFFF when compared against unsigned int.
    let (_, e) = parse(vec![
        int(-1),
        t(Gt),
        t(LParen),
        t(KwUnsigned),
        t(KwInt),
        t(RParen),
        int(0),
    ]);
    assert_eq!(e.ival, 1);
}

#[test]
fn test_constant_compare_warns() {
    let (ctx, _) = parse(vec![int(3), t(Lt), int(5)]);
    assert!(ctx
        .diags
        .warnings()
        .any(|w| w.contains("always true")));
}

#[test]
fn test_object_address_never_equals_null() {
    // &a == 0 is false, &a != 0 is true, both decided statically.
    let (ctx, e) = parse(vec![t(Amp), ident("a"), t(Eq), int(0)]);
    assert_eq!(e.ival, 0);
    assert_eq!(ctx.cg.line_count(), 0);

    let (_, e) = parse(vec![t(Amp), ident("a"), t(Ne), int(0)]);
    assert_eq!(e.ival, 1);

    // Ordering treats the address as strictly greater than null.
    let (_, e) = parse(vec![t(Amp), ident("a"), t(Gt), int(0)]);
    assert_eq!(e.ival, 1);
    let (_, e) = parse(vec![t(Amp), ident("a"), t(Lt), int(0)]);
    assert_eq!(e.ival, 0);
}

#[test]
fn test_char_compare_specialises_to_byte() {
    // c == 'x' compares as a single byte.
    let (ctx, e) = parse(vec![
        ident("c"),
        t(Eq),
        adder64::token::Token::char_const(b'x'),
    ]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ty, Type::bool_());
    assert!(has_line(&ctx, "cmp #$78"));
    assert!(has_line(&ctx, "jsr booleq"));
}

#[test]
fn test_unsigned_lt_one_becomes_zero_test() {
    // An unsigned < 1 can only mean the value is zero.
    let (ctx, _) = parse(vec![ident("u"), t(Lt), int(1)]);
    assert!(has_line(&ctx, "jsr booleq"));
    assert!(has_line(&ctx, "cmp #$00"));
}

#[test]
fn test_unsigned_gt_zero_becomes_nonzero_test() {
    let (ctx, _) = parse(vec![ident("u"), t(Gt), int(0)]);
    assert!(has_line(&ctx, "jsr boolne"));
}

#[test]
fn test_runtime_compare_sets_tested() {
    let (ctx, e) = parse(vec![ident("a"), t(Lt), ident("b")]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_tested());
    assert_eq!(e.ty, Type::bool_());
    assert!(has_line(&ctx, "jsr tosltax"));
}

#[test]
fn test_ordering_function_pointers_is_rejected() {
    // f < f uses function pointers in a relation operation.
    let (ctx, _) = parse(vec![ident("f"), t(Lt), ident("f")]);
    assert!(ctx
        .diags
        .errors()
        .any(|e| e.code == ErrorCode::ComparingFunctionPointers));
}

#[test]
fn test_incompatible_pointer_compare_warns() {
    // p == &c compares int* against char*.
    let (ctx, _) = parse(vec![ident("p"), t(Eq), t(Amp), ident("c")]);
    assert!(ctx
        .diags
        .warnings()
        .any(|w| w.contains("Incompatible pointer types")));
}

#[test]
fn test_pointer_against_integer_warns() {
    let (ctx, _) = parse(vec![ident("p"), t(Eq), int(5)]);
    assert!(ctx
        .diags
        .warnings()
        .any(|w| w.contains("pointer")));
}
