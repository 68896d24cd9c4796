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

//! Constant folding: bit-exact two's complement results at the width of
//! the converted type, for signed and unsigned operands, plus the error
//! recovery for division by zero.

mod common;

use adder64::token::{Token, TokenKind::*};
use adder64::types::{Type, TypeKind};
use common::*;
use test_case::test_case;

#[test_case(7, Star, 6 => 42; "multiplication")]
#[test_case(42, Div, 5 => 8; "division truncates")]
#[test_case(42, Mod, 5 => 2; "modulo")]
#[test_case(0x0F0F, Amp, 0x00FF => 0x000F; "bitwise and")]
#[test_case(0x0F00, Pipe, 0x00F0 => 0x0FF0; "bitwise or")]
#[test_case(0x0FF0, Xor, 0x00FF => 0x0F0F; "bitwise xor")]
#[test_case(300, Star, 300 => 24464; "int multiplication wraps at 16 bits")]
#[test_case(-7, Div, 2 => -3; "signed division rounds toward zero")]
#[test_case(-7, Mod, 2 => -1; "signed modulo keeps sign")]
fn test_fold_int(lhs: i64, op: adder64::token::TokenKind, rhs: i64) -> i64 {
    let (ctx, e) = parse(vec![int(lhs), t(op), int(rhs)]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_const_abs_int());
    assert_eq!(ctx.cg.line_count(), 0);
    e.ival
}

#[test]
fn test_fold_long_width() {
    // 70000 * 3 in long arithmetic.
    let (ctx, e) = parse(vec![
        Token::int_typed(70000, Type::long()),
        t(Star),
        int(3),
    ]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ty, Type::long());
    assert_eq!(e.ival, 210000);
    assert_eq!(ctx.cg.line_count(), 0);
}

#[test]
fn test_fold_long_wraps_at_32_bits() {
    let (ctx, e) = parse(vec![
        Token::int_typed(0x4000_0000, Type::long()),
        t(Star),
        int(4),
    ]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ty, Type::long());
    assert_eq!(e.ival, 0);
    assert_eq!(ctx.cg.line_count(), 0);
}

#[test]
fn test_fold_unsigned_division() {
    // In unsigned int arithmetic, -2 converts to 0xFFFE first.
    let (ctx, e) = parse(vec![
        t(LParen),
        t(KwUnsigned),
        t(KwInt),
        t(RParen),
        t(Minus),
        int(2),
        t(Div),
        int(3),
    ]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ty, Type::uint());
    assert_eq!(e.ival, 0xFFFE / 3);
}

#[test]
fn test_division_by_zero_recovers_with_diagnostic() {
    let (ctx, e) = parse(vec![int(1), t(Div), int(0)]);
    assert!(ctx.diags.has_errors());
    assert!(e.is_const_abs_int());

    let (ctx, e) = parse(vec![int(1), t(Mod), int(0)]);
    assert!(ctx.diags.has_errors());
    assert_eq!(e.ival, 0);
}

#[test_case(Minus, 5 => -5; "negation")]
#[test_case(Plus, 5 => 5; "unary plus")]
#[test_case(Comp, 0 => -1; "complement of zero")]
fn test_fold_unary(op: adder64::token::TokenKind, operand: i64) -> i64 {
    let (ctx, e) = parse(vec![t(op), int(operand)]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_const_abs_int());
    assert_eq!(ctx.cg.line_count(), 0);
    e.ival
}

#[test]
fn test_unary_promotes_char_operand() {
    let (ctx, e) = parse(vec![t(Minus), Token::char_const(b'A')]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ty.kind, TypeKind::Int);
    assert_eq!(e.ival, -65);
}

#[test]
fn test_boolean_not_folds() {
    let (_, e) = parse(vec![t(BoolNot), int(0)]);
    assert_eq!(e.ival, 1);
    assert_eq!(e.ty, Type::bool_());

    let (_, e) = parse(vec![t(BoolNot), int(17)]);
    assert_eq!(e.ival, 0);
}

#[test]
fn test_shift_folding() {
    let (ctx, e) = parse(vec![int(1), t(Shl), int(10)]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ival, 1024);
    assert_eq!(ctx.cg.line_count(), 0);

    let (_, e) = parse(vec![int(-16), t(Shr), int(2)]);
    assert_eq!(e.ival, -4);
}

#[test]
fn test_oversized_shift_count_warns_and_folds_to_zero() {
    let (ctx, e) = parse(vec![int(1), t(Shl), int(16)]);
    assert!(!ctx.diags.has_errors());
    assert!(ctx
        .diags
        .warnings()
        .any(|w| w.contains("Shift count")));
    assert_eq!(e.ival, 0);
}

#[test]
fn test_fold_uses_converted_type() {
    // int + unsigned int folds as unsigned int.
    let (ctx, e) = parse(vec![
        int(-1),
        t(Plus),
        t(LParen),
        t(KwUnsigned),
        t(KwInt),
        t(RParen),
        int(0),
    ]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ty, Type::uint());
    assert_eq!(e.ival, 0xFFFF);
}

#[test]
fn test_cast_truncates_constant() {
    // (char)300 wraps to 44; (unsigned char)300 also 44 but unsigned.
    let (_, e) = parse(vec![t(LParen), t(KwChar), t(RParen), int(300)]);
    assert_eq!(e.ty, Type::char_());
    assert_eq!(e.ival, 44);

    let (_, e) = parse(vec![
        t(LParen),
        t(KwUnsigned),
        t(KwChar),
        t(RParen),
        int(-1),
    ]);
    assert_eq!(e.ty, Type::uchar());
    assert_eq!(e.ival, 255);
}

#[test]
fn test_constant_expression_wrappers() {
    use adder64::expr;

    // A constant expression without code passes the wrapper.
    let mut ctx = ctx_for(vec![int(6), t(Star), int(7)]);
    let e = expr::no_code_const_abs_int_expr(&mut ctx, expr::hie1);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ival, 42);

    // A variable does not.
    let mut ctx = ctx_for(vec![ident("a"), t(Plus), int(1)]);
    let e = expr::no_code_const_abs_int_expr(&mut ctx, expr::hie1);
    assert!(ctx.diags.has_errors());
    assert_eq!(e.ival, 1);

    // An object address is constant but not an absolute int.
    let mut ctx = ctx_for(vec![t(Amp), ident("a")]);
    let e = expr::no_code_const_expr(&mut ctx, expr::hie1);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_const_addr());

    let mut ctx = ctx_for(vec![t(Amp), ident("a")]);
    let _ = expr::no_code_const_abs_int_expr(&mut ctx, expr::hie1);
    assert!(ctx.diags.has_errors());
}
