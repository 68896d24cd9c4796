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

//! Short-circuit evaluation, the preprocessor folding mode, and the
//! ternary operator.

mod common;

use adder64::config::Config;
use adder64::expr::{self, ExprDesc, Loc};
use adder64::token::TokenKind::*;
use adder64::types::Type;
use common::*;

#[test]
fn test_constant_and_or_fold() {
    let (ctx, e) = parse(vec![int(1), t(BoolAnd), int(2)]);
    assert_eq!(e.ival, 1);
    assert_eq!(e.ty, Type::bool_());
    assert_eq!(ctx.cg.line_count(), 0);

    let (_, e) = parse(vec![int(0), t(BoolOr), int(0)]);
    assert_eq!(e.ival, 0);

    let (_, e) = parse(vec![int(0), t(BoolOr), int(3)]);
    assert_eq!(e.ival, 1);
}

#[test]
fn test_true_or_short_circuits_rhs() {
    // 1 || f(): the call must not be present in the emitted code.
    let (ctx, e) = parse(vec![int(1), t(BoolOr), ident("f"), t(LParen), t(RParen)]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ival, 1);
    assert_eq!(ctx.cg.line_count(), 0);
}

#[test]
fn test_object_address_is_boolean_true() {
    // &a && 1 folds: an object address is never null.
    let (_, e) = parse(vec![t(Amp), ident("a"), t(BoolAnd), int(1)]);
    assert_eq!(e.ival, 1);
    assert_eq!(e.ty, Type::bool_());
}

#[test]
fn test_runtime_and_emits_false_jump_and_materialises_bool() {
    // a && b needs a conditional jump and the 0/1 materialisation.
    let (ctx, e) = parse(vec![ident("a"), t(BoolAnd), ident("b")]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ty, Type::bool_());
    assert_eq!(e.loc, Loc::Primary);
    assert!(e.is_tested());
    assert!(ctx.cg.lines().iter().any(|l| l.starts_with("jeq L")));
    // Both the false (0) and true (1) loads are present.
    assert!(has_line(&ctx, "lda #$00"));
    assert!(has_line(&ctx, "lda #$01"));
}

#[test]
fn test_runtime_or_uses_true_jump() {
    let (ctx, _) = parse(vec![ident("a"), t(BoolOr), ident("b")]);
    assert!(ctx.cg.lines().iter().any(|l| l.starts_with("jne L")));
}

#[test]
fn test_preprocessor_mode_folds_symbolically() {
    // In #if mode unknown identifiers read as 0 and no code is emitted.
    let mut config = Config::default();
    config.preprocessing = true;
    let mut ctx = ctx_with_config(
        vec![ident("UNDEFINED_MACRO"), t(BoolOr), int(2)],
        config,
    );
    let mut e = ExprDesc::new();
    expr::expr_with_check(&mut ctx, expr::hie1, &mut e);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ival, 1);
    assert_eq!(ctx.cg.line_count(), 0);
}

#[test]
fn test_ternary_with_true_constant_condition() {
    // 1 ? a : b evaluates only a; the code for b is rolled back.
    let (ctx, e) = parse(vec![
        int(1),
        t(Quest),
        ident("a"),
        t(Colon),
        ident("b"),
    ]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ty, Type::int());
    assert!(has_line(&ctx, "lda _a"));
    assert!(!has_line(&ctx, "lda _b"));
    // No branches for a constant condition.
    assert!(!ctx.cg.lines().iter().any(|l| l.starts_with("jeq")));
}

#[test]
fn test_ternary_with_false_constant_condition() {
    let (ctx, _) = parse(vec![
        int(0),
        t(Quest),
        ident("a"),
        t(Colon),
        ident("b"),
    ]);
    assert!(!has_line(&ctx, "lda _a"));
    assert!(has_line(&ctx, "lda _b"));
}

#[test]
fn test_constant_ternary_takes_branch_descriptor_verbatim() {
    let (ctx, e) = parse(vec![int(1), t(Quest), int(7), t(Colon), int(9)]);
    assert!(e.is_const_abs_int());
    assert_eq!(e.ival, 7);
    assert_eq!(ctx.cg.line_count(), 0);
}

#[test]
fn test_runtime_ternary_emits_both_branches_with_labels() {
    let (ctx, e) = parse(vec![
        ident("a"),
        t(Quest),
        int(1),
        t(Colon),
        int(2),
    ]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ty, Type::int());
    assert_eq!(e.loc, Loc::Primary);
    assert!(ctx.cg.lines().iter().any(|l| l.starts_with("jeq L")));
    assert!(ctx.cg.lines().iter().any(|l| l.starts_with("jmp L")));
    assert!(has_line(&ctx, "lda #$01"));
    assert!(has_line(&ctx, "lda #$02"));
}

#[test]
fn test_ternary_pointer_and_null_yields_pointer_type() {
    let (ctx, e) = parse(vec![
        ident("a"),
        t(Quest),
        ident("p"),
        t(Colon),
        int(0),
    ]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ty, Type::int().ptr_to());
}

#[test]
fn test_ternary_incompatible_pointers_error() {
    // a ? p : &c mixes int* and char*.
    let (ctx, _) = parse(vec![
        ident("a"),
        t(Quest),
        ident("p"),
        t(Colon),
        t(Amp),
        ident("c"),
    ]);
    assert!(ctx.diags.has_errors());
}

#[test]
fn test_ternary_int_branches_use_arithmetic_conversion() {
    // a ? c : 70000L: the result type is long.
    let (ctx, e) = parse(vec![
        ident("a"),
        t(Quest),
        ident("c"),
        t(Colon),
        adder64::token::Token::int_typed(70000, Type::long()),
    ]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.ty, Type::long());
}
