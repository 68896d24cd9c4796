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

//! End-to-end checks of descriptor and emitted code for small token
//! streams covering the core behaviours: constant folding, pointer
//! scaling, chained assignment, deferred post-increment, sizeof,
//! short-circuiting and comparison peepholes.

mod common;

use adder64::expr::{deferred, Loc};
use adder64::token::TokenKind::*;
use adder64::types::Type;
use common::*;

#[test]
fn test_constant_expression_folds_to_23_with_no_code() {
    // 3 + 4 * 5
    let (ctx, e) = parse(vec![int(3), t(Plus), int(4), t(Star), int(5)]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_const_abs_int());
    assert_eq!(e.ty, Type::int());
    assert_eq!(e.ival, 23);
    assert_eq!(ctx.cg.line_count(), 0);
}

#[test]
fn test_variable_plus_constant_loads_and_adds_immediate() {
    // a + 1
    let (ctx, e) = parse(vec![ident("a"), t(Plus), int(1)]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_rval());
    assert_eq!(e.loc, Loc::Primary);
    assert_eq!(e.ty, Type::int());
    // The variable is loaded and the constant added in place; the stack
    // push was patched out.
    assert!(has_line(&ctx, "lda _a"));
    assert!(has_line(&ctx, "adc #$01"));
    assert!(!has_line(&ctx, "jsr pushax"));
}

#[test]
fn test_pointer_plus_constant_scales_by_element_size() {
    // p + 2 adds 4 = 2 * sizeof(int)
    let (ctx, e) = parse(vec![ident("p"), t(Plus), int(2)]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_rval());
    assert_eq!(e.loc, Loc::Primary);
    assert_eq!(e.ty, Type::int().ptr_to());
    assert!(has_line(&ctx, "lda _p"));
    assert!(has_line(&ctx, "adc #$04"));
}

#[test]
fn test_chained_assignment_stores_right_to_left() {
    // a = b = 3
    let (ctx, e) = parse(vec![ident("a"), t(Assign), ident("b"), t(Assign), int(3)]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_rval());
    assert_eq!(e.ty, Type::int());
    let store_b = line_index(&ctx, "sta _b").expect("store to b");
    let store_a = line_index(&ctx, "sta _a").expect("store to a");
    assert!(store_b < store_a, "b must be stored before a");
}

#[test]
fn test_double_post_increment_defers_past_use() {
    // a++ + a++ evaluated as a full statement: the value is computed from
    // the original a, both increments fire afterwards.
    let (ctx, e) = evaluate(vec![
        ident("a"),
        t(Inc),
        t(Plus),
        ident("a"),
        t(Inc),
    ]);
    assert!(!ctx.diags.has_errors());
    assert_eq!(e.loc, Loc::Primary);
    assert_eq!(deferred::get_deferred_op_count(&ctx), 0);

    // Two in-memory increments of a, both after the add that uses the
    // values.
    assert_eq!(count_lines(&ctx, "inc _a"), 2);
    let add = line_index(&ctx, "jsr tosaddax").expect("runtime add");
    let first_inc = line_index(&ctx, "inc _a").unwrap();
    assert!(add < first_inc, "increments must fire after the use");
}

#[test]
fn test_sizeof_is_constant_and_emits_no_code() {
    // sizeof(int) + sizeof a == 2 + 2
    let (ctx, e) = parse(vec![
        t(Sizeof),
        t(LParen),
        t(KwInt),
        t(RParen),
        t(Plus),
        t(Sizeof),
        ident("a"),
    ]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_const_abs_int());
    assert_eq!(e.ty, Type::size_t());
    assert_eq!(e.ival, 4);
    assert_eq!(ctx.cg.line_count(), 0);
}

#[test]
fn test_true_and_assignment_keeps_effect_without_branch() {
    // 1 && (a = 5): the assignment happens, the result is the constant
    // true, and no branches are emitted.
    let (ctx, e) = parse(vec![
        int(1),
        t(BoolAnd),
        t(LParen),
        ident("a"),
        t(Assign),
        int(5),
        t(RParen),
    ]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_const_abs());
    assert_eq!(e.ty, Type::bool_());
    assert_eq!(e.ival, 1);
    assert!(has_line(&ctx, "sta _a"));
    assert!(!ctx.cg.lines().iter().any(|l| l.starts_with("jeq")));
    assert!(!ctx.cg.lines().iter().any(|l| l.starts_with("jne")));
}

#[test]
fn test_false_and_call_short_circuits_to_empty_code() {
    // 0 && f(): f is parsed but never present in the emitted code.
    let (ctx, e) = parse(vec![
        int(0),
        t(BoolAnd),
        ident("f"),
        t(LParen),
        t(RParen),
    ]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_const_abs());
    assert_eq!(e.ty, Type::bool_());
    assert_eq!(e.ival, 0);
    assert_eq!(ctx.cg.line_count(), 0);
    assert!(!has_line(&ctx, "jsr _f"));
}

#[test]
fn test_unsigned_char_compare_against_out_of_range_constant() {
    // u < 256 where u is unsigned char: always true, warned, no code.
    let (ctx, e) = parse(vec![ident("u"), t(Lt), int(256)]);
    assert!(!ctx.diags.has_errors());
    assert!(e.is_const_abs());
    assert_eq!(e.ty, Type::bool_());
    assert_eq!(e.ival, 1);
    assert_eq!(ctx.cg.line_count(), 0);
    assert!(ctx
        .diags
        .warnings()
        .any(|w| w.contains("always true")));
}
