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

//! Short-circuit `&&`/`||` and the ternary operator.
//!
//! A constant condition short-circuits at compile time: the remaining
//! operands are still parsed, but in unevaluated mode, and any code they
//! emit is rolled back. At runtime the operators evaluate left to right
//! with conditional jumps to shared labels, materialising 0 or 1 at the
//! end. The preprocessor variants fold purely symbolically.

use crate::codegen::emit::EmitHelpers;
use crate::codegen::CodeFlags;
use crate::error::ErrorCode;
use crate::expr::deferred::{do_deferred, SeqPoint};
use crate::expr::desc::ExprDesc;
use crate::expr::load::load_expr;
use crate::expr::typeconv::type_conversion;
use crate::expr::{
    assign, expr_with_check, hie2, no_code_const_abs_int_expr, Context,
};
use crate::token::TokenKind;
use crate::types::{arithmetic_convert, type_cmp, Type, TypeCmp};

/// Process `exp && exp`; only called from [`hie_or`]. Returns true if a
/// logical and was present. `true_lab`/`has_true_jump` belong to the
/// enclosing or-expression.
fn hie_and(
    ctx: &mut Context,
    expr: &mut ExprDesc,
    true_lab: &mut u32,
    true_lab_allocated: &mut bool,
) -> bool {
    let keep_flags = expr.keep_subexpr_flags();
    let mut uneval = expr.is_uneval();
    let mut has_true_jump = false;
    let mut false_lab: Option<u32> = None;

    // Get the left hand side.
    let start = ctx.cg.get_code_pos();
    expr_with_check(ctx, hie2, expr);
    if uneval {
        ctx.cg.remove_code(&start);
    }

    if !ctx.toks.check(TokenKind::BoolAnd) {
        return false;
    }

    if !expr.is_bool() {
        ctx.error(
            ErrorCode::ScalarExpressionExpected,
            "Scalar expression expected",
        );
        expr.make_const_bool(0);
    } else if !uneval {
        if !expr.is_const_bool() {
            // Load and test the left side, then jump out if it is false.
            expr.require_test();
            load_expr(ctx, CodeFlags::FORCECHAR, expr);
            do_deferred(ctx, SeqPoint::KEEP_TEST, expr);
            expr.require_no_test();

            let lab = *false_lab.get_or_insert_with(|| ctx.cg.get_local_label());
            ctx.cg.false_jump(CodeFlags::NONE, lab);
        } else {
            // Constant boolean: only its deferred side effects matter at
            // this sequence point.
            do_deferred(ctx, SeqPoint::KEEP_NONE, expr);

            if expr.ival == 0 && !expr.is_addr_expr() {
                // False short-circuits everything that follows.
                uneval = true;
            }
        }
    }

    // Parse further operands.
    let mut expr2 = ExprDesc::new();
    while ctx.toks.check(TokenKind::BoolAnd) {
        expr2 = ExprDesc::new();
        expr2.flags = keep_flags;
        if uneval {
            expr2.mark_for_uneval();
        }

        // Skip the operator.
        ctx.toks.advance();

        let start = ctx.cg.get_code_pos();
        hie2(ctx, &mut expr2);
        if uneval {
            ctx.cg.remove_code(&start);
        }

        if !expr2.is_bool() {
            ctx.error(
                ErrorCode::ScalarExpressionExpected,
                "Scalar expression expected",
            );
            expr2.make_const_bool(0);
        } else if !uneval {
            if !expr2.is_const_bool() {
                expr2.require_test();
                load_expr(ctx, CodeFlags::FORCECHAR, &mut expr2);
                do_deferred(ctx, SeqPoint::KEEP_TEST, &expr2);

                if ctx.toks.check(TokenKind::BoolAnd) {
                    let lab = *false_lab.get_or_insert_with(|| ctx.cg.get_local_label());
                    ctx.cg.false_jump(CodeFlags::NONE, lab);
                } else {
                    // The last operand needs the true label instead.
                    has_true_jump = true;
                }
            } else {
                do_deferred(ctx, SeqPoint::KEEP_NONE, &expr2);

                if expr2.ival == 0 && !expr2.is_addr_expr() {
                    uneval = true;
                    // The value of the whole expression is false.
                    expr.make_const_bool(0);
                }
            }
        }
    }

    // Materialise the last expression.
    if !uneval && (false_lab.is_some() || has_true_jump) {
        if !*true_lab_allocated {
            // The label that the whole or-expression uses for true
            // results.
            *true_lab = ctx.cg.get_local_label();
            *true_lab_allocated = true;
        }
        if !expr2.is_const_abs() {
            // Branch to true, fall through to false.
            ctx.cg.true_jump(CodeFlags::NONE, *true_lab);
        } else {
            ctx.cg.jump(*true_lab);
        }
        expr.finalize_rval_load();
        expr.test_done();
    }

    if let Some(lab) = false_lab {
        ctx.cg.def_code_label(lab);
    }

    // Convert the result to bool.
    if (expr.is_const_abs() && expr.ival != 0) || expr.is_addr_expr() {
        expr.make_const_bool(1);
    } else {
        expr.ty = Type::bool_();
    }

    true
}

/// Process `exp || exp`.
pub fn hie_or(ctx: &mut Context, expr: &mut ExprDesc) {
    let keep_flags = expr.keep_subexpr_flags();
    let mut uneval = expr.is_uneval();
    let mut true_lab = 0u32;
    let mut has_true_jump = false;

    // Call the next level parser.
    let start = ctx.cg.get_code_pos();
    let mut and_op = hie_and(ctx, expr, &mut true_lab, &mut has_true_jump);
    if uneval {
        ctx.cg.remove_code(&start);
    }

    if ctx.toks.check(TokenKind::BoolOr) {
        if !expr.is_bool() {
            ctx.error(
                ErrorCode::ScalarExpressionExpected,
                "Scalar expression expected",
            );
            expr.make_const_bool(0);
        } else if !uneval {
            if !expr.is_const_bool() {
                // Test the lhs unless the and-level already left a jump in
                // place.
                if !and_op {
                    expr.require_test();
                    load_expr(ctx, CodeFlags::FORCECHAR, expr);
                    do_deferred(ctx, SeqPoint::KEEP_TEST, expr);
                    expr.require_no_test();

                    if !has_true_jump {
                        true_lab = ctx.cg.get_local_label();
                        has_true_jump = true;
                    }
                    ctx.cg.true_jump(CodeFlags::NONE, true_lab);
                }
            } else {
                do_deferred(ctx, SeqPoint::KEEP_NONE, expr);

                if expr.ival != 0 || expr.is_addr_expr() {
                    // True short-circuits everything that follows.
                    uneval = true;
                }
            }
        }

        while ctx.toks.check(TokenKind::BoolOr) {
            let mut expr2 = ExprDesc::new();
            expr2.flags = keep_flags;
            if uneval {
                expr2.mark_for_uneval();
            }

            // Skip the operator.
            ctx.toks.advance();

            let start = ctx.cg.get_code_pos();
            and_op = hie_and(ctx, &mut expr2, &mut true_lab, &mut has_true_jump);
            if uneval {
                ctx.cg.remove_code(&start);
            }

            if !expr2.is_bool() {
                ctx.error(
                    ErrorCode::ScalarExpressionExpected,
                    "Scalar expression expected",
                );
                expr2.make_const_bool(0);
            } else if !uneval {
                if !expr2.is_const_bool() {
                    if !and_op {
                        expr2.require_test();
                        load_expr(ctx, CodeFlags::FORCECHAR, &mut expr2);
                        do_deferred(ctx, SeqPoint::KEEP_TEST, &expr2);

                        if !has_true_jump {
                            true_lab = ctx.cg.get_local_label();
                            has_true_jump = true;
                        }
                        ctx.cg.true_jump(CodeFlags::NONE, true_lab);
                    }
                } else {
                    do_deferred(ctx, SeqPoint::KEEP_NONE, &expr2);

                    if expr2.ival != 0 || expr2.is_addr_expr() {
                        uneval = true;
                        // The result is always true then.
                        expr.make_const_bool(1);
                    }
                }
            }
        }

        // Convert the result to bool.
        if (expr.is_const_abs() && expr.ival != 0) || expr.is_addr_expr() {
            expr.make_const_bool(1);
        } else {
            expr.ty = Type::bool_();
        }
    }

    // If runtime jumps were emitted, materialise the boolean result.
    if has_true_jump {
        let done_lab = ctx.cg.get_local_label();
        if !uneval {
            // Load false; loading zero sets the zero flag, so the
            // following false-jump is effectively unconditional.
            ctx.cg.get_immed(CodeFlags::INT | CodeFlags::CONST, 0);
            ctx.cg.false_jump(CodeFlags::NONE, done_lab);
        }

        ctx.cg.def_code_label(true_lab);
        ctx.cg.get_immed(CodeFlags::INT | CodeFlags::CONST, 1);
        ctx.cg.def_code_label(done_lab);

        expr.finalize_rval_load();
        expr.test_done();
        expr.ty = Type::bool_();
    }
}

/// Process `exp && exp` in preprocessor mode: pure symbolic folding, no
/// code.
pub fn hie_and_pp(ctx: &mut Context, expr: &mut ExprDesc) {
    *expr = no_code_const_abs_int_expr(ctx, hie2);
    while ctx.toks.check(TokenKind::BoolAnd) {
        ctx.toks.advance();
        let expr2 = no_code_const_abs_int_expr(ctx, hie2);
        expr.ival = (expr.ival != 0 && expr2.ival != 0) as i64;
    }
}

/// Process `exp || exp` in preprocessor mode.
pub fn hie_or_pp(ctx: &mut Context, expr: &mut ExprDesc) {
    hie_and_pp(ctx, expr);
    while ctx.toks.check(TokenKind::BoolOr) {
        ctx.toks.advance();
        let mut expr2 = ExprDesc::new();
        hie_and_pp(ctx, &mut expr2);
        expr.ival = (expr.ival != 0 || expr2.ival != 0) as i64;
    }
}

/// Parse the ternary operator.
pub fn hie_quest(ctx: &mut Context, expr: &mut ExprDesc) {
    if ctx.config.preprocessing {
        expr_with_check(ctx, hie_or_pp, expr);
    } else {
        expr_with_check(ctx, hie_or, expr);
    }

    if !ctx.toks.check(TokenKind::Quest) {
        return;
    }

    let constant_cond = expr.is_const_bool();
    let mut expr2 = expr.sub_expr();
    let mut expr3 = expr.sub_expr();

    ctx.toks.advance();

    // A constant object address is simply true.
    if expr.is_addr_expr() {
        expr.make_const_bool(1);
    }

    let mut false_lab = None;
    let mut skipped_branch = None;
    let mut true_code_end = None;

    if !constant_cond {
        // Request a test and branch on the condition.
        expr.require_test();
        load_expr(ctx, CodeFlags::NONE, expr);
        do_deferred(ctx, SeqPoint::KEEP_TEST, expr);

        let lab = ctx.cg.get_local_label();
        false_lab = Some(lab);
        ctx.cg.false_jump(CodeFlags::NONE, lab);
    } else {
        // The condition may still carry deferred side effects.
        do_deferred(ctx, SeqPoint::KEEP_NONE, expr);

        if expr.ival == 0 {
            // The true branch will be discarded again.
            skipped_branch = Some(ctx.cg.get_code_pos());
        }
    }

    // Parse the second expression and load it unless the whole ternary is
    // decided and the branch is constant.
    expr_with_check(ctx, assign::hie1, &mut expr2);
    let expr2_is_null = expr2.is_null_ptr();
    if !expr2.ty.is_void() {
        if !constant_cond || !expr2.is_const() {
            load_expr(ctx, CodeFlags::NONE, &mut expr2);
            do_deferred(ctx, SeqPoint::KEEP_EXPR, &expr2);
            expr2.finalize_rval_load();
        } else {
            do_deferred(ctx, SeqPoint::KEEP_NONE, &expr2);
        }
        expr2.ty = expr2.ty.decayed();
    }

    let true_lab;
    if !constant_cond {
        // Jump around the evaluation of the third expression.
        true_code_end = Some(ctx.cg.get_code_pos());
        true_lab = ctx.cg.get_local_label();

        ctx.consume_colon();

        ctx.cg.jump(true_lab);
        if let Some(lab) = false_lab {
            ctx.cg.def_code_label(lab);
        }
    } else {
        true_lab = 0;
        if expr.ival == 0 {
            // The condition is false: drop the code of the true branch.
            if let Some(mark) = skipped_branch.take() {
                ctx.cg.remove_code(&mark);
            }
        } else {
            skipped_branch = Some(ctx.cg.get_code_pos());
        }
        ctx.consume_colon();
    }

    // Parse the third expression.
    expr_with_check(ctx, assign::hie1, &mut expr3);
    let expr3_is_null = expr3.is_null_ptr();
    if !expr3.ty.is_void() {
        if !constant_cond || !expr3.is_const() {
            load_expr(ctx, CodeFlags::NONE, &mut expr3);
            do_deferred(ctx, SeqPoint::KEEP_EXPR, &expr3);
            expr3.finalize_rval_load();
        } else {
            do_deferred(ctx, SeqPoint::KEEP_NONE, &expr3);
        }
        expr3.ty = expr3.ty.decayed();
    }

    if constant_cond && expr.ival != 0 {
        // The condition is true: drop the code of the false branch.
        if let Some(mark) = skipped_branch.take() {
            ctx.cg.remove_code(&mark);
        }
    }

    // Determine the result type:
    //   - int and int: usual arithmetic conversion
    //   - compatible pointers: that pointer type
    //   - pointer and null pointer constant: the pointer type
    //   - void and void: void
    //   - identical records: that record type
    //   - anything else is an error
    let result_type;
    if expr2.ty.is_class_int() && expr3.ty.is_class_int() {
        result_type = arithmetic_convert(&expr2.ty, &expr3.ty);

        if !constant_cond {
            // Convert the third expression in place.
            type_conversion(ctx, &mut expr3, &result_type);

            // Conversion code for the second expression is emitted here
            // but belongs at the end of the true branch; move it there so
            // control flow stays correct.
            let cvt_start = ctx.cg.get_code_pos();
            type_conversion(ctx, &mut expr2, &result_type);
            let cvt_end = ctx.cg.get_code_pos();
            if !ctx.cg.code_range_is_empty(&cvt_start, &cvt_end) {
                if let Some(target) = &true_code_end {
                    ctx.cg.move_code(&cvt_start, &cvt_end, target);
                }
            }
        } else {
            // Only the selected branch still has live code; the discarded
            // one is just retyped.
            let (taken, dropped) = if expr.ival != 0 {
                (&mut expr2, &mut expr3)
            } else {
                (&mut expr3, &mut expr2)
            };
            type_conversion(ctx, taken, &result_type);
            if dropped.is_const_abs() {
                type_conversion(ctx, dropped, &result_type);
            } else {
                dropped.ty = result_type.clone();
            }
        }
    } else if expr2.ty.is_class_ptr() && expr3.ty.is_class_ptr() {
        // Both branches must point to compatible types.
        if type_cmp(&expr2.ty.indirect(), &expr3.ty.indirect()) < TypeCmp::Equal {
            ctx.error(
                ErrorCode::IncompatiblePointerTypes,
                "Incompatible pointer types",
            );
        }
        result_type = expr2.ty.clone();
    } else if expr2.ty.is_class_ptr() && expr3_is_null {
        result_type = expr2.ty.clone();
    } else if expr2_is_null && expr3.ty.is_class_ptr() {
        result_type = expr3.ty.clone();
    } else if expr2.ty.is_void() && expr3.ty.is_void() {
        result_type = expr3.ty.clone();
    } else if expr2.ty.is_record()
        && expr3.ty.is_record()
        && type_cmp(&expr2.ty, &expr3.ty) == TypeCmp::Identical
    {
        result_type = expr2.ty.clone();
    } else {
        ctx.error(
            ErrorCode::IncompatibleTypes,
            format!(
                "Incompatible types in ternary '{}' with '{}'",
                expr2.ty, expr3.ty
            ),
        );
        result_type = expr2.ty.clone();
    }

    if !constant_cond {
        // Define the final label and finish up.
        ctx.cg.def_code_label(true_lab);
        expr.finalize_rval_load();
    } else if expr.ival != 0 {
        // Take the selected branch's descriptor verbatim.
        *expr = expr2;
    } else {
        *expr = expr3;
    }

    expr.ty = result_type;
}
