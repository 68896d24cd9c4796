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

//! The comparison strata: equality and relational operators.
//!
//! Comparisons check pointer/integer class compatibility, fold constant
//! operands with the proper signedness, decide object-address against
//! null-pointer comparisons statically, specialise char-sized compares,
//! and rewrite unsigned comparisons against 0/1 into plain zero tests.
//! The result is always of type bool with the condition codes set.

use crate::codegen::emit::EmitHelpers;
use crate::codegen::{type_code_of, CodeFlags};
use crate::error::ErrorCode;
use crate::expr::binary::{find_gen, g_eq, g_ge, g_gt, g_le, g_lt, g_ne, GenDesc, GenFlags, GenFunc};
use crate::expr::desc::ExprDesc;
use crate::expr::load::load_expr;
use crate::expr::{
    expr_with_check, hie7, marked_expr_with_check, warn_const_compare_result, Context, ExprFn,
};
use crate::token::TokenKind;
use crate::types::{type_cmp, Type, TypeCmp};

/// Fold a constant comparison. Both operands are numeric constants; the
/// comparison is signed only if both operand types are signed.
fn fold_compare(ctx: &mut Context, tok: TokenKind, expr: &mut ExprDesc, expr2: &ExprDesc) {
    let result = if expr.ty.is_class_int()
        && expr.ty.is_signed()
        && expr2.ty.is_class_int()
        && expr2.ty.is_signed()
    {
        let v1 = expr.ival;
        let v2 = expr2.ival;
        match tok {
            TokenKind::Eq => v1 == v2,
            TokenKind::Ne => v1 != v2,
            TokenKind::Lt => v1 < v2,
            TokenKind::Le => v1 <= v2,
            TokenKind::Ge => v1 >= v2,
            TokenKind::Gt => v1 > v2,
            _ => ctx.internal("Unexpected token in comparison"),
        }
    } else {
        let v1 = expr.ival as u64;
        let v2 = expr2.ival as u64;
        match tok {
            TokenKind::Eq => v1 == v2,
            TokenKind::Ne => v1 != v2,
            TokenKind::Lt => v1 < v2,
            TokenKind::Le => v1 <= v2,
            TokenKind::Ge => v1 >= v2,
            TokenKind::Gt => v1 > v2,
            _ => ctx.internal("Unexpected token in comparison"),
        }
    };
    expr.make_const_bool(result as i64);
}

/// The shared helper for both comparison strata.
pub(crate) fn hie_compare(
    ctx: &mut Context,
    ops: &'static [GenDesc],
    expr: &mut ExprDesc,
    hienext: ExprFn,
) {
    expr_with_check(ctx, hienext, expr);

    while let Some(gen) = find_gen(ctx.toks.cur_kind(), ops) {
        let gen = *gen;
        let mut expr2 = expr.sub_expr();
        let mut gen_func: GenFunc = gen.func;

        // Remember the operator token, then skip it.
        let tok = ctx.toks.cur_kind();
        ctx.toks.advance();

        // A function on either side compares as a pointer to function.
        if expr.ty.is_func() {
            expr.ty = expr.ty.clone().ptr_to();
        }

        // Get the lhs on the stack.
        let mark1 = ctx.cg.get_code_pos();
        let mut ltype = type_code_of(&expr.ty);
        let lconst = expr.is_const_abs();
        if !lconst {
            load_expr(ctx, CodeFlags::NONE, expr);
        }
        let mark2 = ctx.cg.get_code_pos();
        if lconst {
            ctx.cg.push(ltype | CodeFlags::CONST, expr.ival);
        } else {
            ctx.cg.push(ltype, 0);
        }

        // Get the right hand side.
        marked_expr_with_check(ctx, hienext, &mut expr2);

        if expr2.ty.is_func() {
            expr2.ty = expr2.ty.clone().ptr_to();
        }

        let rconst = expr2.is_const_abs() && expr2.code_range_is_empty(&ctx.cg);
        if !rconst {
            load_expr(ctx, CodeFlags::NONE, &mut expr2);
        }

        // Check that the operand types can be compared at all.
        if !expr.ty.is_relation_type() || !expr2.ty.is_relation_type() {
            ctx.error(
                ErrorCode::IncompatibleTypes,
                format!("Comparing types '{}' with '{}' is invalid", expr.ty, expr2.ty),
            );
            expr.make_const_abs_int(0);
            expr2.make_const_abs_int(0);
        }

        // Ordering comparisons are not defined for function pointers.
        if gen.flags.contains(GenFlags::NOFUNC)
            && (expr.ty.is_func_ptr() || expr2.ty.is_func_ptr())
        {
            ctx.error(
                ErrorCode::ComparingFunctionPointers,
                "Cannot use function pointers in this relation operation",
            );
            expr.make_const_abs_int(0);
            expr2.make_const_abs_int(0);
        }

        // Diagnose mixed-class and incompatible-pointer comparisons.
        if expr.ty.is_class_int() {
            if !expr2.ty.is_class_int() && !expr.is_null_ptr() {
                if expr2.ty.is_class_ptr() {
                    ctx.warning(format!(
                        "Comparing integer '{}' with pointer '{}'",
                        expr.ty, expr2.ty
                    ));
                } else {
                    ctx.error(
                        ErrorCode::IncompatibleTypes,
                        format!(
                            "Comparing types '{}' with '{}' is invalid",
                            expr.ty, expr2.ty
                        ),
                    );
                }
            }
        } else if expr.ty.is_class_ptr() {
            if expr2.ty.is_class_ptr() {
                // Both sides pointers: they must point to compatible types
                // unless one is a void pointer.
                let left = expr.ty.indirect();
                let right = expr2.ty.indirect();
                if type_cmp(&left, &right) < TypeCmp::QualDiff
                    && !left.is_void()
                    && !right.is_void()
                {
                    ctx.warning(format!(
                        "Incompatible pointer types comparing '{}' with '{}'",
                        expr.ty, expr2.ty
                    ));
                }
            } else if !expr2.is_null_ptr() {
                if expr2.ty.is_class_int() {
                    ctx.warning(format!(
                        "Comparing pointer type '{}' with integer type '{}'",
                        expr.ty, expr2.ty
                    ));
                } else {
                    ctx.error(
                        ErrorCode::IncompatibleTypes,
                        format!(
                            "Comparing types '{}' with '{}' is invalid",
                            expr.ty, expr2.ty
                        ),
                    );
                }
            }
        }

        'done: {
            if expr.is_const_abs() && rconst {
                // Both operands constant: remove the code and fold.
                ctx.cg.remove_code(&mark1);
                fold_compare(ctx, tok, expr, &expr2);
                warn_const_compare_result(ctx, expr);
                break 'done;
            }

            if expr2.code_range_is_empty(&ctx.cg)
                && ((expr.is_addr_expr() && expr2.is_null_ptr())
                    || (expr.is_null_ptr() && expr2.is_addr_expr()))
            {
                // An object address compared against a null pointer is
                // decided statically: never equal, and the address orders
                // strictly greater.
                let mut result = tok != TokenKind::Eq;
                if expr2.is_null_ptr() {
                    if tok == TokenKind::Lt || tok == TokenKind::Le {
                        result = false;
                    }
                } else if tok == TokenKind::Gt || tok == TokenKind::Ge {
                    result = false;
                }
                expr.make_const_bool(result as i64);
                warn_const_compare_result(ctx, expr);

                // Both operands are static; the generated code can go.
                ctx.cg.remove_code(&mark1);
                break 'done;
            }

            // Determine the signedness of the operands.
            let left_signed = expr.ty.is_signed();
            let right_signed = expr2.ty.is_signed();

            let mut flags = CodeFlags::NONE;
            if rconst {
                flags |= CodeFlags::CONST;
                if gen.flags.contains(GenFlags::NOPUSH) {
                    // The generator compares the primary directly against
                    // the constant; drop the push.
                    ctx.cg.remove_code(&mark2);
                    ltype |= CodeFlags::PRIMARY;
                }
            }

            if expr.ty.is_char_type() && rconst && (!left_signed || right_signed) {
                // A char compared against a constant: if the constant is
                // outside the char's value range, the result is already
                // known.
                let (left_min, left_max) = if left_signed { (-128, 127) } else { (0, 255) };
                let v2 = expr2.ival;

                let decided = match tok {
                    TokenKind::Eq if v2 < left_min || v2 > left_max => Some(false),
                    TokenKind::Ne if v2 < left_min || v2 > left_max => Some(true),
                    TokenKind::Lt if v2 <= left_min || v2 > left_max => Some(v2 > left_max),
                    TokenKind::Le if v2 < left_min || v2 >= left_max => Some(v2 >= left_max),
                    TokenKind::Ge if v2 <= left_min || v2 > left_max => Some(v2 <= left_min),
                    TokenKind::Gt if v2 < left_min || v2 >= left_max => Some(v2 < left_min),
                    _ => None,
                };
                if let Some(result) = decided {
                    // The lhs value load and push were emitted after the
                    // operand itself was parsed, so they can be rolled
                    // back without losing side effects.
                    ctx.cg.remove_code(&mark1);
                    expr.make_const_bool(result as i64);
                    warn_const_compare_result(ctx, expr);
                    break 'done;
                }

                // The constant is in range; compare as chars.
                flags |= CodeFlags::CHAR | CodeFlags::FORCECHAR;
                if !left_signed || !right_signed {
                    flags |= CodeFlags::UNSIGNED;
                }
            } else if expr.ty.is_char_type()
                && expr2.ty.is_char_type()
                && expr.ty.is_signed() == expr2.ty.is_signed()
            {
                // Both sides are chars of the same signedness; the
                // comparison can stay byte sized.
                flags |= CodeFlags::CHAR;
                if rconst {
                    flags |= CodeFlags::FORCECHAR;
                }
                if !left_signed || !right_signed {
                    flags |= CodeFlags::UNSIGNED;
                }
            } else {
                let rtype = type_code_of(&expr2.ty) | (flags & CodeFlags::CONST);
                flags |= ctx.cg.typeadjust(ltype, rtype);
            }

            // Unsigned comparisons against 0 and 1 simplify to plain
            // zero/non-zero tests.
            if (!left_signed || !right_signed) && rconst {
                match tok {
                    TokenKind::Lt if expr2.ival == 1 => {
                        // Unsigned < 1 means the value is zero.
                        gen_func = g_eq;
                        expr2.ival = 0;
                    }
                    TokenKind::Le if expr2.ival == 0 => {
                        gen_func = g_eq;
                    }
                    TokenKind::Ge if expr2.ival == 1 => {
                        // Unsigned >= 1 means the value is not zero.
                        gen_func = g_ne;
                        expr2.ival = 0;
                    }
                    TokenKind::Gt if expr2.ival == 0 => {
                        gen_func = g_ne;
                    }
                    _ => {}
                }
            }

            gen_func(&mut ctx.cg, flags, expr2.ival);

            // The boolean result is in the primary and the condition codes
            // reflect it.
            expr.finalize_rval_load();
            expr.test_done();
        }

        // The result of a comparison is always bool.
        expr.ty = Type::bool_();
    }
}

/// Process the equality operators `==` and `!=`.
pub fn hie5(ctx: &mut Context, expr: &mut ExprDesc) {
    static HIE5_OPS: &[GenDesc] = &[
        GenDesc {
            tok: TokenKind::Eq,
            flags: GenFlags::NOPUSH,
            func: g_eq,
        },
        GenDesc {
            tok: TokenKind::Ne,
            flags: GenFlags::NOPUSH,
            func: g_ne,
        },
    ];
    hie_compare(ctx, HIE5_OPS, expr, hie6);
}

/// Process the relational operators `<`, `<=`, `>=` and `>`.
pub fn hie6(ctx: &mut Context, expr: &mut ExprDesc) {
    static HIE6_OPS: &[GenDesc] = &[
        GenDesc {
            tok: TokenKind::Lt,
            flags: GenFlags::NOPUSH.union(GenFlags::NOFUNC),
            func: g_lt,
        },
        GenDesc {
            tok: TokenKind::Le,
            flags: GenFlags::NOPUSH.union(GenFlags::NOFUNC),
            func: g_le,
        },
        GenDesc {
            tok: TokenKind::Ge,
            flags: GenFlags::NOPUSH.union(GenFlags::NOFUNC),
            func: g_ge,
        },
        GenDesc {
            tok: TokenKind::Gt,
            flags: GenFlags::NOPUSH.union(GenFlags::NOFUNC),
            func: g_gt,
        },
    ];
    hie_compare(ctx, HIE6_OPS, expr, hie7);
}
