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

//! Binary operator strata.
//!
//! The commutative/associative integer operators (`* / %`, `&`, `^`, `|`)
//! share one dispatcher driven by small generator tables; shifts and the
//! additive operators (which must handle pointer arithmetic) have bespoke
//! code. Constant operands fold at compile time with bit-exact two's
//! complement results at the converted type's width.

use bitflags::bitflags;

use crate::codegen::emit::EmitHelpers;
use crate::codegen::{type_code_of, CodeFlags, Codegen};
use crate::error::ErrorCode;
use crate::expr::desc::ExprDesc;
use crate::expr::load::load_expr;
use crate::expr::unary::hie10;
use crate::expr::{
    checked_psize_of, expr_with_check, global_mode_flags, limit_expr_value, marked_expr_with_check,
    typeadjust, Context, ExprFn,
};
use crate::token::TokenKind;
use crate::types::arithmetic_convert;

bitflags! {
    /// Attributes of a generator table entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GenFlags: u8 {
        /// The generator can consume the left operand directly from the
        /// primary register when the right operand is constant; the push
        /// of the left side is patched out then.
        const NOPUSH = 1 << 0;
        /// The operation is commutative, so a constant left operand may
        /// swap sides instead of being pushed.
        const COMM   = 1 << 1;
        /// The operation is not defined for function pointers.
        const NOFUNC = 1 << 2;
    }
}

/// An emitter operation usable from a generator table.
pub type GenFunc = fn(&mut Codegen, CodeFlags, i64);

/// A generator table entry: token, attributes, emitter operation.
#[derive(Clone, Copy)]
pub struct GenDesc {
    pub tok: TokenKind,
    pub flags: GenFlags,
    pub func: GenFunc,
}

// Free-function shims so the emitter operations fit the table type.
pub fn g_add(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.add(flags, val);
}
pub fn g_sub(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.sub(flags, val);
}
pub fn g_mul(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.mul(flags, val);
}
pub fn g_div(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.div(flags, val);
}
pub fn g_mod(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.modulo(flags, val);
}
pub fn g_and(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.and(flags, val);
}
pub fn g_or(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.or(flags, val);
}
pub fn g_xor(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.xor(flags, val);
}
pub fn g_asl(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.asl(flags, val);
}
pub fn g_asr(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.asr(flags, val);
}
pub fn g_eq(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.eq(flags, val);
}
pub fn g_ne(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.ne(flags, val);
}
pub fn g_lt(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.lt(flags, val);
}
pub fn g_le(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.le(flags, val);
}
pub fn g_gt(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.gt(flags, val);
}
pub fn g_ge(cg: &mut Codegen, flags: CodeFlags, val: i64) {
    cg.ge(flags, val);
}

/// Find a token in a generator table. Tables are short (at most four
/// entries), so a linear scan is fine; the first match wins.
pub fn find_gen(tok: TokenKind, table: &'static [GenDesc]) -> Option<&'static GenDesc> {
    table.iter().find(|gen| gen.tok == tok)
}

/// Fold a constant integer binary operation with the signedness of the
/// converted result type.
fn fold_binary(ctx: &mut Context, tok: TokenKind, expr: &mut ExprDesc, expr2: &ExprDesc) {
    if expr.ty.is_signed() {
        let v1 = expr.ival;
        let v2 = expr2.ival;
        expr.ival = match tok {
            TokenKind::Pipe => v1 | v2,
            TokenKind::Xor => v1 ^ v2,
            TokenKind::Amp => v1 & v2,
            TokenKind::Star => v1.wrapping_mul(v2),
            TokenKind::Div => {
                if v2 == 0 {
                    ctx.error(ErrorCode::DivisionByZero, "Division by zero");
                    0x7FFF_FFFF
                } else {
                    v1.wrapping_div(v2)
                }
            }
            TokenKind::Mod => {
                if v2 == 0 {
                    ctx.error(ErrorCode::ModuloByZero, "Modulo operation with zero");
                    0
                } else {
                    v1.wrapping_rem(v2)
                }
            }
            _ => ctx.internal("Unexpected token in binary dispatcher"),
        };
    } else {
        let v1 = expr.ival as u64;
        let v2 = expr2.ival as u64;
        expr.ival = match tok {
            TokenKind::Pipe => (v1 | v2) as i64,
            TokenKind::Xor => (v1 ^ v2) as i64,
            TokenKind::Amp => (v1 & v2) as i64,
            TokenKind::Star => v1.wrapping_mul(v2) as i64,
            TokenKind::Div => {
                if v2 == 0 {
                    ctx.error(ErrorCode::DivisionByZero, "Division by zero");
                    0xFFFF_FFFF
                } else {
                    (v1 / v2) as i64
                }
            }
            TokenKind::Mod => {
                if v2 == 0 {
                    ctx.error(ErrorCode::ModuloByZero, "Modulo operation with zero");
                    0
                } else {
                    (v1 % v2) as i64
                }
            }
            _ => ctx.internal("Unexpected token in binary dispatcher"),
        };
    }
}

/// The shared dispatcher for the integer binary operator strata.
pub(crate) fn hie_binary(
    ctx: &mut Context,
    ops: &'static [GenDesc],
    expr: &mut ExprDesc,
    hienext: ExprFn,
    used_gen: &mut bool,
) {
    expr_with_check(ctx, hienext, expr);

    *used_gen = false;
    while let Some(gen) = find_gen(ctx.toks.cur_kind(), ops) {
        let gen = *gen;
        let mut expr2 = expr.sub_expr();

        // Tell the caller that we handled its operators.
        *used_gen = true;

        // All operators dispatched here expect an int on the left.
        if !expr.ty.is_class_int() {
            ctx.error(
                ErrorCode::IntegerExpressionExpected,
                "Integer expression expected",
            );
            expr.make_const_abs_int(1);
        }

        // Remember the operator token, then skip it.
        let tok = ctx.toks.cur_kind();
        ctx.toks.advance();

        // Get the left hand side on the stack.
        let mark1 = ctx.cg.get_code_pos();
        let mut ltype = type_code_of(&expr.ty);
        let lconst = expr.is_const_abs();
        if !lconst {
            load_expr(ctx, CodeFlags::NONE, expr);
        }
        let mark2 = ctx.cg.get_code_pos();
        if lconst {
            // A constant lhs of a commutative operator is not pushed; the
            // operands swap instead.
            if !gen.flags.contains(GenFlags::COMM) {
                ctx.cg.push(ltype | CodeFlags::CONST, expr.ival);
            }
        } else {
            ctx.cg.push(ltype, 0);
        }

        // Get the right hand side.
        marked_expr_with_check(ctx, hienext, &mut expr2);

        let rconst = expr2.is_const_abs() && expr2.code_range_is_empty(&ctx.cg);
        if !rconst {
            load_expr(ctx, CodeFlags::NONE, &mut expr2);
        }

        if !expr2.ty.is_class_int() {
            ctx.error(
                ErrorCode::IntegerExpressionExpected,
                "Integer expression expected",
            );
            expr2.make_const_abs_int(1);
        }

        if lconst && rconst {
            // Both operands constant: remove all code emitted for this
            // level and evaluate at compile time in the converted type.
            ctx.cg.remove_code(&mark1);
            expr.ty = arithmetic_convert(&expr.ty, &expr2.ty);
            fold_binary(ctx, tok, expr, &expr2);
            limit_expr_value(expr);
        } else if lconst && gen.flags.contains(GenFlags::COMM) && !rconst {
            // The left side is constant and the operator commutes: the
            // right side becomes "left" (it is already in the primary) and
            // the constant is applied directly.
            if ltype == CodeFlags::INT && expr.ival >= 0 && expr.ival < 256 {
                // A byte-sized constant makes for shorter code; the
                // emitter widens again as the context demands.
                ltype = CodeFlags::CHAR | CodeFlags::UNSIGNED;
            }
            let rtype = ltype | CodeFlags::CONST;
            let mut new_ltype = type_code_of(&expr2.ty);
            let mut flags = CodeFlags::CONST;
            if !gen.flags.contains(GenFlags::NOPUSH) {
                ctx.cg.push(new_ltype, 0);
            } else {
                new_ltype |= CodeFlags::PRIMARY;
            }

            flags |= ctx.cg.typeadjust(new_ltype, rtype);
            expr.ty = arithmetic_convert(&expr.ty, &expr2.ty);

            (gen.func)(&mut ctx.cg, flags, expr.ival);
            expr.finalize_rval_load();
        } else {
            let mut rtype = type_code_of(&expr2.ty);
            let mut flags = CodeFlags::NONE;
            if rconst {
                if rtype == CodeFlags::INT && expr2.ival >= 0 && expr2.ival < 256 {
                    rtype = CodeFlags::CHAR | CodeFlags::UNSIGNED;
                }
                flags |= CodeFlags::CONST;
                rtype |= CodeFlags::CONST;
                if tok == TokenKind::Div && expr2.ival == 0 {
                    ctx.error(ErrorCode::DivisionByZero, "Division by zero");
                } else if tok == TokenKind::Mod && expr2.ival == 0 {
                    ctx.error(ErrorCode::ModuloByZero, "Modulo operation with zero");
                }
                if gen.flags.contains(GenFlags::NOPUSH) {
                    // The generator takes the lhs from the primary, so the
                    // push can go again.
                    ctx.cg.remove_code(&mark2);
                    ltype |= CodeFlags::PRIMARY;
                }
            }

            flags |= ctx.cg.typeadjust(ltype, rtype);
            expr.ty = arithmetic_convert(&expr.ty, &expr2.ty);

            (gen.func)(&mut ctx.cg, flags, expr2.ival);
            expr.finalize_rval_load();
        }
    }
}

/// Process the multiplicative operators `*`, `/` and `%`.
pub fn hie9(ctx: &mut Context, expr: &mut ExprDesc) {
    static HIE9_OPS: &[GenDesc] = &[
        GenDesc {
            tok: TokenKind::Star,
            flags: GenFlags::NOPUSH.union(GenFlags::COMM),
            func: g_mul,
        },
        GenDesc {
            tok: TokenKind::Div,
            flags: GenFlags::NOPUSH,
            func: g_div,
        },
        GenDesc {
            tok: TokenKind::Mod,
            flags: GenFlags::NOPUSH,
            func: g_mod,
        },
    ];
    let mut used_gen = false;
    hie_binary(ctx, HIE9_OPS, expr, hie10, &mut used_gen);
}

/// Process the bitwise and operator `&`.
pub fn hie4(ctx: &mut Context, expr: &mut ExprDesc) {
    static HIE4_OPS: &[GenDesc] = &[GenDesc {
        tok: TokenKind::Amp,
        flags: GenFlags::NOPUSH.union(GenFlags::COMM),
        func: g_and,
    }];
    let mut used_gen = false;
    hie_binary(ctx, HIE4_OPS, expr, crate::expr::compare::hie5, &mut used_gen);
}

/// Process the bitwise exclusive or operator `^`.
pub fn hie3(ctx: &mut Context, expr: &mut ExprDesc) {
    static HIE3_OPS: &[GenDesc] = &[GenDesc {
        tok: TokenKind::Xor,
        flags: GenFlags::NOPUSH.union(GenFlags::COMM),
        func: g_xor,
    }];
    let mut used_gen = false;
    hie_binary(ctx, HIE3_OPS, expr, hie4, &mut used_gen);
}

/// Process the bitwise or operator `|`.
pub fn hie2(ctx: &mut Context, expr: &mut ExprDesc) {
    static HIE2_OPS: &[GenDesc] = &[GenDesc {
        tok: TokenKind::Pipe,
        flags: GenFlags::NOPUSH.union(GenFlags::COMM),
        func: g_or,
    }];
    let mut used_gen = false;
    hie_binary(ctx, HIE2_OPS, expr, hie3, &mut used_gen);
}

/// Process the shift operators `<<` and `>>`.
pub fn hie7(ctx: &mut Context, expr: &mut ExprDesc) {
    expr_with_check(ctx, hie8, expr);

    while matches!(ctx.toks.cur_kind(), TokenKind::Shl | TokenKind::Shr) {
        let tok = ctx.toks.cur_kind();
        let mut expr2 = expr.sub_expr();

        if !expr.ty.is_class_int() {
            ctx.error(
                ErrorCode::IntegerExpressionExpected,
                "Integer expression expected",
            );
            expr.make_const_abs_int(1);
        }
        ctx.toks.advance();

        // The result type is the promoted left operand; the right operand
        // does not participate in the conversion.
        let result_ty = expr.ty.int_promotion();
        let bits = result_ty.size_of() as i64 * 8;
        let ltype = type_code_of(&result_ty);

        // Get the left hand side on the stack.
        let mark1 = ctx.cg.get_code_pos();
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

        marked_expr_with_check(ctx, hie8, &mut expr2);

        let rconst = expr2.is_const_abs() && expr2.code_range_is_empty(&ctx.cg);
        if !rconst {
            load_expr(ctx, CodeFlags::NONE, &mut expr2);
        }
        if !expr2.ty.is_class_int() {
            ctx.error(
                ErrorCode::IntegerExpressionExpected,
                "Integer expression expected",
            );
            expr2.make_const_abs_int(1);
        }

        if rconst {
            if expr2.ival < 0 {
                ctx.warning("Shift count is negative");
            } else if expr2.ival >= bits {
                ctx.warning("Shift count too large for operand type");
            }
        }

        if lconst && rconst {
            // Fold the shift at compile time.
            ctx.cg.remove_code(&mark1);
            expr.ty = result_ty;
            let count = expr2.ival;
            if count < 0 {
                // Already warned; keep the value.
            } else if count >= bits {
                expr.ival = match tok {
                    TokenKind::Shl => 0,
                    _ => {
                        if expr.ty.is_signed() && expr.ival < 0 {
                            -1
                        } else {
                            0
                        }
                    }
                };
            } else {
                expr.ival = match tok {
                    TokenKind::Shl => expr.ival.wrapping_shl(count as u32),
                    _ => {
                        if expr.ty.is_signed() {
                            expr.ival >> count
                        } else {
                            ((expr.ival as u64) >> count) as i64
                        }
                    }
                };
            }
            limit_expr_value(expr);
        } else if rconst {
            // Constant count: shift the primary in place, the push was
            // unnecessary.
            ctx.cg.remove_code(&mark2);
            let flags = ltype | CodeFlags::CONST;
            match tok {
                TokenKind::Shl => ctx.cg.asl(flags, expr2.ival),
                _ => ctx.cg.asr(flags, expr2.ival),
            }
            expr.ty = result_ty;
            expr.finalize_rval_load();
        } else {
            // Generic case: count in the primary, value on the stack.
            match tok {
                TokenKind::Shl => ctx.cg.asl(ltype, 0),
                _ => ctx.cg.asr(ltype, 0),
            }
            expr.ty = result_ty;
            expr.finalize_rval_load();
        }
    }
}

/// Parse an expression with the binary plus operator. `expr` holds the
/// unprocessed left hand side and receives the result.
fn parse_add(ctx: &mut Context, expr: &mut ExprDesc) {
    let mut expr2 = expr.sub_expr();

    // Skip the plus.
    ctx.toks.advance();

    let lhst = expr.ty.clone();
    let mut flags = CodeFlags::NONE;

    if expr.is_const() {
        // The left hand side is a constant of some sort.
        expr_with_check(ctx, hie9, &mut expr2);
        if expr2.is_const_abs() {
            // Two constants. Check for pointer arithmetic.
            let rhst = expr2.ty.clone();
            if lhst.is_class_ptr() && rhst.is_class_int() {
                // Pointer plus int: scale the int by the element size.
                expr.ival += expr2.ival * checked_psize_of(ctx, &lhst) as i64;
            } else if lhst.is_class_int() && rhst.is_class_ptr() {
                // Int plus pointer: scale the int side.
                expr.ival = expr.ival * checked_psize_of(ctx, &rhst) as i64 + expr2.ival;
                expr.ty = expr2.ty.clone();
            } else if lhst.is_class_int() && rhst.is_class_int() {
                expr.ival += expr2.ival;
                typeadjust(ctx, expr, &expr2, true);
                limit_expr_value(expr);
            } else {
                ctx.error(
                    ErrorCode::InvalidOperands,
                    "Invalid operands for binary operator '+'",
                );
            }
        } else {
            // Constant lhs, non-constant rhs: bring the rhs into the
            // primary. Note that the lhs check above also lets constant
            // address labels with offsets pass.
            load_expr(ctx, CodeFlags::NONE, &mut expr2);
            let rhst = expr2.ty.clone();

            if expr.is_loc_none() {
                flags |= CodeFlags::CONST;
            } else {
                flags |= global_mode_flags(ctx, expr);
            }

            if lhst.is_class_ptr() && rhst.is_class_int() {
                // Scale the rhs in the primary by the element size.
                let scale_factor = checked_psize_of(ctx, &lhst) as i64;
                ctx.cg.scale(CodeFlags::INT, scale_factor);
                flags |= CodeFlags::PTR;
                if expr.is_loc_none() {
                    ctx.cg.inc(flags, expr.ival);
                } else {
                    let name = expr.label_name();
                    ctx.cg.add_addr_static(flags, &name, expr.ival);
                }
            } else if lhst.is_class_int() && rhst.is_class_ptr() {
                let scale_factor = checked_psize_of(ctx, &rhst) as i64;
                flags |= CodeFlags::PTR;
                expr.ty = expr2.ty.clone();

                // The rhs already occupies the primary; a non-numeric lhs
                // that needs scaling must take the long way over the
                // stack.
                if expr.is_loc_none() {
                    expr.ival *= scale_factor;
                    ctx.cg.inc(flags, expr.ival);
                } else if scale_factor == 1 {
                    let name = expr.label_name();
                    ctx.cg.add_addr_static(flags, &name, expr.ival);
                } else {
                    let name = expr.label_name();
                    ctx.cg.push(type_code_of(&expr2.ty), 0);
                    ctx.cg.get_immed_addr(flags, &name, expr.ival);
                    ctx.cg.scale(CodeFlags::PTR, scale_factor);
                    ctx.cg.add(CodeFlags::PTR, 0);
                }
            } else if lhst.is_class_int() && rhst.is_class_int() {
                flags |= typeadjust(ctx, expr, &expr2, true);
                if expr.is_loc_none() {
                    ctx.cg.inc(flags, expr.ival);
                } else {
                    let name = expr.label_name();
                    ctx.cg.add_addr_static(flags, &name, expr.ival);
                }
            } else {
                ctx.error(
                    ErrorCode::InvalidOperands,
                    "Invalid operands for binary operator '+'",
                );
            }

            expr.finalize_rval_load();
        }
    } else {
        // The left hand side is not constant: into the primary and onto
        // the stack.
        load_expr(ctx, CodeFlags::NONE, expr);
        let mark = ctx.cg.get_code_pos();
        ctx.cg.push(type_code_of(&expr.ty), 0);

        marked_expr_with_check(ctx, hie9, &mut expr2);

        if expr2.is_const_abs() && expr2.code_range_is_empty(&ctx.cg) {
            // Constant rhs: the push was unnecessary.
            let rhst = expr2.ty.clone();
            ctx.cg.remove_code(&mark);

            if lhst.is_class_ptr() && rhst.is_class_int() {
                expr2.ival *= checked_psize_of(ctx, &lhst) as i64;
                flags = CodeFlags::PTR;
            } else if lhst.is_class_int() && rhst.is_class_ptr() {
                // Int plus pointer: scale the int in the primary.
                let scale_factor = checked_psize_of(ctx, &rhst) as i64;
                ctx.cg
                    .scale(CodeFlags::INT | CodeFlags::CONST, scale_factor);
                flags = CodeFlags::PTR;
                expr.ty = expr2.ty.clone();
            } else if lhst.is_class_int() && rhst.is_class_int() {
                flags = typeadjust(ctx, expr, &expr2, true);
            } else {
                ctx.error(
                    ErrorCode::InvalidOperands,
                    "Invalid operands for binary operator '+'",
                );
                flags = CodeFlags::INT;
            }

            ctx.cg.inc(flags | CodeFlags::CONST, expr2.ival);
        } else {
            // Neither side constant.
            load_expr(ctx, CodeFlags::NONE, &mut expr2);
            let rhst = expr2.ty.clone();

            if lhst.is_class_ptr() && rhst.is_class_int() {
                let scale_factor = checked_psize_of(ctx, &lhst) as i64;
                ctx.cg.scale(CodeFlags::INT, scale_factor);
                flags = CodeFlags::PTR;
            } else if lhst.is_class_int() && rhst.is_class_ptr() {
                // The int is on the stack; swap and scale it.
                ctx.cg.tos_int(type_code_of(&lhst));
                ctx.cg.swap(CodeFlags::INT);
                let scale_factor = checked_psize_of(ctx, &rhst) as i64;
                ctx.cg.scale(CodeFlags::INT, scale_factor);
                flags = CodeFlags::PTR;
                expr.ty = expr2.ty.clone();
            } else if lhst.is_class_int() && rhst.is_class_int() {
                flags = typeadjust(ctx, expr, &expr2, false) & !CodeFlags::CONST;
            } else {
                ctx.error(
                    ErrorCode::InvalidOperands,
                    "Invalid operands for binary operator '+'",
                );
                flags = CodeFlags::INT;
            }

            ctx.cg.add(flags, 0);
        }

        expr.finalize_rval_load();
    }

    // Condition codes are not set.
    expr.mark_as_untested();
}

/// Parse an expression with the binary minus operator.
fn parse_sub(ctx: &mut Context, expr: &mut ExprDesc) {
    let mut expr2 = expr.sub_expr();

    // The lhs cannot be a function or pointer to function.
    if expr.ty.is_func() || expr.ty.is_func_ptr() {
        ctx.error(
            ErrorCode::InvalidOperands,
            "Invalid left operand for binary operator '-'",
        );
        expr.ty = crate::types::Type::uchar();
    }

    // Skip the minus.
    ctx.toks.advance();

    let lhst = expr.ty.clone();
    let mut rscale: i64 = 1;

    // Bring the lhs into the primary and onto the stack.
    let mark1 = ctx.cg.get_code_pos();
    load_expr(ctx, CodeFlags::NONE, expr);
    let mark2 = ctx.cg.get_code_pos();
    ctx.cg.push(type_code_of(&lhst), 0);

    marked_expr_with_check(ctx, hie9, &mut expr2);

    if expr2.ty.is_func() || expr2.ty.is_func_ptr() {
        ctx.error(
            ErrorCode::InvalidOperands,
            "Invalid right operand for binary operator '-'",
        );
        expr2.ty = crate::types::Type::uchar();
    }

    let flags;
    if expr2.is_const_abs() && expr2.code_range_is_empty(&ctx.cg) {
        // Constant rhs.
        let rhst = expr2.ty.clone();

        if expr.is_const_abs() {
            // Both sides constant: remove all generated code and fold.
            ctx.cg.remove_code(&mark1);

            if lhst.is_class_ptr() && rhst.is_class_int() {
                expr.ival -= expr2.ival * checked_psize_of(ctx, &lhst) as i64;
            } else if lhst.is_class_ptr() && rhst.is_class_ptr() {
                // Pointer difference scales by the element size.
                if crate::types::type_cmp(&lhst.indirect(), &rhst.indirect())
                    < crate::types::TypeCmp::QualDiff
                {
                    ctx.error(
                        ErrorCode::IncompatiblePointerTypes,
                        "Incompatible pointer types",
                    );
                } else {
                    expr.ival =
                        (expr.ival - expr2.ival) / checked_psize_of(ctx, &lhst) as i64;
                }
                expr.ty = crate::types::Type::int();
            } else if lhst.is_class_int() && rhst.is_class_int() {
                typeadjust(ctx, expr, &expr2, true);
                expr.ival -= expr2.ival;
                limit_expr_value(expr);
            } else {
                ctx.error(
                    ErrorCode::InvalidOperands,
                    "Invalid operands for binary operator '-'",
                );
            }
        } else {
            // Lhs not constant, rhs constant: the push was unnecessary.
            ctx.cg.remove_code(&mark2);

            if lhst.is_class_ptr() && rhst.is_class_int() {
                expr2.ival *= checked_psize_of(ctx, &lhst) as i64;
                flags = CodeFlags::PTR;
            } else if lhst.is_class_ptr() && rhst.is_class_ptr() {
                if crate::types::type_cmp(&lhst.indirect(), &rhst.indirect())
                    < crate::types::TypeCmp::QualDiff
                {
                    ctx.error(
                        ErrorCode::IncompatiblePointerTypes,
                        "Incompatible pointer types",
                    );
                } else {
                    rscale = checked_psize_of(ctx, &lhst) as i64;
                }
                flags = CodeFlags::PTR;
                expr.ty = crate::types::Type::int();
            } else if lhst.is_class_int() && rhst.is_class_int() {
                flags = typeadjust(ctx, expr, &expr2, true);
            } else {
                ctx.error(
                    ErrorCode::InvalidOperands,
                    "Invalid operands for binary operator '-'",
                );
                flags = CodeFlags::INT;
            }

            ctx.cg.dec(flags | CodeFlags::CONST, expr2.ival);

            // A pointer difference is scaled down to elements.
            if rscale != 1 {
                ctx.cg.scale(flags, -rscale);
            }

            expr.finalize_rval_load();
        }
    } else {
        // Rhs not constant: load it.
        load_expr(ctx, CodeFlags::NONE, &mut expr2);
        let rhst = expr2.ty.clone();

        if lhst.is_class_ptr() && rhst.is_class_int() {
            let scale_factor = checked_psize_of(ctx, &lhst) as i64;
            ctx.cg.scale(CodeFlags::INT, scale_factor);
            flags = CodeFlags::PTR;
        } else if lhst.is_class_ptr() && rhst.is_class_ptr() {
            if crate::types::type_cmp(&lhst.indirect(), &rhst.indirect())
                < crate::types::TypeCmp::QualDiff
            {
                ctx.error(
                    ErrorCode::IncompatiblePointerTypes,
                    "Incompatible pointer types",
                );
            } else {
                rscale = checked_psize_of(ctx, &lhst) as i64;
            }
            flags = CodeFlags::PTR;
            expr.ty = crate::types::Type::int();
        } else if lhst.is_class_int() && rhst.is_class_int() {
            // The lhs is on the stack now even if its descriptor claimed
            // constness; make that visible before adjusting types.
            if expr.is_loc_none() {
                expr.finalize_rval_load();
            }
            flags = typeadjust(ctx, expr, &expr2, false);
        } else {
            ctx.error(
                ErrorCode::InvalidOperands,
                "Invalid operands for binary operator '-'",
            );
            flags = CodeFlags::INT;
        }

        ctx.cg.sub(flags & !CodeFlags::CONST, 0);

        if rscale != 1 {
            ctx.cg.scale(flags, -rscale);
        }

        expr.finalize_rval_load();
    }

    // Condition codes are not set.
    expr.mark_as_untested();
}

/// Process the additive operators `+` and `-`.
pub fn hie8(ctx: &mut Context, expr: &mut ExprDesc) {
    expr_with_check(ctx, hie9, expr);
    loop {
        match ctx.toks.cur_kind() {
            TokenKind::Plus => parse_add(ctx, expr),
            TokenKind::Minus => parse_sub(ctx, expr),
            _ => break,
        }
    }
}
