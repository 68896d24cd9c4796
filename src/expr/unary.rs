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

//! The unary stratum: pre/post increment and decrement, unary `+ - ~ !`,
//! indirection and address-of, `sizeof`, and casts.
//!
//! Post-increment and -decrement on addressable lvalues do not save and
//! restore the primary register; the mutation is deferred to the next
//! sequence point instead.

use crate::codegen::emit::EmitHelpers;
use crate::codegen::{type_code_of, CodeFlags};
use crate::error::ErrorCode;
use crate::expr::deferred::{defer_dec, defer_inc};
use crate::expr::desc::{ExprDesc, Loc};
use crate::expr::load::load_expr;
use crate::expr::postfix::hie11;
use crate::expr::typeconv::{parse_type_spec, type_cast};
use crate::expr::{
    bool_expr, checked_psize_of, expr_checked_size_of, expr_with_check, global_mode_flags, store,
    type_spec_ahead, Context,
};
use crate::token::TokenKind;
use crate::types::Type;

/// Emit an in-place add or subtract of `val` against the lvalue.
fn ineq_dispatch(ctx: &mut Context, expr: &ExprDesc, flags: CodeFlags, val: i64, inc: bool) {
    match expr.loc {
        Loc::Abs => {
            let name = expr.label_name();
            if inc {
                ctx.cg.addeq_static(flags, &name, 0, val);
            } else {
                ctx.cg.subeq_static(flags, &name, 0, val);
            }
        }
        Loc::Global | Loc::Static | Loc::Register | Loc::Literal | Loc::Code => {
            let name = expr.label_name();
            if inc {
                ctx.cg.addeq_static(flags, &name, expr.ival, val);
            } else {
                ctx.cg.subeq_static(flags, &name, expr.ival, val);
            }
        }
        Loc::Stack => {
            if inc {
                ctx.cg.addeq_local(flags, expr.ival as i32, val);
            } else {
                ctx.cg.subeq_local(flags, expr.ival as i32, val);
            }
        }
        Loc::Primary => {
            if inc {
                ctx.cg.inc(flags, val);
            } else {
                ctx.cg.dec(flags, val);
            }
        }
        Loc::Expr => {
            if inc {
                ctx.cg.addeq_ind(flags, expr.ival, val);
            } else {
                ctx.cg.subeq_ind(flags, expr.ival, val);
            }
        }
        Loc::None => ctx.internal("Invalid location in pre-increment"),
    }
}

/// Handle the pre-increment and pre-decrement operators.
fn pre_inc_dec(ctx: &mut Context, expr: &mut ExprDesc, inc: bool) {
    // Skip the operator token.
    ctx.toks.advance();

    // Evaluate the operand, which must be an lvalue.
    hie10(ctx, expr);
    if !expr.is_lval() {
        ctx.error(ErrorCode::InvalidLValue, "Invalid lvalue");
        return;
    }

    if expr.ty.is_qual_const() {
        if inc {
            ctx.error(
                ErrorCode::IncrementOfReadOnly,
                "Increment of read-only variable",
            );
        } else {
            ctx.error(
                ErrorCode::DecrementOfReadOnly,
                "Decrement of read-only variable",
            );
        }
    }

    let flags = type_code_of(&expr.ty)
        | global_mode_flags(ctx, expr)
        | CodeFlags::FORCECHAR
        | CodeFlags::CONST;

    // Pointers step by the size of the pointed-to type.
    let val = if expr.ty.is_ptr() {
        checked_psize_of(ctx, &expr.ty) as i64
    } else {
        1
    };

    if !expr.is_uneval() {
        ineq_dispatch(ctx, expr, flags, val, inc);
    }

    // The updated value is loaded by the in-place operation.
    expr.finalize_rval_load();
}

/// Handle the post-increment and post-decrement operators.
fn post_inc_dec(ctx: &mut Context, expr: &mut ExprDesc, inc: bool) {
    ctx.toks.advance();

    // The operand must be an lvalue.
    if !expr.is_lval() {
        ctx.error(ErrorCode::InvalidLValue, "Invalid lvalue");
        return;
    }

    if expr.ty.is_qual_const() {
        if inc {
            ctx.error(
                ErrorCode::IncrementOfReadOnly,
                "Increment of read-only variable",
            );
        } else {
            ctx.error(
                ErrorCode::DecrementOfReadOnly,
                "Decrement of read-only variable",
            );
        }
    }

    let flags = type_code_of(&expr.ty);

    if flags.contains(CodeFlags::CHAR) && expr.is_loc_const() && !expr.is_bit_field() {
        // A char variable at a constant location: load the value, then a
        // single in-memory instruction does the update.
        load_expr(ctx, CodeFlags::NONE, expr);
        if !expr.is_uneval() {
            let mut name = expr.label_name();
            if expr.loc != Loc::Abs && expr.ival != 0 {
                name = format!("{}+{}", name, expr.ival);
            }
            let op = if inc { "inc" } else { "dec" };
            ctx.cg.add_code_line(format!("{} {}", op, name));
        }
    } else if expr.is_loc_primary_or_expr() {
        // The address was computed at runtime; the mutation cannot be
        // deferred since the address would be lost. Save and restore the
        // value instead.
        crate::expr::push_addr(ctx, expr);

        load_expr(ctx, CodeFlags::NONE, expr);
        ctx.cg.save(flags | CodeFlags::FORCECHAR);

        let val = if expr.ty.is_ptr() {
            checked_psize_of(ctx, &expr.ty) as i64
        } else {
            1
        };
        if inc {
            ctx.cg
                .inc(flags | CodeFlags::CONST | CodeFlags::FORCECHAR, val);
        } else {
            ctx.cg
                .dec(flags | CodeFlags::CONST | CodeFlags::FORCECHAR, val);
        }

        store(ctx, expr, None);
        ctx.cg.restore(flags | CodeFlags::FORCECHAR);
    } else {
        // Load the value, then defer the in-memory update to the next
        // sequence point; no save/restore of the primary is needed.
        load_expr(ctx, CodeFlags::NONE, expr);
        if inc {
            defer_inc(ctx, expr);
        } else {
            defer_dec(ctx, expr);
        }
    }

    // The result is the value before the update.
    expr.finalize_rval_load();
}

/// Handle unary `-`, `+` and `~`.
fn unary_op(ctx: &mut Context, expr: &mut ExprDesc) {
    // Remember the operator token and skip it.
    let tok = ctx.toks.cur_kind();
    ctx.toks.advance();

    hie10(ctx, expr);

    if !expr.ty.is_class_int() {
        ctx.error(
            ErrorCode::IntegerExpressionExpected,
            "Argument must have integer type",
        );
        expr.make_const_abs_int(1);
    }

    if expr.is_const_abs() {
        match tok {
            TokenKind::Minus => expr.ival = -expr.ival,
            TokenKind::Plus => {}
            TokenKind::Comp => expr.ival = !expr.ival,
            _ => ctx.internal("Unexpected token in unary operator"),
        }
        crate::expr::limit_expr_value(expr);
    } else {
        load_expr(ctx, CodeFlags::NONE, expr);

        // Promote the loaded value to at least int.
        let flags = ctx
            .cg
            .typeadjust(type_code_of(&expr.ty), CodeFlags::INT | CodeFlags::CONST);

        match tok {
            TokenKind::Minus => ctx.cg.neg(flags),
            TokenKind::Plus => {}
            TokenKind::Comp => ctx.cg.com(flags),
            _ => ctx.internal("Unexpected token in unary operator"),
        }

        expr.finalize_rval_load();
    }

    expr.ty = expr.ty.int_promotion();
}

/// Parse the unary stratum.
pub fn hie10(ctx: &mut Context, expr: &mut ExprDesc) {
    match ctx.toks.cur_kind() {
        TokenKind::Inc => pre_inc_dec(ctx, expr, true),
        TokenKind::Dec => pre_inc_dec(ctx, expr, false),

        TokenKind::Plus | TokenKind::Minus | TokenKind::Comp => unary_op(ctx, expr),

        TokenKind::BoolNot => {
            ctx.toks.advance();
            bool_expr(ctx, hie10, expr);
            if expr.is_const_abs() {
                expr.ival = (expr.ival == 0) as i64;
            } else if expr.is_addr_expr() {
                // An object address is never null, so its negation is a
                // constant false.
                expr.make_const_bool(0);
            } else {
                load_expr(ctx, CodeFlags::NONE, expr);
                ctx.cg.bneg(type_code_of(&expr.ty));
                expr.finalize_rval_load();
                // The boolean-negate leaves the condition codes valid.
                expr.test_done();
            }
            expr.ty = Type::bool_();
        }

        TokenKind::Star => {
            ctx.toks.advance();
            expr_with_check(ctx, hie10, expr);

            // Functions and function pointers are interchangeable here:
            // dereferencing either yields "pointer to function" again, so
            // the operator is a no-op apart from making it an rvalue.
            if expr.ty.is_func_ptr() || expr.ty.is_func() {
                expr.mark_rval();
            } else {
                if !expr.is_quasi_const_addr() {
                    // Not a constant address: load the pointer.
                    load_expr(ctx, CodeFlags::NONE, expr);
                    expr.finalize_rval_load();
                }

                if expr.ty.is_class_ptr() {
                    expr.ty = expr.ty.indirect();
                } else {
                    ctx.error(ErrorCode::IllegalIndirection, "Illegal indirection");
                }

                // If the pointee is an array, the value already is the
                // location of its first element.
                if !expr.ty.is_array() {
                    expr.ind_expr();
                }
            }
        }

        TokenKind::Amp => {
            ctx.toks.advance();
            expr_with_check(ctx, hie10, expr);

            // The operator may be applied to functions and arrays even
            // though they are not lvalues.
            if !expr.ty.is_func() && !expr.ty.is_array() {
                if expr.is_rval() {
                    ctx.error(ErrorCode::IllegalAddress, "Illegal address");
                    return;
                }
                if expr.is_bit_field() {
                    ctx.error(
                        ErrorCode::AddressOfBitField,
                        "Cannot take address of bit-field",
                    );
                    expr.dis_bit_field();
                }
                expr.addr_expr();
            }
            expr.ty = expr.ty.clone().ptr_to();
        }

        TokenKind::Sizeof => {
            ctx.toks.advance();
            let size;
            if type_spec_ahead(ctx) {
                ctx.toks.advance();
                let ty = parse_type_spec(ctx).unwrap_or_else(Type::int);
                size = expr_checked_size_of(ctx, &ty);
                ctx.consume_rparen();
            } else {
                // The operand is parsed but never evaluated; whatever code
                // it may emit is rolled back.
                let mark = ctx.cg.get_code_pos();
                let mut uneval = ExprDesc::new();
                uneval.mark_for_uneval();
                hie10(ctx, &mut uneval);
                if uneval.is_bit_field() {
                    ctx.error(ErrorCode::SizeofBitField, "Cannot apply 'sizeof' to bit-field");
                    size = 0;
                } else {
                    size = expr_checked_size_of(ctx, &uneval.ty);
                }
                ctx.cg.remove_code(&mark);
            }
            expr.make_const_abs(size as i64, Type::size_t());
            expr.mark_as_untested();
        }

        _ => {
            if type_spec_ahead(ctx) {
                type_cast(ctx, expr);
            } else {
                hie11(ctx, expr);
                match ctx.toks.cur_kind() {
                    TokenKind::Inc => post_inc_dec(ctx, expr, true),
                    TokenKind::Dec => post_inc_dec(ctx, expr, false),
                    _ => {}
                }
            }
        }
    }
}
