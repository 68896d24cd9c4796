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

//! Assignment operators and the comma stratum.
//!
//! Simple assignment converts the right side to the left side's type and
//! stores through the lvalue; a constant right side keeps its constness in
//! the result, so enclosing operators can still fold. Compound `+=`/`-=`
//! on addressable lvalues use the dedicated add-to-memory instruction
//! family; all other compound operators go through the generic
//! load/operate/store path with the push patched out for constant right
//! sides.

use crate::codegen::emit::EmitHelpers;
use crate::codegen::{type_code_of, CodeFlags};
use crate::error::ErrorCode;
use crate::expr::binary::{
    g_add, g_and, g_asl, g_asr, g_div, g_mod, g_mul, g_or, g_sub, g_xor, GenDesc, GenFlags,
};
use crate::expr::deferred::{do_deferred, SeqPoint};
use crate::expr::desc::{ExprDesc, Loc};
use crate::expr::load::load_expr;
use crate::expr::logical::hie_quest;
use crate::expr::typeconv::type_conversion;
use crate::expr::{
    checked_size_of, global_mode_flags, limit_expr_value, marked_expr_with_check, push_addr, store,
    Context,
};
use crate::token::TokenKind;
use crate::types::{type_cmp, Type, TypeCmp};

// Generator descriptors for the compound assignment operators.
static GEN_PASGN: GenDesc = GenDesc {
    tok: TokenKind::PlusAssign,
    flags: GenFlags::NOPUSH,
    func: g_add,
};
static GEN_SASGN: GenDesc = GenDesc {
    tok: TokenKind::MinusAssign,
    flags: GenFlags::NOPUSH,
    func: g_sub,
};
static GEN_MASGN: GenDesc = GenDesc {
    tok: TokenKind::MulAssign,
    flags: GenFlags::NOPUSH,
    func: g_mul,
};
static GEN_DASGN: GenDesc = GenDesc {
    tok: TokenKind::DivAssign,
    flags: GenFlags::NOPUSH,
    func: g_div,
};
static GEN_MOASGN: GenDesc = GenDesc {
    tok: TokenKind::ModAssign,
    flags: GenFlags::NOPUSH,
    func: g_mod,
};
static GEN_SLASGN: GenDesc = GenDesc {
    tok: TokenKind::ShlAssign,
    flags: GenFlags::NOPUSH,
    func: g_asl,
};
static GEN_SRASGN: GenDesc = GenDesc {
    tok: TokenKind::ShrAssign,
    flags: GenFlags::NOPUSH,
    func: g_asr,
};
static GEN_AASGN: GenDesc = GenDesc {
    tok: TokenKind::AndAssign,
    flags: GenFlags::NOPUSH,
    func: g_and,
};
static GEN_XOASGN: GenDesc = GenDesc {
    tok: TokenKind::XorAssign,
    flags: GenFlags::NOPUSH,
    func: g_xor,
};
static GEN_OASGN: GenDesc = GenDesc {
    tok: TokenKind::OrAssign,
    flags: GenFlags::NOPUSH,
    func: g_or,
};

/// Store the primary register into a bit-field with a read-modify-write of
/// the storage unit. Only statically addressable lvalues reach this.
fn store_bit_field(ctx: &mut Context, expr: &mut ExprDesc) {
    let mask = (1i64 << expr.bit_width) - 1;

    // Mask the new value and move it into field position, then park it.
    ctx.cg.and(
        CodeFlags::INT | CodeFlags::UNSIGNED | CodeFlags::CONST,
        mask,
    );
    if expr.bit_offs > 0 {
        ctx.cg.asl(
            CodeFlags::INT | CodeFlags::UNSIGNED | CodeFlags::CONST,
            expr.bit_offs as i64,
        );
    }
    ctx.cg.add_code_line("sta tmp1");
    ctx.cg.add_code_line("stx tmp1+1");

    // Fetch the whole storage unit, clear the field bits and merge. For a
    // bit-field behind a pointer the address sits on the stack (pushed
    // before the right side was evaluated); fetch a copy of it first.
    let mut unit = expr.clone();
    unit.dis_bit_field();
    unit.ty = Type::uint();
    if unit.is_loc_expr() {
        let ptr_offs = ctx.cg.stack_ptr;
        ctx.cg.get_local(CodeFlags::PTR, ptr_offs);
    }
    load_expr(ctx, CodeFlags::INT | CodeFlags::UNSIGNED, &mut unit);
    let keep = !(mask << expr.bit_offs) as u16 as i64;
    ctx.cg.and(
        CodeFlags::INT | CodeFlags::UNSIGNED | CodeFlags::CONST,
        keep,
    );
    ctx.cg.add_code_line("ora tmp1");
    ctx.cg.add_code_line("pha");
    ctx.cg.add_code_line("txa");
    ctx.cg.add_code_line("ora tmp1+1");
    ctx.cg.add_code_line("tax");
    ctx.cg.add_code_line("pla");

    store(ctx, &mut unit, Some(&Type::uint()));
}

/// Process the simple assignment operator. The current token is `=`.
pub(crate) fn assignment(ctx: &mut Context, expr: &mut ExprDesc) {
    ctx.toks.advance();

    if !expr.is_lval() {
        ctx.error(ErrorCode::InvalidLValue, "Invalid lvalue in assignment");
    }
    if expr.ty.is_qual_const() {
        ctx.error(ErrorCode::AssignmentToConst, "Assignment to const");
    }
    if expr.ty.is_array() {
        ctx.error(ErrorCode::InvalidLValue, "Array type is not assignable");
    }

    let mut expr2 = expr.sub_expr();

    if expr.ty.is_record() {
        // Record assignment. Register-sized records copy through the
        // primary; larger ones copy by address through the runtime.
        push_addr(ctx, expr);
        hie1(ctx, &mut expr2);
        if type_cmp(&expr.ty, &expr2.ty) < TypeCmp::QualDiff {
            ctx.error(
                ErrorCode::IncompatibleTypes,
                format!("Incompatible types assigning '{}' to '{}'", expr2.ty, expr.ty),
            );
            // A pushed lvalue address must not leak on the error path.
            if expr.is_loc_expr() {
                ctx.cg.drop_bytes(2);
            }
            return;
        }

        let replacement = expr.ty.replacement_type();
        if replacement != expr.ty {
            load_expr(ctx, type_code_of(&replacement), &mut expr2);
            store(ctx, expr, Some(&replacement));
            expr.finalize_rval_load();
        } else if expr.is_loc_expr() || expr2.is_loc_primary_or_expr() {
            // The address of either side lives in the primary; the copy
            // sequence below would clobber it.
            ctx.error(
                ErrorCode::NonScalarAssignment,
                "Cannot assign this record through a computed address",
            );
            if expr.is_loc_expr() {
                ctx.cg.drop_bytes(2);
            }
        } else {
            let size = checked_size_of(ctx, &expr.ty);
            let mut dest = expr.clone();
            dest.addr_expr();
            load_expr(ctx, CodeFlags::NONE, &mut dest);
            ctx.cg.push(CodeFlags::PTR, 0);
            let mut src = expr2.clone();
            src.addr_expr();
            load_expr(ctx, CodeFlags::NONE, &mut src);
            ctx.cg.push(CodeFlags::PTR, 0);
            ctx.cg
                .get_immed(CodeFlags::INT | CodeFlags::CONST, size as i64);
            ctx.cg.call(CodeFlags::INT, "memcpy", 4);
            expr.finalize_rval_load();
        }
        return;
    }

    if expr.is_bit_field() {
        push_addr(ctx, expr);
        hie1(ctx, &mut expr2);
        type_conversion(ctx, &mut expr2, &Type::int());
        load_expr(ctx, CodeFlags::NONE, &mut expr2);
        store_bit_field(ctx, expr);
        expr.finalize_rval_load();
        expr.ty = Type::int();
        return;
    }

    // Scalar assignment. If the address of the lvalue was computed at
    // runtime it must survive the right hand side.
    push_addr(ctx, expr);

    marked_expr_with_check(ctx, hie1, &mut expr2);

    // Convert the right side to the type of the left side.
    type_conversion(ctx, &mut expr2, &expr.ty);

    if expr2.is_const_abs() && expr2.code_range_is_empty(&ctx.cg) {
        // A constant right side: emit the load and the store, but keep the
        // constant in the descriptor, so enclosing operators can fold.
        load_expr(ctx, CodeFlags::NONE, &mut expr2);
        store(ctx, expr, None);
        let ty = expr.ty.clone();
        expr.make_const_abs(expr2.ival, ty);
        limit_expr_value(expr);
    } else {
        load_expr(ctx, CodeFlags::NONE, &mut expr2);
        store(ctx, expr, None);
        expr.finalize_rval_load();
    }
}

/// Process a generic compound assignment operator.
fn opeq(ctx: &mut Context, gen: &GenDesc, expr: &mut ExprDesc, op: &str) {
    if expr.is_rval() {
        ctx.error(ErrorCode::InvalidLValue, "Invalid lvalue in assignment");
        return;
    }
    if expr.ty.is_qual_const() {
        ctx.error(ErrorCode::AssignmentToConst, "Assignment to const");
    }
    if !expr.ty.is_class_int() && !expr.ty.is_ptr() {
        ctx.error(
            ErrorCode::InvalidOperands,
            format!("Invalid left operand for binary operator '{}'", op),
        );
        // Continue; wrong code is generated but parsing recovers.
    }

    // Skip the operator token.
    ctx.toks.advance();

    let mut flags = type_code_of(&expr.ty);
    let must_scale =
        matches!(gen.tok, TokenKind::PlusAssign | TokenKind::MinusAssign) && expr.ty.is_ptr();

    // Get the lvalue address on the stack if needed, fetch the old value
    // and push it for the operator.
    push_addr(ctx, expr);
    load_expr(ctx, CodeFlags::NONE, expr);
    let mark = ctx.cg.get_code_pos();
    ctx.cg.push(flags, 0);

    let mut expr2 = expr.sub_expr();
    marked_expr_with_check(ctx, hie1, &mut expr2);

    if !expr2.ty.is_class_int() {
        ctx.error(
            ErrorCode::InvalidOperands,
            format!("Invalid right operand for binary operator '{}'", op),
        );
    }

    if expr2.is_const_abs() && expr2.code_range_is_empty(&ctx.cg) {
        // Constant right side: the generator consumes the left side from
        // the primary, so the push can be patched out.
        if gen.flags.contains(GenFlags::NOPUSH) {
            ctx.cg.remove_code(&mark);
        }
        if must_scale {
            // The left side is a pointer: scale the constant.
            expr2.ival *= checked_size_of(ctx, &expr.ty.indirect()) as i64;
        }

        // Character-sized lvalues may stay character sized.
        if checked_size_of(ctx, &expr.ty) == 1 {
            flags |= CodeFlags::FORCECHAR;
        }

        match gen.tok {
            TokenKind::PlusAssign => ctx.cg.inc(flags | CodeFlags::CONST, expr2.ival),
            TokenKind::MinusAssign => ctx.cg.dec(flags | CodeFlags::CONST, expr2.ival),
            _ => {
                if expr2.ival == 0 {
                    if gen.tok == TokenKind::DivAssign {
                        ctx.error(ErrorCode::DivisionByZero, "Division by zero");
                    } else if gen.tok == TokenKind::ModAssign {
                        ctx.error(ErrorCode::ModuloByZero, "Modulo operation with zero");
                    }
                }
                (gen.func)(&mut ctx.cg, flags | CodeFlags::CONST, expr2.ival);
            }
        }
    } else {
        // Right side is computed: load it and use the register form.
        load_expr(ctx, CodeFlags::NONE, &mut expr2);
        if must_scale {
            let size = checked_size_of(ctx, &expr.ty.indirect());
            ctx.cg.scale(type_code_of(&expr2.ty), size as i64);
        }
        if checked_size_of(ctx, &expr.ty) == 1 {
            flags |= CodeFlags::FORCECHAR;
        }
        let adjusted = ctx.cg.typeadjust(flags, type_code_of(&expr2.ty));
        (gen.func)(&mut ctx.cg, adjusted, 0);
    }

    store(ctx, expr, None);
    expr.finalize_rval_load();
}

/// Process the `+=` and `-=` operators. Addressable lvalues use the
/// dedicated add-to/subtract-from-memory instruction family; lvalues in
/// the primary or behind a pointer fall through to the generic path.
fn addsubeq(ctx: &mut Context, gen: &'static GenDesc, expr: &mut ExprDesc, op: &str) {
    if expr.is_loc_primary_or_expr() {
        opeq(ctx, gen, expr, op);
        return;
    }

    if expr.is_rval() {
        ctx.error(ErrorCode::InvalidLValue, "Invalid lvalue in assignment");
        return;
    }
    if expr.ty.is_qual_const() {
        ctx.error(ErrorCode::AssignmentToConst, "Assignment to const");
    }
    if !expr.ty.is_class_int() && !expr.ty.is_ptr() {
        ctx.error(
            ErrorCode::InvalidOperands,
            format!("Invalid left operand for binary operator '{}'", op),
        );
    }

    // Skip the operator token.
    ctx.toks.advance();

    // A pointer on the left scales the right side by the element size.
    let must_scale = expr.ty.is_ptr();

    let mut expr2 = expr.sub_expr();
    hie1(ctx, &mut expr2);
    if !expr2.ty.is_class_int() {
        ctx.error(
            ErrorCode::InvalidOperands,
            format!("Invalid right operand for binary operator '{}'", op),
        );
    }

    let mut lflags = type_code_of(&expr.ty) | global_mode_flags(ctx, expr) | CodeFlags::FORCECHAR;
    let rflags = type_code_of(&expr2.ty) | CodeFlags::FORCECHAR;

    if expr2.is_const_abs() {
        lflags |= CodeFlags::CONST;
        if must_scale {
            expr2.ival *= checked_size_of(ctx, &expr.ty.indirect()) as i64;
        }
    } else {
        load_expr(ctx, CodeFlags::NONE, &mut expr2);

        // Convert the right side to the type of the left side.
        ctx.cg.typecast(lflags, rflags & !CodeFlags::FORCECHAR);

        if must_scale {
            let size = checked_size_of(ctx, &expr.ty.indirect());
            ctx.cg.scale(type_code_of(&expr2.ty), size as i64);
        }
    }

    let adding = gen.tok == TokenKind::PlusAssign;
    match expr.loc {
        Loc::Abs => {
            let name = expr.label_name();
            if adding {
                ctx.cg.addeq_static(lflags, &name, 0, expr2.ival);
            } else {
                ctx.cg.subeq_static(lflags, &name, 0, expr2.ival);
            }
        }
        Loc::Global | Loc::Static | Loc::Register | Loc::Literal | Loc::Code => {
            let name = expr.label_name();
            if adding {
                ctx.cg.addeq_static(lflags, &name, expr.ival, expr2.ival);
            } else {
                ctx.cg.subeq_static(lflags, &name, expr.ival, expr2.ival);
            }
        }
        Loc::Stack => {
            if adding {
                ctx.cg.addeq_local(lflags, expr.ival as i32, expr2.ival);
            } else {
                ctx.cg.subeq_local(lflags, expr.ival as i32, expr2.ival);
            }
        }
        _ => ctx.internal("Invalid location in compound assignment"),
    }

    // The result is an rvalue in the primary.
    expr.finalize_rval_load();
}

/// Parse the assignment stratum.
pub fn hie1(ctx: &mut Context, expr: &mut ExprDesc) {
    hie_quest(ctx, expr);
    match ctx.toks.cur_kind() {
        TokenKind::Assign => assignment(ctx, expr),
        TokenKind::PlusAssign => addsubeq(ctx, &GEN_PASGN, expr, "+="),
        TokenKind::MinusAssign => addsubeq(ctx, &GEN_SASGN, expr, "-="),
        TokenKind::MulAssign => opeq(ctx, &GEN_MASGN, expr, "*="),
        TokenKind::DivAssign => opeq(ctx, &GEN_DASGN, expr, "/="),
        TokenKind::ModAssign => opeq(ctx, &GEN_MOASGN, expr, "%="),
        TokenKind::ShlAssign => opeq(ctx, &GEN_SLASGN, expr, "<<="),
        TokenKind::ShrAssign => opeq(ctx, &GEN_SRASGN, expr, ">>="),
        TokenKind::AndAssign => opeq(ctx, &GEN_AASGN, expr, "&="),
        TokenKind::XorAssign => opeq(ctx, &GEN_XOASGN, expr, "^="),
        TokenKind::OrAssign => opeq(ctx, &GEN_OASGN, expr, "|="),
        _ => {}
    }
}

/// Parse the comma stratum.
pub fn hie0(ctx: &mut Context, expr: &mut ExprDesc) {
    let keep_flags = expr.keep_subexpr_flags();
    let mut prev_error_count = ctx.diags.error_count();
    let mut start = ctx.cg.get_code_pos();

    hie1(ctx, expr);
    while ctx.toks.check(TokenKind::Comma) {
        // The comma is a sequence point.
        do_deferred(ctx, SeqPoint::KEEP_NONE, expr);

        // A discarded expression that emitted no code computed an unused
        // value; warn unless errors muddied the picture.
        let end = ctx.cg.get_code_pos();
        if !expr.may_have_no_effect()
            && ctx.cg.code_range_is_empty(&start, &end)
            && ctx.config.warn_no_effect
            && prev_error_count == ctx.diags.error_count()
        {
            ctx.warning("Expression result unused");
        }

        prev_error_count = ctx.diags.error_count();
        start = ctx.cg.get_code_pos();

        // Reset the expression for the next operand.
        *expr = ExprDesc::new();
        expr.flags = keep_flags;
        ctx.toks.advance();
        hie1(ctx, expr);
    }
}
