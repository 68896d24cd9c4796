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

//! Type conversions.
//!
//! Implicit conversions (assignment context, argument passing, ternary
//! branches) with their diagnostics, explicit casts, and the small
//! type-specifier recogniser used by casts and `sizeof (type)`.

use crate::codegen::emit::EmitHelpers;
use crate::codegen::{type_code_of, CodeFlags};
use crate::error::ErrorCode;
use crate::expr::desc::ExprDesc;
use crate::expr::load::load_expr;
use crate::expr::{limit_expr_value, unary, Context};
use crate::token::TokenKind;
use crate::types::{type_cmp, Qualifiers, Type, TypeCmp};

/// Parse a type specifier: qualifiers, basic type words and trailing
/// pointer stars. The current token must be the first word of the
/// specifier. Returns `None` if no type could be recognised.
pub fn parse_type_spec(ctx: &mut Context) -> Option<Type> {
    let mut quals = Qualifiers::empty();
    let mut signed = false;
    let mut unsigned = false;
    let mut base: Option<TokenKind> = None;
    let mut long_count = 0;
    let mut any = false;

    loop {
        let kind = ctx.toks.cur_kind();
        match kind {
            TokenKind::KwConst => quals |= Qualifiers::CONST,
            TokenKind::KwVolatile => quals |= Qualifiers::VOLATILE,
            TokenKind::KwRestrict => quals |= Qualifiers::RESTRICT,
            TokenKind::KwSigned => signed = true,
            TokenKind::KwUnsigned => unsigned = true,
            TokenKind::KwLong => long_count += 1,
            TokenKind::KwVoid | TokenKind::KwBool | TokenKind::KwChar | TokenKind::KwShort
            | TokenKind::KwInt => base = Some(kind),
            _ => break,
        }
        any = true;
        ctx.toks.advance();
    }

    if !any {
        return None;
    }

    let mut ty = match base {
        Some(TokenKind::KwVoid) => Type::void(),
        Some(TokenKind::KwBool) => Type::bool_(),
        Some(TokenKind::KwChar) => {
            if unsigned {
                Type::uchar()
            } else if signed {
                Type::schar()
            } else {
                Type::char_()
            }
        }
        Some(TokenKind::KwShort) => {
            if unsigned {
                Type::ushort()
            } else {
                Type::short()
            }
        }
        _ => {
            if long_count > 0 {
                if unsigned {
                    Type::ulong()
                } else {
                    Type::long()
                }
            } else if unsigned {
                Type::uint()
            } else {
                Type::int()
            }
        }
    };
    ty = ty.with_quals(quals);

    // Pointer declarators, possibly qualified.
    while ctx.toks.eat(TokenKind::Star) {
        ty = ty.ptr_to();
        let mut ptr_quals = Qualifiers::empty();
        loop {
            match ctx.toks.cur_kind() {
                TokenKind::KwConst => ptr_quals |= Qualifiers::CONST,
                TokenKind::KwVolatile => ptr_quals |= Qualifiers::VOLATILE,
                TokenKind::KwRestrict => ptr_quals |= Qualifiers::RESTRICT,
                _ => break,
            }
            ctx.toks.advance();
        }
        ty = ty.with_quals(ptr_quals);
    }

    Some(ty)
}

/// Emit or fold the conversion of `expr` to `target`; the type checks must
/// have happened before.
fn do_conversion(ctx: &mut Context, expr: &mut ExprDesc, target: &Type) {
    if target.is_void() {
        expr.ty = target.clone();
        return;
    }

    if expr.is_const_abs() {
        // Compile-time conversion: re-limit the value in the new type.
        expr.ty = target.clone();
        limit_expr_value(expr);
        return;
    }

    let old = type_code_of(&expr.ty);
    let new = type_code_of(target);
    if new.width() > old.width() {
        // Widening needs the value in the primary register.
        load_expr(ctx, CodeFlags::NONE, expr);
        expr.finalize_rval_load();
        ctx.cg.typecast(new, old);
    }
    expr.ty = target.clone();
}

/// Convert an expression to the given type in an implicit context
/// (assignment, argument passing, return), diagnosing suspect mixes.
pub fn type_conversion(ctx: &mut Context, expr: &mut ExprDesc, target: &Type) {
    let source = expr.ty.clone();

    if target.is_class_int() && source.is_class_int() {
        // Fine, integer conversions are always allowed.
    } else if target.is_class_ptr() && source.is_class_ptr() {
        let l = target.indirect();
        let r = source.indirect();
        if type_cmp(&l, &r) < TypeCmp::QualDiff && !l.is_void() && !r.is_void() {
            ctx.warning(format!(
                "Incompatible pointer conversion from '{}' to '{}'",
                source, target
            ));
        }
    } else if target.is_class_ptr() && source.is_class_int() {
        if !expr.is_null_ptr() {
            ctx.warning(format!(
                "Converting integer '{}' to pointer '{}' without a cast",
                source, target
            ));
        }
    } else if target.is_class_int() && source.is_class_ptr() {
        ctx.warning(format!(
            "Converting pointer '{}' to integer '{}' without a cast",
            source, target
        ));
    } else if target.is_record() || source.is_record() {
        if type_cmp(target, &source) < TypeCmp::QualDiff {
            ctx.error(
                ErrorCode::IncompatibleTypes,
                format!("Incompatible types converting '{}' to '{}'", source, target),
            );
            return;
        }
    } else if target.is_void() {
        // Casting away a value is always fine.
    } else if source.is_func() && target.is_class_ptr() {
        // Function decays to function pointer.
    } else {
        ctx.error(
            ErrorCode::IncompatibleTypes,
            format!("Incompatible types converting '{}' to '{}'", source, target),
        );
        return;
    }

    do_conversion(ctx, expr, target);
}

/// Parse and apply an explicit cast. The current token is the opening
/// parenthesis of the cast.
pub fn type_cast(ctx: &mut Context, expr: &mut ExprDesc) {
    ctx.toks.advance();
    let target = match parse_type_spec(ctx) {
        Some(ty) => ty,
        None => {
            ctx.error(ErrorCode::ExpressionExpected, "Type expected");
            Type::int()
        }
    };
    ctx.consume_rparen();

    // The operand of a cast is a unary expression.
    unary::hie10(ctx, expr);

    if !target.is_void()
        && !target.is_scalar()
        && type_cmp(&target, &expr.ty) < TypeCmp::QualDiff
    {
        ctx.error(
            ErrorCode::IncompatibleTypes,
            format!("Cannot cast '{}' to '{}'", expr.ty, target),
        );
        return;
    }

    do_conversion(ctx, expr, &target);
    // A cast always yields a value, not an object.
    expr.mark_rval();
}
