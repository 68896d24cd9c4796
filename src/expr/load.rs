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

//! Loading an expression into the primary register.
//!
//! Depending on the descriptor this loads a constant, the content of a
//! statically addressable object, a stack slot, or the object behind the
//! pointer in the primary; address-of descriptors load the address
//! instead. Bit-fields are extracted with a shift and mask. When a test
//! was requested, the condition codes are left reflecting the value.

use crate::codegen::emit::EmitHelpers;
use crate::codegen::{type_code_of, CodeFlags};
use crate::expr::desc::{ExprDesc, Loc};
use crate::expr::Context;

/// Load the value described by `expr` into the primary register.
///
/// `flags` may force a width; with `NONE` the width comes from the
/// expression type. The descriptor itself is not changed; callers decide
/// whether to finalize it as an rvalue in the primary.
pub fn load_expr(ctx: &mut Context, flags: CodeFlags, expr: &mut ExprDesc) {
    // In unevaluated contexts loads are side-effect free and can simply be
    // skipped; the peephole rollback removes anything else.
    if expr.is_uneval() {
        return;
    }

    let mut flags = flags;
    if flags.width_flags().is_empty() {
        flags |= type_code_of(&expr.ty);
        if flags.contains(CodeFlags::FORCECHAR) && !expr.ty.is_char_type() {
            flags &= !CodeFlags::FORCECHAR;
        }
    }

    if expr.is_bit_field() {
        // Load the whole storage unit, move the field down and mask it.
        load_value(ctx, CodeFlags::INT | CodeFlags::UNSIGNED, expr);
        if expr.bit_offs > 0 {
            ctx.cg.asr(
                CodeFlags::INT | CodeFlags::UNSIGNED | CodeFlags::CONST,
                expr.bit_offs as i64,
            );
        }
        if (expr.bit_offs + expr.bit_width) < 16 {
            ctx.cg.and(
                CodeFlags::INT | CodeFlags::UNSIGNED | CodeFlags::CONST,
                (1i64 << expr.bit_width) - 1,
            );
        }
    } else if expr.is_addr_expr() {
        load_address(ctx, expr);
    } else {
        load_value(ctx, flags, expr);
    }

    if expr.needs_test() && !expr.is_tested() {
        // Loads go through A/X and leave the flags matching A only; force
        // a full test.
        ctx.cg.test(flags);
        expr.test_done();
    }
}

/// Load the address denoted by an address-of descriptor.
fn load_address(ctx: &mut Context, expr: &ExprDesc) {
    match expr.loc {
        Loc::None | Loc::Abs => {
            // A numeric address.
            ctx.cg
                .get_immed(CodeFlags::PTR | CodeFlags::CONST, expr.ival);
        }
        Loc::Global | Loc::Static | Loc::Register | Loc::Literal | Loc::Code => {
            let name = expr.label_name();
            ctx.cg.get_immed_addr(CodeFlags::PTR, &name, expr.ival);
        }
        Loc::Stack => {
            ctx.cg.lea_local(expr.ival as i32);
        }
        Loc::Primary => {
            // Address is already in the primary.
        }
        Loc::Expr => {
            // Address is in the primary; apply a pending offset.
            if expr.ival != 0 {
                ctx.cg
                    .inc(CodeFlags::PTR | CodeFlags::CONST, expr.ival);
            }
        }
    }
}

/// Load the content of the location described by `expr`.
fn load_value(ctx: &mut Context, flags: CodeFlags, expr: &ExprDesc) {
    match expr.loc {
        Loc::None => {
            ctx.cg.get_immed(flags | CodeFlags::CONST, expr.ival);
        }
        Loc::Abs => {
            let name = expr.label_name();
            ctx.cg.get_static(flags, &name, 0);
        }
        Loc::Global | Loc::Static | Loc::Register | Loc::Literal | Loc::Code => {
            let name = expr.label_name();
            ctx.cg.get_static(flags, &name, expr.ival);
        }
        Loc::Stack => {
            ctx.cg.get_local(flags, expr.ival as i32);
        }
        Loc::Primary => {
            // Already loaded.
        }
        Loc::Expr => {
            ctx.cg.ind_load(flags, expr.ival);
        }
    }
}
