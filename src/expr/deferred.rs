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

//! Deferred post-increment/decrement operations.
//!
//! A post-increment on an addressable lvalue does not need to save and
//! restore the primary register: the in-memory mutation is queued here and
//! flushed at the next sequence point, in insertion order. The queue must
//! be empty at every statement boundary.

use bitflags::bitflags;

use crate::codegen::emit::EmitHelpers;
use crate::codegen::{type_code_of, CodeFlags};
use crate::expr::desc::{ExprDesc, Loc};
use crate::expr::{checked_size_of, global_mode_flags, Context};

/// Kind of a deferred operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredOpKind {
    Inc,
    Dec,
}

/// A queued post-increment/decrement: a snapshot of the lvalue descriptor
/// plus the operation kind.
#[derive(Debug, Clone)]
pub struct DeferredOp {
    pub expr: ExprDesc,
    pub kind: DeferredOpKind,
}

bitflags! {
    /// What must survive a sequence-point drain.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SeqPoint: u8 {
        /// Preserve the processor flags if the expression was tested.
        const KEEP_TEST = 1 << 0;
        /// Preserve the primary register if the expression lives there.
        const KEEP_EAX  = 1 << 1;
        /// Preserve whatever the expression needs.
        const KEEP_EXPR = Self::KEEP_TEST.bits() | Self::KEEP_EAX.bits();
    }
}

impl SeqPoint {
    /// Nothing needs to survive.
    pub const KEEP_NONE: SeqPoint = SeqPoint::empty();
}

/// Reset the deferred operation queue at function entry.
pub fn init_deferred_ops(ctx: &mut Context) {
    ctx.deferred.clear();
}

/// Tear down the deferred operation queue at function exit.
pub fn done_deferred_ops(ctx: &mut Context) {
    ctx.deferred.clear();
}

/// Queue a post-increment for the given lvalue.
pub fn defer_inc(ctx: &mut Context, expr: &ExprDesc) {
    if expr.is_uneval() {
        return;
    }
    ctx.deferred.push(DeferredOp {
        expr: expr.clone(),
        kind: DeferredOpKind::Inc,
    });
}

/// Queue a post-decrement for the given lvalue.
pub fn defer_dec(ctx: &mut Context, expr: &ExprDesc) {
    if expr.is_uneval() {
        return;
    }
    ctx.deferred.push(DeferredOp {
        expr: expr.clone(),
        kind: DeferredOpKind::Dec,
    });
}

/// Number of deferred operations still waiting in the queue.
pub fn get_deferred_op_count(ctx: &Context) -> usize {
    ctx.deferred.len()
}

/// Verify that all deferred operations were flushed at a statement
/// boundary. A non-empty queue is an internal error.
pub fn check_deferred_op_all_done(ctx: &Context) {
    if !ctx.deferred.is_empty() {
        ctx.internal("Code generation messed up: missing operations past sequence points");
    }
}

/// Emit one deferred increment or decrement against the stored location.
fn deferred_inc_dec(ctx: &mut Context, op: &DeferredOp) {
    let expr = &op.expr;
    let flags = type_code_of(&expr.ty)
        | global_mode_flags(ctx, expr)
        | CodeFlags::FORCECHAR
        | CodeFlags::CONST
        | CodeFlags::NOKEEP;

    // Pointers step by the size of the pointed-to type.
    let val = if expr.ty.is_ptr() {
        checked_size_of(ctx, &expr.ty.indirect()) as i64
    } else {
        1
    };

    match expr.loc {
        Loc::Abs | Loc::Global | Loc::Static | Loc::Literal | Loc::Register => {
            let name = expr.label_name();
            let offs = if expr.loc == Loc::Abs { 0 } else { expr.ival };
            match op.kind {
                DeferredOpKind::Inc => ctx.cg.addeq_static(flags, &name, offs, val),
                DeferredOpKind::Dec => ctx.cg.subeq_static(flags, &name, offs, val),
            }
        }
        Loc::Stack => match op.kind {
            DeferredOpKind::Inc => ctx.cg.addeq_local(flags, expr.ival as i32, val),
            DeferredOpKind::Dec => ctx.cg.subeq_local(flags, expr.ival as i32, val),
        },
        Loc::Primary => match op.kind {
            DeferredOpKind::Inc => ctx.cg.inc(flags, val),
            DeferredOpKind::Dec => ctx.cg.dec(flags, val),
        },
        Loc::Expr => match op.kind {
            DeferredOpKind::Inc => ctx.cg.addeq_ind(flags, expr.ival, val),
            DeferredOpKind::Dec => ctx.cg.subeq_ind(flags, expr.ival, val),
        },
        _ => ctx.internal("Invalid location in deferred operation"),
    }
}

/// Flush the deferred operation queue at a sequence point.
///
/// `expr` is the descriptor whose state must survive the drain: with
/// `KEEP_TEST` the processor flags are preserved if the expression was
/// tested, with `KEEP_EAX` the primary register is preserved if the
/// expression lives there.
pub fn do_deferred(ctx: &mut Context, what: SeqPoint, expr: &ExprDesc) {
    if ctx.deferred.is_empty() {
        return;
    }

    let keep_test = what.contains(SeqPoint::KEEP_TEST) && expr.needs_test();
    let keep_primary = what.contains(SeqPoint::KEEP_EAX) && expr.needs_primary();

    if keep_test {
        // A php/plp pair covers every case.
        ctx.cg.add_code_line("php");
    }

    let mut save_flags = CodeFlags::NONE;
    if keep_primary {
        let size = checked_size_of(ctx, &expr.ty);
        save_flags = match size {
            1 => CodeFlags::CHAR | CodeFlags::FORCECHAR,
            2 => CodeFlags::INT,
            _ => CodeFlags::LONG,
        };
        ctx.cg.save(save_flags);
    }

    let ops = std::mem::take(&mut ctx.deferred);
    for op in &ops {
        deferred_inc_dec(ctx, op);
    }

    if keep_primary {
        ctx.cg.restore(save_flags);
    }
    if keep_test {
        ctx.cg.add_code_line("plp");
    }
}
