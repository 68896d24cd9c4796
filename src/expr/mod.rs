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

//! The expression parser and code emitter.
//!
//! This module hosts the compilation context and the entry points of the
//! precedence cascade. One function per precedence level, numbered from
//! `hie0` (comma) up to `hie10` (unary), each consuming tokens and
//! returning its result through an [`ExprDesc`] while emitting code into
//! the context's code buffer.
//!
//! Every level runs under a stack-pointer consistency check: the virtual
//! stack pointer at entry must equal the one at exit, anything else is a
//! bug in the code generation.

pub mod assign;
pub mod binary;
pub mod call;
pub mod compare;
pub mod deferred;
pub mod desc;
pub mod load;
pub mod logical;
pub mod postfix;
pub mod primary;
pub mod typeconv;
pub mod unary;

pub use assign::{hie0, hie1};
pub use binary::{hie2, hie3, hie4, hie7, hie8, hie9};
pub use compare::{hie5, hie6};
pub use desc::{ExprDesc, ExprFlags, Loc, RefType};
pub use unary::hie10;

use crate::codegen::emit::EmitHelpers;
use crate::codegen::{type_code_of, CodeFlags, Codegen};
use crate::config::Config;
use crate::error::{Diagnostics, ErrorCode};
use crate::literals::LiteralPool;
use crate::sym::{FuncCtx, SymTable};
use crate::token::{TokenKind, TokenStream};
use crate::types::{arithmetic_convert, Type, TypeKind};
use deferred::{DeferredOp, SeqPoint};
use load::load_expr;

/// An expression parser function for one precedence level.
pub type ExprFn = fn(&mut Context, &mut ExprDesc);

/// The compilation context threaded through every parser function.
///
/// It bundles what the original design kept in process-wide state: the
/// token stream, the symbol tables, the code buffer, the deferred
/// operation queue, the diagnostics sink and the configuration.
pub struct Context {
    /// Token source.
    pub toks: TokenStream,
    /// Symbol environment.
    pub syms: SymTable,
    /// Code buffer and emitter state.
    pub cg: Codegen,
    /// Literal pool.
    pub lits: LiteralPool,
    /// Diagnostics sink.
    pub diags: Diagnostics,
    /// Compilation switches.
    pub config: Config,
    /// The function whose body is being compiled, if any.
    pub current_func: Option<FuncCtx>,
    /// Queue of deferred post-increment/decrement operations.
    pub(crate) deferred: Vec<DeferredOp>,
}

impl Context {
    /// Create a context over a token stream.
    pub fn new(toks: TokenStream, syms: SymTable, config: Config) -> Self {
        Self {
            toks,
            syms,
            cg: Codegen::new(),
            lits: LiteralPool::new(),
            diags: Diagnostics::new(),
            config,
            current_func: None,
            deferred: Vec::new(),
        }
    }

    /// Report a user error at the current token and continue.
    pub fn error(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.toks.span();
        self.diags.error(code, message, span);
    }

    /// Report a warning.
    pub fn warning(&mut self, message: impl Into<String>) {
        self.diags.warning(message);
    }

    /// Abort on an internal inconsistency. These are compiler bugs, not
    /// input errors.
    pub fn internal(&self, message: impl AsRef<str>) -> ! {
        panic!("internal error: {}", message.as_ref());
    }

    /// Consume a token of the given kind or report an error.
    pub fn consume(&mut self, kind: TokenKind, code: ErrorCode, message: &str) {
        if !self.toks.eat(kind) {
            self.error(code, message);
        }
    }

    /// Consume a closing parenthesis.
    pub fn consume_rparen(&mut self) {
        self.consume(TokenKind::RParen, ErrorCode::ExpectedCloseParen, "')' expected");
    }

    /// Consume a closing bracket.
    pub fn consume_rbracket(&mut self) {
        self.consume(
            TokenKind::RBracket,
            ErrorCode::ExpectedCloseBracket,
            "']' expected",
        );
    }

    /// Consume a colon.
    pub fn consume_colon(&mut self) {
        self.consume(TokenKind::Colon, ErrorCode::ExpectedColon, "':' expected");
    }
}

/// Return the location-class flags for the given expression.
pub fn global_mode_flags(ctx: &Context, expr: &ExprDesc) -> CodeFlags {
    match expr.loc {
        Loc::None => CodeFlags::IMM,
        Loc::Abs => CodeFlags::ABSOLUTE,
        Loc::Global => CodeFlags::EXTERNAL,
        Loc::Static => CodeFlags::STATIC,
        Loc::Register => CodeFlags::REGVAR,
        Loc::Stack => CodeFlags::STACK,
        Loc::Primary => CodeFlags::PRIMARY,
        Loc::Expr => CodeFlags::EXPR,
        Loc::Literal => CodeFlags::LITERAL,
        Loc::Code => CodeFlags::CODE,
        #[allow(unreachable_patterns)]
        _ => ctx.internal("global_mode_flags: invalid location"),
    }
}

/// Limit the constant value of the expression to the range of its type.
pub fn limit_expr_value(expr: &mut ExprDesc) {
    expr.ival = match &expr.ty.kind {
        TypeKind::Short | TypeKind::Int => expr.ival as i16 as i64,
        TypeKind::UShort | TypeKind::UInt | TypeKind::Ptr(_) | TypeKind::Array(..) => {
            expr.ival as u16 as i64
        }
        TypeKind::Long => expr.ival as i32 as i64,
        TypeKind::ULong => expr.ival as u32 as i64,
        TypeKind::Char | TypeKind::SChar => expr.ival as i8 as i64,
        TypeKind::UChar => expr.ival as u8 as i64,
        TypeKind::Bool => (expr.ival != 0) as i64,
        _ => expr.ival,
    };
}

/// Call an expression parser function with a stack-pointer consistency
/// check around it.
pub fn expr_with_check(ctx: &mut Context, func: ExprFn, expr: &mut ExprDesc) {
    let old_sp = ctx.cg.stack_ptr;
    func(ctx, expr);
    if ctx.cg.stack_ptr != old_sp {
        let message = format!(
            "Code generation messed up: stack pointer is {}, should be {}",
            ctx.cg.stack_ptr, old_sp
        );
        if ctx.config.debug {
            ctx.error(ErrorCode::CodeGenerationInconsistency, message);
            ctx.cg.stack_ptr = old_sp;
        } else {
            ctx.internal(message);
        }
    }
}

/// Call an expression parser function with checks and record the code range
/// of everything it emitted.
pub fn marked_expr_with_check(ctx: &mut Context, func: ExprFn, expr: &mut ExprDesc) {
    let start = ctx.cg.get_code_pos();
    expr_with_check(ctx, func, expr);
    let end = ctx.cg.get_code_pos();
    expr.set_code_range(start, end);
}

/// Adjust two operands of a binary operation to their common type and
/// return the code generator flags for the operation. The left side is
/// expected on the stack (or constant), the right side in the primary
/// register (or constant). With `nopush`, the left side is in the primary
/// register instead of on the stack.
pub fn typeadjust(ctx: &mut Context, lhs: &mut ExprDesc, rhs: &ExprDesc, nopush: bool) -> CodeFlags {
    let mut ltype = type_code_of(&lhs.ty);
    if lhs.is_const_abs_int() && ltype == CodeFlags::INT && lhs.ival >= 0 && lhs.ival < 256 {
        // An int constant that fits into a byte can use byte operations;
        // the emitter widens it again as the other operand requires.
        ltype = CodeFlags::CHAR | CodeFlags::UNSIGNED;
    }
    if lhs.is_loc_none() {
        ltype |= CodeFlags::CONST;
    }
    if nopush {
        ltype |= CodeFlags::PRIMARY;
    }

    let mut rtype = type_code_of(&rhs.ty);
    if rhs.is_const_abs_int() && rtype == CodeFlags::INT && rhs.ival >= 0 && rhs.ival < 256 {
        rtype = CodeFlags::CHAR | CodeFlags::UNSIGNED;
    }
    if rhs.is_loc_none() {
        rtype |= CodeFlags::CONST;
    }

    let flags = ctx.cg.typeadjust(ltype, rtype);
    lhs.ty = arithmetic_convert(&lhs.ty, &rhs.ty);
    flags
}

/// Check whether a type specifier is waiting in the token stream (helper
/// for casts and `sizeof`).
pub fn type_spec_ahead(ctx: &Context) -> bool {
    ctx.toks.check(TokenKind::LParen)
        && (ctx.toks.next_kind().is_type_start() || ctx.toks.next_kind().is_type_qual())
}

/// `sizeof` operand size with a diagnostic for incomplete types.
pub fn expr_checked_size_of(ctx: &mut Context, ty: &Type) -> u32 {
    let size = ty.size_of();
    if size == 0 {
        ctx.error(
            ErrorCode::SizeofIncompleteType,
            format!("Cannot apply 'sizeof' to incomplete type '{}'", ty),
        );
    }
    size
}

/// Size of a type with a diagnostic for incomplete types. Parsing
/// continues with a size of one.
pub fn checked_size_of(ctx: &mut Context, ty: &Type) -> u32 {
    let size = ty.size_of();
    if size == 0 {
        ctx.error(
            ErrorCode::SizeofIncompleteType,
            format!("Size of type '{}' is unknown", ty),
        );
        return 1;
    }
    size
}

/// Size of the type pointed to.
pub fn checked_psize_of(ctx: &mut Context, ty: &Type) -> u32 {
    checked_size_of(ctx, &ty.indirect())
}

/// If the expression contains an address that was computed at runtime,
/// push that address onto the stack so the lvalue survives evaluation of
/// an rhs.
pub fn push_addr(ctx: &mut Context, expr: &ExprDesc) {
    if expr.is_loc_expr() {
        ctx.cg.push(CodeFlags::PTR, 0);
    }
}

/// Warn when the result of a comparison is constant outside preprocessor
/// mode.
pub fn warn_const_compare_result(ctx: &mut Context, expr: &ExprDesc) {
    if !ctx.config.preprocessing && !expr.needs_const() && ctx.config.warn_const_comparison {
        let result = if expr.ival != 0 { "true" } else { "false" };
        ctx.warning(format!("Result of comparison is always {}", result));
    }
}

/// Commit the primary register back to the location denoted by the
/// descriptor, optionally with an overriding type.
pub fn store(ctx: &mut Context, expr: &mut ExprDesc, store_type: Option<&Type>) {
    let ty = store_type.unwrap_or(&expr.ty).clone();
    let flags = type_code_of(&ty) | global_mode_flags(ctx, expr);

    match expr.loc {
        Loc::Abs => {
            let name = expr.label_name();
            ctx.cg.put_static(flags, &name, 0);
        }
        Loc::Global | Loc::Static | Loc::Register | Loc::Literal | Loc::Code => {
            let name = expr.label_name();
            ctx.cg.put_static(flags, &name, expr.ival);
        }
        Loc::Stack => {
            ctx.cg.put_local(flags, expr.ival as i32, 0);
        }
        Loc::Primary => {
            // Value is already there.
        }
        Loc::Expr => {
            ctx.cg.put_ind(flags, expr.ival);
        }
        Loc::None => {
            // Can happen after previous errors; nothing to do.
        }
        #[allow(unreachable_patterns)]
        _ => ctx.internal("Invalid location in store()"),
    }

    // Each store invalidates the condition codes.
    expr.mark_as_untested();
}

/// Parse a full expression, load the result into the primary register and
/// settle all deferred operations.
pub fn expression0(ctx: &mut Context, expr: &mut ExprDesc) {
    expr_with_check(ctx, hie0, expr);
    if expr.yet_to_load() {
        load_expr(ctx, CodeFlags::NONE, expr);
    }
    deferred::do_deferred(ctx, SeqPoint::KEEP_EXPR, expr);
}

/// Evaluate an expression via the given function and enforce that the
/// result is boolean-convertible.
pub fn bool_expr(ctx: &mut Context, func: ExprFn, expr: &mut ExprDesc) {
    expr_with_check(ctx, func, expr);
    if !expr.is_bool() {
        ctx.error(ErrorCode::ScalarExpressionExpected, "Scalar expression expected");
        expr.make_const_bool(1);
    }
}

/// Evaluate an expression that must be constant and must not have emitted
/// any code.
pub fn no_code_const_expr(ctx: &mut Context, func: ExprFn) -> ExprDesc {
    let mut expr = ExprDesc::new();
    expr.flags |= ExprFlags::CCONST;
    marked_expr_with_check(ctx, func, &mut expr);
    if !expr.is_const() || !expr.code_range_is_empty(&ctx.cg) {
        ctx.error(
            ErrorCode::ConstantExpressionExpected,
            "Constant expression expected",
        );
        expr.make_const_abs_int(1);
    }
    expr
}

/// Evaluate an expression that must be a numeric integer constant and must
/// not have emitted any code.
pub fn no_code_const_abs_int_expr(ctx: &mut Context, func: ExprFn) -> ExprDesc {
    let mut expr = ExprDesc::new();
    expr.flags |= ExprFlags::CCONST;
    marked_expr_with_check(ctx, func, &mut expr);
    if !expr.is_const_abs_int() || !expr.code_range_is_empty(&ctx.cg) {
        ctx.error(
            ErrorCode::ConstantIntegerExpressionExpected,
            "Constant integer expression expected",
        );
        expr.make_const_abs_int(1);
    }
    expr
}
