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

//! Function calls.
//!
//! Covers direct calls and calls through function pointers, the fastcall
//! convention (last argument in the primary register), pre-allocated
//! argument frames when larger-but-faster code is requested, default
//! argument promotion for variadic tails, wrapped calls, and a small table
//! of standard functions with specialised inline emission.

use crate::codegen::emit::EmitHelpers;
use crate::codegen::{func_type_code_of, type_code_of, CodeFlags, Codegen};
use crate::error::ErrorCode;
use crate::expr::deferred::{do_deferred, SeqPoint};
use crate::expr::desc::{ExprDesc, Loc};
use crate::expr::load::load_expr;
use crate::expr::typeconv::type_conversion;
use crate::expr::{assign, Context};
use crate::token::TokenKind;
use crate::types::{FuncType, Type};
use std::rc::Rc;

/// Handler for an inlineable standard function. Gets control after the
/// opening parenthesis and must consume up to and including the closing
/// one.
type StdFuncHandler = fn(&mut Context, &FuncType, &mut ExprDesc);

/// Standard functions with specialised emission.
static STD_FUNCS: &[(&str, StdFuncHandler)] = &[("strlen", std_strlen)];

fn find_std_func(name: &str) -> Option<StdFuncHandler> {
    STD_FUNCS
        .iter()
        .find(|(fname, _)| *fname == name)
        .map(|(_, handler)| *handler)
}

/// Inline emission for `strlen`.
fn std_strlen(ctx: &mut Context, _func: &FuncType, expr: &mut ExprDesc) {
    let mut arg = expr.sub_expr();
    assign::hie1(ctx, &mut arg);
    ctx.consume_rparen();

    if !arg.ty.is_class_ptr() {
        ctx.error(
            ErrorCode::IncompatibleTypes,
            format!("Argument of type '{}' where a pointer is expected", arg.ty),
        );
        expr.make_const_abs(0, Type::size_t());
        return;
    }

    // A pooled literal has a known length.
    if arg.is_const_addr()
        && arg.loc == Loc::Literal
        && arg.ival == 0
        && arg.code_range_is_empty(&ctx.cg)
    {
        if let Some(size) = ctx.lits.size_of_label(arg.label) {
            expr.make_const_abs(size as i64 - 1, Type::size_t());
            return;
        }
    }

    if arg.is_const_addr() && arg.code_range_is_empty(&ctx.cg) {
        // A statically addressable array: scan it in place.
        let name = arg.label_name();
        let loop_label = ctx.cg.get_local_label();
        let done_label = ctx.cg.get_local_label();
        ctx.cg.add_code_line("ldy #$00");
        ctx.cg.def_code_label(loop_label);
        ctx.cg.add_code_line(format!("lda {},y", name));
        ctx.cg
            .add_code_line(format!("beq {}", Codegen::local_label_name(done_label)));
        ctx.cg.add_code_line("iny");
        ctx.cg
            .add_code_line(format!("bne {}", Codegen::local_label_name(loop_label)));
        ctx.cg.def_code_label(done_label);
        ctx.cg.add_code_line("tya");
        ctx.cg.add_code_line("ldx #$00");
    } else {
        // Generic case: the pointer travels in the primary (fastcall).
        load_expr(ctx, CodeFlags::NONE, &mut arg);
        do_deferred(ctx, SeqPoint::KEEP_EAX, &arg);
        ctx.cg.call(CodeFlags::INT, "strlen", 0);
    }

    expr.finalize_rval_load();
    expr.ty = Type::size_t();
}

/// Parse a function argument list and pass the arguments to the called
/// function, either by pushing each one or by storing into a frame
/// allocated up front. Returns the size of the arguments in bytes.
fn function_param_list(
    ctx: &mut Context,
    func: &Rc<FuncType>,
    is_fastcall: bool,
    ed: &ExprDesc,
) -> u32 {
    let mut pushed_size = 0u32;
    let mut pushed_count = 0usize;
    let mut ellipsis = false;

    // As an optimization the whole parameter frame may be allocated at
    // once and each argument stored at its final offset. This trades size
    // for speed: fewer stack adjustments, but usually larger code. Only
    // worth considering with more than one frame-resident parameter.
    let mut frame_size = 0u32;
    let mut frame_offs = 0i32;
    if ctx.config.code_size_factor >= 200 {
        let mut frame_params = func.params.len();
        frame_size = func.param_size();
        if frame_params > 0 && is_fastcall {
            // The last parameter is not pushed into the frame.
            let last = &func.params[frame_params - 1];
            frame_size -= last.ty.decayed().size_of().max(1);
            frame_params -= 1;
        }
        if frame_params > 1 {
            frame_offs = ctx.cg.stack_ptr;
            ctx.cg.space(frame_size);
        } else {
            frame_size = 0;
        }
    }

    let mut expr = ExprDesc::new();
    while !ctx.toks.check(TokenKind::RParen) && !ctx.toks.at_eof() {
        expr = ed.sub_expr();
        pushed_count += 1;

        if pushed_count > func.params.len() && !ellipsis {
            if !func.variadic && !func.empty {
                ctx.error(
                    ErrorCode::TooManyArguments,
                    "Too many arguments in function call",
                );
            }
            // Assume an ellipsis even after errors, to avoid repeating the
            // message for every following argument.
            ellipsis = true;
        }

        // Evaluate the argument.
        assign::hie1(ctx, &mut expr);

        let mut flags = CodeFlags::NONE;
        if !ellipsis {
            // Convert the argument to the declared parameter type. With a
            // prototype, chars may be passed as chars.
            let param_type = func.params[pushed_count - 1].ty.decayed();
            type_conversion(ctx, &mut expr, &param_type);
            flags |= CodeFlags::FORCECHAR;
        } else {
            // Variadic tail: default argument promotion. Arrays and
            // functions decay; chars widen when pushed.
            expr.ty = expr.ty.decayed();
        }

        // Records travel as their replacement type when they fit a
        // register.
        if expr.ty.is_record() {
            flags |= type_code_of(&expr.ty.replacement_type());
        } else {
            flags |= type_code_of(&expr.ty);
        }

        // Bring the value into the primary if it is not already there.
        load_expr(ctx, flags, &mut expr);
        expr.finalize_rval_load();

        // For a fastcall function the last argument stays in the primary.
        let more_args = ctx.toks.check(TokenKind::Comma) && ctx.toks.next_kind() != TokenKind::RParen;
        if more_args || !is_fastcall {
            let arg_size = flags.sizeof_arg();
            if frame_size > 0 {
                // Space is already allocated; store at the final offset.
                // Invalid conversions flagged before may leave the frame
                // short, handle that gracefully instead of asserting.
                if frame_size >= arg_size {
                    frame_size -= arg_size;
                } else {
                    frame_size = 0;
                }
                frame_offs -= arg_size as i32;
                ctx.cg.put_local(flags | CodeFlags::NOKEEP, frame_offs, 0);
            } else {
                ctx.cg.push(flags, 0);
            }
            pushed_size += arg_size;
        }

        if !ctx.toks.eat(TokenKind::Comma) {
            break;
        }
        if ctx.toks.check(TokenKind::RParen) {
            ctx.error(
                ErrorCode::ArgumentExpectedAfterComma,
                "Argument expected after comma",
            );
            break;
        }

        // The comma between arguments is a sequence point.
        do_deferred(ctx, SeqPoint::KEEP_NONE, &expr);
    }

    // Settle deferred operations before the call itself; for a fastcall
    // function the last argument must survive in the primary.
    let what = if is_fastcall {
        SeqPoint::KEEP_EAX
    } else {
        SeqPoint::KEEP_NONE
    };
    do_deferred(ctx, what, &expr);

    if pushed_count < func.params.len() {
        ctx.error(
            ErrorCode::TooFewArguments,
            "Too few arguments in function call",
        );
    }

    // The leftover frame size compensates parameters that were never
    // stored after an error, keeping the stack bookkeeping intact.
    pushed_size + frame_size
}

/// Perform a function call. `expr` describes the callee; the current token
/// is the opening parenthesis.
pub fn function_call(ctx: &mut Context, expr: &mut ExprDesc) {
    // Skip the left paren.
    ctx.toks.advance();

    let func = match expr.ty.func_desc() {
        Some(func) => func,
        None => ctx.internal("Called object has no function descriptor"),
    };

    let is_func_ptr = expr.ty.is_func_ptr();
    let is_fastcall;
    let mut ptr_on_stack = false;
    let mut ptr_offs = 0i32;
    let mut mark = None;

    if is_func_ptr {
        // A fastcall function that has parameters. Note: a function
        // declared with an empty parameter list may be called with any
        // number of arguments and is treated as if it had parameters.
        is_fastcall = !func.variadic
            && (!func.params.is_empty() || func.empty)
            && (if ctx.config.auto_cdecl {
                expr.ty.indirect().is_qual_fastcall()
            } else {
                !expr.ty.indirect().is_qual_cdecl()
            });

        // If the pointer is not a compile-time address, evaluate it now
        // and save it on the stack, since calls may nest. Fastcall needs a
        // copy on the stack in any case because the primary carries the
        // last argument.
        ptr_on_stack = is_fastcall || !expr.is_const_addr();
        if ptr_on_stack {
            load_expr(ctx, CodeFlags::NONE, expr);
            expr.finalize_rval_load();

            mark = Some(ctx.cg.get_code_pos());
            ctx.cg.push(CodeFlags::PTR, 0);
            ptr_offs = ctx.cg.stack_ptr;
        }
    } else {
        // Check for known standard functions and inline them.
        if !expr.name.is_empty() && !expr.is_uneval() {
            if let Some(handler) = find_std_func(&expr.name) {
                handler(ctx, &func, expr);
                return;
            }
        }

        is_fastcall = !func.variadic
            && (if ctx.config.auto_cdecl {
                expr.ty.is_qual_fastcall()
            } else {
                !expr.ty.is_qual_cdecl()
            });
    }

    // Parse the argument list.
    let param_size = function_param_list(ctx, &func, is_fastcall, expr);

    ctx.consume_rparen();

    if is_func_ptr {
        let wrapped = expr
            .sym
            .as_ref()
            .and_then(|name| ctx.syms.find(name))
            .and_then(|sym| sym.wrapped_call.clone());
        if wrapped.is_some() {
            ctx.warning(
                "Calling a wrapped function via a pointer, wrapped-call will not be used",
            );
        }

        if !is_fastcall {
            if ptr_on_stack {
                if param_size == 0 {
                    // No arguments were pushed, so the pointer is still in
                    // the primary; the saved copy can go again.
                    if let Some(mark) = mark.take() {
                        ctx.cg.remove_code(&mark);
                    }
                    ptr_on_stack = false;
                } else {
                    ctx.cg.get_local(CodeFlags::PTR, ptr_offs);
                }
            } else {
                load_expr(ctx, CodeFlags::NONE, expr);
            }
            if func.variadic {
                ctx.cg
                    .add_code_line(format!("ldy #${:02X}", param_size as u8));
            }
            ctx.cg
                .callind(func_type_code_of(&expr.ty), param_size, ptr_offs);
        } else {
            // The primary holds the last argument; call through the saved
            // stack copy.
            ctx.cg.callind(CodeFlags::STACK, param_size, ptr_offs);
        }

        if ptr_on_stack {
            ctx.cg.drop_bytes(2);
        }
    } else {
        let wrapped = expr
            .sym
            .as_ref()
            .and_then(|name| ctx.syms.find(name))
            .and_then(|sym| sym.wrapped_call.clone());

        if func.variadic {
            ctx.cg
                .add_code_line(format!("ldy #${:02X}", param_size as u8));
        }

        if let Some(wc) = wrapped {
            // Store the wrapped-call datum and the original function
            // address in the zero-page slots the wrapper expects.
            let name = expr.name.clone();
            ctx.cg.add_code_line(format!("ldy #${:02X}", wc.data));
            ctx.cg.add_code_line("sty tmp4");
            ctx.cg.add_code_line(format!("ldy #<(_{})", name));
            ctx.cg.add_code_line("sty ptr4");
            ctx.cg.add_code_line(format!("ldy #>(_{})", name));
            ctx.cg.add_code_line("sty ptr4+1");
            ctx.cg
                .call(func_type_code_of(&expr.ty), &wc.wrapper, param_size);
        } else {
            let name = expr.name.clone();
            ctx.cg
                .call(func_type_code_of(&expr.ty), &name, param_size);
        }
    }

    // The result is an rvalue of the return type in the primary register.
    expr.finalize_rval_load();
    let ret = func.ret.clone();
    if ret.is_record() && ret == ret.replacement_type() {
        // No register-sized replacement: the call returned the address of
        // the record, dereference it.
        expr.ind_expr();
        expr.mark_rval();
    }
    expr.ty = ret;
}
