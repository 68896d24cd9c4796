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

//! The postfix chain: array subscripts, member access and function calls
//! applied to a primary expression.

use crate::codegen::emit::EmitHelpers;
use crate::codegen::{type_code_of, CodeFlags};
use crate::error::ErrorCode;
use crate::expr::call::function_call;
use crate::expr::desc::{ExprDesc, Loc};
use crate::expr::load::load_expr;
use crate::expr::primary::primary;
use crate::expr::{assign, checked_size_of, global_mode_flags, marked_expr_with_check, Context};
use crate::token::TokenKind;
use crate::types::{Qualifiers, Type};

/// Compose the qualifiers of a containing object onto an element type.
fn qualify(ty: Type, quals: Qualifiers) -> Type {
    if ty.quals.contains(quals) {
        ty
    } else {
        ty.with_quals(quals)
    }
}

/// Handle an array subscript.
fn array_ref(ctx: &mut Context, expr: &mut ExprDesc) {
    let mut subscript = expr.sub_expr();

    // Skip the bracket.
    ctx.toks.advance();

    // The type of the left side before any loads.
    let lhs_type = expr.ty.clone();

    // Arrays with a quasi-constant base address produce much better code:
    // the address fetch is delayed, and a constant subscript folds into an
    // immediate offset.
    let mut const_base_addr = expr.is_rval() && expr.is_loc_quasi_const();

    let mark1 = ctx.cg.get_code_pos();
    if !const_base_addr {
        // Get a pointer to the array into the primary.
        load_expr(ctx, CodeFlags::NONE, expr);
    }
    let mut mark2 = ctx.cg.get_code_pos();
    if !const_base_addr {
        // Put the array pointer on the stack for the subscript.
        ctx.cg.push(CodeFlags::PTR, 0);
    }

    // The subscript is a full expression of its own.
    marked_expr_with_check(ctx, assign::hie0, &mut subscript);

    // One side must be of pointer/array class, the other of integer class.
    let mut qualifiers = Qualifiers::empty();
    let element_type;
    if expr.ty.is_class_ptr() {
        if !subscript.ty.is_class_int() {
            ctx.error(
                ErrorCode::SubscriptNotAnInteger,
                "Array subscript is not an integer",
            );
            subscript.make_const_abs_int(0);
        }
        if expr.ty.is_array() {
            qualifiers = expr.ty.quals;
        }
        element_type = expr.ty.indirect();
    } else if expr.ty.is_class_int() {
        if !subscript.ty.is_class_ptr() {
            ctx.error(
                ErrorCode::SubscriptNotAPointer,
                "Subscripted value is neither array nor pointer",
            );
            subscript.make_const_abs(0, Type::char_array(1));
        } else if subscript.ty.is_array() {
            qualifiers = subscript.ty.quals;
        }
        element_type = subscript.ty.indirect();
    } else {
        ctx.error(ErrorCode::CannotSubscript, "Cannot subscript");
        expr.make_const_abs(0, Type::char_array(1));
        subscript.make_const_abs_int(0);
        element_type = expr.ty.indirect();
    }

    // The element carries the qualifiers of the array it is a member of.
    let element_type = qualify(element_type, qualifiers);
    let element_size = checked_size_of(ctx, &element_type);

    // A bit-field subscript must be rvaluated first.
    if subscript.is_bit_field() {
        load_expr(ctx, CodeFlags::NONE, &mut subscript);
        subscript.finalize_rval_load();
    }

    if subscript.is_const_abs() && subscript.code_range_is_empty(&ctx.cg) {
        // Constant subscript: the element address folds to base+offset.
        if !const_base_addr {
            // Undo the push of the array address.
            ctx.cg.remove_code(&mark2);
        } else {
            load_expr(ctx, CodeFlags::NONE, expr);
        }

        if expr.ty.is_class_ptr() {
            // Scale the subscript by the element size.
            subscript.ival *= element_size as i64;

            // Remove the address load; the offset rides in the descriptor.
            ctx.cg.remove_code(&mark1);

            if !expr.ty.is_array() {
                // A pointer must still be loaded, its value is not static.
                if !const_base_addr && expr.is_lval() {
                    load_expr(ctx, CodeFlags::NONE, expr);
                    expr.finalize_rval_load();
                }
            }

            expr.ival += subscript.ival;
        } else {
            // Integer on the left: it was loaded, scale it and add the
            // pointer constant.
            ctx.cg.scale(type_code_of(&lhs_type), element_size as i64);
            ctx.cg
                .inc(CodeFlags::INT | CodeFlags::CONST, subscript.ival);
            expr.finalize_rval_load();
        }
    } else {
        // The subscript is not constant; load it.
        mark2 = ctx.cg.get_code_pos();
        load_expr(ctx, CodeFlags::NONE, &mut subscript);

        if expr.ty.is_class_ptr() {
            // Scale the subscript in the primary.
            ctx.cg.scale(CodeFlags::INT, element_size as i64);
        } else {
            // The integer is the left side; get it on top and scale it.
            if const_base_addr {
                ctx.cg.push(CodeFlags::INT, 0);
                load_expr(ctx, CodeFlags::NONE, expr);
                const_base_addr = false;
            } else {
                ctx.cg.swap(CodeFlags::INT);
            }
            ctx.cg.scale(type_code_of(&lhs_type), element_size as i64);
        }

        if !const_base_addr {
            // Base address on stack, offset in the primary.
            ctx.cg.add(CodeFlags::INT, 0);
        } else if subscript.is_loc_quasi_const() && element_size == 1 {
            // Reversing the evaluation favours a one-byte add if the
            // subscript is itself statically addressable.
            let flags = if checked_size_of(ctx, &subscript.ty) == 1 {
                CodeFlags::CHAR
            } else {
                CodeFlags::INT
            };
            ctx.cg.remove_code(&mark2);

            // Get the array address into the primary and add the variable.
            load_expr(ctx, CodeFlags::NONE, expr);
            if subscript.is_loc_stack() {
                ctx.cg.add_local(flags, subscript.ival as i32);
            } else {
                let flags = flags | global_mode_flags(ctx, &subscript);
                let name = subscript.label_name();
                ctx.cg.add_static(flags, &name, subscript.ival);
            }
        } else if expr.is_loc_none() || (expr.is_loc_abs() && expr.is_addr_expr()) {
            // Constant numeric address.
            ctx.cg.inc(CodeFlags::INT | CodeFlags::CONST, expr.ival);
        } else if expr.is_loc_stack() {
            if expr.is_addr_expr() {
                ctx.cg.add_addr_local(CodeFlags::INT, expr.ival as i32);
            } else {
                ctx.cg.add_local(CodeFlags::PTR, expr.ival as i32);
            }
        } else {
            let flags = CodeFlags::INT | global_mode_flags(ctx, expr);
            let name = expr.label_name();
            if expr.is_addr_expr() {
                // Add the address of the location.
                ctx.cg.add_addr_static(flags, &name, expr.ival);
            } else {
                // Add the contents of the location.
                ctx.cg.add_static(flags, &name, expr.ival);
            }
        }

        // The element address is an rvalue in the primary.
        expr.finalize_rval_load();
    }

    // The result references the element; arrays decay to addresses again.
    expr.ind_expr();
    expr.ty = element_type;
    if expr.ty.is_array() {
        expr.addr_expr();
    }

    ctx.consume_rbracket();
}

/// Process a struct/union field after `.` or `->`.
fn struct_ref(ctx: &mut Context, expr: &mut ExprDesc) {
    // Skip the token and check for an identifier.
    ctx.toks.advance();
    if !ctx.toks.check(TokenKind::Ident) {
        ctx.error(ErrorCode::ExpectedIdentifier, "Identifier expected");
        expr.make_const_abs(0, Type::int());
        return;
    }
    let field_name = ctx.toks.cur().ident.clone();
    ctx.toks.advance();

    // Find the record and the named field on it.
    let record = if expr.ty.is_record() {
        expr.ty.record_desc()
    } else if expr.ty.is_class_ptr() {
        expr.ty.indirect().record_desc()
    } else {
        None
    };
    let field = record.as_ref().and_then(|r| r.field(&field_name).cloned());
    let field = match field {
        Some(field) => field,
        None => {
            ctx.error(
                ErrorCode::NoSuchField,
                format!("No field named '{}' found in '{}'", field_name, expr.ty),
            );
            expr.make_const_abs(0, Type::int());
            return;
        }
    };

    // A struct/union is usually an lvalue; an rvalue in the primary is the
    // register-sized result of a function call or assignment.
    let rval_in_primary = expr.is_rval()
        && expr.is_loc_primary()
        && expr.ty == expr.ty.replacement_type();

    if expr.ty.is_ptr() || rval_in_primary {
        if !expr.is_const() && !expr.is_loc_primary() {
            // A pointer not in the primary yet: load its content now.
            load_expr(ctx, CodeFlags::NONE, expr);
            expr.ival = 0;
            expr.finalize_rval_load();
        }
        expr.ind_expr();
    } else if !expr.is_loc_quasi_const() && !expr.is_loc_primary_or_expr() {
        load_expr(ctx, CodeFlags::NONE, expr);
    }

    // The loads above may have set the condition codes.
    expr.mark_as_untested();

    // The field type carries the record's qualifiers.
    let quals = if expr.ty.is_record() {
        expr.ty.quals
    } else if expr.ty.is_class_ptr() {
        expr.ty.indirect().quals
    } else {
        Qualifiers::empty()
    };
    let final_type = qualify(field.ty.clone(), quals);

    if expr.is_rval() && expr.is_loc_primary() && !expr.ty.is_ptr() {
        // The whole record is in the primary register; extract the field
        // with a shift and mask computed from its position.
        let record_size = checked_size_of(ctx, &expr.ty);
        let flags = match record_size {
            1 => CodeFlags::CHAR | CodeFlags::UNSIGNED | CodeFlags::CONST,
            2 => CodeFlags::INT | CodeFlags::UNSIGNED | CodeFlags::CONST,
            3 | 4 => CodeFlags::LONG | CodeFlags::UNSIGNED | CodeFlags::CONST,
            _ => ctx.internal(format!("Invalid record size: {}", record_size)),
        };

        let mut bit_offs = field.offs * 8;
        if let Some(bit) = field.bit {
            bit_offs += bit.offs as u32;
            ctx.cg.asr(flags, bit_offs as i64);
            let field_bits = field.ty.size_of() * 8;
            if bit_offs + bit.width as u32 != field_bits {
                ctx.cg.and(
                    CodeFlags::INT | CodeFlags::UNSIGNED | CodeFlags::CONST,
                    (1i64 << bit.width) - 1,
                );
            }
        } else {
            ctx.cg.asr(flags, bit_offs as i64);
        }

        expr.ty = final_type;
    } else {
        // The expression references the field at base + offset.
        expr.ival += field.offs as i64;
        expr.ty = final_type;

        // Array fields become address-of rvalues like array variables do.
        if expr.ty.is_array() {
            expr.addr_expr();
        }

        if let Some(bit) = field.bit {
            expr.make_bit_field(bit.offs, bit.width);
        }
    }
}

/// Parse a postfix chain: subscripts, calls and member accesses applied to
/// a primary expression.
pub fn hie11(ctx: &mut Context, expr: &mut ExprDesc) {
    // Evaluate the primary.
    primary(ctx, expr);

    loop {
        match ctx.toks.cur_kind() {
            TokenKind::LBracket => {
                array_ref(ctx, expr);
            }

            TokenKind::LParen => {
                if !expr.ty.is_func() && !expr.ty.is_func_ptr() {
                    ctx.error(ErrorCode::IllegalFunctionCall, "Illegal function call");
                    // Assume an implicitly declared function to continue.
                    expr.make_const_abs(0, Type::implicit_func());
                    expr.name = "illegal_function_call".into();
                    expr.loc = Loc::Global;
                    expr.flags |= crate::expr::ExprFlags::ADDRESS_OF;
                }
                function_call(ctx, expr);
            }

            TokenKind::Dot => {
                if !expr.ty.is_record() {
                    ctx.error(ErrorCode::StructExpected, "Struct or union expected");
                }
                struct_ref(ctx, expr);
            }

            TokenKind::Arrow => {
                // An array of records decays to a pointer first.
                if expr.ty.is_array() {
                    expr.ty = expr.ty.array_to_ptr();
                }
                if !expr.ty.is_class_ptr() || !expr.ty.indirect().is_record() {
                    ctx.error(
                        ErrorCode::StructPointerExpected,
                        "Struct pointer or union pointer expected",
                    );
                }
                struct_ref(ctx, expr);
            }

            _ => break,
        }
    }
}
