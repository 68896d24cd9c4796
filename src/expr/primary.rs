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

//! Primary expressions, the lowest level of the cascade.
//!
//! Recognised here: integer/character/floating constants, parenthesised
//! subexpressions, identifiers with their storage-class dependent
//! locations, string literals, inline assembly, the register
//! pseudo-variables, and the computed-goto label-address extension.
//! Unknown identifiers followed by `(` become implicitly declared
//! functions.

use crate::codegen::emit::EmitHelpers;
use crate::config::Standard;
use crate::error::ErrorCode;
use crate::expr::desc::{ExprDesc, Loc};
use crate::expr::{assign, Context};
use crate::sym::SymEntry;
use crate::token::TokenKind;
use crate::types::Type;

/// Fill `expr` from the symbol table entry for an identifier.
fn ident_expr(ctx: &mut Context, expr: &mut ExprDesc, name: &str) {
    let sym = match ctx.syms.find(name) {
        Some(sym) => sym.clone(),
        None => {
            unknown_ident(ctx, expr, name);
            return;
        }
    };

    // Skip the name token.
    ctx.toks.advance();

    // Mark the symbol as referenced.
    if let Some(entry) = ctx.syms.find_mut(name) {
        entry.flags |= crate::sym::StorageClass::REF;
    }

    expr.sym = Some(sym.name.clone());
    expr.ty = sym.ty.clone();

    if sym.is_const() {
        // Enumerator or other numeric constant.
        expr.loc = Loc::None;
        expr.mark_rval();
        expr.ival = sym.const_val;
    } else if sym.is_func() {
        expr.loc = Loc::Global;
        expr.mark_lval();
        expr.name = sym.name.clone();
    } else if sym.is_auto() {
        let variadic = ctx
            .current_func
            .as_ref()
            .map(|f| f.variadic)
            .unwrap_or(false);
        if sym.is_param() && variadic {
            // Parameters of variadic functions sit on the far side of the
            // variadic tail; compute their address at runtime.
            let param_size = ctx.current_func.as_ref().map(|f| f.param_size).unwrap_or(0);
            ctx.cg.lea_variadic(sym.offs - param_size as i32);
            expr.loc = Loc::Expr;
            expr.mark_lval();
        } else {
            expr.loc = Loc::Stack;
            expr.mark_lval();
            expr.ival = sym.offs as i64;
        }
    } else if sym.is_register() {
        expr.loc = Loc::Register;
        expr.mark_lval();
        expr.label = sym.reg_offs as u32;
    } else if sym.is_extern() {
        expr.loc = Loc::Global;
        expr.mark_lval();
        expr.name = sym.name.clone();
    } else if sym.is_static() {
        expr.loc = Loc::Static;
        expr.mark_lval();
        expr.label = sym.label;
    } else {
        ctx.error(
            ErrorCode::VariableIdentifierExpected,
            "Variable identifier expected",
        );
        expr.loc = Loc::Stack;
        expr.mark_lval();
        expr.ty = Type::int();
        return;
    }

    // Arrays and functions denote the address of their first byte; they
    // become address-of rvalues.
    if expr.ty.is_array() || expr.ty.is_func() {
        expr.addr_expr();
    }
}

/// Handle an identifier without a symbol table entry: an auto-declared
/// function or an undefined variable.
fn unknown_ident(ctx: &mut Context, expr: &mut ExprDesc, name: &str) {
    let name = name.to_string();
    ctx.toks.advance();

    if ctx.toks.check(TokenKind::LParen) {
        // Calls to undeclared functions get an implicit declaration of a
        // function returning int; C99 made that an error.
        if ctx.config.standard >= Standard::C99 {
            ctx.error(
                ErrorCode::UndeclaredFunction,
                format!("Call to undeclared function '{}'", name),
            );
        } else {
            ctx.warning(format!("Call to undeclared function '{}'", name));
        }
        let sym = SymEntry::func(name.clone(), Type::implicit_func());
        ctx.syms.add_global(sym);
        expr.ty = Type::implicit_func();
        expr.loc = Loc::Global;
        expr.mark_rval();
        expr.name = name;
    } else {
        ctx.error(
            ErrorCode::UndefinedSymbol,
            format!("Undefined symbol: '{}'", name),
        );
        ctx.syms.add_local(SymEntry::auto(name.clone(), Type::int(), 0));
        expr.ty = Type::int();
        expr.loc = Loc::Stack;
        expr.mark_lval();
        expr.ival = 0;
    }
}

/// Parse a primary expression into `expr`.
pub fn primary(ctx: &mut Context, expr: &mut ExprDesc) {
    let kind = ctx.toks.cur_kind();

    // Character and integer constants.
    if kind == TokenKind::IntConst || kind == TokenKind::CharConst {
        expr.ival = ctx.toks.cur().ival;
        expr.ty = ctx.toks.cur().ty.clone();
        expr.loc = Loc::None;
        expr.mark_rval();
        ctx.toks.advance();
        return;
    }

    // Floating constants are captured but not otherwise supported.
    if kind == TokenKind::FloatConst {
        expr.fval = ctx.toks.cur().fval;
        expr.ty = ctx.toks.cur().ty.clone();
        expr.loc = Loc::None;
        expr.mark_rval();
        ctx.toks.advance();
        return;
    }

    // Parenthesised subexpression: the whole parser, recursively.
    if kind == TokenKind::LParen {
        ctx.toks.advance();
        assign::hie0(ctx, expr);
        ctx.consume_rparen();
        return;
    }

    // Inside #if expressions an unknown identifier is an undefined macro
    // and reads as zero; everything else is illegal there.
    if ctx.config.preprocessing {
        if kind == TokenKind::Ident {
            ctx.toks.advance();
            expr.make_const_abs_int(0);
            return;
        }
        ctx.error(
            ErrorCode::PreprocessorExpressionExpected,
            "Preprocessor expression expected",
        );
        ctx.toks.advance();
        expr.make_const_abs_int(1);
        return;
    }

    match kind {
        TokenKind::BoolAnd => {
            // A computed goto label address.
            if ctx.config.standard >= Standard::Extended {
                ctx.toks.advance();
                if ctx.toks.check(TokenKind::Ident) {
                    let name = ctx.toks.cur().ident.clone();
                    let label = ctx.cg.get_local_label();
                    let label = ctx.syms.add_label(&name, label).label;
                    expr.loc = Loc::Code;
                    expr.mark_rval();
                    expr.flags |= crate::expr::ExprFlags::ADDRESS_OF;
                    expr.label = label;
                    expr.ty = Type::void().ptr_to();
                    ctx.toks.advance();
                } else {
                    ctx.error(ErrorCode::ExpectedIdentifier, "Label name expected");
                    expr.make_const_abs_int(1);
                }
            } else {
                ctx.error(
                    ErrorCode::ComputedGotoNotEnabled,
                    "Computed gotos are an extension, not supported with this standard",
                );
                ctx.toks.advance();
                expr.make_const_abs_int(1);
            }
        }

        TokenKind::Ident => {
            let name = ctx.toks.cur().ident.clone();
            ident_expr(ctx, expr, &name);
        }

        TokenKind::StrConst => {
            // String literal: the address of a pooled char array.
            let text = ctx.toks.cur().sval.clone();
            let size = text.len() as u32 + 1;
            if !expr.is_uneval() {
                let label = ctx.cg.get_local_label();
                let handle = ctx.lits.use_literal(&text, label);
                expr.label = ctx.lits.literal_label(handle);
            }
            expr.ty = Type::char_array(size);
            expr.loc = Loc::Literal;
            expr.mark_rval();
            expr.flags |= crate::expr::ExprFlags::ADDRESS_OF;
            expr.ival = 0;
            ctx.toks.advance();
        }

        TokenKind::AsmBlock => {
            // Inline assembly is passed through verbatim.
            let text = ctx.toks.cur().ident.clone();
            for line in text.lines() {
                ctx.cg.add_code_line(line.to_string());
            }
            expr.loc = Loc::None;
            expr.mark_rval();
            expr.flags |= crate::expr::ExprFlags::MAY_NO_EFFECT;
            expr.ty = Type::void();
            ctx.toks.advance();
        }

        TokenKind::RegA => {
            expr.ty = Type::uchar();
            expr.loc = Loc::Primary;
            expr.mark_lval();
            ctx.toks.advance();
        }

        TokenKind::RegAX => {
            expr.ty = Type::uint();
            expr.loc = Loc::Primary;
            expr.mark_lval();
            ctx.toks.advance();
        }

        TokenKind::RegEAX => {
            expr.ty = Type::ulong();
            expr.loc = Loc::Primary;
            expr.mark_lval();
            ctx.toks.advance();
        }

        _ => {
            // Illegal primary. Skip the token to avoid endless error
            // loops.
            ctx.error(ErrorCode::ExpressionExpected, "Expression expected");
            ctx.toks.advance();
            expr.make_const_abs_int(1);
        }
    }
}
