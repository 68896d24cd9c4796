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

//! The symbol table consumed by the expression parser.
//!
//! Declarations are handled by an external collaborator; this module holds
//! the entries it produces: storage class, type, location data and call
//! attributes. The expression parser looks symbols up by name and may add
//! entries itself for implicitly declared functions and undefined symbols.

use bitflags::bitflags;
use std::collections::HashMap;

use crate::types::Type;

bitflags! {
    /// Storage class and state bits of a symbol.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StorageClass: u16 {
        /// Numeric constant (enumerator or macro-like constant).
        const CONST    = 1 << 0;
        /// Function.
        const FUNC     = 1 << 1;
        /// Automatic variable on the stack frame.
        const AUTO     = 1 << 2;
        /// Function parameter (implies AUTO).
        const PARAM    = 1 << 3;
        /// Register variable in the zero-page register bank.
        const REGISTER = 1 << 4;
        /// Static storage duration.
        const STATIC   = 1 << 5;
        /// External linkage.
        const EXTERN   = 1 << 6;
        /// Symbol was referenced.
        const REF      = 1 << 7;
        /// Symbol is defined (not just declared).
        const DEF      = 1 << 8;
        /// Code label (goto target).
        const LABEL    = 1 << 9;
    }
}

/// Wrapped-call attribute: calls are routed through a wrapper function that
/// receives the original address and one data byte in zero-page slots.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedCall {
    /// Name of the wrapper function.
    pub wrapper: String,
    /// User datum passed to the wrapper.
    pub data: u8,
}

/// A symbol table entry.
#[derive(Debug, Clone)]
pub struct SymEntry {
    /// Symbol name.
    pub name: String,
    /// Symbol type.
    pub ty: Type,
    /// Storage class and state bits.
    pub flags: StorageClass,
    /// Stack frame offset for automatic variables and parameters.
    pub offs: i32,
    /// Offset into the zero-page register bank for register variables.
    pub reg_offs: u16,
    /// Data or code label for local statics and labels.
    pub label: u32,
    /// Value of a numeric constant.
    pub const_val: i64,
    /// Wrapped-call attribute, if any.
    pub wrapped_call: Option<WrappedCall>,
}

impl SymEntry {
    fn new(name: impl Into<String>, ty: Type, flags: StorageClass) -> Self {
        Self {
            name: name.into(),
            ty,
            flags,
            offs: 0,
            reg_offs: 0,
            label: 0,
            const_val: 0,
            wrapped_call: None,
        }
    }

    /// An automatic variable at the given frame offset.
    pub fn auto(name: impl Into<String>, ty: Type, offs: i32) -> Self {
        let mut sym = Self::new(name, ty, StorageClass::AUTO);
        sym.offs = offs;
        sym
    }

    /// A function parameter at the given frame offset.
    pub fn param(name: impl Into<String>, ty: Type, offs: i32) -> Self {
        let mut sym = Self::new(name, ty, StorageClass::AUTO | StorageClass::PARAM);
        sym.offs = offs;
        sym
    }

    /// A register variable in the zero-page register bank.
    pub fn register(name: impl Into<String>, ty: Type, reg_offs: u16) -> Self {
        let mut sym = Self::new(name, ty, StorageClass::REGISTER);
        sym.reg_offs = reg_offs;
        sym
    }

    /// A file-scope or extern variable with a named assembly label.
    pub fn global(name: impl Into<String>, ty: Type) -> Self {
        Self::new(
            name,
            ty,
            StorageClass::STATIC | StorageClass::EXTERN | StorageClass::DEF,
        )
    }

    /// A function-local static variable with a numbered label.
    pub fn local_static(name: impl Into<String>, ty: Type, label: u32) -> Self {
        let mut sym = Self::new(name, ty, StorageClass::STATIC | StorageClass::DEF);
        sym.label = label;
        sym
    }

    /// A function.
    pub fn func(name: impl Into<String>, ty: Type) -> Self {
        Self::new(
            name,
            ty,
            StorageClass::FUNC | StorageClass::STATIC | StorageClass::EXTERN | StorageClass::DEF,
        )
    }

    /// A numeric constant (enumerator).
    pub fn constant(name: impl Into<String>, ty: Type, value: i64) -> Self {
        let mut sym = Self::new(name, ty, StorageClass::CONST);
        sym.const_val = value;
        sym
    }

    /// A code label, as used by goto and computed goto.
    pub fn code_label(name: impl Into<String>, label: u32) -> Self {
        let mut sym = Self::new(name, Type::void(), StorageClass::LABEL);
        sym.label = label;
        sym
    }

    /// Attach a wrapped-call attribute.
    pub fn with_wrapped_call(mut self, wrapper: impl Into<String>, data: u8) -> Self {
        self.wrapped_call = Some(WrappedCall {
            wrapper: wrapper.into(),
            data,
        });
        self
    }

    pub fn is_const(&self) -> bool {
        self.flags.contains(StorageClass::CONST)
    }

    pub fn is_func(&self) -> bool {
        self.flags.contains(StorageClass::FUNC)
    }

    pub fn is_auto(&self) -> bool {
        self.flags.contains(StorageClass::AUTO)
    }

    pub fn is_param(&self) -> bool {
        self.flags.contains(StorageClass::PARAM)
    }

    pub fn is_register(&self) -> bool {
        self.flags.contains(StorageClass::REGISTER)
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(StorageClass::STATIC)
    }

    pub fn is_extern(&self) -> bool {
        self.flags.contains(StorageClass::EXTERN)
    }

    pub fn is_label(&self) -> bool {
        self.flags.contains(StorageClass::LABEL)
    }
}

/// Information about the function whose body is being compiled.
#[derive(Debug, Clone)]
pub struct FuncCtx {
    /// Name of the function.
    pub name: String,
    /// The function takes a variable argument list.
    pub variadic: bool,
    /// Size of the declared parameters in bytes.
    pub param_size: u32,
}

/// The symbol table: one global scope plus one flat local scope. Scope
/// nesting is managed by the declaration parser; the expression core only
/// ever sees the innermost view.
#[derive(Debug, Default)]
pub struct SymTable {
    globals: HashMap<String, SymEntry>,
    locals: HashMap<String, SymEntry>,
    labels: HashMap<String, SymEntry>,
}

impl SymTable {
    /// Create an empty symbol table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a symbol, innermost scope first.
    pub fn find(&self, name: &str) -> Option<&SymEntry> {
        self.locals.get(name).or_else(|| self.globals.get(name))
    }

    /// Find a symbol for modification.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut SymEntry> {
        if self.locals.contains_key(name) {
            self.locals.get_mut(name)
        } else {
            self.globals.get_mut(name)
        }
    }

    /// Add a symbol to the local scope.
    pub fn add_local(&mut self, sym: SymEntry) {
        self.locals.insert(sym.name.clone(), sym);
    }

    /// Add a symbol to the global scope.
    pub fn add_global(&mut self, sym: SymEntry) {
        self.globals.insert(sym.name.clone(), sym);
    }

    /// Find or add a code label with the given allocator-provided id.
    pub fn add_label(&mut self, name: &str, label: u32) -> &SymEntry {
        self.labels
            .entry(name.to_string())
            .or_insert_with(|| SymEntry::code_label(name, label))
    }

    /// Look up a code label.
    pub fn find_label(&self, name: &str) -> Option<&SymEntry> {
        self.labels.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoping() {
        let mut syms = SymTable::new();
        syms.add_global(SymEntry::global("x", Type::int()));
        syms.add_local(SymEntry::auto("x", Type::char_(), 4));

        let found = syms.find("x").unwrap();
        assert!(found.is_auto());
        assert_eq!(found.ty, Type::char_());
        assert_eq!(found.offs, 4);
    }

    #[test]
    fn test_constant_entry() {
        let sym = SymEntry::constant("RED", Type::int(), 2);
        assert!(sym.is_const());
        assert_eq!(sym.const_val, 2);
    }

    #[test]
    fn test_label_reuse() {
        let mut syms = SymTable::new();
        let first = syms.add_label("out", 7).label;
        let second = syms.add_label("out", 99).label;
        assert_eq!(first, 7);
        // The label keeps its first id.
        assert_eq!(second, 7);
    }

    #[test]
    fn test_wrapped_call_attribute() {
        let sym = SymEntry::func("driver", Type::implicit_func()).with_wrapped_call("wrapper", 5);
        let wc = sym.wrapped_call.unwrap();
        assert_eq!(wc.wrapper, "wrapper");
        assert_eq!(wc.data, 5);
    }
}
