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

//! The expression descriptor.
//!
//! An [`ExprDesc`] is the residue of a partially evaluated expression: what
//! the compiler knows statically and where the value currently lives. Each
//! precedence level receives a fresh descriptor, fills it in and hands it
//! to its caller, which composes it with an operator or materialises it.

use crate::codegen::peephole::CodeMark;
use crate::codegen::Codegen;
use crate::types::Type;
use bitflags::bitflags;

/// Where the value of an expression lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Loc {
    /// Purely compile-time constant; the value is in `ival`.
    #[default]
    None,
    /// Object at a numeric absolute address (in `ival`).
    Abs,
    /// Named external object (label in `name`).
    Global,
    /// Static object with a numbered data label (in `label`).
    Static,
    /// Zero-page register variable (bank offset in `label`).
    Register,
    /// Object on the stack frame (offset in `ival`).
    Stack,
    /// Value in the primary register.
    Primary,
    /// Object referenced through the pointer in the primary register.
    Expr,
    /// Pooled literal (data label in `label`).
    Literal,
    /// Code label (in `label`).
    Code,
}

/// Reference type: does the descriptor denote an object or a value?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefType {
    /// A value.
    #[default]
    RVal,
    /// A reference to an object.
    LVal,
}

bitflags! {
    /// State bits of an expression descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ExprFlags: u16 {
        /// The descriptor denotes the address of the location, not its
        /// content (array names, `&x`, string literals).
        const ADDRESS_OF    = 1 << 0;
        /// The condition codes reflect the value.
        const TESTED        = 1 << 1;
        /// The next load must set the condition codes.
        const NEEDS_TEST    = 1 << 2;
        /// Parsed inside a constant-expression context.
        const CCONST        = 1 << 3;
        /// Parsed in an unevaluated context (sizeof, short-circuited
        /// operands); no code may remain.
        const UNEVAL        = 1 << 4;
        /// Suppress the "result unused" warning for this expression.
        const MAY_NO_EFFECT = 1 << 5;
        /// The descriptor denotes a bit-field.
        const BITFIELD      = 1 << 6;

        /// Evaluation-context bits inherited by subexpressions.
        const KEEP_SUBEXPR = Self::CCONST.bits() | Self::UNEVAL.bits();
    }
}

/// The residue of a partially evaluated expression.
#[derive(Debug, Clone, Default)]
pub struct ExprDesc {
    /// Type of the expression.
    pub ty: Type,
    /// Location of the value.
    pub loc: Loc,
    /// Lvalue or rvalue.
    pub rtype: RefType,
    /// State bits.
    pub flags: ExprFlags,
    /// Integer immediate or byte offset, depending on the location.
    pub ival: i64,
    /// Floating immediate (captured but unused).
    pub fval: f64,
    /// Symbol name for `Global` locations.
    pub name: String,
    /// Numbered label for `Static`/`Literal`/`Code` locations and the bank
    /// offset for `Register` locations.
    pub label: u32,
    /// Name of the symbol this expression came from, if any.
    pub sym: Option<String>,
    /// Bit offset of a bit-field.
    pub bit_offs: u8,
    /// Bit width of a bit-field.
    pub bit_width: u8,
    /// Code emitted while this expression was parsed.
    pub code_range: Option<(CodeMark, CodeMark)>,
}

impl ExprDesc {
    /// Create a fresh descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// The evaluation-context bits to seed a subexpression with.
    pub fn keep_subexpr_flags(&self) -> ExprFlags {
        self.flags & ExprFlags::KEEP_SUBEXPR
    }

    /// Create a subexpression descriptor inheriting this one's context.
    pub fn sub_expr(&self) -> Self {
        let mut sub = Self::new();
        sub.flags |= self.keep_subexpr_flags();
        sub
    }

    pub fn is_lval(&self) -> bool {
        self.rtype == RefType::LVal
    }

    pub fn is_rval(&self) -> bool {
        self.rtype == RefType::RVal
    }

    /// Force the descriptor to be an rvalue.
    pub fn mark_rval(&mut self) {
        self.rtype = RefType::RVal;
    }

    /// Force the descriptor to be an lvalue.
    pub fn mark_lval(&mut self) {
        self.rtype = RefType::LVal;
    }

    pub fn is_loc_none(&self) -> bool {
        self.loc == Loc::None
    }

    pub fn is_loc_abs(&self) -> bool {
        self.loc == Loc::Abs
    }

    pub fn is_loc_primary(&self) -> bool {
        self.loc == Loc::Primary
    }

    pub fn is_loc_expr(&self) -> bool {
        self.loc == Loc::Expr
    }

    pub fn is_loc_stack(&self) -> bool {
        self.loc == Loc::Stack
    }

    pub fn is_loc_primary_or_expr(&self) -> bool {
        matches!(self.loc, Loc::Primary | Loc::Expr)
    }

    /// Locations whose address is known without a runtime computation.
    pub fn is_loc_const(&self) -> bool {
        matches!(
            self.loc,
            Loc::Abs | Loc::Global | Loc::Static | Loc::Register | Loc::Literal | Loc::Code
        )
    }

    /// Quasi-constant locations: statically addressable or no location at
    /// all. The address load for these can be delayed or elided.
    pub fn is_loc_quasi_const(&self) -> bool {
        self.is_loc_none() || self.is_loc_const()
    }

    pub fn is_addr_expr(&self) -> bool {
        self.flags.contains(ExprFlags::ADDRESS_OF)
    }

    /// A numeric constant whose value is in `ival`.
    pub fn is_const_abs(&self) -> bool {
        self.is_rval()
            && !self.is_bit_field()
            && (self.is_loc_none() || (self.is_loc_abs() && self.is_addr_expr()))
    }

    /// A numeric integer constant.
    pub fn is_const_abs_int(&self) -> bool {
        self.is_const_abs() && self.ty.is_class_int()
    }

    /// A constant of some sort: numeric, or the address of a statically
    /// addressable object.
    pub fn is_const(&self) -> bool {
        self.is_rval() && (self.is_loc_none() || (self.is_addr_expr() && self.is_loc_const()))
    }

    /// The address of an object that is known at link time.
    pub fn is_const_addr(&self) -> bool {
        self.is_rval() && self.is_addr_expr() && self.is_loc_const()
    }

    /// A constant address or numeric constant usable without a load.
    pub fn is_quasi_const_addr(&self) -> bool {
        self.is_rval() && (self.is_loc_none() || (self.is_addr_expr() && self.is_loc_quasi_const()))
    }

    /// A null pointer constant.
    pub fn is_null_ptr(&self) -> bool {
        self.is_rval()
            && self.is_loc_none()
            && !self.is_addr_expr()
            && self.ival == 0
            && self.ty.is_class_int()
    }

    /// Usable in a boolean context.
    pub fn is_bool(&self) -> bool {
        self.ty.is_scalar() || self.is_addr_expr()
    }

    /// A compile-time boolean: numeric constant or object address.
    pub fn is_const_bool(&self) -> bool {
        self.is_const_abs() || self.is_const_addr()
    }

    pub fn is_bit_field(&self) -> bool {
        self.flags.contains(ExprFlags::BITFIELD)
    }

    /// Turn the descriptor into a bit-field reference.
    pub fn make_bit_field(&mut self, bit_offs: u8, bit_width: u8) {
        self.flags |= ExprFlags::BITFIELD;
        self.bit_offs = bit_offs;
        self.bit_width = bit_width;
    }

    /// Drop the bit-field property after an error, to avoid follow-ups.
    pub fn dis_bit_field(&mut self) {
        self.flags &= !ExprFlags::BITFIELD;
        self.bit_offs = 0;
        self.bit_width = 0;
    }

    pub fn is_uneval(&self) -> bool {
        self.flags.contains(ExprFlags::UNEVAL)
    }

    /// Mark the descriptor for parsing in an unevaluated context.
    pub fn mark_for_uneval(&mut self) {
        self.flags |= ExprFlags::UNEVAL;
    }

    pub fn needs_const(&self) -> bool {
        self.flags.contains(ExprFlags::CCONST)
    }

    pub fn is_tested(&self) -> bool {
        self.flags.contains(ExprFlags::TESTED)
    }

    pub fn needs_test(&self) -> bool {
        self.flags.contains(ExprFlags::NEEDS_TEST)
    }

    /// Request that the next load sets the condition codes.
    pub fn require_test(&mut self) {
        self.flags |= ExprFlags::NEEDS_TEST;
    }

    /// Drop a pending test request.
    pub fn require_no_test(&mut self) {
        self.flags &= !ExprFlags::NEEDS_TEST;
    }

    /// Record that the condition codes now reflect the value. A pending
    /// test request stays visible until dropped with
    /// [`ExprDesc::require_no_test`], so sequence points can still see it.
    pub fn test_done(&mut self) {
        self.flags |= ExprFlags::TESTED;
    }

    /// Record that the condition codes no longer reflect the value.
    pub fn mark_as_untested(&mut self) {
        self.flags &= !ExprFlags::TESTED;
    }

    pub fn may_have_no_effect(&self) -> bool {
        self.flags.contains(ExprFlags::MAY_NO_EFFECT)
    }

    /// True if draining deferred operations must preserve the primary
    /// register for this expression.
    pub fn needs_primary(&self) -> bool {
        self.is_loc_primary_or_expr()
    }

    /// True if the value still has to be loaded into the primary register.
    pub fn yet_to_load(&self) -> bool {
        !self.is_loc_primary() || self.is_addr_expr() || self.needs_test()
    }

    /// Replace the descriptor by a numeric constant of the given type,
    /// keeping only the evaluation-context bits.
    pub fn make_const_abs(&mut self, value: i64, ty: Type) {
        self.flags = self.keep_subexpr_flags();
        self.ty = ty;
        self.loc = Loc::None;
        self.rtype = RefType::RVal;
        self.ival = value;
        self.name.clear();
        self.label = 0;
        self.sym = None;
        self.bit_offs = 0;
        self.bit_width = 0;
    }

    /// Replace the descriptor by an int constant.
    pub fn make_const_abs_int(&mut self, value: i64) {
        self.make_const_abs(value, Type::int());
    }

    /// Replace the descriptor by a boolean constant.
    pub fn make_const_bool(&mut self, value: i64) {
        self.make_const_abs((value != 0) as i64, Type::bool_());
    }

    /// Finalize a load: the value is an rvalue in the primary register.
    /// The tested state survives; everything location-related is reset.
    pub fn finalize_rval_load(&mut self) {
        self.loc = Loc::Primary;
        self.rtype = RefType::RVal;
        self.flags &= !(ExprFlags::ADDRESS_OF | ExprFlags::BITFIELD);
        self.ival = 0;
        self.sym = None;
    }

    /// Turn an object reference into the address of that object: the
    /// descriptor becomes an address-of rvalue.
    pub fn addr_expr(&mut self) {
        self.rtype = RefType::RVal;
        self.flags |= ExprFlags::ADDRESS_OF;
    }

    /// Dereference: the descriptor now references the object at the address
    /// it previously described.
    pub fn ind_expr(&mut self) {
        if self.is_addr_expr() {
            // The address of an object: back to referencing the object.
            self.flags &= !ExprFlags::ADDRESS_OF;
            self.rtype = RefType::LVal;
        } else if self.is_loc_none() {
            // A numeric address.
            self.loc = Loc::Abs;
            self.rtype = RefType::LVal;
        } else {
            // A computed pointer in the primary register.
            self.loc = Loc::Expr;
            self.rtype = RefType::LVal;
        }
    }

    /// The assembly name of the object's location. Only meaningful for
    /// statically addressable locations.
    pub fn label_name(&self) -> String {
        match self.loc {
            Loc::Global => format!("_{}", self.name),
            Loc::Static | Loc::Literal | Loc::Code => Codegen::local_label_name(self.label),
            Loc::Register => format!("regbank+{}", self.label),
            Loc::Abs => format!("${:04X}", self.ival as u16),
            _ => String::new(),
        }
    }

    /// Record the code emitted while parsing this expression.
    pub fn set_code_range(&mut self, start: CodeMark, end: CodeMark) {
        self.code_range = Some((start, end));
    }

    /// Check whether parsing this expression emitted no code.
    pub fn code_range_is_empty(&self, cg: &Codegen) -> bool {
        match &self.code_range {
            Some((start, end)) => cg.code_range_is_empty(start, end),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_descriptor_is_constant_zero() {
        let e = ExprDesc::new();
        assert_eq!(e.loc, Loc::None);
        assert!(e.is_rval());
        assert_eq!(e.ival, 0);
        assert!(e.is_null_ptr());
    }

    #[test]
    fn test_const_invariant() {
        let mut e = ExprDesc::new();
        e.make_const_abs_int(42);
        assert!(e.is_const_abs());
        assert!(e.is_const_abs_int());
        assert!(e.is_rval());
        assert_eq!(e.ival, 42);
    }

    #[test]
    fn test_make_const_keeps_eval_context() {
        let mut e = ExprDesc::new();
        e.mark_for_uneval();
        e.flags |= ExprFlags::TESTED;
        e.make_const_abs_int(1);
        assert!(e.is_uneval());
        assert!(!e.is_tested());
    }

    #[test]
    fn test_addr_and_ind_are_inverse() {
        let mut e = ExprDesc::new();
        e.loc = Loc::Global;
        e.name = "a".into();
        e.mark_lval();

        e.addr_expr();
        assert!(e.is_rval());
        assert!(e.is_addr_expr());
        assert!(e.is_const_addr());

        e.ind_expr();
        assert!(e.is_lval());
        assert!(!e.is_addr_expr());
        assert_eq!(e.loc, Loc::Global);
    }

    #[test]
    fn test_ind_expr_on_numeric_address() {
        let mut e = ExprDesc::new();
        e.make_const_abs(0xD020, Type::uchar().ptr_to());
        e.ind_expr();
        assert_eq!(e.loc, Loc::Abs);
        assert!(e.is_lval());
        assert_eq!(e.label_name(), "$D020");
    }

    #[test]
    fn test_ind_expr_on_primary_pointer() {
        let mut e = ExprDesc::new();
        e.loc = Loc::Primary;
        e.ind_expr();
        assert_eq!(e.loc, Loc::Expr);
        assert!(e.is_lval());
    }

    #[test]
    fn test_test_protocol() {
        let mut e = ExprDesc::new();
        e.require_test();
        assert!(e.needs_test());
        e.test_done();
        assert!(e.is_tested());
        assert!(e.needs_test());
        e.require_no_test();
        assert!(!e.needs_test());
        e.mark_as_untested();
        assert!(!e.is_tested());
    }

    #[test]
    fn test_bit_field() {
        let mut e = ExprDesc::new();
        e.make_bit_field(3, 4);
        assert!(e.is_bit_field());
        assert!(!e.is_const_abs());
        e.dis_bit_field();
        assert!(!e.is_bit_field());
    }

    #[test]
    fn test_finalize_rval_load_keeps_tested() {
        let mut e = ExprDesc::new();
        e.loc = Loc::Stack;
        e.ival = 4;
        e.mark_lval();
        e.test_done();
        e.finalize_rval_load();
        assert_eq!(e.loc, Loc::Primary);
        assert!(e.is_rval());
        assert!(e.is_tested());
        assert_eq!(e.ival, 0);
    }

    #[test]
    fn test_quasi_const_locations() {
        let mut e = ExprDesc::new();
        e.loc = Loc::Static;
        e.label = 3;
        assert!(e.is_loc_quasi_const());
        e.loc = Loc::Stack;
        assert!(!e.is_loc_quasi_const());
        e.loc = Loc::Primary;
        assert!(!e.is_loc_quasi_const());
    }
}
