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

//! The C type graph used by the expression core.
//!
//! This module provides:
//! - Type construction (basic types, pointers, arrays, functions, records)
//! - Type predicates and classification
//! - Target sizes (char 1, int/pointer 2, long 4)
//! - Integer promotion and the usual arithmetic conversions
//! - The compatibility lattice and pointer/array decay

use bitflags::bitflags;
use std::fmt;
use std::rc::Rc;

bitflags! {
    /// Type qualifiers, including the calling-convention qualifiers that
    /// ride on function types.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Qualifiers: u8 {
        const CONST    = 1 << 0;
        const VOLATILE = 1 << 1;
        const RESTRICT = 1 << 2;
        const FASTCALL = 1 << 3;
        const CDECL    = 1 << 4;
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name (may be empty for abstract declarators).
    pub name: String,
    /// Declared parameter type.
    pub ty: Type,
}

/// Descriptor for a function type.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    /// Return type.
    pub ret: Type,
    /// Declared parameters, in order.
    pub params: Vec<Param>,
    /// Function takes a variable argument list.
    pub variadic: bool,
    /// Function was declared with an empty (K&R style) parameter list and
    /// accepts any number of arguments.
    pub empty: bool,
}

impl FuncType {
    /// Total size in bytes of the declared parameters on the stack.
    pub fn param_size(&self) -> u32 {
        self.params
            .iter()
            .map(|p| p.ty.decayed().size_of().max(1))
            .sum()
    }
}

/// A bit-field position within a record field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitField {
    /// Bit offset within the storage unit.
    pub offs: u8,
    /// Width in bits.
    pub width: u8,
}

/// A struct or union field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: Type,
    /// Byte offset from the start of the record.
    pub offs: u32,
    /// Bit-field position, if this is a bit-field.
    pub bit: Option<BitField>,
}

/// Descriptor for a struct or union type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    /// Tag name (may be empty for anonymous records).
    pub name: String,
    /// True for unions, false for structs.
    pub is_union: bool,
    /// True once the record is fully defined.
    pub complete: bool,
    /// Total size in bytes (0 while incomplete).
    pub size: u32,
    /// Fields in declaration order.
    pub fields: Vec<Field>,
}

impl RecordType {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The kind of a type node.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    /// Captured from floating constants but not otherwise supported.
    Float,
    Ptr(Box<Type>),
    /// Element type and element count; `None` for arrays of unknown size.
    Array(Box<Type>, Option<u32>),
    Func(Rc<FuncType>),
    Record(Rc<RecordType>),
}

/// A C type: a kind plus qualifier bits.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub kind: TypeKind,
    pub quals: Qualifiers,
}

/// Result of comparing two types, from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TypeCmp {
    /// The types are not compatible at all.
    Incompatible,
    /// Same size and kind but different signedness.
    SignDiff,
    /// Equal apart from qualifiers.
    QualDiff,
    /// Compatible (e.g. arrays where only one size is known).
    Equal,
    /// Exactly the same type.
    Identical,
}

impl Type {
    fn of(kind: TypeKind) -> Self {
        Self {
            kind,
            quals: Qualifiers::empty(),
        }
    }

    pub fn void() -> Self {
        Self::of(TypeKind::Void)
    }

    pub fn bool_() -> Self {
        Self::of(TypeKind::Bool)
    }

    pub fn char_() -> Self {
        Self::of(TypeKind::Char)
    }

    pub fn schar() -> Self {
        Self::of(TypeKind::SChar)
    }

    pub fn uchar() -> Self {
        Self::of(TypeKind::UChar)
    }

    pub fn short() -> Self {
        Self::of(TypeKind::Short)
    }

    pub fn ushort() -> Self {
        Self::of(TypeKind::UShort)
    }

    pub fn int() -> Self {
        Self::of(TypeKind::Int)
    }

    pub fn uint() -> Self {
        Self::of(TypeKind::UInt)
    }

    pub fn long() -> Self {
        Self::of(TypeKind::Long)
    }

    pub fn ulong() -> Self {
        Self::of(TypeKind::ULong)
    }

    pub fn float() -> Self {
        Self::of(TypeKind::Float)
    }

    /// `size_t` on this target is unsigned int.
    pub fn size_t() -> Self {
        Self::uint()
    }

    /// Build a pointer to this type.
    pub fn ptr_to(self) -> Self {
        Self::of(TypeKind::Ptr(Box::new(self)))
    }

    /// Build an array of this element type.
    pub fn array_of(self, count: Option<u32>) -> Self {
        Self::of(TypeKind::Array(Box::new(self), count))
    }

    /// Build a function type.
    pub fn func(func: FuncType) -> Self {
        Self::of(TypeKind::Func(Rc::new(func)))
    }

    /// Build a record type.
    pub fn record(rec: RecordType) -> Self {
        Self::of(TypeKind::Record(Rc::new(rec)))
    }

    /// The implicit type of a function that is called without a declaration:
    /// `int f()` with an empty parameter list.
    pub fn implicit_func() -> Self {
        Self::func(FuncType {
            ret: Type::int(),
            params: Vec::new(),
            variadic: false,
            empty: true,
        })
    }

    /// An array of `n` chars, as produced by string literals.
    pub fn char_array(n: u32) -> Self {
        Self::char_().array_of(Some(n))
    }

    /// Return this type with the given qualifiers added.
    pub fn with_quals(mut self, quals: Qualifiers) -> Self {
        self.quals |= quals;
        self
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.kind, TypeKind::Bool)
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind, TypeKind::Float)
    }

    /// Char-sized integer types (including bool).
    pub fn is_char_type(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Bool | TypeKind::Char | TypeKind::SChar | TypeKind::UChar
        )
    }

    pub fn is_long_type(&self) -> bool {
        matches!(self.kind, TypeKind::Long | TypeKind::ULong)
    }

    /// Int-sized integer types (not char, not long).
    pub fn is_int_type(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Short | TypeKind::UShort | TypeKind::Int | TypeKind::UInt
        )
    }

    /// All integer types.
    pub fn is_class_int(&self) -> bool {
        self.is_char_type() || self.is_int_type() || self.is_long_type()
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self.kind, TypeKind::Ptr(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(..))
    }

    /// Pointers and arrays.
    pub fn is_class_ptr(&self) -> bool {
        self.is_ptr() || self.is_array()
    }

    pub fn is_func(&self) -> bool {
        matches!(self.kind, TypeKind::Func(_))
    }

    pub fn is_func_ptr(&self) -> bool {
        match &self.kind {
            TypeKind::Ptr(inner) => inner.is_func(),
            _ => false,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, TypeKind::Record(_))
    }

    /// Types usable in relational and equality operators.
    pub fn is_relation_type(&self) -> bool {
        self.is_class_int() || self.is_class_ptr()
    }

    /// Types usable in a boolean context.
    pub fn is_scalar(&self) -> bool {
        self.is_class_int() || self.is_class_ptr() || self.is_float()
    }

    /// Signedness of an integer type. Plain char is signed on this target;
    /// pointers compare and convert as unsigned.
    pub fn is_signed(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Char | TypeKind::SChar | TypeKind::Short | TypeKind::Int | TypeKind::Long
        )
    }

    pub fn is_unsigned(&self) -> bool {
        !self.is_signed()
    }

    pub fn is_qual_const(&self) -> bool {
        self.quals.contains(Qualifiers::CONST)
    }

    pub fn is_qual_fastcall(&self) -> bool {
        self.quals.contains(Qualifiers::FASTCALL)
    }

    pub fn is_qual_cdecl(&self) -> bool {
        self.quals.contains(Qualifiers::CDECL)
    }

    /// The size of this type in bytes. Zero for void, functions and
    /// incomplete types.
    pub fn size_of(&self) -> u32 {
        match &self.kind {
            TypeKind::Void | TypeKind::Func(_) => 0,
            TypeKind::Bool | TypeKind::Char | TypeKind::SChar | TypeKind::UChar => 1,
            TypeKind::Short | TypeKind::UShort | TypeKind::Int | TypeKind::UInt => 2,
            TypeKind::Long | TypeKind::ULong | TypeKind::Float => 4,
            TypeKind::Ptr(_) => 2,
            TypeKind::Array(elem, count) => match count {
                Some(n) => elem.size_of() * n,
                None => 0,
            },
            TypeKind::Record(rec) => rec.size,
        }
    }

    /// The type a pointer or array refers to.
    ///
    /// Panics on other types; callers must have checked `is_class_ptr`.
    pub fn indirect(&self) -> Type {
        match &self.kind {
            TypeKind::Ptr(inner) => (**inner).clone(),
            TypeKind::Array(elem, _) => (**elem).clone(),
            _ => panic!("internal error: indirect() on non-pointer type '{}'", self),
        }
    }

    /// The size of the pointed-to type in bytes.
    pub fn psize_of(&self) -> u32 {
        self.indirect().size_of()
    }

    /// Pointer/array and function decay: arrays become pointers to their
    /// first element, functions become pointers to themselves.
    pub fn decayed(&self) -> Type {
        match &self.kind {
            TypeKind::Array(elem, _) => (**elem).clone().ptr_to(),
            TypeKind::Func(_) => self.clone().ptr_to(),
            _ => self.clone(),
        }
    }

    /// Convert an array type to a pointer to its element type.
    pub fn array_to_ptr(&self) -> Type {
        match &self.kind {
            TypeKind::Array(elem, _) => (**elem).clone().ptr_to(),
            _ => self.clone(),
        }
    }

    /// Get the function descriptor of a function or function-pointer type.
    pub fn func_desc(&self) -> Option<Rc<FuncType>> {
        match &self.kind {
            TypeKind::Func(f) => Some(Rc::clone(f)),
            TypeKind::Ptr(inner) => match &inner.kind {
                TypeKind::Func(f) => Some(Rc::clone(f)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Get the record descriptor of a struct/union type.
    pub fn record_desc(&self) -> Option<Rc<RecordType>> {
        match &self.kind {
            TypeKind::Record(r) => Some(Rc::clone(r)),
            _ => None,
        }
    }

    /// Integer promotion: types narrower than int promote to int if int can
    /// represent all their values, otherwise to unsigned int.
    pub fn int_promotion(&self) -> Type {
        match self.kind {
            // All char-sized values fit into a 16-bit int.
            TypeKind::Bool | TypeKind::Char | TypeKind::SChar | TypeKind::UChar => Type::int(),
            TypeKind::Short => Type::int(),
            // unsigned short has the same width as int on this target, so it
            // promotes to unsigned int.
            TypeKind::UShort => Type::uint(),
            _ => self.clone(),
        }
    }

    /// The scalar type used in place of a register-sized struct/union when
    /// passing or returning it. Records that do not fit a register are
    /// returned unchanged.
    pub fn replacement_type(&self) -> Type {
        if !self.is_record() {
            return self.clone();
        }
        match self.size_of() {
            1 => Type::uchar(),
            2 => Type::uint(),
            3 | 4 => Type::ulong(),
            _ => self.clone(),
        }
    }
}

/// Perform the usual arithmetic conversions for binary operators on the
/// integer subset (C89 3.2.1.5).
pub fn arithmetic_convert(lhs: &Type, rhs: &Type) -> Type {
    let l = lhs.int_promotion();
    let r = rhs.int_promotion();

    // If either operand has type unsigned long int, the result is
    // unsigned long int.
    if matches!(l.kind, TypeKind::ULong) || matches!(r.kind, TypeKind::ULong) {
        return Type::ulong();
    }

    // If one operand is long int and the other unsigned int, long can
    // represent all unsigned int values on this target (long is 32 bit,
    // unsigned int 16 bit), so the result is long.
    if (matches!(l.kind, TypeKind::Long) && matches!(r.kind, TypeKind::UInt))
        || (matches!(r.kind, TypeKind::Long) && matches!(l.kind, TypeKind::UInt))
    {
        return Type::long();
    }

    // Otherwise, if either operand is long int, the result is long int.
    if matches!(l.kind, TypeKind::Long) || matches!(r.kind, TypeKind::Long) {
        return Type::long();
    }

    // Otherwise, if either operand is unsigned int, the result is
    // unsigned int.
    if matches!(l.kind, TypeKind::UInt) || matches!(r.kind, TypeKind::UInt) {
        return Type::uint();
    }

    // Otherwise both operands have type int.
    Type::int()
}

/// Compare two types on the compatibility lattice.
pub fn type_cmp(a: &Type, b: &Type) -> TypeCmp {
    if a == b {
        return TypeCmp::Identical;
    }

    match (&a.kind, &b.kind) {
        (TypeKind::Ptr(ia), TypeKind::Ptr(ib)) => match type_cmp(ia, ib) {
            TypeCmp::Identical => TypeCmp::QualDiff.max(qual_cmp(a, b)),
            other => other,
        },
        (TypeKind::Array(ea, ca), TypeKind::Array(eb, cb)) => {
            let inner = type_cmp(ea, eb);
            if inner < TypeCmp::QualDiff {
                return inner;
            }
            match (ca, cb) {
                (Some(x), Some(y)) if x != y => TypeCmp::Incompatible,
                (Some(_), Some(_)) => inner,
                // One size unknown: compatible but not identical.
                _ => inner.min(TypeCmp::Equal),
            }
        }
        _ => {
            if a.kind == b.kind {
                // Same kind, different qualifiers.
                return TypeCmp::QualDiff;
            }
            if a.is_class_int() && b.is_class_int() && a.size_of() == b.size_of() {
                return TypeCmp::SignDiff;
            }
            TypeCmp::Incompatible
        }
    }
}

fn qual_cmp(a: &Type, b: &Type) -> TypeCmp {
    if a.quals == b.quals {
        TypeCmp::Identical
    } else {
        TypeCmp::QualDiff
    }
}

impl Default for Type {
    /// A fresh expression starts out as int.
    fn default() -> Self {
        Type::int()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quals.contains(Qualifiers::CONST) {
            write!(f, "const ")?;
        }
        if self.quals.contains(Qualifiers::VOLATILE) {
            write!(f, "volatile ")?;
        }
        match &self.kind {
            TypeKind::Void => write!(f, "void"),
            TypeKind::Bool => write!(f, "bool"),
            TypeKind::Char => write!(f, "char"),
            TypeKind::SChar => write!(f, "signed char"),
            TypeKind::UChar => write!(f, "unsigned char"),
            TypeKind::Short => write!(f, "short"),
            TypeKind::UShort => write!(f, "unsigned short"),
            TypeKind::Int => write!(f, "int"),
            TypeKind::UInt => write!(f, "unsigned int"),
            TypeKind::Long => write!(f, "long"),
            TypeKind::ULong => write!(f, "unsigned long"),
            TypeKind::Float => write!(f, "float"),
            TypeKind::Ptr(inner) => write!(f, "{} *", inner),
            TypeKind::Array(elem, Some(n)) => write!(f, "{} [{}]", elem, n),
            TypeKind::Array(elem, None) => write!(f, "{} []", elem),
            TypeKind::Func(func) => write!(f, "{} ()", func.ret),
            TypeKind::Record(rec) => {
                let tag = if rec.is_union { "union" } else { "struct" };
                if rec.name.is_empty() {
                    write!(f, "{}", tag)
                } else {
                    write!(f, "{} {}", tag, rec.name)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_sizes() {
        assert_eq!(Type::char_().size_of(), 1);
        assert_eq!(Type::bool_().size_of(), 1);
        assert_eq!(Type::int().size_of(), 2);
        assert_eq!(Type::int().ptr_to().size_of(), 2);
        assert_eq!(Type::ulong().size_of(), 4);
        assert_eq!(Type::char_().array_of(Some(10)).size_of(), 10);
        assert_eq!(Type::int().array_of(Some(5)).size_of(), 10);
        assert_eq!(Type::int().array_of(None).size_of(), 0);
    }

    #[test]
    fn test_predicates() {
        assert!(Type::uchar().is_char_type());
        assert!(Type::bool_().is_class_int());
        assert!(Type::int().ptr_to().is_class_ptr());
        assert!(Type::char_().array_of(Some(3)).is_class_ptr());
        assert!(Type::implicit_func().is_func());
        assert!(Type::implicit_func().ptr_to().is_func_ptr());
        assert!(Type::char_().is_signed());
        assert!(Type::bool_().is_unsigned());
    }

    #[test]
    fn test_decay() {
        let arr = Type::int().array_of(Some(4));
        assert_eq!(arr.decayed(), Type::int().ptr_to());
        let f = Type::implicit_func();
        assert!(f.decayed().is_func_ptr());
        assert_eq!(Type::long().decayed(), Type::long());
    }

    #[test_case(TypeKind::Char => TypeKind::Int; "char promotes to int")]
    #[test_case(TypeKind::UChar => TypeKind::Int; "unsigned char promotes to int")]
    #[test_case(TypeKind::Bool => TypeKind::Int; "bool promotes to int")]
    #[test_case(TypeKind::Short => TypeKind::Int; "short promotes to int")]
    #[test_case(TypeKind::UShort => TypeKind::UInt; "unsigned short promotes to unsigned int")]
    #[test_case(TypeKind::UInt => TypeKind::UInt; "unsigned int stays")]
    #[test_case(TypeKind::Long => TypeKind::Long; "long stays")]
    fn test_int_promotion(kind: TypeKind) -> TypeKind {
        Type::of(kind).int_promotion().kind
    }

    #[test_case(Type::int(), Type::int() => TypeKind::Int)]
    #[test_case(Type::char_(), Type::char_() => TypeKind::Int)]
    #[test_case(Type::int(), Type::uint() => TypeKind::UInt)]
    #[test_case(Type::uint(), Type::long() => TypeKind::Long)]
    #[test_case(Type::int(), Type::long() => TypeKind::Long)]
    #[test_case(Type::long(), Type::ulong() => TypeKind::ULong)]
    #[test_case(Type::uchar(), Type::uint() => TypeKind::UInt)]
    fn test_arithmetic_convert(lhs: Type, rhs: Type) -> TypeKind {
        arithmetic_convert(&lhs, &rhs).kind
    }

    #[test]
    fn test_arithmetic_convert_symmetric() {
        let types = [
            Type::char_(),
            Type::schar(),
            Type::uchar(),
            Type::bool_(),
            Type::short(),
            Type::ushort(),
            Type::int(),
            Type::uint(),
            Type::long(),
            Type::ulong(),
        ];
        for a in &types {
            for b in &types {
                assert_eq!(
                    arithmetic_convert(a, b),
                    arithmetic_convert(b, a),
                    "conversion of {} and {} is not symmetric",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn test_type_cmp() {
        assert_eq!(type_cmp(&Type::int(), &Type::int()), TypeCmp::Identical);
        assert_eq!(type_cmp(&Type::int(), &Type::uint()), TypeCmp::SignDiff);
        assert_eq!(
            type_cmp(&Type::int(), &Type::int().with_quals(Qualifiers::CONST)),
            TypeCmp::QualDiff
        );
        assert_eq!(
            type_cmp(&Type::int().ptr_to(), &Type::long().ptr_to()),
            TypeCmp::Incompatible
        );
        assert_eq!(
            type_cmp(
                &Type::char_().array_of(Some(3)),
                &Type::char_().array_of(None)
            ),
            TypeCmp::Equal
        );
        assert!(TypeCmp::Incompatible < TypeCmp::QualDiff);
        assert!(TypeCmp::QualDiff < TypeCmp::Equal);
    }

    #[test]
    fn test_replacement_type() {
        let rec = Type::record(RecordType {
            name: "pair".into(),
            is_union: false,
            complete: true,
            size: 2,
            fields: vec![
                Field {
                    name: "a".into(),
                    ty: Type::char_(),
                    offs: 0,
                    bit: None,
                },
                Field {
                    name: "b".into(),
                    ty: Type::char_(),
                    offs: 1,
                    bit: None,
                },
            ],
        });
        assert_eq!(rec.replacement_type(), Type::uint());

        let big = Type::record(RecordType {
            name: "big".into(),
            is_union: false,
            complete: true,
            size: 8,
            fields: Vec::new(),
        });
        assert_eq!(big.replacement_type(), big);
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::uchar().to_string(), "unsigned char");
        assert_eq!(Type::int().ptr_to().to_string(), "int *");
        assert_eq!(Type::char_().array_of(Some(4)).to_string(), "char [4]");
        assert_eq!(
            Type::int().with_quals(Qualifiers::CONST).to_string(),
            "const int"
        );
    }
}
