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

//! Code generation for the 6510 target.
//!
//! This module holds the code buffer and the bookkeeping around it:
//! - The append-only buffer of assembly lines consumed by the external
//!   assembly writer
//! - The virtual stack pointer that tracks net runtime stack growth
//! - The local label allocator
//! - The [`CodeFlags`] word that accompanies every emitter call
//!
//! The high-level emitter operations live in [`emit`], the patch buffer
//! operations (marks, range removal and movement) in [`peephole`].

pub mod emit;
pub mod peephole;

use bitflags::bitflags;

use crate::types::{Type, TypeKind};

bitflags! {
    /// Flags word for emitter calls, combining operand width, signedness,
    /// location class and constness.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CodeFlags: u32 {
        /// No flags at all.
        const NONE      = 0;

        // Width of the operand.
        const CHAR      = 0x0001;
        const INT       = 0x0002;
        const LONG      = 0x0004;

        // Attributes.
        const UNSIGNED  = 0x0008;
        const CONST     = 0x0010;
        /// Chars may be handled as chars instead of being promoted to int.
        const FORCECHAR = 0x0020;
        /// The primary register need not be valid after the operation.
        const NOKEEP    = 0x0040;

        // Location classes.
        const IMM       = 0x0100;
        const ABSOLUTE  = 0x0200;
        const EXTERNAL  = 0x0400;
        const STATIC    = 0x0800;
        const REGVAR    = 0x1000;
        const STACK     = 0x2000;
        const PRIMARY   = 0x4000;
        const EXPR      = 0x8000;
        const LITERAL   = 0x10000;
        const CODE      = 0x20000;

        /// Pointers are unsigned ints on this target.
        const PTR = Self::INT.bits() | Self::UNSIGNED.bits();
    }
}

impl CodeFlags {
    /// The operand width in bytes encoded in this flags word.
    pub fn width(self) -> u32 {
        if self.contains(CodeFlags::LONG) {
            4
        } else if self.contains(CodeFlags::INT) {
            2
        } else {
            1
        }
    }

    /// The width bits only.
    pub fn width_flags(self) -> CodeFlags {
        self & (CodeFlags::CHAR | CodeFlags::INT | CodeFlags::LONG)
    }

    /// Size in bytes of a value of this type when passed as an argument or
    /// pushed: chars are promoted to int unless `FORCECHAR` is given.
    pub fn sizeof_arg(self) -> u32 {
        if self.contains(CodeFlags::LONG) {
            4
        } else if self.contains(CodeFlags::CHAR) && self.contains(CodeFlags::FORCECHAR) {
            1
        } else {
            2
        }
    }
}

/// Map a C type to the width/signedness portion of a flags word.
pub fn type_code_of(ty: &Type) -> CodeFlags {
    match &ty.kind {
        TypeKind::Bool | TypeKind::UChar => CodeFlags::CHAR | CodeFlags::UNSIGNED,
        TypeKind::Char | TypeKind::SChar => CodeFlags::CHAR,
        TypeKind::Short | TypeKind::Int => CodeFlags::INT,
        TypeKind::UShort | TypeKind::UInt => CodeFlags::INT | CodeFlags::UNSIGNED,
        TypeKind::Long => CodeFlags::LONG,
        TypeKind::ULong => CodeFlags::LONG | CodeFlags::UNSIGNED,
        TypeKind::Ptr(_) | TypeKind::Array(..) => CodeFlags::PTR,
        // Functions are represented like pointers to themselves.
        TypeKind::Func(_) => CodeFlags::PTR,
        // Records travel through their replacement type; anything else that
        // ends up here is a prior error, treat it as int.
        TypeKind::Record(_) => type_code_of(&ty.replacement_type()),
        TypeKind::Void | TypeKind::Float => CodeFlags::INT,
    }
}

/// Flags for the width/signedness of a function's return value.
pub fn func_type_code_of(ty: &Type) -> CodeFlags {
    match ty.func_desc() {
        Some(func) => {
            if func.ret.is_void() {
                CodeFlags::INT
            } else {
                type_code_of(&func.ret.replacement_type())
            }
        }
        None => CodeFlags::INT,
    }
}

/// The code generator state.
///
/// The buffer is append-only; the peephole operations in [`peephole`] are
/// the only way code is ever removed or rearranged again.
#[derive(Debug, Default)]
pub struct Codegen {
    /// Emitted assembly lines.
    code: Vec<String>,
    /// Virtual stack pointer: bytes pushed minus bytes popped, counted
    /// downward from zero at function entry.
    pub stack_ptr: i32,
    /// Next local label number.
    label_counter: u32,
}

impl Codegen {
    /// Create a new code generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw line of assembly code.
    pub fn add_code_line(&mut self, line: impl Into<String>) {
        self.code.push(line.into());
    }

    /// The emitted code lines.
    pub fn lines(&self) -> &[String] {
        &self.code
    }

    /// Number of emitted code lines.
    pub fn line_count(&self) -> usize {
        self.code.len()
    }

    /// Allocate a new local label.
    pub fn get_local_label(&mut self) -> u32 {
        self.label_counter += 1;
        self.label_counter
    }

    /// The assembly name of a local label.
    pub fn local_label_name(label: u32) -> String {
        format!("L{:04}", label)
    }

    /// Define a local label at the current code position.
    pub fn def_code_label(&mut self, label: u32) {
        let name = Self::local_label_name(label);
        self.add_code_line(format!("{}:", name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_width() {
        assert_eq!(CodeFlags::CHAR.width(), 1);
        assert_eq!(CodeFlags::INT.width(), 2);
        assert_eq!(CodeFlags::LONG.width(), 4);
        assert_eq!(CodeFlags::PTR.width(), 2);
    }

    #[test]
    fn test_sizeof_arg_promotes_chars() {
        assert_eq!(CodeFlags::CHAR.sizeof_arg(), 2);
        assert_eq!((CodeFlags::CHAR | CodeFlags::FORCECHAR).sizeof_arg(), 1);
        assert_eq!(CodeFlags::LONG.sizeof_arg(), 4);
    }

    #[test]
    fn test_type_code_of() {
        assert_eq!(
            type_code_of(&Type::uchar()),
            CodeFlags::CHAR | CodeFlags::UNSIGNED
        );
        assert_eq!(type_code_of(&Type::int()), CodeFlags::INT);
        assert_eq!(type_code_of(&Type::int().ptr_to()), CodeFlags::PTR);
        assert_eq!(
            type_code_of(&Type::ulong()),
            CodeFlags::LONG | CodeFlags::UNSIGNED
        );
    }

    #[test]
    fn test_labels() {
        let mut cg = Codegen::new();
        let l1 = cg.get_local_label();
        let l2 = cg.get_local_label();
        assert_ne!(l1, l2);
        cg.def_code_label(l1);
        assert_eq!(cg.lines().last().unwrap(), &format!("L{:04}:", l1));
    }
}
