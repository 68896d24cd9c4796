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

//! High-level emitter operations for the 6510 target.
//!
//! Every operation takes a [`CodeFlags`] word describing operand width,
//! signedness, location class and constness. The primary register is the
//! A/X pair (plus the `sreg` zero-page extension for 32-bit values); wider
//! operations call into runtime routines that take the left operand on the
//! runtime stack and the right operand in the primary.
//!
//! The virtual stack pointer is adjusted here and nowhere else, so that
//! every push has a matching pop/drop and the expression parser can verify
//! balance at each level.

use super::{CodeFlags, Codegen};

/// Extension trait with the high-level emitter operations.
///
/// This trait is implemented for [`Codegen`] and separates the operation
/// façade from the buffer bookkeeping in the main module.
pub trait EmitHelpers {
    /// Load an immediate value into the primary register.
    fn get_immed(&mut self, flags: CodeFlags, val: i64);

    /// Load the address of a named location into the primary register.
    fn get_immed_addr(&mut self, flags: CodeFlags, name: &str, offs: i64);

    /// Load a value from a named location.
    fn get_static(&mut self, flags: CodeFlags, name: &str, offs: i64);

    /// Store the primary register to a named location.
    fn put_static(&mut self, flags: CodeFlags, name: &str, offs: i64);

    /// Load a value from the stack frame.
    fn get_local(&mut self, flags: CodeFlags, offs: i32);

    /// Store the primary register (or a constant, with `CONST`) to the
    /// stack frame.
    fn put_local(&mut self, flags: CodeFlags, offs: i32, val: i64);

    /// Load a value through the pointer in the primary register.
    fn ind_load(&mut self, flags: CodeFlags, offs: i64);

    /// Store the primary register through the pointer on top of stack. The
    /// pointer is consumed.
    fn put_ind(&mut self, flags: CodeFlags, offs: i64);

    /// Load the address of a stack slot into the primary register.
    fn lea_local(&mut self, offs: i32);

    /// Load the address of a parameter of a variadic function; the variadic
    /// tail sits on the other side of the frame, so this needs a runtime
    /// base-pointer adjustment.
    fn lea_variadic(&mut self, offs: i32);

    /// Push the primary register (or a constant, with `CONST`) onto the
    /// stack.
    fn push(&mut self, flags: CodeFlags, val: i64);

    /// Account for a value that the callee removed from the stack.
    fn pop(&mut self, flags: CodeFlags);

    /// Drop bytes from the stack.
    fn drop_bytes(&mut self, n: u32);

    /// Grow the stack by n bytes without storing anything.
    fn space(&mut self, n: u32);

    /// Swap the primary register and the top of stack.
    fn swap(&mut self, flags: CodeFlags);

    /// Save the primary register around other code.
    fn save(&mut self, flags: CodeFlags);

    /// Restore the primary register saved with [`EmitHelpers::save`].
    fn restore(&mut self, flags: CodeFlags);

    /// Set the condition codes for the value in the primary register.
    fn test(&mut self, flags: CodeFlags);

    // Binary operations: left operand on the stack (or in the primary for
    // the constant forms), right operand in the primary or immediate.
    fn add(&mut self, flags: CodeFlags, val: i64);
    fn sub(&mut self, flags: CodeFlags, val: i64);
    fn mul(&mut self, flags: CodeFlags, val: i64);
    fn div(&mut self, flags: CodeFlags, val: i64);
    fn modulo(&mut self, flags: CodeFlags, val: i64);
    fn and(&mut self, flags: CodeFlags, val: i64);
    fn or(&mut self, flags: CodeFlags, val: i64);
    fn xor(&mut self, flags: CodeFlags, val: i64);
    fn asl(&mut self, flags: CodeFlags, val: i64);
    fn asr(&mut self, flags: CodeFlags, val: i64);

    // Unary operations on the primary register.
    fn neg(&mut self, flags: CodeFlags);
    fn com(&mut self, flags: CodeFlags);
    fn bneg(&mut self, flags: CodeFlags);

    // Comparisons; the boolean result lands in the primary register and the
    // condition codes reflect it.
    fn eq(&mut self, flags: CodeFlags, val: i64);
    fn ne(&mut self, flags: CodeFlags, val: i64);
    fn lt(&mut self, flags: CodeFlags, val: i64);
    fn le(&mut self, flags: CodeFlags, val: i64);
    fn gt(&mut self, flags: CodeFlags, val: i64);
    fn ge(&mut self, flags: CodeFlags, val: i64);

    /// Add a constant to the primary register.
    fn inc(&mut self, flags: CodeFlags, val: i64);

    /// Subtract a constant from the primary register.
    fn dec(&mut self, flags: CodeFlags, val: i64);

    /// Add the value at a named location to the primary register.
    fn add_static(&mut self, flags: CodeFlags, name: &str, offs: i64);

    /// Add the value of a stack slot to the primary register.
    fn add_local(&mut self, flags: CodeFlags, offs: i32);

    /// Add the address of a named location to the primary register.
    fn add_addr_static(&mut self, flags: CodeFlags, name: &str, offs: i64);

    /// Add the address of a stack slot to the primary register.
    fn add_addr_local(&mut self, flags: CodeFlags, offs: i32);

    // In-memory add/subtract, used by the compound assignment operators and
    // by pre/post increment. With `CONST` the amount is `val`, otherwise it
    // is taken from the primary register.
    fn addeq_static(&mut self, flags: CodeFlags, name: &str, offs: i64, val: i64);
    fn addeq_local(&mut self, flags: CodeFlags, offs: i32, val: i64);
    fn addeq_ind(&mut self, flags: CodeFlags, offs: i64, val: i64);
    fn subeq_static(&mut self, flags: CodeFlags, name: &str, offs: i64, val: i64);
    fn subeq_local(&mut self, flags: CodeFlags, offs: i32, val: i64);
    fn subeq_ind(&mut self, flags: CodeFlags, offs: i64, val: i64);

    /// Scale the primary register by a constant factor. Negative factors
    /// divide. Used for pointer arithmetic.
    fn scale(&mut self, flags: CodeFlags, factor: i64);

    /// Adjust the left operand (on stack) and right operand (primary or
    /// immediate) to a common type for a binary operation and return the
    /// flags for that operation.
    fn typeadjust(&mut self, lhs: CodeFlags, rhs: CodeFlags) -> CodeFlags;

    /// Convert the value in the primary register from the `from` type to
    /// the `to` type.
    fn typecast(&mut self, to: CodeFlags, from: CodeFlags);

    /// Force the value on top of stack to int width.
    fn tos_int(&mut self, flags: CodeFlags);

    /// Call a function by name. `arg_size` bytes of arguments are removed
    /// by the callee.
    fn call(&mut self, flags: CodeFlags, name: &str, arg_size: u32);

    /// Call through a function pointer, either in the primary register or,
    /// with the `STACK` location flag, at a stack offset.
    fn callind(&mut self, flags: CodeFlags, arg_size: u32, ptr_offs: i32);

    /// Jump to a label if the tested value was true.
    fn true_jump(&mut self, flags: CodeFlags, label: u32);

    /// Jump to a label if the tested value was false.
    fn false_jump(&mut self, flags: CodeFlags, label: u32);

    /// Unconditional jump to a label.
    fn jump(&mut self, label: u32);
}

/// Format a memory operand from a label name and byte offset.
fn addr(name: &str, offs: i64) -> String {
    if offs == 0 {
        name.to_string()
    } else if offs > 0 {
        format!("{}+{}", name, offs)
    } else {
        format!("{}-{}", name, -offs)
    }
}

/// Split an immediate into its bytes for the given width.
fn bytes_of(val: i64) -> [u8; 4] {
    (val as u32).to_le_bytes()
}

impl Codegen {
    /// The Y register offset addressing a stack slot relative to the
    /// current virtual stack pointer.
    fn stack_offs(&self, offs: i32) -> u8 {
        (offs - self.stack_ptr) as u8
    }

    /// Extend a char in A to an int in A/X.
    fn extend_char(&mut self, flags: CodeFlags) {
        if flags.contains(CodeFlags::UNSIGNED) {
            self.add_code_line("ldx #$00");
        } else {
            self.add_code_line("jsr sexta");
        }
    }

    /// Emit a call to a runtime routine taking the left operand on the
    /// stack and the right in the primary. The stacked operand is consumed.
    fn oper(&mut self, flags: CodeFlags, signed_base: &str, unsigned_base: &str) {
        let base = if flags.contains(CodeFlags::UNSIGNED) {
            unsigned_base
        } else {
            signed_base
        };
        let suffix = if flags.contains(CodeFlags::LONG) {
            "eax"
        } else {
            "ax"
        };
        self.add_code_line(format!("jsr tos{}{}", base, suffix));
        self.stack_ptr += if flags.contains(CodeFlags::LONG) { 4 } else { 2 };
    }

    /// Push the constant right operand and emit the generic routine.
    fn oper_const(&mut self, flags: CodeFlags, val: i64, signed_base: &str, unsigned_base: &str) {
        // The left operand is in the primary; bring it onto the stack and
        // load the constant, then use the generic routine.
        let push_flags = (flags & !(CodeFlags::CONST | CodeFlags::FORCECHAR)) | CodeFlags::PRIMARY;
        self.push(push_flags, 0);
        self.get_immed(flags & !CodeFlags::CONST, val);
        self.oper(flags, signed_base, unsigned_base);
    }
}

impl EmitHelpers for Codegen {
    fn get_immed(&mut self, flags: CodeFlags, val: i64) {
        let b = bytes_of(val);
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line(format!("lda #${:02X}", b[0]));
            self.add_code_line(format!("ldx #${:02X}", b[1]));
            self.add_code_line(format!("ldy #${:02X}", b[2]));
            self.add_code_line("sty sreg");
            self.add_code_line(format!("ldy #${:02X}", b[3]));
            self.add_code_line("sty sreg+1");
        } else if flags.contains(CodeFlags::INT) {
            self.add_code_line(format!("ldx #${:02X}", b[1]));
            self.add_code_line(format!("lda #${:02X}", b[0]));
        } else {
            self.add_code_line(format!("lda #${:02X}", b[0]));
        }
    }

    fn get_immed_addr(&mut self, _flags: CodeFlags, name: &str, offs: i64) {
        let a = addr(name, offs);
        self.add_code_line(format!("lda #<({})", a));
        self.add_code_line(format!("ldx #>({})", a));
    }

    fn get_static(&mut self, flags: CodeFlags, name: &str, offs: i64) {
        let a = addr(name, offs);
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line(format!("lda {}", a));
            self.add_code_line(format!("ldx {}", addr(name, offs + 1)));
            self.add_code_line(format!("ldy {}", addr(name, offs + 2)));
            self.add_code_line("sty sreg");
            self.add_code_line(format!("ldy {}", addr(name, offs + 3)));
            self.add_code_line("sty sreg+1");
        } else if flags.contains(CodeFlags::INT) {
            self.add_code_line(format!("lda {}", a));
            self.add_code_line(format!("ldx {}", addr(name, offs + 1)));
        } else {
            self.add_code_line(format!("lda {}", a));
            if !flags.contains(CodeFlags::FORCECHAR) {
                self.extend_char(flags);
            }
        }
    }

    fn put_static(&mut self, flags: CodeFlags, name: &str, offs: i64) {
        let a = addr(name, offs);
        self.add_code_line(format!("sta {}", a));
        if flags.intersects(CodeFlags::INT | CodeFlags::LONG) {
            self.add_code_line(format!("stx {}", addr(name, offs + 1)));
        }
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line("ldy sreg");
            self.add_code_line(format!("sty {}", addr(name, offs + 2)));
            self.add_code_line("ldy sreg+1");
            self.add_code_line(format!("sty {}", addr(name, offs + 3)));
        }
    }

    fn get_local(&mut self, flags: CodeFlags, offs: i32) {
        let y = self.stack_offs(offs);
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line(format!("ldy #${:02X}", y.wrapping_add(3)));
            self.add_code_line("jsr ldeaxysp");
        } else if flags.contains(CodeFlags::INT) {
            self.add_code_line(format!("ldy #${:02X}", y.wrapping_add(1)));
            self.add_code_line("jsr ldaxysp");
        } else {
            self.add_code_line(format!("ldy #${:02X}", y));
            self.add_code_line("lda (sp),y");
            if !flags.contains(CodeFlags::FORCECHAR) {
                self.extend_char(flags);
            }
        }
    }

    fn put_local(&mut self, flags: CodeFlags, offs: i32, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            self.get_immed(flags & !CodeFlags::CONST, val);
        }
        let y = self.stack_offs(offs);
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line(format!("ldy #${:02X}", y.wrapping_add(3)));
            self.add_code_line("jsr steaxysp");
        } else if flags.contains(CodeFlags::INT) {
            self.add_code_line(format!("ldy #${:02X}", y.wrapping_add(1)));
            self.add_code_line("jsr staxysp");
        } else {
            self.add_code_line(format!("ldy #${:02X}", y));
            self.add_code_line("sta (sp),y");
        }
    }

    fn ind_load(&mut self, flags: CodeFlags, offs: i64) {
        if flags.contains(CodeFlags::LONG) {
            if offs != 0 {
                self.inc(CodeFlags::PTR | CodeFlags::CONST, offs);
            }
            self.add_code_line("jsr ldeaxi");
            return;
        }
        self.add_code_line("sta ptr1");
        self.add_code_line("stx ptr1+1");
        if flags.contains(CodeFlags::INT) {
            self.add_code_line(format!("ldy #${:02X}", (offs + 1) as u8));
            self.add_code_line("lda (ptr1),y");
            self.add_code_line("tax");
            self.add_code_line("dey");
            self.add_code_line("lda (ptr1),y");
        } else {
            self.add_code_line(format!("ldy #${:02X}", offs as u8));
            self.add_code_line("lda (ptr1),y");
            if !flags.contains(CodeFlags::FORCECHAR) {
                self.extend_char(flags);
            }
        }
    }

    fn put_ind(&mut self, flags: CodeFlags, offs: i64) {
        self.add_code_line(format!("ldy #${:02X}", offs as u8));
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line("jsr steaxspidx");
        } else if flags.contains(CodeFlags::INT) {
            self.add_code_line("jsr staxspidx");
        } else {
            self.add_code_line("jsr staspidx");
        }
        // The pointer below the value is consumed.
        self.stack_ptr += 2;
    }

    fn lea_local(&mut self, offs: i32) {
        let y = self.stack_offs(offs);
        self.add_code_line(format!("ldy #${:02X}", y));
        self.add_code_line("jsr leaaxsp");
    }

    fn lea_variadic(&mut self, offs: i32) {
        let y = self.stack_offs(offs);
        self.add_code_line(format!("ldy #${:02X}", y));
        self.add_code_line("jsr leaaxvarsp");
    }

    fn push(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            self.get_immed(flags & !CodeFlags::CONST, val);
        }
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line("jsr pusheax");
            self.stack_ptr -= 4;
        } else if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line("jsr pusha");
            self.stack_ptr -= 1;
        } else {
            // Chars without FORCECHAR were already extended when loaded;
            // they push as ints.
            self.add_code_line("jsr pushax");
            self.stack_ptr -= 2;
        }
    }

    fn pop(&mut self, flags: CodeFlags) {
        self.stack_ptr += flags.sizeof_arg() as i32;
    }

    fn drop_bytes(&mut self, n: u32) {
        if n == 0 {
            return;
        }
        if n <= 8 {
            self.add_code_line(format!("jsr incsp{}", n));
        } else {
            self.add_code_line(format!("ldy #${:02X}", n as u8));
            self.add_code_line("jsr addysp");
        }
        self.stack_ptr += n as i32;
    }

    fn space(&mut self, n: u32) {
        if n == 0 {
            return;
        }
        if n <= 8 {
            self.add_code_line(format!("jsr decsp{}", n));
        } else {
            self.add_code_line(format!("ldy #${:02X}", n as u8));
            self.add_code_line("jsr subysp");
        }
        self.stack_ptr -= n as i32;
    }

    fn swap(&mut self, flags: CodeFlags) {
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line("jsr swapeax");
        } else {
            self.add_code_line("jsr swapax");
        }
    }

    fn save(&mut self, flags: CodeFlags) {
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line("jsr saveeax");
        } else if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line("pha");
        } else {
            self.add_code_line("sta regsave");
            self.add_code_line("stx regsave+1");
        }
    }

    fn restore(&mut self, flags: CodeFlags) {
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line("jsr resteax");
        } else if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line("pla");
        } else {
            self.add_code_line("lda regsave");
            self.add_code_line("ldx regsave+1");
        }
    }

    fn test(&mut self, flags: CodeFlags) {
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line("jsr testeax");
        } else if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line("cmp #$00");
        } else {
            self.add_code_line("stx tmp1");
            self.add_code_line("ora tmp1");
        }
    }

    fn add(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            self.inc(flags, val);
        } else {
            self.oper(flags, "add", "add");
        }
    }

    fn sub(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            self.dec(flags, val);
        } else {
            self.oper(flags, "sub", "sub");
        }
    }

    fn mul(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if val > 0 && (val & (val - 1)) == 0 {
                // Multiplication by a power of two shifts.
                self.asl(flags, val.trailing_zeros() as i64);
                return;
            }
            self.oper_const(flags, val, "mul", "umul");
        } else {
            self.oper(flags, "mul", "umul");
        }
    }

    fn div(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if flags.contains(CodeFlags::UNSIGNED) && val > 0 && (val & (val - 1)) == 0 {
                // Unsigned division by a power of two shifts.
                self.asr(flags, val.trailing_zeros() as i64);
                return;
            }
            self.oper_const(flags, val, "div", "udiv");
        } else {
            self.oper(flags, "div", "udiv");
        }
    }

    fn modulo(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if flags.contains(CodeFlags::UNSIGNED) && val > 0 && (val & (val - 1)) == 0 {
                // Unsigned modulo by a power of two masks.
                self.and(flags, val - 1);
                return;
            }
            self.oper_const(flags, val, "mod", "umod");
        } else {
            self.oper(flags, "mod", "umod");
        }
    }

    fn and(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if !flags.intersects(CodeFlags::INT | CodeFlags::LONG) {
                self.add_code_line(format!("and #${:02X}", val as u8));
                return;
            }
            self.oper_const(flags, val, "and", "and");
        } else {
            self.oper(flags, "and", "and");
        }
    }

    fn or(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if !flags.intersects(CodeFlags::INT | CodeFlags::LONG) {
                self.add_code_line(format!("ora #${:02X}", val as u8));
                return;
            }
            self.oper_const(flags, val, "or", "or");
        } else {
            self.oper(flags, "or", "or");
        }
    }

    fn xor(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if !flags.intersects(CodeFlags::INT | CodeFlags::LONG) {
                self.add_code_line(format!("eor #${:02X}", val as u8));
                return;
            }
            self.oper_const(flags, val, "xor", "xor");
        } else {
            self.oper(flags, "xor", "xor");
        }
    }

    fn asl(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if val <= 0 {
                return;
            }
            if flags.contains(CodeFlags::LONG) {
                self.add_code_line(format!("jsr asleax{}", val));
            } else {
                self.add_code_line(format!("jsr aslax{}", val));
            }
        } else {
            self.oper(flags, "asl", "asl");
        }
    }

    fn asr(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if val <= 0 {
                return;
            }
            let name = match (
                flags.contains(CodeFlags::LONG),
                flags.contains(CodeFlags::UNSIGNED),
            ) {
                (true, true) => "shreax",
                (true, false) => "asreax",
                (false, true) => "shrax",
                (false, false) => "asrax",
            };
            self.add_code_line(format!("jsr {}{}", name, val));
        } else {
            self.oper(flags, "asr", "shr");
        }
    }

    fn neg(&mut self, flags: CodeFlags) {
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line("jsr negeax");
        } else {
            self.add_code_line("jsr negax");
        }
    }

    fn com(&mut self, flags: CodeFlags) {
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line("jsr compleax");
        } else {
            self.add_code_line("jsr complax");
        }
    }

    fn bneg(&mut self, flags: CodeFlags) {
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line("jsr bnegeax");
        } else if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line("jsr bnega");
        } else {
            self.add_code_line("jsr bnegax");
        }
    }

    fn eq(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
                self.add_code_line(format!("cmp #${:02X}", val as u8));
                self.add_code_line("jsr booleq");
                return;
            }
            self.oper_const(flags, val, "eq", "eq");
        } else {
            self.oper(flags, "eq", "eq");
        }
    }

    fn ne(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
                self.add_code_line(format!("cmp #${:02X}", val as u8));
                self.add_code_line("jsr boolne");
                return;
            }
            self.oper_const(flags, val, "ne", "ne");
        } else {
            self.oper(flags, "ne", "ne");
        }
    }

    fn lt(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
                self.add_code_line(format!("cmp #${:02X}", val as u8));
                let routine = if flags.contains(CodeFlags::UNSIGNED) {
                    "boolult"
                } else {
                    "boollt"
                };
                self.add_code_line(format!("jsr {}", routine));
                return;
            }
            self.oper_const(flags, val, "lt", "ult");
        } else {
            self.oper(flags, "lt", "ult");
        }
    }

    fn le(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
                self.add_code_line(format!("cmp #${:02X}", val as u8));
                let routine = if flags.contains(CodeFlags::UNSIGNED) {
                    "boolule"
                } else {
                    "boolle"
                };
                self.add_code_line(format!("jsr {}", routine));
                return;
            }
            self.oper_const(flags, val, "le", "ule");
        } else {
            self.oper(flags, "le", "ule");
        }
    }

    fn gt(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
                self.add_code_line(format!("cmp #${:02X}", val as u8));
                let routine = if flags.contains(CodeFlags::UNSIGNED) {
                    "boolugt"
                } else {
                    "boolgt"
                };
                self.add_code_line(format!("jsr {}", routine));
                return;
            }
            self.oper_const(flags, val, "gt", "ugt");
        } else {
            self.oper(flags, "gt", "ugt");
        }
    }

    fn ge(&mut self, flags: CodeFlags, val: i64) {
        if flags.contains(CodeFlags::CONST) {
            if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
                self.add_code_line(format!("cmp #${:02X}", val as u8));
                let routine = if flags.contains(CodeFlags::UNSIGNED) {
                    "booluge"
                } else {
                    "boolge"
                };
                self.add_code_line(format!("jsr {}", routine));
                return;
            }
            self.oper_const(flags, val, "ge", "uge");
        } else {
            self.oper(flags, "ge", "uge");
        }
    }

    fn inc(&mut self, flags: CodeFlags, val: i64) {
        if val == 0 {
            return;
        }
        let b = bytes_of(val);
        if flags.contains(CodeFlags::LONG) {
            let push_flags = flags & !(CodeFlags::CONST | CodeFlags::FORCECHAR);
            self.push(push_flags, 0);
            self.get_immed(flags & !CodeFlags::CONST, val);
            self.oper(flags, "add", "add");
        } else if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line("clc");
            self.add_code_line(format!("adc #${:02X}", b[0]));
        } else if val >= 0 && val < 256 {
            self.add_code_line("clc");
            self.add_code_line(format!("adc #${:02X}", b[0]));
            self.add_code_line("bcc *+3");
            self.add_code_line("inx");
        } else {
            self.add_code_line("clc");
            self.add_code_line(format!("adc #${:02X}", b[0]));
            self.add_code_line("tay");
            self.add_code_line("txa");
            self.add_code_line(format!("adc #${:02X}", b[1]));
            self.add_code_line("tax");
            self.add_code_line("tya");
        }
    }

    fn dec(&mut self, flags: CodeFlags, val: i64) {
        if val == 0 {
            return;
        }
        let b = bytes_of(val);
        if flags.contains(CodeFlags::LONG) {
            let push_flags = flags & !(CodeFlags::CONST | CodeFlags::FORCECHAR);
            self.push(push_flags, 0);
            self.get_immed(flags & !CodeFlags::CONST, val);
            self.oper(flags, "sub", "sub");
        } else if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line("sec");
            self.add_code_line(format!("sbc #${:02X}", b[0]));
        } else if val >= 0 && val < 256 {
            self.add_code_line("sec");
            self.add_code_line(format!("sbc #${:02X}", b[0]));
            self.add_code_line("bcs *+3");
            self.add_code_line("dex");
        } else {
            self.add_code_line("sec");
            self.add_code_line(format!("sbc #${:02X}", b[0]));
            self.add_code_line("tay");
            self.add_code_line("txa");
            self.add_code_line(format!("sbc #${:02X}", b[1]));
            self.add_code_line("tax");
            self.add_code_line("tya");
        }
    }

    fn add_static(&mut self, flags: CodeFlags, name: &str, offs: i64) {
        let a = addr(name, offs);
        if flags.contains(CodeFlags::LONG) {
            let push_flags = flags & !(CodeFlags::CONST | CodeFlags::FORCECHAR);
            self.push(push_flags, 0);
            self.get_static(flags, name, offs);
            self.oper(flags, "add", "add");
        } else if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line("clc");
            self.add_code_line(format!("adc {}", a));
        } else if flags.contains(CodeFlags::CHAR) {
            self.add_code_line("clc");
            self.add_code_line(format!("adc {}", a));
            self.add_code_line("bcc *+3");
            self.add_code_line("inx");
        } else {
            self.add_code_line("clc");
            self.add_code_line(format!("adc {}", a));
            self.add_code_line("tay");
            self.add_code_line("txa");
            self.add_code_line(format!("adc {}", addr(name, offs + 1)));
            self.add_code_line("tax");
            self.add_code_line("tya");
        }
    }

    fn add_local(&mut self, flags: CodeFlags, offs: i32) {
        let y = self.stack_offs(offs);
        self.add_code_line(format!("ldy #${:02X}", y));
        if flags.contains(CodeFlags::CHAR) {
            self.add_code_line("clc");
            self.add_code_line("adc (sp),y");
            if !flags.contains(CodeFlags::FORCECHAR) {
                self.add_code_line("bcc *+3");
                self.add_code_line("inx");
            }
        } else {
            self.add_code_line("jsr addwysp");
        }
    }

    fn add_addr_static(&mut self, _flags: CodeFlags, name: &str, offs: i64) {
        let a = addr(name, offs);
        self.add_code_line("clc");
        self.add_code_line(format!("adc #<({})", a));
        self.add_code_line("tay");
        self.add_code_line("txa");
        self.add_code_line(format!("adc #>({})", a));
        self.add_code_line("tax");
        self.add_code_line("tya");
    }

    fn add_addr_local(&mut self, _flags: CodeFlags, offs: i32) {
        let y = self.stack_offs(offs);
        self.add_code_line(format!("ldy #${:02X}", y));
        self.add_code_line("jsr addaddrysp");
    }

    fn addeq_static(&mut self, flags: CodeFlags, name: &str, offs: i64, val: i64) {
        let a = addr(name, offs);
        let hi = addr(name, offs + 1);
        if flags.contains(CodeFlags::LONG) {
            self.get_immed_addr(CodeFlags::PTR, name, offs);
            self.add_code_line("sta ptr1");
            self.add_code_line("stx ptr1+1");
            if flags.contains(CodeFlags::CONST) {
                self.get_immed(flags & !CodeFlags::CONST, val);
            }
            self.add_code_line("jsr laddeq");
            return;
        }
        if flags.contains(CodeFlags::CONST) {
            if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
                if val == 1 && flags.contains(CodeFlags::NOKEEP) {
                    self.add_code_line(format!("inc {}", a));
                } else {
                    self.add_code_line(format!("lda {}", a));
                    self.add_code_line("clc");
                    self.add_code_line(format!("adc #${:02X}", val as u8));
                    self.add_code_line(format!("sta {}", a));
                }
            } else if val == 1 && flags.contains(CodeFlags::NOKEEP) {
                self.add_code_line(format!("inc {}", a));
                self.add_code_line("bne *+5");
                self.add_code_line(format!("inc {}", hi));
            } else {
                let b = bytes_of(val);
                self.add_code_line(format!("lda {}", a));
                self.add_code_line("clc");
                self.add_code_line(format!("adc #${:02X}", b[0]));
                self.add_code_line(format!("sta {}", a));
                self.add_code_line(format!("lda {}", hi));
                self.add_code_line(format!("adc #${:02X}", b[1]));
                self.add_code_line(format!("sta {}", hi));
                if !flags.contains(CodeFlags::NOKEEP) {
                    self.add_code_line("tax");
                    self.add_code_line(format!("lda {}", a));
                }
            }
        } else if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line("clc");
            self.add_code_line(format!("adc {}", a));
            self.add_code_line(format!("sta {}", a));
        } else {
            self.add_code_line("clc");
            self.add_code_line(format!("adc {}", a));
            self.add_code_line(format!("sta {}", a));
            self.add_code_line("txa");
            self.add_code_line(format!("adc {}", hi));
            self.add_code_line(format!("sta {}", hi));
            if !flags.contains(CodeFlags::NOKEEP) {
                self.add_code_line("tax");
                self.add_code_line(format!("lda {}", a));
            }
        }
    }

    fn addeq_local(&mut self, flags: CodeFlags, offs: i32, val: i64) {
        let y = self.stack_offs(offs);
        if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line(format!("ldy #${:02X}", y));
            if flags.contains(CodeFlags::CONST) {
                self.add_code_line("lda (sp),y");
                self.add_code_line("clc");
                self.add_code_line(format!("adc #${:02X}", val as u8));
                self.add_code_line("sta (sp),y");
            } else {
                self.add_code_line("clc");
                self.add_code_line("adc (sp),y");
                self.add_code_line("sta (sp),y");
            }
        } else {
            if flags.contains(CodeFlags::CONST) {
                self.get_immed(flags & !CodeFlags::CONST, val);
            }
            self.add_code_line(format!("ldy #${:02X}", y));
            if flags.contains(CodeFlags::LONG) {
                self.add_code_line("jsr laddeqysp");
            } else {
                self.add_code_line("jsr addeqysp");
            }
        }
    }

    fn addeq_ind(&mut self, flags: CodeFlags, offs: i64, val: i64) {
        debug_assert!(flags.contains(CodeFlags::CONST));
        self.add_code_line("sta ptr1");
        self.add_code_line("stx ptr1+1");
        let b = bytes_of(val);
        if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line(format!("ldy #${:02X}", offs as u8));
            self.add_code_line("lda (ptr1),y");
            self.add_code_line("clc");
            self.add_code_line(format!("adc #${:02X}", b[0]));
            self.add_code_line("sta (ptr1),y");
        } else if flags.contains(CodeFlags::LONG) {
            if offs != 0 {
                self.add_code_line(format!("ldy #${:02X}", offs as u8));
                self.add_code_line("jsr incptr1y");
            }
            self.get_immed(flags & !CodeFlags::CONST, val);
            self.add_code_line("jsr laddeq");
        } else {
            self.add_code_line(format!("ldy #${:02X}", offs as u8));
            self.add_code_line("lda (ptr1),y");
            self.add_code_line("clc");
            self.add_code_line(format!("adc #${:02X}", b[0]));
            self.add_code_line("sta (ptr1),y");
            self.add_code_line("iny");
            self.add_code_line("lda (ptr1),y");
            self.add_code_line(format!("adc #${:02X}", b[1]));
            self.add_code_line("sta (ptr1),y");
        }
    }

    fn subeq_static(&mut self, flags: CodeFlags, name: &str, offs: i64, val: i64) {
        let a = addr(name, offs);
        let hi = addr(name, offs + 1);
        if flags.contains(CodeFlags::LONG) {
            self.get_immed_addr(CodeFlags::PTR, name, offs);
            self.add_code_line("sta ptr1");
            self.add_code_line("stx ptr1+1");
            if flags.contains(CodeFlags::CONST) {
                self.get_immed(flags & !CodeFlags::CONST, val);
            }
            self.add_code_line("jsr lsubeq");
            return;
        }
        if flags.contains(CodeFlags::CONST) {
            if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
                if val == 1 && flags.contains(CodeFlags::NOKEEP) {
                    self.add_code_line(format!("dec {}", a));
                } else {
                    self.add_code_line(format!("lda {}", a));
                    self.add_code_line("sec");
                    self.add_code_line(format!("sbc #${:02X}", val as u8));
                    self.add_code_line(format!("sta {}", a));
                }
            } else if val == 1 && flags.contains(CodeFlags::NOKEEP) {
                self.add_code_line(format!("lda {}", a));
                self.add_code_line("bne *+5");
                self.add_code_line(format!("dec {}", hi));
                self.add_code_line(format!("dec {}", a));
            } else {
                let b = bytes_of(val);
                self.add_code_line(format!("lda {}", a));
                self.add_code_line("sec");
                self.add_code_line(format!("sbc #${:02X}", b[0]));
                self.add_code_line(format!("sta {}", a));
                self.add_code_line(format!("lda {}", hi));
                self.add_code_line(format!("sbc #${:02X}", b[1]));
                self.add_code_line(format!("sta {}", hi));
                if !flags.contains(CodeFlags::NOKEEP) {
                    self.add_code_line("tax");
                    self.add_code_line(format!("lda {}", a));
                }
            }
        } else if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line("sta tmp1");
            self.add_code_line(format!("lda {}", a));
            self.add_code_line("sec");
            self.add_code_line("sbc tmp1");
            self.add_code_line(format!("sta {}", a));
        } else {
            self.add_code_line("sta tmp1");
            self.add_code_line("stx tmp1+1");
            self.add_code_line(format!("lda {}", a));
            self.add_code_line("sec");
            self.add_code_line("sbc tmp1");
            self.add_code_line(format!("sta {}", a));
            self.add_code_line(format!("lda {}", hi));
            self.add_code_line("sbc tmp1+1");
            self.add_code_line(format!("sta {}", hi));
            if !flags.contains(CodeFlags::NOKEEP) {
                self.add_code_line("tax");
                self.add_code_line(format!("lda {}", a));
            }
        }
    }

    fn subeq_local(&mut self, flags: CodeFlags, offs: i32, val: i64) {
        let y = self.stack_offs(offs);
        if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line(format!("ldy #${:02X}", y));
            if flags.contains(CodeFlags::CONST) {
                self.add_code_line("lda (sp),y");
                self.add_code_line("sec");
                self.add_code_line(format!("sbc #${:02X}", val as u8));
                self.add_code_line("sta (sp),y");
            } else {
                self.add_code_line("sta tmp1");
                self.add_code_line("lda (sp),y");
                self.add_code_line("sec");
                self.add_code_line("sbc tmp1");
                self.add_code_line("sta (sp),y");
            }
        } else {
            if flags.contains(CodeFlags::CONST) {
                self.get_immed(flags & !CodeFlags::CONST, val);
            }
            self.add_code_line(format!("ldy #${:02X}", y));
            if flags.contains(CodeFlags::LONG) {
                self.add_code_line("jsr lsubeqysp");
            } else {
                self.add_code_line("jsr subeqysp");
            }
        }
    }

    fn subeq_ind(&mut self, flags: CodeFlags, offs: i64, val: i64) {
        debug_assert!(flags.contains(CodeFlags::CONST));
        self.add_code_line("sta ptr1");
        self.add_code_line("stx ptr1+1");
        let b = bytes_of(val);
        if flags.contains(CodeFlags::CHAR) && flags.contains(CodeFlags::FORCECHAR) {
            self.add_code_line(format!("ldy #${:02X}", offs as u8));
            self.add_code_line("lda (ptr1),y");
            self.add_code_line("sec");
            self.add_code_line(format!("sbc #${:02X}", b[0]));
            self.add_code_line("sta (ptr1),y");
        } else if flags.contains(CodeFlags::LONG) {
            if offs != 0 {
                self.add_code_line(format!("ldy #${:02X}", offs as u8));
                self.add_code_line("jsr incptr1y");
            }
            self.get_immed(flags & !CodeFlags::CONST, val);
            self.add_code_line("jsr lsubeq");
        } else {
            self.add_code_line(format!("ldy #${:02X}", offs as u8));
            self.add_code_line("lda (ptr1),y");
            self.add_code_line("sec");
            self.add_code_line(format!("sbc #${:02X}", b[0]));
            self.add_code_line("sta (ptr1),y");
            self.add_code_line("iny");
            self.add_code_line("lda (ptr1),y");
            self.add_code_line(format!("sbc #${:02X}", b[1]));
            self.add_code_line("sta (ptr1),y");
        }
    }

    fn scale(&mut self, flags: CodeFlags, factor: i64) {
        if factor == 1 || factor == 0 {
            return;
        }
        if factor > 1 {
            if factor & (factor - 1) == 0 {
                self.asl(flags | CodeFlags::CONST, factor.trailing_zeros() as i64);
            } else {
                self.mul(flags | CodeFlags::CONST, factor);
            }
        } else {
            let factor = -factor;
            if factor & (factor - 1) == 0 {
                self.asr(
                    flags | CodeFlags::CONST | CodeFlags::UNSIGNED,
                    factor.trailing_zeros() as i64,
                );
            } else {
                self.div(flags | CodeFlags::CONST, factor);
            }
        }
    }

    fn typeadjust(&mut self, lhs: CodeFlags, rhs: CodeFlags) -> CodeFlags {
        // Either operand long: the result is long, and both operands are
        // widened as needed. Constant operands adjust for free.
        if lhs.contains(CodeFlags::LONG) || rhs.contains(CodeFlags::LONG) {
            if !rhs.contains(CodeFlags::LONG) && !rhs.contains(CodeFlags::CONST) {
                // Right side is in the primary.
                if rhs.contains(CodeFlags::UNSIGNED) {
                    self.add_code_line("jsr axulong");
                } else {
                    self.add_code_line("jsr axlong");
                }
            }
            if !lhs.contains(CodeFlags::LONG) && !lhs.contains(CodeFlags::CONST) {
                if lhs.contains(CodeFlags::PRIMARY) {
                    // NOPUSH form: the left side is still in the primary.
                    if lhs.contains(CodeFlags::UNSIGNED) {
                        self.add_code_line("jsr axulong");
                    } else {
                        self.add_code_line("jsr axlong");
                    }
                } else {
                    // Left side is on the stack; widen it in place.
                    if lhs.contains(CodeFlags::UNSIGNED) {
                        self.add_code_line("jsr tosulong");
                    } else {
                        self.add_code_line("jsr toslong");
                    }
                    self.stack_ptr -= 2;
                }
            }
            let unsigned = (lhs.contains(CodeFlags::LONG) && lhs.contains(CodeFlags::UNSIGNED))
                || (rhs.contains(CodeFlags::LONG) && rhs.contains(CodeFlags::UNSIGNED));
            return if unsigned {
                CodeFlags::LONG | CodeFlags::UNSIGNED
            } else {
                CodeFlags::LONG
            };
        }

        // Both operands char sized: the operation may stay char sized.
        if lhs.contains(CodeFlags::CHAR) && rhs.contains(CodeFlags::CHAR) {
            let unsigned =
                lhs.contains(CodeFlags::UNSIGNED) || rhs.contains(CodeFlags::UNSIGNED);
            let mut result = CodeFlags::CHAR | CodeFlags::FORCECHAR;
            if unsigned {
                result |= CodeFlags::UNSIGNED;
            }
            return result;
        }

        // Everything else is an int operation; it is unsigned if an
        // int-sized operand is unsigned (chars promote to signed int).
        let unsigned = (lhs.contains(CodeFlags::INT) && lhs.contains(CodeFlags::UNSIGNED))
            || (rhs.contains(CodeFlags::INT) && rhs.contains(CodeFlags::UNSIGNED));
        if unsigned {
            CodeFlags::INT | CodeFlags::UNSIGNED
        } else {
            CodeFlags::INT
        }
    }

    fn typecast(&mut self, to: CodeFlags, from: CodeFlags) {
        let to_width = to.width();
        let mut from_width = from.width();
        if from.contains(CodeFlags::CONST) {
            // Immediates are re-emitted at the right width by the caller.
            return;
        }
        if to_width > from_width && from_width == 1 {
            self.extend_char(from);
            from_width = 2;
        }
        if to_width > from_width && to_width == 4 {
            if from.contains(CodeFlags::UNSIGNED) {
                self.add_code_line("jsr axulong");
            } else {
                self.add_code_line("jsr axlong");
            }
        }
        // Narrowing needs no code: the callee reads fewer bytes.
    }

    fn tos_int(&mut self, flags: CodeFlags) {
        if flags.contains(CodeFlags::LONG) {
            self.add_code_line("jsr tosint");
            self.stack_ptr += 2;
        }
    }

    fn call(&mut self, _flags: CodeFlags, name: &str, arg_size: u32) {
        self.add_code_line(format!("jsr _{}", name));
        self.stack_ptr += arg_size as i32;
    }

    fn callind(&mut self, flags: CodeFlags, arg_size: u32, ptr_offs: i32) {
        if flags.contains(CodeFlags::STACK) {
            let y = self.stack_offs(ptr_offs);
            self.add_code_line(format!("ldy #${:02X}", y.wrapping_add(1)));
            self.add_code_line("jsr callysp");
        } else {
            self.add_code_line("jsr callax");
        }
        self.stack_ptr += arg_size as i32;
    }

    fn true_jump(&mut self, _flags: CodeFlags, label: u32) {
        self.add_code_line(format!("jne {}", Codegen::local_label_name(label)));
    }

    fn false_jump(&mut self, _flags: CodeFlags, label: u32) {
        self.add_code_line(format!("jeq {}", Codegen::local_label_name(label)));
    }

    fn jump(&mut self, label: u32) {
        self.add_code_line(format!("jmp {}", Codegen::local_label_name(label)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_balance() {
        let mut cg = Codegen::new();
        cg.push(CodeFlags::INT, 0);
        assert_eq!(cg.stack_ptr, -2);
        cg.push(CodeFlags::LONG | CodeFlags::CONST, 5);
        assert_eq!(cg.stack_ptr, -6);
        cg.pop(CodeFlags::LONG);
        cg.pop(CodeFlags::INT);
        assert_eq!(cg.stack_ptr, 0);
    }

    #[test]
    fn test_char_push_is_promoted_without_forcechar() {
        let mut cg = Codegen::new();
        cg.push(CodeFlags::CHAR | CodeFlags::UNSIGNED, 0);
        assert_eq!(cg.stack_ptr, -2);

        let mut cg = Codegen::new();
        cg.push(CodeFlags::CHAR | CodeFlags::FORCECHAR, 0);
        assert_eq!(cg.stack_ptr, -1);
        assert_eq!(cg.lines().last().unwrap(), "jsr pusha");
    }

    #[test]
    fn test_binary_op_consumes_stack_operand() {
        let mut cg = Codegen::new();
        cg.push(CodeFlags::INT, 0);
        cg.add(CodeFlags::INT, 0);
        assert_eq!(cg.stack_ptr, 0);
        assert!(cg.lines().contains(&"jsr tosaddax".to_string()));
    }

    #[test]
    fn test_get_immed_widths() {
        let mut cg = Codegen::new();
        cg.get_immed(CodeFlags::CHAR, 0x41);
        assert_eq!(cg.lines(), ["lda #$41"]);

        let mut cg = Codegen::new();
        cg.get_immed(CodeFlags::INT, 0x1234);
        assert_eq!(cg.lines(), ["ldx #$12", "lda #$34"]);

        let mut cg = Codegen::new();
        cg.get_immed(CodeFlags::LONG, 0x0102_0304);
        assert_eq!(cg.lines()[0], "lda #$04");
        assert_eq!(cg.lines()[1], "ldx #$03");
    }

    #[test]
    fn test_mul_by_power_of_two_shifts() {
        let mut cg = Codegen::new();
        cg.mul(CodeFlags::INT | CodeFlags::CONST, 4);
        assert_eq!(cg.lines(), ["jsr aslax2"]);
    }

    #[test]
    fn test_scale_by_element_size() {
        let mut cg = Codegen::new();
        cg.scale(CodeFlags::INT, 2);
        assert_eq!(cg.lines(), ["jsr aslax1"]);

        let mut cg = Codegen::new();
        cg.scale(CodeFlags::INT, 1);
        assert!(cg.lines().is_empty());

        let mut cg = Codegen::new();
        cg.scale(CodeFlags::INT, -2);
        assert_eq!(cg.lines(), ["jsr shrax1"]);
    }

    #[test]
    fn test_typeadjust_widens_to_long() {
        let mut cg = Codegen::new();
        cg.push(CodeFlags::INT, 0);
        let flags = cg.typeadjust(CodeFlags::INT, CodeFlags::LONG);
        assert!(flags.contains(CodeFlags::LONG));
        // The stacked int is widened in place.
        assert!(cg.lines().contains(&"jsr toslong".to_string()));
        assert_eq!(cg.stack_ptr, -4);
    }

    #[test]
    fn test_typeadjust_char_char_stays_char() {
        let mut cg = Codegen::new();
        let flags = cg.typeadjust(
            CodeFlags::CHAR | CodeFlags::UNSIGNED,
            CodeFlags::CHAR | CodeFlags::UNSIGNED | CodeFlags::CONST,
        );
        assert!(flags.contains(CodeFlags::CHAR));
        assert!(flags.contains(CodeFlags::UNSIGNED));
        assert!(cg.lines().is_empty());
    }

    #[test]
    fn test_call_credits_arguments() {
        let mut cg = Codegen::new();
        cg.push(CodeFlags::INT | CodeFlags::CONST, 1);
        cg.push(CodeFlags::INT | CodeFlags::CONST, 2);
        assert_eq!(cg.stack_ptr, -4);
        cg.call(CodeFlags::INT, "foo", 4);
        assert_eq!(cg.stack_ptr, 0);
        assert!(cg.lines().contains(&"jsr _foo".to_string()));
    }

    #[test]
    fn test_addeq_static_char_inc_form() {
        let mut cg = Codegen::new();
        cg.addeq_static(
            CodeFlags::CHAR
                | CodeFlags::FORCECHAR
                | CodeFlags::CONST
                | CodeFlags::NOKEEP,
            "_c",
            0,
            1,
        );
        assert_eq!(cg.lines(), ["inc _c"]);
    }
}
