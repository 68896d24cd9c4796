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

//! The peephole/patch buffer operations on the code buffer.
//!
//! The parser captures positions ("marks") and uses them to undo pushes
//! made redundant by constant folding, to discard code parsed in an
//! unevaluated context, and to move type-conversion code into the correct
//! branch of a ternary. Marks capture the virtual stack pointer as well, so
//! removing a range also rolls back the stack bookkeeping of the removed
//! instructions.

use super::Codegen;

/// An opaque position in the code buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeMark {
    pub(crate) pos: usize,
    pub(crate) sp: i32,
}

impl Codegen {
    /// Capture the current code position.
    pub fn get_code_pos(&self) -> CodeMark {
        CodeMark {
            pos: self.code.len(),
            sp: self.stack_ptr,
        }
    }

    /// Remove all code emitted since the given mark and restore the virtual
    /// stack pointer captured with it.
    pub fn remove_code(&mut self, mark: &CodeMark) {
        debug_assert!(mark.pos <= self.code.len());
        self.code.truncate(mark.pos);
        self.stack_ptr = mark.sp;
    }

    /// Move the closed range `[start, end)` so that it sits at `target`,
    /// which must lie before `start`. Used to re-home type-conversion code.
    pub fn move_code(&mut self, start: &CodeMark, end: &CodeMark, target: &CodeMark) {
        debug_assert!(start.pos <= end.pos);
        debug_assert!(end.pos <= self.code.len());
        debug_assert!(target.pos <= start.pos);
        if start.pos == end.pos || target.pos == start.pos {
            return;
        }
        let seg: Vec<String> = self.code.drain(start.pos..end.pos).collect();
        for (i, line) in seg.into_iter().enumerate() {
            self.code.insert(target.pos + i, line);
        }
    }

    /// Check whether no code was emitted between the two marks.
    pub fn code_range_is_empty(&self, start: &CodeMark, end: &CodeMark) -> bool {
        start.pos == end.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_remove() {
        let mut cg = Codegen::new();
        cg.add_code_line("lda #$01");
        let mark = cg.get_code_pos();
        cg.stack_ptr -= 2;
        cg.add_code_line("jsr pushax");
        cg.add_code_line("lda #$02");

        cg.remove_code(&mark);
        assert_eq!(cg.lines(), ["lda #$01"]);
        assert_eq!(cg.stack_ptr, 0);
    }

    #[test]
    fn test_range_is_empty() {
        let mut cg = Codegen::new();
        let a = cg.get_code_pos();
        let b = cg.get_code_pos();
        assert!(cg.code_range_is_empty(&a, &b));
        cg.add_code_line("nop");
        let c = cg.get_code_pos();
        assert!(!cg.code_range_is_empty(&a, &c));
    }

    #[test]
    fn test_move_code() {
        let mut cg = Codegen::new();
        cg.add_code_line("one");
        let target = cg.get_code_pos();
        cg.add_code_line("two");
        cg.add_code_line("three");
        let start = cg.get_code_pos();
        cg.add_code_line("conv1");
        cg.add_code_line("conv2");
        let end = cg.get_code_pos();

        cg.move_code(&start, &end, &target);
        assert_eq!(cg.lines(), ["one", "conv1", "conv2", "two", "three"]);
    }

    #[test]
    fn test_marks_stay_valid_under_append() {
        let mut cg = Codegen::new();
        let mark = cg.get_code_pos();
        for i in 0..10 {
            cg.add_code_line(format!("line{}", i));
        }
        cg.remove_code(&mark);
        assert_eq!(cg.line_count(), 0);
    }
}
