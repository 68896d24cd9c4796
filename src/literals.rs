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

//! The literal pool.
//!
//! String literals are stored here once and referenced by a numbered data
//! label. The pool keeps the bytes including the terminating NUL; the data
//! writer emits them after the code segment.

/// Handle to a pooled literal.
pub type LitHandle = usize;

#[derive(Debug)]
struct Literal {
    bytes: Vec<u8>,
    label: u32,
}

/// The pool of string literals for the translation unit.
#[derive(Debug, Default)]
pub struct LiteralPool {
    lits: Vec<Literal>,
}

impl LiteralPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a literal. The terminating NUL is appended here; `label` must
    /// come from the label allocator.
    pub fn use_literal(&mut self, text: &[u8], label: u32) -> LitHandle {
        let mut bytes = text.to_vec();
        bytes.push(0);
        self.lits.push(Literal { bytes, label });
        self.lits.len() - 1
    }

    /// Size of a pooled literal in bytes, including the terminating NUL.
    pub fn literal_size(&self, handle: LitHandle) -> u32 {
        self.lits[handle].bytes.len() as u32
    }

    /// Data label of a pooled literal.
    pub fn literal_label(&self, handle: LitHandle) -> u32 {
        self.lits[handle].label
    }

    /// The bytes of a pooled literal.
    pub fn literal_bytes(&self, handle: LitHandle) -> &[u8] {
        &self.lits[handle].bytes
    }

    /// Size of the literal with the given data label, if any.
    pub fn size_of_label(&self, label: u32) -> Option<u32> {
        self.lits
            .iter()
            .find(|l| l.label == label)
            .map(|l| l.bytes.len() as u32)
    }

    /// Number of pooled literals.
    pub fn len(&self) -> usize {
        self.lits.len()
    }

    /// Check whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pool() {
        let mut pool = LiteralPool::new();
        let h = pool.use_literal(b"hello", 12);
        assert_eq!(pool.literal_size(h), 6);
        assert_eq!(pool.literal_label(h), 12);
        assert_eq!(pool.literal_bytes(h), b"hello\0");
        assert_eq!(pool.len(), 1);
    }
}
