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

//! Compilation switches for the expression core.

/// The language standard selected for the translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Standard {
    /// ISO C89/C90.
    C89,
    /// ISO C99.
    C99,
    /// C99 plus the compiler's own extensions (computed goto, register
    /// pseudo-variables in expressions).
    Extended,
}

/// Compilation options consulted by the expression parser and emitter.
#[derive(Debug, Clone)]
pub struct Config {
    /// Selected language standard.
    pub standard: Standard,
    /// When true, functions default to the cdecl calling convention and need
    /// an explicit fastcall qualifier; when false it is the other way round.
    pub auto_cdecl: bool,
    /// Trade-off between code size and speed in percent. Values of 200 and
    /// above allow emitting larger but faster code, e.g. pre-allocated
    /// argument frames for function calls.
    pub code_size_factor: i32,
    /// Warn when the result of a comparison is always constant.
    pub warn_const_comparison: bool,
    /// Warn when an expression statement computes an unused value.
    pub warn_no_effect: bool,
    /// True while evaluating `#if` expressions for the preprocessor. In this
    /// mode everything folds symbolically and no code is emitted.
    pub preprocessing: bool,
    /// Debug mode: consistency failures are reported as plain errors instead
    /// of aborting, so the compiler can be inspected post mortem.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            standard: Standard::Extended,
            auto_cdecl: false,
            code_size_factor: 100,
            warn_const_comparison: true,
            warn_no_effect: true,
            preprocessing: false,
            debug: false,
        }
    }
}
