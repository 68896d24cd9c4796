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

//! Error types for the Adder64 compiler core.
//!
//! This module defines the error types used by the expression parser and
//! code emitter, plus the diagnostics sink that collects them. User errors
//! never abort parsing; the parser reports them here and continues with a
//! synthesised replacement value.

use std::ops::Range;
use thiserror::Error;

/// A source span representing a range in the source code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Get the length of this span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Merge two spans into one that covers both.
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Error codes for the expression core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Syntax errors (E100-E139)
    ExpressionExpected,
    PreprocessorExpressionExpected,
    ExpectedIdentifier,
    ExpectedCloseParen,
    ExpectedCloseBracket,
    ExpectedColon,
    ArgumentExpectedAfterComma,
    UnexpectedToken,

    // Semantic errors (E200-E259)
    UndefinedSymbol,
    VariableIdentifierExpected,
    UndeclaredFunction,
    IllegalFunctionCall,
    TooManyArguments,
    TooFewArguments,
    InvalidLValue,
    AssignmentToConst,
    IncrementOfReadOnly,
    DecrementOfReadOnly,
    IntegerExpressionExpected,
    ScalarExpressionExpected,
    InvalidOperands,
    IllegalIndirection,
    IllegalAddress,
    AddressOfBitField,
    SizeofBitField,
    SizeofIncompleteType,
    CannotSubscript,
    SubscriptNotAnInteger,
    SubscriptNotAPointer,
    StructExpected,
    StructPointerExpected,
    NoSuchField,
    IncompatibleTypes,
    IncompatiblePointerTypes,
    ComparingFunctionPointers,
    ConstantExpressionExpected,
    ConstantIntegerExpressionExpected,
    ComputedGotoNotEnabled,
    NonScalarAssignment,

    // Constant evaluation errors (E260-E269)
    DivisionByZero,
    ModuloByZero,

    // Consistency failures surfaced as errors in debug mode (E270)
    CodeGenerationInconsistency,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            // Syntax errors
            ErrorCode::ExpressionExpected => "E100",
            ErrorCode::PreprocessorExpressionExpected => "E101",
            ErrorCode::ExpectedIdentifier => "E102",
            ErrorCode::ExpectedCloseParen => "E103",
            ErrorCode::ExpectedCloseBracket => "E104",
            ErrorCode::ExpectedColon => "E105",
            ErrorCode::ArgumentExpectedAfterComma => "E106",
            ErrorCode::UnexpectedToken => "E107",

            // Semantic errors
            ErrorCode::UndefinedSymbol => "E200",
            ErrorCode::VariableIdentifierExpected => "E201",
            ErrorCode::UndeclaredFunction => "E202",
            ErrorCode::IllegalFunctionCall => "E203",
            ErrorCode::TooManyArguments => "E204",
            ErrorCode::TooFewArguments => "E205",
            ErrorCode::InvalidLValue => "E210",
            ErrorCode::AssignmentToConst => "E211",
            ErrorCode::IncrementOfReadOnly => "E212",
            ErrorCode::DecrementOfReadOnly => "E213",
            ErrorCode::IntegerExpressionExpected => "E220",
            ErrorCode::ScalarExpressionExpected => "E221",
            ErrorCode::InvalidOperands => "E222",
            ErrorCode::IllegalIndirection => "E223",
            ErrorCode::IllegalAddress => "E224",
            ErrorCode::AddressOfBitField => "E225",
            ErrorCode::SizeofBitField => "E226",
            ErrorCode::SizeofIncompleteType => "E227",
            ErrorCode::CannotSubscript => "E230",
            ErrorCode::SubscriptNotAnInteger => "E231",
            ErrorCode::SubscriptNotAPointer => "E232",
            ErrorCode::StructExpected => "E233",
            ErrorCode::StructPointerExpected => "E234",
            ErrorCode::NoSuchField => "E235",
            ErrorCode::IncompatibleTypes => "E240",
            ErrorCode::IncompatiblePointerTypes => "E241",
            ErrorCode::ComparingFunctionPointers => "E242",
            ErrorCode::ConstantExpressionExpected => "E250",
            ErrorCode::ConstantIntegerExpressionExpected => "E251",
            ErrorCode::ComputedGotoNotEnabled => "E252",
            ErrorCode::NonScalarAssignment => "E253",

            // Constant evaluation errors
            ErrorCode::DivisionByZero => "E260",
            ErrorCode::ModuloByZero => "E261",

            // Consistency failures
            ErrorCode::CodeGenerationInconsistency => "E270",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A compiler error with source location.
#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct CompileError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// The source span where the error occurred.
    pub span: Span,
}

impl CompileError {
    /// Create a new compile error.
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
        }
    }

    /// Get the error code string.
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }
}

/// The diagnostics sink.
///
/// Collects user errors and warnings while parsing continues. Internal
/// inconsistencies do not go through this sink; they abort via panic since
/// they indicate compiler bugs, not problems with the input.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<CompileError>,
    warnings: Vec<String>,
}

impl Diagnostics {
    /// Create a new empty diagnostics sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error.
    pub fn error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        self.errors.push(CompileError::new(code, message, span));
    }

    /// Record a warning.
    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Check if any errors were recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Get the number of errors recorded so far.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Get the number of warnings recorded so far.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Get an iterator over the errors.
    pub fn errors(&self) -> impl Iterator<Item = &CompileError> {
        self.errors.iter()
    }

    /// Get an iterator over the warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.warnings.iter().map(String::as_str)
    }

    /// Convert into the collected errors.
    pub fn into_errors(self) -> Vec<CompileError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_creation() {
        let span = Span::new(10, 20);
        assert_eq!(span.start, 10);
        assert_eq!(span.end, 20);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
    }

    #[test]
    fn test_span_merge() {
        let span1 = Span::new(5, 10);
        let span2 = Span::new(15, 20);
        let merged = span1.merge(&span2);
        assert_eq!(merged.start, 5);
        assert_eq!(merged.end, 20);
    }

    #[test]
    fn test_error_code() {
        assert_eq!(ErrorCode::ExpressionExpected.code(), "E100");
        assert_eq!(ErrorCode::UndefinedSymbol.code(), "E200");
        assert_eq!(ErrorCode::DivisionByZero.code(), "E260");
    }

    #[test]
    fn test_diagnostics_collects_and_continues() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_errors());

        diags.error(
            ErrorCode::UndefinedSymbol,
            "Undefined symbol: 'foo'",
            Span::new(0, 3),
        );
        diags.warning("Expression result unused");

        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(diags.errors().next().unwrap().code_str(), "E200");
    }
}
