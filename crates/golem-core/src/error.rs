// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for every stage of the Golem pipeline.
//!
//! Each stage has its own error family:
//!
//! | Stage | Type | Policy |
//! |-------|------|--------|
//! | Scanner/parser | [`SyntaxError`] | parsing stops at the first error |
//! | Scope analysis | [`AnalysisErrors`] | all errors in a module are collected |
//! | Code generation | [`CompileError`] | limits of the bytecode format |
//! | Execution | [`RuntimeError`] | an [`ErrorKind`] plus a stack trace |
//!
//! [`Error`] unifies them for the top-level [`Engine`](crate::Engine) API.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::lexer::Pos;
use crate::runtime::Value;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Any error the engine can report to its host.
#[derive(Debug, Error)]
pub enum Error {
    /// Source text could not be parsed
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// Scope analysis rejected the module
    #[error(transparent)]
    Analysis(#[from] AnalysisErrors),

    /// Bytecode could not be emitted
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// An error escaped every handler during evaluation
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Reading a source file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A background evaluation task failed to complete
    #[error("task failed: {0}")]
    Task(String),
}

impl Error {
    /// Returns the runtime error, if this is one.
    pub fn as_runtime(&self) -> Option<&RuntimeError> {
        match self {
            Error::Runtime(err) => Some(err),
            _ => None,
        }
    }
}

// ============================================================================
// Syntax errors
// ============================================================================

/// A syntax error, reported at the first offending token.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{pos}: {kind}")]
pub struct SyntaxError {
    /// What went wrong
    pub kind: SyntaxErrorKind,
    /// Where the offending token starts
    pub pos: Pos,
    /// The literal text of the offending token
    pub token: String,
}

impl SyntaxError {
    /// Creates a new syntax error.
    pub fn new(kind: SyntaxErrorKind, pos: Pos, token: impl Into<String>) -> Self {
        Self {
            kind,
            pos,
            token: token.into(),
        }
    }
}

/// The kinds of syntax error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    /// A character that cannot start a token
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    /// A token that does not fit the grammar
    #[error("unexpected token '{found}', expected {expected}")]
    UnexpectedToken {
        /// The token that was found
        found: String,
        /// A description of what was expected
        expected: String,
    },

    /// The input ended in the middle of a construct
    #[error("unexpected end of file")]
    UnexpectedEof,

    /// A reserved word where an identifier was required
    #[error("unexpected reserved word '{0}'")]
    UnexpectedReservedWord(String),

    /// A string literal with no closing quote
    #[error("unterminated string literal")]
    UnterminatedString,

    /// A numeric literal that cannot be represented
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    /// An unknown backslash escape inside a string literal
    #[error("invalid escape sequence '{0}'")]
    InvalidEscape(String),

    /// `++`/`--` applied to something that is not assignable
    #[error("invalid postfix expression")]
    InvalidPostfix,

    /// A malformed `for` header
    #[error("invalid for statement")]
    InvalidFor,

    /// A malformed `switch` statement
    #[error("invalid switch statement: {0}")]
    InvalidSwitch(&'static str),

    /// A `try` with neither `catch` nor `finally`
    #[error("invalid try statement: expected 'catch' or 'finally'")]
    InvalidTry,

    /// `go` followed by something other than a call
    #[error("invalid go statement: expected a function call")]
    InvalidGo,

    /// A struct literal that names the same field twice
    #[error("duplicate struct key '{0}'")]
    DuplicateKey(String),

    /// An `import` after the first non-import statement
    #[error("import statements must appear at the top of a module")]
    MisplacedImport,

    /// A parameter default value that is not a literal
    #[error("default value of parameter '{0}' must be a literal")]
    InvalidDefault(String),

    /// A required parameter after an optional one
    #[error("required parameter '{0}' cannot follow an optional parameter")]
    RequiredAfterOptional(String),

    /// A variadic parameter after an optional one
    #[error("variadic parameter '{0}' cannot follow an optional parameter")]
    VariadicAfterOptional(String),
}

// ============================================================================
// Analysis errors
// ============================================================================

/// A semantic error found during scope analysis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{pos}: {kind}")]
pub struct AnalysisError {
    /// What went wrong
    pub kind: AnalysisErrorKind,
    /// Where the offending construct starts
    pub pos: Pos,
}

/// The kinds of analysis error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisErrorKind {
    /// A name declared twice in the same block
    #[error("symbol '{0}' is already defined")]
    DuplicateDeclaration(String),

    /// A name that resolves to nothing
    #[error("symbol '{0}' is not defined")]
    UndefinedSymbol(String),

    /// Assignment to a constant, builtin, or non-assignable expression
    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),

    /// `break` outside of a loop
    #[error("'break' outside of loop")]
    InvalidBreak,

    /// `continue` outside of a loop
    #[error("'continue' outside of loop")]
    InvalidContinue,

    /// `this` outside of a struct literal
    #[error("'this' outside of struct")]
    ThisOutsideStruct,
}

/// Every analysis error found in one module, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisErrors(pub Vec<AnalysisError>);

impl AnalysisErrors {
    /// Returns the collected errors.
    pub fn errors(&self) -> &[AnalysisError] {
        &self.0
    }
}

impl fmt::Display for AnalysisErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AnalysisErrors {}

// ============================================================================
// Compile errors
// ============================================================================

/// Limits of the bytecode format that a module exceeded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A function body does not fit 16-bit jump offsets
    #[error("function '{name}' is too large: {size} bytes of bytecode")]
    FunctionTooLarge {
        /// Function name, or `<anonymous>`
        name: String,
        /// Size reached when the limit was hit
        size: usize,
    },

    /// The constant pool outgrew 16-bit indices
    #[error("too many constants in module")]
    TooManyConstants,

    /// The template pool outgrew 16-bit indices
    #[error("too many functions in module")]
    TooManyTemplates,

    /// A function declares more locals than 16-bit slots allow
    #[error("too many local variables in function")]
    TooManyLocals,

    /// A literal or call has more elements than 16-bit counts allow
    #[error("too many elements in literal or argument list")]
    TooManyElements,
}

// ============================================================================
// Runtime errors
// ============================================================================

/// The runtime error taxonomy.
///
/// These are raised by instructions and native functions. They become
/// [`RuntimeError`]s, with a stack trace, at the point they are thrown.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    /// An operand had the wrong type
    #[error("TypeMismatch: expected {0}")]
    TypeMismatch(String),

    /// A function was invoked with the wrong number of arguments
    #[error("ArityMismatch: expected {expected} argument(s), got {actual}")]
    ArityMismatch {
        /// The accepted argument counts, e.g. `1`, `at least 2`, `1 to 3`
        expected: String,
        /// The number of arguments supplied
        actual: usize,
    },

    /// Integer division or remainder by zero
    #[error("DivideByZero")]
    DivideByZero,

    /// An index outside `0..len`
    #[error("IndexOutOfBounds: index {index}, length {len}")]
    IndexOutOfBounds {
        /// The requested index
        index: i64,
        /// The length of the indexed value
        len: usize,
    },

    /// A field that does not exist on the value
    #[error("NoSuchField: field '{0}' not found")]
    NoSuchField(String),

    /// An assignment to a readonly field
    #[error("ReadonlyField: field '{0}' is readonly")]
    ReadonlyField(String),

    /// An operation that does not accept `null`
    #[error("NullValue: null value")]
    NullValue,

    /// An import that matched no registered module or file
    #[error("UndefinedModule: module '{0}' is not defined")]
    UndefinedModule(String),

    /// An import that failed to compile
    #[error("InvalidModule: module '{name}' failed to load: {reason}")]
    InvalidModule {
        /// The module name
        name: String,
        /// The compile error, rendered
        reason: String,
    },

    /// A module that imports itself, directly or indirectly
    #[error("CircularImport: module '{0}' is already being initialized")]
    CircularImport(String),

    /// An argument with an acceptable type but an unacceptable value
    #[error("InvalidArgument: {0}")]
    InvalidArgument(String),

    /// `assert` was called with `false`
    #[error("AssertionFailed")]
    AssertionFailed,

    /// The call stack exceeded its configured depth
    #[error("StackOverflow: maximum call depth of {0} exceeded")]
    StackOverflow(usize),

    /// A value raised by a `throw` statement
    #[error("{0}")]
    Thrown(Value),
}

impl ErrorKind {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>) -> Self {
        Self::TypeMismatch(expected.into())
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Returns the name of this kind, as seen by the `kind` field of
    /// an `Error` value.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch(_) => "TypeMismatch",
            ErrorKind::ArityMismatch { .. } => "ArityMismatch",
            ErrorKind::DivideByZero => "DivideByZero",
            ErrorKind::IndexOutOfBounds { .. } => "IndexOutOfBounds",
            ErrorKind::NoSuchField(_) => "NoSuchField",
            ErrorKind::ReadonlyField(_) => "ReadonlyField",
            ErrorKind::NullValue => "NullValue",
            ErrorKind::UndefinedModule(_) => "UndefinedModule",
            ErrorKind::InvalidModule { .. } => "InvalidModule",
            ErrorKind::CircularImport(_) => "CircularImport",
            ErrorKind::InvalidArgument(_) => "InvalidArgument",
            ErrorKind::AssertionFailed => "AssertionFailed",
            ErrorKind::StackOverflow(_) => "StackOverflow",
            ErrorKind::Thrown(_) => "Thrown",
        }
    }
}

/// One line of a stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// Path of the module the frame was executing
    pub module: Arc<str>,
    /// Source line of the instruction being executed
    pub line: u32,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "    at {}:{}", self.module, self.line)
    }
}

/// An error raised during evaluation, with the stack trace captured where
/// it was first thrown. The trace is innermost first.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    /// What went wrong
    pub kind: ErrorKind,
    /// The frames active at the throw site
    pub stack_trace: Arc<[TraceEntry]>,
}

impl RuntimeError {
    /// Creates a runtime error with the given trace.
    pub fn new(kind: ErrorKind, stack_trace: Vec<TraceEntry>) -> Self {
        Self {
            kind,
            stack_trace: stack_trace.into(),
        }
    }

    /// Returns the error message without the trace.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// Converts this error into the value a `catch` clause binds.
    ///
    /// A thrown value is caught as itself. Every other error is caught as
    /// an `Error` value carrying this error and its trace.
    pub fn into_value(self) -> Value {
        match self.kind {
            ErrorKind::Thrown(value) => value,
            _ => Value::Error(Arc::new(self)),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for entry in self.stack_trace.iter() {
            write!(f, "\n{entry}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Why an instruction or native function failed.
///
/// A fresh [`ErrorKind`] gets its stack trace when the interpreter raises
/// it. A [`RuntimeError`] that is already structured, such as one escaping
/// a nested call or rethrown from a `catch` clause, keeps the trace it has.
#[derive(Debug, Clone)]
pub enum Fault {
    /// A new error, raised at the current instruction
    Kind(ErrorKind),
    /// An error propagating with its original trace
    Error(RuntimeError),
}

impl From<ErrorKind> for Fault {
    fn from(kind: ErrorKind) -> Self {
        Fault::Kind(kind)
    }
}

impl From<RuntimeError> for Fault {
    fn from(err: RuntimeError) -> Self {
        Fault::Error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_message_names_both_counts() {
        let kind = ErrorKind::ArityMismatch {
            expected: "1".into(),
            actual: 0,
        };
        assert_eq!(kind.to_string(), "ArityMismatch: expected 1 argument(s), got 0");
    }

    #[test]
    fn test_runtime_error_display_includes_trace() {
        let err = RuntimeError::new(
            ErrorKind::DivideByZero,
            vec![
                TraceEntry { module: "b.glm".into(), line: 4 },
                TraceEntry { module: "a.glm".into(), line: 10 },
            ],
        );
        assert_eq!(err.to_string(), "DivideByZero\n    at b.glm:4\n    at a.glm:10");
    }

    #[test]
    fn test_analysis_errors_display_one_per_line() {
        let errs = AnalysisErrors(vec![
            AnalysisError {
                kind: AnalysisErrorKind::UndefinedSymbol("a".into()),
                pos: Pos::new(1, 1),
            },
            AnalysisError {
                kind: AnalysisErrorKind::InvalidBreak,
                pos: Pos::new(2, 3),
            },
        ]);
        assert_eq!(
            errs.to_string(),
            "1:1: symbol 'a' is not defined\n2:3: 'break' outside of loop"
        );
    }

    #[test]
    fn test_thrown_value_is_caught_as_itself() {
        let err = RuntimeError::new(ErrorKind::Thrown(Value::Int(7)), Vec::new());
        assert_eq!(err.into_value(), Value::Int(7));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::NullValue.name(), "NullValue");
        assert_eq!(ErrorKind::StackOverflow(3).name(), "StackOverflow");
    }
}
