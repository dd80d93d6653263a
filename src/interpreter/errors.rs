//! Runtime error types for the interpreter
//!
//! A thrown JavaScript value travels as [`RuntimeError::Thrown`] so that
//! `?` unwinds exactly like the language's exception propagation;
//! `try`/`catch` handling intercepts only that variant.
//! [`RuntimeError::Terminated`] is the debug listener's abort signal and
//! is never catchable by user code.

use crate::memory::value::Value;
use crate::parser::ast::SourceLocation;

/// Standard error classes the engine can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
}

impl ErrorClass {
    pub fn name(self) -> &'static str {
        match self {
            ErrorClass::Error => "Error",
            ErrorClass::TypeError => "TypeError",
            ErrorClass::RangeError => "RangeError",
            ErrorClass::ReferenceError => "ReferenceError",
        }
    }
}

/// Errors that abort normal evaluation.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A JavaScript value was thrown and not (yet) caught
    #[error("uncaught exception: {}", thrown_message(.value))]
    Thrown { value: Value },

    /// The debug listener requested termination (step budget)
    #[error("execution terminated by debug listener")]
    Terminated,

    /// Interpreter invariant violation; not observable by user code
    #[error("internal interpreter error at line {}, column {}: {message}", .location.line, .location.column)]
    Internal {
        message: String,
        location: SourceLocation,
    },
}

/// Human-readable form of a thrown value, as a host shell would print it.
pub fn thrown_message(value: &Value) -> String {
    match value {
        Value::Str(s) => s.to_string(),
        other => other.to_display_string(),
    }
}
