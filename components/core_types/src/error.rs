//! JavaScript error types.
//!
//! This module provides error values that correspond to JavaScript's built-in
//! error types. Errors are ordinary values: they are thrown and used as
//! rejection reasons by wrapping them in [`Value::Error`].

use crate::Value;
use std::fmt;

/// The kind of JavaScript error.
///
/// These correspond to JavaScript's built-in error constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Type error (e.g., calling a non-function, iterating a number)
    TypeError,
    /// Invalid reference, including a promise chaining cycle
    ReferenceError,
    /// Several errors wrapped in one, as produced by `Promise.any`
    AggregateError,
}

impl ErrorKind {
    /// Returns the constructor name used for this kind of error.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::AggregateError => "AggregateError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A JavaScript error with a kind and a message.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, JsError};
///
/// let error = JsError::new(ErrorKind::TypeError, "undefined is not a function");
///
/// assert_eq!(error.message, "undefined is not a function");
/// assert_eq!(error.to_string(), "TypeError: undefined is not a function");
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct JsError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Errors wrapped by an aggregate error, in input order.
    /// Empty for every other kind.
    pub errors: Vec<Value>,
}

impl JsError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Creates a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Creates a `ReferenceError`.
    pub fn reference_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReferenceError, message)
    }

    /// Creates an `AggregateError` carrying the given errors.
    pub fn aggregate(message: impl Into<String>, errors: Vec<Value>) -> Self {
        Self {
            kind: ErrorKind::AggregateError,
            message: message.into(),
            errors,
        }
    }

    /// Returns true if this is an aggregate error.
    pub fn is_aggregate(&self) -> bool {
        self.kind == ErrorKind::AggregateError
    }
}
