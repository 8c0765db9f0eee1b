//! Core value and error types shared by the promise engine.
//!
//! This crate provides the foundational types that promises settle with:
//! a tagged value representation, callable functions, host objects with
//! fallible property reads, and JavaScript-style error values.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of JavaScript values
//! - [`Function`] - A shared, callable function value
//! - [`JsObject`] - Trait for host objects with named properties
//! - [`PlainObject`] - Ordinary property bag, with optional getters
//! - [`JsError`] - JavaScript error values
//! - [`ErrorKind`] - Types of JavaScript errors
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, JsError, Value};
//!
//! // Create JavaScript values
//! let num = Value::Smi(42);
//! assert!(num.is_primitive());
//! assert_eq!(num.type_of(), "number");
//!
//! // Create an error and throw it as a value
//! let error = JsError::type_error("undefined is not a function");
//! assert_eq!(error.kind, ErrorKind::TypeError);
//! let thrown: Value = error.into();
//! assert_eq!(thrown.type_of(), "object");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod object;
mod value;

pub use error::{ErrorKind, JsError};
pub use object::{Function, JsObject, PlainObject, Property};
pub use value::Value;

/// Result of an operation that may throw.
///
/// Anything can be thrown, so the error side is a full [`Value`] rather
/// than a [`JsError`].
pub type JsResult<T> = Result<T, Value>;
