//! JavaScript value representation.
//!
//! This module provides the core `Value` enum that represents everything a
//! promise can be fulfilled or rejected with.

use crate::{Function, JsError, JsObject, JsResult};
use num_bigint::BigInt;
use std::fmt;
use std::rc::Rc;

/// Represents any JavaScript value.
///
/// Primitive values are stored inline. Arrays, errors and objects are shared
/// behind reference counts, so cloning a `Value` never deep-copies.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let undefined = Value::Undefined;
/// let number = Value::Smi(42);
/// let float = Value::Double(3.14);
///
/// assert_eq!(undefined.type_of(), "undefined");
/// assert!(number.is_primitive());
/// assert_eq!(float.type_of(), "number");
/// ```
#[derive(Clone)]
pub enum Value {
    /// JavaScript undefined value
    Undefined,
    /// JavaScript null value
    Null,
    /// JavaScript boolean (true or false)
    Boolean(bool),
    /// Small integer (fits in 32 bits)
    Smi(i32),
    /// IEEE 754 double-precision floating point
    Double(f64),
    /// JavaScript string value
    String(std::string::String),
    /// JavaScript BigInt (arbitrary precision integer)
    BigInt(BigInt),
    /// Immutable array of values
    Array(Rc<Vec<Value>>),
    /// Callable function
    Function(Function),
    /// Error object
    Error(Rc<JsError>),
    /// Host object, compared by identity
    Object(Rc<dyn JsObject>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Smi(n) => f.debug_tuple("Smi").field(n).finish(),
            Value::Double(n) => f.debug_tuple("Double").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::BigInt(n) => f.debug_tuple("BigInt").field(n).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Function(func) => f.debug_tuple("Function").field(&func.name()).finish(),
            Value::Error(e) => f.debug_tuple("Error").field(e).finish(),
            Value::Object(obj) => write!(f, "Object([object {}])", obj.class_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Smi(a), Value::Smi(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Object(_), Value::Object(_)) => self.same_object(other),
            _ => false,
        }
    }
}

impl Value {
    /// Builds an array value.
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(items))
    }

    /// Returns the JavaScript typeof result for this value.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert_eq!(Value::Undefined.type_of(), "undefined");
    /// assert_eq!(Value::Null.type_of(), "object");
    /// assert_eq!(Value::Boolean(true).type_of(), "boolean");
    /// assert_eq!(Value::Smi(42).type_of(), "number");
    /// ```
    pub fn type_of(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "object".to_string(), // JavaScript quirk
            Value::Boolean(_) => "boolean".to_string(),
            Value::Smi(_) | Value::Double(_) => "number".to_string(),
            Value::String(_) => "string".to_string(),
            Value::BigInt(_) => "bigint".to_string(),
            Value::Function(_) => "function".to_string(),
            Value::Array(_) | Value::Error(_) | Value::Object(_) => "object".to_string(),
        }
    }

    /// Returns true for primitives (everything that cannot carry properties).
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Undefined
                | Value::Null
                | Value::Boolean(_)
                | Value::Smi(_)
                | Value::Double(_)
                | Value::String(_)
                | Value::BigInt(_)
        )
    }

    /// Returns the function if this value is callable.
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Returns true if this value is callable.
    pub fn is_callable(&self) -> bool {
        self.as_function().is_some()
    }

    /// Returns the host object behind this value, if any.
    pub fn as_object(&self) -> Option<&Rc<dyn JsObject>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Returns the error behind this value, if any.
    pub fn as_error(&self) -> Option<&JsError> {
        match self {
            Value::Error(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    /// Returns the elements if this value is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Returns true if both values are the very same host object.
    pub fn same_object(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }

    /// Reads a property. Primitives and property-less values read as
    /// `undefined`; host objects may throw.
    pub fn get(&self, key: &str) -> JsResult<Value> {
        match self {
            Value::Object(obj) => obj.get(key),
            Value::Array(items) if key == "length" => Ok(Value::Smi(items.len() as i32)),
            Value::Error(e) => Ok(match key {
                "name" => Value::from(e.kind.name()),
                "message" => Value::from(e.message.as_str()),
                "errors" if e.is_aggregate() => Value::array(e.errors.clone()),
                _ => Value::Undefined,
            }),
            _ => Ok(Value::Undefined),
        }
    }

    /// Collects the items produced by iterating this value.
    ///
    /// Arrays yield their elements and strings yield one string per
    /// character. Objects are iterable only if they say so; everything else
    /// throws a `TypeError`.
    pub fn iterate(&self) -> JsResult<Vec<Value>> {
        match self {
            Value::Array(items) => Ok(items.as_ref().clone()),
            Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
            Value::Object(obj) => obj.iterate().unwrap_or_else(|| Err(not_iterable(self))),
            _ => Err(not_iterable(self)),
        }
    }
}

fn not_iterable(value: &Value) -> Value {
    JsError::type_error(format!("{} is not iterable", value.type_of())).into()
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Smi(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<std::string::String> for Value {
    fn from(s: std::string::String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<JsError> for Value {
    fn from(e: JsError) -> Self {
        Value::Error(Rc::new(e))
    }
}

/// Implementation of Display trait for JavaScript string conversion.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// assert_eq!(Value::Undefined.to_string(), "undefined");
/// assert_eq!(Value::Null.to_string(), "null");
/// assert_eq!(Value::Boolean(true).to_string(), "true");
/// assert_eq!(Value::Smi(42).to_string(), "42");
/// assert_eq!(Value::array(vec![Value::Smi(1), Value::Smi(2)]).to_string(), "1,2");
/// ```
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Smi(n) => write!(f, "{}", n),
            Value::Double(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    if n.is_sign_positive() {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else if n.fract() == 0.0 && n.abs() < 1e15 {
                    // Integer-valued doubles display without decimal point
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::BigInt(n) => write!(f, "{}n", n),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    if !matches!(item, Value::Undefined | Value::Null) {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            }
            Value::Function(func) => write!(f, "function {}() {{ [native code] }}", func.name()),
            Value::Error(e) => write!(f, "{}", e),
            Value::Object(obj) => write!(f, "[object {}]", obj.class_name()),
        }
    }
}
