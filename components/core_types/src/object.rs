//! Callable functions and host objects.
//!
//! Objects are reached through the [`JsObject`] trait so that the engine can
//! read properties without knowing the concrete type behind them. Property
//! reads are fallible: a getter may throw, and the thrown value comes back
//! as the `Err` side of a [`JsResult`].

use crate::{JsResult, Value};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A function that can be called with arguments and returns a result.
///
/// Cloning a `Function` is cheap and yields the same function: two clones
/// compare equal, two separately created functions never do.
///
/// # Examples
///
/// ```
/// use core_types::{Function, Value};
///
/// let double = Function::unary(|v| match v {
///     Value::Smi(n) => Ok(Value::Smi(n * 2)),
///     other => Err(other),
/// });
/// assert_eq!(double.call(&[Value::Smi(21)]), Ok(Value::Smi(42)));
/// ```
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    callback: Rc<dyn Fn(&[Value]) -> JsResult<Value>>,
}

impl Function {
    /// Creates a new anonymous Function from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> JsResult<Value> + 'static,
    {
        Self::named("", f)
    }

    /// Creates a new Function with a name, used only for display.
    pub fn named<F>(name: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> JsResult<Value> + 'static,
    {
        Self {
            name: Rc::from(name),
            callback: Rc::new(f),
        }
    }

    /// Creates a Function that only looks at its first argument.
    ///
    /// A missing argument is passed as `undefined`.
    pub fn unary<F>(f: F) -> Self
    where
        F: Fn(Value) -> JsResult<Value> + 'static,
    {
        Self::new(move |args| f(args.first().cloned().unwrap_or(Value::Undefined)))
    }

    /// Calls the function with the given arguments.
    pub fn call(&self, args: &[Value]) -> JsResult<Value> {
        (self.callback)(args)
    }

    /// Returns the function's name; empty for anonymous functions.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if both handles refer to the same function.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function {{ name: {:?} }}", self.name)
    }
}

/// A host object with named properties.
///
/// Implementors decide how properties are stored. Reading a property may
/// throw, which is how a poisoned getter is modelled.
pub trait JsObject: Any {
    /// Reads a property. Missing properties read as `undefined`.
    fn get(&self, key: &str) -> JsResult<Value>;

    /// The value reported by `Object.prototype.toString`, e.g. `"Object"`.
    fn class_name(&self) -> &str {
        "Object"
    }

    /// Produces the items of this object when it is iterated.
    ///
    /// `None` means the object is not iterable at all; `Some(Err(_))` means
    /// iteration started and threw.
    fn iterate(&self) -> Option<JsResult<Vec<Value>>> {
        None
    }

    /// Converts the shared handle for downcasting to the concrete type.
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

/// A stored property of a [`PlainObject`].
#[derive(Debug, Clone)]
pub enum Property {
    /// A plain data property.
    Data(Value),
    /// An accessor property whose getter is called on every read.
    Accessor(Function),
}

/// An ordinary object: an ordered bag of properties.
///
/// # Examples
///
/// ```
/// use core_types::{JsObject, PlainObject, Value};
///
/// let record = PlainObject::new()
///     .with("status", "fulfilled")
///     .with("value", 1);
/// assert_eq!(record.get("status"), Ok(Value::from("fulfilled")));
/// assert_eq!(record.get("missing"), Ok(Value::Undefined));
/// ```
#[derive(Debug, Default)]
pub struct PlainObject {
    properties: RefCell<Vec<(String, Property)>>,
}

impl PlainObject {
    /// Creates an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`PlainObject::set`].
    pub fn with(self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a data property, replacing any existing property with that key.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.define(key, Property::Data(value.into()));
    }

    /// Defines a getter for `key`, replacing any existing property.
    pub fn define_getter(&self, key: &str, getter: Function) {
        self.define(key, Property::Accessor(getter));
    }

    /// Returns the property keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.properties
            .borrow()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Wraps this object in a [`Value`].
    pub fn into_value(self) -> Value {
        Value::Object(Rc::new(self))
    }

    fn define(&self, key: &str, property: Property) {
        let mut properties = self.properties.borrow_mut();
        match properties.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = property,
            None => properties.push((key.to_string(), property)),
        }
    }
}

impl JsObject for PlainObject {
    fn get(&self, key: &str) -> JsResult<Value> {
        // The getter may touch this object again, so release the borrow first.
        let property = self
            .properties
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, p)| p.clone());
        match property {
            Some(Property::Data(value)) => Ok(value),
            Some(Property::Accessor(getter)) => getter.call(&[]),
            None => Ok(Value::Undefined),
        }
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
