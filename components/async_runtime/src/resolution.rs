//! The promise resolution procedure.
//!
//! Decides whether a settlement value is an immediate value or a thenable to
//! unwrap, following nested thenables until a non-thenable value or the first
//! rejection is reached.

use crate::promise::Promise;
use core_types::{Function, JsError, Value};
use std::rc::Rc;
use tracing::{debug, trace};

/// Message of the error used to reject a promise that would adopt itself.
pub const CHAINING_CYCLE_MESSAGE: &str = "Chaining cycle detected for promise";

/// One outcome of the resolution procedure.
pub type Settle = Rc<dyn Fn(Value)>;

/// Resolves `candidate` on behalf of `anchor`.
///
/// * `candidate` is `anchor` itself: `on_error` with a `ReferenceError`.
/// * `candidate` has a callable `then`: it is called with a success callback
///   that re-enters this procedure and a failure callback that is `on_error`.
///   Reading `then` or calling it may throw; the thrown value goes to
///   `on_error`.
/// * Otherwise `candidate` is passed to `on_immediate`.
///
/// Promises from this crate defer their callbacks, so each nesting level
/// unwinds on its own job and the stack does not grow with nesting depth.
/// Foreign thenables that call back synchronously recurse instead, so their
/// nesting depth is bounded by the native stack.
pub fn resolve_value(candidate: Value, anchor: &Promise, on_immediate: Settle, on_error: Settle) {
    if anchor.is_same_object(&candidate) {
        debug!(promise = anchor.id(), "chaining cycle detected");
        on_error(JsError::reference_error(CHAINING_CYCLE_MESSAGE).into());
        return;
    }
    if candidate.is_primitive() {
        on_immediate(candidate);
        return;
    }

    let then = match candidate.get("then") {
        Ok(then) => then,
        Err(thrown) => {
            trace!(promise = anchor.id(), "reading then threw");
            on_error(thrown);
            return;
        }
    };
    let Some(then) = then.as_function().cloned() else {
        on_immediate(candidate);
        return;
    };

    trace!(promise = anchor.id(), "adopting thenable");
    let resolve_promise = {
        let anchor = anchor.clone();
        let on_immediate = on_immediate.clone();
        let on_error = on_error.clone();
        Function::named("resolvePromise", move |args| {
            let value = args.first().cloned().unwrap_or(Value::Undefined);
            resolve_value(value, &anchor, on_immediate.clone(), on_error.clone());
            Ok(Value::Undefined)
        })
    };
    let reject_promise = {
        let on_error = on_error.clone();
        Function::named("rejectPromise", move |args| {
            on_error(args.first().cloned().unwrap_or(Value::Undefined));
            Ok(Value::Undefined)
        })
    };

    if let Err(thrown) = then.call(&[resolve_promise.into(), reject_promise.into()]) {
        on_error(thrown);
    }
}
