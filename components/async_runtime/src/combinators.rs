//! Promise combinators: `all`, `race`, `allSettled` and `any`.
//!
//! Each combinator iterates its input eagerly inside the executor of the
//! promise it returns, so an iteration failure becomes a rejection. Inputs
//! that are not promises count as already fulfilled with themselves.

use crate::promise::{Promise, Reject, Resolve};
use crate::scheduler::SharedScheduler;
use core_types::{Function, JsError, PlainObject, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

/// Message of the aggregate error produced when every input of `any` rejects.
pub const ANY_REJECTED_MESSAGE: &str = "No Promise in Promise.any was resolved";

/// Collects one result per input index and reports when every slot is set.
struct Collector {
    slots: RefCell<Vec<Value>>,
    remaining: Cell<usize>,
}

impl Collector {
    fn new(len: usize) -> Rc<Self> {
        Rc::new(Self {
            slots: RefCell::new(vec![Value::Undefined; len]),
            remaining: Cell::new(len),
        })
    }

    /// Stores `value` at `index`; returns every slot once the last one lands.
    fn record(&self, index: usize, value: Value) -> Option<Vec<Value>> {
        self.slots.borrow_mut()[index] = value;
        let remaining = self.remaining.get() - 1;
        self.remaining.set(remaining);
        if remaining == 0 {
            Some(std::mem::take(&mut *self.slots.borrow_mut()))
        } else {
            None
        }
    }
}

/// Wraps a Rust callback as a one-argument handler returning `undefined`.
fn observer<F>(f: F) -> Function
where
    F: Fn(Value) + 'static,
{
    Function::unary(move |value| {
        f(value);
        Ok(Value::Undefined)
    })
}

fn settled_record(status: &str, key: &str, outcome: Value) -> Value {
    PlainObject::new()
        .with("status", status)
        .with(key, outcome)
        .into_value()
}

impl Promise {
    /// Waits for every input to fulfill.
    ///
    /// Fulfills with an array whose slot `i` holds the value of input `i`,
    /// whatever order the inputs settle in. Rejects with the first reason
    /// any input rejects with. An empty input fulfills with an empty array.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_runtime::{EventLoop, Promise};
    /// use core_types::Value;
    ///
    /// let event_loop = EventLoop::new();
    /// let s = event_loop.scheduler();
    ///
    /// let all = Promise::all(&s, vec![Value::Smi(1), Promise::resolve(&s, 2).into()]);
    /// event_loop.run_until_done().unwrap();
    /// assert_eq!(all.result(), Some(Value::array(vec![Value::Smi(1), Value::Smi(2)])));
    /// ```
    pub fn all(scheduler: &SharedScheduler, iterable: impl Into<Value>) -> Promise {
        let iterable = iterable.into();
        Promise::new(scheduler, move |resolve, reject| {
            let items = iterable.iterate()?;
            if items.is_empty() {
                resolve.call(Value::array(Vec::new()));
                return Ok(());
            }
            debug!(items = items.len(), "Promise.all started");

            let collector = Collector::new(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let record = fulfill_when_complete(&collector, &resolve, index);
                match Promise::from_value(&item) {
                    Some(promise) => {
                        promise.then(
                            Some(observer(move |value| record(value))),
                            Some(reject.clone().into_function()),
                        );
                    }
                    None => record(item),
                }
            }
            Ok(())
        })
    }

    /// Settles like whichever input settles first.
    ///
    /// Inputs that settle on the same turn win in input order. An empty
    /// input never settles.
    pub fn race(scheduler: &SharedScheduler, iterable: impl Into<Value>) -> Promise {
        let iterable = iterable.into();
        let wrap = scheduler.clone();
        Promise::new(scheduler, move |resolve, reject| {
            let items = iterable.iterate()?;
            debug!(items = items.len(), "Promise.race started");
            for item in items {
                let promise =
                    Promise::from_value(&item).unwrap_or_else(|| Promise::resolve(&wrap, item));
                promise.then(
                    Some(resolve.clone().into_function()),
                    Some(reject.clone().into_function()),
                );
            }
            Ok(())
        })
    }

    /// Waits for every input to settle, never rejecting.
    ///
    /// Fulfills with an array of records, `{ status: "fulfilled", value }` or
    /// `{ status: "rejected", reason }`, in input order.
    pub fn all_settled(scheduler: &SharedScheduler, iterable: impl Into<Value>) -> Promise {
        let iterable = iterable.into();
        Promise::new(scheduler, move |resolve, _| {
            let items = iterable.iterate()?;
            if items.is_empty() {
                resolve.call(Value::array(Vec::new()));
                return Ok(());
            }
            debug!(items = items.len(), "Promise.allSettled started");

            let collector = Collector::new(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let record = fulfill_when_complete(&collector, &resolve, index);
                match Promise::from_value(&item) {
                    Some(promise) => {
                        let on_rejected = record.clone();
                        promise.then(
                            Some(observer(move |value| {
                                record(settled_record("fulfilled", "value", value))
                            })),
                            Some(observer(move |reason| {
                                on_rejected(settled_record("rejected", "reason", reason))
                            })),
                        );
                    }
                    None => record(settled_record("fulfilled", "value", item)),
                }
            }
            Ok(())
        })
    }

    /// Fulfills with the first input to fulfill.
    ///
    /// Rejects with an `AggregateError` only after every input has rejected;
    /// its `errors` hold the reasons in input order. An empty input rejects
    /// straight away.
    pub fn any(scheduler: &SharedScheduler, iterable: impl Into<Value>) -> Promise {
        let iterable = iterable.into();
        let wrap = scheduler.clone();
        Promise::new(scheduler, move |resolve, reject| {
            let items = iterable.iterate()?;
            if items.is_empty() {
                reject.call(JsError::aggregate(ANY_REJECTED_MESSAGE, Vec::new()));
                return Ok(());
            }
            debug!(items = items.len(), "Promise.any started");

            let reasons = Collector::new(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let on_rejected = reject_when_exhausted(&reasons, &reject, index);
                let promise =
                    Promise::from_value(&item).unwrap_or_else(|| Promise::resolve(&wrap, item));
                promise.then(
                    Some(resolve.clone().into_function()),
                    Some(observer(on_rejected)),
                );
            }
            Ok(())
        })
    }
}

/// Records a value at `index` and fulfills once every index is recorded.
fn fulfill_when_complete(
    collector: &Rc<Collector>,
    resolve: &Resolve,
    index: usize,
) -> Rc<dyn Fn(Value)> {
    let collector = collector.clone();
    let resolve = resolve.clone();
    Rc::new(move |value| {
        if let Some(values) = collector.record(index, value) {
            resolve.call(Value::array(values));
        }
    })
}

/// Records a reason at `index` and rejects once every index has rejected.
fn reject_when_exhausted(
    reasons: &Rc<Collector>,
    reject: &Reject,
    index: usize,
) -> impl Fn(Value) + 'static {
    let reasons = reasons.clone();
    let reject = reject.clone();
    move |reason| {
        if let Some(errors) = reasons.record(index, reason) {
            debug!(errors = errors.len(), "Promise.any exhausted");
            reject.call(JsError::aggregate(ANY_REJECTED_MESSAGE, errors));
        }
    }
}
